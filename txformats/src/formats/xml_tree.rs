//! A small owned XML tree over quick-xml events.
//!
//! The XML formats (XLIFF, Qt Linguist) need structural edits the event API
//! makes painful: inserting `<target>` nodes next to their `<source>`
//! siblings, cloning plural units, and stripping empty targets, all while
//! preserving the surrounding whitespace so templates keep the original
//! layout. Text nodes are therefore kept verbatim (no trimming).

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::Event;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
    CData(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// True for text nodes that are only whitespace (indentation).
    pub fn is_whitespace(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children
            .iter()
            .filter_map(XmlNode::as_element)
            .filter(move |element| element.name == name)
    }

    pub fn first_child_named<'a>(&'a self, name: &'a str) -> Option<&'a XmlElement> {
        self.children_named(name).next()
    }

    pub fn first_child_named_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .find(|element| element.name == name)
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// The concatenated content of the element: character data verbatim,
    /// child elements re-serialized (inline markup stays part of the text).
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::CData(text) => out.push_str(text),
                XmlNode::Element(element) => out.push_str(&element.to_xml()),
                XmlNode::Comment(_) => {}
            }
        }
        out
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

/// A parsed XML document: prolog (declaration/doctype) plus the root
/// element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub decl: Option<String>,
    pub doctype: Option<String>,
    pub root: XmlElement,
}

impl XmlDocument {
    /// Parses a complete document, keeping all whitespace.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);

        let mut decl = None;
        let mut doctype = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Decl(e) => {
                    let version = e
                        .version()
                        .map(|v| String::from_utf8_lossy(&v).into_owned())
                        .unwrap_or_else(|_| "1.0".to_string());
                    let encoding = e
                        .encoding()
                        .and_then(|enc| enc.ok())
                        .map(|enc| String::from_utf8_lossy(&enc).into_owned());
                    decl = Some(match encoding {
                        Some(encoding) => format!(
                            "<?xml version=\"{}\" encoding=\"{}\"?>",
                            version, encoding
                        ),
                        None => format!("<?xml version=\"{}\"?>", version),
                    });
                }
                Event::DocType(e) => {
                    doctype = Some(format!(
                        "<!DOCTYPE {}>",
                        String::from_utf8_lossy(&e).trim()
                    ));
                }
                Event::Start(e) => {
                    let element = element_from_start(&e)?;
                    stack.push(element);
                }
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::content_error("unbalanced XML end tag"))?;
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::Text(e) => {
                    let text = e.unescape()?.into_owned();
                    if stack.is_empty() {
                        continue; // whitespace around the root
                    }
                    attach(&mut stack, &mut root, XmlNode::Text(text))?;
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    attach(&mut stack, &mut root, XmlNode::CData(text))?;
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if stack.is_empty() {
                        continue;
                    }
                    attach(&mut stack, &mut root, XmlNode::Comment(text))?;
                }
                Event::PI(_) => {}
                Event::Eof => break,
            }
        }

        let root = root.ok_or_else(|| Error::content_error("no root element"))?;
        Ok(XmlDocument {
            decl,
            doctype,
            root,
        })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if let Some(decl) = &self.decl {
            out.push_str(decl);
            out.push('\n');
        }
        if let Some(doctype) = &self.doctype {
            out.push_str(doctype);
            out.push('\n');
        }
        write_element(&self.root, &mut out);
        out.push('\n');
        out
    }
}

fn element_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement, Error> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::content_error(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => match node {
            XmlNode::Element(element) if root.is_none() => {
                *root = Some(element);
                Ok(())
            }
            XmlNode::Element(_) => Err(Error::content_error("multiple root elements")),
            _ => Ok(()),
        },
    }
}

fn write_element(element: &XmlElement, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(child, out),
            XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
            XmlNode::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            XmlNode::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_round_trip() {
        let content = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root a=\"1\">\n  <child>text</child>\n</root>\n";
        let doc = XmlDocument::parse(content).unwrap();
        assert_eq!(doc.root.name, "root");
        assert_eq!(doc.root.attr("a"), Some("1"));
        assert_eq!(doc.to_xml(), content);
    }

    #[test]
    fn test_whitespace_preserved() {
        let content = "<r>\n    <a>x</a>\n</r>";
        let doc = XmlDocument::parse(content).unwrap();
        assert!(doc.to_xml().contains("\n    <a>"));
    }

    #[test]
    fn test_text_includes_inline_markup() {
        let doc = XmlDocument::parse("<r>before <b>bold</b> after</r>").unwrap();
        assert_eq!(doc.root.text(), "before <b>bold</b> after");
    }

    #[test]
    fn test_entities_round_trip() {
        let doc = XmlDocument::parse("<r>a &lt; b &amp; c</r>").unwrap();
        assert_eq!(doc.root.text(), "a < b & c");
        assert!(doc.to_xml().contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_doctype_preserved() {
        let doc = XmlDocument::parse("<!DOCTYPE TS>\n<TS version=\"2.0\"/>").unwrap();
        assert_eq!(doc.doctype.as_deref(), Some("<!DOCTYPE TS>"));
        assert!(doc.to_xml().contains("<!DOCTYPE TS>"));
    }

    #[test]
    fn test_empty_element_collapsed() {
        let doc = XmlDocument::parse("<r><empty></empty></r>").unwrap();
        assert_eq!(doc.to_xml(), "<r><empty/></r>\n");
    }

    #[test]
    fn test_children_named_and_attrs() {
        let mut doc =
            XmlDocument::parse("<r><m id=\"1\"/><m id=\"2\"/><other/></r>").unwrap();
        assert_eq!(doc.root.children_named("m").count(), 2);
        let m = doc.root.first_child_named_mut("m").unwrap();
        m.set_attr("id", "9");
        assert_eq!(doc.root.first_child_named("m").unwrap().attr("id"), Some("9"));
    }

    #[test]
    fn test_invalid_xml_fails() {
        assert!(XmlDocument::parse("<r><unclosed></r>").is_err());
    }
}
