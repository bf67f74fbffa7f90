//! Support for XLIFF 1.2 translation files.
//!
//! See <http://docs.oasis-open.org/xliff/v1.2/os/xliff-core.html>.
//!
//! Plural messages use the gettext convention: a `<group
//! restype="x-gettext-plurals">` holding one `<trans-unit>` per form. Source
//! files carry exactly two units (singular/other); translation files must
//! carry exactly as many units as the target language has plural rules.
//! Parsing a source file injects a `<target>` placeholder next to every
//! `<source>`; compiling expands plural groups to the target language's
//! form count, then strips targets that ended up empty.

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::formats::xml_tree::{XmlDocument, XmlElement, XmlNode};
use crate::handler::{CompileContext, FormatPlugin, ParseInput, ParseSink};
use crate::hash::{hash_tag, plural_placeholder, tr_placeholder};
use crate::language::PluralRule;

const PLURAL_RESTYPE: &str = "x-gettext-plurals";

pub struct XliffFormat;

impl XliffFormat {
    fn err(&self, reason: impl Into<String>) -> Error {
        Error::parse_error(self.method(), reason)
    }

    /// `type: text` values from the `<context>` children of a
    /// `<context-group>`.
    fn context_values(group: &XmlElement) -> Vec<String> {
        group
            .children_named("context")
            .map(|context| {
                format!(
                    "{}: {}",
                    context.attr("context-type").unwrap_or(""),
                    context.text().replace('\n', " ")
                )
            })
            .collect()
    }

    fn parse_body(
        &self,
        body: &mut XmlElement,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
    ) -> Result<(), Error> {
        let mut context = Vec::new();
        for child in &mut body.children {
            let Some(element) = child.as_element_mut() else {
                continue;
            };
            match element.name.as_str() {
                "group" => self.parse_group(element, input, sink, context.clone())?,
                "trans-unit" => {
                    self.parse_trans_unit(element, input, sink, context.clone(), None, None)?
                }
                "context-group" => context.extend(Self::context_values(element)),
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_group(
        &self,
        group: &mut XmlElement,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
        mut context: Vec<String>,
    ) -> Result<(), Error> {
        if group.attr("restype") != Some(PLURAL_RESTYPE) {
            for child in &mut group.children {
                let Some(element) = child.as_element_mut() else {
                    continue;
                };
                match element.name.as_str() {
                    "group" => self.parse_group(element, input, sink, context.clone())?,
                    "trans-unit" => self.parse_trans_unit(
                        element,
                        input,
                        sink,
                        context.clone(),
                        None,
                        None,
                    )?,
                    "context-group" => context.extend(Self::context_values(element)),
                    _ => {}
                }
            }
            return Ok(());
        }

        // A gettext plural group.
        for child in &group.children {
            if let Some(element) = child.as_element() {
                if element.name == "context-group" {
                    context.extend(Self::context_values(element));
                }
            }
        }

        let rules = input.language.plural_rules();
        let unit_count = group.children_named("trans-unit").count();
        if input.is_source && unit_count != 2 {
            return Err(self.err(
                "a source file plural group must contain exactly two trans-units \
                 (singular and plural)",
            ));
        }
        if !input.is_source && unit_count != rules.len() {
            return Err(self.err(format!(
                "the translation file does not have the supported number of plurals \
                 (expected {}, found {})",
                rules.len(),
                unit_count
            )));
        }

        // The canonical source string lives in the unit of the "one" rule.
        let one_index = rules
            .iter()
            .position(|rule| *rule == PluralRule::One)
            .unwrap_or(0);
        let source_index = if input.is_source { 0 } else { one_index };
        let source_string = {
            let unit = group
                .children_named("trans-unit")
                .nth(source_index)
                .ok_or_else(|| self.err("empty plural group"))?;
            let source = unit
                .first_child_named("source")
                .ok_or_else(|| self.err("element 'source' not found"))?;
            source.text()
        };

        let mut index = 0;
        for child in &mut group.children {
            let Some(element) = child.as_element_mut() else {
                continue;
            };
            if element.name != "trans-unit" {
                continue;
            }
            let rule = if input.is_source {
                if index == 0 {
                    PluralRule::One
                } else {
                    PluralRule::Other
                }
            } else {
                rules[index]
            };
            self.parse_trans_unit(
                element,
                input,
                sink,
                context.clone(),
                Some(&source_string),
                Some(rule),
            )?;
            index += 1;
        }
        Ok(())
    }

    fn parse_trans_unit(
        &self,
        unit: &mut XmlElement,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
        mut context: Vec<String>,
        plural_source: Option<&str>,
        rule: Option<PluralRule>,
    ) -> Result<(), Error> {
        let source_text = {
            let source = unit
                .first_child_named("source")
                .ok_or_else(|| self.err("element 'source' not found"))?;
            source.text()
        };

        if plural_source.is_none() {
            for child in &unit.children {
                if let Some(element) = child.as_element() {
                    if element.name == "context-group" {
                        context.extend(Self::context_values(element));
                    }
                }
            }
        }
        let context = Context::from_parts(context);

        let pluralized = plural_source.is_some();
        let entry_source = plural_source.unwrap_or(&source_text);
        let rule = rule.unwrap_or(PluralRule::Other);

        if input.is_source {
            if source_text.trim().is_empty() {
                return Ok(());
            }
            let placeholder = if pluralized {
                plural_placeholder(&hash_tag(entry_source, &context), rule)
            } else {
                tr_placeholder(&hash_tag(&source_text, &context))
            };
            insert_target_after_source(unit, &placeholder);
            sink.add_translation(
                GenericTranslation::new(entry_source, source_text.clone(), context)
                    .with_rule(rule)
                    .pluralized(pluralized),
            );
        } else {
            let translation = unit
                .first_child_named("target")
                .map(|target| target.text())
                .unwrap_or_default();
            if translation.is_empty() {
                return Ok(());
            }
            sink.add_translation(
                GenericTranslation::new(entry_source, translation, context)
                    .with_rule(rule)
                    .pluralized(pluralized),
            );
        }
        Ok(())
    }
}

/// Inserts `<target>placeholder</target>` right after the `<source>`
/// element, reusing the source's indentation.
fn insert_target_after_source(unit: &mut XmlElement, placeholder: &str) {
    let Some(source_pos) = unit.children.iter().position(|child| {
        child
            .as_element()
            .map(|element| element.name == "source")
            .unwrap_or(false)
    }) else {
        return;
    };

    let indent = (source_pos > 0 && unit.children[source_pos - 1].is_whitespace())
        .then(|| unit.children[source_pos - 1].clone());

    let mut target = XmlElement::new("target");
    target.push_text(placeholder);

    let mut insert_at = source_pos + 1;
    if let Some(indent) = indent {
        unit.children.insert(insert_at, indent);
        insert_at += 1;
    }
    unit.children.insert(insert_at, XmlNode::Element(target));
}

/// Expands two-unit plural groups to one unit per target-language rule,
/// rewriting the `_pl_<n>` placeholder suffix of each clone.
fn expand_plural_groups(element: &mut XmlElement, rules: &[PluralRule]) {
    if element.name == "group" && element.attr("restype") == Some(PLURAL_RESTYPE) {
        expand_one_group(element, rules);
        return;
    }
    for child in &mut element.children {
        if let Some(element) = child.as_element_mut() {
            expand_plural_groups(element, rules);
        }
    }
}

fn expand_one_group(group: &mut XmlElement, rules: &[PluralRule]) {
    let unit_positions: Vec<usize> = group
        .children
        .iter()
        .enumerate()
        .filter(|(_, child)| {
            child
                .as_element()
                .map(|element| element.name == "trans-unit")
                .unwrap_or(false)
        })
        .map(|(position, _)| position)
        .collect();
    if unit_positions.len() != 2 {
        return; // already expanded, or not a source-shaped group
    }

    let group_id = group.attr("id").unwrap_or("").to_string();
    let one_unit = group.children[unit_positions[0]].clone();
    let other_unit = group.children[unit_positions[1]].clone();
    let indent = (unit_positions[0] > 0
        && group.children[unit_positions[0] - 1].is_whitespace())
    .then(|| group.children[unit_positions[0] - 1].clone())
    .unwrap_or_else(|| XmlNode::Text("\n".to_string()));

    let prefix: Vec<XmlNode> = group.children[..unit_positions[0]].to_vec();
    let suffix: Vec<XmlNode> = group.children[unit_positions[1] + 1..].to_vec();

    let mut children = prefix;
    for (count, rule) in rules.iter().enumerate() {
        if count > 0 {
            children.push(indent.clone());
        }
        let prototype = if *rule == PluralRule::One {
            &one_unit
        } else {
            &other_unit
        };
        let mut unit = prototype.clone();
        if let Some(element) = unit.as_element_mut() {
            element.set_attr("id", format!("{}[{}]", group_id, count));
            if let Some(target) = element.first_child_named_mut("target") {
                rewrite_plural_suffix(target, *rule);
            }
        }
        children.push(unit);
    }
    children.extend(suffix);
    group.children = children;
}

/// Rewrites the trailing rule number of a `<hash>_pl_<n>` placeholder.
fn rewrite_plural_suffix(target: &mut XmlElement, rule: PluralRule) {
    for child in &mut target.children {
        if let XmlNode::Text(text) = child {
            if let Some(position) = text.rfind("_pl_") {
                text.truncate(position + 4);
                text.push_str(&rule.number().to_string());
            }
        }
    }
}

/// Removes `<target>` elements that are empty (or all of them, for the
/// source language), along with their indentation.
fn strip_targets(element: &mut XmlElement, strip_all: bool) {
    let mut index = 0;
    while index < element.children.len() {
        let remove = element.children[index]
            .as_element()
            .map(|child| child.name == "target" && (strip_all || child.text().trim().is_empty()))
            .unwrap_or(false);
        if remove {
            element.children.remove(index);
            if index > 0 && element.children[index - 1].is_whitespace() {
                element.children.remove(index - 1);
                index -= 1;
            }
        } else {
            if let Some(child) = element.children[index].as_element_mut() {
                strip_targets(child, strip_all);
            }
            index += 1;
        }
    }
}

impl FormatPlugin for XliffFormat {
    fn method(&self) -> &'static str {
        "XLIFF"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let mut doc = XmlDocument::parse(input.content)
            .map_err(|e| self.err(e.to_string()))?;
        if doc.root.name != "xliff" {
            return Err(self.err("root element is not 'xliff'"));
        }
        for child in &mut doc.root.children {
            let Some(file) = child.as_element_mut() else {
                continue;
            };
            if file.name != "file" {
                continue;
            }
            for file_child in &mut file.children {
                let Some(body) = file_child.as_element_mut() else {
                    continue;
                };
                if body.name == "body" {
                    self.parse_body(body, input, sink)?;
                }
            }
        }
        Ok(doc.to_xml())
    }

    fn escape(&self, string: &str) -> String {
        quick_xml::escape::partial_escape(string).into_owned()
    }

    fn unescape(&self, string: &str) -> String {
        quick_xml::escape::unescape(string)
            .map(|unescaped| unescaped.into_owned())
            .unwrap_or_else(|_| string.to_string())
    }

    /// Plural groups in the template carry the source-language shape (two
    /// units); translation output needs one unit per target-language rule.
    fn examine_content(
        &self,
        content: String,
        ctx: &CompileContext<'_>,
    ) -> Result<String, Error> {
        let has_plurals = ctx.strings.iter().any(|entity| entity.pluralized);
        if ctx.is_source_language() || !has_plurals {
            return Ok(content);
        }
        let mut doc = XmlDocument::parse(&content)
            .map_err(|e| Error::compile_error(self.method(), e.to_string()))?;
        expand_plural_groups(&mut doc.root, ctx.language.plural_rules());
        Ok(doc.to_xml())
    }

    fn compile(&self, content: String, ctx: &CompileContext<'_>) -> Result<String, Error> {
        let mut content = content;
        for entity in ctx.strings {
            if entity.pluralized {
                for rule in ctx.language.plural_rules() {
                    let translation = ctx.translation(entity.id, *rule);
                    let replacement = ctx.decorate(self.escape(translation));
                    content = content.replace(
                        &plural_placeholder(&entity.string_hash, *rule),
                        &replacement,
                    );
                }
            } else {
                let translation = ctx.translation(entity.id, PluralRule::Other);
                let replacement = ctx.decorate(self.escape(translation));
                content =
                    content.replace(&tr_placeholder(&entity.string_hash), &replacement);
            }
        }
        Ok(content)
    }

    fn post_compile(
        &self,
        content: String,
        ctx: &CompileContext<'_>,
    ) -> Result<String, Error> {
        let mut doc = XmlDocument::parse(&content)
            .map_err(|e| Error::compile_error(self.method(), e.to_string()))?;
        strip_targets(&mut doc.root, ctx.is_source_language());
        Ok(doc.to_xml())
    }
}
