//! Support for Qt Linguist `.ts` translation files.
//!
//! A `<context>` block groups the messages of one class; its `<name>` plus
//! an optional per-message `<comment>` disambiguator form the uniqueness
//! context of each source string. Plural messages are marked
//! `numerus="yes"` and hold one `<numerusform>` per plural form of the
//! file's language.

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::formats::xml_tree::{XmlDocument, XmlElement, XmlNode};
use crate::handler::{CompileContext, FormatPlugin, ParseInput, ParseSink};
use crate::hash::{hash_tag, plural_placeholder, tr_placeholder};
use crate::language::PluralRule;

pub struct QtTsFormat;

impl QtTsFormat {
    fn err(&self, reason: impl Into<String>) -> Error {
        Error::parse_error(self.method(), reason)
    }

    /// The uniqueness context of a message: the context name, extended by
    /// the message's `<comment>` when present.
    fn message_context(context_name: &str, comment: Option<&str>) -> Context {
        match comment {
            Some(comment) if !comment.is_empty() => {
                Context::from_parts(vec![context_name.to_string(), comment.to_string()])
            }
            _ => Context::from_parts(vec![context_name.to_string()]),
        }
    }

    /// `filename:line` pairs from the `<location>` children.
    fn occurrences_of(message: &XmlElement) -> Option<String> {
        let locations: Vec<String> = message
            .children_named("location")
            .filter_map(|location| {
                let filename = location.attr("filename")?;
                let line = location.attr("line").unwrap_or("0");
                Some(format!("{}:{}", filename, line))
            })
            .collect();
        if locations.is_empty() {
            None
        } else {
            Some(locations.join(", "))
        }
    }

    fn parse_message(
        &self,
        message: &mut XmlElement,
        context_name: &str,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
    ) -> Result<(), Error> {
        let source_text = message
            .first_child_named("source")
            .ok_or_else(|| self.err("element 'source' not found"))?
            .text();
        if source_text.trim().is_empty() {
            return Ok(());
        }
        let comment = message
            .first_child_named("comment")
            .map(|comment| comment.text());
        let context = Self::message_context(context_name, comment.as_deref());
        let occurrences = Self::occurrences_of(message);
        let numerus = message.attr("numerus") == Some("yes");

        let translation_el = message.first_child_named("translation");
        let translation_type = translation_el
            .and_then(|translation| translation.attr("type"))
            .unwrap_or("");
        if translation_type == "obsolete" {
            return Ok(());
        }
        let unfinished = translation_type == "unfinished";

        if numerus {
            self.parse_numerus_message(
                message,
                input,
                sink,
                &source_text,
                context,
                occurrences,
                unfinished,
            )
        } else {
            self.parse_plain_message(
                message,
                input,
                sink,
                &source_text,
                context,
                occurrences,
                unfinished,
            )
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_plain_message(
        &self,
        message: &mut XmlElement,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
        source_text: &str,
        context: Context,
        occurrences: Option<String>,
        unfinished: bool,
    ) -> Result<(), Error> {
        if input.is_source {
            let translated = message
                .first_child_named("translation")
                .map(|translation| translation.text())
                .unwrap_or_default();
            let translation = if translated.trim().is_empty() {
                source_text.to_string()
            } else {
                translated
            };
            let placeholder = tr_placeholder(&hash_tag(source_text, &context));
            set_translation_text(message, &placeholder);
            sink.add_translation(
                GenericTranslation::new(source_text, translation, context)
                    .with_occurrences(occurrences),
            );
        } else {
            let translation = message
                .first_child_named("translation")
                .map(|translation| translation.text())
                .unwrap_or_default();
            if translation.trim().is_empty() {
                return Ok(());
            }
            let entry = GenericTranslation::new(source_text, translation, context)
                .with_occurrences(occurrences)
                .fuzzy(unfinished);
            if unfinished {
                sink.add_suggestion(entry);
            } else {
                sink.add_translation(entry);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_numerus_message(
        &self,
        message: &mut XmlElement,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
        source_text: &str,
        context: Context,
        occurrences: Option<String>,
        unfinished: bool,
    ) -> Result<(), Error> {
        let rules = input.language.plural_rules();

        if input.is_source {
            // The source file contributes one entry per source-language
            // rule, taking translations from its numerusforms where they
            // exist and falling back to the source string.
            let existing_forms: Vec<String> = message
                .first_child_named("translation")
                .map(|translation| {
                    translation
                        .children_named("numerusform")
                        .map(|form| form.text())
                        .collect()
                })
                .unwrap_or_default();
            let hash = hash_tag(source_text, &context);
            let placeholders: Vec<XmlNode> = rules
                .iter()
                .map(|rule| {
                    let mut form = XmlElement::new("numerusform");
                    form.push_text(plural_placeholder(&hash, *rule));
                    XmlNode::Element(form)
                })
                .collect();
            set_translation_children(message, placeholders);
            for (index, rule) in rules.iter().enumerate() {
                let translation = existing_forms
                    .get(index)
                    .filter(|form| !form.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| source_text.to_string());
                sink.add_translation(
                    GenericTranslation::new(source_text, translation, context.clone())
                        .with_occurrences(occurrences.clone())
                        .with_rule(*rule)
                        .pluralized(true),
                );
            }
        } else {
            let forms: Vec<String> = message
                .first_child_named("translation")
                .map(|translation| {
                    translation
                        .children_named("numerusform")
                        .map(|form| form.text())
                        .collect()
                })
                .unwrap_or_default();
            if forms.iter().all(|form| form.trim().is_empty()) {
                return Ok(());
            }
            if forms.len() != rules.len() {
                return Err(self.err(format!(
                    "message {:?} has {} numerus forms, the language needs {}",
                    source_text,
                    forms.len(),
                    rules.len()
                )));
            }
            for (rule, form) in rules.iter().zip(forms) {
                if form.is_empty() {
                    continue;
                }
                let entry = GenericTranslation::new(source_text, form, context.clone())
                    .with_occurrences(occurrences.clone())
                    .with_rule(*rule)
                    .pluralized(true)
                    .fuzzy(unfinished);
                if unfinished {
                    sink.add_suggestion(entry);
                } else {
                    sink.add_translation(entry);
                }
            }
        }
        Ok(())
    }
}

/// Replaces the text of the `<translation>` element (creating it if the
/// message has none) with a single text node.
fn set_translation_text(message: &mut XmlElement, text: &str) {
    set_translation_children(message, vec![XmlNode::Text(text.to_string())]);
}

fn set_translation_children(message: &mut XmlElement, children: Vec<XmlNode>) {
    match message.first_child_named_mut("translation") {
        Some(translation) => {
            translation.attrs.retain(|(key, _)| key != "type");
            translation.children = children;
        }
        None => {
            let mut translation = XmlElement::new("translation");
            translation.children = children;
            message.push_element(translation);
        }
    }
}

impl FormatPlugin for QtTsFormat {
    fn method(&self) -> &'static str {
        "QT"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let mut doc = XmlDocument::parse(input.content)
            .map_err(|e| self.err(e.to_string()))?;
        if doc.root.name != "TS" {
            return Err(self.err("root element is not 'TS'"));
        }
        for child in &mut doc.root.children {
            let Some(context_el) = child.as_element_mut() else {
                continue;
            };
            if context_el.name != "context" {
                continue;
            }
            let context_name = context_el
                .first_child_named("name")
                .map(|name| name.text())
                .unwrap_or_default();
            for context_child in &mut context_el.children {
                let Some(message) = context_child.as_element_mut() else {
                    continue;
                };
                if message.name == "message" {
                    self.parse_message(message, &context_name, input, sink)?;
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

    /// Numerus templates carry one `<numerusform>` per source-language
    /// rule; translation output needs one per target-language rule.
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
        expand_numerus_forms(&mut doc.root, ctx);
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
}

/// Rewrites every numerus `<translation>` to one `<numerusform>` per
/// target-language rule, reusing the placeholder hash of the existing forms.
fn expand_numerus_forms(element: &mut XmlElement, ctx: &CompileContext<'_>) {
    if element.name == "message" && element.attr("numerus") == Some("yes") {
        let hash = element
            .first_child_named("translation")
            .map(|translation| {
                translation
                    .children_named("numerusform")
                    .filter_map(|form| {
                        let text = form.text();
                        text.rfind("_pl_").map(|position| text[..position].to_string())
                    })
                    .next()
            })
            .unwrap_or_default();
        let Some(hash) = hash else {
            return;
        };
        let forms: Vec<XmlNode> = ctx
            .language
            .plural_rules()
            .iter()
            .map(|rule| {
                let mut form = XmlElement::new("numerusform");
                form.push_text(plural_placeholder(&hash, *rule));
                XmlNode::Element(form)
            })
            .collect();
        set_translation_children(element, forms);
        return;
    }
    for child in &mut element.children {
        if let Some(element) = child.as_element_mut() {
            expand_numerus_forms(element, ctx);
        }
    }
}
