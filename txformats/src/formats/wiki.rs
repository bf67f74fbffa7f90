//! Support for MediaWiki markup files.
//!
//! The translatable unit is a block: either a paragraph (delimited by a
//! blank line) or a `{{...}}` template, which is kept whole even when it
//! contains blank lines.

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{FormatPlugin, ParseInput, ParseSink};
use crate::hash::{hash_tag, tr_placeholder};

const PARAGRAPH_SPLITTER: &str = "\n\n";
const TEMPLATE_OPEN: &str = "{{";
const TEMPLATE_CLOSE: &str = "}}";

pub struct WikiFormat;

impl FormatPlugin for WikiFormat {
    fn method(&self) -> &'static str {
        "WIKI"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let content = input.content;
        let mut template = content.to_string();

        let mut prev_split = 0usize;
        let mut prev_text = Some(0usize);
        while let Some(text_start) = prev_text {
            let par_pos = content[prev_split..]
                .find(PARAGRAPH_SPLITTER)
                .map(|i| i + prev_split);
            let open_pos = content[prev_split..]
                .find(TEMPLATE_OPEN)
                .map(|i| i + prev_split);

            let block = match (par_pos, open_pos) {
                (None, None) => {
                    // End of document.
                    prev_text = None;
                    content[text_start..].trim()
                }
                (Some(par), None) => {
                    prev_split = par + PARAGRAPH_SPLITTER.len();
                    prev_text = Some(prev_split);
                    content[text_start..par].trim()
                }
                (Some(par), Some(open)) if par < open => {
                    prev_split = par + PARAGRAPH_SPLITTER.len();
                    prev_text = Some(prev_split);
                    content[text_start..par].trim()
                }
                (_, Some(open)) => {
                    // A template opens before the next paragraph break; skip
                    // past its closing braces without splitting it.
                    match content[open + 1..].find(TEMPLATE_CLOSE) {
                        Some(close) => {
                            prev_split = open + 1 + close;
                            continue;
                        }
                        None => {
                            return Err(Error::parse_error(
                                self.method(),
                                "unbalanced template braces",
                            ));
                        }
                    }
                }
            };

            if block.trim_matches('\n').is_empty() {
                continue;
            }
            let placeholder = tr_placeholder(&hash_tag(block, &Context::None));
            template = template.replace(block, &placeholder);
            sink.add_translation(GenericTranslation::new(block, block, Context::None));
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;

    fn parse(content: &str) -> (ParseSink, String) {
        let language = language::lookup("en").unwrap();
        let input = ParseInput {
            content,
            is_source: true,
            language: &language,
        };
        let mut sink = ParseSink::default();
        let template = WikiFormat.parse(&input, &mut sink).unwrap();
        (sink, template)
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let (sink, template) = parse("First paragraph.\n\nSecond paragraph.\n");
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].source_entity, "First paragraph.");
        assert_eq!(strings[1].source_entity, "Second paragraph.");
        assert!(!template.contains("First paragraph."));
        assert!(template.contains("_tr"));
    }

    #[test]
    fn test_template_block_not_split_on_inner_blank_lines() {
        let (sink, _) = parse("{{Infobox\n\n|name=x\n}}\n\nIntro text.\n");
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].source_entity, "{{Infobox\n\n|name=x\n}}");
        assert_eq!(strings[1].source_entity, "Intro text.");
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        let language = language::lookup("en").unwrap();
        let input = ParseInput {
            content: "{{Broken\n\ntext",
            is_source: true,
            language: &language,
        };
        let mut sink = ParseSink::default();
        let result = WikiFormat.parse(&input, &mut sink);
        assert!(matches!(result, Err(Error::Parse { format: "WIKI", .. })));
    }

    #[test]
    fn test_source_equals_translation() {
        let (sink, _) = parse("Only paragraph.");
        let entry = &sink.stringset.strings[0];
        assert_eq!(entry.source_entity, entry.translation);
    }
}
