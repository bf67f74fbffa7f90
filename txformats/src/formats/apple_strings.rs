//! Support for Apple `.strings` translation files.
//!
//! The grammar is `"key" = "value";` with C-style block comments between
//! entries. Anything between entries that is not a comment or whitespace is
//! a syntax error. Files default to UTF-16 on disk; UTF-8 input is accepted
//! as a fallback, and compiled output is always re-encoded as UTF-16.

use lazy_static::lazy_static;
use regex::Regex;

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{FormatPlugin, ParseInput, ParseSink, decode_bytes};
use crate::hash::{hash_tag, tr_placeholder};

lazy_static! {
    static ref ENTRY_RE: Regex = Regex::new(
        r#"(?s)(?P<line>(?:"(?P<key>[^"\\]*(?:\\.[^"\\]*)*)"|(?P<property>\w+))\s*=\s*"(?P<value>[^"\\]*(?:\\.[^"\\]*)*)"\s*;)"#
    )
    .expect("valid entry regex");
    static ref COMMENT_RE: Regex =
        Regex::new(r"\A\s*/\*(?s:.*?)\*/\s*").expect("valid comment regex");
    static ref LINE_COMMENT_RE: Regex =
        Regex::new(r"\A\s*//[^\n]*\n?\s*").expect("valid line comment regex");
    static ref WS_RE: Regex = Regex::new(r"\A\s+").expect("valid whitespace regex");
}

pub struct AppleStringsFormat;

impl AppleStringsFormat {
    /// Consumes comments and whitespace between two entries, appending the
    /// skipped text to the template buffer for source files. Anything else
    /// is invalid syntax.
    fn consume_gap(
        &self,
        content: &str,
        start: usize,
        end: usize,
        is_source: bool,
        buf: &mut String,
    ) -> Result<(), Error> {
        let mut position = start;
        while position < end {
            let gap = &content[position..end];
            let matched = COMMENT_RE
                .find(gap)
                .or_else(|| LINE_COMMENT_RE.find(gap))
                .or_else(|| WS_RE.find(gap));
            let Some(matched) = matched else {
                return Err(Error::parse_error(self.method(), "invalid syntax"));
            };
            if is_source {
                buf.push_str(&gap[..matched.end()]);
            }
            position += matched.end();
        }
        Ok(())
    }
}

impl FormatPlugin for AppleStringsFormat {
    fn method(&self) -> &'static str {
        "STRINGS"
    }

    /// BOM-aware decode with a UTF-16LE fallback for BOM-less files that are
    /// not valid UTF-8.
    fn decode(&self, raw: &[u8]) -> Result<String, Error> {
        if let Some((encoding, _)) = encoding_rs::Encoding::for_bom(raw) {
            let (decoded, _, had_errors) = encoding.decode(raw);
            if had_errors {
                return Err(Error::content_error(format!(
                    "could not decode content as {}",
                    encoding.name()
                )));
            }
            return Ok(decoded.into_owned());
        }
        match std::str::from_utf8(raw) {
            Ok(_) => decode_bytes(raw),
            Err(_) => {
                let (decoded, _, had_errors) = encoding_rs::UTF_16LE.decode(raw);
                if had_errors {
                    return Err(Error::content_error(
                        "could not decode content as UTF-16 or UTF-8",
                    ));
                }
                Ok(decoded.into_owned())
            }
        }
    }

    /// Compiled output is UTF-16LE with a BOM, the platform default.
    fn encode(&self, compiled: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        for unit in compiled.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let content = input.content;
        let mut buf = String::new();
        let mut end = 0usize;

        for capture in ENTRY_RE.captures_iter(content) {
            let line = capture.name("line").expect("group always present");
            let key = capture
                .name("key")
                .or_else(|| capture.name("property"))
                .expect("one key group always present");
            let value = capture.name("value").expect("group always present");

            self.consume_gap(content, end, line.start(), input.is_source, &mut buf)?;
            end = line.end();

            if input.is_source {
                if value.as_str().trim().is_empty() {
                    buf.push_str(line.as_str());
                    continue;
                }
                let placeholder =
                    tr_placeholder(&hash_tag(key.as_str(), &Context::None));
                buf.push_str(&content[line.start()..value.start()]);
                buf.push_str(&placeholder);
                buf.push_str(&content[value.end()..line.end()]);
            } else if value.as_str().trim().is_empty() {
                continue;
            }

            sink.add_translation(GenericTranslation::new(
                key.as_str(),
                self.unescape(value.as_str()),
                Context::None,
            ));
        }

        self.consume_gap(content, end, content.len(), input.is_source, &mut buf)?;
        Ok(buf)
    }

    fn escape(&self, string: &str) -> String {
        string.replace('"', "\\\"")
    }

    fn unescape(&self, string: &str) -> String {
        string.replace("\\\"", "\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;

    fn parse(content: &str, is_source: bool) -> Result<(ParseSink, String), Error> {
        let language = language::lookup("en").unwrap();
        let input = ParseInput {
            content,
            is_source,
            language: &language,
        };
        let mut sink = ParseSink::default();
        let template = AppleStringsFormat.parse(&input, &mut sink)?;
        Ok((sink, template))
    }

    #[test]
    fn test_parse_basic_entries() {
        let content = "/* greeting */\n\"hello\" = \"Hello!\";\n\"bye\" = \"Goodbye\";\n";
        let (sink, _) = parse(content, true).unwrap();
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].source_entity, "hello");
        assert_eq!(strings[0].translation, "Hello!");
    }

    #[test]
    fn test_bare_property_keys() {
        let (sink, _) = parse("title = \"The Title\";\n", true).unwrap();
        assert_eq!(sink.stringset.strings[0].source_entity, "title");
    }

    #[test]
    fn test_template_replaces_value_span() {
        let (_, template) = parse("\"k\" = \"v\";\n", true).unwrap();
        let placeholder = tr_placeholder(&hash_tag("k", &Context::None));
        assert_eq!(template, format!("\"k\" = \"{}\";\n", placeholder));
    }

    #[test]
    fn test_escaped_quotes_in_values() {
        let (sink, _) = parse("\"k\" = \"say \\\"hi\\\"\";\n", true).unwrap();
        assert_eq!(sink.stringset.strings[0].translation, "say \"hi\"");
    }

    #[test]
    fn test_garbage_between_entries_fails() {
        let content = "\"a\" = \"1\";\ngarbage here\n\"b\" = \"2\";\n";
        assert!(matches!(
            parse(content, true),
            Err(Error::Parse {
                format: "STRINGS",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_value_kept_in_template_not_extracted() {
        let (sink, template) = parse("\"a\" = \"\";\n\"b\" = \"2\";\n", true).unwrap();
        assert_eq!(sink.stringset.len(), 1);
        assert!(template.contains("\"a\" = \"\";"));
    }

    #[test]
    fn test_escape_round_trip() {
        let plugin = AppleStringsFormat;
        for case in ["say \"hi\"", "plain", "\"quoted\""] {
            assert_eq!(plugin.unescape(&plugin.escape(case)), case);
        }
    }

    #[test]
    fn test_decode_utf16_with_bom() {
        let plugin = AppleStringsFormat;
        let encoded = plugin.encode("\"k\" = \"v\";");
        let decoded = plugin.decode(&encoded).unwrap();
        assert_eq!(decoded, "\"k\" = \"v\";");
    }

    #[test]
    fn test_decode_utf8_fallback() {
        let plugin = AppleStringsFormat;
        let decoded = plugin.decode("\"k\" = \"v\";".as_bytes()).unwrap();
        assert_eq!(decoded, "\"k\" = \"v\";");
    }
}
