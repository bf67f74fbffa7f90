//! Support for Mozilla `.properties` translation files.
//!
//! Same grammar as Java properties, but Mozilla only treats the backslash
//! itself as escapable: `:` and `=` appear literally in values.

use crate::error::Error;
use crate::formats::properties::parse_properties;
use crate::handler::{FormatPlugin, ParseInput, ParseSink};

pub struct MozillaPropertiesFormat;

impl FormatPlugin for MozillaPropertiesFormat {
    fn method(&self) -> &'static str {
        "MOZILLAPROPERTIES"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        parse_properties(self, input, sink)
    }

    fn escape(&self, string: &str) -> String {
        string.replace('\\', "\\\\")
    }

    fn unescape(&self, string: &str) -> String {
        let mut out = String::with_capacity(string.len());
        let mut chars = string.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;

    fn parse(content: &str) -> ParseSink {
        let language = language::lookup("en").unwrap();
        let input = ParseInput {
            content,
            is_source: true,
            language: &language,
        };
        let mut sink = ParseSink::default();
        MozillaPropertiesFormat.parse(&input, &mut sink).unwrap();
        sink
    }

    #[test]
    fn test_colons_stay_literal_in_values() {
        let sink = parse("url=http\\://example.com\n");
        // Mozilla does not unescape the colon escape
        assert_eq!(sink.stringset.strings[0].translation, "http\\://example.com");
    }

    #[test]
    fn test_backslash_unescaped() {
        let sink = parse("path=C\\\\temp\n");
        assert_eq!(sink.stringset.strings[0].translation, "C\\temp");
    }

    #[test]
    fn test_escape_round_trip() {
        let plugin = MozillaPropertiesFormat;
        for case in ["back\\slash", "plain", "a=b:c"] {
            assert_eq!(plugin.unescape(&plugin.escape(case)), case);
        }
    }

    #[test]
    fn test_escape_leaves_separators_alone() {
        let plugin = MozillaPropertiesFormat;
        assert_eq!(plugin.escape("a=b:c"), "a=b:c");
    }
}
