//! Support for Joomla INI translation files.
//!
//! Joomla changed the value syntax in 1.6: values are wrapped in double
//! quotes and embedded quotes are written as `"_QQ_"`, while 1.5 files used
//! bare values with `&quot;` entities. The flavor is sniffed from the first
//! byte of the file: 1.6 language files start with a `;` comment line.

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::formats::{find_linesep, trim_trailing_linesep};
use crate::handler::{
    CompileContext, FormatPlugin, ParseInput, ParseSink, substitute_placeholders,
};
use crate::hash::{hash_tag, tr_placeholder};

/// The two on-disk flavors of Joomla INI files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoomlaVersion {
    /// Joomla 1.5: bare values, quotes as `&quot;`.
    Old,
    /// Joomla 1.6+: quoted values, quotes as `"_QQ_"`.
    New,
}

impl JoomlaVersion {
    /// Sniffs the flavor from the first byte of the content.
    pub fn detect(content: &str) -> Self {
        if content.starts_with(';') {
            JoomlaVersion::New
        } else {
            JoomlaVersion::Old
        }
    }

    /// Extracts the translation value from the raw right-hand side of a
    /// line, stripping the surrounding quotes of the new format.
    fn extract(self, raw: &str) -> String {
        match self {
            JoomlaVersion::Old => self.unescape_quotes(raw),
            JoomlaVersion::New => {
                let inner = raw
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(raw);
                self.unescape_quotes(inner)
            }
        }
    }

    /// Version-specific quote escaping applied at compile time.
    pub fn escape_quotes(self, value: &str) -> String {
        match self {
            JoomlaVersion::Old => value.replace('"', "&quot;"),
            JoomlaVersion::New => value.replace('"', "\"_QQ_\""),
        }
    }

    /// Reverses [`JoomlaVersion::escape_quotes`].
    pub fn unescape_quotes(self, value: &str) -> String {
        match self {
            JoomlaVersion::Old => value.replace("&quot;", "\""),
            JoomlaVersion::New => value.replace("&quot;", "\"").replace("\"_QQ_\"", "\""),
        }
    }
}

pub struct JoomlaIniFormat;

/// Handler-level escaping shared by both flavors: backslashes and literal
/// newlines.
fn escape_control(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn unescape_control(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
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

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';')
}

impl FormatPlugin for JoomlaIniFormat {
    fn method(&self) -> &'static str {
        "INI"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let content = input.content;
        let version = JoomlaVersion::detect(content);
        let linesep = find_linesep(content);

        let mut buf = String::new();
        let mut comment = String::new();
        for line in content.split(linesep) {
            if line.is_empty() || is_comment(line) {
                if input.is_source {
                    buf.push_str(line);
                    buf.push_str(linesep);
                }
                if is_comment(line) {
                    comment = format!("{}{}", &line[1..], linesep);
                } else {
                    comment.clear();
                }
                continue;
            }

            let Some((source, raw_value)) = line.split_once('=') else {
                tracing::warn!("could not parse line {:?}, skipping", line);
                continue;
            };

            let translation = version.extract(raw_value);
            let inner_value = match version {
                JoomlaVersion::New => raw_value
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(raw_value),
                JoomlaVersion::Old => raw_value,
            };

            if input.is_source {
                if inner_value.trim().is_empty() {
                    buf.push_str(line);
                    buf.push_str(linesep);
                    continue;
                }
                let placeholder = tr_placeholder(&hash_tag(source, &Context::None));
                let tail = line[source.len()..].replace(inner_value, &placeholder);
                buf.push_str(source);
                buf.push_str(&tail);
                buf.push_str(linesep);
            } else if translation.trim().is_empty() {
                comment.clear();
                continue;
            }

            sink.add_translation(
                GenericTranslation::new(
                    source,
                    unescape_control(&translation),
                    Context::None,
                )
                .with_comment((!comment.is_empty()).then(|| comment.clone())),
            );
            comment.clear();
        }
        Ok(trim_trailing_linesep(buf, linesep))
    }

    fn escape(&self, string: &str) -> String {
        escape_control(string)
    }

    fn unescape(&self, string: &str) -> String {
        unescape_control(string)
    }

    /// Substitution re-detects the flavor from the template, so embedded
    /// quotes compile to the right escape.
    fn compile(&self, content: String, ctx: &CompileContext<'_>) -> Result<String, Error> {
        let version = JoomlaVersion::detect(&content);
        Ok(substitute_placeholders(content, ctx, |s| {
            escape_control(&version.escape_quotes(s))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;

    fn parse(content: &str, is_source: bool) -> (ParseSink, String) {
        let language = language::lookup("en").unwrap();
        let input = ParseInput {
            content,
            is_source,
            language: &language,
        };
        let mut sink = ParseSink::default();
        let template = JoomlaIniFormat.parse(&input, &mut sink).unwrap();
        (sink, template)
    }

    #[test]
    fn test_version_detection() {
        assert_eq!(JoomlaVersion::detect(";1.6\nKEY=\"v\""), JoomlaVersion::New);
        assert_eq!(JoomlaVersion::detect("KEY=v"), JoomlaVersion::Old);
    }

    #[test]
    fn test_parse_new_format() {
        let (sink, template) =
            parse(";1.6\nKEY1=\"value1\"\nKEY2=\"value2\"\nKEY3=\"value3\"\n", true);
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 3);
        assert_eq!(strings[0].source_entity, "KEY1");
        assert_eq!(strings[0].translation, "value1");
        assert_eq!(strings[2].translation, "value3");

        // Quotes survive around the placeholder.
        let placeholder = tr_placeholder(&hash_tag("KEY1", &Context::None));
        assert!(template.contains(&format!("KEY1=\"{}\"", placeholder)));
    }

    #[test]
    fn test_parse_old_format() {
        let (sink, template) = parse("KEY=plain value\n", true);
        assert_eq!(sink.stringset.strings[0].translation, "plain value");
        let placeholder = tr_placeholder(&hash_tag("KEY", &Context::None));
        assert!(template.contains(&format!("KEY={}", placeholder)));
    }

    #[test]
    fn test_comment_attaches_to_following_entry() {
        let (sink, _) = parse("; module strings\nKEY=value\nOTHER=more\n", true);
        let strings = &sink.stringset.strings;
        let comment = strings[0].comment.as_ref().unwrap();
        assert!(!comment.contains("1.6"));
        assert!(comment.contains("module strings"));
        assert!(strings[1].comment.is_none());
    }

    #[test]
    fn test_quote_escapes() {
        let new = JoomlaVersion::New;
        let escaped = new.escape_quotes("Translation with \"quotes\"");
        assert_eq!(escaped, "Translation with \"_QQ_\"quotes\"_QQ_\"");
        assert_eq!(new.unescape_quotes(&escaped), "Translation with \"quotes\"");

        let old = JoomlaVersion::Old;
        assert_eq!(old.escape_quotes("say \"hi\""), "say &quot;hi&quot;");
        assert_eq!(old.unescape_quotes("say &quot;hi&quot;"), "say \"hi\"");
    }

    #[test]
    fn test_parse_value_with_embedded_quotes() {
        let (sink, _) = parse(";1.6\nKEY=\"a \"_QQ_\"b\"_QQ_\" c\"\n", false);
        assert_eq!(sink.stringset.strings[0].translation, "a \"b\" c");
    }

    #[test]
    fn test_empty_value_kept_in_template_only() {
        let (sink, template) = parse(";1.6\nEMPTY=\"\"\nKEY=\"v\"\n", true);
        assert_eq!(sink.stringset.len(), 1);
        assert!(template.contains("EMPTY=\"\""));
    }

    #[test]
    fn test_unparsable_line_skipped() {
        let (sink, _) = parse("no equals sign here\nKEY=v\n", true);
        assert_eq!(sink.stringset.len(), 1);
    }

    #[test]
    fn test_control_escape_round_trip() {
        for case in ["line\nbreak", "back\\slash", "cr\rhere", "plain"] {
            assert_eq!(unescape_control(&escape_control(case)), case);
        }
    }
}
