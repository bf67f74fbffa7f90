//! Support for Java `.properties` translation files.
//!
//! A line holds `key<sep>value`, where the separator is the first unescaped
//! whitespace, `=` or `:`. A trailing unescaped backslash continues the
//! value on the next line. Keys keep their escaped form; values are
//! unescaped on the way in and re-escaped on the way out.

use std::collections::HashMap;

use crate::context::Context;
use crate::error::Error;
use crate::formats::{find_linesep, is_escaped};
use crate::handler::{FormatPlugin, ParseInput, ParseSink};
use crate::hash::{hash_tag, tr_placeholder};
use crate::collections::GenericTranslation;

const SEPARATORS: [char; 5] = [' ', '\t', '\u{0c}', '=', ':'];

pub struct PropertiesFormat;

impl FormatPlugin for PropertiesFormat {
    fn method(&self) -> &'static str {
        "PROPERTIES"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        parse_properties(self, input, sink)
    }

    fn escape(&self, string: &str) -> String {
        let mut out = String::with_capacity(string.len());
        for c in string.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                ':' => out.push_str("\\:"),
                '=' => out.push_str("\\="),
                _ => out.push(c),
            }
        }
        out
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
                Some(next @ (':' | '=' | '\\')) => out.push(next),
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

/// True for `#` and `!` comment lines.
fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

/// Splits a merged line at the first unescaped separator. Lines with no
/// separator are keys without values.
fn split_line(line: &str) -> (&str, Option<&str>) {
    for (i, c) in line.char_indices() {
        if SEPARATORS.contains(&c) && !is_escaped(line, i) {
            let key = &line[..i];
            let value = line[i + c.len_utf8()..].trim_start_matches(SEPARATORS);
            return (key, Some(value));
        }
    }
    (line, None)
}

/// The parse pass shared by the properties family; the plugin supplies the
/// flavor's unescape rules.
pub(crate) fn parse_properties(
    plugin: &dyn FormatPlugin,
    input: &ParseInput<'_>,
    sink: &mut ParseSink,
) -> Result<String, Error> {
    let linesep = find_linesep(input.content);
    let mut template = String::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    let mut lines = input.content.split(linesep);
    while let Some(raw) = lines.next() {
        let mut line = raw.trim().to_string();
        if line.is_empty() || is_comment(&line) {
            if input.is_source {
                template.push_str(&line);
                template.push_str(linesep);
            }
            continue;
        }

        // A trailing unescaped backslash continues the value on the next
        // line.
        while line.ends_with('\\') && !is_escaped(&line, line.len() - 1) {
            let next = lines.next().unwrap_or("").trim();
            line.pop();
            line.push_str(next);
        }

        let (key, value) = split_line(&line);
        let value = match value {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => {
                // Keys with no value are kept in the template but never
                // shown to translators.
                if input.is_source {
                    template.push_str(&line);
                    template.push_str(linesep);
                }
                continue;
            }
        };
        let key = key.to_string();

        if input.is_source {
            let placeholder = tr_placeholder(&hash_tag(&key, &Context::None));
            let tail = line[key.len()..].replace(&value, &placeholder);
            template.push_str(&key);
            template.push_str(&tail);
            template.push_str(linesep);
        }

        // Duplicate keys: the last occurrence wins.
        if let Some(&previous) = seen.get(&key) {
            sink.stringset.strings.remove(previous);
            for index in seen.values_mut() {
                if *index > previous {
                    *index -= 1;
                }
            }
        }
        seen.insert(key.clone(), sink.stringset.len());
        sink.add_translation(GenericTranslation::new(
            key,
            plugin.unescape(&value),
            Context::None,
        ));
    }
    Ok(template)
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
        let template = PropertiesFormat.parse(&input, &mut sink).unwrap();
        (sink, template)
    }

    #[test]
    fn test_parse_basic_pairs() {
        let (sink, _) = parse("a=1\nb : 2\nc\tthree\n", true);
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 3);
        assert_eq!(strings[0].source_entity, "a");
        assert_eq!(strings[0].translation, "1");
        assert_eq!(strings[1].translation, "2");
        assert_eq!(strings[2].translation, "three");
    }

    #[test]
    fn test_escaped_separator_stays_in_key() {
        let (sink, _) = parse("Key21\\:WithColon : Value21\n", true);
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].source_entity, "Key21\\:WithColon");
        assert_eq!(strings[0].translation, "Value21");
    }

    #[test]
    fn test_template_replaces_value_with_placeholder() {
        let (_, template) = parse("greeting=Hello\n", true);
        let placeholder = tr_placeholder(&hash_tag("greeting", &Context::None));
        assert_eq!(template, format!("greeting={}\n", placeholder));
    }

    #[test]
    fn test_comments_and_blanks_preserved_in_template() {
        let (sink, template) = parse("# header\n\n! note\nkey=value\n", true);
        assert_eq!(sink.stringset.len(), 1);
        assert!(template.starts_with("# header\n\n! note\n"));
    }

    #[test]
    fn test_continuation_lines_merge() {
        let (sink, _) = parse("key=first \\\n    second\n", true);
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].translation, "first second");
    }

    #[test]
    fn test_key_without_value_not_extracted() {
        let (sink, template) = parse("lonely\nkey=value\n", true);
        assert_eq!(sink.stringset.len(), 1);
        assert!(template.contains("lonely"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let (sink, _) = parse("a=first\nb=middle\na=second\n", true);
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].source_entity, "b");
        assert_eq!(strings[1].source_entity, "a");
        assert_eq!(strings[1].translation, "second");
    }

    #[test]
    fn test_escape_round_trip() {
        let plugin = PropertiesFormat;
        let cases = [
            "key\\:with\\=escapes",
            "plain",
            "back\\slash",
            "a:b=c",
        ];
        for case in cases {
            assert_eq!(plugin.unescape(&plugin.escape(case)), case);
        }
    }

    #[test]
    fn test_unescape_keeps_unknown_escapes() {
        let plugin = PropertiesFormat;
        assert_eq!(plugin.unescape("a\\nb"), "a\\nb");
        assert_eq!(plugin.unescape("a\\:b"), "a:b");
    }

    #[test]
    fn test_windows_linesep_preserved() {
        let (_, template) = parse("# c\r\nkey=value\r\n", true);
        assert!(template.contains("\r\n"));
    }
}
