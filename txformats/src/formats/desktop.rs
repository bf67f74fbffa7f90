//! Support for freedesktop `.desktop` entries.
//!
//! Unlike the other formats, a desktop entry is its own multi-language
//! container: `Name=...` is the source string and `Name[de]=...` lines hold
//! the translations. Parsing a source file extracts only the bare keys;
//! compiling appends one localized line per translated language.
//!
//! See <https://standards.freedesktop.org/desktop-entry-spec/latest/>.

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{CompileContext, FormatPlugin, ParseInput, ParseSink};
use crate::language::{self, PluralRule};
use crate::store::StringStore;

/// The localestring keys translators get to work on.
const LOCALIZED_KEYS: [&str; 4] = ["Name", "GenericName", "Comment", "Icon"];

const DELIMITER: char = '=';

pub struct DesktopFormat;

impl DesktopFormat {
    fn is_comment_line(line: &str) -> bool {
        line.starts_with('#')
    }

    fn is_empty_line(line: &str) -> bool {
        line.trim().is_empty()
    }

    fn is_group_header_line(line: &str) -> bool {
        line.starts_with('[') && line.ends_with(']')
    }

    fn should_skip(line: &str) -> bool {
        Self::is_empty_line(line)
            || Self::is_comment_line(line)
            || Self::is_group_header_line(line)
            || !line.contains(DELIMITER)
    }

    /// Reduces a `lang_COUNTRY.ENCODING@MODIFIER` locale to
    /// `lang_COUNTRY@MODIFIER`: the encoding part is never significant.
    fn lang_code_of(locale: &str) -> String {
        let (base, modifier) = match locale.find('@') {
            Some(at) => (&locale[..at], &locale[at..]),
            None => (locale, ""),
        };
        let base = match base.find('.') {
            Some(dot) => &base[..dot],
            None => base,
        };
        format!("{}{}", base, modifier)
    }

    /// The locale part of a `Key[locale]` key.
    fn locale_of(key: &str) -> &str {
        match (key.find('['), key.ends_with(']')) {
            (Some(open), true) => &key[open + 1..key.len() - 1],
            _ => "",
        }
    }

    /// Appends one `Key[lang]=value` line per translated entity.
    fn append_language_lines(
        &self,
        buf: &mut String,
        ctx: &CompileContext<'_>,
        language_code: &str,
    ) -> Result<(), Error> {
        let translations = ctx
            .store
            .list_translations(&ctx.resource.slug, language_code)?;
        for entity in ctx.strings {
            let translated = translations.iter().find(|t| {
                t.source_entity == entity.id
                    && t.rule == PluralRule::Other
                    && !t.string.is_empty()
            });
            if let Some(translation) = translated {
                buf.push_str(&entity.string);
                buf.push('[');
                buf.push_str(language_code);
                buf.push_str("]=");
                buf.push_str(&ctx.decorate(translation.string.clone()));
                buf.push('\n');
            }
        }
        Ok(())
    }
}

impl FormatPlugin for DesktopFormat {
    fn method(&self) -> &'static str {
        "DESKTOP"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let mut template = String::new();
        let mut entries: Vec<(String, String, Option<String>)> = Vec::new();

        for line in input.content.lines() {
            if Self::should_skip(line) {
                template.push_str(line);
                template.push('\n');
                continue;
            }
            let (key, value) = line.split_once(DELIMITER).expect("checked by should_skip");

            let (actual_key, lang_code) = if key.contains('[') {
                let actual_key = &key[..key.find('[').expect("checked")];
                let locale = Self::locale_of(key);
                let lang_code = Self::lang_code_of(locale);
                if lang_code == "x-test" {
                    // Test locale, not a real translation; keep verbatim.
                    template.push_str(line);
                    template.push('\n');
                    continue;
                }
                let language = language::lookup(&lang_code).map_err(|_| {
                    Error::parse_error(
                        self.method(),
                        format!("unknown language specified: {}", lang_code),
                    )
                })?;
                (actual_key.to_string(), Some(language.code))
            } else {
                template.push_str(line);
                template.push('\n');
                (key.to_string(), None)
            };

            if !LOCALIZED_KEYS.contains(&actual_key.as_str()) {
                // Only standard localestring keys are translated.
                continue;
            }
            entries.push((actual_key, value.to_string(), lang_code));
        }

        template.push_str("\n# Translations\n");

        for (key, value, lang_code) in entries {
            match (&lang_code, input.is_source) {
                // Skip other languages when parsing a source file.
                (Some(_), true) => continue,
                // Skip languages other than the one being parsed for.
                (Some(code), false) if code != &input.language.code => continue,
                (None, false) => continue,
                _ => {}
            }
            sink.add_translation(GenericTranslation::new(key, value, Context::None));
        }
        Ok(template)
    }

    /// Compiling the source file rebuilds the multi-language container:
    /// every translated language contributes its lines. Compiling for one
    /// language appends that language's lines only.
    fn compile(&self, content: String, ctx: &CompileContext<'_>) -> Result<String, Error> {
        let mut buf = content;
        if ctx.is_source_language() {
            for code in ctx.store.available_languages(&ctx.resource.slug)? {
                if code == ctx.source_language.code {
                    continue;
                }
                self.append_language_lines(&mut buf, ctx, &code)?;
            }
        } else {
            self.append_language_lines(&mut buf, ctx, &ctx.language.code)?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;

    const SOURCE: &str = "[Desktop Entry]\nType=Application\nName=Editor\nGenericName=Text Editor\nName[de]=Bearbeiter\nComment=Edit files\nExec=editor %f\n";

    fn parse(content: &str, is_source: bool, lang: &str) -> (ParseSink, String) {
        let language = language::lookup(lang).unwrap();
        let input = ParseInput {
            content,
            is_source,
            language: &language,
        };
        let mut sink = ParseSink::default();
        let template = DesktopFormat.parse(&input, &mut sink).unwrap();
        (sink, template)
    }

    #[test]
    fn test_source_parse_extracts_bare_keys_only() {
        let (sink, _) = parse(SOURCE, true, "en");
        let strings = &sink.stringset.strings;
        let keys: Vec<&str> = strings.iter().map(|s| s.source_entity.as_str()).collect();
        assert_eq!(keys, vec!["Name", "GenericName", "Comment"]);
        assert_eq!(strings[0].translation, "Editor");
    }

    #[test]
    fn test_translation_parse_picks_one_language() {
        let (sink, _) = parse(SOURCE, false, "de");
        let strings = &sink.stringset.strings;
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].source_entity, "Name");
        assert_eq!(strings[0].translation, "Bearbeiter");
    }

    #[test]
    fn test_template_drops_translation_lines() {
        let (_, template) = parse(SOURCE, true, "en");
        assert!(template.contains("Name=Editor"));
        assert!(!template.contains("Name[de]"));
        assert!(template.contains("Exec=editor %f"));
        assert!(template.ends_with("\n# Translations\n"));
    }

    #[test]
    fn test_locale_decomposition() {
        assert_eq!(DesktopFormat::lang_code_of("sr_RS.UTF-8@latin"), "sr_RS@latin");
        assert_eq!(DesktopFormat::lang_code_of("de.UTF-8"), "de");
        assert_eq!(DesktopFormat::lang_code_of("fr"), "fr");
    }

    #[test]
    fn test_x_test_locale_preserved_verbatim() {
        let content = "Name=Editor\nName[x-test]=xxEditorxx\n";
        let (sink, template) = parse(content, true, "en");
        assert_eq!(sink.stringset.len(), 1);
        assert!(template.contains("Name[x-test]=xxEditorxx"));
    }

    #[test]
    fn test_unknown_language_fails() {
        let language = language::lookup("en").unwrap();
        let input = ParseInput {
            content: "Name=Editor\nName[zz-wat]=broken\n",
            is_source: true,
            language: &language,
        };
        let mut sink = ParseSink::default();
        let result = DesktopFormat.parse(&input, &mut sink);
        assert!(matches!(
            result,
            Err(Error::Parse {
                format: "DESKTOP",
                ..
            })
        ));
    }

    #[test]
    fn test_non_localized_keys_ignored() {
        let (sink, template) = parse("Exec=run\nType=Application\n", true, "en");
        assert!(sink.stringset.is_empty());
        assert!(template.contains("Exec=run"));
    }
}
