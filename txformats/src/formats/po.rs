//! Support for gettext PO and POT files.
//!
//! The parser is a line-based state machine over the PO grammar: comment
//! lines (`#`, `#.`, `#:`, `#,`, `#~`), `msgctxt`/`msgid`/`msgid_plural`
//! keywords, indexed `msgstr[n]` forms and quoted-string continuation
//! lines. Fuzzy entries become suggestions instead of translations;
//! obsolete entries ride along in the template but are never imported. POT
//! is the same grammar compiled with empty translations.

use lazy_static::lazy_static;
use regex::Regex;

use crate::collections::GenericTranslation;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{CompileContext, FormatPlugin, ParseInput, ParseSink};
use crate::hash::{hash_tag, plural_placeholder, tr_placeholder};
use crate::language::PluralRule;

lazy_static! {
    /// A run of consecutive plural placeholder lines, starting at form 0.
    static ref PLURAL_BLOCK_RE: Regex = Regex::new(
        r#"(?m)^msgstr\[0\] "(?P<hash>[0-9a-f]{32})_pl_\d"(?:\r?\nmsgstr\[\d+\] "[0-9a-f]{32}_pl_\d")*"#
    )
    .expect("valid plural block regex");
    /// The Language: line inside the header entry.
    static ref HEADER_LANGUAGE_RE: Regex =
        Regex::new(r#"(?m)^"Language: [^"]*\\n"$"#).expect("valid header regex");
}

pub struct PoFormat {
    pot: bool,
}

impl PoFormat {
    /// The PO flavor: parses and compiles translated catalogs.
    pub fn po() -> Self {
        PoFormat { pot: false }
    }

    /// The POT flavor: same grammar, compiled with empty translations.
    pub fn pot() -> Self {
        PoFormat { pot: true }
    }

    fn err(&self, reason: impl Into<String>) -> Error {
        Error::parse_error(self.method(), reason)
    }
}

pub fn escape_po(string: &str) -> String {
    let mut out = String::with_capacity(string.len());
    for c in string.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_po(string: &str) -> String {
    let mut out = String::with_capacity(string.len());
    let mut chars = string.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
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

/// Which quoted field a continuation line extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr(usize),
}

/// One catalog entry under construction.
#[derive(Debug, Default)]
struct Entry {
    /// Entry lines verbatim, for header/obsolete passthrough.
    raw_lines: Vec<String>,

    /// Entry lines excluding msgstr lines, for template emission.
    kept_lines: Vec<String>,

    developer_comments: Vec<String>,
    references: Vec<String>,
    flags: Option<String>,
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstrs: Vec<(usize, String)>,
    obsolete: bool,
    field: Option<Field>,
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.raw_lines.is_empty()
    }

    fn is_header(&self) -> bool {
        self.msgid.as_deref() == Some("") && !self.obsolete
    }

    fn fuzzy(&self) -> bool {
        self.flags
            .as_deref()
            .map(|flags| flags.split(',').any(|flag| flag.trim() == "fuzzy"))
            .unwrap_or(false)
    }

    fn append_to_field(&mut self, piece: &str) -> Result<(), Error> {
        let target = match self.field {
            Some(Field::Msgctxt) => self.msgctxt.as_mut(),
            Some(Field::Msgid) => self.msgid.as_mut(),
            Some(Field::MsgidPlural) => self.msgid_plural.as_mut(),
            Some(Field::Msgstr(index)) => self
                .msgstrs
                .iter_mut()
                .find(|(i, _)| *i == index)
                .map(|(_, value)| value),
            None => None,
        };
        match target {
            Some(value) => {
                value.push_str(piece);
                Ok(())
            }
            None => Err(Error::parse_error(
                "PO",
                "string continuation without a preceding keyword",
            )),
        }
    }
}

/// Extracts the escaped payload of a quoted line.
fn quoted_payload(format: &'static str, line: &str) -> Result<String, Error> {
    let start = line
        .find('"')
        .ok_or_else(|| Error::parse_error(format, format!("expected quoted string: {:?}", line)))?;
    let end = line.rfind('"').expect("find succeeded");
    if end <= start {
        return Err(Error::parse_error(
            format,
            format!("unbalanced quotes: {:?}", line),
        ));
    }
    Ok(line[start + 1..end].to_string())
}

impl PoFormat {
    fn finalize(
        &self,
        entry: Entry,
        input: &ParseInput<'_>,
        sink: &mut ParseSink,
        template: &mut String,
    ) -> Result<(), Error> {
        if entry.is_empty() {
            return Ok(());
        }

        if entry.is_header() || entry.obsolete || entry.msgid.is_none() {
            // Header, obsolete entries and trailing comments pass through
            // verbatim.
            if entry.is_header() {
                if let Some(code) = header_language(&entry) {
                    sink.stringset.target_language = Some(code);
                }
            }
            for line in &entry.raw_lines {
                template.push_str(line);
                template.push('\n');
            }
            return Ok(());
        }

        let msgid = unescape_po(entry.msgid.as_deref().expect("checked above"));
        let context = match &entry.msgctxt {
            Some(msgctxt) => Context::single(unescape_po(msgctxt)),
            None => Context::None,
        };
        let occurrences = (!entry.references.is_empty())
            .then(|| entry.references.join(", "));
        let comment = (!entry.developer_comments.is_empty())
            .then(|| entry.developer_comments.join("\n"));
        let flags = entry.flags.clone();
        let fuzzy = entry.fuzzy();
        let hash = hash_tag(&msgid, &context);

        for line in &entry.kept_lines {
            template.push_str(line);
            template.push('\n');
        }

        match &entry.msgid_plural {
            Some(msgid_plural) => {
                let msgid_plural = unescape_po(msgid_plural);
                let rules = input.language.plural_rules();
                if entry.msgstrs.len() != rules.len() {
                    return Err(self.err(format!(
                        "plural entry {:?} has {} msgstr forms, the language needs {}",
                        msgid,
                        entry.msgstrs.len(),
                        rules.len()
                    )));
                }
                for (index, rule) in rules.iter().enumerate() {
                    template.push_str(&format!(
                        "msgstr[{}] \"{}\"\n",
                        index,
                        plural_placeholder(&hash, *rule)
                    ));

                    let form = entry
                        .msgstrs
                        .iter()
                        .find(|(i, _)| *i == index)
                        .map(|(_, value)| unescape_po(value))
                        .unwrap_or_default();
                    let translation = if input.is_source && form.is_empty() {
                        if *rule == PluralRule::One {
                            msgid.clone()
                        } else {
                            msgid_plural.clone()
                        }
                    } else {
                        form
                    };
                    if translation.is_empty() {
                        continue;
                    }
                    let parsed = GenericTranslation::new(&msgid, translation, context.clone())
                        .with_occurrences(occurrences.clone())
                        .with_comment(comment.clone())
                        .with_flags(flags.clone())
                        .with_rule(*rule)
                        .pluralized(true)
                        .fuzzy(fuzzy);
                    if fuzzy && !input.is_source {
                        sink.add_suggestion(parsed);
                    } else {
                        sink.add_translation(parsed);
                    }
                }
            }
            None => {
                template.push_str(&format!("msgstr \"{}\"\n", tr_placeholder(&hash)));

                let msgstr = entry
                    .msgstrs
                    .first()
                    .map(|(_, value)| unescape_po(value))
                    .unwrap_or_default();
                let translation = if input.is_source && msgstr.is_empty() {
                    msgid.clone()
                } else {
                    msgstr
                };
                if translation.is_empty() {
                    return Ok(());
                }
                let parsed = GenericTranslation::new(&msgid, translation, context)
                    .with_occurrences(occurrences)
                    .with_comment(comment)
                    .with_flags(flags)
                    .fuzzy(fuzzy);
                if fuzzy && !input.is_source {
                    sink.add_suggestion(parsed);
                } else {
                    sink.add_translation(parsed);
                }
            }
        }
        Ok(())
    }
}

/// The `Language:` value of the header entry, if present.
fn header_language(entry: &Entry) -> Option<String> {
    let header = entry
        .msgstrs
        .first()
        .map(|(_, value)| unescape_po(value))?;
    header.lines().find_map(|line| {
        line.strip_prefix("Language:")
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
    })
}

impl FormatPlugin for PoFormat {
    fn method(&self) -> &'static str {
        if self.pot { "POT" } else { "PO" }
    }

    /// A POT handler serves resources declared as PO, and vice versa.
    fn accepts(&self, method: &str) -> bool {
        method == "PO" || method == "POT"
    }

    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error> {
        let mut template = String::new();
        let mut entry = Entry::default();

        for line in input.content.lines() {
            let trimmed = line.trim_end();

            if trimmed.trim().is_empty() {
                let finished = std::mem::take(&mut entry);
                self.finalize(finished, input, sink, &mut template)?;
                template.push('\n');
                continue;
            }

            entry.raw_lines.push(trimmed.to_string());

            if trimmed.starts_with("#~") {
                entry.obsolete = true;
                continue;
            }
            if trimmed.starts_with('#') {
                entry.kept_lines.push(trimmed.to_string());
                if let Some(comment) = trimmed.strip_prefix("#.") {
                    entry.developer_comments.push(comment.trim().to_string());
                } else if let Some(reference) = trimmed.strip_prefix("#:") {
                    entry
                        .references
                        .extend(reference.split_whitespace().map(str::to_string));
                } else if let Some(flags) = trimmed.strip_prefix("#,") {
                    entry.flags = Some(flags.trim().to_string());
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("msgctxt") {
                entry.msgctxt = Some(quoted_payload(self.method(), rest)?);
                entry.field = Some(Field::Msgctxt);
                entry.kept_lines.push(trimmed.to_string());
            } else if let Some(rest) = trimmed.strip_prefix("msgid_plural") {
                entry.msgid_plural = Some(quoted_payload(self.method(), rest)?);
                entry.field = Some(Field::MsgidPlural);
                entry.kept_lines.push(trimmed.to_string());
            } else if let Some(rest) = trimmed.strip_prefix("msgid") {
                if entry.msgid.is_some() {
                    return Err(self.err("msgid without separating blank line"));
                }
                entry.msgid = Some(quoted_payload(self.method(), rest)?);
                entry.field = Some(Field::Msgid);
                entry.kept_lines.push(trimmed.to_string());
            } else if let Some(rest) = trimmed.strip_prefix("msgstr[") {
                let close = rest
                    .find(']')
                    .ok_or_else(|| self.err("malformed msgstr index"))?;
                let index: usize = rest[..close]
                    .parse()
                    .map_err(|_| self.err("malformed msgstr index"))?;
                entry
                    .msgstrs
                    .push((index, quoted_payload(self.method(), &rest[close + 1..])?));
                entry.field = Some(Field::Msgstr(index));
            } else if let Some(rest) = trimmed.strip_prefix("msgstr") {
                entry.msgstrs.push((0, quoted_payload(self.method(), rest)?));
                entry.field = Some(Field::Msgstr(0));
            } else if trimmed.starts_with('"') {
                let piece = quoted_payload(self.method(), trimmed)?;
                entry.append_to_field(&piece)?;
                // Continuations of non-msgstr fields stay in the template.
                if !matches!(entry.field, Some(Field::Msgstr(_))) {
                    entry.kept_lines.push(trimmed.to_string());
                }
            } else {
                return Err(self.err(format!("unparsable line: {:?}", trimmed)));
            }
        }

        let finished = std::mem::take(&mut entry);
        self.finalize(finished, input, sink, &mut template)?;
        Ok(template)
    }

    fn escape(&self, string: &str) -> String {
        escape_po(string)
    }

    fn unescape(&self, string: &str) -> String {
        unescape_po(string)
    }

    /// Rewrites the header language and expands plural placeholder blocks
    /// to the target language's form count.
    fn examine_content(
        &self,
        content: String,
        ctx: &CompileContext<'_>,
    ) -> Result<String, Error> {
        if self.pot {
            return Ok(content);
        }
        let content = HEADER_LANGUAGE_RE
            .replace(&content, format!("\"Language: {}\\n\"", ctx.language.code))
            .into_owned();
        if ctx.is_source_language() {
            return Ok(content);
        }
        let rules = ctx.language.plural_rules();
        let content = PLURAL_BLOCK_RE.replace_all(&content, |caps: &regex::Captures<'_>| {
            let hash = &caps["hash"];
            rules
                .iter()
                .enumerate()
                .map(|(index, rule)| {
                    format!("msgstr[{}] \"{}\"", index, plural_placeholder(hash, *rule))
                })
                .collect::<Vec<_>>()
                .join("\n")
        });
        Ok(content.into_owned())
    }

    fn compile(&self, content: String, ctx: &CompileContext<'_>) -> Result<String, Error> {
        let mut content = content;
        for entity in ctx.strings {
            if entity.pluralized {
                // The template (or its expanded form) can carry any rule
                // suffix; resolve each one explicitly.
                for rule in [
                    PluralRule::Zero,
                    PluralRule::One,
                    PluralRule::Two,
                    PluralRule::Few,
                    PluralRule::Many,
                    PluralRule::Other,
                ] {
                    let translation = if self.pot {
                        ""
                    } else {
                        ctx.translation(entity.id, rule)
                    };
                    let replacement = ctx.decorate(self.escape(translation));
                    content = content.replace(
                        &plural_placeholder(&entity.string_hash, rule),
                        &replacement,
                    );
                }
            } else {
                let translation = if self.pot {
                    ""
                } else {
                    ctx.translation(entity.id, PluralRule::Other)
                };
                let replacement = ctx.decorate(self.escape(translation));
                content =
                    content.replace(&tr_placeholder(&entity.string_hash), &replacement);
            }
        }
        Ok(content)
    }
}
