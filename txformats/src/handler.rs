//! The abstract parse → diff → persist → compile lifecycle.
//!
//! A [`Handler`] owns the state of one import or export: the bound content,
//! resource and language, the stringset produced by parsing, and the template
//! generated from source-language files. The grammar of each file format
//! lives in a [`FormatPlugin`]; the handler drives the shared policy around
//! it: what gets saved, what gets skipped, when hooks fire, and how
//! failures roll back.
//!
//! Handler instances are bound to one resource + one language and are not
//! meant to be shared across threads.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::collections::{
    GenericTranslation, SourceEntityCollection, StringSet, TranslationCollection,
};
use crate::error::Error;
use crate::hash::tr_placeholder;
use crate::language::{self, Language, PluralRule};
use crate::store::{
    EntityId, NewSourceEntity, Resource, ResourceEvents, SourceEntityRecord, Storage,
    StringStore, SuggestionSink, TemplateStore,
};

/// Decorator applied to every substituted translation when exporting
/// pseudo-localized files.
pub trait PseudoType {
    fn compile(&self, string: &str) -> String;
}

/// Everything a format needs to parse one file.
pub struct ParseInput<'a> {
    /// The decoded file content.
    pub content: &'a str,

    /// True when the file is the resource's source-language file.
    pub is_source: bool,

    /// The language the file is being parsed for. For source files this is
    /// the resource's source language; plural-aware formats size their
    /// groups from its rules.
    pub language: &'a Language,
}

/// Collects the strings a parse pass extracts.
#[derive(Debug, Default)]
pub struct ParseSink {
    /// Authoritative extracted strings.
    pub stringset: StringSet,

    /// Strings demoted to suggestions (e.g. fuzzy gettext entries).
    pub suggestions: StringSet,
}

impl ParseSink {
    pub fn add_translation(&mut self, string: GenericTranslation) {
        self.stringset.add(string);
    }

    pub fn add_suggestion(&mut self, string: GenericTranslation) {
        self.suggestions.add(string);
    }
}

/// Everything a format needs to compile one template.
pub struct CompileContext<'a> {
    pub resource: &'a Resource,

    /// The language being compiled for.
    pub language: &'a Language,

    /// The resource's source language.
    pub source_language: &'a Language,

    /// All source entities of the resource.
    pub strings: &'a [SourceEntityRecord],

    /// Translations for `language`, keyed by (entity id, rule).
    pub translations: &'a HashMap<(EntityId, PluralRule), String>,

    /// Read-only store access, for formats that need more than the
    /// preloaded translations (e.g. desktop entries pulling every language).
    pub store: &'a dyn Storage,

    /// Optional pseudo-localization decorator.
    pub pseudo: Option<&'a dyn PseudoType>,
}

impl CompileContext<'_> {
    /// The translation for one (entity, rule) pair; empty if untranslated.
    pub fn translation(&self, entity: EntityId, rule: PluralRule) -> &str {
        self.translations
            .get(&(entity, rule))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// True when compiling the resource's source-language file.
    pub fn is_source_language(&self) -> bool {
        self.language.code == self.source_language.code
    }

    /// Applies the pseudo-localization decorator, if one is bound.
    pub fn decorate(&self, string: String) -> String {
        match self.pseudo {
            Some(pseudo) => pseudo.compile(&string),
            None => string,
        }
    }
}

/// Replaces every singular placeholder in `content` with its (escaped,
/// decorated) translation, in one left-to-right pass over the entities.
pub fn substitute_placeholders<F>(
    content: String,
    ctx: &CompileContext<'_>,
    escape: F,
) -> String
where
    F: Fn(&str) -> String,
{
    let mut content = content;
    for entity in ctx.strings {
        let translation = ctx.translation(entity.id, PluralRule::Other);
        let replacement = ctx.decorate(escape(translation));
        content = content.replace(&tr_placeholder(&entity.string_hash), &replacement);
    }
    content
}

/// The grammar-specific half of a handler. One implementation per format.
pub trait FormatPlugin {
    /// The registered i18n method name of this format.
    fn method(&self) -> &'static str;

    /// Whether this plugin accepts resources declared with `method`.
    fn accepts(&self, method: &str) -> bool {
        method == self.method()
    }

    /// Decodes raw file bytes into text. The default is BOM-aware with a
    /// UTF-8 fallback.
    fn decode(&self, raw: &[u8]) -> Result<String, Error> {
        decode_bytes(raw)
    }

    /// Encodes compiled text into the bytes of the output file.
    fn encode(&self, compiled: &str) -> Vec<u8> {
        compiled.as_bytes().to_vec()
    }

    /// Pre-parse content check; the default accepts everything.
    fn check_content(&self, _content: &str) -> Result<(), Error> {
        Ok(())
    }

    /// Parses the content, filling the sink, and returns the template text
    /// (the file with every translatable value replaced by a placeholder).
    fn parse(&self, input: &ParseInput<'_>, sink: &mut ParseSink) -> Result<String, Error>;

    /// Escapes special characters before a translation enters a file.
    fn escape(&self, string: &str) -> String {
        string.to_string()
    }

    /// Reverses [`FormatPlugin::escape`].
    fn unescape(&self, string: &str) -> String {
        string.to_string()
    }

    /// Chance to rewrite the template before substitution (e.g. expanding
    /// plural groups for the target language).
    fn examine_content(
        &self,
        content: String,
        _ctx: &CompileContext<'_>,
    ) -> Result<String, Error> {
        Ok(content)
    }

    /// Substitutes placeholders with translations.
    fn compile(&self, content: String, ctx: &CompileContext<'_>) -> Result<String, Error> {
        Ok(substitute_placeholders(content, ctx, |s| self.escape(s)))
    }

    /// Chance to post-process the compiled output (e.g. stripping empty
    /// target nodes).
    fn post_compile(
        &self,
        content: String,
        _ctx: &CompileContext<'_>,
    ) -> Result<String, Error> {
        Ok(content)
    }
}

/// Decodes bytes BOM-aware (UTF-8/UTF-16 BOMs honored, plain UTF-8
/// passthrough otherwise).
pub fn decode_bytes(raw: &[u8]) -> Result<String, Error> {
    let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
        .bom_override(true)
        .build(std::io::Cursor::new(raw));
    let mut decoded = String::new();
    decoder
        .read_to_string(&mut decoded)
        .map_err(|e| Error::content_error(e.to_string()))?;
    Ok(decoded)
}

/// The typed result of a `save2db` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The batch committed.
    Saved { added: u64, updated: u64, deleted: u64 },

    /// The diff loop failed; the store was rolled back and nothing changed.
    RolledBack { reason: String },
}

impl SaveOutcome {
    /// The (added, updated) pair; zero for a rolled-back save.
    pub fn counts(&self) -> (u64, u64) {
        match self {
            SaveOutcome::Saved { added, updated, .. } => (*added, *updated),
            SaveOutcome::RolledBack { .. } => (0, 0),
        }
    }
}

/// Drives the parse → diff → persist → compile lifecycle for one format.
pub struct Handler {
    plugin: Box<dyn FormatPlugin>,
    filename: Option<PathBuf>,
    content: Option<String>,
    resource: Option<Resource>,
    language: Option<Language>,
    pseudo: Option<Box<dyn PseudoType>>,
    stringset: Option<StringSet>,
    suggestions: StringSet,
    template: Option<Vec<u8>>,
    compiled: Option<Vec<u8>>,
}

impl Handler {
    pub fn new(plugin: Box<dyn FormatPlugin>) -> Self {
        Handler {
            plugin,
            filename: None,
            content: None,
            resource: None,
            language: None,
            pseudo: None,
            stringset: None,
            suggestions: StringSet::new(),
            template: None,
            compiled: None,
        }
    }

    pub fn method(&self) -> &'static str {
        self.plugin.method()
    }

    /// Binds raw content to the handler, decoding it with the format's
    /// encoding rules.
    pub fn bind_content(&mut self, raw: &[u8]) -> Result<(), Error> {
        self.content = Some(self.plugin.decode(raw)?);
        Ok(())
    }

    /// Binds a file to the handler. A missing file is a content error.
    pub fn bind_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if !path.is_file() {
            let msg = format!("specified file {} does not exist", path.display());
            error!("{}", msg);
            return Err(Error::content_error(msg));
        }
        let raw = std::fs::read(path)?;
        self.bind_content(&raw)?;
        self.filename = Some(path.to_path_buf());
        Ok(())
    }

    /// Binds a resource. The resource's declared method must be one this
    /// handler's format accepts; the handler's language defaults to the
    /// resource's source language.
    pub fn bind_resource(&mut self, resource: Resource) -> Result<(), Error> {
        if !self.plugin.accepts(&resource.i18n_method) {
            let msg = format!(
                "resource {} is declared as {}, not {}",
                resource.slug,
                resource.i18n_method,
                self.plugin.method()
            );
            error!("{}", msg);
            return Err(Error::InvalidResource(msg));
        }
        if self.language.is_none() {
            self.language = Some(language::lookup(&resource.source_language)?);
        }
        self.resource = Some(resource);
        Ok(())
    }

    /// Sets the handler's language by code or alias.
    pub fn set_language(&mut self, code: &str) -> Result<(), Error> {
        self.language = Some(language::lookup(code)?);
        Ok(())
    }

    pub fn set_language_value(&mut self, language: Language) {
        self.language = Some(language);
    }

    /// Binds a pseudo-localization decorator for compiled output.
    pub fn bind_pseudo_type(&mut self, pseudo: Box<dyn PseudoType>) {
        self.pseudo = Some(pseudo);
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    pub fn stringset(&self) -> Option<&StringSet> {
        self.stringset.as_ref()
    }

    pub fn suggestions(&self) -> &StringSet {
        &self.suggestions
    }

    pub fn template(&self) -> Option<&[u8]> {
        self.template.as_deref()
    }

    pub fn compiled(&self) -> Option<&[u8]> {
        self.compiled.as_deref()
    }

    /// Checks whether the bound content is valid for the format.
    pub fn is_content_valid(&self) -> Result<(), Error> {
        let content = self.need_content()?;
        self.plugin.check_content(content)
    }

    fn need_content(&self) -> Result<&str, Error> {
        self.content
            .as_deref()
            .ok_or_else(|| Error::state_error("no content bound"))
    }

    fn need_language(&self) -> Result<&Language, Error> {
        self.language
            .as_ref()
            .ok_or_else(|| Error::state_error("no language set"))
    }

    fn need_resource(&self) -> Result<&Resource, Error> {
        self.resource
            .as_ref()
            .ok_or_else(|| Error::state_error("no resource bound"))
    }

    /// Parses the bound content.
    ///
    /// Fills the stringset (and suggestions), and, for source files, stores
    /// the generated template. Parse errors are logged and re-raised; they
    /// leave any previously saved data untouched.
    pub fn parse_file(&mut self, is_source: bool) -> Result<(), Error> {
        let content = self.need_content()?;
        let language = self.need_language()?;
        self.plugin.check_content(content)?;

        let input = ParseInput {
            content,
            is_source,
            language,
        };
        let mut sink = ParseSink::default();
        let template = match self.plugin.parse(&input, &mut sink) {
            Ok(template) => template,
            Err(e) => {
                error!(
                    method = self.plugin.method(),
                    "error when parsing file: {}", e
                );
                return Err(e);
            }
        };

        self.stringset = Some(sink.stringset);
        self.suggestions = sink.suggestions;
        if is_source {
            self.template = Some(template.into_bytes());
        }
        Ok(())
    }

    /// Saves the parsed stringset to the store.
    ///
    /// The whole diff runs inside one transaction. A failure during the diff
    /// rolls everything back and returns [`SaveOutcome::RolledBack`], the
    /// fail-soft path. A failure in the post-save hook also rolls back but is
    /// re-raised as an error, since it indicates an integration bug rather
    /// than bad input.
    pub fn save2db(
        &mut self,
        store: &mut dyn Storage,
        events: &mut dyn ResourceEvents,
        is_source: bool,
        user: Option<&str>,
        overwrite_translations: bool,
    ) -> Result<SaveOutcome, Error> {
        let resource = self.need_resource()?.clone();
        let language = self.need_language()?.clone();
        if self.stringset.is_none() {
            return Err(Error::state_error("parse_file must run before save2db"));
        }

        store.begin()?;
        let result = if is_source {
            self.save_source(store, &resource, &language, user, overwrite_translations)
        } else {
            self.save_translation(store, &resource, &language, user, overwrite_translations)
        };
        let (added, updated, deleted) = match result {
            Ok(counts) => counts,
            Err(e) => {
                warn!(
                    resource = %resource.slug,
                    language = %language.code,
                    "failed to save translations: {}",
                    e
                );
                store.rollback()?;
                return Ok(SaveOutcome::RolledBack {
                    reason: e.to_string(),
                });
            }
        };

        if added + updated + deleted > 0 {
            if let Err(e) = events.on_resource_updated(
                &resource.slug,
                &language.code,
                user,
                added,
                updated,
                deleted,
            ) {
                error!(
                    resource = %resource.slug,
                    "post-save hook failed: {}", e
                );
                store.rollback()?;
                return Err(Error::PostSaveHook(e.to_string()));
            }
        }
        store.commit()?;
        debug!(
            resource = %resource.slug,
            language = %language.code,
            added,
            updated,
            deleted,
            "saved stringset"
        );
        Ok(SaveOutcome::Saved {
            added,
            updated,
            deleted,
        })
    }

    /// A translation is skipped when it is empty or when its pluralization
    /// flag disagrees with its source entity's.
    fn should_skip_translation(entity: &SourceEntityRecord, string: &GenericTranslation) -> bool {
        string.translation.is_empty() || string.pluralized != entity.pluralized
    }

    fn save_source(
        &self,
        store: &mut dyn Storage,
        resource: &Resource,
        language: &Language,
        user: Option<&str>,
        overwrite_translations: bool,
    ) -> Result<(u64, u64, u64), Error> {
        let stringset = self.stringset.as_ref().expect("checked by save2db");
        let existing = store.list_source_entities(&resource.slug)?;
        let mut remaining: Vec<SourceEntityRecord> = existing.clone();
        let mut source_entities = SourceEntityCollection::from_records(existing);
        let mut translations = TranslationCollection::from_records(
            store.list_translations(&resource.slug, &language.code)?,
        );

        let mut added = 0u64;
        let mut updated = 0u64;
        let mut position = 0u32;
        for string in &stringset.strings {
            let entity = match source_entities.get_for(string) {
                Some(found) => {
                    let mut entity = found.clone();
                    entity.flags = string.flags.clone().unwrap_or_default();
                    entity.pluralized = string.pluralized;
                    entity.developer_comment = string.comment.clone().unwrap_or_default();
                    entity.occurrences = string.occurrences.clone().unwrap_or_default();
                    store.update_source_entity(&resource.slug, &entity)?;
                    // Plural forms hit the same entity repeatedly; retain is
                    // a no-op after the first form.
                    remaining.retain(|e| e.id != entity.id);
                    source_entities.add(entity.clone());
                    entity
                }
                None => {
                    let entity = store.create_source_entity(
                        &resource.slug,
                        NewSourceEntity {
                            string: string.source_entity.clone(),
                            context: string.context.clone(),
                            pluralized: string.pluralized,
                            flags: string.flags.clone().unwrap_or_default(),
                            developer_comment: string.comment.clone().unwrap_or_default(),
                            occurrences: string.occurrences.clone().unwrap_or_default(),
                            position,
                        },
                    )?;
                    source_entities.add(entity.clone());
                    entity
                }
            };
            position += 1;

            if Self::should_skip_translation(&entity, string) {
                continue;
            }
            self.upsert_translation(
                store,
                resource,
                language,
                user,
                overwrite_translations,
                &entity,
                string,
                &mut translations,
                &mut added,
                &mut updated,
            )?;
        }

        self.demote_parse_suggestions(store, resource, &source_entities)?;

        // Entities absent from the new stringset are deleted only after the
        // pass completes; their translations become suggestions first.
        let deleted = remaining.len() as u64;
        for entity in &remaining {
            for translation in store.list_entity_translations(&resource.slug, entity.id)? {
                if translation.rule == PluralRule::Other && !translation.string.is_empty() {
                    store.demote_to_suggestion(
                        &resource.slug,
                        &entity.string,
                        &entity.context,
                        &translation.string,
                    )?;
                }
            }
            store.delete_source_entity(&resource.slug, entity.id)?;
        }

        let template = self
            .template
            .as_ref()
            .ok_or_else(|| Error::state_error("source parse produced no template"))?;
        store.set_template(&resource.slug, template)?;

        Ok((added, updated, deleted))
    }

    fn save_translation(
        &self,
        store: &mut dyn Storage,
        resource: &Resource,
        language: &Language,
        user: Option<&str>,
        overwrite_translations: bool,
    ) -> Result<(u64, u64, u64), Error> {
        let stringset = self.stringset.as_ref().expect("checked by save2db");
        let source_entities = SourceEntityCollection::from_records(
            store.list_source_entities(&resource.slug)?,
        );
        let mut translations = TranslationCollection::from_records(
            store.list_translations(&resource.slug, &language.code)?,
        );

        let mut added = 0u64;
        let mut updated = 0u64;
        for string in &stringset.strings {
            // Translations for source strings that no longer exist are
            // silently skipped; the next source import cleans them up.
            let Some(entity) = source_entities.get_for(string).cloned() else {
                continue;
            };
            if Self::should_skip_translation(&entity, string) {
                continue;
            }
            self.upsert_translation(
                store,
                resource,
                language,
                user,
                overwrite_translations,
                &entity,
                string,
                &mut translations,
                &mut added,
                &mut updated,
            )?;
        }

        self.demote_parse_suggestions(store, resource, &source_entities)?;
        Ok((added, updated, 0))
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert_translation(
        &self,
        store: &mut dyn Storage,
        resource: &Resource,
        language: &Language,
        user: Option<&str>,
        overwrite_translations: bool,
        entity: &SourceEntityRecord,
        string: &GenericTranslation,
        translations: &mut TranslationCollection,
        added: &mut u64,
        updated: &mut u64,
    ) -> Result<(), Error> {
        match translations.get(entity.id, string.rule) {
            Some(existing) if existing.string == string.translation => {}
            Some(existing) => {
                if overwrite_translations {
                    let mut translation = existing.clone();
                    translation.string = string.translation.clone();
                    translation.user = user.map(str::to_string);
                    store.update_translation(&resource.slug, &translation)?;
                    translations.add(translation);
                    *updated += 1;
                } else {
                    store.demote_to_suggestion(
                        &resource.slug,
                        &entity.string,
                        &entity.context,
                        &string.translation,
                    )?;
                }
            }
            None => {
                let translation = store.create_translation(
                    &resource.slug,
                    entity.id,
                    &language.code,
                    string.rule,
                    &string.translation,
                    user,
                )?;
                translations.add(translation);
                // Only default-rule entries count towards "strings added",
                // so the number stays meaningful to end users.
                if string.rule == PluralRule::Other {
                    *added += 1;
                }
            }
        }
        Ok(())
    }

    fn demote_parse_suggestions(
        &self,
        store: &mut dyn Storage,
        resource: &Resource,
        source_entities: &SourceEntityCollection,
    ) -> Result<(), Error> {
        for suggestion in &self.suggestions.strings {
            if suggestion.translation.is_empty() {
                continue;
            }
            if let Some(entity) = source_entities.get_for(suggestion) {
                store.demote_to_suggestion(
                    &resource.slug,
                    &entity.string,
                    &entity.context,
                    &suggestion.translation,
                )?;
            }
        }
        Ok(())
    }

    /// Compiles the resource's template into a translation file.
    ///
    /// Loads the current template, lets the format pre-inspect it, replaces
    /// every placeholder with the live translation (empty when
    /// untranslated), and post-processes. Read-only; errors are logged and
    /// re-raised.
    pub fn compile(
        &mut self,
        store: &dyn Storage,
        language: Option<&Language>,
    ) -> Result<&[u8], Error> {
        let resource = self.need_resource()?.clone();
        let language = match language {
            Some(language) => language.clone(),
            None => match &self.language {
                Some(language) => language.clone(),
                None => language::lookup(&resource.source_language)?,
            },
        };
        let source_language = language::lookup(&resource.source_language)?;

        let raw = store.get_template(&resource.slug)?;
        let content = String::from_utf8(raw)
            .map_err(|e| Error::content_error(format!("template is not UTF-8: {}", e)))?;

        let strings = store.list_source_entities(&resource.slug)?;
        let mut translations: HashMap<(EntityId, PluralRule), String> = HashMap::new();
        for translation in store.list_translations(&resource.slug, &language.code)? {
            translations.insert(
                (translation.source_entity, translation.rule),
                translation.string,
            );
        }

        let ctx = CompileContext {
            resource: &resource,
            language: &language,
            source_language: &source_language,
            strings: &strings,
            translations: &translations,
            store,
            pseudo: self.pseudo.as_deref(),
        };

        let content = self.plugin.examine_content(content, &ctx)?;
        let compiled = match self.plugin.compile(content, &ctx) {
            Ok(compiled) => compiled,
            Err(e) => {
                error!(
                    resource = %resource.slug,
                    "error compiling file: {}", e
                );
                return Err(e);
            }
        };
        let compiled = self.plugin.post_compile(compiled, &ctx)?;

        self.compiled = Some(self.plugin.encode(&compiled));
        Ok(self.compiled.as_deref().expect("just set"))
    }
}
