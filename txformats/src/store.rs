//! Storage contracts the engine depends on, and an in-memory implementation.
//!
//! The engine never talks to a database directly: `save2db` and `compile`
//! receive a [`Storage`] implementation and only use the operations defined
//! here. [`MemoryStore`] is a complete, serde-serializable implementation
//! with snapshot-based transactions, used by the test suites and the CLI.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Error;
use crate::hash::hash_tag;
use crate::language::PluralRule;

pub type EntityId = u64;
pub type TranslationId = u64;

/// A translatable resource: one uploaded file tracked by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique identifier of the resource within the store.
    pub slug: String,

    /// Human-readable name.
    pub name: String,

    /// The registered i18n method of this resource (e.g. `PO`, `INI`).
    pub i18n_method: String,

    /// Code of the language the source file is written in.
    pub source_language: String,
}

impl Resource {
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        i18n_method: impl Into<String>,
        source_language: impl Into<String>,
    ) -> Self {
        Resource {
            slug: slug.into(),
            name: name.into(),
            i18n_method: i18n_method.into(),
            source_language: source_language.into(),
        }
    }
}

/// A unique (string, context) pair within one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntityRecord {
    pub id: EntityId,
    pub string: String,
    /// Canonical context key; `"None"` when absent.
    pub context: String,
    /// External key: `hash_tag(string, context)`.
    pub string_hash: String,
    pub pluralized: bool,
    pub flags: String,
    pub developer_comment: String,
    pub occurrences: String,
    pub position: u32,
}

/// One (source entity, language, plural rule) triple's translated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: TranslationId,
    pub source_entity: EntityId,
    pub language: String,
    pub rule: PluralRule,
    pub string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub user: Option<String>,
}

/// Fields for a source entity about to be created.
#[derive(Debug, Clone)]
pub struct NewSourceEntity {
    pub string: String,
    pub context: Context,
    pub pluralized: bool,
    pub flags: String,
    pub developer_comment: String,
    pub occurrences: String,
    pub position: u32,
}

/// A suggested (non-authoritative) translation kept for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    pub source_string: String,
    pub context: String,
    pub string: String,
}

/// Read/write operations against the source-string and translation store.
pub trait StringStore {
    fn list_source_entities(&self, resource: &str) -> Result<Vec<SourceEntityRecord>, Error>;

    fn find_source_entity(
        &self,
        resource: &str,
        source: &str,
        context: &Context,
    ) -> Result<Option<SourceEntityRecord>, Error>;

    fn create_source_entity(
        &mut self,
        resource: &str,
        entity: NewSourceEntity,
    ) -> Result<SourceEntityRecord, Error>;

    fn update_source_entity(
        &mut self,
        resource: &str,
        entity: &SourceEntityRecord,
    ) -> Result<(), Error>;

    /// Deletes the entity and every translation attached to it.
    fn delete_source_entity(&mut self, resource: &str, id: EntityId) -> Result<(), Error>;

    /// All translations of the resource restricted to one language.
    fn list_translations(
        &self,
        resource: &str,
        language: &str,
    ) -> Result<Vec<TranslationRecord>, Error>;

    /// All translations of one entity, in every language.
    fn list_entity_translations(
        &self,
        resource: &str,
        entity: EntityId,
    ) -> Result<Vec<TranslationRecord>, Error>;

    fn find_translation(
        &self,
        resource: &str,
        entity: EntityId,
        language: &str,
        rule: PluralRule,
    ) -> Result<Option<TranslationRecord>, Error>;

    fn create_translation(
        &mut self,
        resource: &str,
        entity: EntityId,
        language: &str,
        rule: PluralRule,
        string: &str,
        user: Option<&str>,
    ) -> Result<TranslationRecord, Error>;

    fn update_translation(
        &mut self,
        resource: &str,
        translation: &TranslationRecord,
    ) -> Result<(), Error>;

    /// Codes of every language the resource has translations in.
    fn available_languages(&self, resource: &str) -> Result<Vec<String>, Error>;
}

/// Storage of the one template each resource carries.
pub trait TemplateStore {
    fn get_template(&self, resource: &str) -> Result<Vec<u8>, Error>;
    fn set_template(&mut self, resource: &str, content: &[u8]) -> Result<(), Error>;
}

/// Receives translations demoted from authoritative to suggested.
pub trait SuggestionSink {
    fn demote_to_suggestion(
        &mut self,
        resource: &str,
        source_string: &str,
        context: &str,
        text: &str,
    ) -> Result<(), Error>;
}

/// The full storage contract `save2db` needs: string store, template store
/// and suggestion sink wrapped in transaction edges. A `begin`/`commit` pair
/// brackets every save; `rollback` must restore the exact pre-`begin` state.
pub trait Storage: StringStore + TemplateStore + SuggestionSink {
    fn begin(&mut self) -> Result<(), Error>;
    fn commit(&mut self) -> Result<(), Error>;
    fn rollback(&mut self) -> Result<(), Error>;
}

/// External side effects fired after a successful save.
pub trait ResourceEvents {
    #[allow(clippy::too_many_arguments)]
    fn on_resource_updated(
        &mut self,
        resource: &str,
        language: &str,
        user: Option<&str>,
        added: u64,
        updated: u64,
        deleted: u64,
    ) -> Result<(), Error>;
}

/// An events hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl ResourceEvents for NullEvents {
    fn on_resource_updated(
        &mut self,
        _resource: &str,
        _language: &str,
        _user: Option<&str>,
        _added: u64,
        _updated: u64,
        _deleted: u64,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// In-memory storage with snapshot transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    resources: BTreeMap<String, Resource>,
    entities: BTreeMap<String, Vec<SourceEntityRecord>>,
    translations: BTreeMap<String, Vec<TranslationRecord>>,
    templates: BTreeMap<String, Vec<u8>>,
    suggestions: BTreeMap<String, Vec<SuggestionRecord>>,
    next_id: u64,
    #[serde(skip)]
    snapshot: Option<Box<MemoryStore>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.slug.clone(), resource);
    }

    pub fn resource(&self, slug: &str) -> Option<&Resource> {
        self.resources.get(slug)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn suggestions(&self, resource: &str) -> &[SuggestionRecord] {
        self.suggestions
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Loads a store previously saved with [`MemoryStore::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Persists the store as JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let content = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn entities_of(&self, resource: &str) -> &[SourceEntityRecord] {
        self.entities
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl StringStore for MemoryStore {
    fn list_source_entities(&self, resource: &str) -> Result<Vec<SourceEntityRecord>, Error> {
        Ok(self.entities_of(resource).to_vec())
    }

    fn find_source_entity(
        &self,
        resource: &str,
        source: &str,
        context: &Context,
    ) -> Result<Option<SourceEntityRecord>, Error> {
        let key = context.storage_key();
        Ok(self
            .entities_of(resource)
            .iter()
            .find(|e| e.string == source && e.context == key)
            .cloned())
    }

    fn create_source_entity(
        &mut self,
        resource: &str,
        entity: NewSourceEntity,
    ) -> Result<SourceEntityRecord, Error> {
        let record = SourceEntityRecord {
            id: self.alloc_id(),
            string_hash: hash_tag(&entity.string, &entity.context),
            string: entity.string,
            context: entity.context.storage_key(),
            pluralized: entity.pluralized,
            flags: entity.flags,
            developer_comment: entity.developer_comment,
            occurrences: entity.occurrences,
            position: entity.position,
        };
        self.entities
            .entry(resource.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn update_source_entity(
        &mut self,
        resource: &str,
        entity: &SourceEntityRecord,
    ) -> Result<(), Error> {
        let entities = self
            .entities
            .get_mut(resource)
            .ok_or_else(|| Error::storage_error(format!("no such resource: {}", resource)))?;
        let slot = entities
            .iter_mut()
            .find(|e| e.id == entity.id)
            .ok_or_else(|| Error::storage_error(format!("no such entity: {}", entity.id)))?;
        *slot = entity.clone();
        Ok(())
    }

    fn delete_source_entity(&mut self, resource: &str, id: EntityId) -> Result<(), Error> {
        if let Some(entities) = self.entities.get_mut(resource) {
            entities.retain(|e| e.id != id);
        }
        if let Some(translations) = self.translations.get_mut(resource) {
            translations.retain(|t| t.source_entity != id);
        }
        Ok(())
    }

    fn list_translations(
        &self,
        resource: &str,
        language: &str,
    ) -> Result<Vec<TranslationRecord>, Error> {
        Ok(self
            .translations
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(|t| t.language == language)
            .cloned()
            .collect())
    }

    fn list_entity_translations(
        &self,
        resource: &str,
        entity: EntityId,
    ) -> Result<Vec<TranslationRecord>, Error> {
        Ok(self
            .translations
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(|t| t.source_entity == entity)
            .cloned()
            .collect())
    }

    fn find_translation(
        &self,
        resource: &str,
        entity: EntityId,
        language: &str,
        rule: PluralRule,
    ) -> Result<Option<TranslationRecord>, Error> {
        Ok(self
            .translations
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .find(|t| t.source_entity == entity && t.language == language && t.rule == rule)
            .cloned())
    }

    fn create_translation(
        &mut self,
        resource: &str,
        entity: EntityId,
        language: &str,
        rule: PluralRule,
        string: &str,
        user: Option<&str>,
    ) -> Result<TranslationRecord, Error> {
        let record = TranslationRecord {
            id: self.alloc_id(),
            source_entity: entity,
            language: language.to_string(),
            rule,
            string: string.to_string(),
            user: user.map(str::to_string),
        };
        self.translations
            .entry(resource.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn update_translation(
        &mut self,
        resource: &str,
        translation: &TranslationRecord,
    ) -> Result<(), Error> {
        let translations = self
            .translations
            .get_mut(resource)
            .ok_or_else(|| Error::storage_error(format!("no such resource: {}", resource)))?;
        let slot = translations
            .iter_mut()
            .find(|t| t.id == translation.id)
            .ok_or_else(|| {
                Error::storage_error(format!("no such translation: {}", translation.id))
            })?;
        *slot = translation.clone();
        Ok(())
    }

    fn available_languages(&self, resource: &str) -> Result<Vec<String>, Error> {
        let mut languages: Vec<String> = self
            .translations
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|t| t.language.clone())
            .collect();
        languages.sort();
        languages.dedup();
        Ok(languages)
    }
}

impl TemplateStore for MemoryStore {
    fn get_template(&self, resource: &str) -> Result<Vec<u8>, Error> {
        self.templates
            .get(resource)
            .cloned()
            .ok_or_else(|| Error::storage_error(format!("no template for resource: {}", resource)))
    }

    fn set_template(&mut self, resource: &str, content: &[u8]) -> Result<(), Error> {
        self.templates.insert(resource.to_string(), content.to_vec());
        Ok(())
    }
}

impl SuggestionSink for MemoryStore {
    fn demote_to_suggestion(
        &mut self,
        resource: &str,
        source_string: &str,
        context: &str,
        text: &str,
    ) -> Result<(), Error> {
        self.suggestions
            .entry(resource.to_string())
            .or_default()
            .push(SuggestionRecord {
                source_string: source_string.to_string(),
                context: context.to_string(),
                string: text.to_string(),
            });
        Ok(())
    }
}

impl Storage for MemoryStore {
    fn begin(&mut self) -> Result<(), Error> {
        let mut copy = self.clone();
        copy.snapshot = None;
        self.snapshot = Some(Box::new(copy));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Error> {
        match self.snapshot.take() {
            Some(snapshot) => {
                *self = *snapshot;
                Ok(())
            }
            None => Err(Error::storage_error("rollback without open transaction")),
        }
    }
}
