//! Value objects produced by one parse pass and the transient indices used
//! to diff them against store state.
//!
//! A parse run yields a [`StringSet`] of [`GenericTranslation`] values.
//! `save2db` then builds a [`SourceEntityCollection`] and a
//! [`TranslationCollection`] from the current store contents once, and
//! answers every "does this already exist?" question in memory instead of
//! re-querying per entry.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Error;
use crate::language::PluralRule;
use crate::store::{EntityId, SourceEntityRecord, TranslationRecord};

/// One translatable unit extracted from a file, in any i18n format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericTranslation {
    /// The original string found in the source file.
    pub source_entity: String,

    /// The translated string (equal to the source for source-language files).
    pub translation: String,

    /// Disambiguating context for the source string.
    #[serde(skip_serializing_if = "Context::is_none")]
    #[serde(default)]
    pub context: Context,

    /// Occurrences of the string in the source code, as reported by the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub occurrences: Option<String>,

    /// Developer comment attached to the string.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,

    /// Format-specific flags (e.g. gettext `c-format`).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub flags: Option<String>,

    /// Plural rule of this form; `Other` for non-pluralized strings.
    pub rule: PluralRule,

    /// True if the string is a plural entry.
    pub pluralized: bool,

    /// True if the translation is fuzzy/unfinished.
    pub fuzzy: bool,

    /// True if the entry is obsolete.
    pub obsolete: bool,
}

impl GenericTranslation {
    pub fn new(
        source_entity: impl Into<String>,
        translation: impl Into<String>,
        context: Context,
    ) -> Self {
        GenericTranslation {
            source_entity: source_entity.into(),
            translation: translation.into(),
            context,
            occurrences: None,
            comment: None,
            flags: None,
            rule: PluralRule::Other,
            pluralized: false,
            fuzzy: false,
            obsolete: false,
        }
    }

    pub fn with_rule(mut self, rule: PluralRule) -> Self {
        self.rule = rule;
        self.pluralized = rule != PluralRule::Other || self.pluralized;
        self
    }

    pub fn pluralized(mut self, pluralized: bool) -> Self {
        self.pluralized = pluralized;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_occurrences(mut self, occurrences: Option<String>) -> Self {
        self.occurrences = occurrences;
        self
    }

    pub fn with_flags(mut self, flags: Option<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Strict comparison that also requires identical occurrences; used when
    /// minor source-file differences should be treated as distinct entries.
    pub fn strict_eq(&self, other: &GenericTranslation) -> bool {
        self == other && self.occurrences == other.occurrences
    }
}

impl PartialEq for GenericTranslation {
    fn eq(&self, other: &Self) -> bool {
        self.source_entity == other.source_entity
            && self.translation == other.translation
            && self.context == other.context
    }
}

impl Eq for GenericTranslation {}

impl Hash for GenericTranslation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_entity.hash(state);
        self.translation.hash(state);
        self.context.hash(state);
    }
}

/// The ordered set of strings extracted by one parse pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringSet {
    /// All extracted entries, in file order.
    pub strings: Vec<GenericTranslation>,

    /// Language the file declared itself to be for, if the format carries
    /// one; used by format auto-detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub target_language: Option<String>,
}

impl StringSet {
    pub fn new() -> Self {
        StringSet::default()
    }

    pub fn add(&mut self, string: GenericTranslation) {
        self.strings.push(string);
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Groups entries by canonical context, preserving entry order inside
    /// each group.
    pub fn strings_grouped_by_context(&self) -> BTreeMap<String, Vec<&GenericTranslation>> {
        let mut groups: BTreeMap<String, Vec<&GenericTranslation>> = BTreeMap::new();
        for string in &self.strings {
            groups
                .entry(string.context.storage_key())
                .or_default()
                .push(string);
        }
        groups
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Index of source entities keyed by (source string, canonical context).
#[derive(Debug, Default)]
pub struct SourceEntityCollection {
    items: HashMap<(String, String), SourceEntityRecord>,
}

impl SourceEntityCollection {
    pub fn new() -> Self {
        SourceEntityCollection::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SourceEntityRecord>) -> Self {
        let mut collection = SourceEntityCollection::new();
        for record in records {
            collection.add(record);
        }
        collection
    }

    fn key(source: &str, context: &str) -> (String, String) {
        (source.to_string(), context.to_string())
    }

    pub fn add(&mut self, record: SourceEntityRecord) {
        self.items
            .insert(Self::key(&record.string, &record.context), record);
    }

    pub fn get(&self, source: &str, context: &Context) -> Option<&SourceEntityRecord> {
        self.items.get(&Self::key(source, &context.storage_key()))
    }

    /// Looks up the entity matching a parsed entry.
    pub fn get_for(&self, string: &GenericTranslation) -> Option<&SourceEntityRecord> {
        self.get(&string.source_entity, &string.context)
    }

    pub fn contains(&self, string: &GenericTranslation) -> bool {
        self.get_for(string).is_some()
    }

    /// Ids of every entity in the collection.
    pub fn se_ids(&self) -> BTreeSet<EntityId> {
        self.items.values().map(|record| record.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Index of translations keyed by (source entity id, plural rule).
#[derive(Debug, Default)]
pub struct TranslationCollection {
    items: HashMap<(EntityId, PluralRule), TranslationRecord>,
}

impl TranslationCollection {
    pub fn new() -> Self {
        TranslationCollection::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = TranslationRecord>) -> Self {
        let mut collection = TranslationCollection::new();
        for record in records {
            collection.add(record);
        }
        collection
    }

    pub fn add(&mut self, record: TranslationRecord) {
        self.items.insert((record.source_entity, record.rule), record);
    }

    pub fn get(&self, entity: EntityId, rule: PluralRule) -> Option<&TranslationRecord> {
        self.items.get(&(entity, rule))
    }

    pub fn contains(&self, entity: EntityId, rule: PluralRule) -> bool {
        self.items.contains_key(&(entity, rule))
    }

    /// Ids of every source entity that has a translation in the collection.
    pub fn se_ids(&self) -> BTreeSet<EntityId> {
        self.items.keys().map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: EntityId, string: &str, context: &str) -> SourceEntityRecord {
        SourceEntityRecord {
            id,
            string: string.to_string(),
            context: context.to_string(),
            string_hash: String::new(),
            pluralized: false,
            flags: String::new(),
            developer_comment: String::new(),
            occurrences: String::new(),
            position: 0,
        }
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let a = GenericTranslation::new("Hello", "Hallo", Context::None)
            .with_comment(Some("a comment".to_string()));
        let b = GenericTranslation::new("Hello", "Hallo", Context::None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_respects_context() {
        let a = GenericTranslation::new("Hello", "Hallo", Context::single("menu"));
        let b = GenericTranslation::new("Hello", "Hallo", Context::None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_strict_eq_respects_occurrences() {
        let a = GenericTranslation::new("Hello", "Hallo", Context::None)
            .with_occurrences(Some("main.c:1".to_string()));
        let b = GenericTranslation::new("Hello", "Hallo", Context::None);
        assert_eq!(a, b);
        assert!(!a.strict_eq(&b));
    }

    #[test]
    fn test_with_rule_marks_pluralized() {
        let t = GenericTranslation::new("apple", "apples", Context::None)
            .with_rule(PluralRule::Few);
        assert!(t.pluralized);
        assert_eq!(t.rule, PluralRule::Few);
    }

    #[test]
    fn test_stringset_grouped_by_context() {
        let mut set = StringSet::new();
        set.add(GenericTranslation::new("a", "a", Context::None));
        set.add(GenericTranslation::new("b", "b", Context::single("menu")));
        set.add(GenericTranslation::new("c", "c", Context::None));

        let groups = set.strings_grouped_by_context();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["None"].len(), 2);
        assert_eq!(groups["menu"].len(), 1);
        assert_eq!(groups["None"][0].source_entity, "a");
        assert_eq!(groups["None"][1].source_entity, "c");
    }

    #[test]
    fn test_stringset_to_json_skips_absent_fields() {
        let mut set = StringSet::new();
        set.add(GenericTranslation::new("a", "b", Context::None));
        let json = set.to_json().unwrap();
        assert!(json.contains("\"source_entity\":\"a\""));
        assert!(!json.contains("occurrences"));
        assert!(!json.contains("target_language"));
    }

    #[test]
    fn test_source_entity_collection_lookup() {
        let mut collection = SourceEntityCollection::new();
        collection.add(record(1, "Hello", "None"));
        collection.add(record(2, "Hello", "menu"));

        let plain = GenericTranslation::new("Hello", "x", Context::None);
        let in_menu = GenericTranslation::new("Hello", "x", Context::single("menu"));
        let missing = GenericTranslation::new("Bye", "x", Context::None);

        assert_eq!(collection.get_for(&plain).unwrap().id, 1);
        assert_eq!(collection.get_for(&in_menu).unwrap().id, 2);
        assert!(collection.get_for(&missing).is_none());
        assert_eq!(collection.se_ids().len(), 2);
    }

    #[test]
    fn test_translation_collection_lookup() {
        let mut collection = TranslationCollection::new();
        collection.add(TranslationRecord {
            id: 10,
            source_entity: 1,
            language: "ru".to_string(),
            rule: PluralRule::Few,
            string: "x".to_string(),
            user: None,
        });

        assert!(collection.contains(1, PluralRule::Few));
        assert!(!collection.contains(1, PluralRule::Other));
        assert_eq!(collection.get(1, PluralRule::Few).unwrap().id, 10);
        assert_eq!(collection.se_ids().into_iter().collect::<Vec<_>>(), vec![1]);
    }
}
