#![forbid(unsafe_code)]
//! Resource format engine for collaborative translation platforms.
//!
//! Localization files come in (PO/POT, Qt Linguist, Joomla INI, properties,
//! XLIFF, Apple strings, desktop entries, MediaWiki text); translatable
//! strings come out, get diffed against a string store, and the file can be
//! compiled back, byte layout intact, with the stored translations merged
//! in. The bridge between a stored template and the live translations is a
//! content-addressed placeholder per (source string, context) pair.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use txformats::{FormatRegistry, MemoryStore, NullEvents, Resource};
//!
//! let registry = FormatRegistry::with_defaults();
//! let mut store = MemoryStore::new();
//! store.add_resource(Resource::new("app", "My App", "PO", "en"));
//!
//! let mut handler = registry.handler_for("PO").unwrap();
//! handler.bind_file("po/en.po")?;
//! handler.bind_resource(store.resource("app").unwrap().clone())?;
//! handler.parse_file(true)?;
//! handler.save2db(&mut store, &mut NullEvents, true, Some("admin"), true)?;
//!
//! // Later: download the German file.
//! let de = txformats::language::lookup("de")?;
//! let bytes = handler.compile(&store, Some(&de))?;
//! # let _ = bytes;
//! # Ok::<(), txformats::Error>(())
//! ```
//!
//! # Pipeline
//!
//! - **parse**: a format handler extracts a [`StringSet`] and builds a
//!   template with `<hash>_tr` / `<hash>_pl_<rule>` placeholders.
//! - **save**: `save2db` diffs the stringset against the store inside one
//!   transaction: new entities created, stale ones deleted (translations
//!   demoted to suggestions), counters reported as a typed
//!   [`SaveOutcome`].
//! - **compile**: the stored template plus the live translations of any
//!   language deterministically yield a downloadable file.

pub mod collections;
pub mod context;
pub mod error;
pub mod formats;
pub mod handler;
pub mod hash;
pub mod language;
pub mod registry;
pub mod store;

// Re-export the most used types for easy consumption
pub use crate::{
    collections::{GenericTranslation, SourceEntityCollection, StringSet, TranslationCollection},
    context::Context,
    error::Error,
    handler::{FormatPlugin, Handler, PseudoType, SaveOutcome},
    hash::hash_tag,
    language::{Language, PluralRule},
    registry::{FormatRegistry, sniff_mimetype},
    store::{MemoryStore, NullEvents, Resource, ResourceEvents, Storage},
};
