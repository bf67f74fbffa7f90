//! Translation context: the disambiguator attached to a source string.
//!
//! A source string may appear several times in one resource with different
//! meanings; the context tells those occurrences apart. Formats express it
//! differently (gettext `msgctxt`, Qt `<comment>`, XLIFF `<context-group>`
//! chains), so the engine normalizes everything to this one type before
//! hashing, equality comparison, and storage.

use serde::{Deserialize, Serialize};

/// The canonical storage token for an absent context.
pub const NO_CONTEXT_TOKEN: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Context {
    /// No context at all.
    #[default]
    None,

    /// A single context string (e.g. a gettext `msgctxt`).
    Single(String),

    /// An ordered chain of context values (e.g. XLIFF context-groups).
    /// Elements are stored with embedded colons escaped, so the chain can be
    /// joined with `:` without ambiguity.
    Multi(Vec<String>),
}

impl Context {
    /// Builds a context from a single value.
    ///
    /// The empty string and the legacy `"None"` token both mean "no context".
    pub fn single(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() || value == NO_CONTEXT_TOKEN {
            Context::None
        } else {
            Context::Single(value)
        }
    }

    /// Builds a context from an ordered list of parts, escaping embedded
    /// colons in each part. An empty list means "no context".
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts
            .into_iter()
            .map(|p| escape_colons(&p.into()))
            .collect();
        if parts.is_empty() {
            Context::None
        } else {
            Context::Multi(parts)
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Context::None)
    }

    /// The canonical string used as part of storage and collection keys.
    /// An absent context becomes the literal `"None"` token.
    pub fn storage_key(&self) -> String {
        match self {
            Context::None => NO_CONTEXT_TOKEN.to_string(),
            Context::Single(value) => value.clone(),
            Context::Multi(parts) => parts.join(":"),
        }
    }

    /// The string joined into the placeholder hash. An absent context hashes
    /// as the empty string, so `None` and `Single("")` are indistinguishable
    /// to the template layer.
    pub fn hash_key(&self) -> String {
        match self {
            Context::None => String::new(),
            Context::Single(value) => value.clone(),
            Context::Multi(parts) => parts.join(":"),
        }
    }

    /// Reconstructs a context from its canonical storage key.
    pub fn from_storage_key(key: &str) -> Self {
        Context::single(key)
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// Escapes every unescaped colon in `value` so context parts can be joined
/// with `:` without making `["a", "b"]` and `["a:b"]` collide.
pub fn escape_colons(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut escaped = false;
    for c in value.chars() {
        if c == ':' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}
