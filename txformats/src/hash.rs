//! Content-addressed placeholder keys for template substitution.
//!
//! Every translatable value in a stored template is replaced by a
//! deterministic placeholder derived from the MD5 of its (source string,
//! context) pair. The hash is the *only* bridge between "this placeholder in
//! a template" and "this source string in the store", so it must be stable
//! across formats and releases.

use crate::context::Context;
use crate::language::PluralRule;

/// Calculates the hex MD5 of the `(source, context)` pair.
///
/// An absent context hashes identically to the empty string, and a
/// multi-part context hashes identically to its parts joined with `:`.
pub fn hash_tag(source: &str, context: &Context) -> String {
    let digest = md5::compute(format!("{}:{}", source, context.hash_key()).as_bytes());
    format!("{:x}", digest)
}

/// The template placeholder for a singular (rule "other") value.
pub fn tr_placeholder(hash: &str) -> String {
    format!("{}_tr", hash)
}

/// The template placeholder for one plural form.
pub fn plural_placeholder(hash: &str, rule: PluralRule) -> String {
    format!("{}_pl_{}", hash, rule.number())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        let a = hash_tag("Hello", &Context::None);
        let b = hash_tag("Hello", &Context::None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_absent_context_equals_empty_context() {
        assert_eq!(
            hash_tag("Hello", &Context::None),
            hash_tag("Hello", &Context::Single(String::new()))
        );
    }

    #[test]
    fn test_multi_context_equals_joined_single() {
        assert_eq!(
            hash_tag("Hello", &Context::from_parts(vec!["a", "b"])),
            hash_tag("Hello", &Context::Single("a:b".to_string()))
        );
    }

    #[test]
    fn test_different_contexts_differ() {
        assert_ne!(
            hash_tag("Hello", &Context::single("menu")),
            hash_tag("Hello", &Context::single("dialog"))
        );
    }

    #[test]
    fn test_placeholders() {
        let hash = hash_tag("Hello", &Context::None);
        assert_eq!(tr_placeholder(&hash), format!("{}_tr", hash));
        assert_eq!(
            plural_placeholder(&hash, PluralRule::Few),
            format!("{}_pl_3", hash)
        );
    }
}
