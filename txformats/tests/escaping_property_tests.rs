//! Property tests: `unescape(escape(x)) == x` for every format's reserved
//! characters.

use proptest::prelude::*;

use txformats::FormatPlugin;
use txformats::formats::joomla::JoomlaVersion;
use txformats::formats::po::{escape_po, unescape_po};
use txformats::formats::{MozillaPropertiesFormat, PropertiesFormat};

fn properties_value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 :=\\\\]{0,30}").expect("valid value regex")
}

fn po_value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 \"\\\\\n\t]{0,30}").expect("valid value regex")
}

fn quoted_value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 \"]{0,30}").expect("valid value regex")
}

proptest! {
    #[test]
    fn properties_escape_round_trips(value in properties_value_strategy()) {
        let plugin = PropertiesFormat;
        prop_assert_eq!(plugin.unescape(&plugin.escape(&value)), value);
    }

    #[test]
    fn mozilla_escape_round_trips(value in properties_value_strategy()) {
        let plugin = MozillaPropertiesFormat;
        prop_assert_eq!(plugin.unescape(&plugin.escape(&value)), value);
    }

    #[test]
    fn po_escape_round_trips(value in po_value_strategy()) {
        prop_assert_eq!(unescape_po(&escape_po(&value)), value);
    }

    #[test]
    fn joomla_new_quote_escape_round_trips(value in quoted_value_strategy()) {
        let version = JoomlaVersion::New;
        prop_assert_eq!(version.unescape_quotes(&version.escape_quotes(&value)), value);
    }

    #[test]
    fn joomla_old_quote_escape_round_trips(value in quoted_value_strategy()) {
        let version = JoomlaVersion::Old;
        prop_assert_eq!(version.unescape_quotes(&version.escape_quotes(&value)), value);
    }

    #[test]
    fn escaped_properties_values_survive_a_parse(
        // The grammar trims unescaped whitespace at the value edges, so the
        // property holds for values with word-character boundaries.
        value in proptest::string::string_regex(
            "[A-Za-z0-9]([A-Za-z0-9 :=\\\\]{0,28}[A-Za-z0-9])?"
        ).expect("valid value regex")
    ) {
        // An escaped value written to a line must come back out of the
        // parser unchanged.
        let plugin = PropertiesFormat;
        let content = format!("key={}\n", plugin.escape(&value));
        let language = txformats::language::lookup("en").unwrap();
        let input = txformats::handler::ParseInput {
            content: &content,
            is_source: true,
            language: &language,
        };
        let mut sink = txformats::handler::ParseSink::default();
        plugin.parse(&input, &mut sink).unwrap();
        if value.trim().is_empty() {
            prop_assert!(sink.stringset.is_empty());
        } else {
            prop_assert_eq!(sink.stringset.strings[0].translation.clone(), value);
        }
    }
}
