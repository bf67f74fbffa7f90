//! Round-trip tests: parsing a source file, saving it, compiling it for the
//! source language, and re-parsing the compiled output must preserve the
//! set of (source string, context) pairs.

use std::collections::BTreeSet;

use indoc::indoc;
use txformats::{FormatRegistry, MemoryStore, NullEvents, Resource};

fn pairs_of(handler: &txformats::Handler) -> BTreeSet<(String, String)> {
    handler
        .stringset()
        .expect("parsed")
        .strings
        .iter()
        .map(|s| (s.source_entity.clone(), s.context.storage_key()))
        .collect()
}

/// Imports `content` as the source file of a fresh resource and returns the
/// store plus the extracted pairs.
fn import_source(
    method: &str,
    content: &[u8],
    lang: &str,
) -> (MemoryStore, BTreeSet<(String, String)>) {
    let registry = FormatRegistry::with_defaults();
    let mut store = MemoryStore::new();
    let resource = Resource::new("r", "Round Trip", method, lang);
    store.add_resource(resource.clone());

    let mut handler = registry.handler_for(method).expect("registered method");
    handler.bind_content(content).expect("bind");
    handler.bind_resource(resource).expect("resource");
    handler.parse_file(true).expect("parse");
    let pairs = pairs_of(&handler);
    handler
        .save2db(&mut store, &mut NullEvents, true, Some("tester"), true)
        .expect("save");
    (store, pairs)
}

fn roundtrip(method: &str, content: &str, lang: &str) {
    let registry = FormatRegistry::with_defaults();
    let (store, original) = import_source(method, content.as_bytes(), lang);
    assert!(!original.is_empty(), "nothing extracted from source");

    let resource = store.resource("r").unwrap().clone();
    let mut handler = registry.handler_for(method).unwrap();
    handler.bind_resource(resource.clone()).unwrap();
    let compiled = handler.compile(&store, None).expect("compile").to_vec();

    let mut reparse = registry.handler_for(method).unwrap();
    reparse.bind_content(&compiled).expect("bind compiled");
    reparse.set_language(lang).unwrap();
    reparse.parse_file(true).expect("re-parse compiled output");
    assert_eq!(
        original,
        pairs_of(&reparse),
        "compiled {} output lost or gained strings",
        method
    );
}

#[test]
fn test_properties_roundtrip() {
    roundtrip(
        "PROPERTIES",
        "# app strings\ngreeting=Hello\nfarewell : Goodbye\nKey21\\:WithColon : Value21\n",
        "en",
    );
}

#[test]
fn test_mozilla_properties_roundtrip() {
    roundtrip(
        "MOZILLAPROPERTIES",
        "url=http://example.com\npath=C\\\\temp\n",
        "en",
    );
}

#[test]
fn test_joomla_new_roundtrip() {
    roundtrip(
        "INI",
        ";1.6\nGREETING=\"Hello\"\nQUOTED=\"Say \"_QQ_\"hi\"_QQ_\"\"\n",
        "en",
    );
}

#[test]
fn test_joomla_old_roundtrip() {
    roundtrip("INI", "GREETING=Hello\nQUOTED=Say &quot;hi&quot;\n", "en");
}

#[test]
fn test_apple_strings_roundtrip() {
    roundtrip(
        "STRINGS",
        "/* comments survive */\n\"hello\" = \"Hello!\";\n\"quoted\" = \"say \\\"hi\\\"\";\n",
        "en",
    );
}

#[test]
fn test_desktop_roundtrip() {
    roundtrip(
        "DESKTOP",
        "[Desktop Entry]\nType=Application\nName=Editor\nComment=Edit things\nExec=editor\n",
        "en",
    );
}

#[test]
fn test_wiki_roundtrip() {
    roundtrip(
        "WIKI",
        "First paragraph of text.\n\nSecond paragraph here.\n\n{{Template\n\n|key=1\n}}\n",
        "en",
    );
}

#[test]
fn test_po_roundtrip() {
    let catalog = indoc! {r#"
        msgid ""
        msgstr ""
        "Language: en\n"

        msgid "Hello"
        msgstr "Hello"

        msgctxt "menu"
        msgid "Open"
        msgstr "Open"

        msgid "One file"
        msgid_plural "%d files"
        msgstr[0] "One file"
        msgstr[1] "%d files"
    "#};
    roundtrip("PO", catalog, "en");
}

#[test]
fn test_qt_roundtrip() {
    let ts = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE TS>\n<TS version=\"2.0\">\n  <context>\n    <name>Main</name>\n    <message>\n      <source>Open</source>\n      <translation>Open</translation>\n    </message>\n    <message numerus=\"yes\">\n      <source>%n item(s)</source>\n      <translation><numerusform>%n item</numerusform><numerusform>%n items</numerusform></translation>\n    </message>\n  </context>\n</TS>\n";
    roundtrip("QT", ts, "en");
}

#[test]
fn test_xliff_roundtrip() {
    let xliff = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<xliff version=\"1.2\">\n  <file original=\"app\" source-language=\"en\" datatype=\"po\">\n    <body>\n      <trans-unit id=\"1\">\n        <source>Hello</source>\n      </trans-unit>\n      <group id=\"g1\" restype=\"x-gettext-plurals\">\n        <trans-unit id=\"g1[0]\">\n          <source>One file</source>\n        </trans-unit>\n        <trans-unit id=\"g1[1]\">\n          <source>%d files</source>\n        </trans-unit>\n      </group>\n    </body>\n  </file>\n</xliff>\n";
    roundtrip("XLIFF", xliff, "en");
}

#[test]
fn test_joomla_translation_compile() {
    let registry = FormatRegistry::with_defaults();
    let (mut store, _) = import_source(
        "INI",
        b";1.6\nGREETING=\"Hello\"\nQUOTED=\"plain\"\n",
        "en",
    );
    let resource = store.resource("r").unwrap().clone();

    // Import a German translation file.
    let mut handler = registry.handler_for("INI").unwrap();
    handler
        .bind_content(b";1.6\nGREETING=\"Hallo\"\nQUOTED=\"mit \"_QQ_\"Zitat\"_QQ_\"\"\n")
        .unwrap();
    handler.bind_resource(resource.clone()).unwrap();
    handler.set_language("de").unwrap();
    handler.parse_file(false).unwrap();
    let outcome = handler
        .save2db(&mut store, &mut NullEvents, false, None, true)
        .unwrap();
    assert_eq!(outcome.counts(), (2, 0));

    let de = txformats::language::lookup("de").unwrap();
    let mut compiler = registry.handler_for("INI").unwrap();
    compiler.bind_resource(resource).unwrap();
    let compiled = compiler.compile(&store, Some(&de)).unwrap();
    let text = std::str::from_utf8(compiled).unwrap();
    assert!(text.contains("GREETING=\"Hallo\""));
    // Embedded quotes re-escape for the 1.6 flavor.
    assert!(text.contains("QUOTED=\"mit \"_QQ_\"Zitat\"_QQ_\"\""));
}

#[test]
fn test_xliff_plural_compile_expands_for_russian() {
    let registry = FormatRegistry::with_defaults();
    let xliff = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<xliff version=\"1.2\">\n  <file original=\"app\" source-language=\"en\" datatype=\"po\">\n    <body>\n      <group id=\"g1\" restype=\"x-gettext-plurals\">\n        <trans-unit id=\"g1[0]\">\n          <source>One file</source>\n        </trans-unit>\n        <trans-unit id=\"g1[1]\">\n          <source>%d files</source>\n        </trans-unit>\n      </group>\n    </body>\n  </file>\n</xliff>\n";
    let (mut store, _) = import_source("XLIFF", xliff.as_bytes(), "en");
    let resource = store.resource("r").unwrap().clone();

    // Store the four Russian forms directly.
    use txformats::PluralRule;
    use txformats::store::StringStore;
    let entity = store.list_source_entities("r").unwrap()[0].clone();
    for (rule, text) in [
        (PluralRule::One, "%d файл"),
        (PluralRule::Few, "%d файла"),
        (PluralRule::Many, "%d файлов"),
        (PluralRule::Other, "%d файла"),
    ] {
        store
            .create_translation("r", entity.id, "ru", rule, text, None)
            .unwrap();
    }

    let ru = txformats::language::lookup("ru").unwrap();
    let mut handler = registry.handler_for("XLIFF").unwrap();
    handler.bind_resource(resource).unwrap();
    let compiled = handler.compile(&store, Some(&ru)).unwrap();
    let text = std::str::from_utf8(compiled).unwrap();
    for form in ["%d файл", "%d файлов"] {
        assert!(text.contains(form), "missing {:?}", form);
    }
    // Four trans-units after expansion, no placeholders left.
    assert_eq!(text.matches("<trans-unit").count(), 4);
    assert!(!text.contains("_pl_"));
    assert!(!text.contains("_tr"));
}

#[test]
fn test_apple_strings_compile_is_utf16() {
    let registry = FormatRegistry::with_defaults();
    let (store, _) = import_source("STRINGS", b"\"hello\" = \"Hello!\";\n", "en");
    let resource = store.resource("r").unwrap().clone();

    let mut handler = registry.handler_for("STRINGS").unwrap();
    handler.bind_resource(resource).unwrap();
    let compiled = handler.compile(&store, None).unwrap();
    assert_eq!(&compiled[..2], &[0xFF, 0xFE]);
}

#[test]
fn test_desktop_source_compile_appends_translations() {
    let registry = FormatRegistry::with_defaults();
    let (mut store, _) = import_source(
        "DESKTOP",
        b"[Desktop Entry]\nName=Editor\nComment=Edit things\n",
        "en",
    );
    let resource = store.resource("r").unwrap().clone();

    let mut importer = registry.handler_for("DESKTOP").unwrap();
    importer
        .bind_content(b"[Desktop Entry]\nName=Editor\nName[de]=Bearbeiter\n")
        .unwrap();
    importer.bind_resource(resource.clone()).unwrap();
    importer.set_language("de").unwrap();
    importer.parse_file(false).unwrap();
    importer
        .save2db(&mut store, &mut NullEvents, false, None, true)
        .unwrap();

    // Compiling the source file re-synthesizes the container.
    let mut handler = registry.handler_for("DESKTOP").unwrap();
    handler.bind_resource(resource).unwrap();
    let compiled = handler.compile(&store, None).unwrap();
    let text = std::str::from_utf8(compiled).unwrap();
    assert!(text.contains("Name=Editor"));
    assert!(text.contains("Name[de]=Bearbeiter"));
}

#[test]
fn test_pot_compile_empties_translations() {
    let registry = FormatRegistry::with_defaults();
    let catalog = "msgid \"Hello\"\nmsgstr \"Hello\"\n";
    let (store, _) = import_source("PO", catalog.as_bytes(), "en");
    let resource = store.resource("r").unwrap().clone();

    let mut handler = registry
        .appropriate_handler(&resource, None, true, None)
        .unwrap();
    assert_eq!(handler.method(), "POT");
    handler.bind_resource(resource).unwrap();
    let compiled = handler.compile(&store, None).unwrap();
    let text = std::str::from_utf8(compiled).unwrap();
    assert!(text.contains("msgid \"Hello\""));
    assert!(text.contains("msgstr \"\""));
}
