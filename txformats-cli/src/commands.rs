//! The subcommand implementations: thin glue between the CLI surface and
//! the engine's public entry points.

use std::path::Path;

use txformats::{
    Error, FormatRegistry, MemoryStore, NullEvents, Resource, SaveOutcome, language,
    sniff_mimetype,
};

/// Resolves a method from an explicit flag, the filename, or the content.
fn resolve_method(
    registry: &FormatRegistry,
    explicit: Option<&str>,
    filename: &str,
    content: &[u8],
) -> Result<String, Error> {
    if let Some(method) = explicit {
        let method = method.to_uppercase();
        if !registry.is_supported(&method) {
            return Err(Error::UnknownFormat(method));
        }
        return Ok(method);
    }
    let sniffed = std::str::from_utf8(content).ok().and_then(sniff_mimetype);
    registry
        .guess_method(Some(filename), sniffed)
        .ok_or_else(|| Error::UnknownFormat(filename.to_string()))
}

pub fn guess(input: &str) -> Result<(), Error> {
    let registry = FormatRegistry::with_defaults();
    let content = std::fs::read(input)?;
    let method = resolve_method(&registry, None, input, &content)?;
    println!("{}", method);
    Ok(())
}

pub fn parse(
    input: &str,
    method: Option<&str>,
    lang: &str,
    source: bool,
) -> Result<(), Error> {
    let registry = FormatRegistry::with_defaults();
    let content = std::fs::read(input)?;
    let method = resolve_method(&registry, method, input, &content)?;

    let mut handler = registry
        .handler_for(&method)
        .ok_or_else(|| Error::UnknownFormat(method.clone()))?;
    handler.bind_content(&content)?;
    handler.set_language(lang)?;
    handler.parse_file(source)?;

    let stringset = handler.stringset().expect("parse_file succeeded");
    println!("{}", serde_json::to_string_pretty(stringset)?);
    Ok(())
}

fn load_store(path: &str) -> Result<MemoryStore, Error> {
    if Path::new(path).is_file() {
        MemoryStore::load_json(path)
    } else {
        Ok(MemoryStore::new())
    }
}

#[allow(clippy::too_many_arguments)]
pub fn import(
    input: &str,
    store_path: &str,
    resource_slug: &str,
    method: Option<&str>,
    lang: Option<&str>,
    source: bool,
    overwrite: bool,
) -> Result<(), Error> {
    let registry = FormatRegistry::with_defaults();
    let content = std::fs::read(input)?;
    let mut store = load_store(store_path)?;

    let resource = match store.resource(resource_slug) {
        Some(resource) => resource.clone(),
        None => {
            let method = resolve_method(&registry, method, input, &content)?;
            let source_language = if source { lang.unwrap_or("en") } else { "en" };
            let resource = Resource::new(
                resource_slug,
                resource_slug,
                method,
                language::lookup(source_language)?.code,
            );
            store.add_resource(resource.clone());
            resource
        }
    };

    tracing::debug!(
        method = %resource.i18n_method,
        resource = %resource.slug,
        "importing file"
    );
    let mut handler = registry
        .handler_for(&resource.i18n_method)
        .ok_or_else(|| Error::UnknownFormat(resource.i18n_method.clone()))?;
    handler.bind_content(&content)?;
    handler.bind_resource(resource)?;
    if let Some(lang) = lang {
        handler.set_language(lang)?;
    }
    handler.parse_file(source)?;

    let outcome = handler.save2db(&mut store, &mut NullEvents, source, None, overwrite)?;
    match outcome {
        SaveOutcome::Saved {
            added,
            updated,
            deleted,
        } => {
            println!(
                "strings added: {}, updated: {}, deleted: {}",
                added, updated, deleted
            );
        }
        SaveOutcome::RolledBack { reason } => {
            println!("strings added: 0, updated: 0 (rolled back: {})", reason);
        }
    }
    store.save_json(store_path)?;
    Ok(())
}

pub fn compile(
    store_path: &str,
    resource_slug: &str,
    lang: Option<&str>,
    pot: bool,
    output: Option<&str>,
) -> Result<(), Error> {
    let registry = FormatRegistry::with_defaults();
    let store = load_store(store_path)?;
    let resource = store
        .resource(resource_slug)
        .cloned()
        .ok_or_else(|| Error::storage_error(format!("no such resource: {}", resource_slug)))?;

    let language = lang.map(language::lookup).transpose()?;
    let mut handler = registry
        .appropriate_handler(&resource, language.as_ref(), pot, None)
        .ok_or_else(|| Error::UnknownFormat(resource.i18n_method.clone()))?;
    handler.bind_resource(resource)?;
    let compiled = handler.compile(&store, language.as_ref())?.to_vec();

    match output {
        Some(path) => std::fs::write(path, compiled)?,
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&compiled)?;
        }
    }
    Ok(())
}
