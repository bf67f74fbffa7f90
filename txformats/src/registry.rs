//! The format registry: maps i18n methods to handlers, extensions and
//! mimetypes.
//!
//! The registry is an explicit value constructed at startup (usually via
//! [`FormatRegistry::with_defaults`]) and passed by reference to whatever
//! needs to resolve handlers; there is no process-wide singleton.

use tracing::error;

use crate::error::Error;
use crate::formats::{
    AppleStringsFormat, DesktopFormat, JoomlaIniFormat, MozillaPropertiesFormat, PoFormat,
    PropertiesFormat, QtTsFormat, WikiFormat, XliffFormat,
};
use crate::handler::{FormatPlugin, Handler};
use crate::language::Language;
use crate::store::Resource;

type HandlerFactory = fn() -> Box<dyn FormatPlugin>;

/// Registration data of one i18n method.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub description: &'static str,
    /// Comma-separated extension list; the first one is canonical.
    pub file_extensions: &'static str,
    /// Comma-separated mimetype list.
    pub mimetypes: &'static str,
}

/// Registry of the available formats and their capabilities.
pub struct FormatRegistry {
    methods: Vec<(String, MethodInfo)>,
    handlers: Vec<(String, HandlerFactory)>,
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|item| !item.is_empty())
}

impl FormatRegistry {
    /// An empty registry; mostly useful for tests.
    pub fn new() -> Self {
        FormatRegistry {
            methods: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// The registry with every built-in format registered.
    pub fn with_defaults() -> Self {
        let mut registry = FormatRegistry::new();
        registry.register(
            "PO",
            MethodInfo {
                description: "GNU Gettext catalog",
                file_extensions: ".po",
                mimetypes: "text/x-po, application/x-gettext",
            },
            || Box::new(PoFormat::po()),
        );
        registry.register(
            "POT",
            MethodInfo {
                description: "GNU Gettext template",
                file_extensions: ".pot",
                mimetypes: "text/x-pot",
            },
            || Box::new(PoFormat::pot()),
        );
        registry.register(
            "PROPERTIES",
            MethodInfo {
                description: "Java properties",
                file_extensions: ".properties",
                mimetypes: "text/x-java-properties",
            },
            || Box::new(PropertiesFormat),
        );
        registry.register(
            "MOZILLAPROPERTIES",
            MethodInfo {
                description: "Mozilla properties",
                file_extensions: ".properties",
                mimetypes: "text/x-properties",
            },
            || Box::new(MozillaPropertiesFormat),
        );
        registry.register(
            "INI",
            MethodInfo {
                description: "Joomla INI",
                file_extensions: ".ini",
                mimetypes: "text/x-ini",
            },
            || Box::new(JoomlaIniFormat),
        );
        registry.register(
            "DESKTOP",
            MethodInfo {
                description: "Desktop entry",
                file_extensions: ".desktop",
                mimetypes: "application/x-desktop",
            },
            || Box::new(DesktopFormat),
        );
        registry.register(
            "STRINGS",
            MethodInfo {
                description: "Apple strings",
                file_extensions: ".strings",
                mimetypes: "text/x-strings",
            },
            || Box::new(AppleStringsFormat),
        );
        registry.register(
            "XLIFF",
            MethodInfo {
                description: "XLIFF",
                file_extensions: ".xlf, .xliff",
                mimetypes: "application/x-xliff+xml, application/x-xliff",
            },
            || Box::new(XliffFormat),
        );
        registry.register(
            "QT",
            MethodInfo {
                description: "Qt Linguist",
                file_extensions: ".ts",
                mimetypes: "application/x-linguist",
            },
            || Box::new(QtTsFormat),
        );
        registry.register(
            "WIKI",
            MethodInfo {
                description: "MediaWiki markup",
                file_extensions: ".wiki",
                mimetypes: "text/x-wiki",
            },
            || Box::new(WikiFormat),
        );
        registry
    }

    fn register(&mut self, method: &str, info: MethodInfo, factory: HandlerFactory) {
        self.methods.push((method.to_string(), info));
        self.handlers.push((method.to_string(), factory));
    }

    /// Registers a handler for a method. An already-registered method is
    /// left alone unless `priority` is set.
    pub fn add_handler(&mut self, method: &str, factory: HandlerFactory, priority: bool) -> bool {
        match self.handlers.iter_mut().find(|(name, _)| name == method) {
            Some(slot) => {
                if !priority {
                    return false;
                }
                slot.1 = factory;
                true
            }
            None => {
                self.handlers.push((method.to_string(), factory));
                true
            }
        }
    }

    /// The user-facing methods: everything except the POT variant.
    pub fn available_methods(&self) -> Vec<(&str, &MethodInfo)> {
        self.methods
            .iter()
            .filter(|(name, _)| name != "POT")
            .map(|(name, info)| (name.as_str(), info))
            .collect()
    }

    /// `(method, "description (extensions)")` pairs for the UI.
    pub fn descriptions(&self) -> Vec<(&str, String)> {
        self.available_methods()
            .into_iter()
            .map(|(name, info)| {
                (
                    name,
                    format!("{} ({})", info.description, info.file_extensions),
                )
            })
            .collect()
    }

    pub fn is_supported(&self, method: &str) -> bool {
        self.methods.iter().any(|(name, _)| name == method)
    }

    pub fn extensions_for(&self, method: &str) -> Vec<&str> {
        self.methods
            .iter()
            .find(|(name, _)| name == method)
            .map(|(_, info)| split_list(info.file_extensions).collect())
            .unwrap_or_default()
    }

    pub fn mimetypes_for(&self, method: &str) -> Vec<&str> {
        self.methods
            .iter()
            .find(|(name, _)| name == method)
            .map(|(_, info)| split_list(info.mimetypes).collect())
            .unwrap_or_default()
    }

    /// A fresh handler for the method, or `None` for unregistered methods.
    pub fn handler_for(&self, method: &str) -> Option<Handler> {
        self.handlers
            .iter()
            .find(|(name, _)| name == method)
            .map(|(_, factory)| Handler::new(factory()))
    }

    /// Guesses the method of a file from its extension, falling back to the
    /// mime type. `None` means the format is unsupported.
    pub fn guess_method(&self, filename: Option<&str>, mimetype: Option<&str>) -> Option<String> {
        if let Some(filename) = filename {
            for (name, info) in &self.methods {
                if split_list(info.file_extensions).any(|ext| filename.ends_with(ext)) {
                    return Some(name.clone());
                }
            }
        }
        if let Some(mimetype) = mimetype {
            for (name, info) in &self.methods {
                if split_list(info.mimetypes).any(|mime| mime == mimetype) {
                    return Some(name.clone());
                }
            }
        }
        None
    }

    /// The appropriate handler for a resource/language pair.
    ///
    /// Only the PO family needs disambiguation: a PO resource compiles to a
    /// POT when a POT is explicitly requested, when the filename does not
    /// end in `po`, or when no language is given.
    pub fn appropriate_handler(
        &self,
        resource: &Resource,
        language: Option<&Language>,
        wants_pot: bool,
        filename: Option<&str>,
    ) -> Option<Handler> {
        let method = resource.i18n_method.as_str();
        if method != "PO" {
            return self.handler_for(method);
        }

        if wants_pot {
            return self.handler_for("POT");
        }
        if let Some(filename) = filename {
            return if filename.ends_with("po") {
                self.handler_for("PO")
            } else {
                self.handler_for("POT")
            };
        }
        if language.is_none() {
            return self.handler_for("POT");
        }
        self.handler_for("PO")
    }

    /// The canonical file extension for a resource/language pair, without
    /// the leading dot. A method with no registered extensions is a
    /// configuration error.
    pub fn file_extension_for(
        &self,
        resource: &Resource,
        language: Option<&Language>,
    ) -> Result<String, Error> {
        let method = if resource.i18n_method == "PO" && language.is_none() {
            "POT"
        } else {
            resource.i18n_method.as_str()
        };
        match self.extensions_for(method).first() {
            Some(extension) => Ok(extension.trim_start_matches('.').to_string()),
            None => {
                error!(
                    resource = %resource.slug,
                    method, "no extensions registered for method"
                );
                Err(Error::NoExtensions(method.to_string()))
            }
        }
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry::with_defaults()
    }
}

/// Sniffs a mimetype from file content, for callers that have bytes but no
/// usable filename.
pub fn sniff_mimetype(content: &str) -> Option<&'static str> {
    let trimmed = content.trim_start();
    if trimmed.starts_with("<?xml") || trimmed.starts_with('<') {
        if trimmed.contains("<xliff") {
            return Some("application/x-xliff+xml");
        }
        if trimmed.contains("<TS") || trimmed.contains("<!DOCTYPE TS") {
            return Some("application/x-linguist");
        }
        return None;
    }
    if trimmed.contains("msgid ") && trimmed.contains("msgstr") {
        return Some("text/x-po");
    }
    if trimmed.starts_with("[Desktop Entry]") {
        return Some("application/x-desktop");
    }
    None
}
