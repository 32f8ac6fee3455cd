use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::error::{EvaluatorError, Result};
use crate::flow;
use crate::manifest::{EvaluatorManifest, Manifest};

/// Turns the fields of a manifest (discriminator removed) into a typed manifest.
///
/// Receives the registry so that composite manifests can parse nested ones.
pub type ManifestParser = fn(&Registry, Value) -> Result<Box<dyn EvaluatorManifest>>;

/// Discriminator to parser mapping.
///
/// Populated once at startup. Parsing resolves the discriminator before
/// touching anything else, so an unknown kind fails without any I/O.
#[derive(Debug, Clone)]
pub struct Registry {
    parsers: BTreeMap<String, ManifestParser>,
}

impl Registry {
    /// A registry holding only the built-in `flow` kind.
    pub fn new() -> Self {
        let mut parsers: BTreeMap<String, ManifestParser> = BTreeMap::new();
        parsers.insert(flow::KIND.to_string(), flow::parse);
        Registry { parsers }
    }

    /// A registry with no kinds at all.
    pub fn empty() -> Self {
        Registry {
            parsers: BTreeMap::new(),
        }
    }

    /// A registry holding `flow` plus `kinds`.
    ///
    /// A later entry replaces an earlier one of the same kind.
    pub fn with_kinds<'a, I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, ManifestParser)>,
    {
        let mut registry = Registry::new();
        for (kind, parser) in kinds {
            registry.parsers.insert(kind.to_string(), parser);
            info!(kind, "registered evaluator kind");
        }
        registry
    }

    pub fn register(&mut self, kind: &str, parser: ManifestParser) -> Result<()> {
        if self.parsers.contains_key(kind) {
            return Err(EvaluatorError::DuplicateKind(kind.to_string()));
        }
        self.parsers.insert(kind.to_string(), parser);
        info!(kind, "registered evaluator kind");
        Ok(())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.parsers.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
        self.parsers.keys().map(String::as_str)
    }

    pub fn parse_str(&self, json: &str) -> Result<Manifest> {
        let value: Value = serde_json::from_str(json)?;
        self.parse_value(value)
    }

    /// Resolve the `type` discriminator (or its alias `kind`) and hand the
    /// remaining fields to the registered parser.
    pub fn parse_value(&self, value: Value) -> Result<Manifest> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(EvaluatorError::MissingKind),
        };
        let discriminator = fields.remove("type");
        let alias = fields.remove("kind");
        let kind = match discriminator.or(alias) {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(EvaluatorError::invalid_manifest(
                    other.to_string(),
                    "discriminator must be a string",
                ))
            }
            None => return Err(EvaluatorError::MissingKind),
        };

        let parser = self
            .parsers
            .get(&kind)
            .ok_or_else(|| EvaluatorError::UnknownKind {
                kind: kind.clone(),
                known: self.kinds().map(String::from).collect(),
            })?;
        Ok(Manifest::new(parser(self, Value::Object(fields))?))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize manifest fields into `M`, reporting failures as
/// [`EvaluatorError::InvalidManifest`] for `kind`.
pub fn from_fields<M: DeserializeOwned>(kind: &str, fields: Value) -> Result<M> {
    serde_json::from_value(fields).map_err(|e| EvaluatorError::invalid_manifest(kind, e.to_string()))
}
