//! JSON Schema validation for the MME wire schema.
//!
//! Each named definition is compiled once into a draft-4 [`jsonschema::Validator`] with
//! `format` checking switched on. Definitions refer to each other through internal
//! `#/definitions/...` references, so every compiled definition carries the whole
//! `definitions` table alongside it.
//!
//! Schema documents are checked when loaded: every `$ref` must resolve inside the document and
//! no reference may lead back to itself without passing through a constraint, so validation
//! itself never fails for schema reasons.

use crate::{Mode, SchemaError, SchemaResult, API_SCHEMA};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

static WIRE_SCHEMA: LazyLock<Result<WireSchema, String>> =
    LazyLock::new(|| WireSchema::from_json_str(API_SCHEMA).map_err(|e| e.to_string()));

/// One violated schema constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer to the offending value (empty string for the document root). For a
    /// missing required property the pointer names the property that should exist.
    pub path: String,
    /// Schema keyword that failed, e.g. `required` or `format`.
    pub keyword: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "<root>"
        } else {
            self.path.as_str()
        };
        write!(f, "{path}: {}", self.message)
    }
}

/// A loaded, immutable wire schema.
pub struct WireSchema {
    validators: HashMap<String, Validator>,
}

impl fmt::Debug for WireSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("WireSchema")
            .field("definitions", &names)
            .finish()
    }
}

impl WireSchema {
    /// The process-wide schema, parsed from the embedded `api.json` on first use.
    pub fn global() -> SchemaResult<&'static WireSchema> {
        WIRE_SCHEMA
            .as_ref()
            .map_err(|msg| SchemaError::InvalidSchema(msg.clone()))
    }

    /// Parses a schema document from JSON text.
    pub fn from_json_str(text: &str) -> SchemaResult<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::InvalidSchema(format!("schema is not valid JSON: {e}")))?;
        Self::from_value(root)
    }

    /// Builds a schema from a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidSchema`] if the document has no `request` or `response`
    /// definition, contains a `$ref` that does not resolve or only refers back to itself, or a
    /// definition that does not compile (for example a `pattern` that is not a valid regex).
    pub fn from_value(root: Value) -> SchemaResult<Self> {
        let Some(definitions) = root.get("definitions").and_then(Value::as_object) else {
            return Err(SchemaError::InvalidSchema(
                "schema has no 'definitions' object".into(),
            ));
        };
        for mode in [Mode::Request, Mode::Response] {
            if !definitions.contains_key(mode.definition()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "schema has no '{}' definition",
                    mode.definition()
                )));
            }
        }

        check_references(&root, &root)?;

        let validators = definitions
            .keys()
            .map(|name| Ok((name.clone(), compile_definition(definitions, name)?)))
            .collect::<SchemaResult<HashMap<_, _>>>()?;

        Ok(Self { validators })
    }

    /// Validates a document against the request or response branch.
    pub fn validate(&self, document: &Value, mode: Mode) -> SchemaResult<()> {
        self.validate_definition(document, mode.definition())
    }

    /// Validates a document against a named definition.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownDefinition`] if `definition` does not exist, or
    /// [`SchemaError::Violations`] with every violated constraint.
    pub fn validate_definition(&self, document: &Value, definition: &str) -> SchemaResult<()> {
        let validator = self
            .validators
            .get(definition)
            .ok_or_else(|| SchemaError::UnknownDefinition(definition.to_owned()))?;

        let violations: Vec<Violation> = validator
            .iter_errors(document)
            .flat_map(|error| to_violations(&error))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            tracing::info!(
                definition,
                count = violations.len(),
                "document rejected by wire schema"
            );
            Err(SchemaError::Violations(violations))
        }
    }
}

/// Compiles one definition, carrying the full `definitions` table so internal references
/// resolve.
fn compile_definition(definitions: &Map<String, Value>, name: &str) -> SchemaResult<Validator> {
    let schema = json!({
        "definitions": definitions,
        "allOf": [{ "$ref": format!("#/definitions/{}", escape_segment(name)) }]
    });
    jsonschema::draft4::options()
        .should_validate_formats(true)
        .build(&schema)
        .map_err(|e| SchemaError::InvalidSchema(format!("definition '{name}': {e}")))
}

/// Converts one validation error into violations.
///
/// A missing required property is reported at the pointer of that property, and every
/// unexpected additional property gets a violation of its own.
fn to_violations(error: &ValidationError<'_>) -> Vec<Violation> {
    let path = error.instance_path.to_string();
    let schema_path = error.schema_path.to_string();
    let keyword = schema_path.rsplit('/').next().unwrap_or_default().to_owned();

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| property.to_string());
            vec![Violation {
                path: child_pointer(&path, &name),
                keyword,
                message: error.to_string(),
            }]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|name| Violation {
                path: child_pointer(&path, name),
                keyword: keyword.clone(),
                message: format!("additional property '{name}' is not allowed"),
            })
            .collect(),
        _ => vec![Violation {
            path,
            keyword,
            message: error.to_string(),
        }],
    }
}

/// Walks a schema document checking that every `$ref` resolves and does not loop back to
/// itself through references alone.
fn check_references(root: &Value, node: &Value) -> SchemaResult<()> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                follow_reference(root, reference)?;
            }
            map.values()
                .try_for_each(|child| check_references(root, child))
        }
        Value::Array(items) => items
            .iter()
            .try_for_each(|child| check_references(root, child)),
        _ => Ok(()),
    }
}

fn follow_reference(root: &Value, reference: &str) -> SchemaResult<()> {
    let mut seen = HashSet::new();
    let mut current = reference;
    loop {
        if !seen.insert(current) {
            return Err(SchemaError::InvalidSchema(format!(
                "reference cycle through '{reference}'"
            )));
        }
        let target = resolve_in(root, current).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("unresolvable reference '{current}'"))
        })?;
        match target.get("$ref").and_then(Value::as_str) {
            Some(next) => current = next,
            None => return Ok(()),
        }
    }
}

/// Resolves an internal reference (`#` or `#/json/pointer`).
fn resolve_in<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        Some(root)
    } else {
        root.pointer(pointer)
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn child_pointer(parent: &str, segment: &str) -> String {
    format!("{parent}/{}", escape_segment(segment))
}
