//! Serialization-safe materialization of outcomes.
//!
//! [`NormalizedOutcome`] is the shape outcomes take when they leave the
//! process: in logs, HTTP error bodies, or test assertions. It is fully owned,
//! implements `Serialize` and `Deserialize`, and never contains secrets found
//! under well-known keys of failure details or opaque causes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cause::{Cause, FailureView};
use crate::kind::{ErrorKind, SUCCEED_NAME, short_type_name};
use crate::outcome::Failure;
use crate::record::Record;

/// Object keys whose values are replaced during normalization.
///
/// Matching is case-insensitive and ignores `-`/`_` differences.
pub const SECURE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "authorization",
    "api_key",
    "access_key",
    "secret_access_key",
    "cookie",
];

// ─────────────────────────────────────────────────────────────────────────────
// NormalizedOutcome
// ─────────────────────────────────────────────────────────────────────────────

/// Fully materialized view of an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOutcome {
    /// Unique id of the outcome.
    pub id: Uuid,
    /// `Succeed`, or the error kind name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Discriminant.
    pub succeeded: bool,
    /// Success data, or failure details.
    pub data: Value,
    /// Error kind name; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Construction site as `file:line:column`.
    #[serde(default)]
    pub origin: Option<String>,
    /// Ambient execution id at construction.
    #[serde(default)]
    pub execution_id: Option<String>,
    /// Primary cause, normalized one level deep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<NormalizedCause>>,
    /// Normalized entries of the cause chain (empty for nested outcomes).
    #[serde(default)]
    pub cause_chain: Vec<NormalizedCause>,
    /// Kind names of the cause chain.
    pub cause_kind_chain: Vec<String>,
}

/// Normalized form of one cause chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalizedCause {
    /// A failed outcome, summarized: its own causes appear by kind only.
    Outcome(Box<NormalizedOutcome>),
    /// A native error or a caught panic.
    Error {
        /// Short type name, or `Panic`.
        name: String,
        /// Rendered error message.
        message: String,
        /// Rendered `source()` chain.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// An opaque value, with secrets redacted.
    Opaque {
        /// The redacted value.
        value: Value,
    },
}

impl NormalizedCause {
    /// Kind name of this entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Outcome(outcome) => &outcome.name,
            Self::Error { name, .. } => name,
            Self::Opaque { value } => value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(crate::kind::MISSING_ERROR_KIND),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn success<T: Serialize>(record: &Record, data: &T) -> NormalizedOutcome {
    let mut normalized = summary(record, SUCCEED_NAME, to_json_or_placeholder(data), None);
    normalized.cause_kind_chain = vec![SUCCEED_NAME.to_owned()];
    normalized.cause_chain = vec![NormalizedCause::Outcome(Box::new(normalized.clone()))];
    normalized
}

pub(crate) fn failure<K: ErrorKind>(failure: &Failure<K>) -> NormalizedOutcome {
    let name = failure.kind().name();
    let mut normalized = summary(
        failure.record(),
        name,
        redact(failure.details()),
        Some(name),
    );
    normalized.cause_kind_chain = FailureView::cause_kind_chain(failure);

    let head = NormalizedCause::Outcome(Box::new(view_summary(failure)));
    normalized.cause_chain = core::iter::once(head)
        .chain(failure.ancestors().iter().map(normalize_cause))
        .collect();
    normalized.cause = failure.cause().map(|cause| Box::new(normalize_cause(cause)));
    normalized
}

/// Normalizes a single cause. Nested failures are summarized one level deep.
#[must_use]
pub fn normalize_cause(cause: &Cause) -> NormalizedCause {
    match cause {
        Cause::Outcome(view) => NormalizedCause::Outcome(Box::new(view_summary(view.as_ref()))),
        Cause::Error(error) => NormalizedCause::Error {
            name: error.name().to_owned(),
            message: error.error().to_string(),
            source: error.render_sources(),
        },
        Cause::Panic(message) => NormalizedCause::Error {
            name: "Panic".to_owned(),
            message: message.to_string(),
            source: None,
        },
        Cause::Value(value) => NormalizedCause::Opaque {
            value: redact(value),
        },
    }
}

fn view_summary(view: &dyn FailureView) -> NormalizedOutcome {
    let mut normalized = summary(
        view.record(),
        view.name(),
        redact(view.details()),
        Some(view.name()),
    );
    normalized.cause_kind_chain = view.cause_kind_chain();
    normalized
}

fn summary(
    record: &Record,
    name: &str,
    data: Value,
    error_kind: Option<&str>,
) -> NormalizedOutcome {
    NormalizedOutcome {
        id: record.id(),
        name: name.to_owned(),
        message: record.message().to_owned(),
        succeeded: error_kind.is_none(),
        data,
        error_kind: error_kind.map(str::to_owned),
        origin: Some(record.origin().to_string()),
        execution_id: record.execution_id().map(str::to_owned),
        cause: None,
        cause_chain: Vec::new(),
        cause_kind_chain: Vec::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Converts `value` to JSON, or to a placeholder string naming its type when
/// it cannot be represented.
pub(crate) fn to_json_or_placeholder<V: Serialize>(value: &V) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| {
        Value::String(format!(
            "_UNSERIALIZABLE_{}_",
            short_type_name(core::any::type_name::<V>())
        ))
    })
}

/// Returns a copy of `value` with every secure key's value replaced.
#[must_use]
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if is_secure_key(key) {
                        Value::String(format!("_SECURE_<{}>{}_", json_type(value), key))
                    } else {
                        redact(value)
                    };
                    (key.clone(), value)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_secure_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase().replace('-', "_");
    SECURE_KEYS.iter().any(|secure| key == *secure)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_nested_secure_keys() {
        let value = json!({
            "user": "app",
            "Password": "hunter2",
            "nested": [{ "api-key": 42 }],
        });

        assert_eq!(
            redact(&value),
            json!({
                "user": "app",
                "Password": "_SECURE_<string>Password_",
                "nested": [{ "api-key": "_SECURE_<number>api-key_" }],
            })
        );
    }

    #[test]
    fn unserializable_values_become_placeholders() {
        struct Opaque;
        impl Serialize for Opaque {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("not representable"))
            }
        }

        assert_eq!(
            to_json_or_placeholder(&Opaque),
            Value::String("_UNSERIALIZABLE_Opaque_".to_owned())
        );
    }
}
