//! Wire types for run requests and responses.
//!
//! Both directions travel inside an [`Envelope`] whose `sequence` lets the
//! caller correlate in-flight calls. Keys are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Sequence-numbered wrapper around a request or response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub sequence: i64,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(sequence: i64, data: T) -> Self {
        Self { sequence, data }
    }
}

/// A compiler diagnostic attached to a request.
///
/// Only `message` is consumed; the rest is carried for the caller's benefit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostic {
    pub severity: i32,
    pub line: i32,
    pub message: String,
    pub column: i32,
    pub text: String,
}

impl Diagnostic {
    pub fn new(severity: i32, line: i32, message: impl Into<String>, column: i32) -> Self {
        Self {
            severity,
            line,
            message: message.into(),
            column,
            text: String::new(),
        }
    }
}

/// One unit of work: a compiled module plus how to run it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunRequest {
    /// Base64-encoded component bytes.
    pub base64_assembly: Option<String>,

    /// Whether the upstream compilation succeeded.
    pub succeeded: bool,

    pub diagnostics: Option<Vec<Diagnostic>>,

    /// Command-line style arguments for the entry function.
    pub run_args: Option<String>,
}

impl RunRequest {
    /// True when the request carries neither module bytes nor diagnostics.
    pub fn is_empty(&self) -> bool {
        let no_module = self
            .base64_assembly
            .as_deref()
            .is_none_or(|assembly| assembly.is_empty());
        let no_diagnostics = self.diagnostics.as_ref().is_none_or(Vec::is_empty);
        no_module && no_diagnostics
    }
}

/// The outcome of one run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub output: Option<Vec<String>>,
    pub diagnostics: Option<Vec<String>>,
    pub runner_exception: Option<String>,
    pub code_runner_version: String,
}

impl RunResult {
    /// Result carrying program output.
    pub fn with_output(output: Vec<String>) -> Self {
        Self {
            output: Some(output),
            diagnostics: None,
            runner_exception: None,
            code_runner_version: crate::VERSION.to_string(),
        }
    }

    /// Result carrying a runner exception and no output.
    pub fn with_exception(message: impl Into<String>) -> Self {
        Self {
            output: None,
            diagnostics: None,
            runner_exception: Some(message.into()),
            code_runner_version: crate::VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_reads_camel_case_keys() {
        let envelope: Envelope<RunRequest> = serde_json::from_value(json!({
            "sequence": 7,
            "data": {
                "base64Assembly": "AGFzbQ==",
                "succeeded": true,
                "diagnostics": null,
                "runArgs": "--region one"
            }
        }))
        .unwrap();

        assert_eq!(envelope.sequence, 7);
        assert_eq!(envelope.data.base64_assembly.as_deref(), Some("AGFzbQ=="));
        assert!(envelope.data.succeeded);
        assert_eq!(envelope.data.diagnostics, None);
        assert_eq!(envelope.data.run_args.as_deref(), Some("--region one"));
    }

    #[test]
    fn request_fields_default_when_missing() {
        let request: RunRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request, RunRequest::default());
        assert!(request.is_empty());
    }

    #[test]
    fn diagnostic_fields_default_when_missing() {
        let diagnostic: Diagnostic = serde_json::from_value(json!({"message": "boom"})).unwrap();
        assert_eq!(diagnostic.message, "boom");
        assert_eq!(diagnostic.severity, 0);
        assert!(diagnostic.text.is_empty());
    }

    #[test]
    fn empty_diagnostics_list_counts_as_empty() {
        let request = RunRequest {
            diagnostics: Some(vec![]),
            ..Default::default()
        };
        assert!(request.is_empty());

        let request = RunRequest {
            diagnostics: Some(vec![Diagnostic::new(0, 1, "message", 2)]),
            ..Default::default()
        };
        assert!(!request.is_empty());
    }

    #[test]
    fn result_writes_nulls_and_version_key() {
        let result = RunResult::with_exception("trap");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["output"], serde_json::Value::Null);
        assert_eq!(value["diagnostics"], serde_json::Value::Null);
        assert_eq!(value["runnerException"], "trap");
        assert_eq!(value["codeRunnerVersion"], crate::VERSION);
    }
}
