//! Request processing: envelope in, envelope out.

use base64::Engine as _;

use crate::engine::{ExecutionEngine, RunnerConfig};
use crate::envelope::{Envelope, RunRequest, RunResult};
use crate::error::{Result, RunnerError};

/// Top-level entry point for run requests.
///
/// # Example
///
/// ```ignore
/// let runner = CodeRunner::new()?;
/// if let Some(response) = runner.process(&request_json)? {
///     assert_eq!(response.sequence, 123);
/// }
/// ```
pub struct CodeRunner {
    engine: ExecutionEngine,
}

impl CodeRunner {
    /// Create a runner with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&RunnerConfig::default())
    }

    pub fn with_config(config: &RunnerConfig) -> Result<Self> {
        Ok(Self {
            engine: ExecutionEngine::new(config)?,
        })
    }

    /// Decode a request envelope and run it.
    ///
    /// Returns `Ok(None)` when the request carries neither a module nor any
    /// diagnostics. Only a malformed envelope produces an `Err`.
    pub fn process(&self, envelope_json: &str) -> Result<Option<Envelope<RunResult>>> {
        let envelope: Envelope<RunRequest> = serde_json::from_str(envelope_json)?;

        if envelope.data.is_empty() {
            tracing::debug!(sequence = envelope.sequence, "empty run request");
            return Ok(None);
        }

        Ok(Some(
            self.execute_run_request(&envelope.data, envelope.sequence),
        ))
    }

    /// [`CodeRunner::process`], with the response serialized back to JSON.
    pub fn process_json(&self, envelope_json: &str) -> Result<Option<String>> {
        self.process(envelope_json)?
            .map(|response| serde_json::to_string(&response).map_err(RunnerError::from))
            .transpose()
    }

    /// Run an already decoded request, always producing a response.
    pub fn execute_run_request(&self, request: &RunRequest, sequence: i64) -> Envelope<RunResult> {
        if !request.succeeded {
            let output = request
                .diagnostics
                .iter()
                .flatten()
                .map(|diagnostic| diagnostic.message.clone())
                .collect();
            tracing::debug!(sequence, "compilation failed, returning diagnostics");
            return Envelope::new(sequence, RunResult::with_output(output));
        }

        let result = match self.run(request) {
            Ok(output) => RunResult::with_output(output),
            Err(e) if e.is_entry_point_error() => RunResult::with_output(vec![e.to_string()]),
            Err(e) => {
                tracing::debug!(sequence, error = %e, "run faulted");
                RunResult::with_exception(e.to_string())
            }
        };
        Envelope::new(sequence, result)
    }

    fn run(&self, request: &RunRequest) -> Result<Vec<String>> {
        let encoded = request.base64_assembly.as_deref().unwrap_or_default();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| RunnerError::Load(format!("module is not valid base64: {e}")))?;

        self.engine.execute(&bytes, request.run_args.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{is_redirected, serial};
    use crate::envelope::Diagnostic;
    use serde_json::json;

    fn encode(wat: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(wat)
    }

    fn request(sequence: i64, data: serde_json::Value) -> String {
        json!({ "sequence": sequence, "data": data }).to_string()
    }

    #[test]
    fn runner_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodeRunner>();
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        let runner = CodeRunner::new().unwrap();
        assert!(matches!(
            runner.process("{\"sequence\": "),
            Err(RunnerError::Decode(_))
        ));
        assert!(matches!(
            runner.process("{\"sequence\": \"abc\", \"data\": {}}"),
            Err(RunnerError::Decode(_))
        ));
    }

    #[test]
    fn empty_request_has_no_response() {
        let _serial = serial();
        let runner = CodeRunner::new().unwrap();
        let json = request(
            0,
            json!({
                "base64Assembly": null,
                "succeeded": false,
                "diagnostics": null,
                "runArgs": null
            }),
        );
        assert_eq!(runner.process(&json).unwrap(), None);
        assert_eq!(runner.process_json(&json).unwrap(), None);
        assert!(!is_redirected());
    }

    #[test]
    fn diagnostics_become_output() {
        let runner = CodeRunner::new().unwrap();
        let request = RunRequest {
            succeeded: false,
            diagnostics: Some(vec![
                Diagnostic::new(0, 1, "first message", 2),
                Diagnostic::new(3, 4, "second message", 5),
            ]),
            ..Default::default()
        };

        let response = runner.execute_run_request(&request, 5);
        assert_eq!(response.sequence, 5);
        assert_eq!(
            response.data.output,
            Some(vec!["first message".to_string(), "second message".to_string()])
        );
        assert_eq!(response.data.diagnostics, None);
        assert_eq!(response.data.runner_exception, None);
    }

    #[test]
    fn invalid_base64_is_a_load_fault() {
        let _serial = serial();
        let runner = CodeRunner::new().unwrap();
        let json = request(
            9,
            json!({ "base64Assembly": "not base64!!", "succeeded": true }),
        );

        let response = runner.process(&json).unwrap().unwrap();
        assert_eq!(response.sequence, 9);
        assert_eq!(response.data.output, None);
        let exception = response.data.runner_exception.unwrap();
        assert!(exception.contains("not valid base64"));
    }

    #[test]
    fn stamps_runner_version() {
        let _serial = serial();
        let runner = CodeRunner::new().unwrap();
        let json = request(
            1,
            json!({
                "base64Assembly": encode(include_str!("../tests/fixtures/hello_world.wat")),
                "succeeded": true
            }),
        );

        let response = runner.process(&json).unwrap().unwrap();
        assert_eq!(response.data.code_runner_version, crate::VERSION);
        assert!(!response.data.code_runner_version.is_empty());
    }

    #[test]
    fn process_json_writes_response_envelope() {
        let _serial = serial();
        let runner = CodeRunner::new().unwrap();
        let json = request(
            42,
            json!({
                "base64Assembly": encode(include_str!("../tests/fixtures/hello_world.wat")),
                "succeeded": true
            }),
        );

        let response = runner.process_json(&json).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["sequence"], 42);
        assert_eq!(value["data"]["output"], json!(["Hello World!", ""]));
        assert_eq!(value["data"]["runnerException"], serde_json::Value::Null);
    }
}
