//! # Code Runner
//!
//! Runs compiled WebAssembly components on behalf of a caller and reports
//! what they printed.
//!
//! A request arrives as a JSON [`Envelope`] holding a base64-encoded
//! component, the upstream compiler's verdict and diagnostics, and an
//! optional command-line style argument string. The runner:
//!
//! 1. decodes the envelope and applies the short-circuit policies (nothing to
//!    do, or compilation failed and the diagnostics become the output);
//! 2. loads the component and catalogs its exports ([`loader`]);
//! 3. finds the static `main` function, whatever instance it is exported
//!    from ([`entry`]);
//! 4. tokenizes the arguments and binds them to `main`'s parameters, either
//!    as one `list<string>` or as `--name value` flags ([`args`]);
//! 5. runs `main` with console output captured ([`capture`], [`engine`]);
//! 6. answers with an envelope carrying the same sequence number.
//!
//! ## Guest ABI
//!
//! Guests print through a single host import:
//!
//! ```text
//! interface console {
//!     write: func(text: string);
//!     write-line: func(text: string);
//! }
//! ```
//!
//! and export a `main` function taking one of:
//!
//! ```text
//! main: func();
//! main: func(args: list<string>);
//! main: func(region: string, session: option<string>, ...);
//! ```
//!
//! ## Failures
//!
//! A guest can trap, import something the host lacks, or declare a
//! signature the runner cannot bind. All of these become a
//! `runnerException` in the response. A missing entry point is reported as
//! program output, the way a compiler reports it. Only a malformed request
//! envelope is returned to the caller as an error.
//!
//! ## Example
//!
//! ```ignore
//! use code_runner::CodeRunner;
//!
//! let runner = CodeRunner::new()?;
//! let request = r#"{"sequence": 1, "data": {"base64Assembly": "...", "succeeded": true}}"#;
//! if let Some(response) = runner.process(request)? {
//!     for line in response.data.output.unwrap_or_default() {
//!         println!("{line}");
//!     }
//! }
//! ```

pub mod args;
pub mod capture;
pub mod engine;
pub mod entry;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod processor;

pub use args::{bind, tokenize, BoundArgs};
pub use capture::{CaptureHandle, OutputCapture};
pub use engine::{ExecutionEngine, RunOutcome, RunnerConfig};
pub use entry::{EntryPoint, EntryResolver, ParameterShape};
pub use envelope::{Diagnostic, Envelope, RunRequest, RunResult};
pub use error::{Result, RunnerError};
pub use loader::{LoadedModule, ModuleLoader};
pub use processor::CodeRunner;

/// Version reported in every response.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
