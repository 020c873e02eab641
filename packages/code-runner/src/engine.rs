//! Guarded execution of a module's entry point.
//!
//! The engine owns the wasmtime [`Engine`] and a [`Linker`] carrying the
//! host `console` instance. Each call gets a fresh [`Store`], so nothing a
//! guest does survives into the next call except what it wrote to the
//! console, and that is captured.

use wasmtime::component::{ComponentExportIndex, Linker, Val};
use wasmtime::{Config, Engine, Store};

use crate::args::{self, BoundArgs};
use crate::capture::{self, OutputCapture};
use crate::entry::{EntryPoint, EntryResolver};
use crate::error::{Result, RunnerError};
use crate::loader::{LoadedModule, ModuleImport, ModuleLoader, ParamType};

/// Name of the host instance guests import for console output.
pub const CONSOLE_INSTANCE: &str = "console";

/// Functions provided by the host `console` instance.
pub const CONSOLE_FUNCTIONS: &[&str] = &["write", "write-line"];

/// Configuration for the execution engine.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Name of the static function to run.
    pub entry_point: String,

    /// Instruction budget per run. `None` runs without a limit.
    pub fuel: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            fuel: None,
        }
    }
}

/// The result of one execution: the captured lines, or a fault.
pub type RunOutcome = Result<Vec<String>>;

/// Loads, resolves, binds and runs modules.
pub struct ExecutionEngine {
    engine: Engine,
    loader: ModuleLoader,
    resolver: EntryResolver,
    linker: Linker<()>,
    fuel: Option<u64>,
}

impl ExecutionEngine {
    pub fn new(config: &RunnerConfig) -> Result<Self> {
        let mut wasm_config = Config::new();
        wasm_config.wasm_component_model(true);
        if config.fuel.is_some() {
            wasm_config.consume_fuel(true);
        }

        let engine = Engine::new(&wasm_config).map_err(engine_error)?;
        let linker = console_linker(&engine)?;

        Ok(Self {
            loader: ModuleLoader::new(engine.clone()),
            resolver: EntryResolver::new(config.entry_point.clone()),
            engine,
            linker,
            fuel: config.fuel,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Run the entry point of `module_bytes` with `run_args`.
    ///
    /// Failures at any stage come back as `Err`; none of them escape as a
    /// panic and the console is restored before returning.
    pub fn execute(&self, module_bytes: &[u8], run_args: Option<&str>) -> RunOutcome {
        let module = self.loader.load(module_bytes)?;
        let entry = self.resolver.resolve(&module)?;
        let args = args::bind(args::tokenize(run_args), &entry)?;

        tracing::debug!(entry = %entry.qualified_name(), "invoking entry point");

        let capture = OutputCapture::begin();
        self.invoke(&module, &entry, args)?;
        Ok(capture.end())
    }

    fn invoke(&self, module: &LoadedModule, entry: &EntryPoint, args: BoundArgs) -> Result<()> {
        check_imports(module)?;

        let mut store = Store::new(&self.engine, ());
        if let Some(fuel) = self.fuel {
            store.set_fuel(fuel).map_err(engine_error)?;
        }

        let instance = self
            .linker
            .instantiate(&mut store, module.component())
            .map_err(guest_error)?;

        let index = entry
            .path
            .iter()
            .try_fold(None::<ComponentExportIndex>, |parent, name| {
                module
                    .component()
                    .get_export_index(parent.as_ref(), name)
                    .map(Some)
            })
            .flatten();
        let func = index
            .and_then(|index| instance.get_func(&mut store, index))
            .ok_or_else(|| {
                RunnerError::Guest(format!(
                    "entry point `{}` is not a function export",
                    entry.qualified_name()
                ))
            })?;

        let params = to_values(entry, args)?;
        let mut results = vec![Val::Bool(false); entry.results];
        func.call(&mut store, &params, &mut results)
            .map_err(guest_error)?;
        func.post_return(&mut store).map_err(guest_error)?;
        Ok(())
    }
}

fn console_linker(engine: &Engine) -> Result<Linker<()>> {
    let mut linker = Linker::new(engine);
    let mut console = linker.instance(CONSOLE_INSTANCE).map_err(engine_error)?;
    console
        .func_wrap("write", |_store, (text,): (String,)| {
            capture::write(&text);
            Ok(())
        })
        .map_err(engine_error)?;
    console
        .func_wrap("write-line", |_store, (text,): (String,)| {
            capture::write_line(&text);
            Ok(())
        })
        .map_err(engine_error)?;
    Ok(linker)
}

/// Reject modules that import anything the host does not provide.
fn check_imports(module: &LoadedModule) -> Result<()> {
    for import in module.imports() {
        match import {
            ModuleImport::Instance { name, exports } if name == CONSOLE_INSTANCE => {
                if let Some(missing) = exports
                    .iter()
                    .find(|export| !CONSOLE_FUNCTIONS.contains(&export.as_str()))
                {
                    return Err(RunnerError::MissingType(format!("{name}/{missing}")));
                }
            }
            other => return Err(RunnerError::MissingType(other.name().to_string())),
        }
    }
    Ok(())
}

fn to_values(entry: &EntryPoint, args: BoundArgs) -> Result<Vec<Val>> {
    match args {
        BoundArgs::None => Ok(Vec::new()),
        BoundArgs::Array(tokens) => Ok(vec![Val::List(
            tokens.into_iter().map(Val::String).collect(),
        )]),
        BoundArgs::Named(values) => entry
            .parameters
            .iter()
            .zip(values)
            .map(|(param, (_, value))| match (&param.ty, value) {
                (ParamType::NullableString, value) => {
                    Ok(Val::Option(value.map(|v| Box::new(Val::String(v)))))
                }
                (_, Some(value)) => Ok(Val::String(value)),
                (_, None) => Err(RunnerError::NullArgument(param.name.clone())),
            })
            .collect(),
    }
}

fn engine_error(err: wasmtime::Error) -> RunnerError {
    RunnerError::Engine(format!("{err:#}"))
}

/// Keeps the full error chain, which includes the wasm backtrace for traps.
fn guest_error(err: wasmtime::Error) -> RunnerError {
    tracing::debug!(error = %err, "guest execution failed");
    RunnerError::Guest(format!("{err:?}"))
}
