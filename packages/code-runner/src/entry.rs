//! Entry point discovery.

use crate::error::{Result, RunnerError};
use crate::loader::{LoadedModule, ParamType, Parameter};

/// The parameter shapes an entry function can have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterShape {
    /// No parameters.
    NoArgs,

    /// A single `list<string>` parameter receiving every token.
    StringArray,

    /// One or more string parameters bound by `--name value` flags.
    NamedStrings(Vec<String>),
}

/// The resolved entry function of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Export names leading from the component root to the function.
    pub path: Vec<String>,
    pub parameters: Vec<Parameter>,

    /// Number of declared results, which are discarded after the call.
    pub results: usize,
}

impl EntryPoint {
    pub fn new(path: Vec<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            path,
            parameters,
            results: 0,
        }
    }

    /// Slash-separated export path, e.g. `program/main`.
    pub fn qualified_name(&self) -> String {
        self.path.join("/")
    }

    /// Classify the parameter list.
    ///
    /// Fails with [`RunnerError::UnsupportedSignature`] for anything but no
    /// parameters, a single `list<string>`, or only string parameters.
    pub fn shape(&self) -> Result<ParameterShape> {
        match self.parameters.as_slice() {
            [] => Ok(ParameterShape::NoArgs),
            [only] if only.ty == ParamType::StringList => Ok(ParameterShape::StringArray),
            params if params.iter().all(|p| p.ty.is_string()) => Ok(
                ParameterShape::NamedStrings(params.iter().map(|p| p.name.clone()).collect()),
            ),
            params => Err(RunnerError::UnsupportedSignature {
                entry: self.qualified_name(),
                params: params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, type_name(&p.ty)))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

fn type_name(ty: &ParamType) -> &str {
    match ty {
        ParamType::String => "string",
        ParamType::NullableString => "option<string>",
        ParamType::StringList => "list<string>",
        ParamType::Other(name) => name,
    }
}

/// Finds the entry function of a loaded module.
#[derive(Debug, Clone)]
pub struct EntryResolver {
    name: String,
}

impl EntryResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Find the single static method named after the entry point.
    ///
    /// Every type is searched and visibility is not considered; instance
    /// methods and constructors never qualify.
    pub fn resolve(&self, module: &LoadedModule) -> Result<EntryPoint> {
        let mut candidates: Vec<EntryPoint> = module
            .methods()
            .filter(|(_, method)| method.is_static() && method.name == self.name)
            .map(|(_, method)| EntryPoint {
                path: method.export_path.clone(),
                parameters: method.parameters.clone(),
                results: method.results,
            })
            .collect();

        match candidates.len() {
            0 => Err(RunnerError::NoEntryPoint(self.name.clone())),
            1 => Ok(candidates.remove(0)),
            _ => Err(RunnerError::AmbiguousEntryPoint(
                candidates.iter().map(EntryPoint::qualified_name).collect(),
            )),
        }
    }
}

impl Default for EntryResolver {
    fn default() -> Self {
        Self::new("main")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ModuleLoader;
    use wasmtime::{Config, Engine};

    fn load(wat: &str) -> LoadedModule {
        let mut config = Config::new();
        config.wasm_component_model(true);
        ModuleLoader::new(Engine::new(&config).unwrap())
            .load(wat.as_bytes())
            .unwrap()
    }

    fn entry(params: Vec<Parameter>) -> EntryPoint {
        EntryPoint::new(vec!["main".to_string()], params)
    }

    #[test]
    fn shape_no_args() {
        assert_eq!(entry(vec![]).shape().unwrap(), ParameterShape::NoArgs);
    }

    #[test]
    fn shape_string_array() {
        let e = entry(vec![Parameter::new("args", ParamType::StringList)]);
        assert_eq!(e.shape().unwrap(), ParameterShape::StringArray);
    }

    #[test]
    fn shape_named_strings_accepts_nullable() {
        let e = entry(vec![
            Parameter::new("region", ParamType::String),
            Parameter::new("session", ParamType::NullableString),
        ]);
        assert_eq!(
            e.shape().unwrap(),
            ParameterShape::NamedStrings(vec!["region".into(), "session".into()])
        );
    }

    #[test]
    fn shape_rejects_mixed_parameters() {
        let e = entry(vec![
            Parameter::new("region", ParamType::String),
            Parameter::new("count", ParamType::Other("u32".into())),
        ]);
        let err = e.shape().unwrap_err();
        assert!(err.to_string().contains("count: u32"));
    }

    #[test]
    fn shape_rejects_string_list_among_others() {
        let e = entry(vec![
            Parameter::new("args", ParamType::StringList),
            Parameter::new("region", ParamType::String),
        ]);
        assert!(matches!(
            e.shape(),
            Err(RunnerError::UnsupportedSignature { .. })
        ));
    }

    #[test]
    fn resolves_public_main() {
        let module = load(include_str!("../tests/fixtures/hello_world.wat"));
        let entry = EntryResolver::default().resolve(&module).unwrap();
        assert_eq!(entry.path, vec!["main"]);
        assert_eq!(entry.shape().unwrap(), ParameterShape::NoArgs);
    }

    #[test]
    fn resolves_main_nested_in_instance() {
        let module = load(include_str!("../tests/fixtures/scoped_main.wat"));
        let entry = EntryResolver::default().resolve(&module).unwrap();
        assert_eq!(entry.qualified_name(), "program/main");
    }

    #[test]
    fn reports_missing_entry_point() {
        let module = load(include_str!("../tests/fixtures/no_entry_point.wat"));
        let err = EntryResolver::default().resolve(&module).unwrap_err();
        assert!(matches!(err, RunnerError::NoEntryPoint(_)));
    }

    #[test]
    fn reports_ambiguous_entry_point() {
        let module = load(include_str!("../tests/fixtures/ambiguous_main.wat"));
        let err = EntryResolver::default().resolve(&module).unwrap_err();
        match err {
            RunnerError::AmbiguousEntryPoint(names) => {
                assert_eq!(names, vec!["main", "program/main"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn honors_configured_name() {
        let module = load(include_str!("../tests/fixtures/no_entry_point.wat"));
        let entry = EntryResolver::new("helper").resolve(&module).unwrap();
        assert_eq!(entry.path, vec!["helper"]);
    }
}
