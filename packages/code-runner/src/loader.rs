//! Module loading and introspection.
//!
//! A module is a WebAssembly component. Loading compiles it with the shared
//! [`Engine`] and builds a catalog of everything it exports, grouped into
//! types the way a compiled program groups methods into classes:
//!
//! - free functions exported from the component root belong to
//!   [`ROOT_TYPE`] and are public;
//! - functions reachable only through an exported instance belong to a type
//!   named after the instance path and are non-public;
//! - `[static]`, `[method]` and `[constructor]` functions belong to their
//!   resource type.

use wasmtime::component::types::{ComponentItem, Type};
use wasmtime::component::Component;
use wasmtime::Engine;

use crate::error::{Result, RunnerError};

/// Name of the type holding free functions exported from the component root.
pub const ROOT_TYPE: &str = "<component>";

/// Where a method can be reached from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Exported directly from the component root.
    Public,

    /// Exported only through a nested instance.
    NonPublic,
}

/// Whether a method needs a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Static,
    Instance,
    Constructor,
}

/// Declared parameter type, as far as argument binding cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// `string`
    String,

    /// `option<string>`
    NullableString,

    /// `list<string>`
    StringList,

    /// Anything else, with a short description for error messages.
    Other(String),
}

impl ParamType {
    /// Whether a named string argument can be bound to this type.
    pub fn is_string(&self) -> bool {
        matches!(self, ParamType::String | ParamType::NullableString)
    }
}

impl From<&Type> for ParamType {
    fn from(ty: &Type) -> Self {
        match ty {
            Type::String => ParamType::String,
            Type::Option(option) if matches!(option.ty(), Type::String) => {
                ParamType::NullableString
            }
            Type::List(list) if matches!(list.ty(), Type::String) => ParamType::StringList,
            other => ParamType::Other(describe(other)),
        }
    }
}

fn describe(ty: &Type) -> String {
    let name = match ty {
        Type::Bool => "bool",
        Type::S8 => "s8",
        Type::U8 => "u8",
        Type::S16 => "s16",
        Type::U16 => "u16",
        Type::S32 => "s32",
        Type::U32 => "u32",
        Type::S64 => "s64",
        Type::U64 => "u64",
        Type::Float32 => "f32",
        Type::Float64 => "f64",
        Type::Char => "char",
        Type::List(_) => "list",
        Type::Option(_) => "option",
        Type::Record(_) => "record",
        Type::Tuple(_) => "tuple",
        Type::Variant(_) => "variant",
        Type::Enum(_) => "enum",
        Type::Result(_) => "result",
        Type::Flags(_) => "flags",
        Type::Own(_) | Type::Borrow(_) => "resource",
        other => return format!("{other:?}"),
    };
    name.to_string()
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Name without any `[static]`/`[method]` prefix or resource qualifier.
    pub name: String,
    pub kind: MethodKind,
    pub visibility: Visibility,

    /// Export names leading from the component root to the function.
    pub export_path: Vec<String>,

    pub parameters: Vec<Parameter>,

    /// Number of declared results.
    pub results: usize,
}

impl Method {
    pub fn is_static(&self) -> bool {
        self.kind == MethodKind::Static
    }
}

/// A group of methods: the component root, an exported instance or a
/// resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleType {
    pub name: String,
    pub visibility: Visibility,
    pub methods: Vec<Method>,
}

/// Something the module expects the host to provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleImport {
    /// A bare function import.
    Function(String),

    /// An instance import and the names it needs from it.
    Instance { name: String, exports: Vec<String> },

    /// Any other kind of import (types, modules, components).
    Other(String),
}

impl ModuleImport {
    pub fn name(&self) -> &str {
        match self {
            ModuleImport::Function(name) | ModuleImport::Other(name) => name,
            ModuleImport::Instance { name, .. } => name,
        }
    }
}

/// A compiled component and its export catalog.
#[derive(Clone)]
pub struct LoadedModule {
    component: Component,
    types: Vec<ModuleType>,
    imports: Vec<ModuleImport>,
}

impl LoadedModule {
    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn types(&self) -> &[ModuleType] {
        &self.types
    }

    pub fn imports(&self) -> &[ModuleImport] {
        &self.imports
    }

    /// Every method of every type.
    pub fn methods(&self) -> impl Iterator<Item = (&ModuleType, &Method)> {
        self.types
            .iter()
            .flat_map(|ty| ty.methods.iter().map(move |method| (ty, method)))
    }
}

/// Compiles module bytes into [`LoadedModule`]s.
#[derive(Clone)]
pub struct ModuleLoader {
    engine: Engine,
}

impl ModuleLoader {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Compile `bytes` and catalog the exports.
    ///
    /// Both the binary and the text format of a component are accepted. A
    /// core module is rejected.
    pub fn load(&self, bytes: &[u8]) -> Result<LoadedModule> {
        if bytes.is_empty() {
            return Err(RunnerError::Load("module is empty".to_string()));
        }

        let component = Component::new(&self.engine, bytes)
            .map_err(|e| RunnerError::Load(format!("{e:#}")))?;
        let component_type = component.component_type();

        let mut types = Vec::new();
        collect_exports(
            &self.engine,
            component_type.exports(&self.engine),
            &[],
            &mut types,
        );

        let imports = component_type
            .imports(&self.engine)
            .map(|(name, item)| match item {
                ComponentItem::ComponentFunc(_) => ModuleImport::Function(name.to_string()),
                ComponentItem::ComponentInstance(instance) => ModuleImport::Instance {
                    name: name.to_string(),
                    exports: instance
                        .exports(&self.engine)
                        .map(|(export, _)| export.to_string())
                        .collect(),
                },
                _ => ModuleImport::Other(name.to_string()),
            })
            .collect();

        tracing::debug!(
            types = types.len(),
            bytes = bytes.len(),
            "loaded component"
        );

        Ok(LoadedModule {
            component,
            types,
            imports,
        })
    }
}

fn collect_exports<'a>(
    engine: &Engine,
    exports: impl Iterator<Item = (&'a str, ComponentItem)>,
    path: &[String],
    types: &mut Vec<ModuleType>,
) {
    for (export_name, item) in exports {
        let mut export_path = path.to_vec();
        export_path.push(export_name.to_string());

        match item {
            ComponentItem::ComponentFunc(func) => {
                let (resource, name, kind) = split_function_name(export_name);
                let type_name = match (path.is_empty(), resource) {
                    (true, None) => ROOT_TYPE.to_string(),
                    (true, Some(resource)) => resource.to_string(),
                    (false, None) => path.join("/"),
                    (false, Some(resource)) => format!("{}/{}", path.join("/"), resource),
                };
                let visibility = if path.is_empty() {
                    Visibility::Public
                } else {
                    Visibility::NonPublic
                };

                let method = Method {
                    name: name.to_string(),
                    kind,
                    visibility,
                    export_path,
                    parameters: func
                        .params()
                        .map(|(param, ty)| Parameter::new(param, ParamType::from(&ty)))
                        .collect(),
                    results: func.results().len(),
                };
                type_entry(types, type_name, visibility).methods.push(method);
            }
            ComponentItem::ComponentInstance(instance) => {
                collect_exports(engine, instance.exports(engine), &export_path, types);
            }
            _ => {}
        }
    }
}

fn type_entry(
    types: &mut Vec<ModuleType>,
    name: String,
    visibility: Visibility,
) -> &mut ModuleType {
    let index = match types.iter().position(|ty| ty.name == name) {
        Some(index) => index,
        None => {
            types.push(ModuleType {
                name,
                visibility,
                methods: Vec::new(),
            });
            types.len() - 1
        }
    };
    &mut types[index]
}

/// Split a component function name into its resource, bare name and kind.
///
/// `[method]counter.get` → `(Some("counter"), "get", Instance)`,
/// `[static]counter.new-default` → `(Some("counter"), "new-default", Static)`,
/// `run` → `(None, "run", Static)`.
pub(crate) fn split_function_name(name: &str) -> (Option<&str>, &str, MethodKind) {
    let prefixed = [
        ("[constructor]", MethodKind::Constructor),
        ("[async method]", MethodKind::Instance),
        ("[method]", MethodKind::Instance),
        ("[async static]", MethodKind::Static),
        ("[static]", MethodKind::Static),
    ];

    for (prefix, kind) in prefixed {
        if let Some(rest) = name.strip_prefix(prefix) {
            if kind == MethodKind::Constructor {
                return (Some(rest), rest, kind);
            }
            return match rest.split_once('.') {
                Some((resource, method)) => (Some(resource), method, kind),
                None => (None, rest, kind),
            };
        }
    }

    let name = name.strip_prefix("[async]").unwrap_or(name);
    (None, name, MethodKind::Static)
}
