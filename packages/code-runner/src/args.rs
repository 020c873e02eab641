//! Command-line style argument handling for entry functions.
//!
//! [`tokenize`] turns a raw argument string into tokens and [`bind`] maps
//! those tokens onto the entry function's parameter list.

use crate::entry::{EntryPoint, ParameterShape};
use crate::error::Result;

/// Arguments ready to be passed to an entry function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundArgs {
    /// The entry function takes no parameters.
    None,

    /// A single `list<string>` argument.
    Array(Vec<String>),

    /// One value per declared parameter, in declaration order. `None` means
    /// no flag supplied a value.
    Named(Vec<(String, Option<String>)>),
}

/// Split a raw argument string into tokens.
///
/// Whitespace separates tokens except inside double quotes, where the quotes
/// are dropped and the enclosed text is kept as part of a single token. An
/// unterminated quote runs to the end of the input.
pub fn tokenize(raw: Option<&str>) -> Vec<String> {
    let mut tokens = Vec::new();
    let Some(raw) = raw else {
        return tokens;
    };

    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in raw.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Bind tokens to the parameters of `entry`.
///
/// Fails only when the entry function's parameters cannot be expressed as
/// strings; missing named values are bound as `None`.
pub fn bind(tokens: Vec<String>, entry: &EntryPoint) -> Result<BoundArgs> {
    let shape = entry.shape()?;
    Ok(bind_shape(tokens, &shape))
}

/// Bind tokens to an already-classified parameter shape.
pub fn bind_shape(tokens: Vec<String>, shape: &ParameterShape) -> BoundArgs {
    match shape {
        ParameterShape::NoArgs => BoundArgs::None,
        ParameterShape::StringArray => BoundArgs::Array(tokens),
        ParameterShape::NamedStrings(names) => BoundArgs::Named(
            names
                .iter()
                .map(|name| (name.clone(), flag_value(&tokens, name)))
                .collect(),
        ),
    }
}

/// Value following the first `--name` flag, compared case-insensitively.
///
/// A flag at the end of the tokens, or one directly followed by another
/// `--` flag, has no value.
fn flag_value(tokens: &[String], name: &str) -> Option<String> {
    tokens
        .iter()
        .enumerate()
        .find_map(|(i, token)| {
            let flag = token.strip_prefix("--")?;
            if !flag.eq_ignore_ascii_case(name) {
                return None;
            }
            Some(
                tokens
                    .get(i + 1)
                    .filter(|value| !value.starts_with("--"))
                    .cloned(),
            )
        })
        .flatten()
}
