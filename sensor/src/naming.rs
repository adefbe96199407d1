//! Identifier rule shared by every named definition.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DefinitionError;

static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));

const RESERVED_NAMES: &[&str] = &[
    "context",
    "conf",
    "config",
    "meta",
    "arg_dict",
    "dict",
    "input_arg_dict",
    "output_arg_dict",
    "int",
    "str",
    "float",
    "bool",
    "input",
    "output",
    "type",
    // Keywords of the definition DSL.
    "False",
    "None",
    "True",
    "and",
    "as",
    "assert",
    "async",
    "await",
    "break",
    "class",
    "continue",
    "def",
    "del",
    "elif",
    "else",
    "except",
    "finally",
    "for",
    "from",
    "global",
    "if",
    "import",
    "in",
    "is",
    "lambda",
    "nonlocal",
    "not",
    "or",
    "pass",
    "raise",
    "return",
    "try",
    "while",
    "with",
    "yield",
];

/// Validate a definition name and return it unchanged.
pub fn check_valid_name(name: &str) -> Result<&str, DefinitionError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(DefinitionError::ReservedName {
            name: name.to_string(),
        });
    }
    if !VALID_NAME.is_match(name) {
        return Err(DefinitionError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(name)
}
