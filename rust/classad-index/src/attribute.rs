//! Attribute names carry the type of their values in a one-character prefix:
//! `n:Memory`, `s:Arch`, `b:HasDocker`.

use std::fmt;

use classad_common::{Result, error::Error};

/// The index variant an attribute is indexed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Numeric,
    String,
    Boolean,
}

impl AttributeKind {
    /// Resolves the kind from the `<type-char>:` prefix of an attribute name.
    ///
    /// `n`, `i` and `t` (real, integer, time) are numeric; `b` and `u` are boolean;
    /// `s` is string.
    pub fn from_attribute_name(name: &str) -> Result<AttributeKind> {
        let Some((prefix, _)) = name.split_once(':') else {
            return Err(Error::unknown_attribute_type(name));
        };
        match prefix {
            "n" | "i" | "t" => Ok(AttributeKind::Numeric),
            "b" | "u" => Ok(AttributeKind::Boolean),
            "s" => Ok(AttributeKind::String),
            _ => Err(Error::unknown_attribute_type(name)),
        }
    }
}

/// The attribute name without its type prefix.
pub fn bare_name(name: &str) -> &str {
    name.split_once(':').map_or(name, |(_, bare)| bare)
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeKind::Numeric => "numeric",
            AttributeKind::String => "string",
            AttributeKind::Boolean => "boolean",
        })
    }
}
