use preserves::IOValue;
use std::fmt;

use crate::service::{Identity, ProcessResult};

/// Native payload carried by an atomic expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Bare symbol.
    Symbol(String),
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// Identity record from the digital-twin service.
    Identity(Identity),
    /// Process result record.
    ProcessResult(ProcessResult),
}

impl Primitive {
    /// Shape name used in type errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Primitive::Symbol(_) => "symbol",
            Primitive::String(_) => "string",
            Primitive::Integer(_) => "integer",
            Primitive::Boolean(_) => "boolean",
            Primitive::Identity(_) => "identity",
            Primitive::ProcessResult(_) => "process-result",
        }
    }

    /// Convert the payload into a preserves [`IOValue`].
    pub fn to_io_value(&self) -> IOValue {
        match self {
            Primitive::Symbol(sym) => IOValue::symbol(sym.clone()),
            Primitive::String(text) => IOValue::new(text.clone()),
            Primitive::Integer(num) => IOValue::new(*num),
            Primitive::Boolean(flag) => IOValue::new(*flag),
            Primitive::Identity(identity) => identity.to_io_value(),
            Primitive::ProcessResult(result) => result.to_io_value(),
        }
    }
}

/// Uniform script value: an atom or an ordered composite.
///
/// Equality and hashing are structural, so independently constructed but
/// equal expressions land in the same cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Atomic primitive.
    Atom(Primitive),
    /// Ordered list of sub-expressions.
    List(Vec<Expression>),
}

impl Expression {
    /// Build a symbol atom.
    pub fn symbol(name: impl Into<String>) -> Self {
        Expression::Atom(Primitive::Symbol(name.into()))
    }

    /// Build a string atom.
    pub fn string(text: impl Into<String>) -> Self {
        Expression::Atom(Primitive::String(text.into()))
    }

    /// The empty composite.
    pub fn nil() -> Self {
        Expression::List(Vec::new())
    }

    /// Symbol name, if this is a symbol atom.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expression::Atom(Primitive::Symbol(sym)) => Some(sym),
            _ => None,
        }
    }

    /// Elements, if this is a composite.
    pub fn as_list(&self) -> Option<&[Expression]> {
        match self {
            Expression::List(items) => Some(items),
            Expression::Atom(_) => None,
        }
    }

    /// Shape name used in type errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Expression::Atom(primitive) => primitive.shape(),
            Expression::List(_) => "list",
        }
    }

    /// Convert the expression into a preserves [`IOValue`].
    pub fn to_io_value(&self) -> IOValue {
        match self {
            Expression::Atom(primitive) => primitive.to_io_value(),
            Expression::List(items) => {
                let converted: Vec<IOValue> = items.iter().map(|item| item.to_io_value()).collect();
                IOValue::new(converted)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_io_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structurally_equal_expressions_hash_alike() {
        use std::collections::HashSet;

        let a = Expression::List(vec![Expression::string("abc123"), Expression::symbol("x")]);
        let b = Expression::List(vec![Expression::string("abc123"), Expression::symbol("x")]);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn shapes_distinguish_atoms_and_lists() {
        assert_eq!(Expression::string("x").shape(), "string");
        assert_eq!(Expression::symbol("x").shape(), "symbol");
        assert_eq!(Expression::nil().shape(), "list");
        assert_eq!(Expression::Atom(Primitive::Integer(3)).shape(), "integer");
    }

    #[test]
    fn strings_and_symbols_are_distinct_keys() {
        assert_ne!(Expression::string("abc"), Expression::symbol("abc"));
    }
}
