//! Conversions between native values and [`Expression`]s.
//!
//! Every native payload that enters or leaves a script goes through
//! [`wrap`], [`wrap_list`] or [`unwrap`]; nothing else inspects atom payloads.

use super::{BridgeError, BridgeResult};
use crate::interpreter::{Expression, Primitive};
use crate::service::{Identity, ProcessResult};

/// Native type that can be carried by an atomic expression.
pub trait Native: Sized {
    /// Shape name reported in type errors.
    const SHAPE: &'static str;

    /// Move the value into a primitive payload.
    fn into_primitive(self) -> Primitive;

    /// Extract the value if the payload has this shape.
    fn from_primitive(primitive: &Primitive) -> Option<Self>;
}

impl Native for String {
    const SHAPE: &'static str = "string";

    fn into_primitive(self) -> Primitive {
        Primitive::String(self)
    }

    fn from_primitive(primitive: &Primitive) -> Option<Self> {
        match primitive {
            Primitive::String(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl Native for i64 {
    const SHAPE: &'static str = "integer";

    fn into_primitive(self) -> Primitive {
        Primitive::Integer(self)
    }

    fn from_primitive(primitive: &Primitive) -> Option<Self> {
        match primitive {
            Primitive::Integer(num) => Some(*num),
            _ => None,
        }
    }
}

impl Native for bool {
    const SHAPE: &'static str = "boolean";

    fn into_primitive(self) -> Primitive {
        Primitive::Boolean(self)
    }

    fn from_primitive(primitive: &Primitive) -> Option<Self> {
        match primitive {
            Primitive::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl Native for Identity {
    const SHAPE: &'static str = "identity";

    fn into_primitive(self) -> Primitive {
        Primitive::Identity(self)
    }

    fn from_primitive(primitive: &Primitive) -> Option<Self> {
        match primitive {
            Primitive::Identity(identity) => Some(identity.clone()),
            _ => None,
        }
    }
}

impl Native for ProcessResult {
    const SHAPE: &'static str = "process-result";

    fn into_primitive(self) -> Primitive {
        Primitive::ProcessResult(self)
    }

    fn from_primitive(primitive: &Primitive) -> Option<Self> {
        match primitive {
            Primitive::ProcessResult(result) => Some(result.clone()),
            _ => None,
        }
    }
}

/// Wrap a native value as an atomic expression.
pub fn wrap<T: Native>(value: T) -> Expression {
    Expression::Atom(value.into_primitive())
}

/// Wrap an ordered collection as a composite, preserving order exactly.
pub fn wrap_list<T, I>(values: I) -> Expression
where
    T: Native,
    I: IntoIterator<Item = T>,
{
    Expression::List(values.into_iter().map(wrap).collect())
}

/// Extract a native value, failing with [`BridgeError::TypeMismatch`] when the
/// expression carries a different shape.
pub fn unwrap<T: Native>(expr: &Expression) -> BridgeResult<T> {
    let mismatch = || BridgeError::TypeMismatch {
        expected: T::SHAPE,
        found: expr.shape(),
    };
    match expr {
        Expression::Atom(primitive) => T::from_primitive(primitive).ok_or_else(mismatch),
        Expression::List(_) => Err(mismatch()),
    }
}

/// Extract every element of a composite as `T`.
pub fn unwrap_list<T: Native>(expr: &Expression) -> BridgeResult<Vec<T>> {
    match expr {
        Expression::List(items) => items.iter().map(unwrap).collect(),
        Expression::Atom(primitive) => Err(BridgeError::TypeMismatch {
            expected: "list",
            found: primitive.shape(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Cell;

    #[test]
    fn string_round_trips_through_atom() {
        let expr = wrap("abc123".to_string());
        assert_eq!(expr, Expression::string("abc123"));
        assert_eq!(unwrap::<String>(&expr).expect("string"), "abc123");
    }

    #[test]
    fn list_read_as_string_is_type_mismatch() {
        let expr = wrap_list(vec!["a".to_string(), "b".to_string()]);
        match unwrap::<String>(&expr) {
            Err(BridgeError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, "string");
                assert_eq!(found, "list");
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn identity_read_as_string_is_type_mismatch() {
        let expr = wrap(Identity::Cell(Cell {
            id: "c-1".into(),
            nvid: "abc123".into(),
        }));
        assert!(matches!(
            unwrap::<String>(&expr),
            Err(BridgeError::TypeMismatch {
                expected: "string",
                found: "identity"
            })
        ));
    }

    #[test]
    fn symbols_are_not_strings() {
        assert!(unwrap::<String>(&Expression::symbol("abc")).is_err());
    }

    #[test]
    fn unwrap_list_rejects_atoms_and_mixed_elements() {
        assert!(unwrap_list::<i64>(&wrap(3i64)).is_err());
        let mixed = Expression::List(vec![wrap(1i64), wrap(true)]);
        assert!(unwrap_list::<i64>(&mixed).is_err());
        assert_eq!(
            unwrap_list::<i64>(&wrap_list(vec![1i64, 2])).expect("ints"),
            vec![1, 2]
        );
    }
}
