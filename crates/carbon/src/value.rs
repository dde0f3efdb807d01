//! Runtime values (§3.4).
//!
//! Unlike [`crate::types::Type`], which only ever exists as static
//! metadata, a `Value` is what actually lives inside [`crate::memory`].
//! `Value::Uninit` is an internal sentinel for a slot (or a projected part
//! of one) that has been allocated but not yet written — it must never be
//! observed by a successfully type-checked program; encountering one on a
//! read is an internal invariant violation, not a user-facing error.

use crate::{
    ast::{AlternativeId, ChoiceId, FunctionId, StructId, Tuple},
    types::Type,
};

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    /// A type-valued expression's result; its own dynamic type is
    /// `Type::TypeT`.
    Type(Type),
    Tuple(Tuple<Value>),
    Function(FunctionId),
    Struct { id: StructId, payload: Tuple<Value> },
    Choice { id: ChoiceId, alternative: u32, payload: Tuple<Value> },
    /// A bare alternative reference (`Ints.One` not yet called).
    Alternative { parent: ChoiceId, alternative: u32 },
    /// Sentinel for an allocated-but-unwritten slot or sub-slot.
    Uninit,
}

impl Value {
    pub fn alternative_id(&self) -> Option<AlternativeId> {
        match self {
            Self::Choice { id, alternative, .. } | Self::Alternative { parent: id, alternative } => {
                Some(AlternativeId { choice: *id, index: *alternative })
            }
            _ => None,
        }
    }

    pub fn is_uninit(&self) -> bool {
        matches!(self, Self::Uninit)
    }
}

/// Structural equality per §4.3: primitives compare by value, tuples by
/// congruence plus recursive field equality, choices by discriminator then
/// payload, types structurally. Anything else (functions, structs, bare
/// alternatives) falls back to "equal iff the dynamic type matches" —
/// Carbon never defines field-wise struct equality, so two struct values
/// of the same struct are deemed equal regardless of payload, and values
/// of differing dynamic type are always unequal. This keeps `==`
/// reflexive for every value the checker allows it on.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Type(x), Value::Type(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.congruent(y) && x.iter().all(|field| y.get(field.id).is_some_and(|other| value_eq(&field.value, other)))
        }
        (Value::Choice { id: id1, alternative: a1, payload: p1 }, Value::Choice { id: id2, alternative: a2, payload: p2 }) => {
            id1 == id2
                && a1 == a2
                && p1.congruent(p2)
                && p1.iter().all(|field| p2.get(field.id).is_some_and(|other| value_eq(&field.value, other)))
        }
        (Value::Function(f1), Value::Function(f2)) => f1 == f2,
        (Value::Struct { id: id1, .. }, Value::Struct { id: id2, .. }) => id1 == id2,
        (Value::Alternative { parent: p1, alternative: a1 }, Value::Alternative { parent: p2, alternative: a2 }) => {
            p1 == p2 && a1 == a2
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldId, TupleField};

    fn int_field(position: u32, value: i64) -> TupleField<Value> {
        TupleField { id: FieldId::Position(position), value: Value::Int(value) }
    }

    #[test]
    fn tuples_compare_recursively() {
        let a = Value::Tuple(Tuple::new(vec![int_field(0, 1), int_field(1, 2)]));
        let b = Value::Tuple(Tuple::new(vec![int_field(0, 1), int_field(1, 2)]));
        assert!(value_eq(&a, &b));
    }

    #[test]
    fn differing_dynamic_types_are_never_equal() {
        assert!(!value_eq(&Value::Int(0), &Value::Bool(false)));
    }
}
