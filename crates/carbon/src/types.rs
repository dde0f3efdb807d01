//! Static types (§3.3).
//!
//! A `Type` is itself produced as an ordinary value wherever a
//! type-valued expression is evaluated — `Struct`/`Choice` carry AST
//! identity handles (not by-value copies of the definition), matching the
//! spec's "a type *is* a value" rule.

use std::fmt;

use crate::{
    ast::{Ast, ChoiceId, StructId, Tuple},
    intern::Interner,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    /// The type of type-valued expressions themselves.
    TypeT,
    Tuple(Tuple<Type>),
    Function { params: Tuple<Type>, return_type: Box<Type> },
    Struct(StructId),
    Choice(ChoiceId),
    /// A bare alternative reference, e.g. the static type of `Ints.One`
    /// used as a callee, before it is applied.
    Alternative { parent: ChoiceId, payload: Tuple<Type> },
    /// Recorded for an expression whose type could not be determined; a
    /// successfully checked program never has this as a final
    /// `staticType` entry (spec invariant 1).
    Error,
}

impl Type {
    pub fn function(params: Tuple<Type>, return_type: Type) -> Self {
        Self::Function { params, return_type: Box::new(return_type) }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Renders a type the way diagnostics quote it, substituting nominal
/// names for struct/choice definitions (`Type`'s own `Display` has no
/// access to the name table, since `Struct`/`Choice` are bare AST
/// identity handles).
pub fn format_type(ty: &Type, ast: &Ast, interner: &Interner) -> String {
    match ty {
        Type::Struct(id) => interner.resolve(ast.strukt(*id).name).to_string(),
        Type::Choice(id) => interner.resolve(ast.choice(*id).name).to_string(),
        Type::Alternative { parent, payload } => {
            let parent_name = interner.resolve(ast.choice(*parent).name);
            let fields: Vec<_> = payload.iter().map(|field| format_type(&field.value, ast, interner)).collect();
            format!("{parent_name}({})", fields.join(", "))
        }
        Type::Tuple(t) => {
            let fields: Vec<_> = t.iter().map(|field| format_type(&field.value, ast, interner)).collect();
            format!("({})", fields.join(", "))
        }
        Type::Function { params, return_type } => {
            format!(
                "fn{} -> {}",
                format_type(&Type::Tuple(params.clone()), ast, interner),
                format_type(return_type, ast, interner)
            )
        }
        other => other.to_string(),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "Int"),
            Self::Bool => write!(f, "Bool"),
            Self::TypeT => write!(f, "type"),
            Self::Tuple(t) => {
                write!(f, "(")?;
                for (i, field) in t.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field.value)?;
                }
                write!(f, ")")
            }
            Self::Function { params, return_type } => {
                write!(f, "fn{} -> {return_type}", Self::Tuple(params.clone()))
            }
            Self::Struct(id) => write!(f, "<struct #{id:?}>"),
            Self::Choice(id) => write!(f, "<choice #{id:?}>"),
            Self::Alternative { parent, .. } => write!(f, "<alternative of choice #{parent:?}>"),
            Self::Error => write!(f, "<error>"),
        }
    }
}
