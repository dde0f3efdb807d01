//! `ExecutableProgram`: the immutable bundle name resolution and the type
//! checker hand to the interpreter.
//!
//! Building one runs both earlier passes in order and stops at the first
//! that reports anything — a program with unresolved names is never type
//! checked, and a program that fails type checking is never interpreted.

use ahash::AHashMap;

use crate::{
    ast::{Ast, BindingId, FunctionId, InitId, Pattern, PatternId, TopLevel},
    diagnostics::Diagnostics,
    intern::Interner,
    resolve::{self, Resolution},
    types::Type,
    typeck::{self, TypeInfo},
};

/// Everything a correctly checked program needs to run: the tree itself,
/// the resolved name table, the static type of every expression and
/// binding, and two small auxiliary indices the interpreter consults
/// directly rather than re-deriving by walking the tree.
pub struct ExecutableProgram {
    pub ast: Ast,
    pub interner: Interner,
    pub resolution: Resolution,
    pub types: TypeInfo,
    /// Every global binding's enclosing top-level `Initialization`,
    /// consulted to drive lazy global initialization on first use.
    pub global_inits: AHashMap<BindingId, InitId>,
    pub main: FunctionId,
}

#[derive(Debug)]
pub enum BuildError {
    Resolution(Diagnostics),
    Check(Diagnostics),
    MissingMain,
    WrongMainSignature(Type),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolution(d) => write!(f, "{d}"),
            Self::Check(d) => write!(f, "{d}"),
            Self::MissingMain => write!(f, "no top-level function named `main` was found"),
            Self::WrongMainSignature(ty) => write!(f, "`main` must take no arguments and return Int, not {ty}"),
        }
    }
}

/// Runs name resolution, then (only if that reported nothing) type
/// checking, then locates and validates the distinguished `main` entry
/// point: a nullary function named `main` returning `Int`.
pub fn build(ast: Ast, interner: Interner) -> Result<ExecutableProgram, BuildError> {
    let mut resolve_diags = Diagnostics::new();
    let resolution = resolve::resolve(&ast, &interner, &mut resolve_diags);
    if !resolve_diags.is_empty() {
        return Err(BuildError::Resolution(resolve_diags));
    }

    let mut check_diags = Diagnostics::new();
    let types = typeck::check(&ast, &interner, &resolution, &mut check_diags);
    if !check_diags.is_empty() {
        return Err(BuildError::Check(check_diags));
    }

    let global_inits = collect_global_inits(&ast);
    let main = find_main(&ast, &interner, &types)?;

    Ok(ExecutableProgram { ast, interner, resolution, types, global_inits, main })
}

fn collect_global_inits(ast: &Ast) -> AHashMap<BindingId, InitId> {
    let mut out = AHashMap::new();
    for item in &ast.top_level {
        if let TopLevel::Initialization(id) = *item {
            register(ast, ast.init(id).pattern, id, &mut out);
        }
    }
    out
}

fn register(ast: &Ast, p: PatternId, init_id: InitId, out: &mut AHashMap<BindingId, InitId>) {
    match &ast.pattern(p).kind {
        Pattern::Variable(_) => {
            out.insert(p, init_id);
        }
        Pattern::Atom(_) => {}
        Pattern::Tuple(fields) => {
            for field in fields.iter() {
                register(ast, field.value, init_id, out);
            }
        }
        Pattern::Call { args, .. } => {
            for field in args.iter() {
                register(ast, field.value, init_id, out);
            }
        }
        Pattern::FunctionType { .. } => {}
    }
}

fn find_main(ast: &Ast, interner: &Interner, types: &TypeInfo) -> Result<FunctionId, BuildError> {
    let main_symbol = interner.get("main").ok_or(BuildError::MissingMain)?;
    for item in &ast.top_level {
        if let TopLevel::Function(id) = *item {
            if ast.function(id).name == main_symbol {
                let ty = types.name_type.get(&crate::ast::Declaration::Function(id)).cloned().unwrap_or(Type::Error);
                return match &ty {
                    Type::Function { params, return_type } if params.is_empty() && **return_type == Type::Int => Ok(id),
                    _ => Err(BuildError::WrongMainSignature(ty)),
                };
            }
        }
    }
    Err(BuildError::MissingMain)
}
