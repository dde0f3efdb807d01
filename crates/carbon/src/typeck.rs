//! The type checker (§4.2).
//!
//! A memoizing, demand-driven pass. `type_of_expr` computes and caches the
//! static type of an expression; `type_of_name` does the same per
//! declaration, with three memo states (absent / being-computed / final)
//! so a dependency cycle between two `auto`-typed declarations is caught
//! instead of looping forever. `pattern_type` mirrors `type_of_expr` for
//! patterns, and doubles as the place a bound variable's type gets
//! memoized. `evaluate_type` is the restricted compile-time evaluator:
//! given an expression already known to have static type `TypeT`, it
//! reconstructs the concrete [`Type`] value it denotes, for the
//! constructive subset the checker supports (literal types, naming a
//! struct/choice/type-valued global, tuples and function types built from
//! other type expressions). A computed type produced by an actual function
//! call is out of scope here, matching the checker's own driver never
//! invoking the interpreter for anything but this constructive subset.

use ahash::AHashMap;

use crate::{
    ast::{
        Alternative, Ast, BinaryOperator, ChoiceId, Declaration, DeclaredType, Expr, ExprId, FunctionDefinition,
        FunctionId, Initialization, MatchClause, Pattern, PatternId, ReturnTypeForm, Statement, StmtId, StructId,
        StructMember, Tuple, TupleField, UnaryOperator,
    },
    diagnostics::{Diagnostic, Diagnostics},
    intern::Interner,
    resolve::Resolution,
    types::{format_type, Type},
};

#[derive(Clone)]
enum NameState {
    BeingComputed,
    Final(Type),
}

/// Everything the interpreter needs from a completed check: every
/// expression's static type, every binding's deduced/declared type, and
/// the payload type of every choice alternative actually referenced.
#[derive(Debug, Default)]
pub struct TypeInfo {
    pub static_type: AHashMap<ExprId, Type>,
    pub name_type: AHashMap<Declaration, Type>,
    pub alternative_payload: AHashMap<crate::ast::AlternativeId, Tuple<Type>>,
}

impl TypeInfo {
    pub fn type_of(&self, e: ExprId) -> &Type {
        self.static_type.get(&e).unwrap_or(&Type::Error)
    }

    pub fn binding_type(&self, id: crate::ast::BindingId) -> &Type {
        self.name_type.get(&Declaration::Binding(id)).unwrap_or(&Type::Error)
    }
}

struct Checker<'a> {
    ast: &'a Ast,
    interner: &'a Interner,
    resolution: &'a Resolution,
    diags: &'a mut Diagnostics,
    name_state: AHashMap<Declaration, NameState>,
    static_type: AHashMap<ExprId, Type>,
    alternative_payload: AHashMap<crate::ast::AlternativeId, Tuple<Type>>,
    /// Every binding introduced by an `Initialization` (local or global),
    /// mapping it to that initialization (§3.6 `enclosingInitialization`).
    enclosing_init: AHashMap<crate::ast::BindingId, crate::ast::InitId>,
    /// Every binding introduced by an `Initialization` also maps to the
    /// *root* pattern of that initialization, so a forward lookup of a
    /// single destructured variable re-derives the whole pattern's types
    /// (and thus the correct per-field `rhs`) in one `pattern_type` call.
    binding_root: AHashMap<crate::ast::BindingId, PatternId>,
    /// Concrete type values bound to a global whose own static type is
    /// `TypeT`, so a later type expression can name it (`Name` case of
    /// [`Checker::evaluate_type`]).
    global_type_values: AHashMap<crate::ast::BindingId, Type>,
}

pub fn check(ast: &Ast, interner: &Interner, resolution: &Resolution, diags: &mut Diagnostics) -> TypeInfo {
    let mut checker = Checker {
        ast,
        interner,
        resolution,
        diags,
        name_state: AHashMap::new(),
        static_type: AHashMap::new(),
        alternative_payload: AHashMap::new(),
        enclosing_init: AHashMap::new(),
        binding_root: AHashMap::new(),
        global_type_values: AHashMap::new(),
    };
    checker.register_initializations();
    checker.check_nominal_bodies();
    for item in ast.top_level.clone() {
        if let crate::ast::TopLevel::Function(id) = item {
            checker.function_signature(id);
        }
    }
    for item in ast.top_level.clone() {
        if let crate::ast::TopLevel::Initialization(id) = item {
            checker.check_initialization(id);
        }
    }
    for item in ast.top_level.clone() {
        if let crate::ast::TopLevel::Function(id) = item {
            checker.check_function_body(id);
        }
    }
    TypeInfo { static_type: checker.static_type, name_type: finalize(checker.name_state), alternative_payload: checker.alternative_payload }
}

fn finalize(states: AHashMap<Declaration, NameState>) -> AHashMap<Declaration, Type> {
    states
        .into_iter()
        .map(|(decl, state)| match state {
            NameState::Final(ty) => (decl, ty),
            NameState::BeingComputed => (decl, Type::Error),
        })
        .collect()
}

impl<'a> Checker<'a> {
    fn site_of(&self, e: ExprId) -> crate::span::SourceRegion {
        self.ast.expr(e).site
    }

    fn fmt(&self, ty: &Type) -> String {
        format_type(ty, self.ast, self.interner)
    }

    fn error(&mut self, message: impl Into<String>, region: crate::span::SourceRegion) -> Type {
        self.diags.push(Diagnostic::new(message, region));
        Type::Error
    }

    fn declaration_site(&self, decl: Declaration) -> crate::span::SourceRegion {
        match decl {
            Declaration::Function(id) => self.ast.function(id).site,
            Declaration::Struct(id) => self.ast.strukt(id).site,
            Declaration::Choice(id) => self.ast.choice(id).site,
            Declaration::Binding(id) => self.ast.pattern(id).site,
        }
    }

    // ---- registration (driver step 1) ----------------------------------

    fn register_initializations(&mut self) {
        for item in self.ast.top_level.clone() {
            match item {
                crate::ast::TopLevel::Initialization(id) => self.register_init(id),
                crate::ast::TopLevel::Function(id) => {
                    if let Some(body) = self.ast.function(id).body {
                        self.register_stmt(body);
                    }
                }
                _ => {}
            }
        }
    }

    fn register_init(&mut self, id: crate::ast::InitId) {
        let init = self.ast.init(id).clone();
        self.register_pattern_bindings(init.pattern, id, init.pattern);
    }

    fn register_pattern_bindings(&mut self, p: PatternId, init_id: crate::ast::InitId, root: PatternId) {
        match self.ast.pattern(p).kind.clone() {
            Pattern::Variable(_) => {
                self.enclosing_init.insert(p, init_id);
                self.binding_root.insert(p, root);
            }
            Pattern::Atom(_) => {}
            Pattern::Tuple(fields) => {
                for field in fields.iter() {
                    self.register_pattern_bindings(field.value, init_id, root);
                }
            }
            Pattern::Call { args, .. } => {
                for field in args.iter() {
                    self.register_pattern_bindings(field.value, init_id, root);
                }
            }
            Pattern::FunctionType { .. } => {}
        }
    }

    fn register_stmt(&mut self, id: StmtId) {
        match self.ast.stmt(id).kind.clone() {
            Statement::Init(init_id) => self.register_init(init_id),
            Statement::If { then_branch, else_branch, .. } => {
                self.register_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.register_stmt(else_branch);
                }
            }
            Statement::While { body, .. } => self.register_stmt(body),
            Statement::Block(stmts) => {
                for stmt in stmts {
                    self.register_stmt(stmt);
                }
            }
            Statement::Match { clauses, .. } => {
                for clause in clauses {
                    self.register_stmt(clause.body);
                }
            }
            _ => {}
        }
    }

    fn check_nominal_bodies(&mut self) {
        for item in self.ast.top_level.clone() {
            match item {
                crate::ast::TopLevel::Struct(id) => {
                    let members = self.ast.strukt(id).members.clone();
                    for StructMember { type_expr, .. } in members {
                        self.evaluate_type(type_expr);
                    }
                }
                crate::ast::TopLevel::Choice(id) => {
                    let alternatives = self.ast.choice(id).alternatives.clone();
                    for Alternative { payload, .. } in alternatives {
                        for field in payload.iter() {
                            self.evaluate_type(field.value);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ---- typeOfName ------------------------------------------------------

    fn type_of_name(&mut self, decl: Declaration) -> Type {
        if let Some(state) = self.name_state.get(&decl).cloned() {
            return match state {
                NameState::Final(ty) => ty,
                NameState::BeingComputed => {
                    let site = self.declaration_site(decl);
                    self.name_state.insert(decl, NameState::Final(Type::Error));
                    self.error("type dependency loop", site)
                }
            };
        }
        self.name_state.insert(decl, NameState::BeingComputed);
        let ty = self.compute_type_of_name(decl);
        self.name_state.insert(decl, NameState::Final(ty.clone()));
        ty
    }

    fn compute_type_of_name(&mut self, decl: Declaration) -> Type {
        match decl {
            Declaration::Struct(_) | Declaration::Choice(_) => Type::TypeT,
            Declaration::Function(id) => self.function_signature(id),
            Declaration::Binding(id) => self.compute_binding_type(id),
        }
    }

    fn function_signature(&mut self, id: FunctionId) -> Type {
        if let Some(NameState::Final(ty)) = self.name_state.get(&Declaration::Function(id)).cloned() {
            return ty;
        }
        self.name_state.insert(Declaration::Function(id), NameState::BeingComputed);
        let def: FunctionDefinition = self.ast.function(id).clone();
        let mut params = Vec::with_capacity(def.params.len());
        for field in def.params.iter() {
            let ty = self.pattern_type(field.value, None);
            params.push(TupleField { id: field.id, value: ty });
        }
        let params = Tuple::new(params);
        let return_type = match def.return_type {
            ReturnTypeForm::Expression(e) => self.evaluate_type(e),
            ReturnTypeForm::Auto => self.deduce_auto_return(&def),
        };
        let ty = Type::function(params, return_type);
        self.name_state.insert(Declaration::Function(id), NameState::Final(ty.clone()));
        ty
    }

    /// An `auto` return type is deduced only from the `=> expr;` sugar
    /// (the lowered single `Return` statement); a block body with `auto`
    /// requires an explicit return type, since deducing one would mean
    /// unifying every reachable `return`, not attempted here.
    fn deduce_auto_return(&mut self, def: &FunctionDefinition) -> Type {
        match def.body.map(|b| self.ast.stmt(b).kind.clone()) {
            Some(Statement::Return(Some(e))) => self.type_of_expr(e),
            Some(Statement::Return(None)) => Type::Tuple(Tuple::empty()),
            Some(_) => self.error(
                "cannot deduce an `auto` return type from a block body; give the function an explicit return type",
                def.site,
            ),
            None => self.error("cannot deduce an `auto` return type without a function body", def.site),
        }
    }

    fn compute_binding_type(&mut self, id: PatternId) -> Type {
        if let Some(&init_id) = self.enclosing_init.get(&id) {
            let root = self.binding_root[&id];
            let initializer = self.ast.init(init_id).initializer;
            let rhs = self.type_of_expr(initializer);
            self.pattern_type(root, Some(rhs));
            return match self.name_state.get(&Declaration::Binding(id)) {
                Some(NameState::Final(ty)) => ty.clone(),
                _ => Type::Error,
            };
        }
        // Not initializer-bound: a function parameter (or nested pattern
        // variable with no enclosing `var`), whose declared type (if any)
        // stands on its own.
        self.pattern_type(id, None)
    }

    // ---- type(e) ----------------------------------------------------------

    fn type_of_expr(&mut self, id: ExprId) -> Type {
        if let Some(ty) = self.static_type.get(&id) {
            return ty.clone();
        }
        let ty = self.compute_type_of_expr(id);
        self.static_type.insert(id, ty.clone());
        ty
    }

    fn compute_type_of_expr(&mut self, id: ExprId) -> Type {
        let site = self.site_of(id);
        match self.ast.expr(id).kind.clone() {
            Expr::Name(sym) => match self.resolution.lookup(id) {
                Some(decl) => self.type_of_name(decl),
                None => Type::Error,
            },
            Expr::MemberAccess { base, member } => self.check_member_access(base, member, site),
            Expr::Index { target, offset } => self.check_index(target, offset, site),
            Expr::IntLit(_) => Type::Int,
            Expr::BoolLit(_) => Type::Bool,
            Expr::IntType | Expr::BoolType | Expr::TypeType => Type::TypeT,
            Expr::TupleLit(fields) => self.check_tuple_lit(&fields, site),
            Expr::UnaryOp { op, operand } => self.check_unary(op, operand, site),
            Expr::BinaryOp { op, lhs, rhs } => self.check_binary(op, lhs, rhs, site),
            Expr::Call { callee, args } => self.check_call(callee, &args, site),
            Expr::FunctionType { params, return_type } => self.check_function_type_expr(&params, return_type, site),
        }
    }

    fn check_tuple_lit(&mut self, fields: &Tuple<ExprId>, site: crate::span::SourceRegion) -> Type {
        if !fields.well_formed() {
            return self.error("tuple literal has a duplicate field label", site);
        }
        let mut out = Vec::with_capacity(fields.len());
        for field in fields.iter() {
            let ty = self.type_of_expr(field.value);
            out.push(TupleField { id: field.id, value: ty });
        }
        Type::Tuple(Tuple::new(out))
    }

    fn check_unary(&mut self, op: UnaryOperator, operand: ExprId, site: crate::span::SourceRegion) -> Type {
        let operand_ty = self.type_of_expr(operand);
        let expected = match op {
            UnaryOperator::Negate => Type::Int,
            UnaryOperator::Not => Type::Bool,
        };
        if operand_ty.is_error() {
            return Type::Error;
        }
        if operand_ty != expected {
            return self.error(format!("Expected expression of type {}, not {}", self.fmt(&expected), self.fmt(&operand_ty)), site);
        }
        expected
    }

    fn check_binary(&mut self, op: BinaryOperator, lhs: ExprId, rhs: ExprId, site: crate::span::SourceRegion) -> Type {
        let lhs_ty = self.type_of_expr(lhs);
        let rhs_ty = self.type_of_expr(rhs);
        if lhs_ty.is_error() || rhs_ty.is_error() {
            return Type::Error;
        }
        match op {
            BinaryOperator::Equals => {
                if lhs_ty != rhs_ty {
                    return self.error(
                        format!("operands of `==` have different types {} and {}", self.fmt(&lhs_ty), self.fmt(&rhs_ty)),
                        site,
                    );
                }
                Type::Bool
            }
            BinaryOperator::Add | BinaryOperator::Subtract => {
                if lhs_ty != Type::Int || rhs_ty != Type::Int {
                    return self.error(
                        format!("Expected expression of type Int, not {}", self.fmt(if lhs_ty != Type::Int { &lhs_ty } else { &rhs_ty })),
                        site,
                    );
                }
                Type::Int
            }
            BinaryOperator::And | BinaryOperator::Or => {
                if lhs_ty != Type::Bool || rhs_ty != Type::Bool {
                    return self.error(
                        format!("Expected expression of type Bool, not {}", self.fmt(if lhs_ty != Type::Bool { &lhs_ty } else { &rhs_ty })),
                        site,
                    );
                }
                Type::Bool
            }
        }
    }

    fn const_eval_int(&mut self, e: ExprId) -> Option<i64> {
        match self.ast.expr(e).kind {
            Expr::IntLit(n) => Some(n),
            _ => None,
        }
    }

    fn check_index(&mut self, target: ExprId, offset: ExprId, site: crate::span::SourceRegion) -> Type {
        let target_ty = self.type_of_expr(target);
        let offset_ty = self.type_of_expr(offset);
        if target_ty.is_error() {
            return Type::Error;
        }
        if offset_ty != Type::Int {
            return self.error(format!("Expected expression of type Int, not {}", self.fmt(&offset_ty)), site);
        }
        let Type::Tuple(t) = &target_ty else {
            return self.error(format!("expression of type {} does not have named members", self.fmt(&target_ty)), site);
        };
        let Some(n) = self.const_eval_int(offset) else {
            return self.error("tuple index must be a constant integer expression", site);
        };
        match t.positional(n as u32) {
            Some(field_ty) => field_ty.clone(),
            None => self.error(format!("Tuple type {} has no value at position {n}", self.fmt(&target_ty)), site),
        }
    }

    fn check_member_access(&mut self, base: ExprId, member: crate::intern::Symbol, site: crate::span::SourceRegion) -> Type {
        let base_ty = self.type_of_expr(base);
        if base_ty.is_error() {
            return Type::Error;
        }
        match &base_ty {
            Type::Tuple(t) => match t.get(crate::ast::FieldId::Label(member)) {
                Some(ty) => ty.clone(),
                None => self.error(format!("tuple type {} has no field '{}'", self.fmt(&base_ty), self.interner.resolve(member)), site),
            },
            Type::Struct(id) => {
                let def = self.ast.strukt(*id);
                match def.member(member) {
                    Some(m) => {
                        let type_expr = m.type_expr;
                        self.evaluate_type(type_expr)
                    }
                    None => self.error(
                        format!("struct {} has no member '{}'", self.interner.resolve(def.name), self.interner.resolve(member)),
                        site,
                    ),
                }
            }
            Type::TypeT => {
                let value = self.evaluate_type(base);
                match value {
                    Type::Choice(choice_id) => self.alternative_type(choice_id, member, site),
                    other => self.error(format!("expression of type {} does not have named members", self.fmt(&other)), site),
                }
            }
            other => self.error(format!("expression of type {} does not have named members", self.fmt(other)), site),
        }
    }

    fn alternative_type(&mut self, choice_id: ChoiceId, member: crate::intern::Symbol, site: crate::span::SourceRegion) -> Type {
        let def = self.ast.choice(choice_id);
        match def.alternative_index(member) {
            Some(index) => {
                let alt = self.ast.alternative(crate::ast::AlternativeId { choice: choice_id, index });
                let payload_exprs = alt.payload.clone();
                let mut payload = Vec::with_capacity(payload_exprs.len());
                for field in payload_exprs.iter() {
                    let ty = self.evaluate_type(field.value);
                    payload.push(TupleField { id: field.id, value: ty });
                }
                let payload = Tuple::new(payload);
                self.alternative_payload.insert(crate::ast::AlternativeId { choice: choice_id, index }, payload.clone());
                // A no-payload alternative needs no call to become a value; it
                // already denotes a complete `Choice(choice_id)` value, so it
                // type-checks directly wherever that choice is expected (§8,
                // "referenceable without calling").
                if payload.is_empty() {
                    Type::Choice(choice_id)
                } else {
                    Type::Alternative { parent: choice_id, payload }
                }
            }
            None => self.error(
                format!("choice {} has no alternative '{}'", self.interner.resolve(def.name), self.interner.resolve(member)),
                site,
            ),
        }
    }

    fn check_call(&mut self, callee: ExprId, args: &Tuple<ExprId>, site: crate::span::SourceRegion) -> Type {
        let callee_ty = self.type_of_expr(callee);
        if callee_ty.is_error() {
            return Type::Error;
        }
        let arg_types = self.tuple_type_of(args);
        if arg_types.is_error() {
            return Type::Error;
        }
        match &callee_ty {
            Type::Function { params, return_type } => {
                if !types_tuple_match(&arg_types_as_tuple(&arg_types), params) {
                    return self.error(
                        format!("argument types {} do not match parameter types {}", self.fmt(&arg_types), self.fmt(&Type::Tuple(params.clone()))),
                        site,
                    );
                }
                (**return_type).clone()
            }
            Type::Alternative { parent, payload } => {
                if !types_tuple_match(&arg_types_as_tuple(&arg_types), payload) {
                    return self.error(
                        format!("argument types {} do not match payload type {}", self.fmt(&arg_types), self.fmt(&Type::Tuple(payload.clone()))),
                        site,
                    );
                }
                Type::Choice(*parent)
            }
            Type::TypeT => {
                let value = self.evaluate_type(callee);
                match value {
                    Type::Struct(struct_id) => {
                        let expected = self.struct_initializer_type(struct_id);
                        if !types_tuple_match(&arg_types_as_tuple(&arg_types), &expected) {
                            return self.error(
                                format!(
                                    "argument types {} do not match parameter types {}",
                                    self.fmt(&arg_types),
                                    self.fmt(&Type::Tuple(expected))
                                ),
                                site,
                            );
                        }
                        Type::Struct(struct_id)
                    }
                    other => self.error(format!("type {} is not callable.", self.fmt(&other)), site),
                }
            }
            other => self.error(format!("value of type {} is not callable.", self.fmt(other)), site),
        }
    }

    fn tuple_type_of(&mut self, fields: &Tuple<ExprId>) -> Type {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields.iter() {
            let ty = self.type_of_expr(field.value);
            if ty.is_error() {
                return Type::Error;
            }
            out.push(TupleField { id: field.id, value: ty });
        }
        Type::Tuple(Tuple::new(out))
    }

    fn struct_initializer_type(&mut self, id: StructId) -> Tuple<Type> {
        let members = self.ast.strukt(id).members.clone();
        let mut out = Vec::with_capacity(members.len());
        for member in &members {
            let ty = self.evaluate_type(member.type_expr);
            out.push(TupleField { id: crate::ast::FieldId::Label(member.name), value: ty });
        }
        Tuple::new(out)
    }

    fn check_function_type_expr(&mut self, params: &Tuple<PatternId>, return_type: PatternId, site: crate::span::SourceRegion) -> Type {
        for field in params.iter() {
            let ty = self.pattern_type(field.value, None);
            if ty != Type::TypeT && !ty.is_error() {
                self.error(format!("Pattern in this context must match type values, not {} values", self.fmt(&ty)), site);
            }
        }
        let ret_ty = self.pattern_type(return_type, None);
        if ret_ty != Type::TypeT && !ret_ty.is_error() {
            self.error(format!("Pattern in this context must match type values, not {} values", self.fmt(&ret_ty)), site);
        }
        Type::TypeT
    }

    // ---- patternType(p, rhs) --------------------------------------------

    fn pattern_type(&mut self, p: PatternId, rhs: Option<Type>) -> Type {
        let site = self.ast.pattern(p).site;
        match self.ast.pattern(p).kind.clone() {
            Pattern::Atom(e) => self.type_of_expr(e),
            Pattern::Variable(binding) => {
                let ty = match binding.declared_type {
                    DeclaredType::Expression(e) => self.evaluate_type(e),
                    DeclaredType::Auto(auto_site) => match rhs {
                        Some(ty) => ty,
                        None => self.error("No initializer available to deduce type for auto", auto_site),
                    },
                };
                self.name_state.insert(Declaration::Binding(p), NameState::Final(ty.clone()));
                ty
            }
            Pattern::Tuple(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields.iter() {
                    let sub_rhs = rhs.as_ref().and_then(|r| tuple_field_type(r, field.id));
                    let ty = self.pattern_type(field.value, sub_rhs);
                    out.push(TupleField { id: field.id, value: ty });
                }
                Type::Tuple(Tuple::new(out))
            }
            Pattern::Call { callee, args } => self.check_call_pattern(callee, &args, site),
            Pattern::FunctionType { params, return_type } => {
                for field in params.iter() {
                    let ty = self.pattern_type(field.value, None);
                    if ty != Type::TypeT && !ty.is_error() {
                        self.error(format!("Pattern in this context must match type values, not {} values", self.fmt(&ty)), site);
                    }
                }
                let ret_ty = self.pattern_type(return_type, None);
                if ret_ty != Type::TypeT && !ret_ty.is_error() {
                    self.error(format!("Pattern in this context must match type values, not {} values", self.fmt(&ret_ty)), site);
                }
                Type::TypeT
            }
        }
    }

    fn check_call_pattern(&mut self, callee: ExprId, args: &Tuple<PatternId>, site: crate::span::SourceRegion) -> Type {
        let callee_ty = self.type_of_expr(callee);
        match callee_ty {
            Type::TypeT => {
                let value = self.evaluate_type(callee);
                let Type::Struct(struct_id) = value else {
                    return self.error(format!("Called type must be a struct, not '{}'", self.fmt(&value)), site);
                };
                let expected = self.struct_initializer_type(struct_id);
                let mut out = Vec::with_capacity(args.len());
                for field in args.iter() {
                    let sub_rhs = expected.get(field.id).cloned();
                    let ty = self.pattern_type(field.value, sub_rhs);
                    out.push(TupleField { id: field.id, value: ty });
                }
                let actual = Tuple::new(out);
                if !types_tuple_match(&actual, &expected) {
                    self.error(
                        format!("Argument tuple type {} doesn't match struct initializer type {}", self.fmt(&Type::Tuple(actual)), self.fmt(&Type::Tuple(expected))),
                        site,
                    );
                }
                Type::Struct(struct_id)
            }
            Type::Alternative { parent, payload } => {
                let mut out = Vec::with_capacity(args.len());
                for field in args.iter() {
                    let sub_rhs = payload.get(field.id).cloned();
                    let ty = self.pattern_type(field.value, sub_rhs);
                    out.push(TupleField { id: field.id, value: ty });
                }
                let actual = Tuple::new(out);
                if !types_tuple_match(&actual, &payload) {
                    self.error(
                        format!("Argument tuple type {} doesn't match alternative payload type {}", self.fmt(&Type::Tuple(actual)), self.fmt(&Type::Tuple(payload))),
                        site,
                    );
                }
                Type::Choice(parent)
            }
            Type::Choice(parent) => {
                // The callee denotes a no-payload alternative directly (its
                // own type is already `Choice(parent)`); `()` is legal and
                // carries no payload to check.
                for field in args.iter() {
                    self.pattern_type(field.value, None);
                }
                if !args.is_empty() {
                    self.error("Argument tuple type doesn't match alternative payload type ()", site);
                }
                Type::Choice(parent)
            }
            other => self.error(format!("instance of type {} is not callable", self.fmt(&other)), site),
        }
    }

    // ---- evaluate(e): compile-time type-expression evaluation ------------

    /// Reinterprets `e` as a type-denoting expression rather than an
    /// ordinary value expression. This is deliberately *not* gated on
    /// `type_of_expr(e) == TypeT` up front: a tuple-of-types literal like
    /// `(Int, Bool)` has ordinary static type `(type, type)` as a value
    /// expression (each field's own type is `TypeT`), and only becomes "the
    /// type `(Int, Bool)`" when a type-position caller reinterprets it here.
    /// `FunctionType` is similar. The scalar cases (`Name`, and the
    /// catch-all) do still consult `type_of_expr` since those have no
    /// structure to recurse through.
    fn evaluate_type(&mut self, e: ExprId) -> Type {
        let site = self.site_of(e);
        match self.ast.expr(e).kind.clone() {
            Expr::IntType => Type::Int,
            Expr::BoolType => Type::Bool,
            Expr::TypeType => Type::TypeT,
            Expr::Name(_) => {
                let ty = self.type_of_expr(e);
                if ty.is_error() {
                    return Type::Error;
                }
                if ty != Type::TypeT {
                    return self.error(format!("Not a type expression (value has type {})", self.fmt(&ty)), site);
                }
                match self.resolution.lookup(e) {
                    Some(Declaration::Struct(id)) => Type::Struct(id),
                    Some(Declaration::Choice(id)) => Type::Choice(id),
                    Some(Declaration::Binding(id)) => {
                        self.global_type_values.get(&id).cloned().unwrap_or(Type::Error)
                    }
                    _ => Type::Error,
                }
            }
            Expr::TupleLit(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields.iter() {
                    let ty = self.evaluate_type(field.value);
                    out.push(TupleField { id: field.id, value: ty });
                }
                Type::Tuple(Tuple::new(out))
            }
            Expr::FunctionType { params, return_type } => {
                let mut out = Vec::with_capacity(params.len());
                for field in params.iter() {
                    let ty = self.evaluate_type_pattern(field.value);
                    out.push(TupleField { id: field.id, value: ty });
                }
                let ret = self.evaluate_type_pattern(return_type);
                Type::function(Tuple::new(out), ret)
            }
            _ => {
                let ty = self.type_of_expr(e);
                if ty.is_error() {
                    return Type::Error;
                }
                if ty != Type::TypeT {
                    return self.error(format!("Not a type expression (value has type {})", self.fmt(&ty)), site);
                }
                self.error(
                    "compile-time evaluation of this type expression is not supported (only literal types, names, tuples, and function types are)",
                    site,
                )
            }
        }
    }

    fn evaluate_type_pattern(&mut self, p: PatternId) -> Type {
        let site = self.ast.pattern(p).site;
        match self.ast.pattern(p).kind.clone() {
            Pattern::Atom(e) => self.evaluate_type(e),
            Pattern::Variable(binding) => match binding.declared_type {
                DeclaredType::Expression(e) => self.evaluate_type(e),
                DeclaredType::Auto(auto_site) => {
                    self.error("`auto` in a function-type pattern is not supported", auto_site)
                }
            },
            _ => self.error("nested patterns in function-type position are not supported", site),
        }
    }

    // ---- statement checking ----------------------------------------------

    fn check_function_body(&mut self, id: FunctionId) {
        let def = self.ast.function(id).clone();
        let Some(body) = def.body else { return };
        let Type::Function { return_type, .. } = self.function_signature(id) else { unreachable!() };
        self.check_stmt(body, &return_type, 0);
    }

    fn check_stmt(&mut self, id: StmtId, return_type: &Type, loop_depth: u32) {
        let site = self.ast.stmt(id).site;
        match self.ast.stmt(id).kind.clone() {
            Statement::ExprStmt(e) => {
                self.type_of_expr(e);
            }
            Statement::Assign { target, source } => {
                let target_ty = self.type_of_expr(target);
                let source_ty = self.type_of_expr(source);
                if !target_ty.is_error() && !source_ty.is_error() && target_ty != source_ty {
                    self.error(format!("Expected expression of type {}, not {}", self.fmt(&target_ty), self.fmt(&source_ty)), site);
                }
            }
            Statement::Init(init_id) => self.check_initialization(init_id),
            Statement::If { cond, then_branch, else_branch } => {
                self.expect_bool_condition(cond, site);
                self.check_stmt(then_branch, return_type, loop_depth);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch, return_type, loop_depth);
                }
            }
            Statement::While { cond, body } => {
                self.expect_bool_condition(cond, site);
                self.check_stmt(body, return_type, loop_depth + 1);
            }
            Statement::Match { subject, clauses } => {
                let subject_ty = self.type_of_expr(subject);
                for MatchClause { pattern, body } in clauses {
                    if let Some(pattern) = pattern {
                        self.pattern_type(pattern, Some(subject_ty.clone()));
                    }
                    self.check_stmt(body, return_type, loop_depth);
                }
            }
            Statement::Break | Statement::Continue => {
                if loop_depth == 0 {
                    self.error("`break`/`continue` is invalid outside a loop body", site);
                }
            }
            Statement::Return(value) => {
                let actual = match value {
                    Some(e) => self.type_of_expr(e),
                    None => Type::Tuple(Tuple::empty()),
                };
                if !actual.is_error() && !return_type.is_error() && actual != *return_type {
                    self.error(format!("Expected expression of type {}, not {}", self.fmt(return_type), self.fmt(&actual)), site);
                }
            }
            Statement::Block(stmts) => {
                for stmt in stmts {
                    self.check_stmt(stmt, return_type, loop_depth);
                }
            }
        }
    }

    fn expect_bool_condition(&mut self, cond: ExprId, site: crate::span::SourceRegion) {
        let ty = self.type_of_expr(cond);
        if !ty.is_error() && ty != Type::Bool {
            self.error(format!("Expected expression of type Bool, not {}", self.fmt(&ty)), site);
        }
    }

    fn check_initialization(&mut self, id: crate::ast::InitId) {
        let init: Initialization = self.ast.init(id).clone();
        let rhs = self.type_of_expr(init.initializer);
        let lhs = self.pattern_type(init.pattern, Some(rhs.clone()));
        if !lhs.is_error() && !rhs.is_error() && lhs != rhs {
            self.error(
                format!("Pattern type {} does not match initializer type {}", self.fmt(&lhs), self.fmt(&rhs)),
                init.site,
            );
        }
        if rhs == Type::TypeT && matches!(self.ast.pattern(init.pattern).kind, Pattern::Variable(_)) {
            let value = self.evaluate_type(init.initializer);
            self.global_type_values.insert(init.pattern, value);
        }
    }
}

fn tuple_field_type(ty: &Type, id: crate::ast::FieldId) -> Option<Type> {
    match ty {
        Type::Tuple(t) => t.get(id).cloned(),
        _ => None,
    }
}

fn arg_types_as_tuple(ty: &Type) -> Tuple<Type> {
    match ty {
        Type::Tuple(t) => t.clone(),
        _ => Tuple::empty(),
    }
}

/// Two type tuples "match" in the call-argument sense: congruent field
/// ids, and each field's type equal (`==`, not assignability — Carbon has
/// no implicit conversions).
fn types_tuple_match(actual: &Tuple<Type>, expected: &Tuple<Type>) -> bool {
    actual.congruent(expected) && actual.iter().all(|field| expected.get(field.id).is_some_and(|t| *t == field.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{DeclaredType, FieldId, FunctionDefinition, ReturnTypeForm, SimpleBinding},
        resolve,
        span::FileTable,
    };

    fn region(files: &mut FileTable) -> crate::span::SourceRegion {
        let f = files.intern("t.carbon");
        crate::span::SourceRegion::new(f, 0, 1)
    }

    #[test]
    fn literal_return_type_is_int() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let zero = ast.alloc_expr(Expr::IntLit(0), site);
        let body = ast.alloc_stmt(Statement::Return(Some(zero)), site);
        let int_ty = ast.alloc_expr(Expr::IntType, site);
        let f = ast.alloc_function(FunctionDefinition {
            name: interner.intern("main"),
            site,
            params: Tuple::empty(),
            return_type: ReturnTypeForm::Expression(int_ty),
            body: Some(body),
        });
        ast.top_level.push(crate::ast::TopLevel::Function(f));

        let mut diags = Diagnostics::new();
        let resolution = resolve::resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
        let info = check(&ast, &interner, &resolution, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(*info.type_of(zero), Type::Int);
    }

    #[test]
    fn dependency_loop_between_auto_returns_is_reported() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let f_name = interner.intern("f");
        let g_name = interner.intern("g");

        let call_g_name = ast.alloc_expr(Expr::Name(g_name), site);
        let call_g = ast.alloc_expr(Expr::Call { callee: call_g_name, args: Tuple::empty() }, site);
        let f_body = ast.alloc_stmt(Statement::Return(Some(call_g)), site);
        let f = ast.alloc_function(FunctionDefinition {
            name: f_name,
            site,
            params: Tuple::empty(),
            return_type: ReturnTypeForm::Auto,
            body: Some(f_body),
        });

        let call_f_name = ast.alloc_expr(Expr::Name(f_name), site);
        let call_f = ast.alloc_expr(Expr::Call { callee: call_f_name, args: Tuple::empty() }, site);
        let g_body = ast.alloc_stmt(Statement::Return(Some(call_f)), site);
        let g = ast.alloc_function(FunctionDefinition {
            name: g_name,
            site,
            params: Tuple::empty(),
            return_type: ReturnTypeForm::Auto,
            body: Some(g_body),
        });

        ast.top_level.push(crate::ast::TopLevel::Function(f));
        ast.top_level.push(crate::ast::TopLevel::Function(g));

        let mut diags = Diagnostics::new();
        let resolution = resolve::resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
        check(&ast, &interner, &resolution, &mut diags);
        assert!(diags.iter().any(|d| d.message.contains("type dependency loop")));
    }

    #[test]
    fn auto_binding_deduces_initializer_type() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let x = interner.intern("x");
        let lit = ast.alloc_expr(Expr::IntLit(7), site);
        let pattern = ast.alloc_pattern(
            Pattern::Variable(SimpleBinding { name: x, declared_type: DeclaredType::Auto(site) }),
            site,
        );
        let init_id = ast.alloc_init(Initialization { pattern, initializer: lit, site });
        ast.top_level.push(crate::ast::TopLevel::Initialization(init_id));

        let mut diags = Diagnostics::new();
        let resolution = resolve::resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
        let info = check(&ast, &interner, &resolution, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(*info.binding_type(pattern), Type::Int);
    }

    #[test]
    fn unary_not_rejects_int() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let b_name = interner.intern("b");
        let int_ty = ast.alloc_expr(Expr::IntType, site);
        let param = ast.alloc_pattern(
            Pattern::Variable(SimpleBinding { name: b_name, declared_type: DeclaredType::Expression(int_ty) }),
            site,
        );
        let use_b = ast.alloc_expr(Expr::Name(b_name), site);
        let not_b = ast.alloc_expr(Expr::UnaryOp { op: UnaryOperator::Not, operand: use_b }, site);
        let body = ast.alloc_stmt(Statement::ExprStmt(not_b), site);
        let f = ast.alloc_function(FunctionDefinition {
            name: interner.intern("f"),
            site,
            params: Tuple::new(vec![TupleField { id: FieldId::Position(0), value: param }]),
            return_type: ReturnTypeForm::Auto,
            body: Some(body),
        });
        ast.top_level.push(crate::ast::TopLevel::Function(f));

        let mut diags = Diagnostics::new();
        let resolution = resolve::resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
        check(&ast, &interner, &resolution, &mut diags);
        assert!(diags.iter().any(|d| d.message.contains("Expected expression of type Bool")));
    }
}
