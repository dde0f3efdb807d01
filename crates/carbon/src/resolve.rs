//! Name resolution (§4.1).
//!
//! Two passes over the program. The first, shallow pass walks the
//! top-level declaration list and records every name it introduces —
//! functions, structs, choices, and the pattern-bound names of top-level
//! `var` initializations — into one persistent global [`Scope`], without
//! looking at any expression. The second, deep pass walks every body,
//! resolving each [`Expr::Name`] use-site against a stack of nested scopes
//! rooted at that global one, pushing a fresh scope for each block, `if`/
//! `while` body, match clause, and parameter list.
//!
//! Running the shallow pass to completion before the deep pass is what
//! gives forward and mutually recursive references their meaning for
//! free: a function can call one declared later in the file, a struct's
//! member type can name the struct currently being defined, and a choice
//! alternative's payload can refer to itself, all without the deep pass
//! needing any special-casing — the name is already sitting in the global
//! scope by the time anything tries to look it up.

use ahash::{AHashMap, AHashSet};

use crate::{
    ast::{
        Alternative, Ast, ChoiceDefinition, Declaration, Expr, ExprId, FunctionDefinition, Initialization, MatchClause,
        Pattern, PatternId, Statement, StmtId, StructDefinition, StructMember, TopLevel, Tuple,
    },
    diagnostics::{Diagnostic, Diagnostics},
    intern::{Interner, Symbol},
    span::SourceRegion,
};

/// The output of name resolution: every use-site's resolved declaration,
/// plus the subset of bindings that live at global scope (top-level `var`
/// patterns) — the interpreter consults `globals` to decide whether a
/// binding gets a persistent, program-lifetime address or an ephemeral,
/// frame-lifetime one (§4.3).
#[derive(Debug, Default)]
pub struct Resolution {
    pub definitions: AHashMap<ExprId, Declaration>,
    pub globals: AHashSet<Symbol>,
}

impl Resolution {
    pub fn lookup(&self, use_site: ExprId) -> Option<Declaration> {
        self.definitions.get(&use_site).copied()
    }
}

#[derive(Default)]
struct Scope {
    bindings: AHashMap<Symbol, Declaration>,
}

struct Resolver<'a> {
    ast: &'a Ast,
    interner: &'a Interner,
    diags: &'a mut Diagnostics,
    scopes: Vec<Scope>,
    definitions: AHashMap<ExprId, Declaration>,
    globals: AHashSet<Symbol>,
}

pub fn resolve(ast: &Ast, interner: &Interner, diags: &mut Diagnostics) -> Resolution {
    let mut resolver = Resolver {
        ast,
        interner,
        diags,
        scopes: vec![Scope::default()],
        definitions: AHashMap::new(),
        globals: AHashSet::new(),
    };
    resolver.collect_globals();
    resolver.resolve_top_level();
    Resolution { definitions: resolver.definitions, globals: resolver.globals }
}

impl<'a> Resolver<'a> {
    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, name: Symbol) -> Option<Declaration> {
        self.scopes.iter().rev().find_map(|scope| scope.bindings.get(&name).copied())
    }

    fn declaration_site(&self, decl: Declaration) -> SourceRegion {
        match decl {
            Declaration::Function(id) => self.ast.function(id).site,
            Declaration::Struct(id) => self.ast.strukt(id).site,
            Declaration::Choice(id) => self.ast.choice(id).site,
            Declaration::Binding(id) => self.ast.pattern(id).site,
        }
    }

    /// Declares `name` in the *current* (innermost) scope. A name already
    /// bound in an enclosing scope is shadowed, not rejected; a name
    /// already bound in this same scope is a duplicate-declaration error.
    fn declare(&mut self, name: Symbol, decl: Declaration, site: SourceRegion) {
        let scope = self.scopes.last_mut().expect("at least one scope is always open");
        if let Some(&existing) = scope.bindings.get(&name) {
            let existing_site = self.declaration_site(existing);
            self.diags.push(
                Diagnostic::new(format!("`{}` is already declared", self.interner.resolve(name)), site)
                    .with_note("previously declared here", existing_site),
            );
            return;
        }
        scope.bindings.insert(name, decl);
    }

    /// Declares every top-level name into the global scope without
    /// resolving any expression.
    fn collect_globals(&mut self) {
        for item in &self.ast.top_level {
            match *item {
                TopLevel::Function(id) => {
                    let def = self.ast.function(id);
                    self.declare(def.name, Declaration::Function(id), def.site);
                }
                TopLevel::Struct(id) => {
                    let def = self.ast.strukt(id);
                    self.declare(def.name, Declaration::Struct(id), def.site);
                }
                TopLevel::Choice(id) => {
                    let def = self.ast.choice(id);
                    self.declare(def.name, Declaration::Choice(id), def.site);
                }
                TopLevel::Initialization(id) => {
                    let init = self.ast.init(id);
                    self.collect_pattern_bindings(init.pattern);
                }
            }
        }
    }

    /// Shallow walk of a pattern's variable bindings, declaring each into
    /// the current (global, for top-level patterns) scope and recording
    /// it as a global name. Does not resolve any expression embedded in
    /// the pattern — that happens later, in the deep pass.
    fn collect_pattern_bindings(&mut self, id: PatternId) {
        let site = self.ast.pattern(id).site;
        match &self.ast.pattern(id).kind {
            Pattern::Variable(binding) => {
                self.globals.insert(binding.name);
                self.declare(binding.name, Declaration::Binding(id), site);
            }
            Pattern::Atom(_) => {}
            Pattern::Tuple(fields) => {
                for field in fields.iter() {
                    self.collect_pattern_bindings(field.value);
                }
            }
            Pattern::Call { args, .. } => {
                for field in args.iter() {
                    self.collect_pattern_bindings(field.value);
                }
            }
            Pattern::FunctionType { params, return_type } => {
                for field in params.iter() {
                    self.collect_pattern_bindings(field.value);
                }
                self.collect_pattern_bindings(*return_type);
            }
        }
    }

    fn resolve_top_level(&mut self) {
        for item in self.ast.top_level.clone() {
            match item {
                TopLevel::Function(id) => self.resolve_function(id),
                TopLevel::Struct(id) => self.resolve_struct(id),
                TopLevel::Choice(id) => self.resolve_choice(id),
                TopLevel::Initialization(id) => self.resolve_top_level_init(id),
            }
        }
    }

    fn resolve_function(&mut self, id: crate::ast::FunctionId) {
        let def: FunctionDefinition = self.ast.function(id).clone();
        self.push_scope();
        for field in def.params.iter() {
            self.resolve_pattern(field.value, true);
        }
        if let crate::ast::ReturnTypeForm::Expression(e) = def.return_type {
            self.resolve_expr(e);
        }
        if let Some(body) = def.body {
            self.resolve_stmt(body);
        }
        self.pop_scope();
    }

    fn resolve_struct(&mut self, id: crate::ast::StructId) {
        let def: StructDefinition = self.ast.strukt(id).clone();
        let mut seen: AHashMap<Symbol, SourceRegion> = AHashMap::new();
        for StructMember { name, type_expr, site } in &def.members {
            if let Some(&previous) = seen.get(name) {
                self.diags.push(
                    Diagnostic::new(format!("`{}` is already declared", self.interner.resolve(*name)), *site)
                        .with_note("previously declared here", previous),
                );
            } else {
                seen.insert(*name, *site);
            }
            self.resolve_expr(*type_expr);
        }
    }

    fn resolve_choice(&mut self, id: crate::ast::ChoiceId) {
        let def: ChoiceDefinition = self.ast.choice(id).clone();
        let mut seen: AHashMap<Symbol, SourceRegion> = AHashMap::new();
        for Alternative { name, payload, site } in &def.alternatives {
            if let Some(&previous) = seen.get(name) {
                self.diags.push(
                    Diagnostic::new(format!("`{}` is already declared", self.interner.resolve(*name)), *site)
                        .with_note("previously declared here", previous),
                );
            } else {
                seen.insert(*name, *site);
            }
            for field in payload.iter() {
                self.resolve_expr(field.value);
            }
        }
    }

    fn resolve_top_level_init(&mut self, id: crate::ast::InitId) {
        let init: Initialization = self.ast.init(id).clone();
        self.resolve_expr(init.initializer);
        self.resolve_pattern_types(init.pattern);
    }

    fn resolve_stmt(&mut self, id: StmtId) {
        match self.ast.stmt(id).kind.clone() {
            Statement::ExprStmt(e) => self.resolve_expr(e),
            Statement::Assign { target, source } => {
                self.resolve_expr(target);
                self.resolve_expr(source);
            }
            Statement::Init(init_id) => {
                let init = self.ast.init(init_id).clone();
                self.resolve_expr(init.initializer);
                self.resolve_pattern(init.pattern, true);
            }
            Statement::If { cond, then_branch, else_branch } => {
                self.resolve_expr(cond);
                self.push_scope();
                self.resolve_stmt(then_branch);
                self.pop_scope();
                if let Some(else_branch) = else_branch {
                    self.push_scope();
                    self.resolve_stmt(else_branch);
                    self.pop_scope();
                }
            }
            Statement::While { cond, body } => {
                self.resolve_expr(cond);
                self.push_scope();
                self.resolve_stmt(body);
                self.pop_scope();
            }
            Statement::Match { subject, clauses } => {
                self.resolve_expr(subject);
                for MatchClause { pattern, body } in clauses {
                    self.push_scope();
                    if let Some(pattern) = pattern {
                        self.resolve_pattern(pattern, true);
                    }
                    self.resolve_stmt(body);
                    self.pop_scope();
                }
            }
            Statement::Break | Statement::Continue => {}
            Statement::Return(value) => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Statement::Block(stmts) => {
                self.push_scope();
                for stmt in stmts {
                    self.resolve_stmt(stmt);
                }
                self.pop_scope();
            }
        }
    }

    fn resolve_expr(&mut self, id: ExprId) {
        match self.ast.expr(id).kind.clone() {
            Expr::Name(name) => self.resolve_name(id, name),
            Expr::MemberAccess { base, .. } => self.resolve_expr(base),
            Expr::Index { target, offset } => {
                self.resolve_expr(target);
                self.resolve_expr(offset);
            }
            Expr::IntLit(_) | Expr::BoolLit(_) | Expr::IntType | Expr::BoolType | Expr::TypeType => {}
            Expr::TupleLit(fields) => self.resolve_tuple_exprs(&fields),
            Expr::UnaryOp { operand, .. } => self.resolve_expr(operand),
            Expr::BinaryOp { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Call { callee, args } => {
                self.resolve_expr(callee);
                self.resolve_tuple_exprs(&args);
            }
            Expr::FunctionType { params, return_type } => {
                self.push_scope();
                for field in params.iter() {
                    self.resolve_pattern(field.value, true);
                }
                self.resolve_pattern(return_type, true);
                self.pop_scope();
            }
        }
    }

    fn resolve_tuple_exprs(&mut self, fields: &Tuple<ExprId>) {
        for field in fields.iter() {
            self.resolve_expr(field.value);
        }
    }

    fn resolve_name(&mut self, use_site: ExprId, name: Symbol) {
        match self.lookup(name) {
            Some(decl) => {
                self.definitions.insert(use_site, decl);
            }
            None => {
                let site = self.ast.expr(use_site).site;
                self.diags.error(format!("undeclared name `{}`", self.interner.resolve(name)), site);
            }
        }
    }

    /// Resolves a pattern, optionally declaring the bindings it introduces
    /// into the current scope (`false` is used for a top-level `var`
    /// pattern's *types*, whose bindings were already declared globally by
    /// [`Self::collect_pattern_bindings`]).
    fn resolve_pattern(&mut self, id: PatternId, introduce_bindings: bool) {
        let site = self.ast.pattern(id).site;
        match self.ast.pattern(id).kind.clone() {
            Pattern::Atom(e) => self.resolve_expr(e),
            Pattern::Variable(binding) => {
                if let crate::ast::DeclaredType::Expression(e) = binding.declared_type {
                    self.resolve_expr(e);
                }
                if introduce_bindings {
                    self.declare(binding.name, Declaration::Binding(id), site);
                }
            }
            Pattern::Tuple(fields) => {
                for field in fields.iter() {
                    self.resolve_pattern(field.value, introduce_bindings);
                }
            }
            Pattern::Call { callee, args } => {
                self.resolve_expr(callee);
                for field in args.iter() {
                    self.resolve_pattern(field.value, introduce_bindings);
                }
            }
            Pattern::FunctionType { params, return_type } => {
                self.push_scope();
                for field in params.iter() {
                    self.resolve_pattern(field.value, true);
                }
                self.resolve_pattern(return_type, true);
                self.pop_scope();
            }
        }
    }

    /// Resolves only the type expressions embedded in a top-level `var`
    /// pattern (its bindings are already global); used so a global's
    /// declared type can itself reference other globals without being
    /// re-declared.
    fn resolve_pattern_types(&mut self, id: PatternId) {
        match self.ast.pattern(id).kind.clone() {
            Pattern::Atom(e) => self.resolve_expr(e),
            Pattern::Variable(binding) => {
                if let crate::ast::DeclaredType::Expression(e) = binding.declared_type {
                    self.resolve_expr(e);
                }
            }
            Pattern::Tuple(fields) => {
                for field in fields.iter() {
                    self.resolve_pattern_types(field.value);
                }
            }
            Pattern::Call { callee, args } => {
                self.resolve_expr(callee);
                for field in args.iter() {
                    self.resolve_pattern_types(field.value);
                }
            }
            Pattern::FunctionType { params, return_type } => {
                self.push_scope();
                for field in params.iter() {
                    self.resolve_pattern(field.value, true);
                }
                self.resolve_pattern(return_type, true);
                self.pop_scope();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BinaryOperator, DeclaredType, FunctionDefinition, ReturnTypeForm, SimpleBinding},
        span::FileTable,
    };

    fn region(files: &mut FileTable) -> SourceRegion {
        let f = files.intern("t.carbon");
        SourceRegion::new(f, 0, 1)
    }

    #[test]
    fn function_can_call_itself_recursively() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let name = interner.intern("f");

        let call_name = ast.alloc_expr(Expr::Name(name), site);
        let call = ast.alloc_expr(Expr::Call { callee: call_name, args: Tuple::empty() }, site);
        let body = ast.alloc_stmt(Statement::Return(Some(call)), site);
        let id = ast.alloc_function(FunctionDefinition {
            name,
            site,
            params: Tuple::empty(),
            return_type: ReturnTypeForm::Auto,
            body: Some(body),
        });
        ast.top_level.push(TopLevel::Function(id));

        let mut diags = Diagnostics::new();
        let resolution = resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(resolution.lookup(call_name), Some(Declaration::Function(id)));
    }

    #[test]
    fn undeclared_name_is_reported() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let name = interner.intern("missing");
        let use_site = ast.alloc_expr(Expr::Name(name), site);
        let body = ast.alloc_stmt(Statement::Return(Some(use_site)), site);
        let id = ast.alloc_function(FunctionDefinition {
            name: interner.intern("f"),
            site,
            params: Tuple::empty(),
            return_type: ReturnTypeForm::Auto,
            body: Some(body),
        });
        ast.top_level.push(TopLevel::Function(id));

        let mut diags = Diagnostics::new();
        let resolution = resolve(&ast, &interner, &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(resolution.lookup(use_site), None);
    }

    #[test]
    fn duplicate_global_name_is_reported() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let name = interner.intern("f");
        for _ in 0..2 {
            let id = ast.alloc_function(FunctionDefinition {
                name,
                site,
                params: Tuple::empty(),
                return_type: ReturnTypeForm::Auto,
                body: None,
            });
            ast.top_level.push(TopLevel::Function(id));
        }
        let mut diags = Diagnostics::new();
        resolve(&ast, &interner, &mut diags);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn param_is_visible_in_body_and_shadows_global() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let x = interner.intern("x");

        let int_ty = ast.alloc_expr(Expr::IntType, site);
        let param = ast.alloc_pattern(
            Pattern::Variable(SimpleBinding { name: x, declared_type: DeclaredType::Expression(int_ty) }),
            site,
        );
        let use_in_body = ast.alloc_expr(Expr::Name(x), site);
        let body = ast.alloc_stmt(Statement::Return(Some(use_in_body)), site);
        let f = ast.alloc_function(FunctionDefinition {
            name: interner.intern("f"),
            site,
            params: Tuple::new(vec![crate::ast::TupleField { id: crate::ast::FieldId::Position(0), value: param }]),
            return_type: ReturnTypeForm::Auto,
            body: Some(body),
        });
        ast.top_level.push(TopLevel::Function(f));

        let mut diags = Diagnostics::new();
        let resolution = resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(resolution.lookup(use_in_body), Some(Declaration::Binding(param)));
    }

    #[test]
    fn binary_op_resolves_both_sides() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut interner = Interner::new();
        let mut ast = Ast::new();
        let lit_a = ast.alloc_expr(Expr::IntLit(1), site);
        let lit_b = ast.alloc_expr(Expr::IntLit(2), site);
        let sum = ast.alloc_expr(Expr::BinaryOp { op: BinaryOperator::Add, lhs: lit_a, rhs: lit_b }, site);
        let body = ast.alloc_stmt(Statement::Return(Some(sum)), site);
        let f = ast.alloc_function(FunctionDefinition {
            name: interner.intern("f"),
            site,
            params: Tuple::empty(),
            return_type: ReturnTypeForm::Auto,
            body: Some(body),
        });
        ast.top_level.push(TopLevel::Function(f));
        let mut diags = Diagnostics::new();
        resolve(&ast, &interner, &mut diags);
        assert!(diags.is_empty());
    }
}
