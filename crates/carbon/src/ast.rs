//! The abstract syntax tree.
//!
//! Nodes live in arenas owned by [`Ast`] and are referred to everywhere
//! else by small identity handles (`ExprId`, `PatternId`, `StmtId`,
//! `FunctionId`, `StructId`, `ChoiceId`, `InitId`) rather than by
//! value-semantics nodes compared structurally. A handle is unique by
//! construction — every parse produces a fresh arena slot — so handle
//! equality already *is* node identity; `site` is carried purely for
//! diagnostics.

use std::ops::Index;

use crate::{intern::Symbol, span::SourceRegion};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Identity handle for an [`Expr`] node.
    ExprId
);
arena_id!(
    /// Identity handle for a [`Pattern`] node.
    PatternId
);
arena_id!(
    /// Identity handle for a [`Statement`] node.
    StmtId
);
arena_id!(
    /// Identity handle for a top-level [`FunctionDefinition`].
    FunctionId
);
arena_id!(
    /// Identity handle for a top-level [`StructDefinition`].
    StructId
);
arena_id!(
    /// Identity handle for a top-level [`ChoiceDefinition`].
    ChoiceId
);
arena_id!(
    /// Identity handle for a top-level [`Initialization`].
    InitId
);

/// Identity for a single alternative of a choice. Choices are arena-stored
/// by [`ChoiceId`]; an alternative is addressed by that choice plus its
/// ordinal position, which is stable for the lifetime of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlternativeId {
    pub choice: ChoiceId,
    pub index: u32,
}

/// Either a nominal-type-body member, or a variable binding introduced by
/// a pattern. Patterns are the only place bindings are introduced (a
/// function parameter is a pattern; `var p = e;` is a pattern), so a
/// binding's identity is simply the id of the `Pattern::Variable` node
/// that introduces it.
pub type BindingId = PatternId;

/// A declaration a [`crate::ast::Expr::Name`] use-site can resolve to.
/// This is name resolution's `definition` table's value type (§4.1) and
/// the type checker's `typeOfName` memoization key (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    Function(FunctionId),
    Struct(StructId),
    Choice(ChoiceId),
    Binding(BindingId),
}

/// Either a positional field (by ordinal) or a labeled field. Positional
/// fields occupy positions `0..n` before any labeled field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Position(u32),
    Label(Symbol),
}

/// One field of a [`Tuple`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField<T> {
    pub id: FieldId,
    pub value: T,
}

/// An ordered sequence of fields, each carrying a [`FieldId`]. Positional
/// fields come first; labeled fields follow (§3.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuple<T> {
    pub fields: Vec<TupleField<T>>,
}

impl<T> Tuple<T> {
    pub fn new(fields: Vec<TupleField<T>>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TupleField<T>> {
        self.fields.iter()
    }

    pub fn get(&self, id: FieldId) -> Option<&T> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.value)
    }

    pub fn get_mut(&mut self, id: FieldId) -> Option<&mut T> {
        self.fields.iter_mut().find(|f| f.id == id).map(|f| &mut f.value)
    }

    pub fn positional(&self, position: u32) -> Option<&T> {
        self.get(FieldId::Position(position))
    }

    /// A tuple is well-formed iff its labels are unique (positional fields
    /// are unique by construction: the parser assigns ordinals).
    pub fn well_formed(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.fields.iter().all(|f| match f.id {
            FieldId::Position(_) => true,
            FieldId::Label(sym) => seen.insert(sym),
        })
    }

    /// Two tuples are congruent iff they have the same set of field ids,
    /// independent of order or value type.
    pub fn congruent<U>(&self, other: &Tuple<U>) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields.iter().all(|f| other.get(f.id).is_some())
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Tuple<U> {
        Tuple {
            fields: self.fields.iter().map(|field| TupleField { id: field.id, value: f(&field.value) }).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Equals,
    And,
    Or,
}

/// Expression nodes (§3.2).
#[derive(Debug, Clone)]
pub enum Expr {
    Name(Symbol),
    MemberAccess { base: ExprId, member: Symbol },
    Index { target: ExprId, offset: ExprId },
    IntLit(i64),
    BoolLit(bool),
    TupleLit(Tuple<ExprId>),
    UnaryOp { op: UnaryOperator, operand: ExprId },
    BinaryOp { op: BinaryOperator, lhs: ExprId, rhs: ExprId },
    Call { callee: ExprId, args: Tuple<ExprId> },
    IntType,
    BoolType,
    TypeType,
    FunctionType { params: Tuple<PatternId>, return_type: PatternId },
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: Expr,
    pub site: SourceRegion,
}

/// A binding's declared type: either written out, or `auto` (deduced from
/// an initializer, a match subject, or a call argument).
#[derive(Debug, Clone, Copy)]
pub enum DeclaredType {
    Expression(ExprId),
    Auto(SourceRegion),
}

#[derive(Debug, Clone)]
pub struct SimpleBinding {
    pub name: Symbol,
    pub declared_type: DeclaredType,
}

/// Pattern nodes (§3.2). Patterns serve both as binding sites (`var`
/// initializers, function parameters) and as match subjects.
#[derive(Debug, Clone)]
pub enum Pattern {
    Atom(ExprId),
    Variable(SimpleBinding),
    Tuple(Tuple<PatternId>),
    Call { callee: ExprId, args: Tuple<PatternId> },
    FunctionType { params: Tuple<PatternId>, return_type: PatternId },
}

#[derive(Debug, Clone)]
pub struct PatternNode {
    pub kind: Pattern,
    pub site: SourceRegion,
}

/// `var p = e;`, lowered from both `var` statements and top-level bindings.
#[derive(Debug, Clone)]
pub struct Initialization {
    pub pattern: PatternId,
    pub initializer: ExprId,
    pub site: SourceRegion,
}

#[derive(Debug, Clone)]
pub struct MatchClause {
    /// `None` denotes the `default` clause, which always matches.
    pub pattern: Option<PatternId>,
    pub body: StmtId,
}

/// Statement nodes (§3.2).
#[derive(Debug, Clone)]
pub enum Statement {
    ExprStmt(ExprId),
    Assign { target: ExprId, source: ExprId },
    Init(InitId),
    If { cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId> },
    While { cond: ExprId, body: StmtId },
    Match { subject: ExprId, clauses: Vec<MatchClause> },
    Break,
    Continue,
    Return(Option<ExprId>),
    Block(Vec<StmtId>),
}

#[derive(Debug, Clone)]
pub struct StmtNode {
    pub kind: Statement,
    pub site: SourceRegion,
}

#[derive(Debug, Clone, Copy)]
pub enum ReturnTypeForm {
    Expression(ExprId),
    Auto,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: Symbol,
    pub site: SourceRegion,
    pub params: Tuple<PatternId>,
    pub return_type: ReturnTypeForm,
    /// `Block(stmts)` for `{ ... }` bodies, `Return(e)` for `=> e;` sugar,
    /// or absent for a forward declaration (rejected by the checker if
    /// ever called, but legal to declare).
    pub body: Option<StmtId>,
}

#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: Symbol,
    pub type_expr: ExprId,
    pub site: SourceRegion,
}

#[derive(Debug, Clone)]
pub struct StructDefinition {
    pub name: Symbol,
    pub site: SourceRegion,
    pub members: Vec<StructMember>,
}

impl StructDefinition {
    pub fn member(&self, name: Symbol) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Alternative {
    pub name: Symbol,
    pub payload: Tuple<ExprId>,
    pub site: SourceRegion,
}

#[derive(Debug, Clone)]
pub struct ChoiceDefinition {
    pub name: Symbol,
    pub site: SourceRegion,
    pub alternatives: Vec<Alternative>,
}

impl ChoiceDefinition {
    pub fn alternative_index(&self, name: Symbol) -> Option<u32> {
        self.alternatives.iter().position(|a| a.name == name).map(|i| i as u32)
    }
}

/// A top-level declaration (§3.2).
#[derive(Debug, Clone, Copy)]
pub enum TopLevel {
    Function(FunctionId),
    Struct(StructId),
    Choice(ChoiceId),
    Initialization(InitId),
}

/// The whole program: arenas for every node kind plus the ordered list of
/// top-level declarations.
#[derive(Debug, Default)]
pub struct Ast {
    exprs: Vec<ExprNode>,
    patterns: Vec<PatternNode>,
    stmts: Vec<StmtNode>,
    functions: Vec<FunctionDefinition>,
    structs: Vec<StructDefinition>,
    choices: Vec<ChoiceDefinition>,
    inits: Vec<Initialization>,
    pub top_level: Vec<TopLevel>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, kind: Expr, site: SourceRegion) -> ExprId {
        self.exprs.push(ExprNode { kind, site });
        ExprId((self.exprs.len() - 1) as u32)
    }

    pub fn alloc_pattern(&mut self, kind: Pattern, site: SourceRegion) -> PatternId {
        self.patterns.push(PatternNode { kind, site });
        PatternId((self.patterns.len() - 1) as u32)
    }

    pub fn alloc_stmt(&mut self, kind: Statement, site: SourceRegion) -> StmtId {
        self.stmts.push(StmtNode { kind, site });
        StmtId((self.stmts.len() - 1) as u32)
    }

    pub fn alloc_function(&mut self, def: FunctionDefinition) -> FunctionId {
        self.functions.push(def);
        FunctionId((self.functions.len() - 1) as u32)
    }

    pub fn alloc_struct(&mut self, def: StructDefinition) -> StructId {
        self.structs.push(def);
        StructId((self.structs.len() - 1) as u32)
    }

    pub fn alloc_choice(&mut self, def: ChoiceDefinition) -> ChoiceId {
        self.choices.push(def);
        ChoiceId((self.choices.len() - 1) as u32)
    }

    pub fn alloc_init(&mut self, init: Initialization) -> InitId {
        self.inits.push(init);
        InitId((self.inits.len() - 1) as u32)
    }

    pub fn expr(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id.index()]
    }

    pub fn pattern(&self, id: PatternId) -> &PatternNode {
        &self.patterns[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &StmtNode {
        &self.stmts[id.index()]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionDefinition {
        &self.functions[id.index()]
    }

    pub fn strukt(&self, id: StructId) -> &StructDefinition {
        &self.structs[id.index()]
    }

    pub fn choice(&self, id: ChoiceId) -> &ChoiceDefinition {
        &self.choices[id.index()]
    }

    pub fn init(&self, id: InitId) -> &Initialization {
        &self.inits[id.index()]
    }

    pub fn alternative(&self, id: AlternativeId) -> &Alternative {
        &self.choice(id.choice).alternatives[id.index as usize]
    }
}

impl Index<ExprId> for Ast {
    type Output = ExprNode;
    fn index(&self, id: ExprId) -> &ExprNode {
        self.expr(id)
    }
}

impl Index<PatternId> for Ast {
    type Output = PatternNode;
    fn index(&self, id: PatternId) -> &PatternNode {
        self.pattern(id)
    }
}

impl Index<StmtId> for Ast {
    type Output = StmtNode;
    fn index(&self, id: StmtId) -> &StmtNode {
        self.stmt(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileTable;

    fn region(files: &mut FileTable) -> SourceRegion {
        let f = files.intern("t.carbon");
        SourceRegion::new(f, 0, 1)
    }

    #[test]
    fn tuple_congruence_ignores_order_and_value_type() {
        let a: Tuple<i32> = Tuple::new(vec![
            TupleField { id: FieldId::Position(0), value: 1 },
            TupleField { id: FieldId::Position(1), value: 2 },
        ]);
        let b: Tuple<&str> = Tuple::new(vec![
            TupleField { id: FieldId::Position(1), value: "b" },
            TupleField { id: FieldId::Position(0), value: "a" },
        ]);
        assert!(a.congruent(&b));
    }

    #[test]
    fn tuple_with_duplicate_label_is_not_well_formed() {
        let mut interner = crate::intern::Interner::new();
        let a = interner.intern("a");
        let t: Tuple<i32> = Tuple::new(vec![
            TupleField { id: FieldId::Label(a), value: 1 },
            TupleField { id: FieldId::Label(a), value: 2 },
        ]);
        assert!(!t.well_formed());
    }

    #[test]
    fn arena_ids_are_stable_identities() {
        let mut files = FileTable::new();
        let site = region(&mut files);
        let mut ast = Ast::new();
        let a = ast.alloc_expr(Expr::IntLit(1), site);
        let b = ast.alloc_expr(Expr::IntLit(2), site);
        assert_ne!(a, b);
        assert!(matches!(ast.expr(a).kind, Expr::IntLit(1)));
    }
}
