//! Recursive-descent parser (collaborator; out of scope per `spec.md` §1).
//!
//! Builds the AST described in §3.2 directly out of a token stream,
//! using ordinary precedence climbing for binary operators rather than
//! generating LALR tables (`spec.md` explicitly defers table generation
//! to a real parser generator; recursive descent is the common choice
//! among the retrieved pack's own hand-rolled frontends for a grammar
//! this size).

use crate::{
    ast::{
        Ast, ChoiceDefinition, DeclaredType, Expr, ExprId, FieldId, FunctionDefinition, Initialization, MatchClause,
        Pattern, PatternId, ReturnTypeForm, SimpleBinding, Statement, StmtId, StructDefinition, StructMember,
        TopLevel, Tuple, TupleField, UnaryOperator, Alternative, BinaryOperator,
    },
    diagnostics::Diagnostics,
    intern::{Interner, Symbol},
    scan::{Scanner, Token, TokenKind},
    span::{FileId, SourceRegion},
};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    interner: &'a mut Interner,
    diags: &'a mut Diagnostics,
    file: FileId,
}

/// Scans and parses `text` (from `file`) into an [`Ast`]. Accumulates
/// every scan and parse error into `diags` rather than stopping at the
/// first one.
pub fn parse(text: &str, file: FileId, interner: &mut Interner, diags: &mut Diagnostics) -> Ast {
    let tokens = Scanner::new(text, file).scan(interner, diags);
    let mut parser = Parser { tokens, pos: 0, ast: Ast::new(), interner, diags, file };
    parser.parse_program();
    parser.ast
}

impl<'a> Parser<'a> {
    fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_site(&self) -> SourceRegion {
        self.tokens[self.pos].site
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos];
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> SourceRegion {
        let site = self.peek_site();
        if !self.eat(kind) {
            self.diags.error(format!("expected {what}, found {}", self.peek().as_ref()), site);
        }
        site
    }

    fn expect_ident(&mut self, what: &str) -> (Symbol, SourceRegion) {
        let site = self.peek_site();
        if let TokenKind::Ident(sym) = self.peek() {
            self.bump();
            (sym, site)
        } else {
            self.diags.error(format!("expected {what}, found {}", self.peek().as_ref()), site);
            (self.interner.intern("<error>"), site)
        }
    }

    /// Skips forward to the next top-level declaration keyword or `;`,
    /// used after a malformed declaration so later ones can still parse.
    fn recover_to_decl_boundary(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::Fn | TokenKind::Struct | TokenKind::Choice | TokenKind::Var => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ---- top level ---------------------------------------------------

    fn parse_program(&mut self) {
        while !self.at_end() {
            match self.peek() {
                TokenKind::Fn => {
                    let id = self.parse_fn_decl();
                    self.ast.top_level.push(TopLevel::Function(id));
                }
                TokenKind::Struct => {
                    let id = self.parse_struct_decl();
                    self.ast.top_level.push(TopLevel::Struct(id));
                }
                TokenKind::Choice => {
                    let id = self.parse_choice_decl();
                    self.ast.top_level.push(TopLevel::Choice(id));
                }
                TokenKind::Var => {
                    let id = self.parse_init_decl();
                    self.ast.top_level.push(TopLevel::Initialization(id));
                }
                _ => {
                    self.diags.error("expected a top-level declaration (`fn`, `struct`, `choice`, or `var`)", self.peek_site());
                    self.recover_to_decl_boundary();
                }
            }
        }
    }

    fn parse_fn_decl(&mut self) -> crate::ast::FunctionId {
        let start = self.peek_site();
        self.expect(TokenKind::Fn, "`fn`");
        let (name, _) = self.expect_ident("a function name");
        self.expect(TokenKind::LParen, "`(`");
        let params = self.parse_pattern_list(TokenKind::RParen);
        self.expect(TokenKind::RParen, "`)`");

        let return_type = if self.eat(TokenKind::Arrow) {
            if self.eat(TokenKind::Auto) {
                ReturnTypeForm::Auto
            } else {
                ReturnTypeForm::Expression(self.parse_expr())
            }
        } else {
            ReturnTypeForm::Auto
        };

        let (body, end) = if self.eat(TokenKind::FatArrow) {
            let e = self.parse_expr();
            let site = self.peek_site();
            self.expect(TokenKind::Semicolon, "`;`");
            (Some(self.ast.alloc_stmt(Statement::Return(Some(e)), site)), site)
        } else if self.check(TokenKind::LBrace) {
            let b = self.parse_block();
            let site = self.ast.stmt(b).site;
            (Some(b), site)
        } else {
            let site = self.peek_site();
            self.expect(TokenKind::Semicolon, "`;`, `=>`, or `{`");
            (None, site)
        };

        let site = start.union(&end);
        self.ast.alloc_function(FunctionDefinition { name, site, params, return_type, body })
    }

    fn parse_struct_decl(&mut self) -> crate::ast::StructId {
        let start = self.peek_site();
        self.expect(TokenKind::Struct, "`struct`");
        let (name, _) = self.expect_ident("a struct name");
        self.expect(TokenKind::LBrace, "`{`");
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let member_site = self.peek_site();
            self.expect(TokenKind::Var, "`var`");
            let (mname, _) = self.expect_ident("a member name");
            self.expect(TokenKind::Colon, "`:`");
            let type_expr = self.parse_expr();
            self.expect(TokenKind::Semicolon, "`;`");
            members.push(StructMember { name: mname, type_expr, site: member_site });
        }
        let end = self.expect(TokenKind::RBrace, "`}`");
        self.ast.alloc_struct(StructDefinition { name, site: start.union(&end), members })
    }

    fn parse_choice_decl(&mut self) -> crate::ast::ChoiceId {
        let start = self.peek_site();
        self.expect(TokenKind::Choice, "`choice`");
        let (name, _) = self.expect_ident("a choice name");
        self.expect(TokenKind::LBrace, "`{`");
        let mut alternatives = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let alt_site = self.peek_site();
            let (aname, _) = self.expect_ident("an alternative name");
            let payload = if self.eat(TokenKind::LParen) {
                let fields = self.parse_expr_list(TokenKind::RParen);
                self.expect(TokenKind::RParen, "`)`");
                fields
            } else {
                Tuple::empty()
            };
            alternatives.push(Alternative { name: aname, payload, site: alt_site });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace, "`}`");
        self.ast.alloc_choice(ChoiceDefinition { name, site: start.union(&end), alternatives })
    }

    fn parse_init_decl(&mut self) -> crate::ast::InitId {
        let start = self.peek_site();
        self.expect(TokenKind::Var, "`var`");
        let pattern = self.parse_pattern();
        self.expect(TokenKind::Equals, "`=`");
        let initializer = self.parse_expr();
        let end = self.expect(TokenKind::Semicolon, "`;`");
        self.ast.alloc_init(Initialization { pattern, initializer, site: start.union(&end) })
    }

    // ---- statements ----------------------------------------------------

    fn parse_block(&mut self) -> StmtId {
        let start = self.peek_site();
        self.expect(TokenKind::LBrace, "`{`");
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            stmts.push(self.parse_stmt());
        }
        let end = self.expect(TokenKind::RBrace, "`}`");
        self.ast.alloc_stmt(Statement::Block(stmts), start.union(&end))
    }

    fn parse_stmt(&mut self) -> StmtId {
        let start = self.peek_site();
        match self.peek() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Var => {
                let id = self.parse_init_decl();
                let site = self.ast.init(id).site;
                self.ast.alloc_stmt(Statement::Init(id), site)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Break => {
                self.bump();
                let end = self.expect(TokenKind::Semicolon, "`;`");
                self.ast.alloc_stmt(Statement::Break, start.union(&end))
            }
            TokenKind::Continue => {
                self.bump();
                let end = self.expect(TokenKind::Semicolon, "`;`");
                self.ast.alloc_stmt(Statement::Continue, start.union(&end))
            }
            TokenKind::Return => {
                self.bump();
                let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()) };
                let end = self.expect(TokenKind::Semicolon, "`;`");
                self.ast.alloc_stmt(Statement::Return(value), start.union(&end))
            }
            _ => self.parse_expr_or_assign_stmt(),
        }
    }

    fn parse_if(&mut self) -> StmtId {
        let start = self.peek_site();
        self.expect(TokenKind::If, "`if`");
        self.expect(TokenKind::LParen, "`(`");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        let then_branch = self.parse_stmt();
        let else_branch = if self.eat(TokenKind::Else) { Some(self.parse_stmt()) } else { None };
        let end_site = self.ast.stmt(else_branch.unwrap_or(then_branch)).site;
        self.ast.alloc_stmt(Statement::If { cond, then_branch, else_branch }, start.union(&end_site))
    }

    fn parse_while(&mut self) -> StmtId {
        let start = self.peek_site();
        self.expect(TokenKind::While, "`while`");
        self.expect(TokenKind::LParen, "`(`");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        let body = self.parse_stmt();
        let end_site = self.ast.stmt(body).site;
        self.ast.alloc_stmt(Statement::While { cond, body }, start.union(&end_site))
    }

    fn parse_match(&mut self) -> StmtId {
        let start = self.peek_site();
        self.expect(TokenKind::Match, "`match`");
        self.expect(TokenKind::LParen, "`(`");
        let subject = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        self.expect(TokenKind::LBrace, "`{`");
        let mut clauses = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let pattern = if self.eat(TokenKind::Default) {
                None
            } else {
                self.expect(TokenKind::Case, "`case` or `default`");
                Some(self.parse_pattern())
            };
            self.expect(TokenKind::FatArrow, "`=>`");
            let body = self.parse_stmt();
            clauses.push(MatchClause { pattern, body });
        }
        let end = self.expect(TokenKind::RBrace, "`}`");
        self.ast.alloc_stmt(Statement::Match { subject, clauses }, start.union(&end))
    }

    fn parse_expr_or_assign_stmt(&mut self) -> StmtId {
        let start = self.peek_site();
        let target = self.parse_expr();
        if self.eat(TokenKind::Equals) {
            let source = self.parse_expr();
            let end = self.expect(TokenKind::Semicolon, "`;`");
            self.ast.alloc_stmt(Statement::Assign { target, source }, start.union(&end))
        } else {
            let end = self.expect(TokenKind::Semicolon, "`;`");
            self.ast.alloc_stmt(Statement::ExprStmt(target), start.union(&end))
        }
    }

    // ---- expressions: precedence climbing ------------------------------
    //
    // or < and < equality < additive < unary < postfix < primary

    fn parse_expr(&mut self) -> ExprId {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ExprId {
        let mut lhs = self.parse_and();
        while self.eat(TokenKind::Or) {
            let rhs = self.parse_and();
            let site = self.ast.expr(lhs).site.union(&self.ast.expr(rhs).site);
            lhs = self.ast.alloc_expr(Expr::BinaryOp { op: BinaryOperator::Or, lhs, rhs }, site);
        }
        lhs
    }

    fn parse_and(&mut self) -> ExprId {
        let mut lhs = self.parse_equality();
        while self.eat(TokenKind::And) {
            let rhs = self.parse_equality();
            let site = self.ast.expr(lhs).site.union(&self.ast.expr(rhs).site);
            lhs = self.ast.alloc_expr(Expr::BinaryOp { op: BinaryOperator::And, lhs, rhs }, site);
        }
        lhs
    }

    fn parse_equality(&mut self) -> ExprId {
        let mut lhs = self.parse_additive();
        while self.eat(TokenKind::EqualsEquals) {
            let rhs = self.parse_additive();
            let site = self.ast.expr(lhs).site.union(&self.ast.expr(rhs).site);
            lhs = self.ast.alloc_expr(Expr::BinaryOp { op: BinaryOperator::Equals, lhs, rhs }, site);
        }
        lhs
    }

    fn parse_additive(&mut self) -> ExprId {
        let mut lhs = self.parse_unary();
        loop {
            let op = if self.eat(TokenKind::Plus) {
                BinaryOperator::Add
            } else if self.eat(TokenKind::Minus) {
                BinaryOperator::Subtract
            } else {
                break;
            };
            let rhs = self.parse_unary();
            let site = self.ast.expr(lhs).site.union(&self.ast.expr(rhs).site);
            lhs = self.ast.alloc_expr(Expr::BinaryOp { op, lhs, rhs }, site);
        }
        lhs
    }

    fn parse_unary(&mut self) -> ExprId {
        let start = self.peek_site();
        if self.eat(TokenKind::Minus) {
            let operand = self.parse_unary();
            let site = start.union(&self.ast.expr(operand).site);
            return self.ast.alloc_expr(Expr::UnaryOp { op: UnaryOperator::Negate, operand }, site);
        }
        if self.eat(TokenKind::Not) {
            let operand = self.parse_unary();
            let site = start.union(&self.ast.expr(operand).site);
            return self.ast.alloc_expr(Expr::UnaryOp { op: UnaryOperator::Not, operand }, site);
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ExprId {
        let mut expr = self.parse_primary();
        loop {
            let start = self.ast.expr(expr).site;
            match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let (member, member_site) = self.expect_ident("a member name");
                    let site = start.union(&member_site);
                    expr = self.ast.alloc_expr(Expr::MemberAccess { base: expr, member }, site);
                }
                TokenKind::LBracket => {
                    self.bump();
                    let offset = self.parse_expr();
                    let end = self.expect(TokenKind::RBracket, "`]`");
                    let site = start.union(&end);
                    expr = self.ast.alloc_expr(Expr::Index { target: expr, offset }, site);
                }
                TokenKind::LParen => {
                    self.bump();
                    let args = self.parse_expr_list(TokenKind::RParen);
                    let end = self.expect(TokenKind::RParen, "`)`");
                    let site = start.union(&end);
                    expr = self.ast.alloc_expr(Expr::Call { callee: expr, args }, site);
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> ExprId {
        let site = self.peek_site();
        match self.peek() {
            TokenKind::IntLiteral(n) => {
                self.bump();
                self.ast.alloc_expr(Expr::IntLit(n), site)
            }
            TokenKind::True => {
                self.bump();
                self.ast.alloc_expr(Expr::BoolLit(true), site)
            }
            TokenKind::False => {
                self.bump();
                self.ast.alloc_expr(Expr::BoolLit(false), site)
            }
            TokenKind::IntKw => {
                self.bump();
                self.ast.alloc_expr(Expr::IntType, site)
            }
            TokenKind::BoolKw => {
                self.bump();
                self.ast.alloc_expr(Expr::BoolType, site)
            }
            TokenKind::TypeKw => {
                self.bump();
                self.ast.alloc_expr(Expr::TypeType, site)
            }
            TokenKind::Ident(sym) => {
                self.bump();
                self.ast.alloc_expr(Expr::Name(sym), site)
            }
            TokenKind::LParen => {
                self.bump();
                let fields = self.parse_expr_list(TokenKind::RParen);
                let end = self.expect(TokenKind::RParen, "`)`");
                let full_site = site.union(&end);
                // A single, unlabeled field with no trailing comma is a
                // parenthesized expression, not a one-element tuple.
                if fields.len() == 1 && matches!(fields.fields[0].id, FieldId::Position(0)) {
                    fields.fields.into_iter().next().unwrap().value
                } else {
                    self.ast.alloc_expr(Expr::TupleLit(fields), full_site)
                }
            }
            TokenKind::Fn => {
                self.bump();
                self.expect(TokenKind::LParen, "`(`");
                let params = self.parse_pattern_list(TokenKind::RParen);
                let end_params = self.expect(TokenKind::RParen, "`)`");
                self.expect(TokenKind::Arrow, "`->`");
                let return_type = self.parse_pattern();
                let end = self.ast.pattern(return_type).site;
                let _ = end_params;
                self.ast.alloc_expr(Expr::FunctionType { params, return_type }, site.union(&end))
            }
            _ => {
                self.diags.error("expected an expression", site);
                self.ast.alloc_expr(Expr::TupleLit(Tuple::empty()), site)
            }
        }
    }

    /// Parses a labeled-or-positional expression field list: `.label =
    /// expr` for a labeled field, a bare `expr` for a positional one,
    /// used for both tuple literals and call argument lists.
    fn parse_expr_list(&mut self, close: TokenKind) -> Tuple<ExprId> {
        let mut fields = Vec::new();
        let mut next_position = 0u32;
        while !self.check(close) && !self.at_end() {
            if self.eat(TokenKind::Dot) {
                let (label, _) = self.expect_ident("a field label");
                self.expect(TokenKind::Equals, "`=`");
                let value = self.parse_expr();
                fields.push(TupleField { id: FieldId::Label(label), value });
            } else {
                let value = self.parse_expr();
                fields.push(TupleField { id: FieldId::Position(next_position), value });
                next_position += 1;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Tuple::new(fields)
    }

    /// Parses a labeled-or-positional pattern field list, used for
    /// function parameter lists, tuple patterns, and match-clause call
    /// patterns.
    fn parse_pattern_list(&mut self, close: TokenKind) -> Tuple<PatternId> {
        let mut fields = Vec::new();
        let mut next_position = 0u32;
        while !self.check(close) && !self.at_end() {
            if self.eat(TokenKind::Dot) {
                let (label, _) = self.expect_ident("a field label");
                self.expect(TokenKind::Equals, "`=`");
                let value = self.parse_pattern();
                fields.push(TupleField { id: FieldId::Label(label), value });
            } else {
                let value = self.parse_pattern();
                fields.push(TupleField { id: FieldId::Position(next_position), value });
                next_position += 1;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Tuple::new(fields)
    }

    fn parse_pattern(&mut self) -> PatternId {
        let site = self.peek_site();
        match self.peek() {
            TokenKind::LParen => {
                self.bump();
                let fields = self.parse_pattern_list(TokenKind::RParen);
                let end = self.expect(TokenKind::RParen, "`)`");
                self.ast.alloc_pattern(Pattern::Tuple(fields), site.union(&end))
            }
            TokenKind::Fn => {
                self.bump();
                self.expect(TokenKind::LParen, "`(`");
                let params = self.parse_pattern_list(TokenKind::RParen);
                self.expect(TokenKind::RParen, "`)`");
                self.expect(TokenKind::Arrow, "`->`");
                let return_type = self.parse_pattern();
                let end = self.ast.pattern(return_type).site;
                self.ast.alloc_pattern(Pattern::FunctionType { params, return_type }, site.union(&end))
            }
            TokenKind::Ident(sym) => {
                // A bare identifier followed by `:` introduces a binding;
                // followed by `.` or `(` it is a callee path (struct or
                // choice-alternative pattern); otherwise it is a value
                // reference used as an `Atom` pattern.
                if matches!(self.tokens.get(self.pos + 1).map(|t| t.kind), Some(TokenKind::Colon)) {
                    self.bump();
                    self.bump();
                    let declared_type = if self.eat(TokenKind::Auto) {
                        DeclaredType::Auto(self.peek_site())
                    } else {
                        DeclaredType::Expression(self.parse_expr())
                    };
                    let binding = SimpleBinding { name: sym, declared_type };
                    return self.ast.alloc_pattern(Pattern::Variable(binding), site);
                }
                let callee = self.parse_callee_path();
                if self.check(TokenKind::LParen) {
                    self.bump();
                    let args = self.parse_pattern_list(TokenKind::RParen);
                    let end = self.expect(TokenKind::RParen, "`)`");
                    self.ast.alloc_pattern(Pattern::Call { callee, args }, site.union(&end))
                } else {
                    let end = self.ast.expr(callee).site;
                    self.ast.alloc_pattern(Pattern::Atom(callee), site.union(&end))
                }
            }
            _ => {
                let expr = self.parse_expr();
                let end = self.ast.expr(expr).site;
                self.ast.alloc_pattern(Pattern::Atom(expr), site.union(&end))
            }
        }
    }

    /// A `Name` possibly followed by one or more `.member` accesses,
    /// used as the callee position of a pattern (`Ints.One`, a bare
    /// struct name, or a plain binding name).
    fn parse_callee_path(&mut self) -> ExprId {
        let site = self.peek_site();
        let (sym, _) = self.expect_ident("a name");
        let mut expr = self.ast.alloc_expr(Expr::Name(sym), site);
        while self.check(TokenKind::Dot) {
            self.bump();
            let (member, member_site) = self.expect_ident("a member name");
            let full_site = self.ast.expr(expr).site.union(&member_site);
            expr = self.ast.alloc_expr(Expr::MemberAccess { base: expr, member }, full_site);
        }
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileTable;

    fn parse_ok(src: &str) -> (Ast, Interner) {
        let mut files = FileTable::new();
        let file = files.intern("t.carbon");
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let ast = parse(src, file, &mut interner, &mut diags);
        assert!(diags.is_empty(), "{diags}");
        (ast, interner)
    }

    #[test]
    fn parses_minimal_main() {
        let (ast, _) = parse_ok("fn main() -> Int { return 0; }");
        assert_eq!(ast.top_level.len(), 1);
        let TopLevel::Function(id) = ast.top_level[0] else { panic!() };
        let f = ast.function(id);
        assert!(matches!(f.return_type, ReturnTypeForm::Expression(_)));
        assert!(f.body.is_some());
    }

    #[test]
    fn parses_struct_and_initializer_call() {
        let (ast, interner) = parse_ok(
            "struct X { var a: Int; var b: Int; } fn main() -> Int { var v: X = X(.a = 3, .b = 4); return v.a + v.b; }",
        );
        assert_eq!(ast.top_level.len(), 2);
        let a = interner.get("a").unwrap();
        let TopLevel::Struct(id) = ast.top_level[0] else { panic!() };
        assert_eq!(ast.strukt(id).members.len(), 2);
        assert_eq!(ast.strukt(id).members[0].name, a);
    }

    #[test]
    fn parses_choice_and_match() {
        let (ast, _) = parse_ok(
            "choice Ints { None, One(Int) } fn main() -> Int { var y: auto = Ints.One(42); match (y) { case Ints.One(n: auto) => return n; default => return -1; } }",
        );
        let TopLevel::Choice(id) = ast.top_level[0] else { panic!() };
        assert_eq!(ast.choice(id).alternatives.len(), 2);
    }

    #[test]
    fn parenthesized_single_expr_is_not_a_tuple() {
        let (ast, _) = parse_ok("fn f() => (1 + 2);");
        let TopLevel::Function(id) = ast.top_level[0] else { panic!() };
        let Some(body) = ast.function(id).body else { panic!() };
        let Statement::Return(Some(e)) = ast.stmt(body).kind else { panic!() };
        assert!(matches!(ast.expr(e).kind, Expr::BinaryOp { .. }));
    }

    #[test]
    fn empty_parens_is_unit_tuple() {
        let (ast, _) = parse_ok("fn f() => ();");
        let TopLevel::Function(id) = ast.top_level[0] else { panic!() };
        let Some(body) = ast.function(id).body else { panic!() };
        let Statement::Return(Some(e)) = ast.stmt(body).kind else { panic!() };
        assert!(matches!(&ast.expr(e).kind, Expr::TupleLit(t) if t.is_empty()));
    }

    #[test]
    fn reports_error_and_recovers_to_next_decl() {
        let mut files = FileTable::new();
        let file = files.intern("t.carbon");
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let ast = parse("fn f() -> Int { @@@ } fn g() -> Int { return 1; }", file, &mut interner, &mut diags);
        assert!(!diags.is_empty());
        assert_eq!(ast.top_level.len(), 2);
    }
}
