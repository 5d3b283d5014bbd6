//! Recursive-descent parser for method sources, so tests can state their
//! inputs as text.

use crate::lexer::{Lexer, Token, TokenKind};
use bumpalo::Bump;
use proxygen_core::ast::{
    AssignOp, AssignStatement, AstBuilder, BinaryOp, Block, CompositeElement, Expression,
    ExpressionKind, ForStatement, FuncDecl, IfStatement, IncDecStatement, Literal, Param,
    RangeStatement, Span, Statement, SwitchCase, SwitchStatement, TypeExpr, TypeParam, UnaryOp,
    VarStatement,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{span}: {message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// Parses every function and method declared in `source`, in order.
pub fn parse_methods<'a>(source: &str, arena: &'a Bump) -> Result<Vec<&'a FuncDecl<'a>>, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens, arena).parse_file()
}

/// Parses a source holding exactly one function or method.
pub fn parse_method<'a>(source: &str, arena: &'a Bump) -> Result<&'a FuncDecl<'a>, ParseError> {
    match parse_methods(source, arena)?.as_slice() {
        [method] => Ok(*method),
        other => Err(ParseError::new(
            Span::dummy(),
            format!("expected one declaration, found {}", other.len()),
        )),
    }
}

fn binary_op(punct: &str) -> Option<BinaryOp> {
    let op = match punct {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Subtract,
        "*" => BinaryOp::Multiply,
        "/" => BinaryOp::Divide,
        "%" => BinaryOp::Modulo,
        "&" => BinaryOp::BitwiseAnd,
        "|" => BinaryOp::BitwiseOr,
        "^" => BinaryOp::BitwiseXor,
        "&^" => BinaryOp::BitClear,
        "<<" => BinaryOp::ShiftLeft,
        ">>" => BinaryOp::ShiftRight,
        "==" => BinaryOp::Equal,
        "!=" => BinaryOp::NotEqual,
        "<" => BinaryOp::LessThan,
        "<=" => BinaryOp::LessThanOrEqual,
        ">" => BinaryOp::GreaterThan,
        ">=" => BinaryOp::GreaterThanOrEqual,
        "&&" => BinaryOp::And,
        "||" => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

fn assign_op(punct: &str) -> Option<AssignOp> {
    let op = match punct {
        "=" => AssignOp::Assign,
        ":=" => AssignOp::Define,
        _ => {
            let op = binary_op(punct.strip_suffix('=')?)?;
            if op.is_comparison() || op.is_logical() {
                return None;
            }
            AssignOp::Compound(op)
        }
    };
    Some(op)
}

enum ForHeader<'a> {
    Range {
        key: Option<Expression<'a>>,
        value: Option<Expression<'a>>,
        define: bool,
        iterable: Expression<'a>,
    },
    Clauses {
        init: Option<Statement<'a>>,
        condition: Option<Expression<'a>>,
        post: Option<Statement<'a>>,
    },
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    b: AstBuilder<'a>,
    /// Set while parsing `if`/`for`/`switch` headers, where `T {` opens
    /// the body rather than a composite literal.
    no_composite: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, arena: &'a Bump) -> Self {
        Self {
            tokens,
            pos: 0,
            b: AstBuilder::new(arena),
            no_composite: false,
        }
    }

    // Token helpers

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn at_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if *p == punct)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == keyword)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ParseError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", punct)))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.at_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", keyword)))
        }
    }

    fn expect_ident(&mut self) -> Result<&'a str, ParseError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.pos += 1;
                Ok(self.b.str(&name))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            self.span(),
            format!("expected {}, found {:?}", expected, self.peek()),
        )
    }

    fn skip_semicolons(&mut self) {
        while self.eat_punct(";") {}
    }

    fn with_composites<T>(
        &mut self,
        allowed: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.no_composite;
        self.no_composite = !allowed;
        let result = f(self);
        self.no_composite = saved;
        result
    }

    // Declarations

    pub fn parse_file(&mut self) -> Result<Vec<&'a FuncDecl<'a>>, ParseError> {
        let mut funcs = Vec::new();
        loop {
            self.skip_semicolons();
            if matches!(self.peek(), TokenKind::Eof) {
                return Ok(funcs);
            }
            funcs.push(self.parse_func()?);
        }
    }

    fn parse_func(&mut self) -> Result<&'a FuncDecl<'a>, ParseError> {
        let span = self.span();
        self.expect_keyword("func")?;

        let receiver = if self.eat_punct("(") {
            let name = self.expect_ident()?;
            let ty = self.parse_type()?;
            self.expect_punct(")")?;
            Some(Param { name, ty })
        } else {
            None
        };
        let name = self.expect_ident()?;

        let mut type_params = Vec::new();
        if self.eat_punct("[") {
            while !self.eat_punct("]") {
                let name = self.expect_ident()?;
                let constraint = self.parse_type()?;
                type_params.push(TypeParam { name, constraint });
                self.eat_punct(",");
            }
        }

        self.expect_punct("(")?;
        let params = self.parse_params()?;
        let results = self.parse_results()?;
        let body = self.parse_block()?;

        let arena = self.b.arena();
        Ok(arena.alloc(FuncDecl {
            doc: None,
            receiver,
            name,
            type_params: arena.alloc_slice_copy(&type_params),
            params: arena.alloc_slice_copy(&params),
            results: arena.alloc_slice_copy(&results),
            body,
            span,
        }))
    }

    /// `a, b int, c string)`; a name without a type takes the next type.
    fn parse_params(&mut self) -> Result<Vec<Param<'a>>, ParseError> {
        let mut entries: Vec<(&'a str, Option<&'a TypeExpr<'a>>)> = Vec::new();
        while !self.eat_punct(")") {
            let name = self.expect_ident()?;
            let ty = if self.at_punct(",") || self.at_punct(")") {
                None
            } else {
                Some(self.parse_type()?)
            };
            entries.push((name, ty));
            self.eat_punct(",");
        }

        let mut params = Vec::with_capacity(entries.len());
        let mut next_ty = None;
        for (name, ty) in entries.into_iter().rev() {
            let ty = ty.or(next_ty).ok_or_else(|| {
                ParseError::new(self.span(), format!("parameter `{}` has no type", name))
            })?;
            next_ty = Some(ty);
            params.push(Param { name, ty });
        }
        params.reverse();
        Ok(params)
    }

    fn parse_results(&mut self) -> Result<Vec<TypeExpr<'a>>, ParseError> {
        if self.at_punct("{") {
            return Ok(Vec::new());
        }
        if self.eat_punct("(") {
            let mut results = Vec::new();
            while !self.eat_punct(")") {
                results.push(*self.parse_type()?);
                self.eat_punct(",");
            }
            return Ok(results);
        }
        Ok(vec![*self.parse_type()?])
    }

    fn parse_type(&mut self) -> Result<&'a TypeExpr<'a>, ParseError> {
        let arena = self.b.arena();
        if self.eat_punct("*") {
            return Ok(arena.alloc(TypeExpr::Pointer(self.parse_type()?)));
        }
        if self.eat_punct("~") {
            return Ok(arena.alloc(TypeExpr::Approx(self.parse_type()?)));
        }
        if self.eat_punct("[") {
            self.expect_punct("]")?;
            return Ok(arena.alloc(TypeExpr::Slice(self.parse_type()?)));
        }
        if self.at_keyword("map") {
            self.pos += 1;
            self.expect_punct("[")?;
            let key = self.parse_type()?;
            self.expect_punct("]")?;
            let value = self.parse_type()?;
            return Ok(arena.alloc(TypeExpr::Map(key, value)));
        }
        let mut name = self.expect_ident()?.to_string();
        if self.at_punct(".") && matches!(self.peek_at(1), TokenKind::Ident(_)) {
            self.pos += 1;
            name.push('.');
            name.push_str(self.expect_ident()?);
        }
        Ok(self.b.named(&name))
    }

    // Statements

    fn parse_block(&mut self) -> Result<Block<'a>, ParseError> {
        let span = self.span();
        self.expect_punct("{")?;
        let statements = self.with_composites(true, |p| p.parse_statement_list())?;
        self.expect_punct("}")?;
        Ok(Block {
            statements: self.b.arena().alloc_slice_copy(&statements),
            span,
        })
    }

    /// Statements up to `}`, `case` or `default`.
    fn parse_statement_list(&mut self) -> Result<Vec<Statement<'a>>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at_punct("}") || self.at_keyword("case") || self.at_keyword("default") {
                return Ok(statements);
            }
            if matches!(self.peek(), TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            statements.push(self.parse_statement()?);
            if !self.at_punct("}") && !self.eat_punct(";") {
                return Err(self.unexpected("`;` or a newline"));
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement<'a>, ParseError> {
        let span = self.span();
        match self.peek().clone() {
            TokenKind::Keyword("var") => self.parse_var(),
            TokenKind::Keyword("if") => self.parse_if(),
            TokenKind::Keyword("for") => self.parse_for(),
            TokenKind::Keyword("switch") => self.parse_switch(),
            TokenKind::Keyword("return") => {
                self.pos += 1;
                let values = if self.at_punct(";") || self.at_punct("}") {
                    Vec::new()
                } else {
                    self.parse_expression_list()?
                };
                Ok(Statement::Return(self.b.arena().alloc_slice_copy(&values), span))
            }
            TokenKind::Keyword("break") => {
                self.pos += 1;
                Ok(Statement::Break(span))
            }
            TokenKind::Keyword("continue") => {
                self.pos += 1;
                Ok(Statement::Continue(span))
            }
            TokenKind::Punct("{") => Ok(Statement::Block(self.parse_block()?)),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_var(&mut self) -> Result<Statement<'a>, ParseError> {
        let span = self.span();
        self.expect_keyword("var")?;
        let mut names = vec![self.expect_ident()?];
        while self.eat_punct(",") {
            names.push(self.expect_ident()?);
        }
        let ty = if self.at_punct("=") || self.at_punct(";") {
            None
        } else {
            Some(self.parse_type()?)
        };
        let values = if self.eat_punct("=") {
            self.parse_expression_list()?
        } else {
            Vec::new()
        };
        let arena = self.b.arena();
        Ok(Statement::Var(arena.alloc(VarStatement {
            names: arena.alloc_slice_copy(&names),
            ty,
            values: arena.alloc_slice_copy(&values),
            span,
        })))
    }

    fn parse_simple_statement(&mut self) -> Result<Statement<'a>, ParseError> {
        let span = self.span();
        let targets = self.parse_expression_list()?;
        self.finish_simple_statement(targets, span)
    }

    fn finish_simple_statement(
        &mut self,
        targets: Vec<Expression<'a>>,
        span: Span,
    ) -> Result<Statement<'a>, ParseError> {
        let arena = self.b.arena();
        if let TokenKind::Punct(punct) = self.peek().clone() {
            if punct == "++" || punct == "--" {
                self.pos += 1;
                let [target] = targets.as_slice() else {
                    return Err(ParseError::new(span, "`++`/`--` takes one operand"));
                };
                return Ok(Statement::IncDec(arena.alloc(IncDecStatement {
                    target: *target,
                    increment: punct == "++",
                    span,
                })));
            }
            if let Some(op) = assign_op(punct) {
                self.pos += 1;
                let values = self.parse_expression_list()?;
                return Ok(Statement::Assign(arena.alloc(AssignStatement {
                    targets: arena.alloc_slice_copy(&targets),
                    op,
                    values: arena.alloc_slice_copy(&values),
                    span,
                })));
            }
        }
        match targets.as_slice() {
            [expr] => Ok(Statement::Expression(*expr)),
            _ => Err(ParseError::new(span, "expected an assignment")),
        }
    }

    /// The part of a header before `{` or `;`: an optional init statement
    /// followed by an optional expression.
    fn parse_header(&mut self) -> Result<(Option<Statement<'a>>, Option<Expression<'a>>), ParseError> {
        if self.at_punct("{") {
            return Ok((None, None));
        }
        let first = if self.at_punct(";") {
            None
        } else {
            Some(self.parse_simple_statement()?)
        };
        if self.eat_punct(";") {
            let expr = if self.at_punct("{") {
                None
            } else {
                Some(self.parse_expression()?)
            };
            return Ok((first, expr));
        }
        match first {
            Some(Statement::Expression(expr)) => Ok((None, Some(expr))),
            _ => Err(self.unexpected("a condition")),
        }
    }

    fn parse_if(&mut self) -> Result<Statement<'a>, ParseError> {
        let span = self.span();
        self.expect_keyword("if")?;
        let (init, condition) = self.with_composites(false, |p| p.parse_header())?;
        let condition = condition.ok_or_else(|| ParseError::new(span, "missing condition"))?;
        let then_block = self.parse_block()?;
        let else_branch = if self.at_keyword("else") {
            self.pos += 1;
            if self.at_keyword("if") {
                Some(self.parse_if()?)
            } else {
                Some(Statement::Block(self.parse_block()?))
            }
        } else {
            None
        };
        Ok(Statement::If(self.b.arena().alloc(IfStatement {
            init,
            condition,
            then_block,
            else_branch,
            span,
        })))
    }

    fn parse_for(&mut self) -> Result<Statement<'a>, ParseError> {
        let span = self.span();
        self.expect_keyword("for")?;
        let header = self.with_composites(false, |p| p.parse_for_header())?;
        let body = self.parse_block()?;

        let arena = self.b.arena();
        let statement = match header {
            ForHeader::Range {
                key,
                value,
                define,
                iterable,
            } => Statement::Range(arena.alloc(RangeStatement {
                key,
                value,
                define,
                iterable,
                body,
                span,
            })),
            ForHeader::Clauses {
                init,
                condition,
                post,
            } => Statement::For(arena.alloc(ForStatement {
                init,
                condition,
                post,
                body,
                span,
            })),
        };
        Ok(statement)
    }

    fn parse_for_header(&mut self) -> Result<ForHeader<'a>, ParseError> {
        if self.at_punct("{") {
            return Ok(ForHeader::Clauses {
                init: None,
                condition: None,
                post: None,
            });
        }
        if self.at_keyword("range") {
            self.pos += 1;
            return Ok(ForHeader::Range {
                key: None,
                value: None,
                define: false,
                iterable: self.parse_expression()?,
            });
        }

        let first_span = self.span();
        let first = if self.at_punct(";") {
            Vec::new()
        } else {
            self.parse_expression_list()?
        };
        let range_op = (self.at_punct(":=") || self.at_punct("="))
            && matches!(self.peek_at(1), TokenKind::Keyword("range"));
        if range_op {
            let define = self.at_punct(":=");
            self.pos += 2;
            return Ok(ForHeader::Range {
                key: first.first().copied(),
                value: first.get(1).copied(),
                define,
                iterable: self.parse_expression()?,
            });
        }

        let first = if first.is_empty() {
            None
        } else {
            Some(self.finish_simple_statement(first, first_span)?)
        };
        if !self.eat_punct(";") {
            return match first {
                Some(Statement::Expression(expr)) => Ok(ForHeader::Clauses {
                    init: None,
                    condition: Some(expr),
                    post: None,
                }),
                _ => Err(self.unexpected("`;`")),
            };
        }
        let condition = if self.at_punct(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(";")?;
        let post = if self.at_punct("{") {
            None
        } else {
            Some(self.parse_simple_statement()?)
        };
        Ok(ForHeader::Clauses {
            init: first,
            condition,
            post,
        })
    }

    fn parse_switch(&mut self) -> Result<Statement<'a>, ParseError> {
        let span = self.span();
        self.expect_keyword("switch")?;
        let (init, tag) = self.with_composites(false, |p| p.parse_header())?;
        self.expect_punct("{")?;

        let mut cases = Vec::new();
        loop {
            self.skip_semicolons();
            if self.eat_punct("}") {
                break;
            }
            let case_span = self.span();
            let values = if self.at_keyword("default") {
                self.pos += 1;
                Vec::new()
            } else {
                self.expect_keyword("case")?;
                self.parse_expression_list()?
            };
            self.expect_punct(":")?;
            let body = self.with_composites(true, |p| p.parse_statement_list())?;
            let arena = self.b.arena();
            cases.push(SwitchCase {
                values: arena.alloc_slice_copy(&values),
                body: arena.alloc_slice_copy(&body),
                span: case_span,
            });
        }

        let arena = self.b.arena();
        Ok(Statement::Switch(arena.alloc(SwitchStatement {
            init,
            tag,
            cases: arena.alloc_slice_copy(&cases),
            span,
        })))
    }

    // Expressions

    fn parse_expression_list(&mut self) -> Result<Vec<Expression<'a>>, ParseError> {
        let mut exprs = vec![self.parse_expression()?];
        while self.eat_punct(",") {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    pub fn parse_expression(&mut self) -> Result<Expression<'a>, ParseError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression<'a>, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Punct(punct) => binary_op(punct),
                _ => None,
            };
            let Some(op) = op.filter(|op| op.precedence() >= min_precedence) else {
                return Ok(left);
            };
            let span = self.span();
            self.pos += 1;
            let right = self.parse_binary(op.precedence() + 1)?;
            left = self.b.at(span).binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression<'a>, ParseError> {
        let span = self.span();
        let op = match self.peek() {
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("-") => Some(UnaryOp::Negate),
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("^") => Some(UnaryOp::BitwiseNot),
            TokenKind::Punct("&") => Some(UnaryOp::AddressOf),
            TokenKind::Punct("*") => Some(UnaryOp::Deref),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(self.b.at(span).unary(op, operand))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression<'a>, ParseError> {
        let mut expr = self.parse_operand()?;
        loop {
            let span = self.span();
            let b = self.b.at(span);
            if self.eat_punct(".") {
                let member = self.expect_ident()?;
                expr = b.selector(expr, member);
            } else if self.eat_punct("(") {
                let args = self.with_composites(true, |p| {
                    let mut args = Vec::new();
                    while !p.eat_punct(")") {
                        args.push(p.parse_expression()?);
                        if !p.at_punct(")") {
                            p.expect_punct(",")?;
                        }
                    }
                    Ok(args)
                })?;
                expr = b.call(expr, &args);
            } else if self.eat_punct("[") {
                let index = self.with_composites(true, |p| p.parse_expression())?;
                self.expect_punct("]")?;
                expr = b.index(expr, index);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Expression<'a>, ParseError> {
        let span = self.span();
        let b = self.b.at(span);
        let literal = |kind| Ok(Expression::new(ExpressionKind::Literal(kind), span));
        match self.peek().clone() {
            TokenKind::Int(value) => {
                self.pos += 1;
                literal(Literal::Int(value))
            }
            TokenKind::Float(value) => {
                self.pos += 1;
                literal(Literal::Float(value))
            }
            TokenKind::Str(value) => {
                self.pos += 1;
                literal(Literal::String(b.str(&value)))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                match name.as_str() {
                    "true" => literal(Literal::Bool(true)),
                    "false" => literal(Literal::Bool(false)),
                    "nil" => literal(Literal::Nil),
                    _ if self.at_punct("{") && !self.no_composite => {
                        let ty = b.named(&name);
                        self.parse_composite(ty, span)
                    }
                    _ => Ok(b.ident(&name)),
                }
            }
            TokenKind::Punct("(") => {
                self.pos += 1;
                let inner = self.with_composites(true, |p| p.parse_expression())?;
                self.expect_punct(")")?;
                Ok(b.paren(inner))
            }
            TokenKind::Punct("[") | TokenKind::Keyword("map") => {
                let ty = self.parse_type()?;
                if self.at_punct("{") {
                    self.parse_composite(ty, span)
                } else {
                    Ok(b.type_operand(ty))
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_composite(
        &mut self,
        ty: &'a TypeExpr<'a>,
        span: Span,
    ) -> Result<Expression<'a>, ParseError> {
        self.expect_punct("{")?;
        let elements = self.with_composites(true, |p| {
            let mut elements = Vec::new();
            loop {
                p.skip_semicolons();
                if p.eat_punct("}") {
                    return Ok(elements);
                }
                let first = p.parse_expression()?;
                let element = if p.eat_punct(":") {
                    CompositeElement {
                        key: Some(first),
                        value: p.parse_expression()?,
                    }
                } else {
                    CompositeElement {
                        key: None,
                        value: first,
                    }
                };
                elements.push(element);
                if !p.eat_punct(",") {
                    p.skip_semicolons();
                    p.expect_punct("}")?;
                    return Ok(elements);
                }
            }
        })?;
        Ok(Expression::new(
            ExpressionKind::Composite(ty, self.b.arena().alloc_slice_copy(&elements)),
            span,
        ))
    }
}
