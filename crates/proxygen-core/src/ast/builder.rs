use super::expression::{
    BinaryOp, CallExpression, CompositeElement, Expression, ExpressionKind, Literal, UnaryOp,
};
use super::statement::{
    AssignOp, AssignStatement, Block, FuncDecl, IfStatement, Param, RangeStatement, Statement,
    TypeParam, VarStatement,
};
use super::types::TypeExpr;
use super::Span;
use bumpalo::Bump;

/// Small constructors for arena nodes. Every node built through one builder
/// carries the builder's span, so rewritten code keeps pointing at the
/// statement it came from.
#[derive(Clone, Copy)]
pub struct AstBuilder<'a> {
    arena: &'a Bump,
    span: Span,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            span: Span::dummy(),
        }
    }

    pub fn at(self, span: Span) -> Self {
        Self { span, ..self }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn str(&self, value: &str) -> &'a str {
        self.arena.alloc_str(value)
    }

    fn expr(&self, kind: ExpressionKind<'a>) -> Expression<'a> {
        Expression::new(kind, self.span)
    }

    fn boxed(&self, expr: Expression<'a>) -> &'a Expression<'a> {
        self.arena.alloc(expr)
    }

    // Types

    pub fn named(&self, name: &str) -> &'a TypeExpr<'a> {
        self.arena.alloc(TypeExpr::Named(self.str(name)))
    }

    pub fn pointer(&self, inner: &'a TypeExpr<'a>) -> &'a TypeExpr<'a> {
        self.arena.alloc(TypeExpr::Pointer(inner))
    }

    pub fn slice_of(&self, inner: &'a TypeExpr<'a>) -> &'a TypeExpr<'a> {
        self.arena.alloc(TypeExpr::Slice(inner))
    }

    pub fn map_of(&self, key: &'a TypeExpr<'a>, value: &'a TypeExpr<'a>) -> &'a TypeExpr<'a> {
        self.arena.alloc(TypeExpr::Map(key, value))
    }

    // Expressions

    pub fn ident(&self, name: &str) -> Expression<'a> {
        self.expr(ExpressionKind::Identifier(self.str(name)))
    }

    pub fn string(&self, value: &str) -> Expression<'a> {
        self.expr(ExpressionKind::Literal(Literal::String(self.str(value))))
    }

    pub fn int(&self, value: i64) -> Expression<'a> {
        self.expr(ExpressionKind::Literal(Literal::Int(value)))
    }

    pub fn nil(&self) -> Expression<'a> {
        self.expr(ExpressionKind::Literal(Literal::Nil))
    }

    pub fn selector(&self, base: Expression<'a>, member: &str) -> Expression<'a> {
        self.expr(ExpressionKind::Selector(self.boxed(base), self.str(member)))
    }

    pub fn call(&self, callee: Expression<'a>, args: &[Expression<'a>]) -> Expression<'a> {
        self.call_generic(callee, &[], args)
    }

    pub fn call_generic(
        &self,
        callee: Expression<'a>,
        type_args: &[TypeExpr<'a>],
        args: &[Expression<'a>],
    ) -> Expression<'a> {
        let call = self.arena.alloc(CallExpression {
            callee,
            type_args: self.arena.alloc_slice_copy(type_args),
            args: self.arena.alloc_slice_copy(args),
        });
        self.expr(ExpressionKind::Call(call))
    }

    /// `name(args)`
    pub fn call_fn(&self, name: &str, args: &[Expression<'a>]) -> Expression<'a> {
        self.call(self.ident(name), args)
    }

    /// `receiver.method(args)`
    pub fn method_call(
        &self,
        receiver: Expression<'a>,
        method: &str,
        args: &[Expression<'a>],
    ) -> Expression<'a> {
        self.call(self.selector(receiver, method), args)
    }

    pub fn index(&self, base: Expression<'a>, index: Expression<'a>) -> Expression<'a> {
        self.expr(ExpressionKind::Index(self.boxed(base), self.boxed(index)))
    }

    pub fn binary(
        &self,
        op: BinaryOp,
        left: Expression<'a>,
        right: Expression<'a>,
    ) -> Expression<'a> {
        self.expr(ExpressionKind::Binary(op, self.boxed(left), self.boxed(right)))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expression<'a>) -> Expression<'a> {
        self.expr(ExpressionKind::Unary(op, self.boxed(operand)))
    }

    pub fn paren(&self, inner: Expression<'a>) -> Expression<'a> {
        self.expr(ExpressionKind::Paren(self.boxed(inner)))
    }

    pub fn type_operand(&self, ty: &'a TypeExpr<'a>) -> Expression<'a> {
        self.expr(ExpressionKind::Type(ty))
    }

    /// `T{}` with positional elements.
    pub fn composite(&self, ty: &'a TypeExpr<'a>, values: &[Expression<'a>]) -> Expression<'a> {
        let elements: Vec<_> = values
            .iter()
            .map(|value| CompositeElement {
                key: None,
                value: *value,
            })
            .collect();
        self.expr(ExpressionKind::Composite(
            ty,
            self.arena.alloc_slice_copy(&elements),
        ))
    }

    /// `T{k: v, ...}`
    pub fn keyed_composite(
        &self,
        ty: &'a TypeExpr<'a>,
        entries: &[(Expression<'a>, Expression<'a>)],
    ) -> Expression<'a> {
        let elements: Vec<_> = entries
            .iter()
            .map(|(key, value)| CompositeElement {
                key: Some(*key),
                value: *value,
            })
            .collect();
        self.expr(ExpressionKind::Composite(
            ty,
            self.arena.alloc_slice_copy(&elements),
        ))
    }

    // Statements

    pub fn expr_stmt(&self, expr: Expression<'a>) -> Statement<'a> {
        Statement::Expression(expr)
    }

    pub fn assign_with(
        &self,
        targets: &[Expression<'a>],
        op: AssignOp,
        values: &[Expression<'a>],
    ) -> Statement<'a> {
        Statement::Assign(self.arena.alloc(AssignStatement {
            targets: self.arena.alloc_slice_copy(targets),
            op,
            values: self.arena.alloc_slice_copy(values),
            span: self.span,
        }))
    }

    pub fn assign(&self, targets: &[Expression<'a>], values: &[Expression<'a>]) -> Statement<'a> {
        self.assign_with(targets, AssignOp::Assign, values)
    }

    pub fn define(&self, targets: &[Expression<'a>], values: &[Expression<'a>]) -> Statement<'a> {
        self.assign_with(targets, AssignOp::Define, values)
    }

    pub fn var(&self, name: &str, ty: &'a TypeExpr<'a>) -> Statement<'a> {
        Statement::Var(self.arena.alloc(VarStatement {
            names: self.arena.alloc_slice_copy(&[self.str(name)]),
            ty: Some(ty),
            values: &[],
            span: self.span,
        }))
    }

    pub fn block(&self, statements: &[Statement<'a>]) -> Block<'a> {
        Block {
            statements: self.arena.alloc_slice_copy(statements),
            span: self.span,
        }
    }

    pub fn if_stmt(
        &self,
        init: Option<Statement<'a>>,
        condition: Expression<'a>,
        then_statements: &[Statement<'a>],
    ) -> Statement<'a> {
        Statement::If(self.arena.alloc(IfStatement {
            init,
            condition,
            then_block: self.block(then_statements),
            else_branch: None,
            span: self.span,
        }))
    }

    pub fn range(
        &self,
        key: Option<Expression<'a>>,
        value: Option<Expression<'a>>,
        iterable: Expression<'a>,
        body: &[Statement<'a>],
    ) -> Statement<'a> {
        Statement::Range(self.arena.alloc(RangeStatement {
            key,
            value,
            define: true,
            iterable,
            body: self.block(body),
            span: self.span,
        }))
    }

    pub fn ret(&self, values: &[Expression<'a>]) -> Statement<'a> {
        Statement::Return(self.arena.alloc_slice_copy(values), self.span)
    }

    // Declarations

    pub fn param(&self, name: &str, ty: &'a TypeExpr<'a>) -> Param<'a> {
        Param {
            name: self.str(name),
            ty,
        }
    }

    pub fn type_param(&self, name: &str, constraint: &'a TypeExpr<'a>) -> TypeParam<'a> {
        TypeParam {
            name: self.str(name),
            constraint,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn func(
        &self,
        receiver: Option<Param<'a>>,
        name: &str,
        type_params: &[TypeParam<'a>],
        params: &[Param<'a>],
        results: &[TypeExpr<'a>],
        body: &[Statement<'a>],
    ) -> &'a FuncDecl<'a> {
        self.arena.alloc(FuncDecl {
            doc: None,
            receiver,
            name: self.str(name),
            type_params: self.arena.alloc_slice_copy(type_params),
            params: self.arena.alloc_slice_copy(params),
            results: self.arena.alloc_slice_copy(results),
            body: self.block(body),
            span: self.span,
        })
    }
}
