use super::expression::{BinaryOp, Expression};
use super::types::TypeExpr;
use super::Span;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement<'a> {
    /// Placeholder left in an initializer or post slot whose content moved.
    Empty(Span),
    Expression(Expression<'a>),
    Assign(&'a AssignStatement<'a>),
    IncDec(&'a IncDecStatement<'a>),
    Var(&'a VarStatement<'a>),
    Block(Block<'a>),
    If(&'a IfStatement<'a>),
    For(&'a ForStatement<'a>),
    Range(&'a RangeStatement<'a>),
    Switch(&'a SwitchStatement<'a>),
    Return(&'a [Expression<'a>], Span),
    Break(Span),
    Continue(Span),
}

impl<'a> Statement<'a> {
    pub fn span(&self) -> Span {
        match self {
            Statement::Empty(span)
            | Statement::Return(_, span)
            | Statement::Break(span)
            | Statement::Continue(span) => *span,
            Statement::Expression(expr) => expr.span,
            Statement::Assign(assign) => assign.span,
            Statement::IncDec(inc_dec) => inc_dec.span,
            Statement::Var(var) => var.span,
            Statement::Block(block) => block.span,
            Statement::If(if_stmt) => if_stmt.span,
            Statement::For(for_stmt) => for_stmt.span,
            Statement::Range(range) => range.span,
            Statement::Switch(switch) => switch.span,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Statement::Empty(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'a> {
    pub statements: &'a [Statement<'a>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `op=`
    Compound(BinaryOp),
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Compound(op) => match op {
                BinaryOp::Add => "+=",
                BinaryOp::Subtract => "-=",
                BinaryOp::Multiply => "*=",
                BinaryOp::Divide => "/=",
                BinaryOp::Modulo => "%=",
                BinaryOp::BitwiseAnd => "&=",
                BinaryOp::BitwiseOr => "|=",
                BinaryOp::BitwiseXor => "^=",
                BinaryOp::BitClear => "&^=",
                BinaryOp::ShiftLeft => "<<=",
                BinaryOp::ShiftRight => ">>=",
                _ => "?=",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignStatement<'a> {
    pub targets: &'a [Expression<'a>],
    pub op: AssignOp,
    pub values: &'a [Expression<'a>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncDecStatement<'a> {
    pub target: Expression<'a>,
    pub increment: bool,
    pub span: Span,
}

/// `var a, b T = x, y` inside a function body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarStatement<'a> {
    pub names: &'a [&'a str],
    pub ty: Option<&'a TypeExpr<'a>>,
    pub values: &'a [Expression<'a>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStatement<'a> {
    pub init: Option<Statement<'a>>,
    pub condition: Expression<'a>,
    pub then_block: Block<'a>,
    /// Either `Statement::Block` or a nested `Statement::If`.
    pub else_branch: Option<Statement<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStatement<'a> {
    pub init: Option<Statement<'a>>,
    pub condition: Option<Expression<'a>>,
    pub post: Option<Statement<'a>>,
    pub body: Block<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeStatement<'a> {
    pub key: Option<Expression<'a>>,
    pub value: Option<Expression<'a>>,
    /// `:=` when true, `=` otherwise.
    pub define: bool,
    pub iterable: Expression<'a>,
    pub body: Block<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchStatement<'a> {
    pub init: Option<Statement<'a>>,
    pub tag: Option<Expression<'a>>,
    pub cases: &'a [SwitchCase<'a>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchCase<'a> {
    /// Empty for `default`.
    pub values: &'a [Expression<'a>],
    pub body: &'a [Statement<'a>],
    pub span: Span,
}

// Declarations

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Declaration<'a> {
    Func(&'a FuncDecl<'a>),
    Type(&'a TypeDecl<'a>),
    Const(&'a ConstDecl<'a>),
    Var(&'a VarDecl<'a>),
}

impl<'a> Declaration<'a> {
    /// The declared name; for constant groups, the type they belong to.
    pub fn name(&self) -> &'a str {
        match self {
            Declaration::Func(func) => func.name,
            Declaration::Type(ty) => ty.name,
            Declaration::Const(group) => group.ty,
            Declaration::Var(var) => var.name,
        }
    }

    pub fn as_func(&self) -> Option<&'a FuncDecl<'a>> {
        match *self {
            Declaration::Func(func) => Some(func),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'a> {
    pub name: &'a str,
    pub ty: &'a TypeExpr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeParam<'a> {
    pub name: &'a str,
    pub constraint: &'a TypeExpr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuncDecl<'a> {
    pub doc: Option<&'a str>,
    pub receiver: Option<Param<'a>>,
    pub name: &'a str,
    pub type_params: &'a [TypeParam<'a>],
    pub params: &'a [Param<'a>],
    pub results: &'a [TypeExpr<'a>],
    pub body: Block<'a>,
    pub span: Span,
}

impl<'a> FuncDecl<'a> {
    /// Entity name of the receiver type, `Order` for both `Order` and `*Order`.
    pub fn receiver_entity(&self) -> Option<&'a str> {
        self.receiver.and_then(|receiver| receiver.ty.named_target())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeDecl<'a> {
    pub doc: Option<&'a str>,
    pub name: &'a str,
    pub kind: TypeDeclKind<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeDeclKind<'a> {
    /// `type Status int`
    Underlying(&'a TypeExpr<'a>),
    Struct(&'a [StructField<'a>]),
}

/// A struct field; `name` is `None` for an embedded type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructField<'a> {
    pub name: Option<&'a str>,
    pub ty: &'a TypeExpr<'a>,
}

/// `const ( A T = iota; B; C )`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstDecl<'a> {
    pub ty: &'a str,
    pub names: &'a [&'a str],
    pub span: Span,
}

/// Package-level `var name = value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDecl<'a> {
    pub name: &'a str,
    pub value: Expression<'a>,
    pub span: Span,
}
