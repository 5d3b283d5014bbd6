use super::types::TypeExpr;
use super::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expression<'a> {
    pub kind: ExpressionKind<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpressionKind<'a> {
    Identifier(&'a str),
    Literal(Literal<'a>),
    /// `base.member`
    Selector(&'a Expression<'a>, &'a str),
    Call(&'a CallExpression<'a>),
    Index(&'a Expression<'a>, &'a Expression<'a>),
    Binary(BinaryOp, &'a Expression<'a>, &'a Expression<'a>),
    Unary(UnaryOp, &'a Expression<'a>),
    Paren(&'a Expression<'a>),
    Composite(&'a TypeExpr<'a>, &'a [CompositeElement<'a>]),
    /// A type in operand position, e.g. the first argument of `make`.
    Type(&'a TypeExpr<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpression<'a> {
    pub callee: Expression<'a>,
    pub type_args: &'a [TypeExpr<'a>],
    pub args: &'a [Expression<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Int(i64),
    Float(f64),
    /// Unquoted contents.
    String(&'a str),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeElement<'a> {
    pub key: Option<Expression<'a>>,
    pub value: Expression<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitClear,
    ShiftLeft,
    ShiftRight,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo
            | BinaryOp::ShiftLeft
            | BinaryOp::ShiftRight
            | BinaryOp::BitwiseAnd
            | BinaryOp::BitClear => 5,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::BitwiseOr | BinaryOp::BitwiseXor => 4,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => 3,
            BinaryOp::And => 2,
            BinaryOp::Or => 1,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::ShiftLeft | BinaryOp::ShiftRight)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::BitClear => "&^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
    BitwiseNot,
    AddressOf,
    Deref,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitwiseNot => "^",
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
        }
    }
}

impl<'a> Expression<'a> {
    pub fn new(kind: ExpressionKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn as_identifier(&self) -> Option<&'a str> {
        match self.kind {
            ExpressionKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_selector(&self) -> Option<(&'a Expression<'a>, &'a str)> {
        match self.kind {
            ExpressionKind::Selector(base, member) => Some((base, member)),
            _ => None,
        }
    }

    /// The blank identifier `_`.
    pub fn is_blank(&self) -> bool {
        self.as_identifier() == Some("_")
    }

    /// True when evaluating the expression cannot run user code.
    pub fn is_call_free(&self) -> bool {
        match self.kind {
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Type(_) => true,
            ExpressionKind::Call(_) => false,
            ExpressionKind::Selector(base, _) => base.is_call_free(),
            ExpressionKind::Index(base, index) => base.is_call_free() && index.is_call_free(),
            ExpressionKind::Binary(_, left, right) => left.is_call_free() && right.is_call_free(),
            ExpressionKind::Unary(_, operand) | ExpressionKind::Paren(operand) => {
                operand.is_call_free()
            }
            ExpressionKind::Composite(_, elements) => elements.iter().all(|element| {
                element.key.map_or(true, |key| key.is_call_free()) && element.value.is_call_free()
            }),
        }
    }

    /// Binding strength of the expression's outermost operator, used when
    /// deciding whether it must be parenthesized as an operand.
    pub fn precedence(&self) -> u8 {
        match self.kind {
            ExpressionKind::Binary(op, _, _) => op.precedence(),
            ExpressionKind::Unary(..) => 6,
            _ => 7,
        }
    }
}
