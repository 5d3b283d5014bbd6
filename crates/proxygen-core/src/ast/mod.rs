//! Syntax tree for the host language.
//!
//! Every node lives in a `bumpalo::Bump` arena and links to its children
//! through `&'arena` references. Nodes are never mutated after construction:
//! a pass that changes something builds a new parent and reuses the
//! untouched children.

pub mod builder;
pub mod expression;
pub mod statement;
pub mod types;

pub use builder::AstBuilder;
pub use expression::{
    BinaryOp, CallExpression, CompositeElement, Expression, ExpressionKind, Literal, UnaryOp,
};
pub use statement::{
    AssignOp, AssignStatement, Block, ConstDecl, Declaration, FuncDecl, ForStatement,
    IfStatement, IncDecStatement, Param, RangeStatement, Statement, StructField, SwitchCase,
    SwitchStatement, TypeDecl, TypeDeclKind, TypeParam, VarDecl, VarStatement,
};
pub use types::{StaticType, TypeExpr};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position of a node, 1-based. `0:0` marks synthesized code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn dummy() -> Self {
        Self::default()
    }

    pub fn is_dummy(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
