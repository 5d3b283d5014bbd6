//! Where the statements of a rewritten assignment may go.

use crate::ast::Statement;

/// A syntactic position that holds a single simple statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    IfInit { else_if: bool },
    ForInit,
    ForPost,
    SwitchInit,
}

impl Slot {
    pub fn describe(self) -> &'static str {
        match self {
            Slot::IfInit { else_if: false } => "if initializer",
            Slot::IfInit { else_if: true } => "else-if initializer",
            Slot::ForInit => "for initializer",
            Slot::ForPost => "for post statement",
            Slot::SwitchInit => "switch initializer",
        }
    }
}

/// A slot statement after rewriting, with whatever had to leave the slot.
#[derive(Debug, Default)]
pub struct Relocated<'a> {
    /// `None` only when the slot was empty to begin with.
    pub slot: Option<Statement<'a>>,
    /// Goes right before the construct owning the slot.
    pub before: Vec<Statement<'a>>,
    /// Goes at the end of the loop body (post statements only).
    pub after: Vec<Statement<'a>>,
}

/// True when some `continue` in `statements` targets the loop whose body
/// they form. Nested loops capture their own `continue`s.
pub fn continues_enclosing_loop(statements: &[Statement<'_>]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Statement::Continue(_) => true,
        Statement::Block(block) => continues_enclosing_loop(block.statements),
        Statement::If(if_stmt) => {
            continues_enclosing_loop(if_stmt.then_block.statements)
                || if_stmt
                    .else_branch
                    .is_some_and(|branch| continues_enclosing_loop(&[branch]))
        }
        Statement::Switch(switch) => switch
            .cases
            .iter()
            .any(|case| continues_enclosing_loop(case.body)),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, Span};
    use bumpalo::Bump;

    #[test]
    fn test_continue_detection() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let cont = Statement::Continue(Span::dummy());

        assert!(continues_enclosing_loop(&[b.if_stmt(None, b.ident("x"), &[cont])]));
        assert!(!continues_enclosing_loop(&[b.range(
            Some(b.ident("i")),
            None,
            b.ident("xs"),
            &[cont]
        )]));
        assert!(!continues_enclosing_loop(&[Statement::Break(Span::dummy())]));
    }
}
