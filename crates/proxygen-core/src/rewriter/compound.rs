//! Desugars `x op= y` into `x = x op (y)` and `x++` into `x = x + 1`, so
//! the rewriter mostly sees plain assignments.
//!
//! A target that calls anything (`xs[next()] += 1`) is left alone: spelling
//! it twice would run the call twice. The rewriter handles those statements
//! itself.

use crate::ast::{
    AssignOp, AssignStatement, AstBuilder, BinaryOp, Block, Expression, IncDecStatement,
    Statement,
};
use bumpalo::Bump;

/// Whether the target of a compound assignment can be spelled twice.
pub fn has_plain_target(targets: &[Expression<'_>]) -> bool {
    targets.iter().all(Expression::is_call_free)
}

pub struct CompoundAssignmentDesugaring<'a> {
    arena: &'a Bump,
}

impl<'a> CompoundAssignmentDesugaring<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    /// Returns true when anything in the block changed.
    pub fn desugar_block(&self, block: &mut Block<'a>) -> bool {
        let mut stmts: Vec<_> = block.statements.to_vec();
        let mut changed = false;
        for stmt in &mut stmts {
            changed |= self.desugar_statement(stmt);
        }
        if changed {
            block.statements = self.arena.alloc_slice_copy(&stmts);
        }
        changed
    }

    fn desugar_optional(&self, stmt: &mut Option<Statement<'a>>) -> bool {
        match stmt {
            Some(inner) => self.desugar_statement(inner),
            None => false,
        }
    }

    pub fn desugar_statement(&self, stmt: &mut Statement<'a>) -> bool {
        match stmt {
            Statement::Assign(assign) => match assign.op {
                AssignOp::Compound(op) if has_plain_target(assign.targets) => {
                    *stmt = self.desugar_assign(assign, op);
                    true
                }
                _ => false,
            },
            Statement::IncDec(inc_dec) if inc_dec.target.is_call_free() => {
                *stmt = self.desugar_inc_dec(inc_dec);
                true
            }
            Statement::Block(block) => self.desugar_block(block),
            Statement::If(if_stmt) => {
                let mut new_if = **if_stmt;
                let mut changed = self.desugar_optional(&mut new_if.init);
                changed |= self.desugar_block(&mut new_if.then_block);
                changed |= self.desugar_optional(&mut new_if.else_branch);
                if changed {
                    *stmt = Statement::If(self.arena.alloc(new_if));
                }
                changed
            }
            Statement::For(for_stmt) => {
                let mut new_for = **for_stmt;
                let mut changed = self.desugar_optional(&mut new_for.init);
                changed |= self.desugar_optional(&mut new_for.post);
                changed |= self.desugar_block(&mut new_for.body);
                if changed {
                    *stmt = Statement::For(self.arena.alloc(new_for));
                }
                changed
            }
            Statement::Range(range) => {
                let mut new_range = **range;
                let changed = self.desugar_block(&mut new_range.body);
                if changed {
                    *stmt = Statement::Range(self.arena.alloc(new_range));
                }
                changed
            }
            Statement::Switch(switch) => {
                let mut new_switch = **switch;
                let mut changed = self.desugar_optional(&mut new_switch.init);
                let mut cases: Vec<_> = switch.cases.to_vec();
                let mut cases_changed = false;
                for case in &mut cases {
                    let mut body = Block {
                        statements: case.body,
                        span: case.span,
                    };
                    if self.desugar_block(&mut body) {
                        case.body = body.statements;
                        cases_changed = true;
                    }
                }
                if cases_changed {
                    new_switch.cases = self.arena.alloc_slice_copy(&cases);
                    changed = true;
                }
                if changed {
                    *stmt = Statement::Switch(self.arena.alloc(new_switch));
                }
                changed
            }
            _ => false,
        }
    }

    /// `x op= y` → `x = x op y`, parenthesizing `y` when it binds no tighter
    /// than `op`.
    pub fn desugar_assign(&self, assign: &AssignStatement<'a>, op: BinaryOp) -> Statement<'a> {
        let b = AstBuilder::new(self.arena).at(assign.span);
        let (Some(target), Some(value)) = (assign.targets.first(), assign.values.first()) else {
            return Statement::Assign(self.arena.alloc(AssignStatement {
                op: AssignOp::Assign,
                ..*assign
            }));
        };
        let operand = if value.precedence() <= op.precedence() {
            b.at(value.span).paren(*value)
        } else {
            *value
        };
        let combined = b.at(target.span).binary(op, *target, operand);
        b.assign(&[*target], &[combined])
    }

    pub fn desugar_inc_dec(&self, inc_dec: &IncDecStatement<'a>) -> Statement<'a> {
        let b = AstBuilder::new(self.arena).at(inc_dec.span);
        let op = if inc_dec.increment {
            BinaryOp::Add
        } else {
            BinaryOp::Subtract
        };
        let combined = b.at(inc_dec.target.span).binary(op, inc_dec.target, b.int(1));
        b.assign(&[inc_dec.target], &[combined])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExpressionKind, Span};

    fn assign_parts<'a>(stmt: &Statement<'a>) -> (&'a [Expression<'a>], AssignOp, &'a [Expression<'a>]) {
        match stmt {
            Statement::Assign(assign) => (assign.targets, assign.op, assign.values),
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment_becomes_binary() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let target = b.selector(b.ident("o"), "total");
        let mut stmt = b.assign_with(
            &[target],
            AssignOp::Compound(BinaryOp::Subtract),
            &[b.binary(BinaryOp::Subtract, b.ident("a"), b.ident("b"))],
        );

        let desugaring = CompoundAssignmentDesugaring::new(&arena);
        assert!(desugaring.desugar_statement(&mut stmt));

        let (targets, op, values) = assign_parts(&stmt);
        assert_eq!(op, AssignOp::Assign);
        assert_eq!(targets[0], target);
        match values[0].kind {
            ExpressionKind::Binary(BinaryOp::Subtract, left, right) => {
                assert_eq!(*left, target);
                assert!(matches!(right.kind, ExpressionKind::Paren(_)));
            }
            ref other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_tighter_operand_is_not_parenthesized() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut stmt = b.assign_with(
            &[b.ident("x")],
            AssignOp::Compound(BinaryOp::Add),
            &[b.binary(BinaryOp::Multiply, b.ident("a"), b.ident("b"))],
        );
        CompoundAssignmentDesugaring::new(&arena).desugar_statement(&mut stmt);
        let (_, _, values) = assign_parts(&stmt);
        match values[0].kind {
            ExpressionKind::Binary(BinaryOp::Add, _, right) => {
                assert!(matches!(right.kind, ExpressionKind::Binary(BinaryOp::Multiply, ..)));
            }
            ref other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_target_with_call_is_not_desugared() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let target = b.index(b.ident("xs"), b.method_call(b.ident("c"), "Next", &[]));
        let mut stmt = b.assign_with(
            &[target],
            AssignOp::Compound(BinaryOp::Add),
            &[b.int(1)],
        );
        let original = stmt;
        let mut inc = Statement::IncDec(arena.alloc(IncDecStatement {
            target,
            increment: true,
            span: Span::dummy(),
        }));
        let desugaring = CompoundAssignmentDesugaring::new(&arena);
        assert!(!desugaring.desugar_statement(&mut stmt));
        assert!(!desugaring.desugar_statement(&mut inc));
        assert_eq!(stmt, original);
        assert!(matches!(inc, Statement::IncDec(_)));
    }

    #[test]
    fn test_nested_increment_is_desugared() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let inc = Statement::IncDec(arena.alloc(IncDecStatement {
            target: b.ident("i"),
            increment: true,
            span: Span::new(2, 3),
        }));
        let mut block = Block {
            statements: arena.alloc_slice_copy(&[b.if_stmt(None, b.ident("ok"), &[inc])]),
            span: Span::dummy(),
        };
        assert!(CompoundAssignmentDesugaring::new(&arena).desugar_block(&mut block));
        let Statement::If(if_stmt) = block.statements[0] else {
            panic!("expected if");
        };
        let (_, op, values) = assign_parts(&if_stmt.then_block.statements[0]);
        assert_eq!(op, AssignOp::Assign);
        assert!(matches!(values[0].kind, ExpressionKind::Binary(BinaryOp::Add, ..)));
        assert_eq!(if_stmt.then_block.statements[0].span(), Span::new(2, 3));
    }
}
