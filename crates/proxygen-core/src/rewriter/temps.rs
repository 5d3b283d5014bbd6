use crate::ast::{Block, Expression, ExpressionKind, FuncDecl, Statement};
use crate::naming;
use rustc_hash::FxHashSet;

const PREDECLARED: &[&str] = &[
    "append", "cap", "len", "make", "new", "panic", "nil", "true", "false", "iota", "bool",
    "string", "int", "int64", "float64", "byte", "rune", "any", "error",
];

/// Fresh local names for one method: never equal to any identifier the
/// method already uses, nor to one handed out before.
pub struct TempNames {
    taken: FxHashSet<String>,
}

impl TempNames {
    pub fn for_method(method: &FuncDecl<'_>) -> Self {
        let mut taken: FxHashSet<String> = PREDECLARED.iter().map(|s| s.to_string()).collect();
        if let Some(receiver) = method.receiver {
            taken.insert(receiver.name.to_string());
        }
        taken.extend(method.params.iter().map(|p| p.name.to_string()));
        taken.extend(method.type_params.iter().map(|p| p.name.to_string()));
        collect_block(&method.body, &mut taken);
        Self { taken }
    }

    /// `hint` in local-name form, suffixed with 2, 3, ... until unused.
    pub fn fresh(&mut self, hint: &str) -> String {
        let base = naming::local_name(hint);
        let name = naming::unique_name(&base, |candidate| self.taken.contains(candidate));
        self.taken.insert(name.clone());
        name
    }
}

fn collect_block(block: &Block<'_>, taken: &mut FxHashSet<String>) {
    for stmt in block.statements {
        collect_statement(stmt, taken);
    }
}

fn collect_optional(stmt: &Option<Statement<'_>>, taken: &mut FxHashSet<String>) {
    if let Some(stmt) = stmt {
        collect_statement(stmt, taken);
    }
}

fn collect_statement(stmt: &Statement<'_>, taken: &mut FxHashSet<String>) {
    match stmt {
        Statement::Empty(_) | Statement::Break(_) | Statement::Continue(_) => {}
        Statement::Expression(expr) => collect_expression(expr, taken),
        Statement::Assign(assign) => {
            for expr in assign.targets.iter().chain(assign.values) {
                collect_expression(expr, taken);
            }
        }
        Statement::IncDec(inc_dec) => collect_expression(&inc_dec.target, taken),
        Statement::Var(var) => {
            taken.extend(var.names.iter().map(|name| name.to_string()));
            for expr in var.values {
                collect_expression(expr, taken);
            }
        }
        Statement::Block(block) => collect_block(block, taken),
        Statement::If(if_stmt) => {
            collect_optional(&if_stmt.init, taken);
            collect_expression(&if_stmt.condition, taken);
            collect_block(&if_stmt.then_block, taken);
            collect_optional(&if_stmt.else_branch, taken);
        }
        Statement::For(for_stmt) => {
            collect_optional(&for_stmt.init, taken);
            if let Some(condition) = &for_stmt.condition {
                collect_expression(condition, taken);
            }
            collect_optional(&for_stmt.post, taken);
            collect_block(&for_stmt.body, taken);
        }
        Statement::Range(range) => {
            for expr in range.key.iter().chain(range.value.iter()) {
                collect_expression(expr, taken);
            }
            collect_expression(&range.iterable, taken);
            collect_block(&range.body, taken);
        }
        Statement::Switch(switch) => {
            collect_optional(&switch.init, taken);
            if let Some(tag) = &switch.tag {
                collect_expression(tag, taken);
            }
            for case in switch.cases {
                for expr in case.values {
                    collect_expression(expr, taken);
                }
                for stmt in case.body {
                    collect_statement(stmt, taken);
                }
            }
        }
        Statement::Return(values, _) => {
            for expr in values.iter() {
                collect_expression(expr, taken);
            }
        }
    }
}

fn collect_expression(expr: &Expression<'_>, taken: &mut FxHashSet<String>) {
    match expr.kind {
        ExpressionKind::Identifier(name) => {
            taken.insert(name.to_string());
        }
        ExpressionKind::Literal(_) | ExpressionKind::Type(_) => {}
        ExpressionKind::Selector(base, _) => collect_expression(base, taken),
        ExpressionKind::Call(call) => {
            collect_expression(&call.callee, taken);
            for arg in call.args {
                collect_expression(arg, taken);
            }
        }
        ExpressionKind::Index(base, index) => {
            collect_expression(base, taken);
            collect_expression(index, taken);
        }
        ExpressionKind::Binary(_, left, right) => {
            collect_expression(left, taken);
            collect_expression(right, taken);
        }
        ExpressionKind::Unary(_, operand) | ExpressionKind::Paren(operand) => {
            collect_expression(operand, taken)
        }
        ExpressionKind::Composite(_, elements) => {
            for element in elements {
                if let Some(key) = &element.key {
                    collect_expression(key, taken);
                }
                collect_expression(&element.value, taken);
            }
        }
    }
}
