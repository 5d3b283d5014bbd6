//! Prints syntax trees back to canonical source text, tab-free and with four
//! spaces per level, so tests can compare generated code as strings.

use proxygen_core::ast::{
    Block, CompositeElement, Declaration, Expression, ExpressionKind, FuncDecl, IfStatement,
    Literal, Statement, TypeDeclKind, TypeExpr,
};
use std::fmt::Write;

const INDENT: &str = "    ";

pub fn render_declarations(declarations: &[Declaration<'_>]) -> String {
    declarations
        .iter()
        .map(render_declaration)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_declaration(declaration: &Declaration<'_>) -> String {
    let mut printer = Printer::default();
    printer.declaration(declaration);
    printer.out
}

pub fn render_func(func: &FuncDecl<'_>) -> String {
    let mut printer = Printer::default();
    printer.func(func);
    printer.out
}

/// The statements of a block, one level deep, without the braces.
pub fn render_body(block: &Block<'_>) -> String {
    let mut printer = Printer::default();
    for statement in block.statements {
        printer.statement(statement);
    }
    printer.out
}

pub fn render_statement(statement: &Statement<'_>) -> String {
    let mut printer = Printer::default();
    printer.statement(statement);
    printer.out
}

pub fn render_expression(expr: &Expression<'_>) -> String {
    let mut out = String::new();
    expression(&mut out, expr);
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn declaration(&mut self, declaration: &Declaration<'_>) {
        match declaration {
            Declaration::Func(func) => self.func(func),
            Declaration::Type(ty) => match ty.kind {
                TypeDeclKind::Underlying(underlying) => {
                    self.line(&format!("type {} {}", ty.name, underlying))
                }
                TypeDeclKind::Struct(fields) => {
                    self.line(&format!("type {} struct {{", ty.name));
                    self.indented(|p| {
                        for field in fields {
                            match field.name {
                                Some(name) => p.line(&format!("{} {}", name, field.ty)),
                                None => p.line(&field.ty.to_string()),
                            }
                        }
                    });
                    self.line("}");
                }
            },
            Declaration::Const(group) => {
                self.line("const (");
                self.indented(|p| {
                    for (i, name) in group.names.iter().enumerate() {
                        if i == 0 {
                            p.line(&format!("{} {} = iota", name, group.ty));
                        } else {
                            p.line(name);
                        }
                    }
                });
                self.line(")");
            }
            Declaration::Var(var) => {
                self.line(&format!("var {} = {}", var.name, render_expression(&var.value)))
            }
        }
    }

    fn func(&mut self, func: &FuncDecl<'_>) {
        if let Some(doc) = func.doc {
            for line in doc.lines() {
                self.line(&format!("// {}", line));
            }
        }
        let mut header = String::from("func ");
        if let Some(receiver) = func.receiver {
            let _ = write!(header, "({} {}) ", receiver.name, receiver.ty);
        }
        header.push_str(func.name);
        if !func.type_params.is_empty() {
            let params: Vec<_> = func
                .type_params
                .iter()
                .map(|param| format!("{} {}", param.name, param.constraint))
                .collect();
            let _ = write!(header, "[{}]", params.join(", "));
        }
        let params: Vec<_> = func
            .params
            .iter()
            .map(|param| format!("{} {}", param.name, param.ty))
            .collect();
        let _ = write!(header, "({})", params.join(", "));
        match func.results {
            [] => {}
            [single] => {
                let _ = write!(header, " {}", single);
            }
            many => {
                let results: Vec<_> = many.iter().map(TypeExpr::to_string).collect();
                let _ = write!(header, " ({})", results.join(", "));
            }
        }
        header.push_str(" {");
        self.line(&header);
        self.indented(|p| p.statements(func.body.statements));
        self.line("}");
    }

    fn statements(&mut self, statements: &[Statement<'_>]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Empty(_) => {}
            Statement::Block(block) => {
                self.line("{");
                self.indented(|p| p.statements(block.statements));
                self.line("}");
            }
            Statement::If(if_stmt) => self.if_chain(if_stmt, ""),
            Statement::For(for_stmt) => {
                let init = for_stmt.init.filter(|s| !s.is_empty()).map(|s| simple(&s));
                let post = for_stmt.post.filter(|s| !s.is_empty()).map(|s| simple(&s));
                let condition = for_stmt.condition.map(|c| render_expression(&c));
                let header = match (init, condition, post) {
                    (None, None, None) => "for {".to_string(),
                    (None, Some(condition), None) => format!("for {} {{", condition),
                    (init, condition, post) => {
                        let mut header = format!(
                            "for {}; {};",
                            init.unwrap_or_default(),
                            condition.unwrap_or_default()
                        );
                        if let Some(post) = post {
                            let _ = write!(header, " {}", post);
                        }
                        header.push_str(" {");
                        header
                    }
                };
                self.line(&header);
                self.indented(|p| p.statements(for_stmt.body.statements));
                self.line("}");
            }
            Statement::Range(range) => {
                let iterable = render_expression(&range.iterable);
                let header = match (range.key, range.value) {
                    (None, None) => format!("for range {} {{", iterable),
                    (key, value) => {
                        let mut bindings = key
                            .map(|k| render_expression(&k))
                            .unwrap_or_else(|| "_".to_string());
                        if let Some(value) = value {
                            let _ = write!(bindings, ", {}", render_expression(&value));
                        }
                        let op = if range.define { ":=" } else { "=" };
                        format!("for {} {} range {} {{", bindings, op, iterable)
                    }
                };
                self.line(&header);
                self.indented(|p| p.statements(range.body.statements));
                self.line("}");
            }
            Statement::Switch(switch) => {
                let mut header = String::from("switch ");
                if let Some(init) = switch.init.filter(|s| !s.is_empty()) {
                    let _ = write!(header, "{}; ", simple(&init));
                }
                if let Some(tag) = switch.tag {
                    let _ = write!(header, "{} ", render_expression(&tag));
                }
                header.push('{');
                self.line(&header);
                for case in switch.cases {
                    if case.values.is_empty() {
                        self.line("default:");
                    } else {
                        self.line(&format!("case {}:", expression_list(case.values)));
                    }
                    self.indented(|p| p.statements(case.body));
                }
                self.line("}");
            }
            other => self.line(&simple(other)),
        }
    }

    /// Prints `if ... { } else if ... { } else { }` starting with `prefix`
    /// on the first line.
    fn if_chain(&mut self, if_stmt: &IfStatement<'_>, prefix: &str) {
        let mut header = format!("{}if ", prefix);
        if let Some(init) = if_stmt.init.filter(|s| !s.is_empty()) {
            let _ = write!(header, "{}; ", simple(&init));
        }
        let _ = write!(header, "{} {{", render_expression(&if_stmt.condition));
        self.line(&header);
        self.indented(|p| p.statements(if_stmt.then_block.statements));
        match if_stmt.else_branch {
            None => self.line("}"),
            Some(Statement::If(nested)) => self.if_chain(nested, "} else "),
            Some(Statement::Block(block)) => {
                self.line("} else {");
                self.indented(|p| p.statements(block.statements));
                self.line("}");
            }
            Some(other) => {
                self.line("} else {");
                self.indented(|p| p.statement(&other));
                self.line("}");
            }
        }
    }
}

/// Single-line statements, also used inside headers.
fn simple(statement: &Statement<'_>) -> String {
    match statement {
        Statement::Empty(_) => String::new(),
        Statement::Expression(expr) => render_expression(expr),
        Statement::Assign(assign) => format!(
            "{} {} {}",
            expression_list(assign.targets),
            assign.op.as_str(),
            expression_list(assign.values)
        ),
        Statement::IncDec(inc_dec) => format!(
            "{}{}",
            render_expression(&inc_dec.target),
            if inc_dec.increment { "++" } else { "--" }
        ),
        Statement::Var(var) => {
            let mut out = format!("var {}", var.names.join(", "));
            if let Some(ty) = var.ty {
                let _ = write!(out, " {}", ty);
            }
            if !var.values.is_empty() {
                let _ = write!(out, " = {}", expression_list(var.values));
            }
            out
        }
        Statement::Return(values, _) if values.is_empty() => "return".to_string(),
        Statement::Return(values, _) => format!("return {}", expression_list(values)),
        Statement::Break(_) => "break".to_string(),
        Statement::Continue(_) => "continue".to_string(),
        compound => render_statement(compound).trim_end().to_string(),
    }
}

fn expression_list(exprs: &[Expression<'_>]) -> String {
    exprs
        .iter()
        .map(render_expression)
        .collect::<Vec<_>>()
        .join(", ")
}

fn expression(out: &mut String, expr: &Expression<'_>) {
    match expr.kind {
        ExpressionKind::Identifier(name) => out.push_str(name),
        ExpressionKind::Literal(literal) => match literal {
            Literal::Int(value) => {
                let _ = write!(out, "{}", value);
            }
            Literal::Float(value) => {
                let _ = write!(out, "{:?}", value);
            }
            Literal::String(value) => {
                let _ = write!(out, "{:?}", value);
            }
            Literal::Bool(value) => {
                let _ = write!(out, "{}", value);
            }
            Literal::Nil => out.push_str("nil"),
        },
        ExpressionKind::Selector(base, member) => {
            operand(out, base, 7);
            out.push('.');
            out.push_str(member);
        }
        ExpressionKind::Call(call) => {
            operand(out, &call.callee, 7);
            if !call.type_args.is_empty() {
                let args: Vec<_> = call.type_args.iter().map(TypeExpr::to_string).collect();
                let _ = write!(out, "[{}]", args.join(", "));
            }
            let _ = write!(out, "({})", expression_list(call.args));
        }
        ExpressionKind::Index(base, index) => {
            operand(out, base, 7);
            out.push('[');
            expression(out, index);
            out.push(']');
        }
        ExpressionKind::Binary(op, left, right) => {
            let precedence = op.precedence();
            operand(out, left, precedence);
            let _ = write!(out, " {} ", op.as_str());
            operand(out, right, precedence + 1);
        }
        ExpressionKind::Unary(op, inner) => {
            out.push_str(op.as_str());
            operand(out, inner, 6);
        }
        ExpressionKind::Paren(inner) => {
            out.push('(');
            expression(out, inner);
            out.push(')');
        }
        ExpressionKind::Composite(ty, elements) => {
            let _ = write!(out, "{}{{", ty);
            for (i, CompositeElement { key, value }) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(key) = key {
                    expression(out, key);
                    out.push_str(": ");
                }
                expression(out, value);
            }
            out.push('}');
        }
        ExpressionKind::Type(ty) => {
            let _ = write!(out, "{}", ty);
        }
    }
}

/// Writes `expr`, parenthesized when it binds looser than `min_precedence`.
fn operand(out: &mut String, expr: &Expression<'_>, min_precedence: u8) {
    if expr.precedence() < min_precedence {
        out.push('(');
        expression(out, expr);
        out.push(')');
    } else {
        expression(out, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_method;
    use bumpalo::Bump;
    use indoc::indoc;

    #[test]
    fn test_render_is_stable_on_canonical_source() {
        let source = indoc! {r#"
            func (o *Order) Apply(n int, items []*Item) (int, bool) {
                o.total = (o.total + 1) * 2
                for i := 0; i < n; i++ {
                    if x := o.items[i]; x != nil {
                        continue
                    } else if n > 2 {
                        break
                    } else {
                        o.note = "a\"b"
                    }
                }
                for _, item := range items {
                    item.count++
                }
                switch o.status {
                case 1, 2:
                    o.total -= 1
                default:
                }
                return n, true
            }
        "#};
        let arena = Bump::new();
        let method = parse_method(source, &arena).unwrap();
        assert_eq!(render_func(method), source);
    }

    #[test]
    fn test_for_header_variants() {
        let arena = Bump::new();
        let source = indoc! {r#"
            func f() {
                for {
                }
                for x < 3 {
                }
                for ; x < 3; x++ {
                }
                for range xs {
                }
            }
        "#};
        let method = parse_method(source, &arena).unwrap();
        assert_eq!(render_func(method), source);
    }
}
