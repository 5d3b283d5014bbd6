//! The assignment rule: splitting an assignment into temporaries, the plain
//! part and mutator calls.

use super::{MethodRewriter, Target, Typed, TypeOracle};
use crate::ast::{
    AssignOp, AssignStatement, AstBuilder, BinaryOp, CompositeElement, Expression,
    ExpressionKind, IncDecStatement, Span, StaticType, Statement, TypeExpr, UnaryOp,
};
use crate::classifier::{Classification, FieldInfo, Multiplicity};
use crate::errors::RewriteError;
use crate::rewriter::compound::has_plain_target;
use crate::rewriter::CompoundAssignmentDesugaring;

/// One assignment after rewriting. Statements run in field order:
/// bindings, then the plain assignment, then mutators.
#[derive(Debug, Default)]
pub(super) struct AssignPlan<'a> {
    /// `t1, t2 := ...` capturing target operands, then right-hand values,
    /// before any write. A multi-value call gets a statement of its own.
    pub bindings: Vec<Statement<'a>>,
    /// What is left of the original statement for non-field targets.
    pub plain: Option<Statement<'a>>,
    /// Set when `plain` reads temporaries declared by `bindings`.
    pub plain_reads_temps: bool,
    pub mutators: Vec<Statement<'a>>,
}

impl<'a> AssignPlan<'a> {
    fn keep(stmt: Statement<'a>) -> Self {
        Self {
            plain: Some(stmt),
            ..Self::default()
        }
    }

    pub fn writes_fields(&self) -> bool {
        !self.mutators.is_empty()
    }

    pub fn into_statements(self) -> Vec<Statement<'a>> {
        let mut statements = Vec::with_capacity(self.mutators.len() + 2);
        statements.extend(self.bindings);
        statements.extend(self.plain);
        statements.extend(self.mutators);
        statements
    }
}

/// Base for a temporary holding the value of a plain target.
pub(super) fn name_hint<'a>(expr: &Expression<'a>) -> &'a str {
    match expr.kind {
        ExpressionKind::Identifier(name) => name,
        ExpressionKind::Selector(_, member) => member,
        ExpressionKind::Index(base, _) | ExpressionKind::Paren(base) => name_hint(base),
        ExpressionKind::Unary(_, operand) => name_hint(operand),
        ExpressionKind::Call(call) => name_hint(&call.callee),
        _ => "v",
    }
}

/// A receiver no write of the same statement can change.
fn is_stable_receiver(receiver: &Expression<'_>, written: &[&str]) -> bool {
    match receiver.kind {
        ExpressionKind::Identifier(name) => !written.contains(&name),
        ExpressionKind::Paren(inner) => is_stable_receiver(inner, written),
        _ => false,
    }
}

/// Untyped constants need no temporary and must not get one: `t := nil`
/// does not compile and `t := 1` fixes the constant to `int`.
fn is_constant(value: &Typed<'_>) -> bool {
    value.ty.is_some_and(|ty| ty.is_untyped()) && value.expr.is_call_free()
}

impl<'r, 'a, O> MethodRewriter<'r, 'a, O>
where
    O: TypeOracle<'a> + ?Sized,
{
    pub(super) fn plan_assignment(
        &mut self,
        assign: &'a AssignStatement<'a>,
    ) -> Result<AssignPlan<'a>, RewriteError> {
        match assign.op {
            AssignOp::Compound(op) if has_plain_target(assign.targets) => {
                let desugared =
                    CompoundAssignmentDesugaring::new(self.arena()).desugar_assign(assign, op);
                match desugared {
                    Statement::Assign(desugared) if desugared.op == AssignOp::Assign => {
                        self.plan_assignment(desugared)
                    }
                    other => Ok(AssignPlan::keep(other)),
                }
            }
            AssignOp::Compound(op) => match (assign.targets, assign.values) {
                ([target], [value]) => {
                    self.plan_compound(target, op, value, Statement::Assign(assign), assign.span)
                }
                _ => Ok(AssignPlan::keep(Statement::Assign(assign))),
            },
            AssignOp::Define => {
                let values = self.values(assign.values)?;
                if !values.iter().any(|v| v.changed) {
                    return Ok(AssignPlan::keep(Statement::Assign(assign)));
                }
                let rewritten = self.arena().alloc(AssignStatement {
                    values: self.alloc_exprs(&values),
                    ..*assign
                });
                Ok(AssignPlan::keep(Statement::Assign(rewritten)))
            }
            AssignOp::Assign => self.plan_plain_assignment(assign),
        }
    }

    fn plan_plain_assignment(
        &mut self,
        assign: &'a AssignStatement<'a>,
    ) -> Result<AssignPlan<'a>, RewriteError> {
        let mut targets = Vec::with_capacity(assign.targets.len());
        for target in assign.targets {
            targets.push(self.target(target)?);
        }
        let values = self.values(assign.values)?;
        let b = self.b.at(assign.span);

        if !targets.iter().any(|t| matches!(t, Target::Field { .. })) {
            let target_exprs: Vec<_> = targets
                .iter()
                .zip(assign.targets)
                .map(|(target, original)| match target {
                    Target::Plain(expr) => *expr,
                    _ => *original,
                })
                .collect();
            let rewritten = AssignStatement {
                targets: self.arena().alloc_slice_copy(&target_exprs),
                op: AssignOp::Assign,
                values: self.alloc_exprs(&values),
                span: assign.span,
            };
            if rewritten == *assign {
                return Ok(AssignPlan::keep(Statement::Assign(assign)));
            }
            return Ok(AssignPlan::keep(Statement::Assign(self.arena().alloc(rewritten))));
        }

        let paired = targets.len() == values.len();
        if paired {
            for (target, value) in targets.iter().zip(&values) {
                if let Target::Field { info, .. } = target {
                    self.check_assignable(info, value, assign.span)?;
                }
            }
        }
        self.rewrites += 1;

        if let ([Target::Field { receiver, info }], [value]) = (targets.as_slice(), values.as_slice()) {
            return Ok(AssignPlan {
                mutators: vec![self.mutator_call(b, *receiver, info, *value)],
                ..AssignPlan::default()
            });
        }

        let has_plain = targets.iter().any(|t| matches!(t, Target::Plain(_)));
        let call_free = paired
            && values.iter().all(|v| v.expr.is_call_free())
            && targets.iter().all(|t| match t {
                Target::Plain(expr) => expr.is_call_free(),
                _ => true,
            });
        let mut operands = Binding::default();
        let targets = self.capture_operands(b, &targets, has_plain && !call_free, &mut operands);
        if !has_plain {
            return Ok(self.plan_field_writes(b, operands, &targets, &values, paired));
        }
        if call_free {
            return Ok(self.plan_mixed_call_free(b, operands, &targets, &values));
        }
        Ok(self.plan_mixed(b, operands, &targets, &values, paired))
    }

    /// `x op= y` whose target calls something, so it cannot be spelled
    /// twice. A plain target stays a compound statement. A field target has
    /// its receiver bound once and is read and written through it.
    fn plan_compound(
        &mut self,
        target: &Expression<'a>,
        op: BinaryOp,
        value: &Expression<'a>,
        original: Statement<'a>,
        span: Span,
    ) -> Result<AssignPlan<'a>, RewriteError> {
        let b = self.b.at(span);
        let resolved = self.target(target)?;
        let value = self.value(value)?;
        match resolved {
            Target::Field { receiver, info } => {
                self.rewrites += 1;
                let temp = b.ident(&self.temps.fresh(name_hint(&receiver)));
                let operand = if value.expr.precedence() <= op.precedence() {
                    b.paren(value.expr)
                } else {
                    value.expr
                };
                let read = b.method_call(temp, &info.accessor, &[]);
                let combined = Typed::new(
                    b.binary(op, read, operand),
                    info.declared_type.map(StaticType::Known),
                );
                self.check_assignable(info, &combined, span)?;
                Ok(AssignPlan {
                    bindings: vec![b.define(&[temp], &[receiver])],
                    mutators: vec![self.mutator_call(b, temp, info, combined)],
                    ..AssignPlan::default()
                })
            }
            Target::Plain(expr) if expr != *target || value.changed => {
                let rewritten = match original {
                    Statement::IncDec(inc_dec) => Statement::IncDec(self.arena().alloc(
                        IncDecStatement {
                            target: expr,
                            ..*inc_dec
                        },
                    )),
                    _ => b.assign_with(&[expr], AssignOp::Compound(op), &[value.expr]),
                };
                Ok(AssignPlan::keep(rewritten))
            }
            _ => Ok(AssignPlan::keep(original)),
        }
    }

    /// `x++` or `x--` on a target that calls something.
    pub(super) fn plan_inc_dec(
        &mut self,
        inc_dec: &'a IncDecStatement<'a>,
    ) -> Result<AssignPlan<'a>, RewriteError> {
        let op = if inc_dec.increment {
            BinaryOp::Add
        } else {
            BinaryOp::Subtract
        };
        let one = self.b.at(inc_dec.span).int(1);
        self.plan_compound(
            &inc_dec.target,
            op,
            &one,
            Statement::IncDec(inc_dec),
            inc_dec.span,
        )
    }

    /// Binds, in target order, every target operand the rest of the plan
    /// would otherwise evaluate too late: field receivers other than names
    /// the statement leaves alone, and with `plain_operands` the calling
    /// operands of plain targets.
    fn capture_operands(
        &mut self,
        b: AstBuilder<'a>,
        targets: &[Target<'r, 'a>],
        plain_operands: bool,
        operands: &mut Binding<'a>,
    ) -> Vec<Target<'r, 'a>> {
        let written: Vec<&str> = targets
            .iter()
            .filter_map(|target| match target {
                Target::Plain(expr) => expr.as_identifier(),
                _ => None,
            })
            .collect();
        let mut captured = Vec::with_capacity(targets.len());
        for target in targets {
            captured.push(match *target {
                Target::Field { receiver, info } if !is_stable_receiver(&receiver, &written) => {
                    Target::Field {
                        receiver: operands.bind(self, b, name_hint(&receiver), receiver),
                        info,
                    }
                }
                Target::Plain(expr) if plain_operands && !expr.is_call_free() => {
                    Target::Plain(self.capture_place(b, expr, operands))
                }
                other => other,
            });
        }
        captured
    }

    /// `place` with each calling operand replaced by a bound temporary.
    fn capture_place(
        &mut self,
        b: AstBuilder<'a>,
        place: Expression<'a>,
        operands: &mut Binding<'a>,
    ) -> Expression<'a> {
        if let ExpressionKind::Paren(inner) = place.kind {
            return self.capture_place(b, *inner, operands);
        }
        let at = b.at(place.span);
        let mut operand = |this: &mut Self, expr: Expression<'a>| {
            if expr.is_call_free() {
                expr
            } else {
                operands.bind(this, b, name_hint(&expr), expr)
            }
        };
        match place.kind {
            ExpressionKind::Index(base, index) => {
                let base = operand(self, *base);
                let index = operand(self, *index);
                at.index(base, index)
            }
            ExpressionKind::Selector(base, member) => at.selector(operand(self, *base), member),
            ExpressionKind::Unary(UnaryOp::Deref, inner) => {
                at.unary(UnaryOp::Deref, operand(self, *inner))
            }
            _ => place,
        }
    }

    /// Field and blank targets only.
    fn plan_field_writes(
        &mut self,
        b: AstBuilder<'a>,
        operands: Binding<'a>,
        targets: &[Target<'r, 'a>],
        values: &[Typed<'a>],
        paired: bool,
    ) -> AssignPlan<'a> {
        let mut binding = Binding::default();
        let mut mutators = Vec::new();
        for (i, target) in targets.iter().enumerate() {
            let value = paired.then(|| values[i]);
            match target {
                Target::Field { receiver, info } => {
                    let source = binding.capture(self, b, info.name(), value);
                    mutators.push(self.mutator_call(b, *receiver, info, source));
                }
                _ => binding.discard(b, value),
            }
        }
        if !paired {
            binding.values = values.iter().map(|v| v.expr).collect();
        }
        AssignPlan {
            bindings: operands.followed_by(binding, paired, b),
            mutators,
            ..AssignPlan::default()
        }
    }

    /// Mixed targets whose right-hand values cannot run user code: only the
    /// field values are captured, the plain part stays an assignment.
    fn plan_mixed_call_free(
        &mut self,
        b: AstBuilder<'a>,
        operands: Binding<'a>,
        targets: &[Target<'r, 'a>],
        values: &[Typed<'a>],
    ) -> AssignPlan<'a> {
        let mut binding = Binding::default();
        let mut mutators = Vec::new();
        let mut plain_targets = Vec::new();
        let mut plain_values = Vec::new();
        for (target, value) in targets.iter().zip(values) {
            match target {
                Target::Field { receiver, info } => {
                    let source = binding.capture(self, b, info.name(), Some(*value));
                    mutators.push(self.mutator_call(b, *receiver, info, source));
                }
                Target::Plain(expr) => {
                    plain_targets.push(*expr);
                    plain_values.push(value.expr);
                }
                Target::Blank => {
                    plain_targets.push(b.ident("_"));
                    plain_values.push(value.expr);
                }
            }
        }
        AssignPlan {
            bindings: operands.followed_by(binding, true, b),
            plain: Some(b.assign(&plain_targets, &plain_values)),
            plain_reads_temps: false,
            mutators,
        }
    }

    /// Every right-hand value is captured first so calls keep their order.
    fn plan_mixed(
        &mut self,
        b: AstBuilder<'a>,
        operands: Binding<'a>,
        targets: &[Target<'r, 'a>],
        values: &[Typed<'a>],
        paired: bool,
    ) -> AssignPlan<'a> {
        let mut binding = Binding::default();
        let mut mutators = Vec::new();
        let mut plain_targets = Vec::new();
        let mut plain_values = Vec::new();
        for (i, target) in targets.iter().enumerate() {
            let value = paired.then(|| values[i]);
            match target {
                Target::Field { receiver, info } => {
                    let source = binding.capture(self, b, info.name(), value);
                    mutators.push(self.mutator_call(b, *receiver, info, source));
                }
                Target::Plain(expr) => {
                    let source = binding.capture(self, b, name_hint(expr), value);
                    plain_targets.push(*expr);
                    plain_values.push(source.expr);
                }
                Target::Blank => binding.discard(b, value),
            }
        }
        if !paired {
            binding.values = values.iter().map(|v| v.expr).collect();
        }
        AssignPlan {
            bindings: operands.followed_by(binding, paired, b),
            plain: Some(b.assign(&plain_targets, &plain_values)),
            plain_reads_temps: true,
            mutators,
        }
    }

    /// `receiver.SetField(value)`, converting enumeration values.
    pub(super) fn mutator_call(
        &self,
        b: AstBuilder<'a>,
        receiver: Expression<'a>,
        info: &FieldInfo<'a>,
        value: Typed<'a>,
    ) -> Statement<'a> {
        let argument = self.convert(b, info, value);
        b.expr_stmt(b.method_call(receiver, &info.mutator, &[argument]))
    }

    /// Wraps a value of the representation type in the enumeration type.
    fn convert(&self, b: AstBuilder<'a>, info: &FieldInfo<'a>, value: Typed<'a>) -> Expression<'a> {
        let Some(enum_name) = info.enum_name() else {
            return value.expr;
        };
        let known = value.ty.and_then(|ty| ty.known());

        if !info.is_multi() {
            if known.is_some_and(|ty| *ty == TypeExpr::Named(enum_name)) {
                return value.expr;
            }
            return b.call_fn(enum_name, &[value.expr]);
        }

        if let Some(&TypeExpr::Slice(&TypeExpr::Named(element))) = known {
            if element == enum_name {
                return value.expr;
            }
        }
        if value.ty == Some(StaticType::UntypedNil) {
            return value.expr;
        }
        if let ExpressionKind::Composite(ty, elements) = value.expr.kind {
            if ty.is_slice() && elements.iter().all(|element| element.key.is_none()) {
                let converted: Vec<_> = elements
                    .iter()
                    .map(|element| CompositeElement {
                        key: None,
                        value: b.call_fn(enum_name, &[element.value]),
                    })
                    .collect();
                let slice_ty = b.slice_of(b.named(enum_name));
                return Expression::new(
                    ExpressionKind::Composite(slice_ty, self.arena().alloc_slice_copy(&converted)),
                    value.expr.span,
                );
            }
        }
        b.call_fn(&self.config.slice_helper(enum_name), &[value.expr])
    }

    /// The parameter type of the field's mutator, in the field's terms.
    fn write_type(&self, info: &FieldInfo<'a>) -> Option<&'a TypeExpr<'a>> {
        let b = self.b;
        match info.classification.as_ref()? {
            Classification::Relation {
                multiplicity: Multiplicity::Single,
                target,
            } => Some(b.pointer(b.named(target))),
            Classification::Relation {
                multiplicity: Multiplicity::Multi,
                target,
            } => Some(b.slice_of(b.pointer(b.named(target)))),
            _ => info.declared_type,
        }
    }

    pub(super) fn check_assignable(
        &self,
        info: &FieldInfo<'a>,
        value: &Typed<'a>,
        span: Span,
    ) -> Result<(), RewriteError> {
        let (Some(expected), Some(found)) = (self.write_type(info), value.ty) else {
            return Ok(());
        };
        if found.assignable_to(expected) || self.is_enum_value(info, found) {
            return Ok(());
        }
        Err(RewriteError::TypeMismatch {
            method: self.method.to_string(),
            entity: info.entity.name.clone(),
            field: info.field.name.clone(),
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        })
    }

    /// Values already of the enumeration type (or a slice of it).
    fn is_enum_value(&self, info: &FieldInfo<'a>, found: StaticType<'a>) -> bool {
        let (Some(enum_name), Some(ty)) = (info.enum_name(), found.known()) else {
            return false;
        };
        match ty {
            TypeExpr::Named(name) => *name == enum_name,
            TypeExpr::Slice(TypeExpr::Named(name)) => info.is_multi() && *name == enum_name,
            _ => false,
        }
    }
}

/// The `:=` statement capturing right-hand values, built position by
/// position.
#[derive(Default)]
struct Binding<'a> {
    names: Vec<Expression<'a>>,
    values: Vec<Expression<'a>>,
}

impl<'a> Binding<'a> {
    /// Binds `value` to a fresh temporary and returns what to read instead.
    /// Constants are returned as they are. With no paired value (a
    /// multi-value call) only the name is recorded.
    fn capture<O>(
        &mut self,
        rewriter: &mut MethodRewriter<'_, 'a, O>,
        b: AstBuilder<'a>,
        hint: &str,
        value: Option<Typed<'a>>,
    ) -> Typed<'a>
    where
        O: TypeOracle<'a> + ?Sized,
    {
        if let Some(value) = value.filter(is_constant) {
            return value;
        }
        let temp = b.ident(&rewriter.temps.fresh(hint));
        self.names.push(temp);
        if let Some(value) = value {
            self.values.push(value.expr);
        }
        Typed::new(temp, value.and_then(|v| v.ty))
    }

    /// Binds an operand evaluated now and returns the temporary to use
    /// in its place.
    fn bind<O>(
        &mut self,
        rewriter: &mut MethodRewriter<'_, 'a, O>,
        b: AstBuilder<'a>,
        hint: &str,
        expr: Expression<'a>,
    ) -> Expression<'a>
    where
        O: TypeOracle<'a> + ?Sized,
    {
        let temp = b.ident(&rewriter.temps.fresh(hint));
        self.names.push(temp);
        self.values.push(expr);
        temp
    }

    /// These operand bindings followed by the value bindings. Both share
    /// one statement unless the values come from a multi-value call.
    fn followed_by(mut self, values: Binding<'a>, paired: bool, b: AstBuilder<'a>) -> Vec<Statement<'a>> {
        if !paired {
            return self
                .into_statement(b)
                .into_iter()
                .chain(values.into_statement(b))
                .collect();
        }
        self.names.extend(values.names);
        self.values.extend(values.values);
        self.into_statement(b).into_iter().collect()
    }

    /// A blank target still evaluates its value.
    fn discard(&mut self, b: AstBuilder<'a>, value: Option<Typed<'a>>) {
        match value {
            Some(value) if value.expr.is_call_free() => {}
            Some(value) => {
                self.names.push(b.ident("_"));
                self.values.push(value.expr);
            }
            None => self.names.push(b.ident("_")),
        }
    }

    fn into_statement(self, b: AstBuilder<'a>) -> Option<Statement<'a>> {
        if self.names.is_empty() || self.names.iter().all(Expression::is_blank) {
            if self.values.is_empty() {
                return None;
            }
            return Some(b.assign(&self.names, &self.values));
        }
        Some(b.define(&self.names, &self.values))
    }
}
