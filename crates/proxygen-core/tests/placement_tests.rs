//! Field writes in statement headers: `if`/`for`/`switch` initializers and
//! `for` post statements, plus `for ... = range` bindings.

use indoc::indoc;
use proxygen_core::RewriteError;
use proxygen_test_helpers::fixtures::shop_schema;
use proxygen_test_helpers::{rewrite_body, rewrite_error};

#[test]
fn test_if_initializer_moves_before_the_if() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Settle() {
                if o.count = 3; o.paid {
                    return
                }
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            o.SetCount(3)
            if o.Paid() {
                return
            }
        "#}
    );
}

#[test]
fn test_if_initializer_keeps_local_definition_in_place() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Check() bool {
                if n := o.count; n > 2 {
                    return true
                }
                return false
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            if n := o.Count(); n > 2 {
                return true
            }
            return false
        "#}
    );
}

#[test]
fn test_mixed_if_initializer_keeps_plain_part_in_header() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Check(n int) bool {
                var m int
                if m, o.count = n, n + 1; m > 0 {
                    return true
                }
                return false
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            var m int
            count := n + 1
            o.SetCount(count)
            if m = n; m > 0 {
                return true
            }
            return false
        "#}
    );
}

#[test]
fn test_else_if_initializer_with_field_write_is_rejected() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Check(n int) {
                if o.paid {
                    return
                } else if o.count = n; n > 0 {
                    return
                }
            }
        "#},
    )
    .unwrap();
    match error {
        RewriteError::Relocation { method, reason, .. } => {
            assert_eq!(method, "Check");
            assert!(reason.contains("else-if initializer"), "{reason}");
        }
        other => panic!("expected a relocation error, got {other:?}"),
    }
}

#[test]
fn test_for_initializer_and_post_are_relocated() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Fill(n int) {
                for o.count = 0; o.count < n; o.count++ {
                    o.total += 1
                }
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            o.SetCount(0)
            for o.Count() < n {
                o.SetTotal(o.Total() + 1)
                o.SetCount(o.Count() + 1)
            }
        "#}
    );
}

#[test]
fn test_mixed_post_statement_moves_whole_assignment_to_body_end() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Walk(n int) int {
                total := 0
                for i := 0; i < n; i, o.count = i + 1, o.count + 1 {
                    total += i
                }
                return total
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            total := 0
            for i := 0; i < n; {
                total = total + i
                i2, count := i + 1, o.Count() + 1
                i = i2
                o.SetCount(count)
            }
            return total
        "#}
    );
}

#[test]
fn test_post_relocation_with_continue_is_rejected() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Walk(n int) {
                for i := 0; i < n; o.count++ {
                    if i == 2 {
                        continue
                    }
                }
            }
        "#},
    )
    .unwrap();
    assert!(matches!(error, RewriteError::Relocation { .. }), "{error:?}");
    assert!(error.to_string().contains("continues past the relocated post statement"));
}

#[test]
fn test_continue_in_nested_loop_does_not_block_relocation() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Walk(n int) {
                for i := 0; i < n; o.count++ {
                    for j := 0; j < i; j++ {
                        continue
                    }
                }
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            for i := 0; i < n; {
                for j := 0; j < i; j = j + 1 {
                    continue
                }
                o.SetCount(o.Count() + 1)
            }
        "#}
    );
}

#[test]
fn test_switch_initializer_moves_before_the_switch() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Route() string {
                switch o.note = "routed"; o.status {
                case 0:
                    return "new"
                default:
                    o.count--
                }
                return ""
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            o.SetNote("routed")
            switch o.Status() {
            case 0:
                return "new"
            default:
                o.SetCount(o.Count() - 1)
            }
            return ""
        "#}
    );
}

#[test]
fn test_range_definition_reads_iterable_through_accessor() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Sum() float64 {
                sum := 0.0
                for _, item := range o.items {
                    sum += item.price * float64(item.quantity)
                }
                return sum
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            sum := 0.0
            for _, item := range o.Items() {
                sum = sum + item.Price() * float64(item.Quantity())
            }
            return sum
        "#}
    );
}

#[test]
fn test_range_assignment_to_field_binds_temporaries() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Last(counts []int) int {
                var i int
                for i, o.count = range counts {
                    o.paid = true
                }
                return i
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            var i int
            for i2, count := range counts {
                i = i2
                o.SetCount(count)
                o.SetPaid(true)
            }
            return i
        "#}
    );
}

#[test]
fn test_range_assignment_checks_element_type() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Last(names []string) {
                for _, o.count = range names {
                }
            }
        "#},
    )
    .unwrap();
    match error {
        RewriteError::TypeMismatch {
            field,
            expected,
            found,
            ..
        } => {
            assert_eq!(field, "count");
            assert_eq!(expected, "int");
            assert_eq!(found, "string");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn test_range_over_relation_leaves_loop_variables_alone() {
    let body = rewrite_body(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Touch() {
                for i, e := range o.items {
                    _, _ = i, e
                }
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        body,
        indoc! {r#"
            for i, e := range o.Items() {
                _, _ = i, e
            }
        "#}
    );
}
