//! Methods the rewriter refuses: values of the wrong type, fields without
//! accessors and receivers outside the schema.

use indoc::indoc;
use proxygen_core::RewriteError;
use proxygen_test_helpers::fixtures::{dangling_schema, shop_schema};
use proxygen_test_helpers::rewrite_error;

#[test]
fn test_untyped_string_into_int_field() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Break() {
                o.count = "three"
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        error,
        RewriteError::TypeMismatch {
            method: "Break".into(),
            entity: "Order".into(),
            field: "count".into(),
            expected: "int".into(),
            found: "untyped string".into(),
            span: error.span(),
        }
    );
    assert_eq!(error.span().line, 2);
}

#[test]
fn test_typed_value_of_other_type() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Copy(c *Customer) {
                o.total = c.name
            }
        "#},
    )
    .unwrap();
    match error {
        RewriteError::TypeMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, "float64");
            assert_eq!(found, "string");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn test_relation_needs_proxy_of_target() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Link(i *Item) {
                o.customer = i
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
            assert_eq!(field, "customer");
            assert_eq!(expected, "*Customer");
            assert_eq!(found, "*Item");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn test_mismatch_in_parallel_assignment_is_found() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Swap() {
                o.total, o.count = o.count, o.total
            }
        "#},
    )
    .unwrap();
    match error {
        RewriteError::TypeMismatch { field, .. } => assert_eq!(field, "total"),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn test_unresolved_relation_has_no_accessor() {
    let error = rewrite_error(
        &dangling_schema(),
        indoc! {r#"
            func (o *Order) Drop() {
                o.owner = nil
            }
        "#},
    )
    .unwrap();
    assert_eq!(
        error,
        RewriteError::MissingAccessor {
            method: "Drop".into(),
            entity: "Order".into(),
            field: "owner".into(),
            span: error.span(),
        }
    );
}

#[test]
fn test_reading_unavailable_field_is_rejected_too() {
    let error = rewrite_error(
        &dangling_schema(),
        indoc! {r#"
            func (o *Order) Owner() bool {
                return o.owner != nil
            }
        "#},
    )
    .unwrap();
    assert!(matches!(error, RewriteError::MissingAccessor { .. }));
    assert!(error.to_string().contains("Order.owner has no generated accessor"));
}

#[test]
fn test_receiver_outside_schema() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (g *Ghost) Haunt() {
            }
        "#},
    )
    .unwrap();
    match error {
        RewriteError::UnknownReceiver {
            method, receiver, ..
        } => {
            assert_eq!(method, "Haunt");
            assert_eq!(receiver, "*Ghost");
        }
        other => panic!("expected an unknown receiver, got {other:?}"),
    }
}

#[test]
fn test_error_diagnostic_names_the_method() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Break() {
                o.paid = 1
            }
        "#},
    )
    .unwrap();
    let diagnostic = error.to_diagnostic();
    assert_eq!(diagnostic.context.as_deref(), Some("Break"));
    assert!(diagnostic.message.contains("Order.paid"));
}

#[test]
fn test_string_through_relation_into_enumeration_is_rejected() {
    let error = rewrite_error(
        &shop_schema(),
        indoc! {r#"
            func (o *Order) Copy() {
                o.status = o.customer.status
            }
        "#},
    )
    .unwrap();
    match error {
        RewriteError::TypeMismatch {
            entity,
            field,
            expected,
            found,
            ..
        } => {
            assert_eq!(entity, "Order");
            assert_eq!(field, "status");
            assert_eq!(expected, "int");
            assert_eq!(found, "string");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}
