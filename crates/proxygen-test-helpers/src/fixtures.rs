//! Shared schemas for tests.

use proxygen_core::{Entity, Field, Schema};

pub const STATUS_LABELS: &[&str] = &["new", "paid", "shipped"];
pub const FLAG_LABELS: &[&str] = &["rush", "gift"];

/// A small shop: orders referencing one customer and many items.
///
/// `Order` covers every field shape: primitives, a renamed primitive, single
/// and multi enumerations, both relation kinds, an excluded field and the
/// primary key. `Customer.status` is a plain string, unrelated to the
/// `Status` enumeration of orders.
pub fn shop_schema() -> Schema {
    Schema::new(vec![
        Entity::new("Order")
            .with_collection("orders")
            .with_field(Field::new("Id", "string"))
            .with_field(Field::new("total", "float64"))
            .with_field(Field::new("count", "int"))
            .with_field(Field::new("paid", "bool"))
            .with_field(Field::new("note", "string").with_backing_key("comment"))
            .with_field(Field::enumerated("status", "Status", STATUS_LABELS, false))
            .with_field(Field::enumerated("flags", "Flag", FLAG_LABELS, true))
            .with_field(Field::new("customer", "*Customer"))
            .with_field(Field::new("items", "[]*Item"))
            .with_field(Field::new("created", "types.DateTime").excluded()),
        Entity::new("Customer")
            .with_collection("customers")
            .with_field(Field::new("name", "string"))
            .with_field(Field::new("status", "string")),
        Entity::new("Item")
            .with_collection("items")
            .with_field(Field::new("price", "float64"))
            .with_field(Field::new("quantity", "int")),
    ])
}

/// One entity with two primitive fields, for focused rewrite tests.
pub fn counter_schema() -> Schema {
    Schema::new(vec![Entity::new("Counter")
        .with_collection("counters")
        .with_field(Field::new("value", "int"))
        .with_field(Field::new("label", "string"))])
}

/// A relation to an entity the schema does not declare.
pub fn dangling_schema() -> Schema {
    Schema::new(vec![Entity::new("Order")
        .with_field(Field::new("total", "float64"))
        .with_field(Field::new("owner", "*Account"))])
}

/// A singly linked list: every node points at the next one.
pub fn linked_schema() -> Schema {
    Schema::new(vec![Entity::new("Node")
        .with_collection("nodes")
        .with_field(Field::new("val", "int"))
        .with_field(Field::new("next", "*Node"))])
}
