//! Identifier derivation shared by the synthesizer and the rewriter.

use convert_case::{Case, Casing};

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

/// `status` → `Status`, `shipping_address` → `ShippingAddress`.
pub fn accessor_name(field: &str) -> String {
    field.to_case(Case::UpperCamel)
}

pub fn mutator_name(field: &str) -> String {
    format!("Set{}", accessor_name(field))
}

/// Local variable name for a value of `field`: lowerCamel, keeping a
/// trailing underscore, and never a keyword.
pub fn local_name(field: &str) -> String {
    let mut name = field.to_case(Case::Camel);
    if name.is_empty() {
        name.push('v');
    }
    if field.ends_with('_') && !name.ends_with('_') {
        name.push('_');
    }
    if KEYWORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}

/// `base` if free, otherwise `base2`, `base3`, ...
pub fn unique_name(base: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|suffix| format!("{}{}", base, suffix))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_and_mutator_names() {
        assert_eq!(accessor_name("status"), "Status");
        assert_eq!(accessor_name("intField"), "IntField");
        assert_eq!(accessor_name("order_items"), "OrderItems");
        assert_eq!(mutator_name("intField"), "SetIntField");
    }

    #[test]
    fn test_local_names() {
        assert_eq!(local_name("IntField"), "intField");
        assert_eq!(local_name("field_"), "field_");
        assert_eq!(local_name("type"), "type_");
    }

    #[test]
    fn test_unique_name_suffixes() {
        let taken = ["intField", "intField2"];
        assert_eq!(unique_name("intField", |n| taken.contains(&n)), "intField3");
        assert_eq!(unique_name("total", |n| taken.contains(&n)), "total");
    }
}
