//! Behavior preservation: every method runs twice, once as written against a
//! plain struct and once as generated against a record-backed proxy, and
//! both runs must return the same values and leave the same field state.

use bumpalo::Bump;
use indoc::indoc;
use proxygen_core::ast::Declaration;
use proxygen_core::{CompilationSession, GeneratorConfig, Schema};
use proxygen_test_helpers::fixtures::{
    counter_schema, linked_schema, shop_schema, FLAG_LABELS, STATUS_LABELS,
};
use proxygen_test_helpers::{parse_methods, ExecError, Executor, FakeRecord, Value};

/// Field values of an `Order` in both representations.
struct OrderState {
    total: f64,
    count: i64,
    paid: bool,
    note: &'static str,
    status: usize,
}

impl OrderState {
    fn plain(&self, ex: &Executor<'_>) -> Value {
        ex.new_object(
            "Order",
            vec![
                ("total", Value::Float(self.total)),
                ("count", Value::Int(self.count)),
                ("paid", Value::Bool(self.paid)),
                ("note", Value::from(self.note)),
                ("status", Value::Int(self.status as i64)),
                ("flags", Value::Slice(Vec::new())),
            ],
        )
    }

    fn record(&self) -> FakeRecord {
        FakeRecord::new("orders", "o1")
            .with_value("total", self.total)
            .with_value("count", self.count)
            .with_value("paid", self.paid)
            .with_value("comment", self.note)
            .with_value("status", STATUS_LABELS[self.status])
    }
}

fn initial_order() -> OrderState {
    OrderState {
        total: 8.0,
        count: 1,
        paid: false,
        note: "",
        status: 0,
    }
}

fn plain_declarations<'a>(source: &str, arena: &'a Bump) -> Vec<Declaration<'a>> {
    parse_methods(source, arena)
        .unwrap()
        .into_iter()
        .map(Declaration::Func)
        .collect()
}

fn generated_declarations<'a>(
    schema: &'a Schema,
    source: &str,
    arena: &'a Bump,
) -> Vec<Declaration<'a>> {
    let methods = parse_methods(source, arena).unwrap();
    let mut session = CompilationSession::new(schema, GeneratorConfig::default(), arena);
    session.generate(&methods).unwrap().declarations
}

/// Plain field value next to the stored record value for `key`.
fn stored(proxy: &Value, key: &str) -> Value {
    proxy
        .record()
        .unwrap()
        .borrow()
        .get(key)
        .cloned()
        .unwrap_or(Value::Nil)
}

fn assert_same_order_state(order: &Value, proxy: &Value) {
    assert_eq!(order.field("total").unwrap(), stored(proxy, "total"));
    assert_eq!(order.field("count").unwrap(), stored(proxy, "count"));
    assert_eq!(order.field("paid").unwrap(), stored(proxy, "paid"));
    assert_eq!(order.field("note").unwrap(), stored(proxy, "comment"));
    let ordinal = order.field("status").unwrap().as_int().unwrap() as usize;
    assert_eq!(Value::from(STATUS_LABELS[ordinal]), stored(proxy, "status"));
}

const CHECKOUT: &str = indoc! {r#"
    func (o *Order) Checkout(extra float64) int {
        o.total += extra
        o.count++
        if o.total > 10.0 {
            o.paid = true
            o.status = 1
        }
        o.note, o.count = "done", o.count * 2
        return o.count
    }
"#};

#[test]
fn test_checkout_behaves_the_same() {
    let schema = shop_schema();
    let arena = Bump::new();
    let plain = plain_declarations(CHECKOUT, &arena);
    let generated = generated_declarations(&schema, CHECKOUT, &arena);

    for extra in [1.0, 3.0] {
        let mut original = Executor::new(&plain).unwrap();
        let order = initial_order().plain(&original);
        let expected = original
            .call_method(&order, "Checkout", vec![Value::Float(extra)])
            .unwrap();

        let mut rewritten = Executor::new(&generated).unwrap();
        let proxy = rewritten.new_proxy("Order", initial_order().record());
        let actual = rewritten
            .call_method(&proxy, "Checkout", vec![Value::Float(extra)])
            .unwrap();

        assert_eq!(expected, actual);
        assert_same_order_state(&order, &proxy);
    }
}

#[test]
fn test_checkout_stores_labels_and_renamed_key() {
    let schema = shop_schema();
    let arena = Bump::new();
    let generated = generated_declarations(&schema, CHECKOUT, &arena);
    let mut ex = Executor::new(&generated).unwrap();
    let proxy = ex.new_proxy("Order", initial_order().record());
    let result = ex
        .call_method(&proxy, "Checkout", vec![Value::Float(3.0)])
        .unwrap();

    assert_eq!(result, vec![Value::Int(4)]);
    assert_eq!(stored(&proxy, "total"), Value::Float(11.0));
    assert_eq!(stored(&proxy, "paid"), Value::Bool(true));
    assert_eq!(stored(&proxy, "status"), Value::from("paid"));
    assert_eq!(stored(&proxy, "comment"), Value::from("done"));
    assert!(proxy.record().unwrap().borrow().get("note").is_none());
}

#[test]
fn test_parallel_swap_behaves_the_same() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (c *Customer) Swap() string {
            c.name, c.status = c.status, c.name
            return c.name + "/" + c.status
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let customer = original.new_object(
        "Customer",
        vec![("name", Value::from("ada")), ("status", Value::from("vip"))],
    );
    let expected = original.call_method(&customer, "Swap", vec![]).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy(
        "Customer",
        FakeRecord::new("customers", "c1")
            .with_value("name", "ada")
            .with_value("status", "vip"),
    );
    let actual = rewritten.call_method(&proxy, "Swap", vec![]).unwrap();

    assert_eq!(expected, vec![Value::from("vip/ada")]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&proxy, "name"), Value::from("vip"));
    assert_eq!(stored(&proxy, "status"), Value::from("ada"));
}

#[test]
fn test_relocated_post_statement_behaves_the_same() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Accumulate(n int) float64 {
            for i := 0; i < n; i, o.count = i + 1, o.count + 1 {
                o.total += float64(i)
            }
            return o.total
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let order = initial_order().plain(&original);
    let expected = original
        .call_method(&order, "Accumulate", vec![Value::Int(4)])
        .unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy("Order", initial_order().record());
    let actual = rewritten
        .call_method(&proxy, "Accumulate", vec![Value::Int(4)])
        .unwrap();

    assert_eq!(expected, vec![Value::Float(14.0)]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&proxy, "count"), Value::Int(5));
    assert_same_order_state(&order, &proxy);
}

#[test]
fn test_range_assignment_into_field_behaves_the_same() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Last(counts []int) int {
            var i int
            for i, o.count = range counts {
                o.paid = true
            }
            return i
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);
    let counts = || Value::slice([Value::Int(7), Value::Int(9), Value::Int(3)]);

    let mut original = Executor::new(&plain).unwrap();
    let order = initial_order().plain(&original);
    let expected = original.call_method(&order, "Last", vec![counts()]).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy("Order", initial_order().record());
    let actual = rewritten.call_method(&proxy, "Last", vec![counts()]).unwrap();

    assert_eq!(expected, vec![Value::Int(2)]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&proxy, "count"), Value::Int(3));
    assert_same_order_state(&order, &proxy);
}

#[test]
fn test_enumeration_reads_compare_by_ordinal() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Stage() string {
            switch o.status {
            case 0:
                return "fresh"
            case 2:
                return "gone"
            }
            return "billed"
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    for status in 0..STATUS_LABELS.len() {
        let state = OrderState {
            status,
            ..initial_order()
        };
        let mut original = Executor::new(&plain).unwrap();
        let order = state.plain(&original);
        let expected = original.call_method(&order, "Stage", vec![]).unwrap();

        let mut rewritten = Executor::new(&generated).unwrap();
        let proxy = rewritten.new_proxy("Order", state.record());
        let actual = rewritten.call_method(&proxy, "Stage", vec![]).unwrap();
        assert_eq!(expected, actual, "status {}", STATUS_LABELS[status]);
    }
}

#[test]
fn test_multi_enumeration_write_stores_labels() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Tag(extra []int) int {
            o.flags = append(extra, 0)
            return len(o.flags)
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let order = initial_order().plain(&original);
    let expected = original
        .call_method(&order, "Tag", vec![Value::slice([Value::Int(1)])])
        .unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy("Order", initial_order().record());
    let actual = rewritten
        .call_method(&proxy, "Tag", vec![Value::slice([Value::Int(1)])])
        .unwrap();

    assert_eq!(expected, vec![Value::Int(2)]);
    assert_eq!(expected, actual);
    let labels: Vec<Value> = order
        .field("flags")
        .unwrap()
        .as_slice()
        .unwrap()
        .iter()
        .map(|ordinal| Value::from(FLAG_LABELS[ordinal.as_int().unwrap() as usize]))
        .collect();
    assert_eq!(stored(&proxy, "flags"), Value::Slice(labels));
}

#[test]
fn test_relation_reads_go_through_expanded_records() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Subtotal() float64 {
            sum := 0.0
            for _, item := range o.items {
                sum += item.price * float64(item.quantity)
            }
            return sum
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let items = Value::slice([
        original.new_object(
            "Item",
            vec![("price", Value::Float(2.5)), ("quantity", Value::Int(2))],
        ),
        original.new_object(
            "Item",
            vec![("price", Value::Float(1.0)), ("quantity", Value::Int(3))],
        ),
    ]);
    let order = original.new_object("Order", vec![("items", items)]);
    let expected = original.call_method(&order, "Subtotal", vec![]).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let records = Value::slice([
        FakeRecord::new("items", "i1")
            .with_value("price", 2.5)
            .with_value("quantity", 2i64)
            .into_value(),
        FakeRecord::new("items", "i2")
            .with_value("price", 1.0)
            .with_value("quantity", 3i64)
            .into_value(),
    ]);
    let proxy = rewritten.new_proxy(
        "Order",
        FakeRecord::new("orders", "o1")
            .with_value("items", Value::slice([Value::from("i1"), Value::from("i2")]))
            .with_expand("items", records),
    );
    let actual = rewritten.call_method(&proxy, "Subtotal", vec![]).unwrap();

    assert_eq!(expected, vec![Value::Float(8.0)]);
    assert_eq!(expected, actual);
}

#[test]
fn test_relation_write_stores_id_and_expands_record() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Reassign(c *Customer) string {
            o.customer = c
            return o.customer.name
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let order = initial_order().plain(&original);
    let customer = original.new_object("Customer", vec![("name", Value::from("bea"))]);
    let expected = original
        .call_method(&order, "Reassign", vec![customer])
        .unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy("Order", initial_order().record());
    let target = rewritten.new_proxy(
        "Customer",
        FakeRecord::new("customers", "c7").with_value("name", "bea"),
    );
    let actual = rewritten
        .call_method(&proxy, "Reassign", vec![target.clone()])
        .unwrap();

    assert_eq!(expected, vec![Value::from("bea")]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&proxy, "customer"), Value::from("c7"));
    let record = proxy.record().unwrap();
    let expanded = record.borrow().expand.get("customer").cloned().unwrap();
    assert!(expanded.same_ref(&Value::Record(target.record().unwrap())));
}

#[test]
fn test_methods_calling_each_other_keep_behavior() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Add(n int) {
            o.count += n
        }
        func (o *Order) AddTwice(n int) int {
            o.Add(n)
            o.Add(n)
            return o.count
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let order = initial_order().plain(&original);
    let expected = original
        .call_method(&order, "AddTwice", vec![Value::Int(5)])
        .unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy("Order", initial_order().record());
    let actual = rewritten
        .call_method(&proxy, "AddTwice", vec![Value::Int(5)])
        .unwrap();

    assert_eq!(expected, vec![Value::Int(11)]);
    assert_eq!(expected, actual);
    assert_same_order_state(&order, &proxy);
}

#[test]
fn test_unknown_stored_status_label_panics() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Shipped() bool {
            return o.status == 2
        }
    "#};
    let generated = generated_declarations(&schema, source, &arena);
    let mut ex = Executor::new(&generated).unwrap();
    let proxy = ex.new_proxy(
        "Order",
        FakeRecord::new("orders", "o1").with_value("status", "bogus"),
    );

    let result = ex.call_method(&proxy, "Shipped", vec![]);
    assert!(matches!(result, Err(ExecError::Panic(_))), "{:?}", result);
}

/// Runs `method` on node `n` of the list `n -> m`, with a spare node `p`,
/// once on plain structs and once on generated proxies. `args` name the
/// nodes passed in. Returns both results and the proxy of `n`.
fn run_on_list(source: &str, method: &str, args: &[&str]) -> (Vec<Value>, Vec<Value>, Value) {
    let schema = linked_schema();
    let arena = Bump::new();
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let m = original.new_object("Node", vec![("val", Value::Int(2)), ("next", Value::Nil)]);
    let p = original.new_object("Node", vec![("val", Value::Int(3)), ("next", Value::Nil)]);
    let n = original.new_object("Node", vec![("val", Value::Int(1)), ("next", m.clone())]);
    let plain_args = args
        .iter()
        .map(|name| match *name {
            "m" => m.clone(),
            "p" => p.clone(),
            _ => n.clone(),
        })
        .collect();
    let expected = original.call_method(&n, method, plain_args).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let m_record = FakeRecord::new("nodes", "m1")
        .with_value("val", 2i64)
        .into_value();
    let n_proxy = rewritten.new_proxy(
        "Node",
        FakeRecord::new("nodes", "n1")
            .with_value("val", 1i64)
            .with_value("next", "m1")
            .with_expand("next", m_record.clone()),
    );
    let m_proxy = rewritten.new_object("Node", vec![("Record", m_record)]);
    let p_proxy = rewritten.new_proxy("Node", FakeRecord::new("nodes", "p1").with_value("val", 3i64));
    let proxy_args = args
        .iter()
        .map(|name| match *name {
            "m" => m_proxy.clone(),
            "p" => p_proxy.clone(),
            _ => n_proxy.clone(),
        })
        .collect();
    let actual = rewritten.call_method(&n_proxy, method, proxy_args).unwrap();
    (expected, actual, n_proxy)
}

#[test]
fn test_list_step_writes_the_node_it_started_from() {
    let source = indoc! {r#"
        func (n *Node) Step(prev *Node) int {
            cur := n
            cur, cur.next, prev = cur.next, prev, cur
            return cur.val*100 + prev.val*10 + n.next.val
        }
    "#};
    let (expected, actual, n) = run_on_list(source, "Step", &["p"]);

    assert_eq!(expected, vec![Value::Int(213)]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&n, "next"), Value::from("p1"));
}

#[test]
fn test_reassigned_receiver_keeps_its_old_value_for_field_writes() {
    let source = indoc! {r#"
        func (n *Node) Retarget(other *Node) int {
            cur := n
            cur, cur.val = other, 5
            return n.val*10 + other.val
        }
    "#};
    let (expected, actual, n) = run_on_list(source, "Retarget", &["p"]);

    assert_eq!(expected, vec![Value::Int(53)]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&n, "val"), Value::Int(5));
}

#[test]
fn test_write_through_replaced_relation_reaches_the_old_node() {
    let source = indoc! {r#"
        func (n *Node) Replace(other *Node, old *Node) int {
            n.next, n.next.val = other, 9
            return old.val*10 + other.val
        }
    "#};
    let (expected, actual, n) = run_on_list(source, "Replace", &["p", "m"]);

    assert_eq!(expected, vec![Value::Int(93)]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&n, "next"), Value::from("p1"));
}

#[test]
fn test_index_operand_call_runs_before_value_call() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Mark(d int) int {
            o.count = o.count*10 + d
            return 0
        }
        func (o *Order) Fill(xs []int) int {
            xs[o.Mark(1)], o.paid = o.Mark(2), true
            return o.count
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);
    let xs = || Value::slice([Value::Int(0)]);

    let mut original = Executor::new(&plain).unwrap();
    let order = initial_order().plain(&original);
    let expected = original.call_method(&order, "Fill", vec![xs()]).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy("Order", initial_order().record());
    let actual = rewritten.call_method(&proxy, "Fill", vec![xs()]).unwrap();

    assert_eq!(expected, vec![Value::Int(112)]);
    assert_eq!(expected, actual);
    assert_same_order_state(&order, &proxy);
}

#[test]
fn test_compound_assignment_runs_index_call_once() {
    let schema = counter_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (c *Counter) Next() int {
            c.value++
            return c.value - 1
        }
        func (c *Counter) Tally(xs []int) int {
            xs[c.Next()] += 5
            xs[c.Next()]++
            return xs[0]*100 + xs[1]*10 + c.value
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);
    let xs = || Value::slice([Value::Int(1), Value::Int(1), Value::Int(1)]);

    let mut original = Executor::new(&plain).unwrap();
    let counter = original.new_object(
        "Counter",
        vec![("value", Value::Int(0)), ("label", Value::from(""))],
    );
    let expected = original.call_method(&counter, "Tally", vec![xs()]).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let proxy = rewritten.new_proxy(
        "Counter",
        FakeRecord::new("counters", "c1")
            .with_value("value", 0i64)
            .with_value("label", ""),
    );
    let actual = rewritten.call_method(&proxy, "Tally", vec![xs()]).unwrap();

    assert_eq!(expected, vec![Value::Int(622)]);
    assert_eq!(expected, actual);
    assert_eq!(stored(&proxy, "value"), Value::Int(2));
}

#[test]
fn test_compound_field_write_through_calling_receiver_runs_it_once() {
    let schema = shop_schema();
    let arena = Bump::new();
    let source = indoc! {r#"
        func (o *Order) Pick() int {
            o.count++
            return 0
        }
        func (o *Order) Raise() int {
            o.items[o.Pick()].price += 2.5
            return o.count
        }
    "#};
    let plain = plain_declarations(source, &arena);
    let generated = generated_declarations(&schema, source, &arena);

    let mut original = Executor::new(&plain).unwrap();
    let item = original.new_object(
        "Item",
        vec![("price", Value::Float(1.0)), ("quantity", Value::Int(1))],
    );
    let order = original.new_object(
        "Order",
        vec![("count", Value::Int(1)), ("items", Value::slice([item.clone()]))],
    );
    let expected = original.call_method(&order, "Raise", vec![]).unwrap();

    let mut rewritten = Executor::new(&generated).unwrap();
    let item_record = FakeRecord::new("items", "i1")
        .with_value("price", 1.0)
        .with_value("quantity", 1i64)
        .into_value();
    let proxy = rewritten.new_proxy(
        "Order",
        FakeRecord::new("orders", "o1")
            .with_value("count", 1i64)
            .with_value("items", Value::slice([Value::from("i1")]))
            .with_expand("items", Value::slice([item_record.clone()])),
    );
    let actual = rewritten.call_method(&proxy, "Raise", vec![]).unwrap();

    assert_eq!(expected, vec![Value::Int(2)]);
    assert_eq!(expected, actual);
    assert_eq!(item.field("price").unwrap(), Value::Float(3.5));
    let Value::Record(item_record) = item_record else {
        panic!("expected a record");
    };
    assert_eq!(item_record.borrow().get("price"), Some(&Value::Float(3.5)));
}
