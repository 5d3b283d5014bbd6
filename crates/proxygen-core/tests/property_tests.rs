//! Randomized method bodies over `Counter`: the generated code must behave
//! like the method as written, and rewriting its output changes nothing.

use bumpalo::Bump;
use proptest::prelude::*;
use proxygen_core::ast::Declaration;
use proxygen_core::{CompilationSession, GeneratorConfig};
use proxygen_test_helpers::fixtures::counter_schema;
use proxygen_test_helpers::{parse_methods, rewrite_source, Executor, FakeRecord, Value};

#[derive(Debug, Clone)]
enum Op {
    Add(i64),
    Scale(i64),
    Inc,
    Dec,
    Label(&'static str),
    SwapWithParam,
    Guarded(i64),
    CountUp(i64),
}

impl Op {
    fn source(&self) -> String {
        match self {
            Op::Add(k) => format!("c.value += {k}"),
            Op::Scale(k) => format!("c.value = c.value * {k}"),
            Op::Inc => "c.value++".to_string(),
            Op::Dec => "c.value--".to_string(),
            Op::Label(text) => format!("c.label = c.label + \"{text}\""),
            Op::SwapWithParam => "c.value, n = n, c.value".to_string(),
            Op::Guarded(k) => format!("if c.value > {k} {{\n        c.value--\n    }}"),
            Op::CountUp(k) => format!("for i := 0; i < {k}; i++ {{\n        c.value += i\n    }}"),
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..5).prop_map(Op::Add),
        (1i64..4).prop_map(Op::Scale),
        Just(Op::Inc),
        Just(Op::Dec),
        prop::sample::select(vec!["a", "b", "xy"]).prop_map(Op::Label),
        Just(Op::SwapWithParam),
        (0i64..6).prop_map(Op::Guarded),
        (0i64..4).prop_map(Op::CountUp),
    ]
}

fn method_source(ops: &[Op]) -> String {
    let mut source = String::from("func (c *Counter) Run(n int) int {\n");
    for op in ops {
        source.push_str("    ");
        source.push_str(&op.source());
        source.push('\n');
    }
    source.push_str("    return c.value + n\n}\n");
    source
}

/// Return values and final `(value, label)` of one run.
type Outcome = (Vec<Value>, Value, Value);

fn run_plain(source: &str, n: i64) -> Outcome {
    let arena = Bump::new();
    let declarations: Vec<_> = parse_methods(source, &arena)
        .unwrap()
        .into_iter()
        .map(Declaration::Func)
        .collect();
    let mut ex = Executor::new(&declarations).unwrap();
    let counter = ex.new_object(
        "Counter",
        vec![("value", Value::Int(0)), ("label", Value::from(""))],
    );
    let result = ex.call_method(&counter, "Run", vec![Value::Int(n)]).unwrap();
    (
        result,
        counter.field("value").unwrap(),
        counter.field("label").unwrap(),
    )
}

fn run_generated(source: &str, n: i64) -> Outcome {
    let schema = counter_schema();
    let arena = Bump::new();
    let methods = parse_methods(source, &arena).unwrap();
    let mut session = CompilationSession::new(&schema, GeneratorConfig::default(), &arena);
    let output = session.generate(&methods).unwrap();
    let mut ex = Executor::new(&output.declarations).unwrap();
    let proxy = ex.new_proxy(
        "Counter",
        FakeRecord::new("counters", "c1")
            .with_value("value", 0i64)
            .with_value("label", ""),
    );
    let result = ex.call_method(&proxy, "Run", vec![Value::Int(n)]).unwrap();
    let record = proxy.record().unwrap();
    let record = record.borrow();
    (
        result,
        record.get("value").cloned().unwrap_or(Value::Nil),
        record.get("label").cloned().unwrap_or(Value::Nil),
    )
}

proptest! {
    #[test]
    fn prop_generated_methods_preserve_behavior(
        ops in prop::collection::vec(op(), 1..10),
        n in -20i64..20,
    ) {
        let source = method_source(&ops);
        prop_assert_eq!(run_plain(&source, n), run_generated(&source, n), "{}", source);
    }

    #[test]
    fn prop_rewrite_is_idempotent(ops in prop::collection::vec(op(), 1..10)) {
        let schema = counter_schema();
        let once = rewrite_source(&schema, &method_source(&ops)).unwrap();
        let twice = rewrite_source(&schema, &once).unwrap();
        prop_assert_eq!(once, twice);
    }
}
