//! Property-based tests for key-range compilation.

use proptest::prelude::*;
use quill_core::schema::{Attribute, ClassBuilder, IndexId, IndexedColumn};
use quill_core::{DataType, Oid, TypeDescr, Value};
use quill_query::ast::{FromItem, Node, OpCode, SpecId};
use quill_query::catalog::MemoryCatalog;
use quill_query::config::CompilerConfig;
use quill_query::context::CompilationContext;
use quill_query::eval::FuncOp;
use quill_query::{EvalId, EvalNode, IndexAccess, KeyRangeDescriptor, KeyShape, RangeKind};

const ABC: IndexId = IndexId(0);
const A: IndexId = IndexId(1);
const NAME: IndexId = IndexId(2);

fn catalog() -> MemoryCatalog {
    let t = ClassBuilder::new("t", Oid::new(0, 1, 0))
        .unwrap()
        .add_attribute(Attribute::new("a", DataType::Integer))
        .unwrap()
        .add_attribute(Attribute::new("b", DataType::Integer))
        .unwrap()
        .add_attribute(Attribute::new("c", DataType::Integer))
        .unwrap()
        .add_attribute(Attribute::new("name", TypeDescr::varchar(40)))
        .unwrap()
        .add_index(
            "t_abc",
            vec![IndexedColumn::new("a"), IndexedColumn::new("b"), IndexedColumn::new("c")],
        )
        .unwrap()
        .add_index("t_a", vec![IndexedColumn::new("a")])
        .unwrap()
        .add_index("t_name", vec![IndexedColumn::new("name").prefix(4)])
        .unwrap()
        .build();
    let u = ClassBuilder::new("u", Oid::new(0, 2, 0))
        .unwrap()
        .add_attribute(Attribute::new("x", DataType::Integer))
        .unwrap()
        .build();
    let mut catalog = MemoryCatalog::new();
    catalog.register_class(t);
    catalog.register_class(u);
    catalog
}

fn col(name: &str) -> Node {
    Node::name(SpecId(1), name, DataType::Integer)
}

/// Compiles with `t` (spec 1) as the scanned relation and `u` (spec 2) as
/// an outer relation.
fn compile(
    access: &IndexAccess,
    config: CompilerConfig,
) -> (KeyRangeDescriptor, Vec<Vec<Option<Value>>>) {
    let catalog = catalog();
    let mut ctx = CompilationContext::new(&catalog, config);
    ctx.push_scope(&[
        FromItem::class(SpecId(1), "t", "t"),
        FromItem::class(SpecId(2), "u", "u"),
    ])
    .unwrap();
    ctx.activate(SpecId(1)).unwrap();
    ctx.activate(SpecId(2)).unwrap();
    let descriptor = ctx.compile_key_range(access).unwrap();
    let keys = descriptor
        .ranges
        .iter()
        .flat_map(|r| [r.lower, r.upper])
        .flatten()
        .map(|id| components(&ctx, id))
        .collect();
    (descriptor, keys)
}

fn components(ctx: &CompilationContext<'_>, id: EvalId) -> Vec<Option<Value>> {
    match ctx.eval(id) {
        EvalNode::FunctionCall {
            op: FuncOp::KeyTuple,
            operands,
            ..
        } => operands.iter().map(|o| ctx.eval(*o).as_constant().cloned()).collect(),
        other => vec![other.as_constant().cloned()],
    }
}

fn comparison_strategy() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Eq),
        Just(OpCode::Lt),
        Just(OpCode::Le),
        Just(OpCode::Gt),
        Just(OpCode::Ge),
    ]
}

#[test]
fn equality_prefix_with_in_list() {
    let access = IndexAccess::new(SpecId(1), "t", ABC).key_terms(vec![
        Node::eq(col("a"), Node::int(5)),
        Node::in_set(col("b"), Node::set_of(vec![Node::int(1), Node::int(2), Node::int(3)])),
    ]);
    let (d, keys) = compile(&access, CompilerConfig::default());
    assert_eq!(d.shape, KeyShape::List);
    assert_eq!(d.len(), 3);
    assert!(d.ranges.iter().all(|r| r.kind == RangeKind::EqNa && r.upper.is_none()));
    let expected: Vec<Vec<Option<Value>>> = (1..=3)
        .map(|b| vec![Some(Value::Int32(5)), Some(Value::Int32(b))])
        .collect();
    assert_eq!(keys, expected);
    assert!(d.is_constant);
}

proptest! {
    /// Property: key components follow index column order whatever the
    /// order of the assigned terms.
    #[test]
    fn composite_key_ignores_term_order(
        (a, b, c) in (-50i32..50, -50i32..50, -50i32..50),
        terms in Just(vec![0usize, 1, 2]).prop_shuffle(),
        last in comparison_strategy(),
    ) {
        let build = |i: usize| match i {
            0 => Node::eq(col("a"), Node::int(a)),
            1 => Node::eq(col("b"), Node::int(b)),
            _ => Node::compare(last, col("c"), Node::int(c)),
        };
        let shuffled = IndexAccess::new(SpecId(1), "t", ABC)
            .key_terms(terms.iter().map(|&i| build(i)).collect());
        let ordered = IndexAccess::new(SpecId(1), "t", ABC).key_terms((0..3).map(build).collect());

        let (d1, k1) = compile(&shuffled, CompilerConfig::default());
        let (d2, k2) = compile(&ordered, CompilerConfig::default());
        prop_assert_eq!(d1.shape, d2.shape);
        prop_assert_eq!(d1.ranges[0].kind, d2.ranges[0].kind);
        prop_assert_eq!(&k1, &k2);
        prop_assert_eq!(&k1[0][..2], &[Some(Value::Int32(a)), Some(Value::Int32(b))][..]);
    }

    /// Property: `attr op v` and `v converse(op) attr` compile identically.
    #[test]
    fn swapped_operands_compile_identically(op in comparison_strategy(), v in -100i32..100) {
        let written = IndexAccess::new(SpecId(1), "t", A)
            .key_terms(vec![Node::compare(op, col("a"), Node::int(v))]);
        let converse = op.converse().unwrap();
        let swapped = IndexAccess::new(SpecId(1), "t", A)
            .key_terms(vec![Node::compare(converse, Node::int(v), col("a"))]);

        let (d1, k1) = compile(&written, CompilerConfig::default());
        let (d2, k2) = compile(&swapped, CompilerConfig::default());
        prop_assert_eq!(d1.ranges[0].kind, d2.ranges[0].kind);
        prop_assert_eq!(d1.shape, d2.shape);
        prop_assert_eq!(k1, k2);
    }

    /// Property: a descriptor is constant exactly when no key reads an
    /// outer row.
    #[test]
    fn constant_flag_tracks_outer_references(outer in prop::collection::vec(any::<bool>(), 3)) {
        let key = |i: usize, host: usize| {
            if outer[i] {
                Node::name(SpecId(2), "x", DataType::Integer)
            } else {
                Node::host(host, DataType::Integer)
            }
        };
        let access = IndexAccess::new(SpecId(1), "t", ABC).key_terms(vec![
            Node::eq(col("a"), key(0, 0)),
            Node::eq(col("b"), key(1, 1)),
            Node::le(col("c"), key(2, 2)),
        ]);
        let (d, _) = compile(&access, CompilerConfig::default());
        prop_assert_eq!(d.is_constant, !outer.iter().any(|o| *o));
    }

    /// Property: ranges over a prefix-length column never carry an
    /// exclusive bound.
    #[test]
    fn prefix_ranges_are_inclusive(op in comparison_strategy(), s in "[a-z]{1,8}") {
        let name = Node::name(SpecId(1), "name", TypeDescr::varchar(40));
        let access = IndexAccess::new(SpecId(1), "t", NAME)
            .key_terms(vec![Node::compare(op, name, Node::value(s.as_str()))]);
        let (d, _) = compile(&access, CompilerConfig::default());
        let kind = d.ranges[0].kind;
        prop_assert!(!kind.lower_exclusive() && !kind.upper_exclusive());
        prop_assert!(kind != RangeKind::EqNa);
        if op == OpCode::Eq {
            prop_assert_eq!(d.ranges[0].lower, d.ranges[0].upper);
        }
    }

    /// Property: skip scan puts a placeholder on the leading column and
    /// keeps the given key components after it.
    #[test]
    fn skip_scan_prefixes_placeholder(b in -50i32..50) {
        let access = IndexAccess::new(SpecId(1), "t", ABC)
            .key_terms(vec![Node::eq(col("b"), Node::int(b))])
            .skip_scan();
        let (d, keys) = compile(&access, CompilerConfig::default());
        prop_assert!(d.iss_placeholder);
        prop_assert!(!d.is_constant);
        prop_assert_eq!(&keys[0], &vec![Some(Value::Null), Some(Value::Int32(b))]);
    }
}
