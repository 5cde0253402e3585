//! Parse-tree nodes handed to the lowerers.
//!
//! The tree is already name-resolved and type-checked: every node carries the
//! static type the checker inferred (`descr`), which may still be `Maybe` for
//! host variables whose type only the bound value reveals.

use super::op::OpCode;
use super::query::SubQuery;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use quill_core::{DataType, TypeDescr, Value};

/// Identifier of a FROM-item (spec) within a statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(pub u32);

/// Identifier of a sub-query within a statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u32);

/// Identifier assigned to an aggregate by the grouping pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateId(pub u32);

/// What a name refers to besides an ordinary instance attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum NameMeta {
    #[default]
    Normal,
    /// The instance OID pseudo-attribute.
    Oid,
    /// The OID of the instance's class.
    ClassOid,
    /// A shared attribute.
    Shared,
    /// A class attribute.
    ClassAttr,
    /// A session parameter (label) rather than a column.
    Parameter,
}

/// A resolved column reference.
#[derive(Clone, Debug, PartialEq)]
pub struct NameRef {
    /// FROM-item that supplies the attribute.
    pub spec: SpecId,
    /// Attribute name (label name for parameters).
    pub name: String,
    pub meta: NameMeta,
    /// Class owning a shared or class attribute.
    pub class_name: Option<String>,
}

/// Extra operand of SUBSTRING, TRIM and EXTRACT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Leading,
    Trailing,
    Both,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Substring,
    Substr,
}

/// Operator application.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprNode {
    pub op: OpCode,
    pub arg1: Option<Box<Node>>,
    pub arg2: Option<Box<Node>>,
    pub arg3: Option<Box<Node>>,
    pub qualifier: Option<Qualifier>,
    /// Target type of CAST.
    pub cast_type: Option<TypeDescr>,
}

impl ExprNode {
    /// Creates an operator node from up to three operands.
    pub fn new(op: OpCode, arg1: Option<Node>, arg2: Option<Node>, arg3: Option<Node>) -> Self {
        Self {
            op,
            arg1: arg1.map(Box::new),
            arg2: arg2.map(Box::new),
            arg3: arg3.map(Box::new),
            qualifier: None,
            cast_type: None,
        }
    }
}

/// Aggregate functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
    StdDev,
    Variance,
}

/// Function kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum FuncKind {
    /// `SET{...}` constructor.
    Set,
    MultiSet,
    Sequence,
    /// `TABLE(SET{...})`: arguments are read as row sources.
    TableSet,
    TableMultiSet,
    TableSequence,
    Aggregate { func: AggregateFunc, id: AggregateId },
    /// Any other named function; the checker's type is the result type.
    Generic(String),
    /// Class object of an instance.
    ClassOf,
}

impl FuncKind {
    /// Returns whether this kind builds a collection.
    pub fn is_collection_constructor(&self) -> bool {
        matches!(
            self,
            FuncKind::Set
                | FuncKind::MultiSet
                | FuncKind::Sequence
                | FuncKind::TableSet
                | FuncKind::TableMultiSet
                | FuncKind::TableSequence
        )
    }

    /// Returns whether the arguments are row sources.
    pub fn is_table_form(&self) -> bool {
        matches!(
            self,
            FuncKind::TableSet | FuncKind::TableMultiSet | FuncKind::TableSequence
        )
    }
}

/// Function application.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionNode {
    pub kind: FuncKind,
    pub args: Vec<Node>,
}

/// Node payload.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Literal.
    Value(Value),
    /// Host variable `?index`.
    HostVar {
        index: usize,
        /// Type written in the statement, `Maybe` if none.
        declared: TypeDescr,
    },
    /// Column or parameter reference.
    Name(NameRef),
    /// Operator application.
    Expr(ExprNode),
    /// Function application.
    Function(FunctionNode),
    /// Embedded sub-query.
    Query(Box<SubQuery>),
    /// Or-linked siblings. Holds the sub-ranges of a RANGE term.
    OrChain(Vec<Node>),
}

/// A type-checked parse node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Static type inferred by the checker.
    pub descr: TypeDescr,
    /// Domain the surrounding context expects, if the checker recorded one.
    pub expected: Option<TypeDescr>,
}

impl Node {
    /// Creates a node with an explicit type.
    pub fn new(kind: NodeKind, descr: impl Into<TypeDescr>) -> Self {
        Self {
            kind,
            descr: descr.into(),
            expected: None,
        }
    }

    /// Creates a literal typed after its value.
    pub fn value(value: impl Into<Value>) -> Self {
        let value = value.into();
        let descr = value.descr();
        Self::new(NodeKind::Value(value), descr)
    }

    /// Creates a NULL literal of the given type.
    pub fn null(descr: impl Into<TypeDescr>) -> Self {
        Self::new(NodeKind::Value(Value::Null), descr)
    }

    /// Creates an INTEGER literal.
    pub fn int(value: i32) -> Self {
        Self::value(Value::Int32(value))
    }

    /// Creates a logical constant.
    pub fn boolean(value: bool) -> Self {
        Self::value(Value::Boolean(value))
    }

    /// Creates a host variable reference.
    pub fn host(index: usize, descr: impl Into<TypeDescr>) -> Self {
        Self::new(
            NodeKind::HostVar {
                index,
                declared: TypeDescr::new(DataType::Maybe),
            },
            descr,
        )
    }

    /// Creates a host variable with a type written in the statement.
    pub fn host_declared(index: usize, declared: impl Into<TypeDescr>) -> Self {
        Self::new(
            NodeKind::HostVar {
                index,
                declared: declared.into(),
            },
            DataType::Maybe,
        )
    }

    /// Creates a column reference.
    pub fn name(spec: SpecId, name: impl Into<String>, descr: impl Into<TypeDescr>) -> Self {
        Self::name_with(spec, name, NameMeta::Normal, descr)
    }

    /// Creates a reference with a meta class.
    pub fn name_with(
        spec: SpecId,
        name: impl Into<String>,
        meta: NameMeta,
        descr: impl Into<TypeDescr>,
    ) -> Self {
        Self::new(
            NodeKind::Name(NameRef {
                spec,
                name: name.into(),
                meta,
                class_name: None,
            }),
            descr,
        )
    }

    /// Creates a session parameter reference.
    pub fn parameter(name: impl Into<String>, descr: impl Into<TypeDescr>) -> Self {
        Self::name_with(SpecId(0), name, NameMeta::Parameter, descr)
    }

    /// Creates an operator node with no operands.
    pub fn nullary(op: OpCode, descr: impl Into<TypeDescr>) -> Self {
        Self::new(NodeKind::Expr(ExprNode::new(op, None, None, None)), descr)
    }

    /// Creates a unary operator node.
    pub fn unary(op: OpCode, arg: Node, descr: impl Into<TypeDescr>) -> Self {
        Self::new(NodeKind::Expr(ExprNode::new(op, Some(arg), None, None)), descr)
    }

    /// Creates a binary operator node.
    pub fn binary(op: OpCode, left: Node, right: Node, descr: impl Into<TypeDescr>) -> Self {
        Self::new(
            NodeKind::Expr(ExprNode::new(op, Some(left), Some(right), None)),
            descr,
        )
    }

    /// Creates an operator node with optional operands.
    pub fn expr(
        op: OpCode,
        arg1: Option<Node>,
        arg2: Option<Node>,
        arg3: Option<Node>,
        descr: impl Into<TypeDescr>,
    ) -> Self {
        Self::new(NodeKind::Expr(ExprNode::new(op, arg1, arg2, arg3)), descr)
    }

    /// Creates a function application.
    pub fn function(kind: FuncKind, args: Vec<Node>, descr: impl Into<TypeDescr>) -> Self {
        Self::new(NodeKind::Function(FunctionNode { kind, args }), descr)
    }

    /// Creates an aggregate reference.
    pub fn aggregate(
        func: AggregateFunc,
        id: AggregateId,
        arg: Option<Node>,
        descr: impl Into<TypeDescr>,
    ) -> Self {
        Self::function(
            FuncKind::Aggregate { func, id },
            arg.into_iter().collect(),
            descr,
        )
    }

    /// Creates a collection constructor typed after its first typed argument.
    pub fn collection(kind: FuncKind, args: Vec<Node>) -> Self {
        let collection = match kind {
            FuncKind::MultiSet | FuncKind::TableMultiSet => DataType::MultiSet,
            FuncKind::Sequence | FuncKind::TableSequence => DataType::Sequence,
            _ => DataType::Set,
        };
        let elements = args
            .iter()
            .find(|a| !a.descr.is_unresolved() && a.descr.kind != DataType::Null)
            .map(|a| vec![a.descr.clone()])
            .unwrap_or_default();
        Self::function(kind, args, TypeDescr::collection(collection, elements))
    }

    /// Creates a `SET{...}` constructor.
    pub fn set_of(args: Vec<Node>) -> Self {
        Self::collection(FuncKind::Set, args)
    }

    /// Creates an embedded sub-query typed like its first column.
    pub fn query(query: SubQuery) -> Self {
        let descr = query
            .select_list
            .first()
            .map(|n| n.descr.clone())
            .unwrap_or_else(|| TypeDescr::new(DataType::Null));
        Self::new(NodeKind::Query(Box::new(query)), descr)
    }

    /// Creates a comparison.
    pub fn compare(op: OpCode, left: Node, right: Node) -> Self {
        Self::binary(op, left, right, DataType::Logical)
    }

    /// `left = right`.
    pub fn eq(left: Node, right: Node) -> Self {
        Self::compare(OpCode::Eq, left, right)
    }

    /// `left < right`.
    pub fn lt(left: Node, right: Node) -> Self {
        Self::compare(OpCode::Lt, left, right)
    }

    /// `left <= right`.
    pub fn le(left: Node, right: Node) -> Self {
        Self::compare(OpCode::Le, left, right)
    }

    /// `left > right`.
    pub fn gt(left: Node, right: Node) -> Self {
        Self::compare(OpCode::Gt, left, right)
    }

    /// `left >= right`.
    pub fn ge(left: Node, right: Node) -> Self {
        Self::compare(OpCode::Ge, left, right)
    }

    /// `left AND right`.
    pub fn and(left: Node, right: Node) -> Self {
        Self::compare(OpCode::And, left, right)
    }

    /// `left OR right`.
    pub fn or(left: Node, right: Node) -> Self {
        Self::compare(OpCode::Or, left, right)
    }

    /// `NOT arg`.
    pub fn not(arg: Node) -> Self {
        Self::unary(OpCode::Not, arg, DataType::Logical)
    }

    /// `arg IS NULL`.
    pub fn is_null(arg: Node) -> Self {
        Self::unary(OpCode::IsNull, arg, DataType::Logical)
    }

    /// `arg IS NOT NULL`.
    pub fn is_not_null(arg: Node) -> Self {
        Self::unary(OpCode::IsNotNull, arg, DataType::Logical)
    }

    /// `arg IN set`.
    pub fn in_set(arg: Node, set: Node) -> Self {
        Self::compare(OpCode::IsIn, arg, set)
    }

    /// `arg BETWEEN low AND high`, or any BETWEEN variant passed as `op`.
    pub fn between(op: OpCode, arg: Node, low: Node, high: Node) -> Self {
        let bounds = Self::binary(OpCode::BetweenAnd, low, high, DataType::Logical);
        Self::compare(op, arg, bounds)
    }

    /// `arg RANGE (...)` over a list of sub-ranges built with [`Node::sub_range`].
    pub fn range(arg: Node, ranges: Vec<Node>) -> Self {
        let chain = Self::new(NodeKind::OrChain(ranges), DataType::Logical);
        Self::compare(OpCode::Range, arg, chain)
    }

    /// One sub-range of a RANGE term.
    ///
    /// Two-bounded kinds take `(lower, Some(upper))`. `BetweenEqNa` takes the
    /// value and the half-open kinds take their single bound, with `None` as
    /// the second operand.
    pub fn sub_range(op: OpCode, first: Node, second: Option<Node>) -> Self {
        Self::expr(op, Some(first), second, None, DataType::Logical)
    }

    /// `src LIKE pattern [ESCAPE escape]`.
    pub fn like(src: Node, pattern: Node, escape: Option<Node>) -> Self {
        let pattern = match escape {
            Some(esc) => Self::binary(OpCode::LikeEscape, pattern, esc, DataType::VarChar),
            None => pattern,
        };
        Self::compare(OpCode::Like, src, pattern)
    }

    /// Records the domain the surrounding context expects.
    pub fn with_expected(mut self, expected: impl Into<TypeDescr>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Attaches a SUBSTRING/TRIM/EXTRACT qualifier.
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        if let NodeKind::Expr(expr) = &mut self.kind {
            expr.qualifier = Some(qualifier);
        }
        self
    }

    /// Sets the class owning a shared or class attribute.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        if let NodeKind::Name(name) = &mut self.kind {
            name.class_name = Some(class_name.into());
        }
        self
    }

    /// Returns the operator node, if this is one.
    pub fn as_expr(&self) -> Option<&ExprNode> {
        match &self.kind {
            NodeKind::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    /// Returns the name reference, if this is one.
    pub fn as_name(&self) -> Option<&NameRef> {
        match &self.kind {
            NodeKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the literal, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Operator code of an operator node.
    pub fn op(&self) -> Option<OpCode> {
        self.as_expr().map(|e| e.op)
    }

    /// Returns whether the node is a literal or a host variable.
    pub fn is_constant_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Value(_) | NodeKind::HostVar { .. })
    }

    /// Returns whether any operator in the subtree satisfies `pred`.
    pub fn references_op(&self, pred: &dyn Fn(OpCode) -> bool) -> bool {
        match &self.kind {
            NodeKind::Expr(expr) => {
                pred(expr.op)
                    || [&expr.arg1, &expr.arg2, &expr.arg3]
                        .into_iter()
                        .flatten()
                        .any(|arg| arg.references_op(pred))
            }
            NodeKind::Function(func) => func.args.iter().any(|a| a.references_op(pred)),
            NodeKind::OrChain(nodes) => nodes.iter().any(|n| n.references_op(pred)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_node_typed_by_value() {
        let node = Node::int(5);
        assert_eq!(node.descr.kind, DataType::Integer);
        assert!(node.is_constant_leaf());
        assert_eq!(node.as_value(), Some(&Value::Int32(5)));
    }

    #[test]
    fn test_between_shape() {
        let a = Node::name(SpecId(1), "a", DataType::Integer);
        let node = Node::between(OpCode::Between, a, Node::int(1), Node::int(9));
        let expr = node.as_expr().unwrap();
        assert_eq!(expr.op, OpCode::Between);
        assert_eq!(expr.arg2.as_ref().unwrap().op(), Some(OpCode::BetweenAnd));
        assert_eq!(node.descr.kind, DataType::Logical);
    }

    #[test]
    fn test_like_with_escape() {
        let src = Node::name(SpecId(1), "s", DataType::VarChar);
        let node = Node::like(src, Node::value("a%"), Some(Node::value("!")));
        let pattern = node.as_expr().unwrap().arg2.as_ref().unwrap();
        assert_eq!(pattern.op(), Some(OpCode::LikeEscape));
    }

    #[test]
    fn test_references_op() {
        let rownum = Node::nullary(OpCode::RowNum, DataType::BigInt);
        let node = Node::le(rownum, Node::int(10));
        assert!(node.references_op(&|op| op.is_numbering()));
        let plain = Node::le(Node::int(1), Node::int(10));
        assert!(!plain.references_op(&|op| op.is_numbering()));
    }

    #[test]
    fn test_qualifier_and_class() {
        let node = Node::unary(OpCode::Extract, Node::int(1), DataType::Integer)
            .with_qualifier(Qualifier::Year);
        assert_eq!(node.as_expr().unwrap().qualifier, Some(Qualifier::Year));

        let shared = Node::name_with(SpecId(2), "rate", NameMeta::Shared, DataType::Double)
            .with_class("emp");
        assert_eq!(shared.as_name().unwrap().class_name.as_deref(), Some("emp"));
    }
}
