//! Key-range compiler.

use super::{KeyRange, KeyRangeDescriptor, KeyShape, RangeKind};
use crate::access::IndexAccess;
use crate::ast::{FuncKind, NameMeta, Node, NodeKind, OpCode};
use crate::context::CompilationContext;
use crate::eval::{EvalId, EvalNode, FuncOp};
use crate::lower::{SideChannel, Unbox};
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use quill_core::schema::{IndexDef, IndexedColumn};
use quill_core::{DataType, Error, Result, TypeDescr, Value};
use tracing::{debug, instrument, warn};

/// What one alternative of a term contributes to the lower and upper key.
#[derive(Clone, Debug)]
struct Alternative {
    op: OpCode,
    lower: Vec<EvalId>,
    upper: Vec<EvalId>,
}

impl Alternative {
    fn equal(values: Vec<EvalId>) -> Self {
        Self {
            op: OpCode::Eq,
            lower: values.clone(),
            upper: values,
        }
    }

    fn is_equality(&self) -> bool {
        self.op.range_kind(false) == Some(RangeKind::EqNa)
    }
}

/// Key columns constrained by one term.
#[derive(Debug)]
struct KeyPart {
    column: usize,
    width: usize,
    /// Operator of the term, after any operand swap.
    op: OpCode,
    alternatives: Vec<Alternative>,
}

fn describe(term: &Node) -> String {
    term.op()
        .map_or_else(|| String::from("non-operator term"), |op| format!("{:?} term", op))
}

fn invalid(term: &Node) -> Error {
    warn!(term = %describe(term), "no usable key operand");
    Error::invalid_key_operand(describe(term))
}

/// Compiles the key ranges of one index access.
pub struct KeyRangeCompiler<'c, 'a> {
    ctx: &'c mut CompilationContext<'a>,
    access: &'c IndexAccess,
    index: &'a IndexDef,
    key_expr: Option<&'a Node>,
    side: SideChannel,
    constant: bool,
}

impl<'c, 'a> KeyRangeCompiler<'c, 'a> {
    pub fn new(ctx: &'c mut CompilationContext<'a>, access: &'c IndexAccess) -> Result<Self> {
        let catalog = ctx.catalog;
        let index = catalog.index(&access.class_name, access.index).ok_or_else(|| {
            warn!(class = %access.class_name, index = access.index.0, "index not in catalog");
            if catalog.class(&access.class_name).is_none() {
                Error::class_not_found(access.class_name.as_str())
            } else {
                Error::invalid_schema(format!(
                    "index {} of {} not found",
                    access.index.0, access.class_name
                ))
            }
        })?;
        let key_expr = match index.function_position() {
            Some(_) => Some(
                catalog
                    .index_key_expr(&access.class_name, access.index)
                    .ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "function index {} has no key expression",
                            index.name()
                        ))
                    })?,
            ),
            None => None,
        };
        Ok(Self {
            ctx,
            access,
            index,
            key_expr,
            side: SideChannel::default(),
            constant: true,
        })
    }

    /// Builds the descriptor.
    pub fn compile(mut self) -> Result<KeyRangeDescriptor> {
        let access = self.access;
        let mut parts = Vec::with_capacity(access.key_terms.len() + 1);
        for term in &access.key_terms {
            parts.push(self.part(term)?);
        }

        let mut iss_placeholder = false;
        if access.flags.skip_scan && !parts.iter().any(|p| p.column == 0) {
            let term = self.skip_scan_term()?;
            parts.push(self.part(&term)?);
            iss_placeholder = true;
            self.constant = false;
        }

        parts.sort_by_key(|p| p.column);
        self.check_coverage(&parts)?;
        let ranges = self.ranges(&parts)?;

        let mut shape = match parts.last().map(|p| p.op) {
            Some(OpCode::Eq | OpCode::BetweenEqNa) => KeyShape::Single,
            Some(OpCode::IsIn | OpCode::EqSome) => KeyShape::List,
            Some(OpCode::Range) => KeyShape::RangeList,
            _ => KeyShape::Range,
        };
        if ranges.len() > 1 {
            shape = match shape {
                KeyShape::Single => KeyShape::List,
                KeyShape::Range => KeyShape::RangeList,
                other => other,
            };
        }

        let limit = if access.limit_terms.is_empty() {
            None
        } else {
            self.ctx.compile_key_limit(&access.limit_terms, None)?
        };

        debug!(
            index = self.index.name(),
            ?shape,
            ranges = ranges.len(),
            constant = self.constant,
            iss_placeholder,
            "key range compiled"
        );
        Ok(KeyRangeDescriptor {
            index: access.index,
            shape,
            ranges,
            is_constant: self.constant,
            iss_placeholder,
            descending: access.flags.descending,
            covering: access.flags.covering,
            limit,
            side: self.side,
        })
    }

    fn part(&mut self, term: &Node) -> Result<KeyPart> {
        let expr = term.as_expr().ok_or_else(|| invalid(term))?;
        let (Some(arg1), Some(arg2)) = (expr.arg1.as_deref(), expr.arg2.as_deref()) else {
            return Err(invalid(term));
        };
        match expr.op {
            OpCode::Eq | OpCode::Gt | OpCode::Ge | OpCode::Lt | OpCode::Le => {
                self.comparison_part(term, expr.op, arg1, arg2)
            }
            OpCode::IsIn | OpCode::EqSome => self.list_part(term, arg1, arg2),
            OpCode::Range => self.range_part(term, arg1, arg2),
            op if op == OpCode::Between || op.is_range_bound() => {
                let column = self.key_column(arg1).ok_or_else(|| invalid(term))?;
                let alternative = match arg2.as_expr() {
                    Some(pair) if pair.op == OpCode::BetweenAnd => {
                        let low = pair.arg1.as_deref().ok_or_else(|| invalid(term))?;
                        self.bounded(term, op, low, pair.arg2.as_deref())?
                    }
                    _ => self.bounded(term, op, arg2, None)?,
                };
                Ok(KeyPart {
                    column,
                    width: 1,
                    op,
                    alternatives: vec![alternative],
                })
            }
            _ => Err(invalid(term)),
        }
    }

    /// `attr op key`, trying the written orientation first and the
    /// converse one when that side is not a usable key.
    fn comparison_part(
        &mut self,
        term: &Node,
        op: OpCode,
        arg1: &Node,
        arg2: &Node,
    ) -> Result<KeyPart> {
        let candidates = [(arg1, arg2, Some(op)), (arg2, arg1, op.converse())];
        for (attr, key, op) in candidates {
            let (Some(op), Some(column)) = (op, self.key_column(attr)) else {
                continue;
            };
            let id = self.ctx.lower_node(key, Unbox::AsValue, &mut self.side)?;
            if !self.is_valid_operand(id) {
                debug!(column, repr = self.ctx.eval(id).tag(), "key side not usable");
                continue;
            }
            self.note_constant(id);
            let alternative = match op {
                OpCode::Eq => Alternative::equal(vec![id]),
                OpCode::Gt | OpCode::Ge => Alternative {
                    op,
                    lower: vec![id],
                    upper: Vec::new(),
                },
                _ => Alternative {
                    op,
                    lower: Vec::new(),
                    upper: vec![id],
                },
            };
            return Ok(KeyPart {
                column,
                width: 1,
                op,
                alternatives: vec![alternative],
            });
        }
        Err(invalid(term))
    }

    /// `attr IN (...)`, or `(attr1, attr2) IN ((..), (..))` over adjacent
    /// key columns.
    fn list_part(&mut self, term: &Node, attr: &Node, set: &Node) -> Result<KeyPart> {
        let columns = match self.key_column(attr) {
            Some(column) => vec![column],
            None => self.tuple_columns(attr).ok_or_else(|| invalid(term))?,
        };
        let width = columns.len();

        let mut order: Vec<usize> = (0..width).collect();
        order.sort_by_key(|&i| columns[i]);
        let first = columns[order[0]];
        if order.iter().enumerate().any(|(k, &i)| columns[i] != first + k) {
            warn!(?columns, "tuple does not cover adjacent key columns");
            return Err(Error::invalid_key_operand(format!(
                "{} over non-adjacent key columns",
                describe(term)
            )));
        }

        let elements = self.list_elements(term, set, width)?;
        if elements.is_empty() {
            return Err(invalid(term));
        }
        let alternatives = elements
            .into_iter()
            .map(|values| Alternative::equal(order.iter().map(|&i| values[i]).collect()))
            .collect();
        Ok(KeyPart {
            column: first,
            width,
            op: OpCode::IsIn,
            alternatives,
        })
    }

    fn list_elements(&mut self, term: &Node, set: &Node, width: usize) -> Result<Vec<Vec<EvalId>>> {
        match &set.kind {
            NodeKind::Function(func) if func.kind.is_collection_constructor() => func
                .args
                .iter()
                .map(|element| self.list_element(term, element, width))
                .collect(),
            NodeKind::Value(Value::Collection(_, items)) => {
                let fallback = set.descr.elements.first();
                items
                    .iter()
                    .map(|item| match (width, item) {
                        (1, _) => Ok(vec![self.literal_operand(item, fallback)?]),
                        (_, Value::Collection(_, parts)) if parts.len() == width => {
                            parts.iter().map(|p| self.literal_operand(p, None)).collect()
                        }
                        _ => Err(self.arity_mismatch(term)),
                    })
                    .collect()
            }
            NodeKind::HostVar { index, .. } if width == 1 => self.host_elements(term, set, *index),
            _ => Err(invalid(term)),
        }
    }

    fn list_element(&mut self, term: &Node, element: &Node, width: usize) -> Result<Vec<EvalId>> {
        if width == 1 {
            return Ok(vec![self.key_operand(term, element)?]);
        }
        match &element.kind {
            NodeKind::Function(func)
                if func.kind.is_collection_constructor() && func.args.len() == width =>
            {
                func.args.iter().map(|arg| self.key_operand(term, arg)).collect()
            }
            NodeKind::Value(Value::Collection(_, items)) if items.len() == width => {
                items.iter().map(|v| self.literal_operand(v, None)).collect()
            }
            _ => Err(self.arity_mismatch(term)),
        }
    }

    /// Elements of a collection bound to a host variable, read by position.
    fn host_elements(&mut self, term: &Node, set: &Node, index: usize) -> Result<Vec<Vec<EvalId>>> {
        let Some(bound) = self.ctx.host_params().value(index).cloned() else {
            warn!(index, "IN over an unbound host variable");
            return Err(invalid(term));
        };
        let Some(count) = bound.as_collection().map(<[Value]>::len) else {
            return Err(invalid(term));
        };

        let host = self.ctx.lower_node(set, Unbox::AsValue, &mut self.side)?;
        let element = bound
            .descr()
            .elements
            .into_iter()
            .next()
            .or_else(|| set.descr.elements.first().cloned())
            .unwrap_or_else(|| TypeDescr::new(DataType::Null));
        let domain = self.ctx.resolve(&element)?;

        (0..count)
            .map(|position| {
                let cell = self.ctx.alloc_cell(domain)?;
                let id = self.ctx.alloc_eval(EvalNode::FunctionCall {
                    op: FuncOp::CollectionElement { position },
                    operands: vec![host],
                    result_domain: domain,
                    cell,
                })?;
                self.note_constant(id);
                Ok(vec![id])
            })
            .collect()
    }

    fn range_part(&mut self, term: &Node, attr: &Node, ranges: &Node) -> Result<KeyPart> {
        let column = self.key_column(attr).ok_or_else(|| invalid(term))?;
        let NodeKind::OrChain(ranges) = &ranges.kind else {
            return Err(invalid(term));
        };
        let mut alternatives = Vec::with_capacity(ranges.len());
        for range in ranges {
            let sub = range.as_expr().ok_or_else(|| invalid(term))?;
            let first = sub.arg1.as_deref().ok_or_else(|| invalid(term))?;
            alternatives.push(self.bounded(term, sub.op, first, sub.arg2.as_deref())?);
        }
        if alternatives.is_empty() {
            return Err(invalid(term));
        }
        Ok(KeyPart {
            column,
            width: 1,
            op: OpCode::Range,
            alternatives,
        })
    }

    fn bounded(
        &mut self,
        term: &Node,
        op: OpCode,
        first: &Node,
        second: Option<&Node>,
    ) -> Result<Alternative> {
        let kind = op.range_kind(false).ok_or_else(|| invalid(term))?;
        let first = self.key_operand(term, first)?;
        let alternative = match kind {
            RangeKind::EqNa => Alternative::equal(vec![first]),
            RangeKind::GeInf | RangeKind::GtInf => Alternative {
                op,
                lower: vec![first],
                upper: Vec::new(),
            },
            RangeKind::InfLe | RangeKind::InfLt => Alternative {
                op,
                lower: Vec::new(),
                upper: vec![first],
            },
            _ => {
                let second = second.ok_or_else(|| invalid(term))?;
                let second = self.key_operand(term, second)?;
                Alternative {
                    op,
                    lower: vec![first],
                    upper: vec![second],
                }
            }
        };
        Ok(alternative)
    }

    fn key_operand(&mut self, term: &Node, node: &Node) -> Result<EvalId> {
        let id = self.ctx.lower_node(node, Unbox::AsValue, &mut self.side)?;
        if !self.is_valid_operand(id) {
            return Err(invalid(term));
        }
        self.note_constant(id);
        Ok(id)
    }

    fn literal_operand(&mut self, value: &Value, fallback: Option<&TypeDescr>) -> Result<EvalId> {
        let descr = match fallback {
            Some(descr) if value.is_null() => descr.clone(),
            _ => value.descr(),
        };
        let domain = self.ctx.resolve(&descr)?;
        self.ctx.constant(value.clone(), domain)
    }

    fn arity_mismatch(&self, term: &Node) -> Error {
        warn!(term = %describe(term), "tuple arity does not match key columns");
        Error::invalid_key_operand(format!("{} with a tuple of the wrong arity", describe(term)))
    }

    /// Key position of the attribute side of a term.
    fn key_column(&self, node: &Node) -> Option<usize> {
        let function_position = self.index.function_position();
        if let (Some(expr), Some(position)) = (self.key_expr, function_position) {
            if node == expr {
                return Some(position);
            }
        }
        let name = node.as_name()?;
        if name.meta != NameMeta::Normal || name.spec != self.access.spec {
            return None;
        }
        self.index
            .position_of(&name.name)
            .filter(|p| Some(*p) != function_position)
    }

    fn tuple_columns(&self, node: &Node) -> Option<Vec<usize>> {
        match &node.kind {
            NodeKind::Function(func) if func.kind == FuncKind::Sequence && func.args.len() > 1 => {
                func.args.iter().map(|arg| self.key_column(arg)).collect()
            }
            _ => None,
        }
    }

    /// A key operand must be computable before the scan reads its first
    /// row, so it may not read the scanned row itself.
    fn is_valid_operand(&self, id: EvalId) -> bool {
        match self.ctx.eval(id) {
            EvalNode::Constant { .. }
            | EvalNode::HostParameter { .. }
            | EvalNode::AttributeByPosition { .. }
            | EvalNode::ValueSlotRef { .. } => true,
            EvalNode::SubPlanResult { single_row, .. } => *single_row,
            EvalNode::AttributeById { spec, .. } => *spec != self.access.spec,
            EvalNode::Arithmetic {
                operands, condition, ..
            } => condition.is_none() && operands.iter().all(|o| self.is_valid_operand(*o)),
            EvalNode::FunctionCall { operands, .. } => {
                operands.iter().all(|o| self.is_valid_operand(*o))
            }
            EvalNode::PredicateAsValue { .. } => false,
        }
    }

    fn note_constant(&mut self, id: EvalId) {
        let constant = match self.ctx.eval(id) {
            node if node.is_constant_leaf() => true,
            EvalNode::FunctionCall {
                op: FuncOp::CollectionElement { .. },
                operands,
                ..
            } => operands.iter().all(|o| self.ctx.eval(*o).is_constant_leaf()),
            _ => false,
        };
        self.constant &= constant;
    }

    /// `leading = NULL`, standing in for the unconstrained leading column of
    /// a skip scan.
    fn skip_scan_term(&self) -> Result<Node> {
        let column = self
            .index
            .columns()
            .first()
            .ok_or_else(|| {
                Error::invalid_schema(format!("index {} has no columns", self.index.name()))
            })?;
        let attr = match (self.index.function_position(), self.key_expr) {
            (Some(0), Some(expr)) => expr.clone(),
            _ => {
                let class = self
                    .ctx
                    .catalog
                    .class(&self.access.class_name)
                    .ok_or_else(|| Error::class_not_found(self.access.class_name.as_str()))?;
                let attr = class.attribute(&column.name).ok_or_else(|| {
                    Error::invalid_schema(format!("index column {} not in class", column.name))
                })?;
                Node::name(self.access.spec, column.name.clone(), attr.descr().clone())
            }
        };
        let null = Node::null(attr.descr.clone());
        debug!(column = %column.name, "skip-scan placeholder");
        Ok(Node::eq(attr, null))
    }

    fn check_coverage(&self, parts: &[KeyPart]) -> Result<()> {
        let mut next = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.column != next {
                warn!(column = part.column, expected = next, "key terms do not form a prefix");
                return Err(Error::invalid_expression(if part.column < next {
                    format!("two key terms on column {}", part.column)
                } else {
                    format!("key column {} is unconstrained", next)
                }));
            }
            let trailing = i + 1 == parts.len();
            if !trailing && !part.alternatives.iter().all(Alternative::is_equality) {
                warn!(column = part.column, "range on a non-trailing key column");
                return Err(Error::invalid_expression(format!(
                    "range on non-trailing key column {}",
                    part.column
                )));
            }
            next += part.width;
        }
        if next > self.index.columns().len() {
            return Err(Error::invalid_expression("key terms exceed the index columns"));
        }
        Ok(())
    }

    /// One range per combination of alternatives, trailing column fastest.
    fn ranges(&mut self, parts: &[KeyPart]) -> Result<Vec<KeyRange>> {
        if parts.is_empty() {
            return Ok(vec![KeyRange {
                kind: RangeKind::InfInf,
                lower: None,
                upper: None,
            }]);
        }

        let columns: usize = parts.iter().map(|p| p.width).sum();
        let widen = self.ctx.config.widen_prefix_ranges
            && self.index.columns()[..columns].iter().any(IndexedColumn::is_prefix);

        let mut ranges = Vec::new();
        let mut choice = vec![0usize; parts.len()];
        loop {
            let alternatives: Vec<&Alternative> = parts
                .iter()
                .zip(&choice)
                .map(|(part, &c)| &part.alternatives[c])
                .collect();
            ranges.push(self.range(&alternatives, columns > 1, widen)?);

            let mut i = parts.len();
            loop {
                if i == 0 {
                    return Ok(ranges);
                }
                i -= 1;
                choice[i] += 1;
                if choice[i] < parts[i].alternatives.len() {
                    break;
                }
                choice[i] = 0;
            }
        }
    }

    fn range(
        &mut self,
        alternatives: &[&Alternative],
        multi: bool,
        widen: bool,
    ) -> Result<KeyRange> {
        let last = alternatives
            .last()
            .ok_or_else(|| Error::invalid_expression("empty key combination"))?;
        let mut kind = last
            .op
            .range_kind(multi)
            .ok_or_else(|| Error::unsupported_operator(format!("{}", last.op), "key range"))?;

        let lower: Vec<EvalId> = alternatives
            .iter()
            .flat_map(|a| a.lower.iter().copied())
            .collect();
        let upper: Vec<EvalId> = alternatives
            .iter()
            .flat_map(|a| a.upper.iter().copied())
            .collect();

        let lower = if kind.has_lower() && !lower.is_empty() {
            Some(self.key(lower)?)
        } else {
            None
        };
        let mut upper = if kind.has_upper() && !upper.is_empty() {
            Some(self.key(upper)?)
        } else {
            None
        };

        if widen {
            if kind == RangeKind::EqNa {
                upper = lower;
            }
            kind = kind.widen_for_prefix();
        }
        Ok(KeyRange { kind, lower, upper })
    }

    /// Composite keys are always tuples, even over a single component.
    fn key(&mut self, components: Vec<EvalId>) -> Result<EvalId> {
        if self.index.is_multi_column() {
            return self.ctx.key_tuple(components);
        }
        components
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid_expression("empty key"))
    }
}

impl CompilationContext<'_> {
    /// Compiles the key ranges of an index scan.
    #[instrument(
        level = "trace",
        skip(self, access),
        fields(class = %access.class_name, index = access.index.0)
    )]
    pub fn compile_key_range(&mut self, access: &IndexAccess) -> Result<KeyRangeDescriptor> {
        KeyRangeCompiler::new(self, access)?.compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FromItem, SpecId};
    use crate::catalog::MemoryCatalog;
    use crate::config::CompilerConfig;
    use quill_core::schema::{Attribute, ClassBuilder, IndexId};
    use quill_core::{CollectionKind, Oid};

    const AB: IndexId = IndexId(0);
    const A: IndexId = IndexId(1);
    const PREFIX: IndexId = IndexId(2);
    const FUNC: IndexId = IndexId(3);

    fn catalog() -> MemoryCatalog {
        let t = ClassBuilder::new("t", Oid::new(0, 1, 1))
            .unwrap()
            .add_attribute(Attribute::new("a", DataType::Integer))
            .unwrap()
            .add_attribute(Attribute::new("b", DataType::Integer))
            .unwrap()
            .add_attribute(Attribute::new("c", TypeDescr::varchar(20)))
            .unwrap()
            .add_attribute(Attribute::new("d", DataType::Integer))
            .unwrap()
            .add_index("t_ab", vec![IndexedColumn::new("a"), IndexedColumn::new("b")])
            .unwrap()
            .add_index("t_a", vec![IndexedColumn::new("a")])
            .unwrap()
            .add_index("t_c", vec![IndexedColumn::new("c").prefix(3), IndexedColumn::new("a")])
            .unwrap()
            .add_function_index(
                "t_lower_c",
                vec![IndexedColumn::new(""), IndexedColumn::new("a")],
                0,
            )
            .unwrap()
            .build();
        let u = ClassBuilder::new("u", Oid::new(0, 2, 1))
            .unwrap()
            .add_attribute(Attribute::new("x", DataType::Integer))
            .unwrap()
            .build();
        let mut catalog = MemoryCatalog::new();
        catalog.register_class(t);
        catalog.register_class(u);
        catalog.register_key_expr("t", FUNC, lower_c());
        catalog
    }

    fn col(name: &str) -> Node {
        let descr = if name == "c" {
            TypeDescr::varchar(20)
        } else {
            TypeDescr::new(DataType::Integer)
        };
        Node::name(SpecId(1), name, descr)
    }

    fn lower_c() -> Node {
        Node::unary(OpCode::Lower, col("c"), TypeDescr::varchar(20))
    }

    fn compile(
        config: CompilerConfig,
        access: IndexAccess,
    ) -> Result<(KeyRangeDescriptor, Vec<Vec<Option<Value>>>)> {
        compile_with(config, access, |_| {})
    }

    /// Compiles with both `t` (spec 1) and `u` (spec 2) active and returns
    /// the constant components of every lower key.
    fn compile_with(
        config: CompilerConfig,
        access: IndexAccess,
        setup: impl FnOnce(&mut CompilationContext<'_>),
    ) -> Result<(KeyRangeDescriptor, Vec<Vec<Option<Value>>>)> {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, config);
        ctx.push_scope(&[
            FromItem::class(SpecId(1), "t", "t"),
            FromItem::class(SpecId(2), "u", "u"),
        ])
        .unwrap();
        ctx.activate(SpecId(1)).unwrap();
        ctx.activate(SpecId(2)).unwrap();
        setup(&mut ctx);
        let descriptor = ctx.compile_key_range(&access)?;
        let keys = descriptor
            .ranges
            .iter()
            .map(|r| r.lower.map(|id| components(&ctx, id)).unwrap_or_default())
            .collect();
        Ok((descriptor, keys))
    }

    fn components(ctx: &CompilationContext<'_>, id: EvalId) -> Vec<Option<Value>> {
        match ctx.eval(id) {
            EvalNode::FunctionCall { op: FuncOp::KeyTuple, operands, .. } => operands
                .iter()
                .map(|o| ctx.eval(*o).as_constant().cloned())
                .collect(),
            other => vec![other.as_constant().cloned()],
        }
    }

    fn access(index: IndexId, terms: Vec<Node>) -> IndexAccess {
        IndexAccess::new(SpecId(1), "t", index).key_terms(terms)
    }

    fn int(v: i32) -> Option<Value> {
        Some(Value::Int32(v))
    }

    #[test]
    fn test_single_equality() {
        let (d, keys) = compile(
            CompilerConfig::default(),
            access(A, vec![Node::eq(col("a"), Node::int(5))]),
        )
        .unwrap();
        assert_eq!(d.shape, KeyShape::Single);
        assert_eq!(d.ranges.len(), 1);
        assert_eq!(d.ranges[0].kind, RangeKind::EqNa);
        assert!(d.ranges[0].upper.is_none());
        assert_eq!(keys, vec![vec![int(5)]]);
        assert!(d.is_constant);
        assert!(!d.iss_placeholder);
    }

    #[test]
    fn test_swapped_operands_use_converse() {
        let (d, keys) = compile(
            CompilerConfig::default(),
            access(A, vec![Node::lt(Node::int(5), col("a"))]),
        )
        .unwrap();
        assert_eq!(d.shape, KeyShape::Range);
        assert_eq!(d.ranges[0].kind, RangeKind::GtInf);
        assert_eq!(keys, vec![vec![int(5)]]);
    }

    #[test]
    fn test_composite_in_list() {
        let terms = vec![
            Node::in_set(col("b"), Node::set_of(vec![Node::int(1), Node::int(2), Node::int(3)])),
            Node::eq(col("a"), Node::int(5)),
        ];
        let (d, keys) = compile(CompilerConfig::default(), access(AB, terms)).unwrap();
        assert_eq!(d.shape, KeyShape::List);
        assert_eq!(
            keys,
            vec![vec![int(5), int(1)], vec![int(5), int(2)], vec![int(5), int(3)]]
        );
        assert!(d.ranges.iter().all(|r| r.kind == RangeKind::EqNa));
        assert!(d.is_constant);
    }

    #[test]
    fn test_leading_in_list_multiplies_ranges() {
        let terms = vec![
            Node::in_set(col("a"), Node::set_of(vec![Node::int(1), Node::int(2)])),
            Node::gt(col("b"), Node::int(7)),
        ];
        let (d, keys) = compile(CompilerConfig::default(), access(AB, terms)).unwrap();
        assert_eq!(d.shape, KeyShape::RangeList);
        assert_eq!(keys, vec![vec![int(1), int(7)], vec![int(2), int(7)]]);
        assert!(d.ranges.iter().all(|r| r.kind == RangeKind::GtLe));
    }

    #[test]
    fn test_composite_trailing_range() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.push_scope(&[FromItem::class(SpecId(1), "t", "t")]).unwrap();
        let terms = vec![Node::eq(col("a"), Node::int(1)), Node::gt(col("b"), Node::int(7))];
        let d = ctx.compile_key_range(&access(AB, terms)).unwrap();
        assert_eq!(d.shape, KeyShape::Range);
        let range = d.ranges[0];
        assert_eq!(range.kind, RangeKind::GtLe);
        assert_eq!(components(&ctx, range.lower.unwrap()), vec![int(1), int(7)]);
        assert_eq!(components(&ctx, range.upper.unwrap()), vec![int(1)]);
    }

    #[test]
    fn test_partial_key_is_tuple() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.push_scope(&[FromItem::class(SpecId(1), "t", "t")]).unwrap();
        let d = ctx.compile_key_range(&access(AB, vec![Node::eq(col("a"), Node::int(5))])).unwrap();
        let lower = d.ranges[0].lower.unwrap();
        assert!(matches!(
            ctx.eval(lower),
            EvalNode::FunctionCall { op: FuncOp::KeyTuple, operands, .. } if operands.len() == 1
        ));
    }

    #[test]
    fn test_range_list() {
        let term = Node::range(
            col("a"),
            vec![
                Node::sub_range(OpCode::BetweenEqNa, Node::int(3), None),
                Node::sub_range(OpCode::BetweenGeLt, Node::int(5), Some(Node::int(8))),
                Node::sub_range(OpCode::BetweenGtInf, Node::int(20), None),
                Node::sub_range(OpCode::BetweenInfLe, Node::int(-1), None),
            ],
        );
        let (d, _) = compile(CompilerConfig::default(), access(A, vec![term])).unwrap();
        assert_eq!(d.shape, KeyShape::RangeList);
        let kinds: Vec<_> = d.ranges.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RangeKind::EqNa, RangeKind::GeLt, RangeKind::GtInf, RangeKind::InfLe]
        );
        assert!(d.ranges[1].lower.is_some() && d.ranges[1].upper.is_some());
        assert!(d.ranges[2].upper.is_none());
        assert!(d.ranges[3].lower.is_none() && d.ranges[3].upper.is_some());
    }

    #[test]
    fn test_between() {
        let term = Node::between(OpCode::Between, col("a"), Node::int(1), Node::int(9));
        let (d, keys) = compile(CompilerConfig::default(), access(A, vec![term])).unwrap();
        assert_eq!(d.shape, KeyShape::Range);
        assert_eq!(d.ranges[0].kind, RangeKind::GeLe);
        assert_eq!(keys, vec![vec![int(1)]]);
        assert!(d.ranges[0].upper.is_some());
    }

    #[test]
    fn test_host_parameter_keeps_constant() {
        let term = Node::eq(col("a"), Node::host(0, DataType::Integer));
        let (d, keys) = compile(CompilerConfig::default(), access(A, vec![term])).unwrap();
        assert!(d.is_constant);
        assert_eq!(keys, vec![vec![None]]);
    }

    #[test]
    fn test_outer_attribute_is_not_constant() {
        let term = Node::eq(col("a"), Node::name(SpecId(2), "x", DataType::Integer));
        let (d, _) = compile(CompilerConfig::default(), access(A, vec![term])).unwrap();
        assert!(!d.is_constant);
        assert_eq!(d.shape, KeyShape::Single);

        let arith = Node::eq(
            col("a"),
            Node::binary(OpCode::Plus, Node::int(1), Node::int(2), DataType::Integer),
        );
        let (d, _) = compile(CompilerConfig::default(), access(A, vec![arith])).unwrap();
        assert!(!d.is_constant);
    }

    #[test]
    fn test_scanned_attribute_is_invalid_operand() {
        let term = Node::eq(col("a"), col("d"));
        let err = compile(CompilerConfig::default(), access(A, vec![term])).unwrap_err();
        assert_eq!(err.category(), "invalid-key-operand");

        let predicate = Node::eq(col("a"), Node::lt(Node::int(1), Node::int(2)));
        let err = compile(CompilerConfig::default(), access(A, vec![predicate])).unwrap_err();
        assert_eq!(err.category(), "invalid-key-operand");
    }

    #[test]
    fn test_key_column_gap() {
        let err = compile(
            CompilerConfig::default(),
            access(AB, vec![Node::eq(col("b"), Node::int(1))]),
        )
        .unwrap_err();
        assert_eq!(err.category(), "invalid-expression");

        let terms = vec![Node::gt(col("a"), Node::int(1)), Node::eq(col("b"), Node::int(2))];
        let err = compile(CompilerConfig::default(), access(AB, terms)).unwrap_err();
        assert_eq!(err.category(), "invalid-expression");
    }

    #[test]
    fn test_skip_scan_placeholder() {
        let access = access(AB, vec![Node::eq(col("b"), Node::int(4))]).skip_scan();
        let (d, keys) = compile(CompilerConfig::default(), access).unwrap();
        assert!(d.iss_placeholder);
        assert!(!d.is_constant);
        assert_eq!(keys, vec![vec![Some(Value::Null), int(4)]]);
    }

    #[test]
    fn test_prefix_widening() {
        let gt = Node::gt(col("c"), Node::value("abcdef"));
        let (d, _) = compile(CompilerConfig::default(), access(PREFIX, vec![gt.clone()])).unwrap();
        assert_eq!(d.ranges[0].kind, RangeKind::GeInf);

        let (d, _) = compile(
            CompilerConfig::new().widen_prefix_ranges(false),
            access(PREFIX, vec![gt]),
        )
        .unwrap();
        assert_eq!(d.ranges[0].kind, RangeKind::GtInf);

        let eq = Node::eq(col("c"), Node::value("abcdef"));
        let (d, _) = compile(CompilerConfig::default(), access(PREFIX, vec![eq])).unwrap();
        assert_eq!(d.ranges[0].kind, RangeKind::GeLe);
        assert_eq!(d.ranges[0].lower, d.ranges[0].upper);
    }

    #[test]
    fn test_function_index_key() {
        let terms = vec![
            Node::eq(col("a"), Node::int(1)),
            Node::eq(lower_c(), Node::value("x")),
        ];
        let (d, keys) = compile(CompilerConfig::default(), access(FUNC, terms)).unwrap();
        assert_eq!(d.shape, KeyShape::Single);
        assert_eq!(keys, vec![vec![Some(Value::from("x")), int(1)]]);
    }

    #[test]
    fn test_host_collection_in() {
        let term = Node::in_set(col("a"), Node::host(0, DataType::Maybe));
        let setup = |ctx: &mut CompilationContext<'_>| {
            let items = vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)];
            ctx.bind_host(0, Value::Collection(CollectionKind::Set, items));
        };
        let (d, keys) =
            compile_with(CompilerConfig::default(), access(A, vec![term]), setup).unwrap();
        assert_eq!(d.shape, KeyShape::List);
        assert_eq!(keys.len(), 3);
        assert!(d.is_constant);

        let unbound = Node::in_set(col("a"), Node::host(1, DataType::Maybe));
        let err = compile(CompilerConfig::default(), access(A, vec![unbound])).unwrap_err();
        assert_eq!(err.category(), "invalid-key-operand");
    }

    #[test]
    fn test_tuple_in_follows_index_order() {
        let attrs = Node::collection(FuncKind::Sequence, vec![col("b"), col("a")]);
        let set = Node::set_of(vec![
            Node::collection(FuncKind::Sequence, vec![Node::int(1), Node::int(10)]),
            Node::collection(FuncKind::Sequence, vec![Node::int(2), Node::int(20)]),
        ]);
        let (d, keys) = compile(
            CompilerConfig::default(),
            access(AB, vec![Node::in_set(attrs, set)]),
        )
        .unwrap();
        assert_eq!(d.shape, KeyShape::List);
        assert_eq!(keys, vec![vec![int(10), int(1)], vec![int(20), int(2)]]);

        let attrs = Node::collection(FuncKind::Sequence, vec![col("a"), col("b")]);
        let short = Node::set_of(vec![Node::collection(FuncKind::Sequence, vec![Node::int(1)])]);
        let err = compile(
            CompilerConfig::default(),
            access(AB, vec![Node::in_set(attrs, short)]),
        )
        .unwrap_err();
        assert_eq!(err.category(), "invalid-key-operand");
    }

    #[test]
    fn test_flags_and_limit() {
        let access = access(A, vec![Node::ge(col("a"), Node::int(0))])
            .descending()
            .covering()
            .limit_terms(vec![Node::le(
                Node::nullary(OpCode::RowNum, DataType::BigInt),
                Node::int(10),
            )]);
        let (d, _) = compile(CompilerConfig::default(), access).unwrap();
        assert!(d.descending && d.covering);
        let limit = d.limit.unwrap();
        assert!(limit.lower.is_none() && limit.upper.is_some());
    }

    #[test]
    fn test_no_terms_scans_everything() {
        let (d, _) = compile(CompilerConfig::default(), access(A, vec![])).unwrap();
        assert_eq!(d.ranges, vec![KeyRange { kind: RangeKind::InfInf, lower: None, upper: None }]);
        assert!(d.is_constant);
    }

    #[test]
    fn test_unknown_index() {
        let err = compile(CompilerConfig::default(), access(IndexId(9), vec![])).unwrap_err();
        assert_eq!(err.category(), "invalid-schema");
        let err = compile(
            CompilerConfig::default(),
            IndexAccess::new(SpecId(1), "nope", A),
        )
        .unwrap_err();
        assert_eq!(err.category(), "class-not-found");
    }
}
