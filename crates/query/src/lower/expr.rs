//! Expression lowerer.

use super::func::{empty_string_for, synthetic_kind, to_number_domain};
use super::{Lowered, NumberingFlags, SideChannel, Unbox};
use crate::ast::{ExprNode, NameMeta, NameRef, Node, NodeKind, OpCode, Qualifier};
use crate::context::CompilationContext;
use crate::eval::{EvalId, EvalNode, PredId};
use crate::scope::{oid_descr, OidKind, Resolved};
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use quill_core::{DataType, DomainId, Error, Result, TypeDescr, Value};
use tracing::{debug, instrument, warn};

fn node_tag(node: &Node) -> &'static str {
    match node.kind {
        NodeKind::Value(_) => "value",
        NodeKind::HostVar { .. } => "host-var",
        NodeKind::Name(_) => "name",
        NodeKind::Expr(_) => "expr",
        NodeKind::Function(_) => "function",
        NodeKind::Query(_) => "query",
        NodeKind::OrChain(_) => "or-chain",
    }
}

impl CompilationContext<'_> {
    /// Lowers a scalar expression.
    #[instrument(level = "trace", skip(self, node), fields(kind = node_tag(node)))]
    pub fn lower_expr(&mut self, node: &Node, unbox: Unbox) -> Result<Lowered> {
        let mut side = SideChannel::default();
        let id = self.lower_node(node, unbox, &mut side)?;
        Ok(Lowered { id, side })
    }

    /// Lowers an operand list in order.
    pub fn lower_list(
        &mut self,
        nodes: &[Node],
        unbox: Unbox,
    ) -> Result<(Vec<EvalId>, SideChannel)> {
        let mut side = SideChannel::default();
        let ids = nodes
            .iter()
            .map(|node| self.lower_node(node, unbox, &mut side))
            .collect::<Result<Vec<_>>>()?;
        Ok((ids, side))
    }

    /// Lowers a select list into positional references `0..n` of the tuple
    /// it materializes.
    pub fn lower_position_list(&mut self, nodes: &[Node]) -> Result<Vec<EvalId>> {
        nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let domain = self.resolve(&node.descr)?;
                self.alloc_eval(EvalNode::AttributeByPosition { index, domain })
            })
            .collect()
    }

    pub(crate) fn lower_node(
        &mut self,
        node: &Node,
        unbox: Unbox,
        side: &mut SideChannel,
    ) -> Result<EvalId> {
        match &node.kind {
            NodeKind::Value(value) => self.lower_constant(node, value),
            NodeKind::HostVar { index, declared } => self.lower_host_var(node, *index, declared),
            NodeKind::Name(name) => self.lower_name(node, name),
            NodeKind::Expr(expr) => self.lower_operator(node, expr, unbox, side),
            NodeKind::Function(func) => self.lower_function(node, func, side),
            NodeKind::Query(query) => self.lower_subquery(node, query, unbox),
            NodeKind::OrChain(_) => {
                warn!("or-chain in value position");
                Err(Error::unsupported_operator("RANGE list", "value position"))
            }
        }
    }

    /// Lowers an operand slot; an absent operand is a VARCHAR null.
    fn lower_operand(
        &mut self,
        arg: Option<&Node>,
        unbox: Unbox,
        side: &mut SideChannel,
    ) -> Result<EvalId> {
        match arg {
            Some(node) => self.lower_node(node, unbox, side),
            None => {
                let domain = self.resolve_kind(DataType::VarChar)?;
                self.constant(Value::Null, domain)
            }
        }
    }

    fn lower_constant(&mut self, node: &Node, value: &Value) -> Result<EvalId> {
        let domain = if node.descr.is_unresolved() {
            self.resolve(&value.descr())?
        } else {
            self.resolve(&node.descr)?
        };
        self.constant(value.clone(), domain)
    }

    /// Host parameter domain: the inferred type, then the expected-domain
    /// hint, then the declared type, then the type of the bound value.
    fn lower_host_var(
        &mut self,
        node: &Node,
        index: usize,
        declared: &TypeDescr,
    ) -> Result<EvalId> {
        let bound = self.host.value(index).cloned();
        let informative = |d: &&TypeDescr| !d.is_unresolved() && d.kind != DataType::Null;

        let descr = [Some(&node.descr), node.expected.as_ref(), Some(declared)]
            .into_iter()
            .flatten()
            .find(informative)
            .cloned()
            .or_else(|| bound.as_ref().filter(|v| !v.is_null()).map(Value::descr));

        let Some(descr) = descr else {
            warn!(index, "host variable type cannot be determined");
            return Err(Error::unresolved_domain(format!("host variable ?{}", index)));
        };
        let domain = self.resolve(&descr)?;

        match bound.as_ref().and_then(Value::data_type) {
            None => {
                if bound.is_none() {
                    self.host.set_preset(index, domain);
                }
            }
            Some(kind) => {
                let target = self.domains.kind(domain);
                if !kind.is_coercible_to(target) {
                    warn!(index, ?kind, ?target, "bound value does not fit host variable domain");
                    return Err(Error::invalid_expression(format!(
                        "value bound to ?{} is {:?}, expected {:?}",
                        index, kind, target
                    )));
                }
            }
        }
        self.alloc_eval(EvalNode::HostParameter { index, domain })
    }

    fn lower_name(&mut self, node: &Node, name: &NameRef) -> Result<EvalId> {
        match name.meta {
            NameMeta::Parameter => {
                let value = self.labels.get(&name.name).cloned().ok_or_else(|| {
                    warn!(label = %name.name, "undefined session parameter");
                    Error::unresolved_reference(name.spec.0, name.name.as_str())
                })?;
                self.lower_constant(node, &value)
            }
            NameMeta::Shared | NameMeta::ClassAttr => self.lower_stored_attribute(name),
            NameMeta::Oid | NameMeta::ClassOid => {
                let kind = if name.meta == NameMeta::Oid {
                    OidKind::Instance
                } else {
                    OidKind::Class
                };
                let object = self.resolve(&oid_descr())?;
                let resolved = self.scopes.resolve_oid(name.spec, kind, object)?;
                self.attribute_node(&resolved, name)
            }
            NameMeta::Normal => {
                let resolved = self.scopes.resolve(name.spec, &name.name)?;
                self.attribute_node(&resolved, name)
            }
        }
    }

    /// Chooses the physical representation of a resolved attribute.
    fn attribute_node(&mut self, r: &Resolved, name: &NameRef) -> Result<EvalId> {
        let node = match (r.depth, r.active, r.id, r.positional) {
            (0, true, Some(id), _) => EvalNode::AttributeById {
                id,
                spec: r.spec,
                cache: r.cache,
                domain: r.domain,
            },
            (0, _, _, Some(layout))
                if !layout.value_list_override && name.meta == NameMeta::Normal =>
            {
                EvalNode::AttributeByPosition {
                    index: layout.offset + r.position,
                    domain: r.domain,
                }
            }
            _ => EvalNode::ValueSlotRef {
                slot: r.slot,
                domain: r.domain,
            },
        };
        debug!(spec = r.spec.0, name = %name.name, depth = r.depth, repr = node.tag(), "attribute");
        self.alloc_eval(node)
    }

    /// Shared and class attributes read the value stored in the catalog.
    fn lower_stored_attribute(&mut self, name: &NameRef) -> Result<EvalId> {
        let class_name = match &name.class_name {
            Some(class) => class.clone(),
            None => self
                .scopes
                .class_of(name.spec)
                .ok_or_else(|| Error::unresolved_reference(name.spec.0, name.name.as_str()))?
                .to_owned(),
        };
        let catalog = self.catalog;
        let class = catalog.class(&class_name).ok_or_else(|| {
            warn!(class = %class_name, "owning class not found");
            Error::class_not_found(class_name.as_str())
        })?;
        let attr = class
            .attribute(&name.name)
            .ok_or_else(|| Error::unresolved_reference(name.spec.0, name.name.as_str()))?;
        let domain = self.resolve(attr.descr())?;
        self.constant(attr.stored_value(), domain)
    }

    fn lower_operator(
        &mut self,
        node: &Node,
        expr: &ExprNode,
        unbox: Unbox,
        side: &mut SideChannel,
    ) -> Result<EvalId> {
        let op = expr.op;
        if op.is_predicate() {
            if matches!(op, OpCode::BetweenAnd | OpCode::LikeEscape) || op.is_range_bound() {
                warn!(%op, "operator outside its predicate");
                return Err(Error::unsupported_operator(format!("{}", op), "value position"));
            }
            return self.lower_predicate_value(node, side);
        }

        match op {
            _ if op.is_numbering() => self.lower_numbering(op, side),
            OpCode::CurrentValue | OpCode::NextValue => self.lower_serial(expr),
            OpCode::CurrentUser => {
                let domain = self.resolve_kind(DataType::VarChar)?;
                let user = self.config.current_user.clone();
                self.constant(Value::String(user), domain)
            }
            OpCode::Case | OpCode::Decode => {
                let then = self.lower_operand(expr.arg1.as_deref(), unbox, side)?;
                let otherwise = self.lower_operand(expr.arg2.as_deref(), unbox, side)?;
                let condition = self.branch_condition(expr.arg3.as_deref(), op, side)?;
                let domain = self.resolve(&node.descr)?;
                self.arithmetic(op, vec![then, otherwise], domain, expr.qualifier, Some(condition))
            }
            OpCode::If => {
                let condition = self.branch_condition(expr.arg1.as_deref(), op, side)?;
                let then = self.lower_operand(expr.arg2.as_deref(), unbox, side)?;
                let otherwise = self.lower_operand(expr.arg3.as_deref(), unbox, side)?;
                let domain = self.resolve(&node.descr)?;
                self.arithmetic(op, vec![then, otherwise], domain, expr.qualifier, Some(condition))
            }
            OpCode::ToNumber => self.lower_to_number(expr, unbox, side),
            _ => self.lower_fixed_arity(node, expr, unbox, side),
        }
    }

    fn lower_fixed_arity(
        &mut self,
        node: &Node,
        expr: &ExprNode,
        unbox: Unbox,
        side: &mut SideChannel,
    ) -> Result<EvalId> {
        let op = expr.op;
        let Some(arity) = op.arity() else {
            warn!(%op, "operator has no value lowering");
            return Err(Error::unsupported_operator(format!("{}", op), "value position"));
        };

        let default_second = matches!(op, OpCode::Trim | OpCode::LTrim | OpCode::RTrim);
        let default_third = matches!(
            op,
            OpCode::LPad | OpCode::RPad | OpCode::Replace | OpCode::Translate
        );
        let args = [expr.arg1.as_deref(), expr.arg2.as_deref(), expr.arg3.as_deref()];

        let mut operands = Vec::with_capacity(arity.count());
        for (i, arg) in args.iter().take(arity.count()).enumerate() {
            let id = match arg {
                None if (i == 1 && default_second) || (i == 2 && default_third) => {
                    let empty = empty_string_for(args[0]);
                    self.lower_node(&empty, unbox, side)?
                }
                _ => self.lower_operand(*arg, unbox, side)?,
            };
            operands.push(id);
        }

        let domain = match (op, synthetic_kind(op)) {
            (OpCode::Cast, _) => self.resolve(expr.cast_type.as_ref().unwrap_or(&node.descr))?,
            (_, Some(kind)) => self.resolve_kind(kind)?,
            (_, None) => self.resolve(&node.descr)?,
        };
        if op == OpCode::Modulus {
            side.uses_modulus = true;
        }
        self.arithmetic(op, operands, domain, expr.qualifier, None)
    }

    /// `TO_NUMBER(x [, format])`: the result scale follows a literal format,
    /// and a third operand flags whether a format was given.
    fn lower_to_number(
        &mut self,
        expr: &ExprNode,
        unbox: Unbox,
        side: &mut SideChannel,
    ) -> Result<EvalId> {
        let value = self.lower_operand(expr.arg1.as_deref(), unbox, side)?;
        let format = self.lower_operand(expr.arg2.as_deref(), unbox, side)?;

        let int = self.resolve_kind(DataType::Integer)?;
        let no_format = i32::from(expr.arg2.is_none());
        let flag = self.constant(Value::Int32(no_format), int)?;

        let spec = match expr.arg2.as_deref() {
            None => to_number_domain(None),
            Some(arg) => match arg.as_value().and_then(Value::as_str) {
                Some(text) => to_number_domain(Some(text)),
                None => to_number_domain(Some("")),
            },
        };
        debug!(precision = spec.precision, scale = spec.scale, "to_number domain");
        let domain = self.domains.numeric(spec.precision, spec.scale)?;
        self.arithmetic(OpCode::ToNumber, vec![value, format, flag], domain, expr.qualifier, None)
    }

    /// `CURRENT_VALUE`/`NEXT_VALUE`: the serial is identified by its object id.
    fn lower_serial(&mut self, expr: &ExprNode) -> Result<EvalId> {
        let name = expr
            .arg1
            .as_deref()
            .and_then(Node::as_value)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_expression("serial name must be a string literal"))?;
        let name = name.split_once('.').map_or(name, |(_, serial)| serial);

        let oid = self.catalog.serial(name).ok_or_else(|| {
            warn!(serial = name, "serial not defined");
            Error::unresolved_reference(0, name)
        })?;
        let text = format!("{} {} {}", oid.page, oid.slot, oid.volume);
        let char_descr = TypeDescr::new(DataType::Char).precision(text.len() as u32);
        let char_domain = self.resolve(&char_descr)?;
        let id = self.constant(Value::String(text), char_domain)?;

        let numeric = self.resolve_kind(DataType::Numeric)?;
        self.arithmetic(expr.op, vec![id], numeric, expr.qualifier, None)
    }

    /// Row-numbering pseudo-columns read a statement-wide counter slot.
    fn lower_numbering(&mut self, op: OpCode, side: &mut SideChannel) -> Result<EvalId> {
        let domain = self.resolve_kind(DataType::BigInt)?;
        let existing = match op {
            OpCode::OrderByNum => self.numbering.orderbynum,
            OpCode::GroupByNum => self.numbering.groupbynum,
            _ => self.numbering.instnum,
        };
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = self.alloc_slot(domain)?;
                match op {
                    OpCode::OrderByNum => self.numbering.orderbynum = Some(slot),
                    OpCode::GroupByNum => self.numbering.groupbynum = Some(slot),
                    _ => self.numbering.instnum = Some(slot),
                }
                slot
            }
        };
        match op {
            OpCode::OrderByNum => side.numbering.orderbynum = true,
            OpCode::GroupByNum => side.numbering.groupbynum = true,
            _ => side.numbering.instnum = true,
        }
        self.alloc_eval(EvalNode::ValueSlotRef { slot, domain })
    }

    fn branch_condition(
        &mut self,
        arg: Option<&Node>,
        op: OpCode,
        side: &mut SideChannel,
    ) -> Result<PredId> {
        let arg = arg.ok_or_else(|| {
            warn!(%op, "conditional without condition");
            Error::invalid_expression(format!("{:?} without a condition", op))
        })?;
        let mut continuation = NumberingFlags::default();
        self.lower_term(arg, side, &mut continuation)
    }

    /// A predicate in value position reads as 0/1.
    fn lower_predicate_value(&mut self, node: &Node, side: &mut SideChannel) -> Result<EvalId> {
        let mut continuation = NumberingFlags::default();
        let predicate = self.lower_term(node, side, &mut continuation)?;
        let domain = self.resolve_kind(DataType::Integer)?;
        self.alloc_eval(EvalNode::PredicateAsValue { predicate, domain })
    }

    pub(crate) fn arithmetic(
        &mut self,
        op: OpCode,
        operands: Vec<EvalId>,
        result_domain: DomainId,
        qualifier: Option<Qualifier>,
        condition: Option<PredId>,
    ) -> Result<EvalId> {
        let cell = self.alloc_cell(result_domain)?;
        self.alloc_eval(EvalNode::Arithmetic {
            op,
            operands,
            result_domain,
            cell,
            qualifier,
            condition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AggregateFunc, AggregateId, FromItem, SpecId};
    use crate::catalog::MemoryCatalog;
    use crate::config::CompilerConfig;
    use crate::eval::FuncOp;
    use crate::scope::Positional;
    use alloc::string::String;
    use quill_core::schema::{AttrId, Attribute, AttributeKind, ClassBuilder};
    use quill_core::Oid;

    fn catalog() -> MemoryCatalog {
        let class = ClassBuilder::new("emp", Oid::new(0, 10, 1))
            .unwrap()
            .add_attribute(Attribute::new("id", DataType::Integer))
            .unwrap()
            .add_attribute(Attribute::new("name", TypeDescr::varchar(40)))
            .unwrap()
            .add_attribute(
                Attribute::new("rate", DataType::Double)
                    .kind(AttributeKind::Shared)
                    .default_value(Value::Float64(0.25)),
            )
            .unwrap()
            .build();
        let mut catalog = MemoryCatalog::new();
        catalog.register_class(class);
        catalog.register_serial("order_seq", Oid::new(1, 200, 7));
        catalog
    }

    fn emp() -> [FromItem; 1] {
        [FromItem::class(SpecId(1), "e", "emp")]
    }

    fn col(name: &str, kind: DataType) -> Node {
        Node::name(SpecId(1), name, kind)
    }

    #[test]
    fn test_constant_takes_node_type() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::new(NodeKind::Value(Value::Int32(3)), TypeDescr::numeric(10, 2));
        let lowered = ctx.lower_expr(&node, Unbox::AsValue).unwrap();
        let domain = ctx.eval(lowered.id).domain();
        assert_eq!(ctx.domains().get(domain).precision, 10);
        assert_eq!(lowered.side, SideChannel::default());
    }

    #[test]
    fn test_attribute_representations() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.push_scope(&emp()).unwrap();
        let name = col("name", DataType::VarChar);

        let slot = ctx.lower_expr(&name, Unbox::AsValue).unwrap();
        assert!(matches!(ctx.eval(slot.id), EvalNode::ValueSlotRef { .. }));

        ctx.set_positional(SpecId(1), Some(Positional { offset: 4, value_list_override: false }))
            .unwrap();
        let pos = ctx.lower_expr(&name, Unbox::AsValue).unwrap();
        assert!(matches!(ctx.eval(pos.id), EvalNode::AttributeByPosition { index: 5, .. }));

        ctx.set_positional(SpecId(1), Some(Positional { offset: 4, value_list_override: true }))
            .unwrap();
        let over = ctx.lower_expr(&name, Unbox::AsValue).unwrap();
        assert_eq!(ctx.eval(over.id), ctx.eval(slot.id));

        ctx.activate(SpecId(1)).unwrap();
        let by_id = ctx.lower_expr(&name, Unbox::AsValue).unwrap();
        assert!(matches!(
            ctx.eval(by_id.id),
            EvalNode::AttributeById { id: AttrId(1), spec: SpecId(1), .. }
        ));
    }

    #[test]
    fn test_correlated_attribute_reads_slot() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.push_scope(&emp()).unwrap();
        ctx.activate(SpecId(1)).unwrap();
        ctx.push_scope(&[FromItem::derived(SpecId(2), "d", vec![])]).unwrap();

        let lowered = ctx.lower_expr(&col("id", DataType::Integer), Unbox::AsValue).unwrap();
        assert!(matches!(ctx.eval(lowered.id), EvalNode::ValueSlotRef { .. }));
        assert!(ctx.pop_scope().unwrap().correlated);
    }

    #[test]
    fn test_oid_meta() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.push_scope(&emp()).unwrap();
        ctx.activate(SpecId(1)).unwrap();
        let node = Node::name_with(SpecId(1), "", NameMeta::Oid, DataType::Object);
        let lowered = ctx.lower_expr(&node, Unbox::AsValue).unwrap();
        assert!(matches!(ctx.eval(lowered.id), EvalNode::AttributeById { id: AttrId::OID, .. }));
    }

    #[test]
    fn test_shared_attribute_is_constant() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.push_scope(&emp()).unwrap();
        let node = Node::name_with(SpecId(1), "rate", NameMeta::Shared, DataType::Double);
        let lowered = ctx.lower_expr(&node, Unbox::AsValue).unwrap();
        assert_eq!(ctx.eval(lowered.id).as_constant(), Some(&Value::Float64(0.25)));

        let missing = Node::name_with(SpecId(1), "rate", NameMeta::Shared, DataType::Double)
            .with_class("dept");
        assert_eq!(
            ctx.lower_expr(&missing, Unbox::AsValue).unwrap_err(),
            Error::class_not_found("dept")
        );
    }

    #[test]
    fn test_parameter_label() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.set_label("limit", Value::Int32(10));
        let node = Node::parameter("limit", DataType::Integer);
        let lowered = ctx.lower_expr(&node, Unbox::AsValue).unwrap();
        assert_eq!(ctx.eval(lowered.id).as_constant(), Some(&Value::Int32(10)));

        let undefined = Node::parameter("other", DataType::Integer);
        assert_eq!(
            ctx.lower_expr(&undefined, Unbox::AsValue).unwrap_err().category(),
            "unresolved-reference"
        );
    }

    #[test]
    fn test_unresolved_reference() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let err = ctx.lower_expr(&col("id", DataType::Integer), Unbox::AsValue).unwrap_err();
        assert_eq!(err.category(), "unresolved-reference");
    }

    #[test]
    fn test_host_var_domain_chain() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());

        let hinted = Node::host(0, DataType::Maybe).with_expected(DataType::BigInt);
        let id = ctx.lower_expr(&hinted, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.domains().kind(ctx.eval(id).domain()), DataType::BigInt);
        assert!(ctx.host_params().preset(0).is_some());

        let declared = Node::host_declared(1, DataType::Date);
        let id = ctx.lower_expr(&declared, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.domains().kind(ctx.eval(id).domain()), DataType::Date);

        ctx.bind_host(2, Value::String(String::from("abc")));
        let bound = Node::host(2, DataType::Maybe);
        let id = ctx.lower_expr(&bound, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.domains().kind(ctx.eval(id).domain()), DataType::VarChar);
        assert_eq!(ctx.host_params().preset(2), None);

        let unknown = Node::host(3, DataType::Maybe);
        assert_eq!(
            ctx.lower_expr(&unknown, Unbox::AsValue).unwrap_err().category(),
            "unresolved-domain"
        );
    }

    #[test]
    fn test_host_var_incompatible_value() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        ctx.bind_host(0, Value::Date(10));
        let node = Node::host(0, DataType::Integer);
        assert_eq!(
            ctx.lower_expr(&node, Unbox::AsValue).unwrap_err().category(),
            "invalid-expression"
        );
    }

    #[test]
    fn test_arithmetic_cells_are_distinct() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let plus = Node::binary(OpCode::Plus, Node::int(1), Node::int(2), DataType::Integer);
        let times = Node::binary(OpCode::Times, plus.clone(), plus, DataType::Integer);
        let lowered = ctx.lower_expr(&times, Unbox::AsValue).unwrap();

        let root = ctx.eval(lowered.id);
        let ops = root.operands().to_vec();
        let cells: Vec<_> = [lowered.id, ops[0], ops[1]]
            .iter()
            .map(|id| ctx.eval(*id).result_cell().unwrap())
            .collect();
        assert_ne!(cells[0], cells[1]);
        assert_ne!(cells[1], cells[2]);
        assert_eq!(ctx.cell_count(), 3);
    }

    #[test]
    fn test_synthetic_domains() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::binary(
            OpCode::AddMonths,
            Node::value(Value::Date(1)),
            Node::int(2),
            DataType::Maybe,
        );
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.domains().kind(ctx.eval(id).domain()), DataType::Date);

        let sysdate = Node::nullary(OpCode::SysDate, DataType::Date);
        let id = ctx.lower_expr(&sysdate, Unbox::AsValue).unwrap().id;
        assert!(ctx.eval(id).operands().is_empty());

        let mut cast = Node::unary(OpCode::Cast, Node::int(1), DataType::Maybe);
        if let NodeKind::Expr(e) = &mut cast.kind {
            e.cast_type = Some(TypeDescr::varchar(8));
        }
        let id = ctx.lower_expr(&cast, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.domains().get(ctx.eval(id).domain()).precision, 8);
    }

    #[test]
    fn test_unresolved_operator_domain() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::binary(OpCode::Plus, Node::int(1), Node::int(2), DataType::Maybe);
        assert_eq!(
            ctx.lower_expr(&node, Unbox::AsValue).unwrap_err().category(),
            "unresolved-domain"
        );
    }

    #[test]
    fn test_trim_default_and_qualifier() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::unary(OpCode::Trim, Node::null(DataType::NChar), DataType::VarNChar)
            .with_qualifier(Qualifier::Both);
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        match ctx.eval(id) {
            EvalNode::Arithmetic { operands, qualifier, .. } => {
                assert_eq!(operands.len(), 2);
                assert_eq!(*qualifier, Some(Qualifier::Both));
                assert_eq!(
                    ctx.eval(operands[1]).as_constant(),
                    Some(&Value::NString(String::new()))
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lpad_default_third_operand() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::binary(OpCode::LPad, Node::value("ab"), Node::int(5), DataType::VarChar);
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        let third = ctx.eval(id).operands()[2];
        assert_eq!(ctx.eval(third).as_constant(), Some(&Value::String(String::new())));
    }

    #[test]
    fn test_absent_operand_is_varchar_null() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::unary(OpCode::Substring, Node::value("abc"), DataType::VarChar);
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        let ops = ctx.eval(id).operands().to_vec();
        assert_eq!(ops.len(), 3);
        assert_eq!(ctx.eval(ops[2]).as_constant(), Some(&Value::Null));
        assert_eq!(ctx.domains().kind(ctx.eval(ops[2]).domain()), DataType::VarChar);
    }

    #[test]
    fn test_modulus_side_channel() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::binary(OpCode::Modulus, Node::int(7), Node::int(2), DataType::Integer);
        assert!(ctx.lower_expr(&node, Unbox::AsValue).unwrap().side.uses_modulus);
        let node = Node::binary(OpCode::Plus, Node::int(7), Node::int(2), DataType::Integer);
        assert!(!ctx.lower_expr(&node, Unbox::AsValue).unwrap().side.uses_modulus);
    }

    #[test]
    fn test_to_number() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::binary(
            OpCode::ToNumber,
            Node::value("12.5"),
            Node::value("99.99"),
            DataType::Numeric,
        );
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        let domain = ctx.domains().get(ctx.eval(id).domain());
        assert_eq!((domain.precision, domain.scale), (4, 2));
        let flag = ctx.eval(id).operands()[2];
        assert_eq!(ctx.eval(flag).as_constant(), Some(&Value::Int32(0)));

        let bare = Node::unary(OpCode::ToNumber, Node::value("12"), DataType::Numeric);
        let id = ctx.lower_expr(&bare, Unbox::AsValue).unwrap().id;
        let domain = ctx.domains().get(ctx.eval(id).domain());
        assert_eq!((domain.precision, domain.scale), (38, 0));
        let flag = ctx.eval(id).operands()[2];
        assert_eq!(ctx.eval(flag).as_constant(), Some(&Value::Int32(1)));
    }

    #[test]
    fn test_to_number_digitless_format() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        for format in ["", "+-", " , "] {
            let node = Node::binary(
                OpCode::ToNumber,
                Node::value("12"),
                Node::value(format),
                DataType::Numeric,
            );
            let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
            let domain = ctx.domains().get(ctx.eval(id).domain());
            assert_eq!((domain.precision, domain.scale), (38, 15));
        }
    }

    #[test]
    fn test_current_user() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::new().current_user("dba"));
        let node = Node::nullary(OpCode::CurrentUser, DataType::VarChar);
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.eval(id).as_constant(), Some(&Value::String(String::from("dba"))));
    }

    #[test]
    fn test_serial_values() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::unary(OpCode::NextValue, Node::value("dba.order_seq"), DataType::Numeric);
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        assert_eq!(ctx.domains().kind(ctx.eval(id).domain()), DataType::Numeric);
        let oid = ctx.eval(id).operands()[0];
        assert_eq!(ctx.eval(oid).as_constant(), Some(&Value::String(String::from("200 7 1"))));

        let missing = Node::unary(OpCode::CurrentValue, Node::value("nope"), DataType::Numeric);
        assert_eq!(
            ctx.lower_expr(&missing, Unbox::AsValue).unwrap_err().category(),
            "unresolved-reference"
        );
    }

    #[test]
    fn test_numbering_shares_slot() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let counter = |op| Node::nullary(op, DataType::BigInt);
        let a = ctx.lower_expr(&counter(OpCode::RowNum), Unbox::AsValue).unwrap();
        let b = ctx.lower_expr(&counter(OpCode::InstNum), Unbox::AsValue).unwrap();
        assert_eq!(ctx.eval(a.id), ctx.eval(b.id));
        assert!(a.side.numbering.instnum);

        let c = ctx.lower_expr(&counter(OpCode::OrderByNum), Unbox::AsValue).unwrap();
        assert!(c.side.numbering.orderbynum && !c.side.numbering.instnum);
        assert_ne!(ctx.numbering_slots().orderbynum, ctx.numbering_slots().instnum);
    }

    #[test]
    fn test_case_carries_condition() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let cond = Node::gt(Node::int(2), Node::int(1));
        let node = Node::expr(
            OpCode::Case,
            Some(Node::int(10)),
            Some(Node::int(20)),
            Some(cond),
            DataType::Integer,
        );
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        match ctx.eval(id) {
            EvalNode::Arithmetic { operands, condition, .. } => {
                assert_eq!(operands.len(), 2);
                assert!(condition.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        let no_cond = Node::expr(
            OpCode::Decode,
            Some(Node::int(1)),
            Some(Node::int(2)),
            None,
            DataType::Integer,
        );
        assert!(ctx.lower_expr(&no_cond, Unbox::AsValue).is_err());
    }

    #[test]
    fn test_predicate_in_value_position() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::lt(Node::int(1), Node::int(2));
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        assert!(matches!(ctx.eval(id), EvalNode::PredicateAsValue { .. }));
        assert_eq!(ctx.domains().kind(ctx.eval(id).domain()), DataType::Integer);

        let bounds =
            Node::binary(OpCode::BetweenAnd, Node::int(1), Node::int(2), DataType::Logical);
        assert_eq!(
            ctx.lower_expr(&bounds, Unbox::AsValue).unwrap_err().category(),
            "unsupported-operator"
        );
    }

    #[test]
    fn test_aggregate_slot() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::aggregate(
            AggregateFunc::Sum,
            AggregateId(1),
            Some(Node::int(1)),
            DataType::BigInt,
        );
        assert_eq!(
            ctx.lower_expr(&node, Unbox::AsValue).unwrap_err().category(),
            "invalid-expression"
        );
        let slot = ctx
            .register_aggregate(AggregateId(1), &TypeDescr::new(DataType::BigInt))
            .unwrap();
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        assert!(matches!(ctx.eval(id), EvalNode::ValueSlotRef { slot: s, .. } if *s == slot));
    }

    #[test]
    fn test_collection_function() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let node = Node::set_of(vec![Node::int(1), Node::int(2)]);
        let id = ctx.lower_expr(&node, Unbox::AsValue).unwrap().id;
        match ctx.eval(id) {
            EvalNode::FunctionCall { op, operands, .. } => {
                assert_eq!(*op, FuncOp::Set);
                assert_eq!(operands.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lower_list_and_positions() {
        let catalog = catalog();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let nodes = vec![Node::int(1), Node::value("x")];
        let (ids, side) = ctx.lower_list(&nodes, Unbox::AsValue).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!side.uses_modulus);

        let positions = ctx.lower_position_list(&nodes).unwrap();
        assert!(matches!(ctx.eval(positions[1]), EvalNode::AttributeByPosition { index: 1, .. }));
    }
}
