//! Compilation context.
//!
//! One [`CompilationContext`] lowers one statement. It owns every arena the
//! lowered artifacts live in, the domain cache, the scope stack and the
//! statement-level tables (host parameters, labels, aggregate and numbering
//! slots, compiled sub-plans). Nothing is global: an inner sub-query
//! compilation receives the same context by `&mut` and leaves it consistent
//! for the outer one.

use crate::arena::Arena;
use crate::ast::{AggregateId, FromItem, QueryId, SpecId, SubQuery};
use crate::catalog::Catalog;
use crate::config::CompilerConfig;
use crate::eval::{CellId, EvalId, EvalNode, PredId, ResultCell, SlotId, SubPlanId, ValueSlot};
use crate::lower::LoweredBlock;
use crate::pred::PredExpr;
use crate::scope::{Binding, Positional, Scope, ScopeStack, ScopeSummary};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use quill_core::{DataType, DomainCache, DomainId, Error, Result, TypeDescr, Value};
use tracing::{debug, instrument, warn};

/// A compiled sub-query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubPlan {
    pub id: SubPlanId,
    /// Result slot of a single-tuple sub-plan.
    pub single_tuple: Option<SlotId>,
}

/// Statement-level assembly of embedded sub-queries.
///
/// The context lowers a block's select list and search condition in a scope
/// of its own, with the builder still installed, so blocks nested in the body
/// reach `build` first. The builder then assembles the lowered block.
pub trait SubPlanBuilder {
    /// Assembles the plan of a lowered block and returns its id.
    fn build(&mut self, query: &SubQuery, block: LoweredBlock) -> Result<SubPlanId>;
}

/// Host parameter values and the domains preset for unbound ones.
#[derive(Clone, Debug, Default)]
pub struct HostParams {
    values: Vec<Option<Value>>,
    presets: BTreeMap<usize, DomainId>,
}

impl HostParams {
    /// Creates an empty parameter vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value to parameter `index`.
    pub fn bind(&mut self, index: usize, value: Value) {
        if self.values.len() <= index {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value);
    }

    /// Value bound to parameter `index`, if any.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Domain preset for an unbound parameter.
    pub fn preset(&self, index: usize) -> Option<DomainId> {
        self.presets.get(&index).copied()
    }

    pub(crate) fn set_preset(&mut self, index: usize, domain: DomainId) {
        self.presets.insert(index, domain);
    }
}

/// Slots holding the row-numbering counters of the statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NumberingSlots {
    pub instnum: Option<SlotId>,
    pub groupbynum: Option<SlotId>,
    pub orderbynum: Option<SlotId>,
}

/// Per-statement lowering state.
pub struct CompilationContext<'a> {
    pub(crate) config: CompilerConfig,
    pub(crate) catalog: &'a dyn Catalog,
    pub(crate) subplans: Option<&'a mut dyn SubPlanBuilder>,
    pub(crate) domains: DomainCache,
    pub(crate) evals: Arena<EvalNode>,
    pub(crate) preds: Arena<PredExpr>,
    pub(crate) slots: Arena<ValueSlot>,
    pub(crate) cells: Arena<ResultCell>,
    pub(crate) next_cache: u32,
    pub(crate) scopes: ScopeStack,
    pub(crate) host: HostParams,
    pub(crate) labels: BTreeMap<String, Value>,
    pub(crate) aggregates: HashMap<AggregateId, SlotId>,
    pub(crate) numbering: NumberingSlots,
    pub(crate) plans: HashMap<QueryId, SubPlan>,
}

impl<'a> CompilationContext<'a> {
    /// Creates a context with a fresh domain cache.
    pub fn new(catalog: &'a dyn Catalog, config: CompilerConfig) -> Self {
        Self::with_domains(catalog, config, DomainCache::new())
    }

    /// Creates a context reusing an existing domain cache.
    pub fn with_domains(
        catalog: &'a dyn Catalog,
        config: CompilerConfig,
        domains: DomainCache,
    ) -> Self {
        let limit = config.max_arena_nodes;
        Self {
            config,
            catalog,
            subplans: None,
            domains,
            evals: Arena::new(limit),
            preds: Arena::new(limit),
            slots: Arena::new(limit),
            cells: Arena::new(limit),
            next_cache: 0,
            scopes: ScopeStack::new(),
            host: HostParams::new(),
            labels: BTreeMap::new(),
            aggregates: HashMap::new(),
            numbering: NumberingSlots::default(),
            plans: HashMap::new(),
        }
    }

    /// Installs the sub-query compiler.
    pub fn with_subplans(mut self, builder: &'a mut dyn SubPlanBuilder) -> Self {
        self.subplans = Some(builder);
        self
    }

    /// Releases the domain cache for reuse by the next statement.
    pub fn into_domains(self) -> DomainCache {
        self.domains
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Returns the catalog.
    #[inline]
    pub fn catalog(&self) -> &'a dyn Catalog {
        self.catalog
    }

    /// Returns the domain cache.
    #[inline]
    pub fn domains(&self) -> &DomainCache {
        &self.domains
    }

    /// Returns the evaluation node behind `id`.
    #[inline]
    pub fn eval(&self, id: EvalId) -> &EvalNode {
        &self.evals[id]
    }

    /// Returns the predicate behind `id`.
    #[inline]
    pub fn pred(&self, id: PredId) -> &PredExpr {
        &self.preds[id]
    }

    /// Returns the value slot behind `id`.
    #[inline]
    pub fn slot(&self, id: SlotId) -> &ValueSlot {
        &self.slots[id]
    }

    /// Number of evaluation nodes allocated so far.
    pub fn eval_count(&self) -> usize {
        self.evals.len()
    }

    /// Number of result cells allocated so far.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the scope stack.
    #[inline]
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Returns the host parameters.
    #[inline]
    pub fn host_params(&self) -> &HostParams {
        &self.host
    }

    /// Binds a value to host parameter `index`.
    pub fn bind_host(&mut self, index: usize, value: Value) {
        self.host.bind(index, value);
    }

    /// Defines a session label.
    pub fn set_label(&mut self, name: impl Into<String>, value: Value) {
        self.labels.insert(name.into(), value);
    }

    /// Registers the result slot of an aggregate computed by the grouping pass.
    pub fn register_aggregate(&mut self, id: AggregateId, descr: &TypeDescr) -> Result<SlotId> {
        let domain = self.resolve(descr)?;
        let slot = self.slots.alloc(ValueSlot { domain })?;
        self.aggregates.insert(id, slot);
        Ok(slot)
    }

    /// Returns the numbering slots allocated so far.
    pub fn numbering_slots(&self) -> NumberingSlots {
        self.numbering
    }

    /// Returns the plan compiled for a sub-query, if any.
    pub fn subplan(&self, id: QueryId) -> Option<SubPlan> {
        self.plans.get(&id).copied()
    }

    /// Enters a scope with one binding per FROM-item.
    #[instrument(level = "trace", skip(self, items), fields(items = items.len()))]
    pub fn push_scope(&mut self, items: &[FromItem]) -> Result<usize> {
        let mut bindings = Vec::with_capacity(items.len());
        for item in items {
            Binding::build(
                item,
                self.catalog,
                &mut self.domains,
                &mut self.slots,
                &mut self.next_cache,
                &mut bindings,
            )?;
        }
        debug!(bindings = bindings.len(), depth = self.scopes.depth() + 1, "scope pushed");
        self.scopes.push(Scope::new(bindings));
        Ok(self.scopes.depth())
    }

    /// Leaves the innermost scope and returns its correlation marks.
    pub fn pop_scope(&mut self) -> Result<ScopeSummary> {
        self.scopes.pop().ok_or_else(|| {
            warn!("pop with no scope");
            Error::invalid_expression("scope stack underflow")
        })
    }

    /// Makes `spec` the binding read directly from the scanned row.
    pub fn activate(&mut self, spec: SpecId) -> Result<()> {
        self.scopes.activate(spec)
    }

    /// Stops reading `spec` directly from the scanned row.
    pub fn deactivate(&mut self, spec: SpecId) -> Result<()> {
        self.scopes.deactivate(spec)
    }

    /// Marks `spec` as read from a materialized tuple, or clears the mark.
    pub fn set_positional(&mut self, spec: SpecId, layout: Option<Positional>) -> Result<()> {
        self.scopes.set_positional(spec, layout)
    }

    /// Resolves a type descriptor through the domain cache.
    pub(crate) fn resolve(&mut self, descr: &TypeDescr) -> Result<DomainId> {
        self.domains.resolve(descr).map_err(|err| {
            warn!(kind = ?descr.kind, error = %err, "domain resolution failed");
            err
        })
    }

    pub(crate) fn resolve_kind(&mut self, kind: DataType) -> Result<DomainId> {
        self.resolve(&TypeDescr::new(kind))
    }

    pub(crate) fn alloc_eval(&mut self, node: EvalNode) -> Result<EvalId> {
        self.evals.alloc(node)
    }

    pub(crate) fn alloc_pred(&mut self, pred: PredExpr) -> Result<PredId> {
        self.preds.alloc(pred)
    }

    pub(crate) fn alloc_cell(&mut self, domain: DomainId) -> Result<CellId> {
        self.cells.alloc(ResultCell { domain })
    }

    pub(crate) fn alloc_slot(&mut self, domain: DomainId) -> Result<SlotId> {
        self.slots.alloc(ValueSlot { domain })
    }

    /// Allocates a constant node.
    pub(crate) fn constant(&mut self, value: Value, domain: DomainId) -> Result<EvalId> {
        self.alloc_eval(EvalNode::Constant { value, domain })
    }

    /// Compiles a sub-query through the installed builder, once per query id.
    pub(crate) fn build_subplan(&mut self, query: &SubQuery) -> Result<SubPlan> {
        if let Some(plan) = self.plans.get(&query.id) {
            return Ok(*plan);
        }
        if self.subplans.is_none() {
            return Err(missing_builder(query));
        }

        let block = self.lower_block(query)?;
        let single_tuple = match block.outputs.first() {
            Some(first) if query.single_row || query.visible_columns() == 1 => {
                let domain = self.eval(*first).domain();
                Some(self.alloc_slot(domain)?)
            }
            _ => None,
        };
        let builder = self.subplans.as_mut().ok_or_else(|| missing_builder(query))?;
        let id = builder.build(query, block)?;

        let plan = SubPlan { id, single_tuple };
        self.plans.insert(query.id, plan);
        Ok(plan)
    }
}

fn missing_builder(query: &SubQuery) -> Error {
    warn!(query = query.id.0, "no sub-plan builder installed");
    Error::invalid_expression("sub-query without a sub-plan builder")
}
