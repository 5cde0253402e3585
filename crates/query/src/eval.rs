//! Evaluation nodes.
//!
//! The lowered, directly-executable form of a scalar expression. Nodes live
//! in the compilation arena and refer to each other by [`EvalId`]. Every node
//! carries a resolved [`DomainId`]; arithmetic and function nodes also own a
//! result cell that the executor overwrites per row.

use crate::arena::Id;
use crate::ast::{OpCode, Qualifier, SpecId};
use crate::pred::PredExpr;
use alloc::string::String;
use alloc::vec::Vec;
use quill_core::schema::AttrId;
use quill_core::{DomainId, Value};

/// Id of an evaluation node.
pub type EvalId = Id<EvalNode>;
/// Id of a predicate node.
pub type PredId = Id<PredExpr>;
/// Id of a run-time value slot.
pub type SlotId = Id<ValueSlot>;
/// Id of an arithmetic/function result cell.
pub type CellId = Id<ResultCell>;

/// Storage the executor fills with a fetched or computed value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueSlot {
    pub domain: DomainId,
}

/// Per-row result storage of an arithmetic or function node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultCell {
    pub domain: DomainId,
}

/// Per-attribute fetch cache of an active binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrCacheId(pub u32);

/// Handle of a compiled sub-plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubPlanId(pub u32);

/// Function kinds of a [`EvalNode::FunctionCall`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FuncOp {
    Set,
    MultiSet,
    Sequence,
    TableSet,
    TableMultiSet,
    TableSequence,
    /// Composite index key; operands follow index column order.
    KeyTuple,
    /// One element of a collection-valued operand.
    CollectionElement { position: usize },
    Generic(String),
    ClassOf,
}

/// A lowered scalar expression.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalNode {
    /// Literal value.
    Constant { value: Value, domain: DomainId },
    /// Attribute read from the row the enclosing scan is positioned on.
    AttributeById {
        id: AttrId,
        spec: SpecId,
        cache: AttrCacheId,
        domain: DomainId,
    },
    /// Column of a materialized intermediate tuple.
    AttributeByPosition { index: usize, domain: DomainId },
    /// Value held in a slot filled by the executor.
    ValueSlotRef { slot: SlotId, domain: DomainId },
    /// Statement parameter.
    HostParameter { index: usize, domain: DomainId },
    /// Operator over one to three operands (none for system values).
    Arithmetic {
        op: OpCode,
        operands: Vec<EvalId>,
        result_domain: DomainId,
        cell: CellId,
        qualifier: Option<Qualifier>,
        /// Branch condition of CASE, DECODE and IF.
        condition: Option<PredId>,
    },
    /// Function over an operand list.
    FunctionCall {
        op: FuncOp,
        operands: Vec<EvalId>,
        result_domain: DomainId,
        cell: CellId,
    },
    /// Result of an embedded sub-query.
    SubPlanResult {
        plan: SubPlanId,
        single_row: bool,
        /// Single-tuple result slot, read without copying.
        slot: Option<SlotId>,
        domain: DomainId,
    },
    /// Boolean predicate read as 0/1.
    PredicateAsValue { predicate: PredId, domain: DomainId },
}

impl EvalNode {
    /// Result domain of the node.
    pub fn domain(&self) -> DomainId {
        match self {
            EvalNode::Constant { domain, .. }
            | EvalNode::AttributeById { domain, .. }
            | EvalNode::AttributeByPosition { domain, .. }
            | EvalNode::ValueSlotRef { domain, .. }
            | EvalNode::HostParameter { domain, .. }
            | EvalNode::SubPlanResult { domain, .. }
            | EvalNode::PredicateAsValue { domain, .. } => *domain,
            EvalNode::Arithmetic { result_domain, .. }
            | EvalNode::FunctionCall { result_domain, .. } => *result_domain,
        }
    }

    /// Result cell owned by the node, if it computes a value.
    pub fn result_cell(&self) -> Option<CellId> {
        match self {
            EvalNode::Arithmetic { cell, .. } | EvalNode::FunctionCall { cell, .. } => Some(*cell),
            _ => None,
        }
    }

    /// Child evaluation nodes.
    pub fn operands(&self) -> &[EvalId] {
        match self {
            EvalNode::Arithmetic { operands, .. } | EvalNode::FunctionCall { operands, .. } => {
                operands
            }
            _ => &[],
        }
    }

    /// Returns whether this is a literal or a host parameter.
    pub fn is_constant_leaf(&self) -> bool {
        matches!(self, EvalNode::Constant { .. } | EvalNode::HostParameter { .. })
    }

    /// Returns the literal of a constant node.
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            EvalNode::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Short tag used in logs.
    pub fn tag(&self) -> &'static str {
        match self {
            EvalNode::Constant { .. } => "constant",
            EvalNode::AttributeById { .. } => "attribute-by-id",
            EvalNode::AttributeByPosition { .. } => "attribute-by-position",
            EvalNode::ValueSlotRef { .. } => "value-slot",
            EvalNode::HostParameter { .. } => "host-parameter",
            EvalNode::Arithmetic { .. } => "arithmetic",
            EvalNode::FunctionCall { .. } => "function",
            EvalNode::SubPlanResult { .. } => "sub-plan",
            EvalNode::PredicateAsValue { .. } => "predicate-as-value",
        }
    }
}
