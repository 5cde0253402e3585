//! Expression and predicate lowering.
//!
//! [`CompilationContext::lower_expr`] turns a scalar parse node into an
//! evaluation node; [`CompilationContext::lower_predicate`] turns a term list
//! into a predicate tree. Both report what the lowered tree touched through a
//! [`SideChannel`] returned next to the result rather than through shared
//! state.

mod expr;
mod func;
mod pred;
mod subquery;

pub use func::{to_number_domain, NumberFormat};
pub use subquery::{BlockBuilder, CompiledBlock, LoweredBlock};

use crate::eval::{EvalId, PredId};

/// How a set-valued sub-expression is presented to its consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Unbox {
    /// A single value; a sub-query yields its first row only.
    #[default]
    AsValue,
    /// A row source, as read by IN and quantified comparisons.
    AsTable,
}

/// Row-numbering categories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NumberingFlags {
    /// INST_NUM / ROWNUM.
    pub instnum: bool,
    pub groupbynum: bool,
    pub orderbynum: bool,
}

impl NumberingFlags {
    /// Returns whether any category is set.
    #[inline]
    pub fn any(&self) -> bool {
        self.instnum || self.groupbynum || self.orderbynum
    }

    /// Sets every category set in `other`.
    pub fn merge(&mut self, other: NumberingFlags) {
        self.instnum |= other.instnum;
        self.groupbynum |= other.groupbynum;
        self.orderbynum |= other.orderbynum;
    }
}

/// Facts about a lowered tree its consumer needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SideChannel {
    /// A MOD operator appears in the tree.
    pub uses_modulus: bool,
    /// Numbering pseudo-columns read by the tree.
    pub numbering: NumberingFlags,
}

impl SideChannel {
    /// Folds another side channel into this one.
    pub fn merge(&mut self, other: SideChannel) {
        self.uses_modulus |= other.uses_modulus;
        self.numbering.merge(other.numbering);
    }
}

/// A lowered scalar expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lowered {
    pub id: EvalId,
    pub side: SideChannel,
}

/// A lowered search condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoweredPredicate {
    /// `None` for an empty term list.
    pub pred: Option<PredId>,
    /// Numbering categories whose scans may not stop early.
    pub continuation: NumberingFlags,
    pub side: SideChannel,
}
