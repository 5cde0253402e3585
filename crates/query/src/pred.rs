//! Predicate trees.
//!
//! The lowered, short-circuit-evaluable form of a search condition. Leaves
//! reference evaluation nodes; inner nodes reference other predicates, all by
//! arena id.

use crate::ast::OpCode;
use crate::eval::{EvalId, PredId};
use quill_core::DataType;

/// Comparison operator of a terminal term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    NullsafeEq,
    SetEq,
    SetNe,
    Superset,
    SupersetEq,
    Subset,
    SubsetEq,
    /// Unary: the row source is non-empty.
    Exists,
    /// Unary: the operand is NULL.
    IsNull,
}

impl CompareOp {
    /// Maps a scalar or set comparison operator.
    pub fn from_op(op: OpCode) -> Option<Self> {
        let cmp = match op {
            OpCode::Eq => CompareOp::Eq,
            OpCode::Ne => CompareOp::Ne,
            OpCode::Gt => CompareOp::Gt,
            OpCode::Ge => CompareOp::Ge,
            OpCode::Lt => CompareOp::Lt,
            OpCode::Le => CompareOp::Le,
            OpCode::NullsafeEq => CompareOp::NullsafeEq,
            OpCode::SetEq => CompareOp::SetEq,
            OpCode::SetNe => CompareOp::SetNe,
            OpCode::Superset => CompareOp::Superset,
            OpCode::SupersetEq => CompareOp::SupersetEq,
            OpCode::Subset => CompareOp::Subset,
            OpCode::SubsetEq => CompareOp::SubsetEq,
            OpCode::Exists => CompareOp::Exists,
            OpCode::IsNull => CompareOp::IsNull,
            _ => return None,
        };
        Some(cmp)
    }

    /// Maps a quantified operator to its element comparison and quantifier.
    pub fn from_quantified(op: OpCode) -> Option<(Self, Quantifier)> {
        use OpCode::*;
        let pair = match op {
            EqSome | IsIn => (CompareOp::Eq, Quantifier::Some),
            NeSome => (CompareOp::Ne, Quantifier::Some),
            GtSome => (CompareOp::Gt, Quantifier::Some),
            GeSome => (CompareOp::Ge, Quantifier::Some),
            LtSome => (CompareOp::Lt, Quantifier::Some),
            LeSome => (CompareOp::Le, Quantifier::Some),
            EqAll => (CompareOp::Eq, Quantifier::All),
            NeAll | IsNotIn => (CompareOp::Ne, Quantifier::All),
            GtAll => (CompareOp::Gt, Quantifier::All),
            GeAll => (CompareOp::Ge, Quantifier::All),
            LtAll => (CompareOp::Lt, Quantifier::All),
            LeAll => (CompareOp::Le, Quantifier::All),
            _ => return None,
        };
        Some(pair)
    }

    /// Returns whether the term has no right operand.
    #[inline]
    pub fn is_unary(&self) -> bool {
        matches!(self, CompareOp::Exists | CompareOp::IsNull)
    }
}

/// Quantifier of a SOME/ALL term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Some,
    All,
}

/// A lowered predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PredExpr {
    And(PredId, PredId),
    Or(PredId, PredId),
    Not(PredId),
    /// `lhs op rhs`; `rhs` is absent only for EXISTS and IS NULL.
    Comparison {
        lhs: EvalId,
        rhs: Option<EvalId>,
        op: CompareOp,
        operand_type: DataType,
    },
    /// `elem op SOME|ALL set`.
    SomeAll {
        elem: EvalId,
        set: EvalId,
        op: CompareOp,
        quantifier: Quantifier,
    },
    Like {
        src: EvalId,
        pattern: EvalId,
        escape: Option<EvalId>,
    },
    RegexLike {
        src: EvalId,
        pattern: EvalId,
        case_sensitive: bool,
    },
}

impl PredExpr {
    /// Returns whether this is a terminal term.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PredExpr::And(..) | PredExpr::Or(..) | PredExpr::Not(_))
    }
}
