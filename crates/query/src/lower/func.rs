//! Function nodes and the result-domain rules of individual operators.

use super::{SideChannel, Unbox};
use crate::ast::{FuncKind, FunctionNode, Node, OpCode};
use crate::context::CompilationContext;
use crate::eval::{EvalId, EvalNode, FuncOp};
use alloc::format;
use alloc::vec::Vec;
use quill_core::{
    DataType, Error, Result, TypeDescr, Value, DEFAULT_NUMERIC_PRECISION, DEFAULT_NUMERIC_SCALE,
    MAX_NUMERIC_PRECISION,
};
use tracing::{debug, warn};

/// Precision and scale of a TO_NUMBER result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberFormat {
    pub precision: u32,
    pub scale: u16,
}

impl NumberFormat {
    const SCIENTIFIC: NumberFormat = NumberFormat {
        precision: MAX_NUMERIC_PRECISION,
        scale: DEFAULT_NUMERIC_PRECISION as u16,
    };
}

/// Derives the NUMERIC domain of `TO_NUMBER(x, format)` from its format.
///
/// `9` and `0` count digits; those after the decimal point also count toward
/// the scale. Signs, group separators and whitespace are ignored, and a
/// currency/sign marker (`c`, `s`) may only lead the integer part. Anything
/// else, or a format too wide to represent, yields the scientific default.
/// So does a format without digits, since NUMERIC has no zero precision.
pub fn to_number_domain(format: Option<&str>) -> NumberFormat {
    let Some(format) = format else {
        return NumberFormat {
            precision: MAX_NUMERIC_PRECISION,
            scale: DEFAULT_NUMERIC_SCALE,
        };
    };

    let mut chars = format
        .trim_start_matches([' ', '\t', '\n'])
        .chars()
        .peekable();
    let mut digits: u32 = 0;
    let mut scale: u32 = 0;
    let mut scientific = false;

    while let Some(c) = chars.next_if(|c| *c != '.') {
        match c {
            '9' | '0' => digits += 1,
            '+' | '-' | ',' | ' ' | '\t' | '\n' => {}
            'c' | 'C' | 's' | 'S' if digits == 0 => {}
            _ => scientific = true,
        }
    }
    if chars.next() == Some('.') {
        for c in chars {
            match c {
                '9' | '0' => scale += 1,
                '+' | '-' | ',' | ' ' | '\t' | '\n' => {}
                _ => scientific = true,
            }
        }
    }

    let precision = digits + scale;
    if scientific || precision == 0 || precision + scale >= MAX_NUMERIC_PRECISION {
        return NumberFormat::SCIENTIFIC;
    }
    NumberFormat {
        precision,
        scale: scale as u16,
    }
}

/// Result kind of operators whose type does not depend on their input.
pub(crate) fn synthetic_kind(op: OpCode) -> Option<DataType> {
    let kind = match op {
        OpCode::AddMonths | OpCode::LastDay | OpCode::ToDate => DataType::Date,
        OpCode::MonthsBetween => DataType::Double,
        OpCode::ToChar => DataType::VarChar,
        OpCode::ToTime => DataType::Time,
        OpCode::ToTimestamp => DataType::Timestamp,
        OpCode::CurrentValue | OpCode::NextValue => DataType::Numeric,
        _ => return None,
    };
    Some(kind)
}

/// Empty-string literal standing in for an omitted TRIM/PAD/REPLACE operand,
/// typed after the first operand.
pub(crate) fn empty_string_for(first: Option<&Node>) -> Node {
    let descr = match first.map(|n| &n.descr) {
        Some(d) if d.kind.is_national() => TypeDescr::new(DataType::VarNChar)
            .codeset(d.codeset)
            .collation(d.collation),
        Some(d) if d.kind.is_char_string() => TypeDescr::new(DataType::VarChar)
            .codeset(d.codeset)
            .collation(d.collation),
        _ => TypeDescr::new(DataType::VarChar),
    };
    let value = Value::empty_string(descr.kind);
    Node::new(crate::ast::NodeKind::Value(value), descr)
}

impl CompilationContext<'_> {
    /// Lowers a function application.
    pub(crate) fn lower_function(
        &mut self,
        node: &Node,
        func: &FunctionNode,
        side: &mut SideChannel,
    ) -> Result<EvalId> {
        let op = match &func.kind {
            FuncKind::Aggregate { func: agg, id } => {
                let slot = self.aggregates.get(id).copied().ok_or_else(|| {
                    warn!(aggregate = id.0, ?agg, "aggregate has no registered slot");
                    Error::invalid_expression(format!("nested aggregate {:?}", agg))
                })?;
                let domain = self.slot(slot).domain;
                return self.alloc_eval(EvalNode::ValueSlotRef { slot, domain });
            }
            FuncKind::Set => FuncOp::Set,
            FuncKind::MultiSet => FuncOp::MultiSet,
            FuncKind::Sequence => FuncOp::Sequence,
            FuncKind::TableSet => FuncOp::TableSet,
            FuncKind::TableMultiSet => FuncOp::TableMultiSet,
            FuncKind::TableSequence => FuncOp::TableSequence,
            FuncKind::Generic(name) => FuncOp::Generic(name.clone()),
            FuncKind::ClassOf => FuncOp::ClassOf,
        };

        let unbox = if func.kind.is_table_form() {
            Unbox::AsTable
        } else {
            Unbox::AsValue
        };
        let operands = func
            .args
            .iter()
            .map(|arg| self.lower_node(arg, unbox, side))
            .collect::<Result<Vec<_>>>()?;

        let result_domain = self.resolve(&node.descr)?;
        let cell = self.alloc_cell(result_domain)?;
        self.alloc_eval(EvalNode::FunctionCall {
            op,
            operands,
            result_domain,
            cell,
        })
    }

    /// Builds a composite-key node over per-column key expressions.
    pub(crate) fn key_tuple(&mut self, operands: Vec<EvalId>) -> Result<EvalId> {
        let result_domain = self.resolve_kind(DataType::KeyTuple)?;
        let cell = self.alloc_cell(result_domain)?;
        debug!(columns = operands.len(), "composite key");
        self.alloc_eval(EvalNode::FunctionCall {
            op: FuncOp::KeyTuple,
            operands,
            result_domain,
            cell,
        })
    }
}
