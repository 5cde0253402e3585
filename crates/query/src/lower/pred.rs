//! Predicate lowerer.
//!
//! A term list is a conjunction of disjunction chains. Each chain is folded
//! from its tail (`d1 OR (d2 OR d3)`), and the chains are joined with AND in
//! list order. Derived forms are expanded into the primitive predicate
//! algebra: BETWEEN and RANGE into comparisons, XOR into AND/OR/NOT, IN into
//! quantified comparisons, and any non-boolean expression into `expr = 1`.

use super::{LoweredPredicate, NumberingFlags, SideChannel, Unbox};
use crate::ast::{Conjunct, ExprNode, Node, NodeKind, OpCode, TermList};
use crate::context::CompilationContext;
use crate::eval::{EvalId, PredId};
use crate::pred::{CompareOp, PredExpr};
use alloc::format;
use alloc::string::String;
use quill_core::{DataType, Error, Result, Value};
use tracing::{debug, instrument, warn};

/// Comparisons bounding a value from below and from above.
struct Bounds {
    lower: Option<CompareOp>,
    upper: Option<CompareOp>,
}

fn bounds_of(op: OpCode) -> Option<Bounds> {
    use CompareOp::{Ge, Gt, Le, Lt};
    let (lower, upper) = match op {
        OpCode::Between | OpCode::BetweenAnd | OpCode::BetweenGeLe => (Some(Ge), Some(Le)),
        OpCode::BetweenGeLt => (Some(Ge), Some(Lt)),
        OpCode::BetweenGtLe => (Some(Gt), Some(Le)),
        OpCode::BetweenGtLt => (Some(Gt), Some(Lt)),
        OpCode::BetweenGeInf => (Some(Ge), None),
        OpCode::BetweenGtInf => (Some(Gt), None),
        OpCode::BetweenInfLe => (None, Some(Le)),
        OpCode::BetweenInfLt => (None, Some(Lt)),
        _ => return None,
    };
    Some(Bounds { lower, upper })
}

/// A comparison, quantified comparison or null test under NOT, rewritten
/// with the negated operator. The rewrite holds under three-valued logic.
fn negated_term(node: &Node) -> Option<Node> {
    let op = node.as_expr()?.op;
    let terminal = CompareOp::from_op(op).is_some()
        || CompareOp::from_quantified(op).is_some()
        || op == OpCode::IsNotNull;
    let negated = op.negate().filter(|_| terminal)?;

    let mut node = node.clone();
    if let NodeKind::Expr(expr) = &mut node.kind {
        expr.op = negated;
    }
    debug!(from = %op, to = %negated, "negation pushed into term");
    Some(node)
}

fn missing(op: OpCode, what: &str) -> Error {
    warn!(%op, what, "malformed predicate");
    Error::invalid_expression(format!("{:?} without {}", op, what))
}

impl CompilationContext<'_> {
    /// Lowers a search condition.
    ///
    /// An empty term list lowers to no predicate at all.
    #[instrument(level = "trace", skip(self, terms), fields(conjuncts = terms.len()))]
    pub fn lower_predicate(&mut self, terms: &TermList) -> Result<LoweredPredicate> {
        let mut side = SideChannel::default();
        let mut continuation = NumberingFlags::default();
        let mut pred: Option<PredId> = None;

        for conjunct in &terms.conjuncts {
            let Some(term) = self.lower_conjunct(conjunct, &mut side, &mut continuation)? else {
                continue;
            };
            pred = Some(match pred {
                None => term,
                Some(acc) => self.alloc_pred(PredExpr::And(acc, term))?,
            });
        }

        if continuation.any() {
            debug!(?continuation, "numbering needs scan continuation");
        }
        Ok(LoweredPredicate {
            pred,
            continuation,
            side,
        })
    }

    /// Lowers the two sides of an equi-join term.
    pub fn lower_join_term(&mut self, term: &Node) -> Result<(EvalId, EvalId)> {
        let expr = match term.as_expr() {
            Some(expr) if expr.op == OpCode::Eq => expr,
            _ => {
                let op = term
                    .op()
                    .map_or_else(|| String::from("non-operator"), |op| format!("{}", op));
                warn!(op = %op, "join term is not an equality");
                return Err(Error::unsupported_operator(op, "join term"));
            }
        };
        let mut side = SideChannel::default();
        let left = operand(expr.arg1.as_deref(), expr.op)?;
        let right = operand(expr.arg2.as_deref(), expr.op)?;
        let lhs = self.lower_node(left, Unbox::AsValue, &mut side)?;
        let rhs = self.lower_node(right, Unbox::AsValue, &mut side)?;
        Ok((lhs, rhs))
    }

    fn lower_conjunct(
        &mut self,
        conjunct: &Conjunct,
        side: &mut SideChannel,
        continuation: &mut NumberingFlags,
    ) -> Result<Option<PredId>> {
        let chained = conjunct.is_disjunction();
        let mut acc: Option<PredId> = None;

        for term in conjunct.disjuncts.iter().rev() {
            let mut term_side = SideChannel::default();
            let pred = self.lower_term(term, &mut term_side, continuation)?;
            if chained || matches!(term.op(), Some(OpCode::Not | OpCode::Or)) {
                continuation.merge(term_side.numbering);
            }
            side.merge(term_side);
            acc = Some(match acc {
                None => pred,
                Some(rest) => self.alloc_pred(PredExpr::Or(pred, rest))?,
            });
        }
        Ok(acc)
    }

    /// Lowers one boolean term.
    pub(crate) fn lower_term(
        &mut self,
        node: &Node,
        side: &mut SideChannel,
        continuation: &mut NumberingFlags,
    ) -> Result<PredId> {
        match &node.kind {
            NodeKind::Expr(expr) if expr.op.is_predicate() => {
                self.lower_predicate_op(expr, side, continuation)
            }
            NodeKind::Value(Value::Boolean(truth)) => {
                let int = self.resolve_kind(DataType::Integer)?;
                let lhs = self.constant(Value::Int32(1), int)?;
                let rhs = self.constant(Value::Int32(1), int)?;
                let op = if *truth { CompareOp::Eq } else { CompareOp::Ne };
                self.alloc_pred(PredExpr::Comparison {
                    lhs,
                    rhs: Some(rhs),
                    op,
                    operand_type: DataType::Integer,
                })
            }
            _ => {
                let lhs = self.lower_node(node, Unbox::AsValue, side)?;
                let int = self.resolve_kind(DataType::Integer)?;
                let rhs = self.constant(Value::Int32(1), int)?;
                let operand_type = self.operand_type(lhs, Some(rhs));
                self.alloc_pred(PredExpr::Comparison {
                    lhs,
                    rhs: Some(rhs),
                    op: CompareOp::Eq,
                    operand_type,
                })
            }
        }
    }

    /// A term lowered under NOT or inside an OR chain marks the numbering
    /// categories it reads as needing continuation.
    fn lower_negatable(
        &mut self,
        node: &Node,
        side: &mut SideChannel,
        continuation: &mut NumberingFlags,
    ) -> Result<PredId> {
        let mut inner = SideChannel::default();
        let pred = self.lower_term(node, &mut inner, continuation)?;
        continuation.merge(inner.numbering);
        side.merge(inner);
        Ok(pred)
    }

    fn lower_predicate_op(
        &mut self,
        expr: &ExprNode,
        side: &mut SideChannel,
        continuation: &mut NumberingFlags,
    ) -> Result<PredId> {
        let op = expr.op;
        let arg1 = expr.arg1.as_deref();
        let arg2 = expr.arg2.as_deref();

        match op {
            OpCode::And => {
                let lhs = self.lower_term(operand(arg1, op)?, side, continuation)?;
                let rhs = self.lower_term(operand(arg2, op)?, side, continuation)?;
                self.alloc_pred(PredExpr::And(lhs, rhs))
            }
            OpCode::Or => {
                let lhs = self.lower_negatable(operand(arg1, op)?, side, continuation)?;
                let rhs = self.lower_negatable(operand(arg2, op)?, side, continuation)?;
                self.alloc_pred(PredExpr::Or(lhs, rhs))
            }
            OpCode::Not => {
                let arg = operand(arg1, op)?;
                if let Some(negated) = negated_term(arg) {
                    return self.lower_negatable(&negated, side, continuation);
                }
                let inner = self.lower_negatable(arg, side, continuation)?;
                self.alloc_pred(PredExpr::Not(inner))
            }
            OpCode::Xor => {
                self.lower_xor(operand(arg1, op)?, operand(arg2, op)?, side, continuation)
            }
            OpCode::IsNotNull => {
                let inner = self.comparison(CompareOp::IsNull, operand(arg1, op)?, None, side)?;
                self.alloc_pred(PredExpr::Not(inner))
            }
            OpCode::Exists => {
                let rows = self.lower_node(operand(arg1, op)?, Unbox::AsTable, side)?;
                self.alloc_pred(PredExpr::Comparison {
                    lhs: rows,
                    rhs: None,
                    op: CompareOp::Exists,
                    operand_type: DataType::Null,
                })
            }
            OpCode::Between => self.lower_between(expr, side),
            OpCode::NotBetween => {
                let inner = self.lower_between(expr, side)?;
                self.alloc_pred(PredExpr::Not(inner))
            }
            OpCode::Range => self.lower_range(expr, side),
            _ if op.is_range_bound() => self.lower_between(expr, side),
            OpCode::Like => self.lower_like(expr, side),
            OpCode::NotLike => {
                let inner = self.lower_like(expr, side)?;
                self.alloc_pred(PredExpr::Not(inner))
            }
            OpCode::Rlike | OpCode::RlikeBinary | OpCode::NotRlike | OpCode::NotRlikeBinary => {
                let src = self.lower_node(operand(arg1, op)?, Unbox::AsValue, side)?;
                let pattern = self.lower_node(operand(arg2, op)?, Unbox::AsValue, side)?;
                let case_sensitive = matches!(op, OpCode::RlikeBinary | OpCode::NotRlikeBinary);
                let pred = self.alloc_pred(PredExpr::RegexLike {
                    src,
                    pattern,
                    case_sensitive,
                })?;
                if matches!(op, OpCode::NotRlike | OpCode::NotRlikeBinary) {
                    self.alloc_pred(PredExpr::Not(pred))
                } else {
                    Ok(pred)
                }
            }
            _ => {
                if let Some((cmp, quantifier)) = CompareOp::from_quantified(op) {
                    let elem = self.lower_node(operand(arg1, op)?, Unbox::AsValue, side)?;
                    let set = self.lower_node(operand(arg2, op)?, Unbox::AsTable, side)?;
                    return self.alloc_pred(PredExpr::SomeAll {
                        elem,
                        set,
                        op: cmp,
                        quantifier,
                    });
                }
                if let Some(cmp) = CompareOp::from_op(op) {
                    let rhs = if cmp.is_unary() { None } else { Some(operand(arg2, op)?) };
                    return self.comparison(cmp, operand(arg1, op)?, rhs, side);
                }
                warn!(%op, "operator has no predicate lowering");
                Err(Error::unsupported_operator(format!("{}", op), "predicate"))
            }
        }
    }

    fn comparison(
        &mut self,
        op: CompareOp,
        lhs: &Node,
        rhs: Option<&Node>,
        side: &mut SideChannel,
    ) -> Result<PredId> {
        let lhs = self.lower_node(lhs, Unbox::AsValue, side)?;
        let rhs = rhs
            .map(|node| self.lower_node(node, Unbox::AsValue, side))
            .transpose()?;
        let operand_type = self.operand_type(lhs, rhs);
        self.alloc_pred(PredExpr::Comparison {
            lhs,
            rhs,
            op,
            operand_type,
        })
    }

    fn compare_ids(&mut self, op: CompareOp, lhs: EvalId, rhs: EvalId) -> Result<PredId> {
        let operand_type = self.operand_type(lhs, Some(rhs));
        self.alloc_pred(PredExpr::Comparison {
            lhs,
            rhs: Some(rhs),
            op,
            operand_type,
        })
    }

    /// Type a comparison is carried out in: the left operand's, unless that
    /// is still open.
    fn operand_type(&self, lhs: EvalId, rhs: Option<EvalId>) -> DataType {
        let left = self.domains.kind(self.eval(lhs).domain());
        match rhs {
            Some(rhs) if matches!(left, DataType::Null | DataType::Maybe) => {
                self.domains.kind(self.eval(rhs).domain())
            }
            _ => left,
        }
    }

    /// `a XOR b` as `(a AND NOT b) OR (NOT a AND b)`.
    fn lower_xor(
        &mut self,
        a: &Node,
        b: &Node,
        side: &mut SideChannel,
        continuation: &mut NumberingFlags,
    ) -> Result<PredId> {
        let a1 = self.lower_negatable(a, side, continuation)?;
        let b1 = self.lower_negatable(b, side, continuation)?;
        let not_b = self.alloc_pred(PredExpr::Not(b1))?;
        let left = self.alloc_pred(PredExpr::And(a1, not_b))?;

        let a2 = self.lower_negatable(a, side, continuation)?;
        let b2 = self.lower_negatable(b, side, continuation)?;
        let not_a = self.alloc_pred(PredExpr::Not(a2))?;
        let right = self.alloc_pred(PredExpr::And(not_a, b2))?;

        self.alloc_pred(PredExpr::Or(left, right))
    }

    /// `x BETWEEN lo AND hi` and its bound-kind variants.
    fn lower_between(&mut self, expr: &ExprNode, side: &mut SideChannel) -> Result<PredId> {
        let subject = operand(expr.arg1.as_deref(), expr.op)?;
        let bounds = operand(expr.arg2.as_deref(), expr.op)?;
        let op = if expr.op == OpCode::NotBetween {
            OpCode::Between
        } else {
            expr.op
        };

        let x = self.lower_node(subject, Unbox::AsValue, side)?;
        match bounds.as_expr() {
            Some(pair) if pair.op == OpCode::BetweenAnd => {
                let low = operand(pair.arg1.as_deref(), pair.op)?;
                let high = pair.arg2.as_deref();
                self.bounded(x, op, low, high, side)
            }
            _ => self.bounded(x, op, bounds, None, side),
        }
    }

    /// `x RANGE (r1 OR r2 ...)`: each sub-range bounds `x` on its own.
    fn lower_range(&mut self, expr: &ExprNode, side: &mut SideChannel) -> Result<PredId> {
        let subject = operand(expr.arg1.as_deref(), expr.op)?;
        let ranges = match expr.arg2.as_deref().map(|n| &n.kind) {
            Some(NodeKind::OrChain(ranges)) if !ranges.is_empty() => ranges,
            _ => return Err(missing(expr.op, "sub-ranges")),
        };

        let x = self.lower_node(subject, Unbox::AsValue, side)?;
        let mut acc: Option<PredId> = None;
        for range in ranges.iter().rev() {
            let sub = range.as_expr().ok_or_else(|| missing(expr.op, "a sub-range operator"))?;
            let first = operand(sub.arg1.as_deref(), sub.op)?;
            let pred = self.bounded(x, sub.op, first, sub.arg2.as_deref(), side)?;
            acc = Some(match acc {
                None => pred,
                Some(rest) => self.alloc_pred(PredExpr::Or(pred, rest))?,
            });
        }
        acc.ok_or_else(|| missing(expr.op, "sub-ranges"))
    }

    /// Bounds `x` by `first` (and `second` when both sides are closed).
    fn bounded(
        &mut self,
        x: EvalId,
        op: OpCode,
        first: &Node,
        second: Option<&Node>,
        side: &mut SideChannel,
    ) -> Result<PredId> {
        if op == OpCode::BetweenEqNa {
            let value = self.lower_node(first, Unbox::AsValue, side)?;
            return self.compare_ids(CompareOp::Eq, x, value);
        }
        let Some(bounds) = bounds_of(op) else {
            warn!(%op, "not a range operator");
            return Err(Error::unsupported_operator(format!("{}", op), "range"));
        };

        match (bounds.lower, bounds.upper) {
            (Some(lo_op), Some(hi_op)) => {
                let high = second.ok_or_else(|| missing(op, "an upper bound"))?;
                let low = self.lower_node(first, Unbox::AsValue, side)?;
                let high = self.lower_node(high, Unbox::AsValue, side)?;
                let lower = self.compare_ids(lo_op, x, low)?;
                let upper = self.compare_ids(hi_op, x, high)?;
                self.alloc_pred(PredExpr::And(lower, upper))
            }
            (Some(cmp), None) | (None, Some(cmp)) => {
                let bound = self.lower_node(first, Unbox::AsValue, side)?;
                self.compare_ids(cmp, x, bound)
            }
            (None, None) => Err(Error::unsupported_operator(format!("{}", op), "range")),
        }
    }

    /// `src LIKE pattern [ESCAPE esc]`; without an explicit escape the
    /// configured default is used.
    fn lower_like(&mut self, expr: &ExprNode, side: &mut SideChannel) -> Result<PredId> {
        let src = self.lower_node(operand(expr.arg1.as_deref(), expr.op)?, Unbox::AsValue, side)?;
        let arg2 = operand(expr.arg2.as_deref(), expr.op)?;

        let (pattern, escape) = match arg2.as_expr() {
            Some(esc) if esc.op == OpCode::LikeEscape => {
                let pattern = operand(esc.arg1.as_deref(), esc.op)?;
                (pattern, esc.arg2.as_deref())
            }
            _ => (arg2, None),
        };
        let pattern = self.lower_node(pattern, Unbox::AsValue, side)?;
        let escape = match escape {
            Some(node) => Some(self.lower_node(node, Unbox::AsValue, side)?),
            None => match self.config.effective_like_escape() {
                Some(c) => {
                    let domain = self.resolve_kind(DataType::VarChar)?;
                    Some(self.constant(Value::String(String::from(c)), domain)?)
                }
                None => None,
            },
        };
        self.alloc_pred(PredExpr::Like {
            src,
            pattern,
            escape,
        })
    }
}

fn operand(arg: Option<&Node>, op: OpCode) -> Result<&Node> {
    arg.ok_or_else(|| missing(op, "an operand"))
}
