//! Key limits from row-numbering terms.

use super::KeyLimit;
use crate::ast::{Node, OpCode};
use crate::context::CompilationContext;
use crate::eval::EvalId;
use crate::lower::Unbox;
use quill_core::{DataType, DomainId, Result, Value};
use tracing::{debug, instrument};

fn is_counter(node: &Node) -> bool {
    matches!(node.op(), Some(OpCode::InstNum | OpCode::RowNum))
}

impl CompilationContext<'_> {
    /// Converts `ROWNUM`/`INST_NUM()` bounds into a key limit, folded into
    /// `existing` when one is present. Terms that cannot be converted are
    /// skipped and stay in the residual filter.
    #[instrument(level = "trace", skip(self, terms, existing), fields(terms = terms.len()))]
    pub fn compile_key_limit(
        &mut self,
        terms: &[Node],
        existing: Option<KeyLimit>,
    ) -> Result<Option<KeyLimit>> {
        let mut limit = existing;
        for term in terms {
            match self.limit_of(term)? {
                Some(bounds) => limit = Some(self.fold_limit(limit, bounds)?),
                None => debug!(op = ?term.op(), "numbering term not convertible"),
            }
        }
        Ok(limit)
    }

    fn limit_of(&mut self, term: &Node) -> Result<Option<KeyLimit>> {
        let Some(expr) = term.as_expr() else {
            return Ok(None);
        };
        let (Some(arg1), Some(arg2)) = (expr.arg1.as_deref(), expr.arg2.as_deref()) else {
            return Ok(None);
        };
        let (op, bound) = if is_counter(arg1) {
            (expr.op, arg2)
        } else if is_counter(arg2) {
            match expr.op.converse() {
                Some(op) => (op, arg1),
                None => return Ok(None),
            }
        } else {
            return Ok(None);
        };

        let (lower, upper) = match op {
            OpCode::Le | OpCode::Lt | OpCode::Eq | OpCode::Ge | OpCode::Gt => {
                if !bound.is_constant_leaf() {
                    return Ok(None);
                }
                let value = self.limit_bound(bound)?;
                match op {
                    OpCode::Le => (None, Some(value)),
                    OpCode::Lt => (None, Some(self.offset(OpCode::Minus, value)?)),
                    OpCode::Eq => (Some(value), Some(value)),
                    OpCode::Ge => (Some(value), None),
                    _ => (Some(self.offset(OpCode::Plus, value)?), None),
                }
            }
            OpCode::Between => {
                let Some(pair) = bound.as_expr().filter(|p| p.op == OpCode::BetweenAnd) else {
                    return Ok(None);
                };
                let (Some(low), Some(high)) = (pair.arg1.as_deref(), pair.arg2.as_deref()) else {
                    return Ok(None);
                };
                if !low.is_constant_leaf() || !high.is_constant_leaf() {
                    return Ok(None);
                }
                (Some(self.limit_bound(low)?), Some(self.limit_bound(high)?))
            }
            _ => return Ok(None),
        };
        Ok(Some(KeyLimit { lower, upper }))
    }

    fn limit_bound(&mut self, bound: &Node) -> Result<EvalId> {
        let bound = bound.clone().with_expected(DataType::BigInt);
        Ok(self.lower_expr(&bound, Unbox::AsValue)?.id)
    }

    fn limit_domain(&mut self) -> Result<DomainId> {
        self.resolve_kind(DataType::BigInt)
    }

    /// `value +/- 1`.
    fn offset(&mut self, op: OpCode, value: EvalId) -> Result<EvalId> {
        let domain = self.limit_domain()?;
        let one = self.constant(Value::Int64(1), domain)?;
        self.arithmetic(op, alloc::vec![value, one], domain, None, None)
    }

    fn fold_limit(&mut self, existing: Option<KeyLimit>, new: KeyLimit) -> Result<KeyLimit> {
        let Some(old) = existing else {
            return Ok(new);
        };
        debug!("folding key limits");
        let lower = self.combine(OpCode::Greatest, old.lower, new.lower)?;
        let upper = self.combine(OpCode::Least, old.upper, new.upper)?;
        Ok(KeyLimit { lower, upper })
    }

    fn combine(
        &mut self,
        op: OpCode,
        a: Option<EvalId>,
        b: Option<EvalId>,
    ) -> Result<Option<EvalId>> {
        match (a, b) {
            (Some(a), Some(b)) => {
                let domain = self.limit_domain()?;
                Ok(Some(self.arithmetic(op, alloc::vec![a, b], domain, None, None)?))
            }
            (one, None) | (None, one) => Ok(one),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SpecId;
    use crate::catalog::MemoryCatalog;
    use crate::config::CompilerConfig;
    use crate::eval::EvalNode;

    fn rownum() -> Node {
        Node::nullary(OpCode::RowNum, DataType::BigInt)
    }

    fn op_of(ctx: &CompilationContext<'_>, id: EvalId) -> Option<OpCode> {
        match ctx.eval(id) {
            EvalNode::Arithmetic { op, .. } => Some(*op),
            _ => None,
        }
    }

    #[test]
    fn test_upper_bounds() {
        let catalog = MemoryCatalog::new();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());

        let limit = ctx
            .compile_key_limit(&[Node::le(rownum(), Node::int(10))], None)
            .unwrap()
            .unwrap();
        assert!(limit.lower.is_none());
        assert!(ctx.eval(limit.upper.unwrap()).is_constant_leaf());

        let swapped = ctx
            .compile_key_limit(&[Node::ge(Node::int(10), rownum())], None)
            .unwrap()
            .unwrap();
        assert!(swapped.lower.is_none());
        assert!(ctx.eval(swapped.upper.unwrap()).is_constant_leaf());

        let lt = ctx
            .compile_key_limit(&[Node::lt(rownum(), Node::int(10))], None)
            .unwrap()
            .unwrap();
        assert_eq!(op_of(&ctx, lt.upper.unwrap()), Some(OpCode::Minus));
    }

    #[test]
    fn test_lower_bounds() {
        let catalog = MemoryCatalog::new();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());

        let gt = ctx.compile_key_limit(&[Node::gt(rownum(), Node::int(5))], None).unwrap().unwrap();
        assert_eq!(op_of(&ctx, gt.lower.unwrap()), Some(OpCode::Plus));
        assert!(gt.upper.is_none());

        let eq = ctx.compile_key_limit(&[Node::eq(rownum(), Node::int(3))], None).unwrap().unwrap();
        assert_eq!(eq.lower, eq.upper);

        let inst = Node::nullary(OpCode::InstNum, DataType::BigInt);
        let between = Node::between(OpCode::Between, inst, Node::int(2), Node::int(8));
        let limit = ctx.compile_key_limit(&[between], None).unwrap().unwrap();
        assert!(limit.lower.is_some() && limit.upper.is_some());
    }

    #[test]
    fn test_host_parameter_bound() {
        let catalog = MemoryCatalog::new();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let limit = ctx
            .compile_key_limit(&[Node::le(rownum(), Node::host(0, DataType::Integer))], None)
            .unwrap()
            .unwrap();
        assert!(matches!(ctx.eval(limit.upper.unwrap()), EvalNode::HostParameter { index: 0, .. }));
    }

    #[test]
    fn test_unconvertible_terms_skipped() {
        let catalog = MemoryCatalog::new();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let terms = [
            Node::le(rownum(), Node::name(SpecId(1), "n", DataType::Integer)),
            Node::le(Node::int(1), Node::int(2)),
            Node::compare(OpCode::Ne, rownum(), Node::int(4)),
        ];
        assert_eq!(ctx.compile_key_limit(&terms, None).unwrap(), None);
        assert_eq!(ctx.eval_count(), 0);
    }

    #[test]
    fn test_fold_into_existing() {
        let catalog = MemoryCatalog::new();
        let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
        let existing = ctx.compile_key_limit(&[Node::le(rownum(), Node::int(100))], None).unwrap();

        let terms = [Node::le(rownum(), Node::int(10)), Node::ge(rownum(), Node::int(2))];
        let limit = ctx.compile_key_limit(&terms, existing).unwrap().unwrap();
        assert_eq!(op_of(&ctx, limit.upper.unwrap()), Some(OpCode::Least));
        assert!(ctx.eval(limit.lower.unwrap()).is_constant_leaf());

        let again = ctx
            .compile_key_limit(&[Node::ge(rownum(), Node::int(4))], Some(limit))
            .unwrap()
            .unwrap();
        assert_eq!(op_of(&ctx, again.lower.unwrap()), Some(OpCode::Greatest));
        assert_eq!(again.upper, limit.upper);

        assert_eq!(ctx.compile_key_limit(&[], Some(limit)).unwrap(), Some(limit));
    }
}
