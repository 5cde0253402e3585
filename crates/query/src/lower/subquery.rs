//! Sub-query lowering.

use super::{NumberingFlags, SideChannel, Unbox};
use crate::ast::{Node, QueryId, SubQuery};
use crate::context::{CompilationContext, SubPlanBuilder};
use crate::eval::{EvalId, EvalNode, PredId, SubPlanId};
use crate::scope::ScopeSummary;
use alloc::format;
use alloc::vec::Vec;
use quill_core::{Error, Result};
use tracing::{debug, instrument, warn};

impl CompilationContext<'_> {
    /// A sub-query in value position reads the single tuple of its plan; as
    /// a row source it reads the plan itself unless it is known to produce
    /// one row.
    pub(crate) fn lower_subquery(
        &mut self,
        node: &Node,
        query: &SubQuery,
        unbox: Unbox,
    ) -> Result<EvalId> {
        let columns = query.visible_columns();
        if unbox == Unbox::AsValue && columns != 1 {
            warn!(query = query.id.0, columns, "sub-query in value position is not scalar");
            return Err(Error::invalid_expression(format!(
                "sub-query in value position returns {} columns",
                columns
            )));
        }

        let mut plan = self.build_subplan(query)?;
        let descr = match query.select_list.first() {
            Some(first) if node.descr.is_unresolved() && columns == 1 => &first.descr,
            _ => &node.descr,
        };
        let domain = self.resolve(descr)?;

        let single_row = query.single_row || unbox == Unbox::AsValue;
        let slot = if single_row {
            let slot = match plan.single_tuple {
                Some(slot) => slot,
                None => {
                    let slot = self.alloc_slot(domain)?;
                    plan.single_tuple = Some(slot);
                    self.plans.insert(query.id, plan);
                    slot
                }
            };
            Some(slot)
        } else {
            None
        };

        debug!(query = query.id.0, plan = plan.id.0, single_row, "sub-query result");
        self.alloc_eval(EvalNode::SubPlanResult {
            plan: plan.id,
            single_row,
            slot,
            domain,
        })
    }
}

/// A sub-query block lowered in a scope of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredBlock {
    /// Lowered select list, hidden columns included.
    pub outputs: Vec<EvalId>,
    pub filter: Option<PredId>,
    pub continuation: NumberingFlags,
    /// Correlation marks of the block's scope.
    pub scope: ScopeSummary,
    pub side: SideChannel,
}

impl CompilationContext<'_> {
    /// Lowers the select list and search condition of `query` under a scope
    /// for its FROM list. The scope is popped even when lowering fails.
    #[instrument(level = "trace", skip_all, fields(query = query.id.0))]
    pub(crate) fn lower_block(&mut self, query: &SubQuery) -> Result<LoweredBlock> {
        self.push_scope(&query.from)?;
        let body = lower_body(self, query);
        let scope = self.pop_scope()?;
        let (outputs, filter, continuation, side) = body?;
        Ok(LoweredBlock {
            outputs,
            filter,
            continuation,
            scope,
            side,
        })
    }
}

type BlockBody = (Vec<EvalId>, Option<PredId>, NumberingFlags, SideChannel);

fn lower_body(ctx: &mut CompilationContext<'_>, query: &SubQuery) -> Result<BlockBody> {
    let (outputs, mut side) = ctx.lower_list(&query.select_list, Unbox::AsValue)?;
    let filter = ctx.lower_predicate(&query.where_clause)?;
    side.merge(filter.side);
    Ok((outputs, filter.pred, filter.continuation, side))
}

/// One sub-query block compiled by [`BlockBuilder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledBlock {
    pub id: SubPlanId,
    pub query: QueryId,
    /// Lowered select list, hidden columns included.
    pub outputs: Vec<EvalId>,
    pub filter: Option<PredId>,
    pub continuation: NumberingFlags,
    /// Correlation marks of the block's scope.
    pub scope: ScopeSummary,
    pub side: SideChannel,
}

/// Sub-plan builder that keeps every lowered block in completion order.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    blocks: Vec<CompiledBlock>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks compiled so far, in completion order.
    pub fn blocks(&self) -> &[CompiledBlock] {
        &self.blocks
    }

    pub fn block(&self, id: SubPlanId) -> Option<&CompiledBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Block compiled for `query`.
    pub fn block_of(&self, query: QueryId) -> Option<&CompiledBlock> {
        self.blocks.iter().find(|b| b.query == query)
    }
}

impl SubPlanBuilder for BlockBuilder {
    fn build(&mut self, query: &SubQuery, block: LoweredBlock) -> Result<SubPlanId> {
        let id = SubPlanId(self.blocks.len() as u32);
        debug!(
            plan = id.0,
            correlated = block.scope.correlated,
            level = block.scope.level,
            "block compiled"
        );
        self.blocks.push(CompiledBlock {
            id,
            query: query.id,
            outputs: block.outputs,
            filter: block.filter,
            continuation: block.continuation,
            scope: block.scope,
            side: block.side,
        });
        Ok(id)
    }
}
