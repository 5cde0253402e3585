//! Parse-tree model consumed by the lowerers.

mod expr;
pub mod op;
mod predicate;
mod query;

pub use expr::{
    AggregateFunc, AggregateId, ExprNode, FuncKind, FunctionNode, NameMeta, NameRef, Node,
    NodeKind, QueryId, Qualifier, SpecId,
};
pub use op::{Arity, OpCode};
pub use predicate::{Conjunct, TermList};
pub use query::{FromAttribute, FromItem, QueryKind, SubQuery};
