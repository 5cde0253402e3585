//! Quill Query - Lowering stages of the Quill query compiler.
//!
//! This crate turns the resolved parse tree of a query into the executor's
//! evaluation trees:
//!
//! - `ast`: parse-tree nodes, operator codes and term lists
//! - `scope`: FROM-item scopes, name binding and correlation marks
//! - `lower`: scalar expressions and search conditions to eval/predicate trees
//! - `keyrange`: index terms to key-range descriptors and key limits
//! - `context`: per-statement compilation context owning the node arenas
//! - `catalog`: read-only catalog lookups
//! - `config`: compiler settings
//!
//! # Example
//!
//! ```rust
//! use quill_query::ast::{FromItem, Node, SpecId, TermList};
//! use quill_query::catalog::MemoryCatalog;
//! use quill_query::config::CompilerConfig;
//! use quill_query::context::CompilationContext;
//! use quill_core::schema::{Attribute, ClassBuilder};
//! use quill_core::{DataType, Oid};
//!
//! let class = ClassBuilder::new("t", Oid::new(0, 1, 0))
//!     .unwrap()
//!     .add_attribute(Attribute::new("a", DataType::Integer))
//!     .unwrap()
//!     .build();
//! let mut catalog = MemoryCatalog::new();
//! catalog.register_class(class);
//!
//! let mut ctx = CompilationContext::new(&catalog, CompilerConfig::default());
//! ctx.push_scope(&[FromItem::class(SpecId(1), "t", "t")]).unwrap();
//! ctx.activate(SpecId(1)).unwrap();
//!
//! let a = Node::name(SpecId(1), "a", DataType::Integer);
//! let terms = TermList::new().and(Node::gt(a, Node::int(5)));
//! let lowered = ctx.lower_predicate(&terms).unwrap();
//! assert!(lowered.pred.is_some());
//! ```

#![no_std]

extern crate alloc;

pub mod access;
pub mod arena;
pub mod ast;
pub mod catalog;
pub mod config;
pub mod context;
pub mod eval;
pub mod keyrange;
pub mod lower;
pub mod pred;
pub mod scope;

pub use access::{AccessMethod, AccessPath, CompiledScan, IndexAccess, IndexFlags};
pub use catalog::{Catalog, MemoryCatalog};
pub use config::CompilerConfig;
pub use context::{CompilationContext, SubPlan, SubPlanBuilder};
pub use eval::{EvalId, EvalNode, PredId};
pub use keyrange::{KeyLimit, KeyRange, KeyRangeDescriptor, KeyShape, RangeKind};
pub use lower::{BlockBuilder, Lowered, LoweredBlock, LoweredPredicate, SideChannel, Unbox};
pub use pred::PredExpr;
