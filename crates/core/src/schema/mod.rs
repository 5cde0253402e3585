//! Catalog schema definitions.
//!
//! Read-only descriptions of classes, their attributes and their indexes, as
//! the compiler sees them through catalog lookups.

mod column;
mod index;
mod table;

pub use column::{AttrId, Attribute, AttributeKind};
pub use index::{IndexDef, IndexId, IndexedColumn, Order};
pub use table::{Class, ClassBuilder};
