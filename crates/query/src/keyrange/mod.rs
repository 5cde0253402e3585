//! Index key-range compilation.
//!
//! Turns the terms the optimizer assigned to an index scan into key-range
//! descriptors: per range a kind and the lower/upper key expressions, with
//! composite keys in index column order. Row-numbering terms on the scan
//! become a key limit.
//!
//! ```text
//! a = 5 AND b IN (1, 2, 3)   over index (a, b)
//!   => List [ (5,1) EqNa, (5,2) EqNa, (5,3) EqNa ]
//! ```

mod compile;
mod limit;
mod range;

pub use range::RangeKind;

use crate::eval::EvalId;
use crate::lower::SideChannel;
use alloc::vec::Vec;
use quill_core::schema::IndexId;

/// Shape of a compiled key range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyShape {
    /// One equality key.
    Single,
    /// One range.
    Range,
    /// Several equality keys.
    List,
    /// Several ranges, possibly mixed with equality keys.
    RangeList,
}

/// One range of an index scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyRange {
    pub kind: RangeKind,
    pub lower: Option<EvalId>,
    pub upper: Option<EvalId>,
}

/// Row-number bounds of an index scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyLimit {
    /// First row number to return.
    pub lower: Option<EvalId>,
    /// Last row number to return.
    pub upper: Option<EvalId>,
}

/// Compiled key ranges of one index scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRangeDescriptor {
    pub index: IndexId,
    pub shape: KeyShape,
    pub ranges: Vec<KeyRange>,
    /// Every key is built from literals and host parameters only, so the
    /// ranges can be evaluated once per execution.
    pub is_constant: bool,
    /// The leading key is a placeholder for an index skip scan.
    pub iss_placeholder: bool,
    pub descending: bool,
    pub covering: bool,
    pub limit: Option<KeyLimit>,
    pub side: SideChannel,
}

impl KeyRangeDescriptor {
    /// Number of ranges scanned.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if no range is scanned.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
