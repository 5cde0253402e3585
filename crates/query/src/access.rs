//! Access paths chosen by the optimizer.
//!
//! The optimizer decides join order, the access method of each scanned
//! relation and, for index scans, which predicate terms feed the key range.
//! Everything here is input to the lowerers; nothing is decided here.

use crate::ast::{Node, SpecId, TermList};
use crate::context::CompilationContext;
use crate::keyrange::KeyRangeDescriptor;
use crate::lower::LoweredPredicate;
use alloc::string::String;
use alloc::vec::Vec;
use quill_core::schema::IndexId;
use quill_core::Result;
use tracing::{debug, instrument};

/// Scan flags of an index access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexFlags {
    /// The index holds every column the query reads.
    pub covering: bool,
    /// Scan the index in reverse key order.
    pub descending: bool,
    /// Skip the unconstrained leading column (index skip scan).
    pub skip_scan: bool,
}

/// An index scan with its assigned terms.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexAccess {
    /// FROM-item the index scans.
    pub spec: SpecId,
    pub class_name: String,
    pub index: IndexId,
    /// Terms assigned to the key range, one per constrained column.
    pub key_terms: Vec<Node>,
    /// Terms left as a filter over the scanned rows.
    pub residual: TermList,
    /// Row-numbering terms convertible into a key limit.
    pub limit_terms: Vec<Node>,
    pub flags: IndexFlags,
}

impl IndexAccess {
    /// Creates an index access with no assigned terms.
    pub fn new(spec: SpecId, class_name: impl Into<String>, index: IndexId) -> Self {
        Self {
            spec,
            class_name: class_name.into(),
            index,
            key_terms: Vec::new(),
            residual: TermList::new(),
            limit_terms: Vec::new(),
            flags: IndexFlags::default(),
        }
    }

    /// Assigns the key-range terms.
    pub fn key_terms(mut self, terms: Vec<Node>) -> Self {
        self.key_terms = terms;
        self
    }

    /// Sets the residual filter.
    pub fn residual(mut self, residual: TermList) -> Self {
        self.residual = residual;
        self
    }

    /// Assigns the key-limit terms.
    pub fn limit_terms(mut self, terms: Vec<Node>) -> Self {
        self.limit_terms = terms;
        self
    }

    /// Marks the index as covering.
    pub fn covering(mut self) -> Self {
        self.flags.covering = true;
        self
    }

    /// Scans in descending key order.
    pub fn descending(mut self) -> Self {
        self.flags.descending = true;
        self
    }

    /// Requests an index skip scan.
    pub fn skip_scan(mut self) -> Self {
        self.flags.skip_scan = true;
        self
    }
}

/// Access method of a scanned relation.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessMethod {
    /// Full scan of the class.
    Sequential,
    /// Index scan.
    Index(IndexAccess),
    /// Scan of a materialized list file.
    List,
    /// Scan of a collection-valued expression.
    SetExpression,
}

/// Access path of one FROM-item.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessPath {
    pub spec: SpecId,
    pub method: AccessMethod,
    /// Filter applied to every fetched row.
    pub filter: TermList,
}

impl AccessPath {
    /// Creates an access path with no filter.
    pub fn new(spec: SpecId, method: AccessMethod) -> Self {
        Self {
            spec,
            method,
            filter: TermList::new(),
        }
    }

    /// Returns the index access, if this is an index scan.
    pub fn index(&self) -> Option<&IndexAccess> {
        match &self.method {
            AccessMethod::Index(access) => Some(access),
            _ => None,
        }
    }

    /// Terms the scan filter must evaluate: the residual of an index scan
    /// followed by the path's own filter.
    pub fn filter_terms(&self) -> TermList {
        let mut terms = match &self.method {
            AccessMethod::Index(access) => access.residual.clone(),
            _ => TermList::new(),
        };
        terms.conjuncts.extend(self.filter.conjuncts.iter().cloned());
        terms
    }
}

/// Lowered form of one access path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledScan {
    pub spec: SpecId,
    /// Key ranges of an index scan.
    pub key_range: Option<KeyRangeDescriptor>,
    /// Filter over every fetched row.
    pub filter: LoweredPredicate,
}

impl CompilationContext<'_> {
    /// Lowers the key range and the scan filter of an access path. The
    /// scanned FROM-item must already be active.
    #[instrument(level = "trace", skip(self, path), fields(spec = path.spec.0))]
    pub fn compile_scan(&mut self, path: &AccessPath) -> Result<CompiledScan> {
        let key_range = path
            .index()
            .map(|access| self.compile_key_range(access))
            .transpose()?;
        let filter = self.lower_predicate(&path.filter_terms())?;
        debug!(
            indexed = key_range.is_some(),
            filtered = filter.pred.is_some(),
            "access path compiled"
        );
        Ok(CompiledScan {
            spec: path.spec,
            key_range,
            filter,
        })
    }
}
