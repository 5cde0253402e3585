//! Domain resolver.
//!
//! Turns a static [`TypeDescr`] into a canonical [`Domain`], interned in a
//! [`DomainCache`]. Two descriptors that describe the same domain resolve to
//! the same [`DomainId`], and a `DomainId` always maps to the same `&Domain`,
//! so consumers compare domains by id rather than structurally.

use crate::error::{Error, Result};
use crate::types::{CollationId, Codeset, DataType, TypeDescr};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Identity of an interned domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(u32);

impl DomainId {
    /// Returns the raw index of this domain in its cache.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A canonical value domain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Domain {
    pub kind: DataType,
    /// Zero for kinds without a precision.
    pub precision: u32,
    pub scale: u16,
    pub codeset: Codeset,
    pub collation: CollationId,
    /// Element domains of a collection.
    pub elements: Vec<DomainId>,
    pub class_name: Option<String>,
}

/// Interning cache for domains.
#[derive(Debug, Default)]
pub struct DomainCache {
    domains: Vec<Domain>,
    lookup: HashMap<Domain, DomainId>,
}

impl DomainCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a type descriptor to its interned domain.
    ///
    /// Fails when the descriptor (or one of its element types) was never
    /// inferred, or when its parameters are inconsistent.
    pub fn resolve(&mut self, descr: &TypeDescr) -> Result<DomainId> {
        if descr.kind.is_unresolved() {
            return Err(Error::unresolved_domain("type was never inferred"));
        }

        let mut elements = Vec::with_capacity(descr.elements.len());
        for element in &descr.elements {
            let id = self.resolve(element).map_err(|_| {
                Error::unresolved_domain(format!("element type of {:?}", descr.kind))
            })?;
            elements.push(id);
        }
        if !descr.kind.is_collection() && !elements.is_empty() {
            return Err(Error::unresolved_domain(format!(
                "{:?} cannot carry element types",
                descr.kind
            )));
        }

        let (precision, scale) = Self::parameters(descr)?;
        let (codeset, collation) = if descr.kind.is_char_string() {
            (descr.codeset, descr.collation)
        } else {
            (Codeset::default(), CollationId::BINARY)
        };
        let class_name = if descr.kind == DataType::Object {
            descr.class_name.clone()
        } else {
            None
        };

        Ok(self.intern(Domain {
            kind: descr.kind,
            precision,
            scale,
            codeset,
            collation,
            elements,
            class_name,
        }))
    }

    /// Resolves a bare kind with default parameters.
    pub fn resolve_kind(&mut self, kind: DataType) -> Result<DomainId> {
        self.resolve(&TypeDescr::new(kind))
    }

    /// Resolves a NUMERIC domain with explicit precision and scale.
    pub fn numeric(&mut self, precision: u32, scale: u16) -> Result<DomainId> {
        self.resolve(&TypeDescr::numeric(precision, scale))
    }

    /// Returns the domain behind an id issued by this cache.
    #[inline]
    pub fn get(&self, id: DomainId) -> &Domain {
        &self.domains[id.index()]
    }

    /// Returns the kind of an interned domain.
    #[inline]
    pub fn kind(&self, id: DomainId) -> DataType {
        self.get(id).kind
    }

    /// Number of distinct domains interned so far.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    fn intern(&mut self, domain: Domain) -> DomainId {
        if let Some(id) = self.lookup.get(&domain) {
            return *id;
        }
        let id = DomainId(self.domains.len() as u32);
        self.domains.push(domain.clone());
        self.lookup.insert(domain, id);
        id
    }

    fn parameters(descr: &TypeDescr) -> Result<(u32, u16)> {
        let kind = descr.kind;
        if !kind.is_parameterized() {
            return Ok((0, 0));
        }

        let precision = descr
            .precision
            .or_else(|| kind.default_precision())
            .unwrap_or(0);
        if precision == 0 {
            return Err(Error::unresolved_domain(format!("{:?} with zero precision", kind)));
        }
        if let Some(max) = kind.max_precision() {
            if precision > max {
                return Err(Error::unresolved_domain(format!(
                    "{:?} precision {} exceeds {}",
                    kind, precision, max
                )));
            }
        }

        let scale = if kind == DataType::Numeric {
            descr.scale.unwrap_or(crate::types::DEFAULT_NUMERIC_SCALE)
        } else {
            0
        };
        if scale as u32 > precision {
            return Err(Error::unresolved_domain(format!(
                "scale {} exceeds precision {}",
                scale, precision
            )));
        }
        Ok((precision, scale))
    }
}
