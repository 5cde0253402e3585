//! Scope binder.
//!
//! A stack of per-statement scopes. Each scope holds one [`Binding`] per
//! FROM-item: the attributes it may supply and a parallel list of value slots
//! the executor fills at run time. Lookups search the innermost scope first
//! and walk outward for correlated references, marking every scope they cross.

use crate::arena::Arena;
use crate::ast::{FromItem, SpecId};
use crate::catalog::Catalog;
use crate::eval::{AttrCacheId, SlotId, ValueSlot};
use alloc::string::String;
use alloc::vec::Vec;
use quill_core::schema::AttrId;
use quill_core::{DataType, DomainCache, DomainId, Error, Result, TypeDescr};
use tracing::{debug, warn};

/// Positional layout of a binding read from a materialized tuple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Positional {
    /// Position of the binding's first attribute in the tuple.
    pub offset: usize,
    /// Read values from the binding's slots instead of the tuple.
    pub value_list_override: bool,
}

/// An attribute a binding supplies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundAttribute {
    pub name: String,
    /// Catalog id; `None` for columns of derived tables.
    pub id: Option<AttrId>,
    pub domain: DomainId,
}

/// Per-FROM-item lowering state.
#[derive(Clone, Debug)]
pub struct Binding {
    spec: SpecId,
    exposed_name: String,
    class_name: Option<String>,
    attributes: Vec<BoundAttribute>,
    slots: Vec<SlotId>,
    oid_slots: [SlotId; 2],
    cache: AttrCacheId,
    positional: Option<Positional>,
    active: bool,
}

impl Binding {
    /// Builds the bindings of a FROM-item and of its path entities and fetch
    /// specs, parent first.
    pub fn build(
        item: &FromItem,
        catalog: &dyn Catalog,
        domains: &mut DomainCache,
        slots: &mut Arena<ValueSlot>,
        next_cache: &mut u32,
        out: &mut Vec<Binding>,
    ) -> Result<()> {
        let attributes = Self::bound_attributes(item, catalog, domains)?;

        let mut attr_slots = Vec::with_capacity(attributes.len());
        for attr in &attributes {
            attr_slots.push(slots.alloc(ValueSlot {
                domain: attr.domain,
            })?);
        }
        let object = domains.resolve_kind(DataType::Object)?;
        let oid_slots = [
            slots.alloc(ValueSlot { domain: object })?,
            slots.alloc(ValueSlot { domain: object })?,
        ];

        let cache = AttrCacheId(*next_cache);
        *next_cache += 1;

        out.push(Binding {
            spec: item.spec,
            exposed_name: item.exposed_name.clone(),
            class_name: item.class_name.clone(),
            attributes,
            slots: attr_slots,
            oid_slots,
            cache,
            positional: None,
            active: false,
        });

        for child in item.path_entities.iter().chain(item.fetch_specs.iter()) {
            Self::build(child, catalog, domains, slots, next_cache, out)?;
        }
        Ok(())
    }

    fn bound_attributes(
        item: &FromItem,
        catalog: &dyn Catalog,
        domains: &mut DomainCache,
    ) -> Result<Vec<BoundAttribute>> {
        let class = match &item.class_name {
            Some(name) => Some(catalog.class(name).ok_or_else(|| {
                warn!(class = %name, "class of from-item not found");
                Error::class_not_found(name.as_str())
            })?),
            None => None,
        };

        match class {
            Some(class) if item.attributes.is_empty() => class
                .attributes()
                .iter()
                .map(|attr| {
                    Ok(BoundAttribute {
                        name: String::from(attr.name()),
                        id: Some(attr.id()),
                        domain: domains.resolve(attr.descr())?,
                    })
                })
                .collect(),
            Some(class) => item
                .attributes
                .iter()
                .map(|column| {
                    let attr = class.attribute(&column.name).ok_or_else(|| {
                        Error::unresolved_reference(item.spec.0, column.name.as_str())
                    })?;
                    Ok(BoundAttribute {
                        name: column.name.clone(),
                        id: Some(attr.id()),
                        domain: domains.resolve(attr.descr())?,
                    })
                })
                .collect(),
            None => item
                .attributes
                .iter()
                .map(|column| {
                    Ok(BoundAttribute {
                        name: column.name.clone(),
                        id: None,
                        domain: domains.resolve(&column.descr)?,
                    })
                })
                .collect(),
        }
    }

    /// Returns the FROM-item id.
    #[inline]
    pub fn spec(&self) -> SpecId {
        self.spec
    }

    /// Returns the exposed name.
    #[inline]
    pub fn exposed_name(&self) -> &str {
        &self.exposed_name
    }

    /// Returns the scanned class, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Returns the attributes in binding order.
    #[inline]
    pub fn attributes(&self) -> &[BoundAttribute] {
        &self.attributes
    }

    /// Returns the value slots, parallel to the attributes.
    #[inline]
    pub fn slots(&self) -> &[SlotId] {
        &self.slots
    }

    /// Returns whether attributes are read directly from the scanned row.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the positional layout, if any.
    #[inline]
    pub fn positional(&self) -> Option<Positional> {
        self.positional
    }

    /// Position of an attribute in this binding.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }
}

/// The bindings of one query block.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    bindings: Vec<Binding>,
    correlated: bool,
    correlation_level: usize,
}

impl Scope {
    /// Creates a scope over the given bindings.
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings,
            correlated: false,
            correlation_level: 0,
        }
    }

    /// Returns the bindings.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Returns whether a lookup from this scope reached an enclosing one.
    pub fn is_correlated(&self) -> bool {
        self.correlated
    }

    /// Number of levels out the deepest correlated lookup reached.
    pub fn correlation_level(&self) -> usize {
        self.correlation_level
    }

    fn binding_index(&self, spec: SpecId) -> Option<usize> {
        self.bindings.iter().position(|b| b.spec == spec)
    }
}

/// Correlation marks of a popped scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeSummary {
    pub correlated: bool,
    pub level: usize,
}

/// What a name resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Number of scopes crossed; zero for the innermost scope.
    pub depth: usize,
    pub spec: SpecId,
    pub active: bool,
    pub positional: Option<Positional>,
    /// Attribute position in the binding.
    pub position: usize,
    pub id: Option<AttrId>,
    pub domain: DomainId,
    pub slot: SlotId,
    pub cache: AttrCacheId,
}

/// Which object identifier a meta reference reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OidKind {
    Instance,
    Class,
}

/// Stack of scopes, innermost last.
#[derive(Clone, Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a scope.
    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Leaves the innermost scope.
    pub fn pop(&mut self) -> Option<ScopeSummary> {
        self.scopes.pop().map(|scope| ScopeSummary {
            correlated: scope.correlated,
            level: scope.correlation_level,
        })
    }

    /// Number of scopes on the stack.
    #[inline]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Returns the innermost scope.
    pub fn current(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// Returns a binding of the innermost scope for modification.
    pub fn current_binding_mut(&mut self, spec: SpecId) -> Result<&mut Binding> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| Error::unresolved_reference(spec.0, "<no scope>"))?;
        let index = scope
            .binding_index(spec)
            .ok_or_else(|| Error::unresolved_reference(spec.0, "<from-item>"))?;
        Ok(&mut scope.bindings[index])
    }

    /// Makes `spec` the binding read directly from the scanned row.
    pub fn activate(&mut self, spec: SpecId) -> Result<()> {
        self.current_binding_mut(spec)?.active = true;
        Ok(())
    }

    /// Stops reading `spec` directly from the scanned row.
    pub fn deactivate(&mut self, spec: SpecId) -> Result<()> {
        self.current_binding_mut(spec)?.active = false;
        Ok(())
    }

    /// Marks `spec` as read from a materialized tuple.
    pub fn set_positional(&mut self, spec: SpecId, layout: Option<Positional>) -> Result<()> {
        self.current_binding_mut(spec)?.positional = layout;
        Ok(())
    }

    /// Class scanned by `spec`, looked up without marking correlation.
    pub fn class_of(&self, spec: SpecId) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.iter().find(|b| b.spec == spec))
            .and_then(Binding::class_name)
    }

    /// Resolves an attribute of a FROM-item.
    pub fn resolve(&mut self, spec: SpecId, name: &str) -> Result<Resolved> {
        let (depth, scope, binding) = self.find(spec, name)?;
        let position = self.scopes[scope].bindings[binding]
            .position_of(name)
            .ok_or_else(|| {
                warn!(spec = spec.0, name, "attribute not supplied by from-item");
                Error::unresolved_reference(spec.0, name)
            })?;
        self.mark_crossed(scope, depth);
        let binding = &self.scopes[scope].bindings[binding];
        let attr = &binding.attributes[position];
        Ok(Resolved {
            depth,
            spec,
            active: binding.active,
            positional: binding.positional,
            position,
            id: attr.id,
            domain: attr.domain,
            slot: binding.slots[position],
            cache: binding.cache,
        })
    }

    /// Resolves the OID or class OID pseudo-attribute of a FROM-item.
    pub fn resolve_oid(
        &mut self,
        spec: SpecId,
        kind: OidKind,
        domain: DomainId,
    ) -> Result<Resolved> {
        let name = match kind {
            OidKind::Instance => "oid",
            OidKind::Class => "class oid",
        };
        let (depth, scope, binding) = self.find(spec, name)?;
        self.mark_crossed(scope, depth);
        let binding = &self.scopes[scope].bindings[binding];
        let (id, slot) = match kind {
            OidKind::Instance => (AttrId::OID, binding.oid_slots[0]),
            OidKind::Class => (AttrId::CLASS_OID, binding.oid_slots[1]),
        };
        Ok(Resolved {
            depth,
            spec,
            active: binding.active,
            positional: None,
            position: 0,
            id: Some(id),
            domain,
            slot,
            cache: binding.cache,
        })
    }

    /// Locates the binding of `spec`, innermost scope first.
    fn find(&self, spec: SpecId, name: &str) -> Result<(usize, usize, usize)> {
        if self.scopes.is_empty() {
            warn!(spec = spec.0, name, "lookup with no scope");
            return Err(Error::unresolved_reference(spec.0, name));
        }

        let top = self.scopes.len() - 1;
        let found = (0..=top)
            .rev()
            .find_map(|i| self.scopes[i].binding_index(spec).map(|b| (i, b)));

        let Some((scope, binding)) = found else {
            warn!(spec = spec.0, name, "no binding in any enclosing scope");
            return Err(Error::unresolved_reference(spec.0, name));
        };
        Ok((top - scope, scope, binding))
    }

    /// Marks every scope above `scope` as correlated once a reference
    /// `depth` levels out has resolved.
    fn mark_crossed(&mut self, scope: usize, depth: usize) {
        if depth == 0 {
            return;
        }
        debug!(depth, "correlated reference");
        let top = scope + depth;
        for (crossed, i) in (scope + 1..=top).rev().enumerate() {
            let s = &mut self.scopes[i];
            s.correlated = true;
            s.correlation_level = s.correlation_level.max(depth - crossed);
        }
    }
}

/// Type descriptor of a pseudo-attribute holding an object identifier.
pub(crate) fn oid_descr() -> TypeDescr {
    TypeDescr::new(DataType::Object)
}
