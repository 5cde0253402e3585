//! Attribute definition of a class.

use crate::types::TypeDescr;
use crate::value::Value;
use alloc::string::String;

/// Catalog identifier of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub i32);

impl AttrId {
    /// Pseudo-attribute reading the instance OID.
    pub const OID: AttrId = AttrId(-1);
    /// Pseudo-attribute reading the OID of the instance's class.
    pub const CLASS_OID: AttrId = AttrId(-2);
}

/// Storage kind of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum AttributeKind {
    /// One value per instance.
    #[default]
    Instance,
    /// One value shared by every instance of the class.
    Shared,
    /// A value attached to the class object itself.
    Class,
}

/// An attribute definition in a class schema.
#[derive(Clone, Debug)]
pub struct Attribute {
    name: String,
    id: AttrId,
    descr: TypeDescr,
    kind: AttributeKind,
    /// Value of a shared or class attribute.
    default_value: Option<Value>,
    /// Position of the attribute in the class (0-based).
    index: usize,
}

impl Attribute {
    /// Creates a new instance attribute.
    pub fn new(name: impl Into<String>, descr: impl Into<TypeDescr>) -> Self {
        Self {
            name: name.into(),
            id: AttrId(0),
            descr: descr.into(),
            kind: AttributeKind::Instance,
            default_value: None,
            index: 0,
        }
    }

    /// Sets the storage kind.
    pub fn kind(mut self, kind: AttributeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the stored value of a shared/class attribute.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub(crate) fn with_position(mut self, index: usize, id: AttrId) -> Self {
        self.index = index;
        self.id = id;
        self
    }

    /// Returns the attribute name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attribute id.
    #[inline]
    pub fn id(&self) -> AttrId {
        self.id
    }

    /// Returns the declared type.
    #[inline]
    pub fn descr(&self) -> &TypeDescr {
        &self.descr
    }

    /// Returns the storage kind.
    #[inline]
    pub fn attribute_kind(&self) -> AttributeKind {
        self.kind
    }

    /// Returns the stored value of a shared/class attribute.
    pub fn stored_value(&self) -> Value {
        self.default_value.clone().unwrap_or(Value::Null)
    }

    /// Returns the position in the class.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.descr == other.descr
    }
}
