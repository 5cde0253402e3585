//! Class definition.

use super::column::{AttrId, Attribute};
use super::index::{IndexDef, IndexId, IndexedColumn};
use crate::error::{Error, Result};
use crate::value::Oid;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// A class (table) definition.
#[derive(Clone, Debug)]
pub struct Class {
    name: String,
    oid: Oid,
    attributes: Vec<Attribute>,
    indexes: Vec<IndexDef>,
}

impl Class {
    /// Returns the class name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the class OID.
    #[inline]
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// Returns the attributes in definition order.
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the indexes.
    #[inline]
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Gets an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Gets an index by id.
    pub fn index(&self, id: IndexId) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.id() == id)
    }
}

/// Builder for class definitions.
pub struct ClassBuilder {
    name: String,
    oid: Oid,
    attributes: Vec<Attribute>,
    indexes: Vec<IndexDef>,
    next_index_id: u32,
}

impl ClassBuilder {
    /// Creates a new class builder.
    pub fn new(name: impl Into<String>, oid: Oid) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        Ok(Self {
            name,
            oid,
            attributes: Vec::new(),
            indexes: Vec::new(),
            next_index_id: 0,
        })
    }

    fn check_naming_rules(name: &str) -> Result<()> {
        let mut chars = name.chars();
        match chars.next() {
            None => return Err(Error::invalid_schema("name cannot be empty")),
            Some(c) if !c.is_ascii_alphabetic() && c != '_' => {
                return Err(Error::invalid_schema(format!(
                    "name must start with letter or underscore: {}",
                    name
                )))
            }
            _ => {}
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::invalid_schema(format!("invalid name: {}", name)));
        }
        Ok(())
    }

    /// Adds an attribute; ids are assigned in definition order starting at 0.
    pub fn add_attribute(mut self, attribute: Attribute) -> Result<Self> {
        Self::check_naming_rules(attribute.name())?;
        if self.attributes.iter().any(|a| a.name() == attribute.name()) {
            return Err(Error::invalid_schema(format!(
                "duplicate attribute {} in {}",
                attribute.name(),
                self.name
            )));
        }
        let position = self.attributes.len();
        self.attributes
            .push(attribute.with_position(position, AttrId(position as i32)));
        Ok(self)
    }

    /// Adds an index over existing attributes.
    pub fn add_index(
        mut self,
        name: impl Into<String>,
        columns: Vec<IndexedColumn>,
    ) -> Result<Self> {
        let name = name.into();
        self.validate_columns(&name, &columns, None)?;
        let id = self.allocate_index_id();
        self.indexes
            .push(IndexDef::new(id, name, self.name.clone(), columns));
        Ok(self)
    }

    /// Adds a function-based index whose key at `position` is computed.
    pub fn add_function_index(
        mut self,
        name: impl Into<String>,
        columns: Vec<IndexedColumn>,
        position: usize,
    ) -> Result<Self> {
        let name = name.into();
        if position >= columns.len() {
            return Err(Error::invalid_schema(format!(
                "function key position {} out of range in {}",
                position, name
            )));
        }
        self.validate_columns(&name, &columns, Some(position))?;
        let id = self.allocate_index_id();
        self.indexes.push(
            IndexDef::new(id, name, self.name.clone(), columns).function_key(position),
        );
        Ok(self)
    }

    fn validate_columns(
        &self,
        name: &str,
        columns: &[IndexedColumn],
        function_position: Option<usize>,
    ) -> Result<()> {
        if columns.is_empty() {
            return Err(Error::invalid_schema(format!("index {} has no columns", name)));
        }
        for (i, column) in columns.iter().enumerate() {
            if Some(i) == function_position {
                continue;
            }
            let attr = self
                .attributes
                .iter()
                .find(|a| a.name() == column.name)
                .ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "index {} references unknown {}",
                        name, column.name
                    ))
                })?;
            let kind = attr.descr().kind;
            if column.is_prefix() && !kind.is_char_string() && !kind.is_bit_string() {
                return Err(Error::invalid_schema(format!(
                    "prefix length on non-string column {}",
                    column.name
                )));
            }
        }
        Ok(())
    }

    fn allocate_index_id(&mut self) -> IndexId {
        let id = IndexId(self.next_index_id);
        self.next_index_id += 1;
        id
    }

    /// Builds the class definition.
    pub fn build(self) -> Class {
        Class {
            name: self.name,
            oid: self.oid,
            attributes: self.attributes,
            indexes: self.indexes,
        }
    }
}
