//! Read-only catalog access.
//!
//! The lowerers only read the catalog: attribute ids and domains by class,
//! index column order and prefix lengths, the defining expression of a
//! function-based index, and serial identifiers.

use crate::ast::Node;
use alloc::collections::BTreeMap;
use alloc::string::String;
use quill_core::schema::{Class, IndexDef, IndexId};
use quill_core::Oid;

/// Catalog lookups used during lowering.
pub trait Catalog {
    /// Looks up a class by name.
    fn class(&self, name: &str) -> Option<&Class>;

    /// Defining expression of the computed key of a function-based index.
    fn index_key_expr(&self, class: &str, index: IndexId) -> Option<&Node>;

    /// Object identifier of a serial.
    fn serial(&self, name: &str) -> Option<Oid>;

    /// Looks up an index of a class.
    fn index(&self, class: &str, index: IndexId) -> Option<&IndexDef> {
        self.class(class).and_then(|c| c.index(index))
    }
}

/// In-memory catalog.
#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    classes: BTreeMap<String, Class>,
    key_exprs: BTreeMap<(String, IndexId), Node>,
    serials: BTreeMap<String, Oid>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class definition.
    pub fn register_class(&mut self, class: Class) {
        self.classes.insert(String::from(class.name()), class);
    }

    /// Registers the defining expression of a function-based index.
    pub fn register_key_expr(&mut self, class: impl Into<String>, index: IndexId, expr: Node) {
        self.key_exprs.insert((class.into(), index), expr);
    }

    /// Registers a serial.
    pub fn register_serial(&mut self, name: impl Into<String>, oid: Oid) {
        self.serials.insert(name.into(), oid);
    }

    /// Finds an index whose leading columns are exactly `columns`.
    pub fn find_index(&self, class: &str, columns: &[&str]) -> Option<&IndexDef> {
        self.classes.get(class).and_then(|c| {
            c.indexes().iter().find(|idx| {
                idx.columns().len() >= columns.len()
                    && idx
                        .columns()
                        .iter()
                        .zip(columns.iter())
                        .all(|(a, b)| a.name == *b)
            })
        })
    }
}

impl Catalog for MemoryCatalog {
    fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    fn index_key_expr(&self, class: &str, index: IndexId) -> Option<&Node> {
        self.key_exprs.get(&(String::from(class), index))
    }

    fn serial(&self, name: &str) -> Option<Oid> {
        self.serials.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{OpCode, SpecId};
    use alloc::vec;
    use quill_core::schema::{Attribute, ClassBuilder, IndexedColumn};
    use quill_core::DataType;

    fn catalog() -> MemoryCatalog {
        let class = ClassBuilder::new("emp", Oid::new(0, 10, 1))
            .unwrap()
            .add_attribute(Attribute::new("id", DataType::Integer))
            .unwrap()
            .add_attribute(Attribute::new("name", DataType::VarChar))
            .unwrap()
            .add_index("i_emp_id_name", vec![IndexedColumn::new("id"), IndexedColumn::new("name")])
            .unwrap()
            .add_function_index("i_emp_upper", vec![IndexedColumn::new("")], 0)
            .unwrap()
            .build();
        let mut catalog = MemoryCatalog::new();
        catalog.register_class(class);
        catalog
    }

    #[test]
    fn test_class_and_index_lookup() {
        let catalog = catalog();
        assert!(catalog.class("emp").is_some());
        assert!(catalog.class("dept").is_none());
        assert_eq!(catalog.index("emp", IndexId(0)).unwrap().name(), "i_emp_id_name");
        assert!(catalog.find_index("emp", &["id"]).is_some());
        assert!(catalog.find_index("emp", &["name"]).is_none());
    }

    #[test]
    fn test_key_expr_and_serial() {
        let mut catalog = catalog();
        let upper = Node::unary(
            OpCode::Upper,
            Node::name(SpecId(0), "name", DataType::VarChar),
            DataType::VarChar,
        );
        catalog.register_key_expr("emp", IndexId(1), upper.clone());
        catalog.register_serial("order_seq", Oid::new(0, 40, 3));

        assert_eq!(catalog.index_key_expr("emp", IndexId(1)), Some(&upper));
        assert_eq!(catalog.index_key_expr("emp", IndexId(0)), None);
        assert_eq!(catalog.serial("order_seq"), Some(Oid::new(0, 40, 3)));
        assert_eq!(catalog.serial("missing"), None);
    }
}
