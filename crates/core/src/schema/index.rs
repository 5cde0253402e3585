//! Index definition of a class.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Catalog identifier of an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub u32);

/// Sort order for index columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A column within an index definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedColumn {
    /// Attribute name. Empty for the key of a function-based index.
    pub name: String,
    /// Sort order for this column in the index.
    pub order: Order,
    /// Number of leading characters kept in the key, for prefix indexes.
    pub prefix_length: Option<u32>,
}

impl IndexedColumn {
    /// Creates a new indexed column with default ascending order.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: Order::Asc,
            prefix_length: None,
        }
    }

    /// Sets the sort order.
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Keeps only the first `length` characters of the value in the key.
    pub fn prefix(mut self, length: u32) -> Self {
        self.prefix_length = Some(length);
        self
    }

    /// Returns whether the key holds a truncated value.
    #[inline]
    pub fn is_prefix(&self) -> bool {
        self.prefix_length.is_some()
    }
}

/// An index definition in a class schema.
#[derive(Clone, Debug)]
pub struct IndexDef {
    id: IndexId,
    name: String,
    class_name: String,
    columns: Vec<IndexedColumn>,
    unique: bool,
    /// Position of the computed key column of a function-based index.
    function_position: Option<usize>,
}

impl IndexDef {
    /// Creates a new index definition.
    pub fn new(
        id: IndexId,
        name: impl Into<String>,
        class_name: impl Into<String>,
        columns: Vec<IndexedColumn>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            class_name: class_name.into(),
            columns,
            unique: false,
            function_position: None,
        }
    }

    /// Sets whether this index is unique.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Marks the column at `position` as a computed key.
    pub fn function_key(mut self, position: usize) -> Self {
        self.function_position = Some(position);
        self
    }

    /// Returns the index id.
    #[inline]
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// Returns the index name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning class name.
    #[inline]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the normalized name (class.index).
    pub fn normalized_name(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }

    /// Returns the indexed columns in key order.
    #[inline]
    pub fn columns(&self) -> &[IndexedColumn] {
        &self.columns
    }

    /// Returns whether this index is unique.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns whether the key spans several columns.
    #[inline]
    pub fn is_multi_column(&self) -> bool {
        self.columns.len() > 1
    }

    /// Returns the position of the computed key column, if any.
    #[inline]
    pub fn function_position(&self) -> Option<usize> {
        self.function_position
    }

    /// Returns the key position of the named attribute.
    pub fn position_of(&self, attribute: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == attribute)
    }

    /// Returns whether any column stores a truncated value.
    pub fn has_prefix_columns(&self) -> bool {
        self.columns.iter().any(IndexedColumn::is_prefix)
    }
}

impl PartialEq for IndexDef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.class_name == other.class_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_indexed_column() {
        let col = IndexedColumn::new("name").order(Order::Desc).prefix(4);

        assert_eq!(col.name, "name");
        assert_eq!(col.order, Order::Desc);
        assert!(col.is_prefix());
    }

    #[test]
    fn test_index_def() {
        let idx = IndexDef::new(
            IndexId(3),
            "i_emp_name",
            "emp",
            vec![IndexedColumn::new("dept"), IndexedColumn::new("name").prefix(2)],
        )
        .unique(true);

        assert_eq!(idx.id(), IndexId(3));
        assert_eq!(idx.normalized_name(), "emp.i_emp_name");
        assert!(idx.is_unique());
        assert!(idx.is_multi_column());
        assert!(idx.has_prefix_columns());
        assert_eq!(idx.position_of("name"), Some(1));
        assert_eq!(idx.position_of("salary"), None);
    }

    #[test]
    fn test_function_index() {
        let idx = IndexDef::new(
            IndexId(1),
            "i_upper_name",
            "emp",
            vec![IndexedColumn::new("")],
        )
        .function_key(0);

        assert_eq!(idx.function_position(), Some(0));
        assert!(!idx.is_multi_column());
    }
}
