//! FROM-items and embedded sub-queries.

use super::expr::{Node, QueryId, SpecId};
use super::predicate::TermList;
use alloc::string::String;
use alloc::vec::Vec;
use quill_core::TypeDescr;

/// A column a FROM-item exposes.
#[derive(Clone, Debug, PartialEq)]
pub struct FromAttribute {
    pub name: String,
    pub descr: TypeDescr,
}

impl FromAttribute {
    /// Creates a new exposed column.
    pub fn new(name: impl Into<String>, descr: impl Into<TypeDescr>) -> Self {
        Self {
            name: name.into(),
            descr: descr.into(),
        }
    }
}

/// One entry of a FROM clause.
#[derive(Clone, Debug, PartialEq)]
pub struct FromItem {
    pub spec: SpecId,
    /// Name or alias visible to the statement.
    pub exposed_name: String,
    /// Class scanned by this item; `None` for derived tables.
    pub class_name: Option<String>,
    /// Referenced columns. Empty on a class item means every attribute of
    /// the class.
    pub attributes: Vec<FromAttribute>,
    /// Path expressions navigated from this item.
    pub path_entities: Vec<FromItem>,
    /// Fetch specs hanging off this item.
    pub fetch_specs: Vec<FromItem>,
}

impl FromItem {
    /// Creates an item scanning a class.
    pub fn class(
        spec: SpecId,
        exposed_name: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            spec,
            exposed_name: exposed_name.into(),
            class_name: Some(class_name.into()),
            attributes: Vec::new(),
            path_entities: Vec::new(),
            fetch_specs: Vec::new(),
        }
    }

    /// Creates a derived-table item with explicit columns.
    pub fn derived(
        spec: SpecId,
        exposed_name: impl Into<String>,
        attributes: Vec<FromAttribute>,
    ) -> Self {
        Self {
            spec,
            exposed_name: exposed_name.into(),
            class_name: None,
            attributes,
            path_entities: Vec::new(),
            fetch_specs: Vec::new(),
        }
    }

    /// Restricts a class item to the given columns.
    pub fn with_attributes(mut self, attributes: Vec<FromAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Adds a path entity.
    pub fn with_path(mut self, item: FromItem) -> Self {
        self.path_entities.push(item);
        self
    }

    /// Adds a fetch spec.
    pub fn with_fetch(mut self, item: FromItem) -> Self {
        self.fetch_specs.push(item);
        self
    }
}

/// Set operation combining query blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QueryKind {
    #[default]
    Select,
    Union,
    Difference,
    Intersection,
}

/// A sub-query embedded in an expression.
#[derive(Clone, Debug, PartialEq)]
pub struct SubQuery {
    pub id: QueryId,
    pub kind: QueryKind,
    pub select_list: Vec<Node>,
    /// Trailing select-list entries added for ORDER BY/GROUP BY and not
    /// visible to the consumer.
    pub hidden_columns: usize,
    pub from: Vec<FromItem>,
    pub where_clause: TermList,
    /// Known to produce at most one row.
    pub single_row: bool,
}

impl SubQuery {
    /// Creates a SELECT block.
    pub fn select(id: QueryId, select_list: Vec<Node>, from: Vec<FromItem>) -> Self {
        Self {
            id,
            kind: QueryKind::Select,
            select_list,
            hidden_columns: 0,
            from,
            where_clause: TermList::new(),
            single_row: false,
        }
    }

    /// Sets the WHERE clause.
    pub fn filter(mut self, where_clause: TermList) -> Self {
        self.where_clause = where_clause;
        self
    }

    /// Marks the block as producing at most one row.
    pub fn single_row(mut self) -> Self {
        self.single_row = true;
        self
    }

    /// Sets the number of hidden trailing columns.
    pub fn hidden(mut self, count: usize) -> Self {
        self.hidden_columns = count;
        self
    }

    /// Number of columns the consumer sees.
    pub fn visible_columns(&self) -> usize {
        self.select_list.len().saturating_sub(self.hidden_columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use quill_core::DataType;

    #[test]
    fn test_visible_columns() {
        let q = SubQuery::select(
            QueryId(1),
            vec![
                Node::name(SpecId(1), "a", DataType::Integer),
                Node::name(SpecId(1), "b", DataType::Integer),
            ],
            vec![FromItem::class(SpecId(1), "t", "t")],
        )
        .hidden(1);
        assert_eq!(q.visible_columns(), 1);
        assert!(!q.single_row);
    }

    #[test]
    fn test_from_item_children() {
        let item = FromItem::class(SpecId(1), "e", "emp")
            .with_path(FromItem::class(SpecId(2), "d", "dept"))
            .with_fetch(FromItem::derived(
                SpecId(3),
                "f",
                vec![FromAttribute::new("x", DataType::Integer)],
            ));
        assert_eq!(item.path_entities.len(), 1);
        assert_eq!(item.fetch_specs[0].attributes[0].name, "x");
        assert!(item.attributes.is_empty());
    }
}
