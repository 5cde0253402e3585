//! Normalized search conditions.
//!
//! The checker hands over every WHERE/ON/HAVING clause as a conjunction of
//! disjunctions: a list of conjuncts, each an or-chain of predicate nodes.

use super::expr::Node;
use alloc::vec;
use alloc::vec::Vec;

/// One conjunct: the disjunction of its nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conjunct {
    pub disjuncts: Vec<Node>,
}

impl Conjunct {
    /// Creates a conjunct holding a single term.
    pub fn single(term: Node) -> Self {
        Self {
            disjuncts: vec![term],
        }
    }

    /// Creates a conjunct from an or-chain.
    pub fn any_of(disjuncts: Vec<Node>) -> Self {
        Self { disjuncts }
    }

    /// Returns whether the or-chain has more than one link.
    #[inline]
    pub fn is_disjunction(&self) -> bool {
        self.disjuncts.len() > 1
    }
}

/// A list of conjuncts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TermList {
    pub conjuncts: Vec<Conjunct>,
}

impl TermList {
    /// Creates an empty (always true) term list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list of single-term conjuncts.
    pub fn all_of(terms: Vec<Node>) -> Self {
        Self {
            conjuncts: terms.into_iter().map(Conjunct::single).collect(),
        }
    }

    /// Appends a single-term conjunct.
    pub fn and(mut self, term: Node) -> Self {
        self.conjuncts.push(Conjunct::single(term));
        self
    }

    /// Appends a conjunct made of an or-chain.
    pub fn and_any(mut self, disjuncts: Vec<Node>) -> Self {
        self.conjuncts.push(Conjunct::any_of(disjuncts));
        self
    }

    /// Returns true if there are no conjuncts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conjuncts.is_empty()
    }

    /// Number of conjuncts.
    #[inline]
    pub fn len(&self) -> usize {
        self.conjuncts.len()
    }

    /// Iterates over every term of every conjunct.
    pub fn terms(&self) -> impl Iterator<Item = &Node> {
        self.conjuncts.iter().flat_map(|c| c.disjuncts.iter())
    }
}

impl From<Node> for TermList {
    fn from(term: Node) -> Self {
        TermList::new().and(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SpecId;
    use quill_core::DataType;

    fn col(name: &str) -> Node {
        Node::name(SpecId(1), name, DataType::Integer)
    }

    #[test]
    fn test_term_list_builder() {
        let list = TermList::new()
            .and(Node::eq(col("a"), Node::int(1)))
            .and_any(vec![Node::eq(col("b"), Node::int(2)), Node::eq(col("c"), Node::int(3))]);
        assert_eq!(list.len(), 2);
        assert!(!list.conjuncts[0].is_disjunction());
        assert!(list.conjuncts[1].is_disjunction());
        assert_eq!(list.terms().count(), 3);
    }

    #[test]
    fn test_from_node() {
        let list: TermList = Node::is_null(col("a")).into();
        assert_eq!(list.len(), 1);
        assert!(TermList::new().is_empty());
    }
}
