//! Quill Core - Shared types for the Quill query compiler.
//!
//! This crate provides the leaf types every lowering stage depends on:
//!
//! - `DataType` / `TypeDescr`: static type tags and their parameters
//! - `Value`: literal values carried by constants and bound host parameters
//! - `domain`: the domain resolver and its interning cache
//! - `schema`: catalog definitions (classes, attributes, indexes)
//! - `Error`: the compile-failure taxonomy
//!
//! # Example
//!
//! ```rust
//! use quill_core::domain::DomainCache;
//! use quill_core::{DataType, TypeDescr};
//!
//! let mut domains = DomainCache::new();
//! let a = domains.resolve(&TypeDescr::numeric(10, 2)).unwrap();
//! let b = domains.resolve(&TypeDescr::numeric(10, 2)).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(domains.kind(a), DataType::Numeric);
//! ```

#![no_std]

extern crate alloc;

pub mod domain;
mod error;
pub mod schema;
mod types;
mod value;

pub use domain::{Domain, DomainCache, DomainId};
pub use error::{Error, Result};
pub use types::{
    Codeset, CollationId, DataType, TypeDescr, DEFAULT_NUMERIC_PRECISION, DEFAULT_NUMERIC_SCALE,
    MAX_NUMERIC_PRECISION, MAX_STRING_LENGTH,
};
pub use value::{CollectionKind, Numeric, Oid, Value};
