//! # seqgen
//!
//! Block-allocating primary key generation for relational stores.
//!
//! A [`DatabaseStructure`] (a sequence, or a counter row in a table) hands out
//! raw values. An [`Optimizer`] turns each raw value into a block of
//! identifiers served from memory, so that most calls never reach the
//! database. A generator ([`SequenceStyleGenerator`], [`TableGenerator`])
//! binds one of each to an entity's identifier type.
//!
//! ## Strategies
//!
//! | Name          | Stored value means        | Accesses per `increment_size` ids |
//! |---------------|---------------------------|-----------------------------------|
//! | `none`        | the identifier itself     | `increment_size`                  |
//! | `hilo`        | a block number            | 1                                 |
//! | `legacy-hilo` | a block number            | 1 (blocks of `increment_size + 1`) |
//! | `pooled`      | the high end of the block | 1                                 |
//! | `pooled-lo`   | the low end of the block  | 1                                 |
//!
//! ## Example
//!
//! ```
//! use seqgen::{
//!     Capabilities, IdentifierGenerator, IdentifierType, MemoryDatabase, Params, Session,
//!     TableGenerator,
//! };
//!
//! let params = Params::new()
//!     .with("segment_value", "orders")
//!     .with("increment_size", 50);
//! let generator =
//!     TableGenerator::configure(IdentifierType::Long, &params, &Capabilities::default()).unwrap();
//!
//! let db = MemoryDatabase::new();
//! db.create_all(&generator.schema_objects()).unwrap();
//!
//! let session = Session::new(&db);
//! for _ in 0..50 {
//!     generator.generate(&session).unwrap();
//! }
//! assert_eq!(generator.table_access_count(), 2);
//! ```
//!
//! ## Features
//!
//! - `parking-lot`: use `parking_lot` mutexes (no lock poisoning)
//! - `cache-padded`: pad the optimizer lock to a cache line
//! - `tracing`: emit spans and events through `tracing`
//! - `serde`: (de)serialize parameters, schema objects and identifiers

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
mod database;
mod error;
mod generator;
mod mutex;
mod optimizer;
mod structure;
#[cfg(test)]
mod test_support;
mod value;

pub use crate::config::Params;
pub use crate::database::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::optimizer::*;
pub use crate::structure::*;
pub use crate::value::*;
