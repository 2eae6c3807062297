//! # dsmeta Architecture
//!
//! dsmeta is a **library for dataset metadata trees** with a thin CLI on top.
//! A metadata document describes a dataset as a tree of typed nodes
//! (dataset → database → schema → table → column), each carrying typed,
//! permission-annotated attributes.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, prints documents and messages          │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs) → Commands (commands/*.rs)                    │
//! │  - check, show, merge, filter, config                       │
//! │  - Return Result<CmdResult>, never print                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  metadata → specification / filter / merge                  │
//! │           → node → attribute → permissions                  │
//! │  document: tree <-> nested maps <-> YAML/JSON               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                           │
//! │  - DocumentStore trait: FileStore, InMemoryStore            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core invariants
//!
//! - Trees are values. Merging, defaulting and filtering return new trees and
//!   never touch their inputs.
//! - Every [`metadata::Metadata`] holds roots that passed their
//!   specification, if they have one.
//! - Siblings are either all keyed (unique keys) or all unkeyed.
//! - Absent permissions mean unrestricted.
//!
//! ## Module Overview
//!
//! - [`permissions`]: actions, principal sets and their combination rules
//! - [`attribute`]: typed attribute values and their merge
//! - [`node`]: typed tree nodes and their merge
//! - [`merge`]: the `Mergeable` contract and identity-based list merge
//! - [`specification`]: rule tables, defaults and verification
//! - [`filter`]: retention filters and the named views
//! - [`document`]: full and simple document formats
//! - [`metadata`]: the multi-root facade
//! - [`api`], [`commands`], [`store`], [`config`], [`logging`]: application layer
//! - [`error`]: error types

pub mod api;
pub mod attribute;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod logging;
pub mod merge;
pub mod metadata;
pub mod node;
pub mod permissions;
pub mod specification;
pub mod store;

pub use error::{MetaError, Result};
pub use metadata::{Metadata, RootName};
