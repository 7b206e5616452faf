//! Builtin plugin catalog for the stagehand worker.
//!
//! Every plugin the worker ships with is a row in a compile-time factory
//! table: the type reference string the registry stores, plus the factory
//! that builds its descriptor. The worker populates its registry from this
//! table once at startup; a failing factory aborts startup.

mod catalog;

pub use catalog::{builtin_catalog, populate_builtin, CHECKOUT_TASK_ID, CLEANUP_TASK_ID};
