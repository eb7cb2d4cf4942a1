//! Branch I/O seams consumed from the surrounding union filesystem.
//!
//! The engine talks to its two backing stores through async traits so the
//! core algorithms stay independent of where branch bytes actually live.
//!
//! Submodules:
//! - `lower`: read-only branch holding original file content
//! - `upper`: writable branch where modifications are materialized
//! - `local`: implementations over plain files in a directory
//! - `mem`: in-memory implementations for tests and local development

pub mod local;
pub mod lower;
pub mod mem;
pub mod upper;

pub use lower::LowerBranch;
pub use upper::UpperBranch;
