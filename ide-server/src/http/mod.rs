//! Route handlers and the JSON error contract.

pub mod compile;
pub mod error;
pub mod files;
pub mod health;
pub mod projects;
