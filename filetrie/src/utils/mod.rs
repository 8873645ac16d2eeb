//! Helpers shared by the store.

pub mod path;
pub mod sanitize;
