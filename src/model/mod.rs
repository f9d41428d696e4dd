// src/model/mod.rs
//! The local object model every converter produces.

mod block;
pub mod details;
mod marks;
mod relation;
mod snapshot;

pub use block::*;
pub use details::{keys, DetailValue, Details, COVER_TYPE_IMAGE};
pub use marks::*;
pub use relation::*;
pub use snapshot::*;
