//! The leaf services composing the catalog.

pub mod access;
pub mod format;
pub mod generator;
pub mod inventory;
pub mod item;
pub mod sequence;
