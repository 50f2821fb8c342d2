//! Repository module for database operations
//!
//! Provides typed repository implementations for persisted BOM data.

pub mod bom;

pub use bom::BomRepository;
