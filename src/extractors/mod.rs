// src/extractors/mod.rs
pub mod models;
pub mod page;
pub mod table;

// Re-export key extraction types for convenience
pub use table::{ScanOptions, TableScanner};
