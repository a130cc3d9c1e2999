//
// lib.rs
// Dicom-Catalog-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - October 2026

// Leaf-first: header parsing and storage feed the catalog, the ingestor ties them together.
pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dicom_access;
pub mod error;
pub mod header;
pub mod ingest;
pub mod models;
pub mod storage;
pub mod web;

pub use catalog::Catalog;
pub use cli::{run as run_cli, Cli, Commands};
pub use error::CatalogError;
pub use ingest::Ingestor;
pub use models::{ParsedFields, StudyRecord};
