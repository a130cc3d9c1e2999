//
// main.rs
// Dicom-Catalog-rs
//
// Tokio entry point that hands off execution to the CLI layer so commands are resolved asynchronously.
//
// Thales Matheus Mendonça Santos - October 2026

use dicom_catalog::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
