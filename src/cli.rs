//
// cli.rs
// Dicom-Catalog-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the catalog pipeline.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;

use crate::{batch, config::CatalogConfig, header, models::StudyRecord, storage, web};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-catalog")]
#[command(about = "Catalog DICOM studies and search them by patient name", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding uploads/ and the default database
    #[arg(long, global = true, env = "DICOM_CATALOG_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
    /// Catalog database file (defaults to <DATA_DIR>/studies.db)
    #[arg(long, global = true, env = "DICOM_CATALOG_DATABASE")]
    pub database: Option<PathBuf>,
    /// What to do when an upload reuses a stored file name
    #[arg(
        long,
        global = true,
        value_enum,
        env = "DICOM_CATALOG_ON_DUPLICATE",
        default_value_t = OnDuplicate::Overwrite
    )]
    pub on_duplicate: OnDuplicate,
    /// Log at DEBUG level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Ingest one or more local DICOM files into the catalog
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ingest every .dcm file below a directory
    Import { directory: PathBuf },
    /// List studies whose patient name contains QUERY (all studies when omitted)
    Search {
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the catalog fields of a DICOM file without ingesting it
    Info { file: PathBuf },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OnDuplicate {
    Overwrite,
    Reject,
    Suffix,
}

impl From<OnDuplicate> for storage::DuplicatePolicy {
    fn from(value: OnDuplicate) -> Self {
        match value {
            OnDuplicate::Overwrite => storage::DuplicatePolicy::Overwrite,
            OnDuplicate::Reject => storage::DuplicatePolicy::Reject,
            OnDuplicate::Suffix => storage::DuplicatePolicy::Suffix,
        }
    }
}

impl From<&GlobalArgs> for CatalogConfig {
    fn from(args: &GlobalArgs) -> Self {
        CatalogConfig {
            data_dir: args.data_dir.clone(),
            database: args.database.clone(),
            duplicate_policy: args.on_duplicate.into(),
        }
    }
}

fn init_logging(verbose: bool) {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| eprintln!("Could not set up global logger: {}", e));
}

pub async fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    let config = CatalogConfig::from(&cli.global);

    match cli.command {
        Commands::Serve { host, port } => {
            let ingestor = config.open()?;
            web::start_server(ingestor, &host, port).await?
        }
        Commands::Ingest { files } => {
            let ingestor = config.open()?;
            for file in files {
                let record = ingestor
                    .ingest_path(&file)
                    .with_context(|| format!("Failed to ingest {:?}", file))?;
                print_record(&record);
            }
        }
        Commands::Import { directory } => {
            let ingestor = config.open()?;
            let summary = batch::import_directory(&ingestor, &directory)?;
            println!(
                "Imported {} file(s), {} failed.",
                summary.imported, summary.failed
            );
        }
        Commands::Search { query, json } => {
            let ingestor = config.open()?;
            let records = ingestor.search(query.as_deref().unwrap_or(""))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_table(&records);
            }
        }
        Commands::Info { file } => {
            let fields = header::parse(&file)?;
            println!("{}", "=".repeat(60));
            println!("DICOM header: {}", file.display());
            println!("{}", "=".repeat(60));
            for (label, value) in header::labeled(&fields) {
                println!("  {:<18} {}", format!("{}:", label), value);
            }
        }
    }

    Ok(())
}

fn print_record(record: &StudyRecord) {
    println!(
        "#{} {} | {} | {} (stored as {})",
        record.id,
        record.patient_name,
        record.study_date,
        record.study_description,
        record.stored_file_name
    );
}

fn print_table(records: &[StudyRecord]) {
    if records.is_empty() {
        println!("No studies found.");
        return;
    }
    println!(
        "{:>5}  {:<24} {:<10} {:<10} {:<24} {:<12} {:<20} {}",
        "ID", "PATIENT", "DATE", "BIRTH", "DESCRIPTION", "PATIENT ID", "INSTITUTION", "FILE"
    );
    for r in records {
        println!(
            "{:>5}  {:<24} {:<10} {:<10} {:<24} {:<12} {:<20} {}",
            r.id,
            r.patient_name,
            r.study_date,
            r.patient_birth_date,
            r.study_description,
            r.patient_id,
            r.institution_name,
            r.stored_file_name
        );
    }
    println!("{} stud{}", records.len(), if records.len() == 1 { "y" } else { "ies" });
}
