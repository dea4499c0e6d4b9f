use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use docusage_lib::config::{self, AnalyzerConfig, ExtractorConfig};
use docusage_lib::db;
use docusage_lib::models::DocumentRecord;
use docusage_lib::pipeline::extraction::DocumentFormat;
use docusage_lib::pipeline::processor::{resalvage_stored_analysis, DocumentAnalyzer};

#[derive(Parser)]
#[command(name = "docusage")]
#[command(version, about = "Plain-language analysis of medical documents")]
struct Cli {
    /// SQLite database file (defaults to the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload and analyze a document (PDF, JPEG, PNG or text)
    Process {
        /// Path to the document
        file: PathBuf,
    },
    /// Print the latest stored analysis of a document
    Show { document_id: Uuid },
    /// List stored documents, newest first
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Trend of one test across documents, or the tests of a document
    Trends {
        document_id: Uuid,
        /// Test name; omit to list the document's tests
        test_name: Option<String>,
    },
    /// Short plain-language summary of a processed document
    Summarize { document_id: Uuid },
    /// Recover findings again from a stored raw model response
    Resalvage { document_id: Uuid },
    /// Delete a document with its analyses and findings
    Delete { document_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    docusage_lib::init_tracing();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(config::database_path);

    match cli.command {
        Commands::Process { file } => {
            let (document_id, stored_path) = register_upload(&db_path, &file)?;
            let analyzer = DocumentAnalyzer::from_config_async(
                ExtractorConfig::from_env(),
                AnalyzerConfig::from_env(),
            )
            .await?;
            let result = analyzer
                .process_async(document_id, stored_path, db_path)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Show { document_id } => {
            let conn = db::open_database(&db_path)?;
            match db::get_latest_analysis(&conn, &document_id)? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored.data)?),
                None => eprintln!("No analysis found for document {document_id}"),
            }
        }
        Commands::List { skip, limit } => {
            let conn = db::open_database(&db_path)?;
            let documents = db::list_documents(&conn, skip, limit)?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
        Commands::Trends {
            document_id,
            test_name,
        } => {
            let conn = db::open_database(&db_path)?;
            let response = db::get_trends(&conn, &document_id, test_name.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Summarize { document_id } => {
            let analyzer = DocumentAnalyzer::from_config_async(
                ExtractorConfig::from_env(),
                AnalyzerConfig::from_env(),
            )
            .await?;
            let summary = tokio::task::spawn_blocking(move || {
                let conn = db::open_database(&db_path)?;
                analyzer.summarize_stored(&conn, &document_id)
            })
            .await??;
            match summary {
                Some(text) => println!("{text}"),
                None => eprintln!("Document {document_id} has no extracted text yet"),
            }
        }
        Commands::Resalvage { document_id } => {
            let conn = db::open_database(&db_path)?;
            match resalvage_stored_analysis(&conn, &document_id)? {
                Some(analysis) => println!("{}", serde_json::to_string_pretty(&analysis)?),
                None => eprintln!("Nothing to re-salvage for document {document_id}"),
            }
        }
        Commands::Delete { document_id } => {
            let conn = db::open_database(&db_path)?;
            db::delete_document(&conn, &document_id)?;
            println!("Deleted {document_id}");
        }
    }

    Ok(())
}

/// Copy the file into the uploads directory as `<id>.<ext>` and record it.
fn register_upload(
    db_path: &Path,
    file: &Path,
) -> Result<(Uuid, PathBuf), Box<dyn std::error::Error>> {
    let format = DocumentFormat::from_path(file)?;
    let document_id = Uuid::new_v4();

    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(format.as_str())
        .to_ascii_lowercase();
    let uploads = config::uploads_dir();
    std::fs::create_dir_all(&uploads)?;
    let stored_path = uploads.join(format!("{document_id}.{extension}"));
    std::fs::copy(file, &stored_path)?;

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let conn = db::open_database(db_path)?;
    db::save_document_metadata(
        &conn,
        &DocumentRecord::new(document_id, &filename, format.mime_type()),
    )?;

    tracing::info!(document_id = %document_id, filename = %filename, "Document uploaded");
    Ok((document_id, stored_path))
}
