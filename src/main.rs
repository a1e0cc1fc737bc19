use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use author_import::{
    AuthorImporter, DatabaseConfig, ImportConfig, ImportStats, PgAuthorStore, db, init_logger,
};

#[derive(Parser, Debug)]
#[command(
    name = "author-import",
    about = "Import author names from semicolon-delimited files into Postgres"
)]
struct Args {
    /// Input files; each file is a separate import run.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Names per insert batch (overrides IMPORT_BATCH_SIZE).
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent insert workers (overrides IMPORT_WORKERS).
    #[arg(long)]
    workers: Option<usize>,

    /// Print the run statistics as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_logger();

    let args = Args::parse();

    let mut config = ImportConfig::from_env();
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    let database = DatabaseConfig::from_env(config.workers)
        .map_err(|err| format!("DATABASE_URL must be set: {err}"))?;
    let pool = db::connect(&database).await?;
    db::run_migrations(&pool).await?;

    let importer = AuthorImporter::new(Arc::new(PgAuthorStore::new(pool.clone())), config);

    let mut total = ImportStats::default();
    let mut failed = false;

    for file in &args.files {
        let report = importer.import_from_file(file).await;
        total.merge(&report.stats);

        if let Some(err) = &report.error {
            failed = true;
            eprintln!("error: {}: {err}", file.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&total)?);
    } else {
        println!(
            "Imported {} authors from {} file(s) ({} duplicates skipped, {} batches failed)",
            total.authors_inserted,
            args.files.len(),
            total.duplicates_skipped,
            total.batches_failed
        );
    }

    pool.close().await;

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
