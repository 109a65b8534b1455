mod config;
mod queue;
mod worker_service;

use actix_web::{App, HttpServer, web};
use clap::{Parser, Subcommand};
use config::Config;
use fleetinv_services::create_connection;
use queue::SpoolDirSource;
use std::path::PathBuf;
use worker_service::WorkerService;

#[derive(Parser)]
#[command(name = "fleetinv-worker", about = "Image provenance ingestion worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the message source and ingest continuously (default)
    Run,
    /// Feed a single message file through the ingestion pipeline
    Process { file: PathBuf },
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = Config::from_env();

    log::info!("Starting fleetinv worker");

    let db = create_connection(&config.database_url)
        .await
        .expect("Failed to connect to database");

    log::info!("Database connection established");

    if let Some(Command::Process { file }) = cli.command {
        let body = std::fs::read_to_string(&file)?;
        match fleetinv_services::process_message(&db, &config.unit_config(), &body).await {
            Ok(outcome) => {
                log::info!("{}: {:?}", file.display(), outcome);
                return Ok(());
            }
            Err(err) => {
                log::error!("{}: {}", file.display(), err);
                std::process::exit(1);
            }
        }
    }

    let source = Box::new(SpoolDirSource::new(config.spool_dir.clone()));
    let worker_service = WorkerService::new(source, db, config.clone());

    // Start the worker in a background task
    tokio::spawn(async move {
        worker_service.start().await;
    });

    // Start a minimal HTTP server for health checks
    HttpServer::new(move || App::new().route("/health", web::get().to(|| async { "OK" })))
        .bind(format!("{}:{}", config.server_host, config.server_port))?
        .run()
        .await
}
