use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fleetinv_services::{ScannerConfig, UnitConfig};

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,

    // Queue polling
    pub spool_dir: PathBuf,
    pub poll_interval: Duration,
    pub receive_batch: usize,

    // Ingestion
    pub scratch_root: PathBuf,
    pub excluded_repos: Vec<String>,
    pub webhook_url: Option<String>,

    // Scanner binaries
    pub crane_bin: PathBuf,
    pub syft_bin: PathBuf,
    pub grype_bin: PathBuf,
    pub scanner_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let server_host = env::var("WORKER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("WORKER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8081);

        let database_url =
            env::var("DATABASE_URL").expect("DATABASE_URL environment variable must be set");

        let spool_dir = env::var("SPOOL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/spool/fleetinv"));

        let poll_interval_secs = env::var("POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20);

        let receive_batch = env::var("RECEIVE_BATCH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let scratch_root = env::var("SCRATCH_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join("scans")
            });

        // Comma-separated "org/name" entries
        let excluded_repos = env::var("EXCLUDED_REPOS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|url| !url.is_empty());

        let crane_bin = env::var("CRANE_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("etc/third_party/crane"));
        let syft_bin = env::var("SYFT_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("etc/third_party/syft"));
        let grype_bin = env::var("GRYPE_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("etc/third_party/grype"));

        let scanner_timeout_secs = env::var("SCANNER_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Self {
            server_host,
            server_port,
            database_url,
            spool_dir,
            poll_interval: Duration::from_secs(poll_interval_secs),
            receive_batch,
            scratch_root,
            excluded_repos,
            webhook_url,
            crane_bin,
            syft_bin,
            grype_bin,
            scanner_timeout: Duration::from_secs(scanner_timeout_secs),
        }
    }

    pub fn unit_config(&self) -> UnitConfig {
        UnitConfig {
            scratch_root: self.scratch_root.clone(),
            excluded_repos: self.excluded_repos.clone(),
            webhook_url: self.webhook_url.clone(),
            scanner: ScannerConfig {
                crane_bin: self.crane_bin.clone(),
                syft_bin: self.syft_bin.clone(),
                grype_bin: self.grype_bin.clone(),
                timeout: self.scanner_timeout,
            },
        }
    }
}
