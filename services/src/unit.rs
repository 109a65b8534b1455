use std::path::{Path, PathBuf};

use fleetinv_shared::{EcrImageEntry, InboundMessage, RepositoryRef, SbomDocument, ScaDocument};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{images, ingestion_units, repositories};
use crate::error::IngestError;
use crate::retry::{RetryPolicy, retry};
use crate::scanner::{self, ScannerConfig};
use crate::{lineage, sbom_merger, store, vcs, vuln_merger};

/// Everything one unit of ingestion work needs besides the database.
#[derive(Debug, Clone)]
pub struct UnitConfig {
    /// Parent directory for per-unit working directories.
    pub scratch_root: PathBuf,
    /// "org/name" entries whose messages are dropped without side effects.
    pub excluded_repos: Vec<String>,
    /// Failed units are announced here, best-effort.
    pub webhook_url: Option<String>,
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The unit ran to finalization; its persisted record holds the result.
    Processed,
    /// The message targeted an excluded repository; nothing was persisted.
    Dropped,
}

/// Private working directory of one unit, keyed by its uuid. Removed on
/// every exit path when the guard goes out of scope.
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn create(root: &Path, unit_uuid: &str) -> Result<Self, IngestError> {
        let path = root.join(unit_uuid);
        std::fs::create_dir_all(&path)?;
        Ok(WorkDir { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("removed working directory {}", self.path.display()),
            Err(err) => log::warn!(
                "could not remove working directory {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// One inbound work item, accepted through finalization. Failures along the
/// way become recorded state on this object; the record is persisted exactly
/// once whichever way processing ends.
#[derive(Debug)]
pub struct IngestionUnit {
    row_id: i32,
    pub uuid: String,
    repository: repositories::Model,
    succeeded: bool,
    failure_log: String,
}

impl IngestionUnit {
    /// Accept an inbound message: resolve its repository, drop excluded
    /// targets, reject unusable messages, and persist the initial unit row.
    ///
    /// Returns `Ok(None)` for the excluded case. `Err(Malformed)` is the
    /// only path that leaves no trace in the store.
    pub async fn accept(
        db: &DatabaseConnection,
        message: &InboundMessage,
        raw_message: &str,
        excluded_repos: &[String],
    ) -> Result<Option<Self>, IngestError> {
        let repository_url = &message.repository.url;
        let locator = vcs::parse_git_url(repository_url);
        if vcs::is_excluded_repo(&locator, excluded_repos) {
            log::error!("excluded repository: {repository_url}");
            return Ok(None);
        }

        if repository_url.is_empty()
            || message.repository.commit.is_empty()
            || message.repository.tag.is_empty()
            || message.aws_environment.is_empty()
        {
            return Err(IngestError::Malformed(
                "message must carry a repository url, commit, tag and environment".to_string(),
            ));
        }
        if !locator.is_complete() {
            return Err(IngestError::Malformed(format!(
                "repository details cannot be empty, given url: {repository_url}"
            )));
        }

        let (repository, created) =
            retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                store::get_or_create_repository(db, &locator)
            })
            .await?;
        if created {
            log::debug!("created repository: {}", repository.url());
        }

        let unit_uuid = Uuid::new_v4().to_string();
        let row = ingestion_units::ActiveModel {
            uuid: Set(unit_uuid.clone()),
            repository_id: Set(Some(repository.id)),
            tag: Set(Some(message.repository.tag.clone())),
            commit: Set(Some(message.repository.commit.clone())),
            environment: Set(Some(message.aws_environment.clone())),
            job_url: Set(Some(message.job_url.clone())),
            raw_message: Set(raw_message.to_string()),
            succeeded: Set(true),
            failure_log: Set(String::new()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(IngestError::from_db)?;
        log::info!("accepted ingestion unit {unit_uuid} for {}", repository.url());

        Ok(Some(IngestionUnit {
            row_id: row.id,
            uuid: unit_uuid,
            repository,
            succeeded: true,
            failure_log: String::new(),
        }))
    }

    /// Drive the merge pipeline for every image the message announced:
    /// SBOM merge, then vulnerability merge, then lineage resolution.
    pub async fn run(
        &self,
        db: &DatabaseConnection,
        config: &UnitConfig,
        message: &InboundMessage,
        workdir: &WorkDir,
    ) -> Result<(), IngestError> {
        for entry in &message.ecr_image {
            if entry.is_manifest_list() {
                // Multi-arch manifest lists are not resolved to a single image.
                log::debug!("skipping manifest list entry {}", entry.name);
                continue;
            }
            match self.ingest_image_entry(db, config, message, entry, workdir).await {
                Ok(()) => {}
                Err(IngestError::VariantMissing(why)) => {
                    log::info!("{why}, continuing with remaining images");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn ingest_image_entry(
        &self,
        db: &DatabaseConnection,
        config: &UnitConfig,
        message: &InboundMessage,
        entry: &EcrImageEntry,
        workdir: &WorkDir,
    ) -> Result<(), IngestError> {
        let platform_spec = entry.platform.as_ref().ok_or_else(|| {
            IngestError::Malformed(format!("image entry {} carries no platform", entry.name))
        })?;
        let platform = format!("{}/{}", platform_spec.os, platform_spec.architecture);
        let account_id = entry
            .name
            .split_once('.')
            .map(|(head, _)| head)
            .unwrap_or(entry.name.as_str());
        let short_name = entry
            .name
            .rsplit_once('/')
            .map(|(_, tail)| tail)
            .unwrap_or(entry.name.as_str());

        retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
            store::ensure_account(db, account_id, &message.aws_environment)
        })
        .await?;

        let image = self
            .bridge_image(db, short_name, account_id, &entry.digest, &platform, &message.repository)
            .await?;

        let image_ref = format!("{}@{}", entry.name, entry.digest);
        let tarball = workdir.path().join(format!("{}.tar", sanitize(&image_ref)));
        scanner::pull_image_tarball(&config.scanner, &image_ref, &platform, &tarball).await?;

        let sbom_path = workdir.path().join("sbom.json");
        scanner::generate_sbom(&config.scanner, &tarball, &sbom_path).await?;
        let sbom: SbomDocument = read_json(&sbom_path)?;
        retry(RetryPolicy::CONTENTION, IngestError::is_transient, || {
            sbom_merger::merge_sbom(db, &image, &sbom)
        })
        .await?;
        log::info!("sbom merged for {image}");

        let sca_path = workdir.path().join("sca.json");
        scanner::generate_sca(&config.scanner, &sbom_path, &sca_path).await?;
        let sca: ScaDocument = read_json(&sca_path)?;
        retry(RetryPolicy::DEPENDENCY, IngestError::is_dependency_missing, || {
            retry(RetryPolicy::CONTENTION, IngestError::is_transient, || {
                vuln_merger::merge_vulnerability_matches(db, &image, &sca)
            })
        })
        .await?;
        log::info!("vulnerability matches merged for {image}");

        // Lineage links land in the same commit as the layer rows that
        // justify them.
        let digests = scanner::read_layer_digests(&tarball)?;
        let txn = db.begin().await.map_err(IngestError::from_db)?;
        lineage::save_layers(&txn, image.id, &digests).await?;
        lineage::resolve_parent_image(&txn, &image).await?;
        lineage::resolve_base_image(&txn, &image).await?;
        txn.commit().await.map_err(IngestError::from_db)?;

        if let Err(err) = std::fs::remove_file(&tarball) {
            log::warn!("could not remove {}: {}", tarball.display(), err);
        }
        Ok(())
    }

    /// Locate or create the image row for one message entry and connect it
    /// to the unit's repository. Contradicting an existing repository link
    /// is an error; everything else is filled in or refreshed.
    async fn bridge_image(
        &self,
        db: &DatabaseConnection,
        name: &str,
        account_id: &str,
        digest: &str,
        platform: &str,
        repository_ref: &RepositoryRef,
    ) -> Result<images::Model, IngestError> {
        let key = store::ImageKey {
            name,
            account_id,
            digest,
            platform,
        };
        let (image, created) = retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
            store::get_or_create_image(db, &key)
        })
        .await?;
        if created {
            log::debug!("created image: {image}");
        }

        let mut active: images::ActiveModel = image.clone().into();
        let mut touched = false;
        if image.commit.as_deref() != Some(repository_ref.commit.as_str()) {
            active.commit = Set(Some(repository_ref.commit.clone()));
            touched = true;
        }
        if image.tag.is_none() {
            active.tag = Set(Some(repository_ref.tag.clone()));
            touched = true;
        }
        match image.repository_id {
            Some(existing) if existing != self.repository.id => {
                return Err(IngestError::ConflictingInfo(format!(
                    "{image} already belongs to repository {existing} which doesn't match {}",
                    self.repository.id
                )));
            }
            Some(_) => {}
            None => {
                active.repository_id = Set(Some(self.repository.id));
                touched = true;
            }
        }
        if image.ingestion_unit_id != Some(self.row_id) {
            active.ingestion_unit_id = Set(Some(self.row_id));
            touched = true;
        }

        if touched {
            active.updated_at = Set(store::now());
            let updated = active.update(db).await.map_err(IngestError::from_db)?;
            log::info!("{updated} bridged to {}", self.repository.url());
            return Ok(updated);
        }
        Ok(image)
    }

    /// Note a failure without failing the whole service: the reason lands in
    /// the unit's failure log and the success flag is cleared.
    pub fn record_failure(&mut self, why: &IngestError) {
        self.failure_log.push_str(&why.to_string());
        self.failure_log.push('\n');
        self.succeeded = false;
        log::error!("unit {} raised: {}", self.uuid, why);
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn failure_log(&self) -> &str {
        &self.failure_log
    }

    /// Persist the final state of the unit. Called exactly once per unit,
    /// whichever way processing ended.
    pub async fn finalize(&self, db: &DatabaseConnection) -> Result<(), IngestError> {
        let active = ingestion_units::ActiveModel {
            id: Set(self.row_id),
            succeeded: Set(self.succeeded),
            failure_log: Set(self.failure_log.clone()),
            ..Default::default()
        };
        active.update(db).await.map_err(IngestError::from_db)?;
        log::debug!("finalized ingestion unit {}", self.uuid);
        Ok(())
    }
}

/// Process one raw inbound message end-to-end.
///
/// Every failure past acceptance is recorded into the unit and the unit is
/// still persisted; only a malformed message errors out of here, so the
/// caller can leave it on its source queue for inspection.
pub async fn process_message(
    db: &DatabaseConnection,
    config: &UnitConfig,
    raw_message: &str,
) -> Result<Outcome, IngestError> {
    let message: InboundMessage = serde_json::from_str(raw_message)
        .map_err(|err| IngestError::Malformed(format!("undecodable message: {err}")))?;

    let Some(mut unit) =
        IngestionUnit::accept(db, &message, raw_message, &config.excluded_repos).await?
    else {
        return Ok(Outcome::Dropped);
    };

    match WorkDir::create(&config.scratch_root, &unit.uuid) {
        Ok(workdir) => {
            if let Err(err) = unit.run(db, config, &message, &workdir).await {
                unit.record_failure(&err);
            }
        }
        Err(err) => unit.record_failure(&err),
    }

    unit.finalize(db).await?;
    if !unit.succeeded() {
        if let Some(url) = &config.webhook_url {
            let text = format!("ingestion unit {} failed:\n{}", unit.uuid, unit.failure_log());
            notify_failure(url, &text).await;
        }
    }
    Ok(Outcome::Processed)
}

async fn notify_failure(webhook_url: &str, text: &str) {
    let payload = serde_json::json!({ "text": text });
    let client = reqwest::Client::new();
    if let Err(err) = client.post(webhook_url).json(&payload).send().await {
        log::warn!("failure notification could not be delivered: {err}");
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, IngestError> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workdir_is_removed_when_dropped() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let workdir = WorkDir::create(root.path(), "unit-1").unwrap();
            assert!(workdir.path().is_dir());
            workdir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn image_refs_sanitize_into_filenames() {
        assert_eq!(
            sanitize("123.dkr.ecr.eu-west-1.amazonaws.com/web@sha256:ab"),
            "123_dkr_ecr_eu_west_1_amazonaws_com_web_sha256_ab"
        );
    }
}
