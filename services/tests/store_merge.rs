use fleetinv_services::entity::{
    image_package_association, images, ingestion_units, layers, license_family,
    package_license_association, packages, repositories, vulnerability_package_association,
};
use fleetinv_services::unit::IngestionUnit;
use fleetinv_services::{GOLDEN_ACCOUNT_ID, IngestError, lineage, sbom_merger, store, vuln_merger};
use fleetinv_shared::{InboundMessage, SbomDocument, ScaDocument};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use serde_json::json;

async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1);
    let db = Database::connect(options).await.expect("sqlite connect");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

async fn dev_image(db: &DatabaseConnection, name: &str, digest: &str) -> images::Model {
    store::ensure_account(db, "123456789012", "stage").await.unwrap();
    let key = store::ImageKey {
        name,
        account_id: "123456789012",
        digest,
        platform: "linux/arm64",
    };
    store::get_or_create_image(db, &key).await.unwrap().0
}

async fn golden_image(db: &DatabaseConnection, name: &str, digest: &str) -> images::Model {
    store::ensure_account(db, GOLDEN_ACCOUNT_ID, "golden").await.unwrap();
    let key = store::ImageKey {
        name,
        account_id: GOLDEN_ACCOUNT_ID,
        digest,
        platform: "linux/arm64",
    };
    store::get_or_create_image(db, &key).await.unwrap().0
}

fn sbom_doc() -> SbomDocument {
    serde_json::from_value(json!({
        "artifacts": [
            {
                "name": "log4j-core",
                "version": "2.17.0",
                "language": "java",
                "purl": "pkg:maven/org.apache.logging.log4j/log4j-core@2.17.0",
                "metadataType": "JavaMetadata",
                "metadata": {"virtualPath": "/app/lib/log4j-core-2.17.0.jar"},
                "licenses": ["Apache-2.0"]
            },
            {
                "name": "zlib",
                "version": "1.2.11",
                "language": "",
                "purl": "pkg:apk/alpine/zlib@1.2.11",
                "metadataType": "ApkMetadata",
                "metadata": {},
                "licenses": ["MIT", "AND", "Zlib"]
            }
        ]
    }))
    .unwrap()
}

fn sca_doc(fix_version: &str) -> ScaDocument {
    serde_json::from_value(json!({
        "matches": [
            {
                "vulnerability": {
                    "id": "CVE-2018-25032",
                    "description": "zlib before 1.2.12 allows memory corruption",
                    "severity": "High",
                    "dataSource": "https://nvd.nist.gov/vuln/detail/CVE-2018-25032",
                    "cvss": [
                        {"metrics": {"baseScore": 7.5, "exploitabilityScore": 3.9, "impactScore": 3.6}}
                    ],
                    "fix": {"versions": [fix_version]}
                },
                "relatedVulnerabilities": [
                    {"id": "GHSA-jc36-42cf-vqwj", "dataSource": "https://github.com/advisories"}
                ],
                "artifact": {
                    "name": "zlib",
                    "version": "1.2.11",
                    "language": "",
                    "purl": "pkg:apk/alpine/zlib@1.2.11"
                }
            }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn get_or_create_returns_the_same_row_to_every_caller() {
    let db = setup_db().await;
    store::ensure_account(&db, "123456789012", "stage").await.unwrap();

    let key = store::ImageKey {
        name: "web",
        account_id: "123456789012",
        digest: "sha256:aa",
        platform: "linux/arm64",
    };
    let (first, created_first) = store::get_or_create_image(&db, &key).await.unwrap();
    let (second, created_second) = store::get_or_create_image(&db, &key).await.unwrap();

    assert!(created_first);
    assert!(!created_second);
    assert_eq!(first.id, second.id);
    assert_eq!(images::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn account_creation_requires_a_name() {
    let db = setup_db().await;
    let err = store::ensure_account(&db, "999999999999", "").await.unwrap_err();
    assert!(matches!(err, IngestError::Malformed(_)));

    store::ensure_account(&db, "999999999999", "stage").await.unwrap();
    // Existing account: name no longer required.
    let (_, created) = store::ensure_account(&db, "999999999999", "").await.unwrap();
    assert!(!created);
}

#[tokio::test]
async fn sbom_merge_is_idempotent() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;
    let document = sbom_doc();

    let changed_first = sbom_merger::merge_sbom(&db, &image, &document).await.unwrap();
    let packages_after_first = packages::Entity::find().count(&db).await.unwrap();
    let links_after_first = image_package_association::Entity::find().count(&db).await.unwrap();
    let licenses_after_first = license_family::Entity::find().count(&db).await.unwrap();
    let license_links_after_first =
        package_license_association::Entity::find().count(&db).await.unwrap();

    let changed_second = sbom_merger::merge_sbom(&db, &image, &document).await.unwrap();

    assert!(changed_first);
    assert!(!changed_second);
    assert_eq!(packages::Entity::find().count(&db).await.unwrap(), packages_after_first);
    assert_eq!(
        image_package_association::Entity::find().count(&db).await.unwrap(),
        links_after_first
    );
    assert_eq!(license_family::Entity::find().count(&db).await.unwrap(), licenses_after_first);
    assert_eq!(
        package_license_association::Entity::find().count(&db).await.unwrap(),
        license_links_after_first
    );
}

#[tokio::test]
async fn boolean_license_tokens_are_not_stored() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;
    sbom_merger::merge_sbom(&db, &image, &sbom_doc()).await.unwrap();

    let names: Vec<String> = license_family::Entity::find()
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"Apache-2.0".to_string()));
    assert!(names.contains(&"MIT".to_string()));
    assert!(names.contains(&"Zlib".to_string()));
}

#[tokio::test]
async fn java_virtual_path_lands_on_the_association() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;
    sbom_merger::merge_sbom(&db, &image, &sbom_doc()).await.unwrap();

    let associations = image_package_association::Entity::find().all(&db).await.unwrap();
    let with_metadata: Vec<_> = associations
        .iter()
        .filter(|a| a.pkg_metadata.is_some())
        .collect();
    assert_eq!(with_metadata.len(), 1);
    assert_eq!(
        with_metadata[0].pkg_metadata.as_deref(),
        Some("/app/lib/log4j-core-2.17.0.jar")
    );
}

#[tokio::test]
async fn vulnerability_merge_requires_packages_first() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;

    let err = vuln_merger::merge_vulnerability_matches(&db, &image, &sca_doc("1.2.12"))
        .await
        .unwrap_err();
    assert!(err.is_dependency_missing());
}

#[tokio::test]
async fn vulnerability_merge_is_idempotent_and_fix_is_last_write_wins() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;
    sbom_merger::merge_sbom(&db, &image, &sbom_doc()).await.unwrap();

    let changed_first = vuln_merger::merge_vulnerability_matches(&db, &image, &sca_doc("1.2.12"))
        .await
        .unwrap();
    let changed_second = vuln_merger::merge_vulnerability_matches(&db, &image, &sca_doc("1.2.12"))
        .await
        .unwrap();
    assert!(changed_first);
    assert!(!changed_second);

    let association = vulnerability_package_association::Entity::find()
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(association.fix.as_deref(), Some("1.2.12"));

    // A later document with a different fix list overwrites, never merges.
    let changed_third = vuln_merger::merge_vulnerability_matches(&db, &image, &sca_doc("1.2.13"))
        .await
        .unwrap();
    assert!(changed_third);
    let association = vulnerability_package_association::Entity::find()
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(association.fix.as_deref(), Some("1.2.13"));
    assert_eq!(
        vulnerability_package_association::Entity::find().count(&db).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn authoritative_scores_are_recorded() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;
    sbom_merger::merge_sbom(&db, &image, &sbom_doc()).await.unwrap();
    vuln_merger::merge_vulnerability_matches(&db, &image, &sca_doc("1.2.12"))
        .await
        .unwrap();

    let vulnerability = fleetinv_services::vulnerabilities::Entity::find_by_id("CVE-2018-25032")
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vulnerability.cvss_base_score, Some(7.5));
    assert_eq!(vulnerability.severity.as_deref(), Some("High"));
    assert_eq!(vulnerability.related.as_deref(), Some("GHSA-jc36-42cf-vqwj"));
}

fn digests(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn save_layers_is_idempotent_and_replaces_stale_rows() {
    let db = setup_db().await;
    let image = dev_image(&db, "web", "sha256:aa").await;

    lineage::save_layers(&db, image.id, &digests(&["l1", "l2", "l3"])).await.unwrap();
    lineage::save_layers(&db, image.id, &digests(&["l1", "l2", "l3"])).await.unwrap();
    assert_eq!(layers::Entity::find().count(&db).await.unwrap(), 3);

    // A re-pull with a different digest at position 1 and a shorter chain.
    lineage::save_layers(&db, image.id, &digests(&["l1", "lX"])).await.unwrap();
    let mut rows = layers::Entity::find().all(&db).await.unwrap();
    rows.sort_by_key(|l| l.seq);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].digest, "l1");
    assert_eq!(rows[1].digest, "lX");
}

#[tokio::test]
async fn longest_matching_prefix_wins_parent_resolution() {
    let db = setup_db().await;
    let base = golden_image(&db, "base", "sha256:01").await;
    let mid = dev_image(&db, "mid", "sha256:02").await;
    let top = dev_image(&db, "top", "sha256:03").await;

    lineage::save_layers(&db, base.id, &digests(&["l1"])).await.unwrap();
    lineage::save_layers(&db, mid.id, &digests(&["l1", "l2"])).await.unwrap();
    lineage::save_layers(&db, top.id, &digests(&["l1", "l2", "l3"])).await.unwrap();

    let parent = lineage::resolve_parent_image(&db, &top).await.unwrap();
    assert_eq!(parent, Some(mid.id));

    // The base-image pool is restricted to the golden account, so the
    // one-layer golden ancestor wins there.
    let base_link = lineage::resolve_base_image(&db, &top).await.unwrap();
    assert_eq!(base_link, Some(base.id));

    let resolved = images::Entity::find_by_id(top.id).one(&db).await.unwrap().unwrap();
    assert_eq!(resolved.parent_image_id, Some(mid.id));
    assert_eq!(resolved.base_image_id, Some(base.id));
}

#[tokio::test]
async fn an_image_without_layers_resolves_to_nothing() {
    let db = setup_db().await;
    let lonely = dev_image(&db, "lonely", "sha256:04").await;
    let parent = lineage::resolve_parent_image(&db, &lonely).await.unwrap();
    assert_eq!(parent, None);
}

#[tokio::test]
async fn equal_length_images_are_not_each_others_parents() {
    let db = setup_db().await;
    let left = dev_image(&db, "left", "sha256:05").await;
    let right = dev_image(&db, "right", "sha256:06").await;

    lineage::save_layers(&db, left.id, &digests(&["l1", "l2"])).await.unwrap();
    lineage::save_layers(&db, right.id, &digests(&["l1", "l2"])).await.unwrap();

    assert_eq!(lineage::resolve_parent_image(&db, &left).await.unwrap(), None);
    assert_eq!(lineage::resolve_parent_image(&db, &right).await.unwrap(), None);
}

fn message(url: &str, commit: &str) -> (InboundMessage, String) {
    let value = json!({
        "repository": {"url": url, "commit": commit, "tag": "v1"},
        "aws_environment": "stage",
        "job_url": "https://ci/job/1",
        "ecr_image": []
    });
    let raw = value.to_string();
    (serde_json::from_value(value).unwrap(), raw)
}

#[tokio::test]
async fn excluded_repository_leaves_no_trace() {
    let db = setup_db().await;
    let (msg, raw) = message("git@github.com:acme/scratch.git", "abc123");
    let excluded = vec!["acme/scratch".to_string()];

    let unit = IngestionUnit::accept(&db, &msg, &raw, &excluded).await.unwrap();
    assert!(unit.is_none());
    assert_eq!(ingestion_units::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(repositories::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_commit_is_a_fatal_abort_without_a_unit_record() {
    let db = setup_db().await;
    let (msg, raw) = message("git@github.com:acme/web.git", "");

    let err = IngestionUnit::accept(&db, &msg, &raw, &[]).await.unwrap_err();
    assert!(matches!(err, IngestError::Malformed(_)));
    assert_eq!(ingestion_units::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn unparseable_repository_url_is_a_fatal_abort() {
    let db = setup_db().await;
    let (msg, raw) = message("ftp://nowhere/acme/web", "abc123");

    let err = IngestionUnit::accept(&db, &msg, &raw, &[]).await.unwrap_err();
    assert!(matches!(err, IngestError::Malformed(_)));
    assert_eq!(ingestion_units::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(repositories::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn failures_become_recorded_state_on_the_unit() {
    let db = setup_db().await;
    let (msg, raw) = message("git@github.com:acme/web.git", "abc123");

    let mut unit = IngestionUnit::accept(&db, &msg, &raw, &[]).await.unwrap().unwrap();
    unit.record_failure(&IngestError::ImageFetch("registry unreachable".into()));
    unit.finalize(&db).await.unwrap();

    let row = store::find_unit_by_uuid(&db, &unit.uuid).await.unwrap().unwrap();
    assert!(!row.succeeded);
    assert!(row.failure_log.contains("registry unreachable"));
    assert_eq!(row.commit.as_deref(), Some("abc123"));
    assert_eq!(row.environment.as_deref(), Some("stage"));

    let repository = repositories::Entity::find().one(&db).await.unwrap().unwrap();
    assert_eq!(row.repository_id, Some(repository.id));
    assert_eq!(repository.org, "acme");
}
