use fleetinv_shared::{CvssEntry, ScaDocument, VulnerabilityMatch};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait};

use crate::entity::{
    MAX_VULNERABILITY_DESCRIPTION_LEN, images, vulnerabilities,
    vulnerability_package_association,
};
use crate::error::IngestError;
use crate::retry::{RetryPolicy, retry};
use crate::store;

/// Scoring data is only trusted when it comes from this source.
pub const SCORING_AUTHORITY: &str = "nvd.nist.gov";

/// Merge one vulnerability-match document into the vulnerability graph of
/// `image`. The image's packages must already have been merged from its
/// SBOM; a match whose package is absent raises
/// [`IngestError::DependencyMissing`] instead of creating a placeholder.
pub async fn merge_vulnerability_matches<C: ConnectionTrait>(
    db: &C,
    image: &images::Model,
    document: &ScaDocument,
) -> Result<bool, IngestError> {
    let mut changed = false;

    for vulnerability_match in &document.matches {
        let artifact = &vulnerability_match.artifact;
        let package = store::find_package(
            db,
            artifact.purl.as_deref(),
            &artifact.name,
            artifact.version.as_deref(),
            artifact.language.as_deref(),
        )
        .await?
        .ok_or_else(|| {
            IngestError::DependencyMissing(format!(
                "package not found in {image}: {} {}",
                artifact.name,
                artifact.version.as_deref().unwrap_or("?"),
            ))
        })?;

        let record = &vulnerability_match.vulnerability;
        let (vulnerability, created) =
            retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                store::get_or_create_vulnerability(db, &record.id)
            })
            .await?;
        changed |= created;

        let related = vulnerability_match
            .related_vulnerabilities
            .iter()
            .map(|r| r.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let related = (!related.is_empty()).then_some(related);
        let description = record
            .description
            .as_deref()
            .map(|d| store::clip(d, MAX_VULNERABILITY_DESCRIPTION_LEN));

        let mut active: vulnerabilities::ActiveModel = vulnerability.clone().into();
        let mut record_changed = false;
        if description.is_some() && vulnerability.description != description {
            active.description = Set(description);
            record_changed = true;
        }
        if record.severity.is_some() && vulnerability.severity != record.severity {
            active.severity = Set(record.severity.clone());
            record_changed = true;
        }
        if vulnerability.related != related {
            active.related = Set(related);
            record_changed = true;
        }
        if let Some(entry) = authoritative_cvss(vulnerability_match) {
            let metrics = &entry.metrics;
            if vulnerability.cvss_base_score != metrics.base_score {
                active.cvss_base_score = Set(metrics.base_score);
                record_changed = true;
            }
            if vulnerability.cvss_exploitability_score != metrics.exploitability_score {
                active.cvss_exploitability_score = Set(metrics.exploitability_score);
                record_changed = true;
            }
            if vulnerability.cvss_impact_score != metrics.impact_score {
                active.cvss_impact_score = Set(metrics.impact_score);
                record_changed = true;
            }
        }
        if record_changed {
            active.update(db).await.map_err(IngestError::from_db)?;
            changed = true;
        }

        let fix = record.fix.versions.join(",");
        let fix = (!fix.is_empty()).then_some(fix);
        let (association, association_created) =
            retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                store::get_or_create_vulnerability_package(db, &record.id, package.id)
            })
            .await?;
        changed |= association_created;

        // The fix list is always replaced per document, never merged.
        if association.fix != fix {
            let mut active: vulnerability_package_association::ActiveModel = association.into();
            active.fix = Set(fix);
            active.update(db).await.map_err(IngestError::from_db)?;
            changed = true;
        }

        if record_changed || created || association_created {
            log::debug!("updated: {image} for vulnerability {}", record.id);
        } else {
            log::debug!("existing: {image} already has {}", record.id);
        }
    }

    Ok(changed)
}

/// Pick the scoring record from the canonical authority: the match's own
/// record when its data source is authoritative, otherwise the first related
/// record from the authority carrying the same id. None when neither
/// qualifies.
pub fn authoritative_cvss(vulnerability_match: &VulnerabilityMatch) -> Option<&CvssEntry> {
    let record = &vulnerability_match.vulnerability;
    if is_authoritative(record.data_source.as_deref()) {
        return record.cvss.first();
    }
    vulnerability_match
        .related_vulnerabilities
        .iter()
        .find(|related| is_authoritative(related.data_source.as_deref()) && related.id == record.id)
        .and_then(|related| related.cvss.first())
}

fn is_authoritative(data_source: Option<&str>) -> bool {
    data_source.is_some_and(|source| source.contains(SCORING_AUTHORITY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetinv_shared::{CvssMetrics, FixRecord, MatchArtifact, VulnerabilityRecord};

    fn record(id: &str, data_source: Option<&str>, base_score: Option<f64>) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.to_string(),
            description: None,
            severity: None,
            data_source: data_source.map(str::to_string),
            cvss: base_score
                .map(|score| CvssEntry {
                    metrics: CvssMetrics {
                        base_score: Some(score),
                        exploitability_score: Some(score / 2.0),
                        impact_score: Some(score / 3.0),
                    },
                })
                .into_iter()
                .collect(),
            fix: FixRecord::default(),
        }
    }

    fn match_with(
        vulnerability: VulnerabilityRecord,
        related: Vec<VulnerabilityRecord>,
    ) -> VulnerabilityMatch {
        VulnerabilityMatch {
            vulnerability,
            related_vulnerabilities: related,
            artifact: MatchArtifact {
                name: "zlib".to_string(),
                version: Some("1.2.11".to_string()),
                language: None,
                purl: Some("pkg:apk/zlib@1.2.11".to_string()),
            },
        }
    }

    #[test]
    fn own_record_wins_when_authoritative() {
        let m = match_with(
            record("CVE-1", Some("https://nvd.nist.gov/vuln/detail/CVE-1"), Some(9.8)),
            vec![record("CVE-1", Some("https://nvd.nist.gov/..."), Some(1.0))],
        );
        let cvss = authoritative_cvss(&m).unwrap();
        assert_eq!(cvss.metrics.base_score, Some(9.8));
    }

    #[test]
    fn related_record_must_match_id_and_authority() {
        let m = match_with(
            record("GHSA-xyz", Some("https://github.com/advisories"), Some(5.0)),
            vec![
                record("CVE-2", Some("https://nvd.nist.gov/..."), Some(3.0)),
                record("GHSA-xyz", Some("https://nvd.nist.gov/..."), Some(7.5)),
            ],
        );
        let cvss = authoritative_cvss(&m).unwrap();
        assert_eq!(cvss.metrics.base_score, Some(7.5));
    }

    #[test]
    fn no_authoritative_source_yields_none() {
        let m = match_with(
            record("GHSA-abc", Some("https://github.com/advisories"), Some(5.0)),
            vec![record("CVE-3", Some("https://osv.dev"), Some(3.0))],
        );
        assert!(authoritative_cvss(&m).is_none());
    }
}
