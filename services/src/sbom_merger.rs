use fleetinv_shared::SbomDocument;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait};

use crate::entity::{MAX_LICENSE_NAME_LEN, image_package_association, images};
use crate::error::IngestError;
use crate::retry::{RetryPolicy, retry};
use crate::store;

/// Merge one SBOM document's artifact list into the package/license graph of
/// `image`. Returns whether the document introduced new or changed state;
/// re-running on the same document is a no-op and returns false.
pub async fn merge_sbom<C: ConnectionTrait>(
    db: &C,
    image: &images::Model,
    document: &SbomDocument,
) -> Result<bool, IngestError> {
    let mut changed = false;

    for artifact in &document.artifacts {
        let (package, package_created) =
            retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                store::get_or_create_package(
                    db,
                    &artifact.name,
                    artifact.version.as_deref(),
                    artifact.language.as_deref(),
                    artifact.purl.as_deref(),
                )
            })
            .await?;
        changed |= package_created;

        let (association, association_created) =
            retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                store::get_or_create_image_package(db, image.id, package.id)
            })
            .await?;
        changed |= association_created;

        if let Some(virtual_path) = artifact.virtual_path() {
            if association.pkg_metadata.as_deref() != Some(virtual_path) {
                let mut active: image_package_association::ActiveModel = association.into();
                active.pkg_metadata = Set(Some(virtual_path.to_string()));
                active.update(db).await.map_err(IngestError::from_db)?;
                changed = true;
            }
        }

        for license_name in artifact.licenses.iter().filter(|t| is_license_token(t)) {
            let clipped = store::clip(license_name, MAX_LICENSE_NAME_LEN);
            let (license, license_created) =
                retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                    store::get_or_create_license(db, &clipped)
                })
                .await?;
            changed |= license_created;

            let (_, link_created) =
                retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
                    store::get_or_create_package_license(db, package.id, license.id)
                })
                .await?;
            changed |= link_created;
        }

        if package_created || association_created {
            log::debug!("updated: {image} with package {}", package.name);
        } else {
            log::debug!("existing: {image} already has {}", package.name);
        }
    }

    Ok(changed)
}

/// Scanners interleave boolean operators into license expressions; those
/// tokens are noise, not licenses.
pub fn is_license_token(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered != "and" && lowered != "or"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_operator_tokens_are_dropped() {
        let tokens = vec!["MIT", "AND", "Apache-2.0"];
        let kept: Vec<&str> = tokens
            .into_iter()
            .filter(|t| is_license_token(t))
            .collect();
        assert_eq!(kept, vec!["MIT", "Apache-2.0"]);
    }

    #[test]
    fn case_does_not_matter() {
        assert!(!is_license_token("and"));
        assert!(!is_license_token("Or"));
        assert!(is_license_token("Android-SDK"));
    }
}
