use chrono::Utc;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    prelude::DateTimeWithTimeZone,
};

use crate::entity::{
    accounts, image_package_association, images, ingestion_units, license_family,
    package_license_association, packages, repositories, vulnerabilities,
    vulnerability_package_association,
};
use crate::error::IngestError;
use crate::vcs::RepoLocator;

// Every creation in the system goes through one of the get_or_create
// primitives below: look up by the natural key, insert when absent. Under
// concurrent callers the unique constraints make exactly one insert win;
// the loser surfaces IngestError::Conflict and its retry re-reads the row
// the winner created.

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

/// Character-bounded truncation for values scanners refuse to keep short.
pub(crate) fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn opt_eq<C: ColumnTrait>(column: C, value: Option<&str>) -> SimpleExpr {
    match value {
        Some(v) => column.eq(v),
        None => column.is_null(),
    }
}

pub async fn ensure_account<C: ConnectionTrait>(
    db: &C,
    account_id: &str,
    name: &str,
) -> Result<(accounts::Model, bool), IngestError> {
    if let Some(found) = accounts::Entity::find_by_id(account_id)
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    if name.is_empty() {
        return Err(IngestError::Malformed(format!(
            "account {account_id} does not exist and cannot be created without a name"
        )));
    }
    let created = accounts::ActiveModel {
        id: Set(account_id.to_string()),
        name: Set(Some(name.to_string())),
        kind: Set("stage".to_string()),
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    log::info!("created account id: {account_id} name: {name}");
    Ok((created, true))
}

pub async fn get_or_create_repository<C: ConnectionTrait>(
    db: &C,
    locator: &RepoLocator,
) -> Result<(repositories::Model, bool), IngestError> {
    if let Some(found) = repositories::Entity::find()
        .filter(repositories::Column::Provider.eq(locator.provider.as_str()))
        .filter(repositories::Column::Org.eq(locator.org.as_str()))
        .filter(repositories::Column::Name.eq(locator.name.as_str()))
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let created = repositories::ActiveModel {
        provider: Set(locator.provider.clone()),
        org: Set(locator.org.clone()),
        name: Set(locator.name.clone()),
        is_public: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

/// Natural key of an image row.
#[derive(Debug, Clone, Copy)]
pub struct ImageKey<'a> {
    pub name: &'a str,
    pub account_id: &'a str,
    pub digest: &'a str,
    pub platform: &'a str,
}

pub async fn get_or_create_image<C: ConnectionTrait>(
    db: &C,
    key: &ImageKey<'_>,
) -> Result<(images::Model, bool), IngestError> {
    if let Some(found) = images::Entity::find()
        .filter(images::Column::Name.eq(key.name))
        .filter(images::Column::AccountId.eq(key.account_id))
        .filter(images::Column::Digest.eq(key.digest))
        .filter(images::Column::Platform.eq(key.platform))
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let timestamp = now();
    let created = images::ActiveModel {
        name: Set(key.name.to_string()),
        account_id: Set(key.account_id.to_string()),
        digest: Set(key.digest.to_string()),
        platform: Set(key.platform.to_string()),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

pub async fn get_or_create_package<C: ConnectionTrait>(
    db: &C,
    name: &str,
    version: Option<&str>,
    language: Option<&str>,
    purl: Option<&str>,
) -> Result<(packages::Model, bool), IngestError> {
    if let Some(found) = packages::Entity::find()
        .filter(packages::Column::Name.eq(name))
        .filter(opt_eq(packages::Column::Version, version))
        .filter(opt_eq(packages::Column::Language, language))
        .filter(opt_eq(packages::Column::Purl, purl))
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let timestamp = now();
    let created = packages::ActiveModel {
        name: Set(name.to_string()),
        version: Set(version.map(str::to_string)),
        language: Set(language.map(str::to_string)),
        purl: Set(purl.map(str::to_string)),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

/// Look up a package the way the vulnerability merger needs it: by purl when
/// the match carries one, by (name, version, language) otherwise. Lookup
/// only; the vulnerability merger must never create packages.
pub async fn find_package<C: ConnectionTrait>(
    db: &C,
    purl: Option<&str>,
    name: &str,
    version: Option<&str>,
    language: Option<&str>,
) -> Result<Option<packages::Model>, IngestError> {
    let query = match purl {
        Some(p) if !p.is_empty() => {
            packages::Entity::find().filter(packages::Column::Purl.eq(p))
        }
        _ => packages::Entity::find()
            .filter(packages::Column::Name.eq(name))
            .filter(opt_eq(packages::Column::Version, version))
            .filter(opt_eq(packages::Column::Language, language)),
    };
    query.one(db).await.map_err(IngestError::from_db)
}

pub async fn get_or_create_license<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<(license_family::Model, bool), IngestError> {
    if let Some(found) = license_family::Entity::find()
        .filter(license_family::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let created = license_family::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

pub async fn get_or_create_vulnerability<C: ConnectionTrait>(
    db: &C,
    external_id: &str,
) -> Result<(vulnerabilities::Model, bool), IngestError> {
    if let Some(found) = vulnerabilities::Entity::find_by_id(external_id)
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let created = vulnerabilities::ActiveModel {
        id: Set(external_id.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

pub async fn get_or_create_image_package<C: ConnectionTrait>(
    db: &C,
    image_id: i32,
    package_id: i32,
) -> Result<(image_package_association::Model, bool), IngestError> {
    if let Some(found) = image_package_association::Entity::find_by_id((image_id, package_id))
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let created = image_package_association::ActiveModel {
        image_id: Set(image_id),
        package_id: Set(package_id),
        pkg_metadata: Set(None),
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

pub async fn get_or_create_package_license<C: ConnectionTrait>(
    db: &C,
    package_id: i32,
    license_id: i32,
) -> Result<(package_license_association::Model, bool), IngestError> {
    if let Some(found) = package_license_association::Entity::find_by_id((package_id, license_id))
        .one(db)
        .await
        .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let created = package_license_association::ActiveModel {
        package_id: Set(package_id),
        license_id: Set(license_id),
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

pub async fn get_or_create_vulnerability_package<C: ConnectionTrait>(
    db: &C,
    vulnerability_id: &str,
    package_id: i32,
) -> Result<(vulnerability_package_association::Model, bool), IngestError> {
    if let Some(found) =
        vulnerability_package_association::Entity::find_by_id((vulnerability_id.to_string(), package_id))
            .one(db)
            .await
            .map_err(IngestError::from_db)?
    {
        return Ok((found, false));
    }
    let created = vulnerability_package_association::ActiveModel {
        vulnerability_id: Set(vulnerability_id.to_string()),
        package_id: Set(package_id),
        fix: Set(None),
    }
    .insert(db)
    .await
    .map_err(IngestError::from_db)?;
    Ok((created, true))
}

pub async fn find_unit_by_uuid<C: ConnectionTrait>(
    db: &C,
    unit_uuid: &str,
) -> Result<Option<ingestion_units::Model>, IngestError> {
    ingestion_units::Entity::find()
        .filter(ingestion_units::Column::Uuid.eq(unit_uuid))
        .one(db)
        .await
        .map_err(IngestError::from_db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_is_character_bounded() {
        assert_eq!(clip("GPL-2.0-only", 150), "GPL-2.0-only");
        assert_eq!(clip("abcdef", 3), "abc");
        // multi-byte characters are kept whole, never split
        assert_eq!(clip("äöü", 2), "äö");
    }
}
