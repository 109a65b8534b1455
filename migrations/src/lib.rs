use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

pub mod m20250512_000001_create_accounts;
pub mod m20250512_000002_create_repositories;
pub mod m20250512_000003_create_ingestion_units;
pub mod m20250512_000004_create_images;
pub mod m20250512_000005_create_layers;
pub mod m20250512_000006_create_packages;
pub mod m20250512_000007_create_license_family;
pub mod m20250512_000008_create_image_package_association;
pub mod m20250512_000009_create_package_license_association;
pub mod m20250512_000010_create_vulnerabilities;
pub mod m20250512_000011_create_vulnerability_package_association;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250512_000001_create_accounts::Migration),
            Box::new(m20250512_000002_create_repositories::Migration),
            Box::new(m20250512_000003_create_ingestion_units::Migration),
            Box::new(m20250512_000004_create_images::Migration),
            Box::new(m20250512_000005_create_layers::Migration),
            Box::new(m20250512_000006_create_packages::Migration),
            Box::new(m20250512_000007_create_license_family::Migration),
            Box::new(m20250512_000008_create_image_package_association::Migration),
            Box::new(m20250512_000009_create_package_license_association::Migration),
            Box::new(m20250512_000010_create_vulnerabilities::Migration),
            Box::new(m20250512_000011_create_vulnerability_package_association::Migration),
        ]
    }
}
