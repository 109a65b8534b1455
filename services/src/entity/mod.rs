pub mod accounts;
pub mod image_package_association;
pub mod images;
pub mod ingestion_units;
pub mod layers;
pub mod license_family;
pub mod package_license_association;
pub mod packages;
pub mod repositories;
pub mod vulnerabilities;
pub mod vulnerability_package_association;

/// Scanners sometimes emit long descriptive strings where a license name is
/// expected; stored names are truncated to this length.
pub const MAX_LICENSE_NAME_LEN: usize = 150;

/// Stored vulnerability descriptions are truncated to this length.
pub const MAX_VULNERABILITY_DESCRIPTION_LEN: usize = 500;
