use serde::{Deserialize, Serialize};

/// Inbound queue message announcing a build that pushed one or more images.
///
/// Agreement with the publisher:
///
/// ```json
/// {
///     "repository": { "url": "...", "commit": "...", "tag": "..." },
///     "aws_environment": "stage",
///     "job_url": "https://ci.example.com/job/42",
///     "ecr_image": [
///         { "name": "<registry host>/<repo>", "digest": "sha256:...",
///           "type": "Image" | "ImageIndex",
///           "platform": { "os": "linux", "architecture": "arm64" } }
///     ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub repository: RepositoryRef,
    pub aws_environment: String,
    #[serde(default)]
    pub job_url: String,
    #[serde(default)]
    pub ecr_image: Vec<EcrImageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub url: String,
    pub commit: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcrImageEntry {
    pub name: String,
    pub digest: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Only present for entries of type "Image".
    #[serde(default)]
    pub platform: Option<PlatformSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub os: String,
    pub architecture: String,
}

impl EcrImageEntry {
    pub fn is_manifest_list(&self) -> bool {
        self.kind == "ImageIndex"
    }
}

/// SBOM document as emitted by the SBOM scanner. Only the fields the mergers
/// consume are modelled; everything else in the document is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbomDocument {
    #[serde(default)]
    pub artifacts: Vec<SbomArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbomArtifact {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub purl: Option<String>,
    #[serde(default, rename = "metadataType")]
    pub metadata_type: Option<String>,
    /// Shape depends on metadataType, so kept untyped.
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub licenses: Vec<String>,
}

impl SbomArtifact {
    /// Virtual path for archive-packaged metadata, the one mutable field on
    /// an image-package association.
    pub fn virtual_path(&self) -> Option<&str> {
        if self.metadata_type.as_deref() != Some("JavaMetadata") {
            return None;
        }
        self.metadata.get("virtualPath").and_then(|v| v.as_str())
    }
}

/// Vulnerability-match document as emitted by the SBOM-to-vulnerability
/// matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaDocument {
    #[serde(default)]
    pub matches: Vec<VulnerabilityMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityMatch {
    pub vulnerability: VulnerabilityRecord,
    #[serde(default, rename = "relatedVulnerabilities")]
    pub related_vulnerabilities: Vec<VulnerabilityRecord>,
    pub artifact: MatchArtifact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArtifact {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub purl: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, rename = "dataSource")]
    pub data_source: Option<String>,
    #[serde(default)]
    pub cvss: Vec<CvssEntry>,
    #[serde(default)]
    pub fix: FixRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixRecord {
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvssEntry {
    pub metrics: CvssMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvssMetrics {
    #[serde(default, rename = "baseScore")]
    pub base_score: Option<f64>,
    #[serde(default, rename = "exploitabilityScore")]
    pub exploitability_score: Option<f64>,
    #[serde(default, rename = "impactScore")]
    pub impact_score: Option<f64>,
}
