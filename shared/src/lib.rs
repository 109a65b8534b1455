pub mod models;

pub use models::{
    CvssEntry, CvssMetrics, EcrImageEntry, FixRecord, InboundMessage, MatchArtifact, PlatformSpec,
    RepositoryRef, SbomArtifact, SbomDocument, ScaDocument, VulnerabilityMatch,
    VulnerabilityRecord,
};
