use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::IngestError;

/// Where to find the collaborator binaries and how long to let them run.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub crane_bin: PathBuf,
    pub syft_bin: PathBuf,
    pub grype_bin: PathBuf,
    pub timeout: Duration,
}

/// The registry's way of saying the platform variant was never published.
pub const VARIANT_MISSING_MARKER: &str = "no child with platform";

async fn run_tool(
    tool: &str,
    bin: &Path,
    args: &[&str],
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<std::process::Output, IngestError> {
    let mut command = Command::new(bin);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = command.spawn()?;
    if let Some(input) = stdin {
        if let Some(mut handle) = child.stdin.take() {
            handle.write_all(input.as_bytes()).await?;
        }
    }

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(IngestError::ScannerTimeout {
                tool: tool.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };
    if !output.status.success() {
        return Err(IngestError::Scanner {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

pub async fn registry_login(
    config: &ScannerConfig,
    registry: &str,
    username: &str,
    password: &str,
) -> Result<(), IngestError> {
    run_tool(
        "crane",
        &config.crane_bin,
        &["auth", "login", "--username", username, "--password-stdin", registry],
        Some(password),
        config.timeout,
    )
    .await?;
    log::debug!("authenticated to registry {registry}");
    Ok(())
}

/// Pull one platform variant of an image as a tarball. A registry answer
/// that the variant does not exist surfaces as `VariantMissing`; anything
/// else that stops the pull surfaces as `ImageFetch`.
pub async fn pull_image_tarball(
    config: &ScannerConfig,
    image_ref: &str,
    platform: &str,
    outfile: &Path,
) -> Result<(), IngestError> {
    if let Some(parent) = outfile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    log::info!("pulling image {image_ref} for {platform}");
    let out = outfile.to_string_lossy().into_owned();
    match run_tool(
        "crane",
        &config.crane_bin,
        &["pull", "--platform", platform, image_ref, &out],
        None,
        config.timeout,
    )
    .await
    {
        Ok(_) => Ok(()),
        Err(IngestError::Scanner { stderr, .. }) => {
            Err(classify_pull_failure(image_ref, platform, &stderr))
        }
        Err(other) => Err(other),
    }
}

fn classify_pull_failure(image_ref: &str, platform: &str, stderr: &str) -> IngestError {
    if stderr.contains(VARIANT_MISSING_MARKER) {
        IngestError::VariantMissing(format!("{image_ref} has no {platform} variant"))
    } else {
        IngestError::ImageFetch(format!("{image_ref}: {stderr}"))
    }
}

pub async fn generate_sbom(
    config: &ScannerConfig,
    tarball: &Path,
    outfile: &Path,
) -> Result<(), IngestError> {
    log::info!("generating SBOM for {}", tarball.display());
    let tar = tarball.to_string_lossy().into_owned();
    let output_spec = format!("json={}", outfile.display());
    run_tool(
        "syft",
        &config.syft_bin,
        &["-q", &tar, "-o", &output_spec],
        None,
        config.timeout,
    )
    .await?;
    log::info!("{} created", outfile.display());
    Ok(())
}

pub async fn generate_sca(
    config: &ScannerConfig,
    sbom: &Path,
    outfile: &Path,
) -> Result<(), IngestError> {
    log::info!("generating vulnerability matches for {}", sbom.display());
    let sbom_arg = sbom.to_string_lossy().into_owned();
    let output = run_tool(
        "grype",
        &config.grype_bin,
        &["-q", &sbom_arg, "-o", "json"],
        None,
        config.timeout,
    )
    .await?;
    std::fs::write(outfile, &output.stdout)?;
    log::info!("{} created", outfile.display());
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

/// Read the ordered layer list out of an image tarball's manifest.json.
pub fn read_layer_digests(tarball: &Path) -> Result<Vec<String>, IngestError> {
    let file = std::fs::File::open(tarball)?;
    let mut archive = tar::Archive::new(file);
    for entry in archive.entries()? {
        let entry = entry?;
        if entry.path()?.as_ref() != Path::new("manifest.json") {
            continue;
        }
        let manifest: Vec<ManifestEntry> = serde_json::from_reader(entry)?;
        let [single] = manifest.as_slice() else {
            return Err(IngestError::ImageFetch(format!(
                "{}: expected exactly one manifest entry, found {}",
                tarball.display(),
                manifest.len()
            )));
        };
        return Ok(single
            .layers
            .iter()
            .map(|entry| layer_digest_from_entry(entry))
            .collect());
    }
    Err(IngestError::ImageFetch(format!(
        "{}: no manifest.json in tarball",
        tarball.display()
    )))
}

/// Manifest layer entries carry an archive filename; the digest is the part
/// before the extension.
pub fn layer_digest_from_entry(entry: &str) -> String {
    entry
        .split_once(".tar.gz")
        .map(|(digest, _)| digest)
        .unwrap_or(entry)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_entry_extension_is_stripped() {
        assert_eq!(layer_digest_from_entry("abc123.tar.gz"), "abc123");
        assert_eq!(layer_digest_from_entry("abc123"), "abc123");
    }

    #[test]
    fn missing_variant_is_distinguished_from_fetch_failure() {
        let err = classify_pull_failure(
            "registry/web@sha256:1",
            "linux/arm64",
            "Error: no child with platform linux/arm64 in index",
        );
        assert!(matches!(err, IngestError::VariantMissing(_)));

        let err = classify_pull_failure(
            "registry/web@sha256:1",
            "linux/arm64",
            "Error: MANIFEST_UNKNOWN: manifest unknown",
        );
        assert!(matches!(err, IngestError::ImageFetch(_)));
    }
}
