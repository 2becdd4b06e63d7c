//! Repository fetch

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::HostError;
use crate::filesys::file::File;
use crate::models::deployment::DeploymentSource;

/// Build the clone URL for a source, embedding the credential when the
/// remote is an https one. Local-path remotes pass through untouched.
pub fn clone_url(remote_base: &str, source: &DeploymentSource, credential: &SecretString) -> String {
    let token = credential.expose_secret();
    if !token.is_empty() {
        if let Some(rest) = remote_base.strip_prefix("https://") {
            return format!(
                "https://{}@{}/{}/{}.git",
                token, rest, source.owner, source.repository
            );
        }
    }
    format!(
        "{}/{}/{}.git",
        remote_base, source.owner, source.repository
    )
}

/// Clone the requested branch into `target_dir`, appending the clone output
/// to the deployment's sink so observers can watch the fetch happen. The
/// caller bounds this with a timeout.
pub async fn fetch_repository(
    remote_base: &str,
    source: &DeploymentSource,
    credential: &SecretString,
    target_dir: &Path,
    sink: &File,
) -> Result<(), HostError> {
    let url = clone_url(remote_base, source, credential);
    info!(
        "Fetching {}/{} (branch: {}) into {}",
        source.owner,
        source.repository,
        source.branch,
        target_dir.display()
    );

    let output = Command::new("git")
        .args(["clone", "-b", &source.branch])
        .arg(&url)
        .arg(target_dir)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| HostError::FetchError(format!("failed to run git clone: {}", e)))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    if !combined.is_empty() {
        sink.append_string(&combined).await?;
    }

    if !output.status.success() {
        debug!("git clone failed: {}", combined.trim_end());
        return Err(HostError::FetchError(format!(
            "git clone of {}/{} (branch {}) failed",
            source.owner, source.repository, source.branch
        )));
    }

    info!("Fetched {}/{}", source.owner, source.repository);
    Ok(())
}
