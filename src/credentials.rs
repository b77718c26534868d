//! Access token resolution for the CLI
//!
//! `GCP_ACCESS_TOKEN` wins when set; otherwise the token is minted by
//! `gcloud auth print-access-token` using the caller's active gcloud account or
//! application default credentials.

use anyhow::{bail, Context, Result};
use std::env;
use std::process::Command;
use tracing::debug;

pub const ACCESS_TOKEN_ENV: &str = "GCP_ACCESS_TOKEN";

pub fn resolve_access_token() -> Result<String> {
    if let Some(token) = env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()) {
        debug!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(token.trim().to_string());
    }

    debug!("Requesting access token from gcloud");
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .context("Failed to run gcloud; install the Cloud SDK or set GCP_ACCESS_TOKEN")?;

    if !output.status.success() {
        bail!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let token = String::from_utf8(output.stdout)
        .context("gcloud returned a non UTF-8 token")?
        .trim()
        .to_string();
    if token.is_empty() {
        bail!("gcloud returned an empty access token");
    }
    Ok(token)
}
