use anyhow::{Context, Result};
use std::time::Duration;

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Extension of the last path segment, used as a decoder hint.
pub fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Download an encoded audio file into memory.
pub fn fetch_audio(url: &str) -> Result<Vec<u8>> {
    log::info!("Fetching {}", url);
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("Failed to build HTTP client")?;

    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Server rejected {}", url))?;

    let bytes = resp
        .bytes()
        .with_context(|| format!("Failed to read body of {}", url))?;
    log::info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
