//! HTTP boundary for dependency archives.

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

/// Something that can stream the body at `url` into `dest`.
pub trait Downloader {
    /// Download `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64>;
}

/// Blocking `reqwest` downloader.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("firmforge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(HttpDownloader { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64> {
        tracing::info!("Downloading {}", url);

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("HTTP {} from {}", response.status(), url);
        }

        let bytes = response
            .copy_to(dest)
            .with_context(|| format!("failed to read response body from {}", url))?;

        tracing::debug!("Downloaded {} bytes from {}", bytes, url);
        Ok(bytes)
    }
}
