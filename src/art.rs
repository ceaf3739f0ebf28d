use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use eframe::egui::ColorImage;
use tracing::debug;

/// One decoded album image ready for texture upload, or nothing to do.
#[derive(Clone, PartialEq)]
pub enum ArtUpdate {
    /// Leave whatever is currently displayed alone.
    Unchanged,
    Image(ColorImage),
}

impl std::fmt::Debug for ArtUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtUpdate::Unchanged => f.write_str("Unchanged"),
            ArtUpdate::Image(image) => f.debug_struct("Image").field("size", &image.size).finish(),
        }
    }
}

/// Fetches remote art bytes. Seam for the cache tests.
pub trait ArtFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a fixed request timeout.
pub struct HttpArtFetcher {
    client: reqwest::blocking::Client,
}

impl HttpArtFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl ArtFetcher for HttpArtFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read art body from {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Single-slot cache for remote album art.
///
/// Holds the most recently downloaded remote image in one overwritable file,
/// keyed by the URI it came from. Local `file://` art bypasses the slot
/// entirely and is decoded from its path on every call.
#[derive(Debug)]
pub struct ArtCache {
    last_uri: Option<String>,
    cache_path: PathBuf,
}

impl ArtCache {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            last_uri: None,
            cache_path: cache_path.into(),
        }
    }

    /// Resolves one art URI into a display update.
    ///
    /// Remote URIs reuse the slot when the URI matches the last attempt and
    /// the file still exists; the displayed image is already current, so the
    /// update is `Unchanged`. Anything else downloads into the slot. The
    /// download is staged in memory and decoded before the slot is
    /// overwritten, so a failed or garbled fetch leaves the previous bytes
    /// in place.
    pub fn refresh(&mut self, uri: &str, fetcher: &impl ArtFetcher) -> Result<ArtUpdate> {
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(ArtUpdate::Image(decode_art_file(Path::new(path))?));
        }

        if self.last_uri.as_deref() == Some(uri) && self.cache_path.exists() {
            debug!(uri, "album art unchanged; reusing cache slot");
            return Ok(ArtUpdate::Unchanged);
        }

        // Attempt recorded up front: after a failed fetch the stale slot
        // keeps serving until the URI changes again.
        self.last_uri = Some(uri.to_string());

        let bytes = fetcher.fetch(uri)?;
        let image = decode_art_bytes(&bytes)?;
        fs::write(&self.cache_path, &bytes).with_context(|| {
            format!("failed to write art cache {}", self.cache_path.display())
        })?;
        debug!(uri, path = %self.cache_path.display(), "album art cached");
        Ok(ArtUpdate::Image(image))
    }
}

pub fn decode_art_bytes(bytes: &[u8]) -> Result<ColorImage> {
    let image = image::load_from_memory(bytes).context("failed to decode album art")?;
    let image = image.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = image.into_raw();
    Ok(ColorImage::from_rgba_unmultiplied(size, &pixels))
}

fn decode_art_file(path: &Path) -> Result<ColorImage> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read album art {}", path.display()))?;
    decode_art_bytes(&bytes)
}
