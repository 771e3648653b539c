use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::{DomainError, DomainResult};

const MAX_EDGE: u32 = 300;
const JPEG_QUALITY: u8 = 85;

/// Fetches and normalizes student photos: bounded-timeout HTTP or a file
/// under the photo dir, resized to fit 300x300, RGB JPEG at quality 85.
#[derive(Clone)]
pub struct PhotoService {
    client: reqwest::blocking::Client,
    photo_dir: PathBuf,
    placeholder: Vec<u8>,
}

impl PhotoService {
    pub fn new(photo_dir: PathBuf, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        let placeholder = {
            let img = image::RgbImage::from_pixel(MAX_EDGE, MAX_EDGE, image::Rgb([214, 219, 224]));
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&img)?;
            out
        };
        Ok(Self {
            client,
            photo_dir,
            placeholder,
        })
    }

    /// Normalized JPEG for a photo source. Any failure (non-2xx, timeout,
    /// missing file, decode error) falls back to the placeholder and is
    /// never surfaced to the caller.
    pub fn fetch_jpeg(&self, source: Option<&str>) -> Vec<u8> {
        let Some(source) = source.map(str::trim).filter(|s| !s.is_empty()) else {
            return self.placeholder.clone();
        };
        match self.try_fetch(source) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(source, error = %e, "photo fetch failed, using placeholder");
                self.placeholder.clone()
            }
        }
    }

    fn try_fetch(&self, source: &str) -> DomainResult<Vec<u8>> {
        let raw = if source.starts_with("http://") || source.starts_with("https://") {
            let response = self
                .client
                .get(source)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?;
            response
                .bytes()
                .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?
                .to_vec()
        } else {
            std::fs::read(self.photo_dir.join(source))
                .map_err(|e| DomainError::UpstreamUnavailable(format!("{}: {}", source, e)))?
        };
        normalize_jpeg(&raw)
    }

    /// Stored photo by bare file name, as a base64 data URI. Names with
    /// path separators never resolve; a missing file is `not_found`.
    pub fn encode_stored(&self, name: &str) -> DomainResult<String> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(DomainError::not_found(format!("image {}", name)));
        }
        let path = self.photo_dir.join(name);
        if !path.is_file() {
            return Err(DomainError::not_found(format!("image {}", name)));
        }
        let raw = std::fs::read(&path)
            .map_err(|e| DomainError::UpstreamUnavailable(format!("{}: {}", name, e)))?;
        Ok(jpeg_data_uri(&normalize_jpeg(&raw)?))
    }
}

/// Decode any supported format, bound to 300x300 preserving aspect ratio
/// (never upscaled), re-encode as RGB JPEG. Decode and encode failures
/// rank as upstream failures so callers treat them like a fetch miss.
pub fn normalize_jpeg(raw: &[u8]) -> DomainResult<Vec<u8>> {
    let img = image::load_from_memory(raw)
        .map_err(|e| DomainError::UpstreamUnavailable(format!("image decode failed: {}", e)))?;
    let rgb = img.thumbnail(MAX_EDGE, MAX_EDGE).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| DomainError::UpstreamUnavailable(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}

pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
}
