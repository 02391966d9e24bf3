//! Image request configuration and image references.
//!
//! The user picks one of eight aspect ratios (or `auto`) and a resolution
//! tier; the provider only accepts five ratios, so every request goes through
//! [`map_to_supported`] before it leaves the process.

use crate::draft::Platform;
use crate::error::ApiError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ratios the image endpoint accepts.
pub const SUPPORTED_RATIOS: [&str; 5] = ["1:1", "3:4", "4:3", "9:16", "16:9"];

const FALLBACK_RATIO: &str = "1:1";

/// Map any requested ratio onto the provider-supported set.
///
/// 2:3 → 3:4, 3:2 → 4:3, 21:9 → 16:9; supported ratios pass through; anything
/// unrecognized becomes 1:1.
pub fn map_to_supported(ratio: &str) -> &'static str {
    match ratio {
        "2:3" => "3:4",
        "3:2" => "4:3",
        "21:9" => "16:9",
        other => SUPPORTED_RATIOS
            .iter()
            .copied()
            .find(|supported| *supported == other)
            .unwrap_or(FALLBACK_RATIO),
    }
}

/// The fixed ratios offered in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 8] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Ultrawide21x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Ultrawide21x9 => "21:9",
        }
    }

    /// Nearest ratio the provider accepts.
    pub fn supported(self) -> &'static str {
        map_to_supported(self.as_str())
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| format!("Invalid aspect ratio: {}", s))
    }
}

/// `auto` means the platform default from the profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AspectRatioChoice {
    #[default]
    Auto,
    Fixed(AspectRatio),
}

impl AspectRatioChoice {
    pub fn resolve(self, platform: Platform) -> AspectRatio {
        match self {
            AspectRatioChoice::Auto => platform.default_aspect_ratio(),
            AspectRatioChoice::Fixed(ratio) => ratio,
        }
    }

    /// Settings menu entries: auto first, then the fixed ratios.
    pub fn options() -> Vec<AspectRatioChoice> {
        std::iter::once(AspectRatioChoice::Auto)
            .chain(AspectRatio::ALL.into_iter().map(AspectRatioChoice::Fixed))
            .collect()
    }
}

impl fmt::Display for AspectRatioChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatioChoice::Auto => f.write_str("auto"),
            AspectRatioChoice::Fixed(ratio) => write!(f, "{}", ratio),
        }
    }
}

impl FromStr for AspectRatioChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(AspectRatioChoice::Auto);
        }
        s.parse().map(AspectRatioChoice::Fixed)
    }
}

impl TryFrom<String> for AspectRatioChoice {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatioChoice> for String {
    fn from(choice: AspectRatioChoice) -> Self {
        choice.to_string()
    }
}

/// Output size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[default]
    #[serde(rename = "1K")]
    Standard,
    #[serde(rename = "2K")]
    High,
    #[serde(rename = "4K")]
    Ultra,
}

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 3] = [
        ResolutionTier::Standard,
        ResolutionTier::High,
        ResolutionTier::Ultra,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionTier::Standard => "1K",
            ResolutionTier::High => "2K",
            ResolutionTier::Ultra => "4K",
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ResolutionTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == wanted)
            .ok_or_else(|| format!("Invalid resolution: {} (must be 1K, 2K, or 4K)", s))
    }
}

/// Process-wide image settings, read by every image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageRequestConfig {
    #[serde(default)]
    pub aspect_ratio: AspectRatioChoice,
    #[serde(default)]
    pub resolution: ResolutionTier,
}

/// Wire-ready values for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedImageRequest {
    pub aspect_ratio: &'static str,
    pub image_size: &'static str,
}

impl ImageRequestConfig {
    pub fn resolve_for(&self, platform: Platform) -> ResolvedImageRequest {
        ResolvedImageRequest {
            aspect_ratio: self.aspect_ratio.resolve(platform).supported(),
            image_size: self.resolution.as_str(),
        }
    }
}

/// A resolvable image resource, held as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn from_base64(mime_type: &str, data: &str) -> Self {
        Self(format!("data:{};base64,{}", mime_type, data))
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::from_base64(mime_type, &STANDARD.encode(bytes))
    }

    pub fn parse(uri: &str) -> Result<Self, ApiError> {
        let reference = Self(uri.to_string());
        reference.split()?;
        Ok(reference)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> Result<(&str, &str), ApiError> {
        let rest = self
            .0
            .strip_prefix("data:")
            .ok_or_else(|| ApiError::InvalidInput("Image reference is not a data URI".to_string()))?;
        let (mime, payload) = rest.split_once(";base64,").ok_or_else(|| {
            ApiError::InvalidInput("Image reference is not base64 encoded".to_string())
        })?;
        Ok((mime, payload))
    }

    pub fn mime_type(&self) -> &str {
        self.split().map(|(mime, _)| mime).unwrap_or("application/octet-stream")
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, ApiError> {
        let (_, payload) = self.split()?;
        STANDARD
            .decode(payload)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid image payload: {}", e)))
    }

    /// Decoded size without allocating the payload twice.
    pub fn approx_size_bytes(&self) -> usize {
        self.split().map(|(_, p)| p.len() / 4 * 3).unwrap_or(0)
    }
}
