//! Draft domain model
//!
//! Tones, platforms, the per-platform lookup table, and the result cards the
//! orchestrator owns between one text generation and the next.

use crate::image::{AspectRatio, ImageReference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod hashtags;

pub use hashtags::{HashtagError, HashtagList};

/// Voice preset applied uniformly across every platform draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Witty,
    Urgent,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Professional, Tone::Witty, Tone::Urgent];

    pub fn slug(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Witty => "witty",
            Tone::Urgent => "urgent",
        }
    }

    /// Instruction fragment handed to the text model.
    pub fn voice(self) -> &'static str {
        match self {
            Tone::Professional => "authoritative, polished and credible",
            Tone::Witty => "playful, clever and light-hearted",
            Tone::Urgent => "energetic, time-sensitive and action-driving",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.slug() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid tone: {} (must be professional, witty, or urgent)",
                    s
                )
            })
    }
}

/// Target network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Twitter,
    Instagram,
    Facebook,
}

/// Static per-platform facts. Platform differences live here, not in match arms.
#[derive(Debug)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub slug: &'static str,
    pub display_name: &'static str,
    pub default_aspect_ratio: AspectRatio,
    pub carries_hashtags: bool,
    pub style_guide: &'static str,
    /// Web share intent and the query parameter carrying the text, if any.
    pub share_intent: Option<(&'static str, &'static str)>,
}

static PROFILES: [PlatformProfile; 4] = [
    PlatformProfile {
        platform: Platform::LinkedIn,
        slug: "linkedin",
        display_name: "LinkedIn",
        default_aspect_ratio: AspectRatio::Landscape16x9,
        carries_hashtags: false,
        style_guide: "long-form professional post, short paragraphs, a clear takeaway",
        share_intent: Some(("https://www.linkedin.com/feed/", "shareText")),
    },
    PlatformProfile {
        platform: Platform::Twitter,
        slug: "twitter",
        display_name: "Twitter",
        default_aspect_ratio: AspectRatio::Landscape16x9,
        carries_hashtags: false,
        style_guide: "punchy post under 280 characters",
        share_intent: Some(("https://twitter.com/intent/tweet", "text")),
    },
    PlatformProfile {
        platform: Platform::Instagram,
        slug: "instagram",
        display_name: "Instagram",
        default_aspect_ratio: AspectRatio::Square,
        carries_hashtags: true,
        style_guide: "visual-first caption with emojis; hashtags returned separately",
        share_intent: None,
    },
    PlatformProfile {
        platform: Platform::Facebook,
        slug: "facebook",
        display_name: "Facebook",
        default_aspect_ratio: AspectRatio::Landscape4x3,
        carries_hashtags: false,
        style_guide: "conversational community post that invites comments",
        share_intent: Some(("https://www.facebook.com/sharer/sharer.php", "quote")),
    },
];

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Instagram,
        Platform::Facebook,
    ];

    pub fn profile(self) -> &'static PlatformProfile {
        &PROFILES[self as usize]
    }

    pub fn slug(self) -> &'static str {
        self.profile().slug
    }

    pub fn display_name(self) -> &'static str {
        self.profile().display_name
    }

    pub fn default_aspect_ratio(self) -> AspectRatio {
        self.profile().default_aspect_ratio
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.slug() == wanted || (wanted == "x" && *p == Platform::Twitter))
            .ok_or_else(|| {
                format!(
                    "Invalid platform: {} (must be linkedin, twitter, instagram, or facebook)",
                    s
                )
            })
    }
}

/// A validated user request. Only constructible with a non-blank idea.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    idea: String,
    tone: Tone,
}

impl GenerationRequest {
    /// Returns `None` when the idea is empty after trimming.
    pub fn new(idea: &str, tone: Tone) -> Option<Self> {
        let idea = idea.trim();
        if idea.is_empty() {
            return None;
        }
        Some(Self {
            idea: idea.to_string(),
            tone,
        })
    }

    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }
}

/// Generated copy for one platform, as returned by the text service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDraft {
    pub text: String,
    pub image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
}

/// One draft per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerPlatformDraft {
    drafts: BTreeMap<Platform, PlatformDraft>,
}

impl PerPlatformDraft {
    /// Build from a map; every platform must be present.
    pub fn new(drafts: BTreeMap<Platform, PlatformDraft>) -> Result<Self, String> {
        let missing: Vec<&str> = Platform::ALL
            .iter()
            .filter(|p| !drafts.contains_key(p))
            .map(|p| p.slug())
            .collect();
        if !missing.is_empty() {
            return Err(format!("Missing drafts for: {}", missing.join(", ")));
        }
        Ok(Self { drafts })
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformDraft> {
        self.drafts.get(&platform)
    }

    pub fn into_drafts(self) -> BTreeMap<Platform, PlatformDraft> {
        self.drafts
    }
}

/// Card state for one platform inside the live result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformResult {
    pub text: String,
    pub image_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<HashtagList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageReference>,
    pub image_loading: bool,
}

impl PlatformResult {
    fn from_draft(platform: Platform, draft: PlatformDraft) -> Self {
        let hashtags = if platform.profile().carries_hashtags {
            Some(HashtagList::from_generated(
                draft.hashtags.unwrap_or_default(),
            ))
        } else {
            None
        };
        Self {
            text: draft.text,
            image_prompt: draft.image_prompt,
            hashtags,
            image: None,
            image_loading: false,
        }
    }

    /// Text as it would be pasted into the platform, hashtags appended.
    pub fn shareable_text(&self) -> String {
        match &self.hashtags {
            Some(tags) if !tags.is_empty() => format!("{}\n\n{}", self.text, tags.joined()),
            _ => self.text.clone(),
        }
    }
}

/// The complete set of cards produced by one text generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    epoch: u64,
    results: BTreeMap<Platform, PlatformResult>,
}

impl ResultSet {
    pub fn from_drafts(epoch: u64, drafts: PerPlatformDraft) -> Self {
        let results = drafts
            .into_drafts()
            .into_iter()
            .map(|(platform, draft)| (platform, PlatformResult::from_draft(platform, draft)))
            .collect();
        Self { epoch, results }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformResult> {
        self.results.get(&platform)
    }

    pub fn get_mut(&mut self, platform: Platform) -> Option<&mut PlatformResult> {
        self.results.get_mut(&platform)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, &PlatformResult)> {
        self.results.iter().map(|(p, r)| (*p, r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Platform, &mut PlatformResult)> {
        self.results.iter_mut().map(|(p, r)| (*p, r))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn any_loading(&self) -> bool {
        self.results.values().any(|r| r.image_loading)
    }
}
