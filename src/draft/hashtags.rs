//! Editable hashtag list for the Instagram card.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashtagError {
    #[error("Hashtag is empty")]
    Empty,
    #[error("Hashtag {0} is already in the list")]
    Duplicate(String),
    #[error("There is no Instagram draft to edit")]
    NoDraft,
}

/// Ordered, case-insensitively unique list of `#`-prefixed tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HashtagList {
    tags: Vec<String>,
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = trimmed.trim_start_matches('#').trim();
    if body.is_empty() {
        return None;
    }
    Some(format!("#{}", body))
}

impl HashtagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from model output, silently dropping blanks and duplicates.
    pub fn from_generated<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for tag in tags {
            let _ = list.add(tag.as_ref());
        }
        list
    }

    /// Append a tag, prefixing `#` when missing.
    pub fn add(&mut self, raw: &str) -> Result<&str, HashtagError> {
        let tag = normalize(raw).ok_or(HashtagError::Empty)?;
        if self.contains(&tag) {
            return Err(HashtagError::Duplicate(tag));
        }
        self.tags.push(tag);
        Ok(self.tags.last().map(String::as_str).unwrap_or_default())
    }

    /// Remove the tag at `index`; out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    pub fn contains(&self, tag: &str) -> bool {
        let wanted = match normalize(tag) {
            Some(t) => t.to_lowercase(),
            None => return false,
        };
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn joined(&self) -> String {
        self.tags.join(" ")
    }
}
