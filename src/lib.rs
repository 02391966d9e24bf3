//! Postcraft: one idea, four platform posts, four illustrations
//!
//! Drafts LinkedIn, Twitter, Instagram and Facebook posts from a single idea
//! and tone, then requests one image per post in parallel. Partial failures
//! leave the drafts usable; a fatal authorization failure locks generation
//! until a new key is selected.

pub mod auth;
pub mod cli;
pub mod config;
pub mod draft;
pub mod error;
pub mod image;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod share;
