//! Property-based tests for ratio mapping and hashtag editing
