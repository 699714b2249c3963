//! Text canonicalization for repost detection.

use base64::Engine;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Digest of a post's core message. Equal keys mean the same underlying
/// message, whoever reposted it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips repost boilerplate (retweet marker, leading mentions, trailing
/// short link) and hashes what remains.
#[derive(Clone, Debug)]
pub struct Canonicalizer {
    whitespace: Regex,
    retweet: Regex,
    handle: Regex,
    url_postfix: Regex,
}

impl Canonicalizer {
    /// Create a new canonicalizer with pre-compiled patterns.
    pub fn new() -> Self {
        Self {
            whitespace: Regex::new(r"\s+").unwrap(),
            retweet: Regex::new(r"(?i)^RT\s+").unwrap(),
            handle: Regex::new(r"^@\S+\s+").unwrap(),
            url_postfix: Regex::new(r"(?i)https?://t\.co/\S+$").unwrap(),
        }
    }

    /// Collapse whitespace runs to single spaces. Used for display only.
    pub fn clean_message(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").into_owned()
    }

    /// The message left once repost boilerplate is removed.
    ///
    /// Stripping repeats until nothing changes, so the result is a fixed
    /// point: `core_message(core_message(t)) == core_message(t)`.
    pub fn core_message(&self, text: &str) -> String {
        let mut base = self.strip_once(text);
        loop {
            let next = self.strip_once(&base);
            if next == base {
                return base;
            }
            base = next;
        }
    }

    /// SHA-256 of the core message, base64 rendered.
    pub fn canonical_key(&self, text: &str) -> CanonicalKey {
        let base = self.core_message(text);
        let digest = Sha256::digest(base.as_bytes());
        CanonicalKey(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    fn strip_once(&self, text: &str) -> String {
        let base = self.retweet.replace(text, "");
        let base = self.whitespace.replace_all(&base, " ");
        let mut base = self.url_postfix.replace(&base, "").into_owned();

        while let Some(m) = self.handle.find(&base) {
            base = base[m.end()..].to_string();
        }

        base.trim_end().to_string()
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// First `len` characters of the base64 SHA-256 of `salt + value`.
///
/// Used to pseudonymise screen names in human-readable output.
pub fn short_hash(salt: &str, value: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(value.as_bytes());
    let encoded = base64::engine::general_purpose::STANDARD.encode(hasher.finalize());
    encoded.chars().take(len).collect()
}
