/// Keyword matching against raw item text. Case-insensitive substring only,
/// no stemming or fuzzing, so results are reproducible.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    lowered: Vec<String>,
    wildcard: bool,
}

/// Returned as the sole match in wildcard mode.
pub const WILDCARD_MATCH: &str = "*";

impl KeywordMatcher {
    /// Blank keywords are dropped; an empty or all-blank set puts the
    /// matcher in wildcard mode, where every item matches.
    pub fn new(keywords: &[String]) -> Self {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();
        let wildcard = keywords.is_empty();

        Self {
            keywords,
            lowered,
            wildcard,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Returns the subset of keywords found in `text`, in the order they
    /// were given. Empty result means the item should be discarded; in
    /// wildcard mode the result is always non-empty.
    pub fn matches(&self, text: &str) -> Vec<String> {
        if self.wildcard {
            return vec![WILDCARD_MATCH.to_string()];
        }

        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .zip(self.lowered.iter())
            .filter(|(_, lowered)| haystack.contains(lowered.as_str()))
            .map(|(original, _)| original.clone())
            .collect()
    }
}
