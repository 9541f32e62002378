// =============================================================================
// matcher.rs: DOES THIS MESSAGE NAME-DROP A BRAND WE KNOW?
// =============================================================================
//
// The matcher takes what the extractor pulled out of a message and a
// whitelist entry's aliases, and answers one question: is any extracted
// word close enough to any alias?
//
// "Close enough" means a similarity ratio strictly above the threshold
// (0.59 out of the box). There is deliberately no substring shortcut:
// a two-letter alias like "bb" will not match "banco bb" by containment,
// only by ratio. Short aliases can be missed this way; that trade-off is
// inherited and left alone.
// =============================================================================

use crate::similarity;

/// Default similarity threshold. Strictly-greater-than.
pub const DEFAULT_THRESHOLD: f64 = 0.59;

/// Decides whether extracted key words match a set of whitelist aliases.
pub trait Matcher: Send + Sync {
    fn matches(&self, key_words: &[String], aliases: &[String]) -> bool;
}

/// Ratio-based fuzzy matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatcher {
    pub threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Matcher for FuzzyMatcher {
    fn matches(&self, key_words: &[String], aliases: &[String]) -> bool {
        find_key_word_matches(key_words, aliases, self.threshold)
    }
}

/// True if any alias is similar to any extracted key word.
pub fn find_key_word_matches(key_words: &[String], aliases: &[String], threshold: f64) -> bool {
    aliases
        .iter()
        .any(|alias| get_similarity(key_words, alias, threshold))
}

/// True if at least one of `key_words` scores above `threshold` against
/// `alias`. The key word is the first sequence, the alias the second.
///
/// An empty `key_words` never matches.
pub fn get_similarity<S: AsRef<str>>(key_words: &[S], alias: &str, threshold: f64) -> bool {
    key_words
        .iter()
        .any(|key| similarity::ratio(key.as_ref(), alias) > threshold)
}
