// =============================================================================
// engine.rs: THE DECISION ENGINE
// =============================================================================
//
// For one (message, URL) pair:
//
//   1. Carve the registrable domain out of the URL.
//   2. Ask the extractor which brand-ish key words the message contains.
//   3. Keep the whitelist entries whose aliases fuzzy-match those words.
//   4. None kept?                       -> Matches not found
//   5. URL domain is one of theirs?     -> Legitimate site
//      Otherwise                        -> Potential phishing site
//
// Anyone can type "Apple" into a text message. Registering apple.com is a
// different story. Key words narrow the field to the brands the message
// claims to be from; the domain check decides whether the claim holds.
//
// Only the registrable domain is compared. Subdomains and paths are ignored
// on purpose, so "evil.apple.com" would pass. Tightening that is a product
// decision, not a bug fix.
// =============================================================================

use tracing::{debug, info};

use crate::domain::get_url_domain;
use crate::error::ExtractError;
use crate::extractor::KeyWordExtractor;
use crate::matcher::{FuzzyMatcher, Matcher};
use crate::models::{Diagnosis, Verdict};
use crate::whitelist::{domains_of, Whitelist};

/// Whitelist + extractor + matcher, wired together. Holds no per-sample
/// state, so one engine can serve any number of threads.
pub struct DecisionEngine<E, M = FuzzyMatcher> {
    whitelist: Whitelist,
    extractor: E,
    matcher: M,
}

impl<E: KeyWordExtractor, M: Matcher> DecisionEngine<E, M> {
    pub fn new(whitelist: Whitelist, extractor: E, matcher: M) -> Self {
        Self {
            whitelist,
            extractor,
            matcher,
        }
    }

    /// Diagnose one sample and report how the verdict was reached.
    ///
    /// Logs one human-readable status line per call. Callers should branch
    /// on the returned verdict, never on the log.
    pub fn check(&self, sms: &str, site: &str) -> Result<Verdict, ExtractError> {
        let domain = get_url_domain(site);
        let key_words = self.extractor.extract(sms)?;

        let matches = self.whitelist.matching_entries(&key_words, &self.matcher);

        let diagnosis = if matches.is_empty() {
            Diagnosis::NoMatch
        } else if domains_of(&matches).contains(&domain.as_str()) {
            Diagnosis::Legitimate
        } else {
            Diagnosis::PotentialPhishing
        };

        let organizations: Vec<String> = matches.iter().map(|e| e.organization.clone()).collect();

        debug!(
            domain = %domain,
            key_words = ?key_words,
            organizations = ?organizations,
            "Whitelist lookup complete"
        );
        info!(domain = %domain, "{}", diagnosis);

        Ok(Verdict {
            diagnosis,
            domain,
            key_words,
            organizations,
        })
    }

    /// Just the diagnosis.
    pub fn diagnose(&self, sms: &str, site: &str) -> Result<Diagnosis, ExtractError> {
        self.check(sms, site).map(|v| v.diagnosis)
    }
}
