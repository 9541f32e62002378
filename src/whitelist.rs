// =============================================================================
// whitelist.rs: THE LIST OF BRANDS WE TRUST
// =============================================================================
//
// |key_words                        |organization    |site          |
// |bb, banco do brasil, card credit |Banco do Brasil |www.bb.com.br |
// |apple, iphone, macbook           |Apple           |www.apple.com |
//
// Loaded once at startup, validated, then frozen. Every entry's registrable
// domain is computed at load so the per-sample hot path never re-parses a
// whitelist URL.
// =============================================================================

use std::path::Path;

use tracing::info;

use crate::dataset;
use crate::domain::get_url_domain;
use crate::error::WhitelistError;
use crate::matcher::Matcher;
use crate::models::{WhitelistEntry, WhitelistRecord};

/// Read-only, ordered collection of trusted organizations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
}

impl Whitelist {
    /// Validate raw records. Fails on the first entry with no usable
    /// aliases or no parsable site domain.
    pub fn from_records(records: Vec<WhitelistRecord>) -> Result<Self, WhitelistError> {
        let mut entries = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let key_words = record.key_words.normalized();
            if key_words.is_empty() {
                return Err(WhitelistError::NoKeyWords {
                    index,
                    organization: record.organization,
                });
            }

            let domain = get_url_domain(&record.site);
            if domain.is_empty() {
                return Err(WhitelistError::BadSite {
                    index,
                    organization: record.organization,
                    site: record.site,
                });
            }

            entries.push(WhitelistEntry {
                key_words,
                organization: record.organization,
                site: record.site,
                domain,
            });
        }

        Ok(Self { entries })
    }

    /// Load and validate the whitelist table at `path`.
    pub fn load(path: &Path) -> Result<Self, WhitelistError> {
        let records: Vec<WhitelistRecord> = dataset::read_records(path)?;
        let whitelist = Self::from_records(records)?;

        info!(
            path = %path.display(),
            organizations = whitelist.len(),
            "Whitelist loaded"
        );
        Ok(whitelist)
    }

    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose aliases match `key_words`, in whitelist order.
    pub fn matching_entries<'a, M: Matcher + ?Sized>(
        &'a self,
        key_words: &[String],
        matcher: &M,
    ) -> Vec<&'a WhitelistEntry> {
        if key_words.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| matcher.matches(key_words, &entry.key_words))
            .collect()
    }

    /// Every `site` value, in order.
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.site.as_str())
    }
}

/// Registrable domains of the given entries' sites.
pub fn domains_of<'a>(entries: &[&'a WhitelistEntry]) -> Vec<&'a str> {
    entries.iter().map(|e| e.domain.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::FuzzyMatcher;
    use crate::models::KeyWordsCell;

    fn record(key_words: &str, organization: &str, site: &str) -> WhitelistRecord {
        WhitelistRecord {
            key_words: KeyWordsCell::Joined(key_words.to_string()),
            organization: organization.to_string(),
            site: site.to_string(),
        }
    }

    fn sample_whitelist() -> Whitelist {
        Whitelist::from_records(vec![
            record("bb, banco do brasil, card credit", "Banco do Brasil", "www.bb.com.br"),
            record("apple, iphone, macbook", "Apple", "www.apple.com"),
        ])
        .unwrap()
    }

    #[test]
    fn test_domains_are_precomputed() {
        let whitelist = sample_whitelist();
        let domains: Vec<&str> = whitelist.entries().iter().map(|e| e.domain.as_str()).collect();
        assert_eq!(domains, vec!["bb", "apple"]);
        assert_eq!(
            whitelist.sites().collect::<Vec<_>>(),
            vec!["www.bb.com.br", "www.apple.com"]
        );
    }

    #[test]
    fn test_matching_entries_keeps_whitelist_order() {
        let whitelist = sample_whitelist();
        let matched = whitelist.matching_entries(
            &["iphone".to_string(), "banco do brasil".to_string()],
            &FuzzyMatcher::default(),
        );
        let orgs: Vec<&str> = matched.iter().map(|e| e.organization.as_str()).collect();
        assert_eq!(orgs, vec!["Banco do Brasil", "Apple"]);
        assert_eq!(domains_of(&matched), vec!["bb", "apple"]);
    }

    #[test]
    fn test_no_key_words_no_matches() {
        let whitelist = sample_whitelist();
        assert!(whitelist
            .matching_entries(&[], &FuzzyMatcher::new(0.0))
            .is_empty());
    }

    #[test]
    fn test_rejects_entry_without_aliases() {
        let err =
            Whitelist::from_records(vec![record(" , ", "Nobody", "www.nobody.com")]).unwrap_err();
        assert!(matches!(err, WhitelistError::NoKeyWords { index: 0, .. }));
    }

    #[test]
    fn test_rejects_entry_with_bad_site() {
        let err = Whitelist::from_records(vec![
            record("apple", "Apple", "www.apple.com"),
            record("ghost", "Ghost", "not a url"),
        ])
        .unwrap_err();
        assert!(matches!(err, WhitelistError::BadSite { index: 1, .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white_list.json");
        std::fs::write(
            &path,
            r#"[{"key_words": ["apple", "iphone"], "organization": "Apple", "site": "www.apple.com"}]"#,
        )
        .unwrap();

        let whitelist = Whitelist::load(&path).unwrap();
        assert_eq!(whitelist.len(), 1);
        assert_eq!(whitelist.entries()[0].domain, "apple");
    }
}
