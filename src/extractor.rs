// =============================================================================
// extractor.rs: THE KEY-WORD EXTRACTOR
// =============================================================================
//
// The decision engine does not care HOW brand names get pulled out of a
// message, only that something hands it a list of spans. That something is
// the `KeyWordExtractor` trait.
//
// The implementation shipped here is a gazetteer entity model: a directory
// holding `patterns.jsonl` (one `{"label", "pattern"}` record per line, the
// entity-ruler pattern format) and a `meta.json` describing it. The `train`
// subcommand compiles one of these from labelled messages.
//
// Matching runs an Aho-Corasick automaton over the lowercased message so
// every pattern is found in a single pass, then keeps the leftmost-longest
// non-overlapping hits that sit on word boundaries. "apple" inside
// "pineapple" is not a brand mention.
// =============================================================================

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasick, MatchKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ExtractError, ModelLoadError};

pub const PATTERNS_FILE: &str = "patterns.jsonl";
pub const META_FILE: &str = "meta.json";

/// Pulls candidate organization key words out of raw message text.
///
/// Implementations must be deterministic for a fixed model. Callers must
/// not rely on the order of the returned spans.
pub trait KeyWordExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<String>, ExtractError>;
}

/// One gazetteer entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntityPattern {
    pub label: String,
    pub pattern: String,
}

/// Descriptive metadata written next to the patterns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMeta {
    pub name: String,
    pub labels: Vec<String>,
    pub pattern_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A recognised entity span in the lowercased text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    /// Byte offsets into the lowercased text.
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
}

/// Pattern-based entity model.
pub struct GazetteerModel {
    patterns: Vec<EntityPattern>,
    automaton: AhoCorasick,
    /// Only emit entities with these labels. `None` = everything.
    labels: Option<HashSet<String>>,
}

impl std::fmt::Debug for GazetteerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazetteerModel")
            .field("patterns", &self.patterns.len())
            .field("labels", &self.labels)
            .finish()
    }
}

impl GazetteerModel {
    /// Build a model from patterns. Patterns are trimmed and lowercased;
    /// blanks and duplicates are dropped.
    pub fn from_patterns(patterns: Vec<EntityPattern>) -> Result<Self, ModelLoadError> {
        let mut seen = HashSet::new();
        let patterns: Vec<EntityPattern> = patterns
            .into_iter()
            .map(|p| EntityPattern {
                label: p.label,
                pattern: p.pattern.trim().to_lowercase(),
            })
            .filter(|p| !p.pattern.is_empty())
            .filter(|p| seen.insert(p.clone()))
            .collect();

        // Overlapping search needs the standard match semantics; the
        // leftmost-longest selection happens in `entities`.
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(patterns.iter().map(|p| p.pattern.as_str()))
            .map_err(|e| ModelLoadError::Automaton(e.to_string()))?;

        Ok(Self {
            patterns,
            automaton,
            labels: None,
        })
    }

    /// Load a model directory, or a bare `patterns.jsonl` file.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let patterns_path: PathBuf = if path.is_dir() {
            path.join(PATTERNS_FILE)
        } else {
            path.to_path_buf()
        };

        let raw = fs::read_to_string(&patterns_path).map_err(|source| ModelLoadError::Io {
            path: patterns_path.clone(),
            source,
        })?;

        let mut patterns = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let pattern: EntityPattern =
                serde_json::from_str(line).map_err(|source| ModelLoadError::BadPattern {
                    path: patterns_path.clone(),
                    line: idx + 1,
                    source,
                })?;
            patterns.push(pattern);
        }

        let model = Self::from_patterns(patterns)?;
        if model.patterns.is_empty() {
            return Err(ModelLoadError::Empty(patterns_path));
        }

        let meta = if path.is_dir() {
            read_meta(&path.join(META_FILE))
        } else {
            None
        };

        info!(
            path = %path.display(),
            patterns = model.patterns.len(),
            name = meta.as_ref().map(|m| m.name.as_str()).unwrap_or("unnamed"),
            "Entity model loaded"
        );

        Ok(model)
    }

    /// Restrict output to entities carrying one of `labels`.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// All entity spans in `text`, in text order.
    pub fn entities(&self, text: &str) -> Vec<EntitySpan> {
        let lower = text.to_lowercase();

        let mut hits: Vec<(usize, usize, usize)> = self
            .automaton
            .find_overlapping_iter(&lower)
            .filter(|m| on_word_boundary(&lower, m.start(), m.end()))
            .filter(|m| self.label_allowed(&self.patterns[m.pattern().as_usize()].label))
            .map(|m| (m.start(), m.end(), m.pattern().as_usize()))
            .collect();

        // Leftmost first, then longest.
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        let mut spans = Vec::new();
        let mut cursor = 0;
        for (start, end, pattern_idx) in hits {
            if start < cursor {
                continue;
            }
            spans.push(EntitySpan {
                start,
                end,
                label: self.patterns[pattern_idx].label.clone(),
                text: lower[start..end].to_string(),
            });
            cursor = end;
        }

        debug!(entities = spans.len(), "Entity scan complete");
        spans
    }

    fn label_allowed(&self, label: &str) -> bool {
        match &self.labels {
            Some(allowed) => allowed.contains(label),
            None => true,
        }
    }
}

impl KeyWordExtractor for GazetteerModel {
    fn extract(&self, text: &str) -> Result<Vec<String>, ExtractError> {
        Ok(self.entities(text).into_iter().map(|e| e.text).collect())
    }
}

/// Write `patterns` as a model directory. Returns the metadata written.
pub fn write_model(
    dir: &Path,
    name: &str,
    patterns: &[EntityPattern],
) -> std::io::Result<ModelMeta> {
    fs::create_dir_all(dir)?;

    let mut body = String::new();
    for pattern in patterns {
        body.push_str(&serde_json::to_string(pattern)?);
        body.push('\n');
    }
    fs::write(dir.join(PATTERNS_FILE), body)?;

    let mut labels: Vec<String> = patterns.iter().map(|p| p.label.clone()).collect();
    labels.sort();
    labels.dedup();

    let meta = ModelMeta {
        name: name.to_string(),
        labels,
        pattern_count: patterns.len(),
        created_at: Utc::now(),
    };
    fs::write(dir.join(META_FILE), serde_json::to_string_pretty(&meta)?)?;

    Ok(meta)
}

fn read_meta(path: &Path) -> Option<ModelMeta> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(label: &str, text: &str) -> EntityPattern {
        EntityPattern {
            label: label.to_string(),
            pattern: text.to_string(),
        }
    }

    fn model() -> GazetteerModel {
        GazetteerModel::from_patterns(vec![
            pattern("ORG", "apple"),
            pattern("PRODUCT", "iphone"),
            pattern("ORG", "banco do brasil"),
            pattern("ORG", "banco"),
            pattern("ORG", "bb"),
        ])
        .unwrap()
    }

    #[test]
    fn test_extracts_lowercased_spans_in_order() {
        let words = model().extract("Your iPhone from APPLE shipped").unwrap();
        assert_eq!(words, vec!["iphone", "apple"]);
    }

    #[test]
    fn test_longest_match_wins() {
        let words = model().extract("Banco do Brasil informa: cartao bloqueado").unwrap();
        assert_eq!(words, vec!["banco do brasil"]);
    }

    #[test]
    fn test_word_boundaries_are_respected() {
        assert!(model().extract("fresh pineapple juice").unwrap().is_empty());
        assert_eq!(model().extract("bbx bb!").unwrap(), vec!["bb"]);
    }

    #[test]
    fn test_no_entities_in_unrelated_text() {
        assert!(model().extract("Meeting at 5pm").unwrap().is_empty());
        assert!(model().extract("").unwrap().is_empty());
    }

    #[test]
    fn test_label_filter() {
        let only_orgs = model().with_labels(["ORG"]);
        assert_eq!(
            only_orgs.extract("Your iPhone from Apple").unwrap(),
            vec!["apple"]
        );
    }

    #[test]
    fn test_patterns_are_normalized_and_deduplicated() {
        let model = GazetteerModel::from_patterns(vec![
            pattern("ORG", "  Apple "),
            pattern("ORG", "apple"),
            pattern("ORG", "   "),
        ])
        .unwrap();
        assert_eq!(model.pattern_count(), 1);
    }

    #[test]
    fn test_write_then_load_model_directory() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("phishing_ner");
        let meta = write_model(
            &model_dir,
            "phishing_ner",
            &[pattern("ORG", "apple"), pattern("PRODUCT", "iphone")],
        )
        .unwrap();
        assert_eq!(meta.pattern_count, 2);
        assert_eq!(meta.labels, vec!["ORG", "PRODUCT"]);

        let loaded = GazetteerModel::load(&model_dir).unwrap();
        assert_eq!(loaded.pattern_count(), 2);
        assert_eq!(loaded.extract("an iphone").unwrap(), vec!["iphone"]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GazetteerModel::load(&dir.path().join("missing")),
            Err(ModelLoadError::NotFound(_))
        ));

        let empty = dir.path().join("empty.jsonl");
        fs::write(&empty, "\n\n").unwrap();
        assert!(matches!(
            GazetteerModel::load(&empty),
            Err(ModelLoadError::Empty(_))
        ));

        let bad = dir.path().join("bad.jsonl");
        fs::write(&bad, "{\"label\": \"ORG\", \"pattern\": \"apple\"}\nnot json\n").unwrap();
        assert!(matches!(
            GazetteerModel::load(&bad),
            Err(ModelLoadError::BadPattern { line: 2, .. })
        ));
    }
}
