// =============================================================================
// models.rs: THE DATA STRUCTURES OF SUSPICION
// =============================================================================
//
// Everything the decision pipeline reads or writes. Whitelist rows come in,
// samples come in, diagnoses go out. Nothing here does any thinking; the
// thinking happens in engine.rs.
// =============================================================================

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::RowError;

/// The verdict for one (message, URL) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    /// No extracted key word looked like any whitelisted organization.
    NoMatch,

    /// The message names a whitelisted brand and the URL lives on that
    /// brand's registrable domain.
    Legitimate,

    /// The message names a whitelisted brand but the URL points somewhere
    /// else. Classic smishing.
    PotentialPhishing,
}

impl Diagnosis {
    /// The label stored in the `diagnosis` column. Downstream spreadsheets
    /// match on these exact strings.
    pub fn label(&self) -> &'static str {
        match self {
            Diagnosis::NoMatch => "Matches not found",
            Diagnosis::Legitimate => "Legitimate site.",
            Diagnosis::PotentialPhishing => "Potential phishing site.",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Diagnosis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Whitelist aliases as they appear on disk: either a proper list, or the
/// comma-separated cell the hand-curated tables tend to use
/// (`"bb, banco do brasil, card credit"`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum KeyWordsCell {
    List(Vec<String>),
    Joined(String),
}

impl KeyWordsCell {
    /// Trimmed, lowercased, de-duplicated aliases in first-seen order.
    pub fn normalized(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            KeyWordsCell::List(words) => words.iter().map(String::as_str).collect(),
            KeyWordsCell::Joined(joined) => joined.split(',').collect(),
        };

        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for word in raw {
            let word = word.trim().to_lowercase();
            if !word.is_empty() && !out.contains(&word) {
                out.push(word);
            }
        }
        out
    }
}

/// One whitelist row exactly as stored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhitelistRecord {
    pub key_words: KeyWordsCell,
    pub organization: String,
    pub site: String,
}

/// A validated whitelist entry. Immutable once the whitelist is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct WhitelistEntry {
    /// Normalized organization aliases. Never empty.
    pub key_words: Vec<String>,
    pub organization: String,
    /// Canonical URL of the organization.
    pub site: String,
    /// Registrable domain of `site`, computed once at load. Never empty.
    pub domain: String,
}

/// One unit of input to classify: a whole input row.
///
/// The engine only reads `sms` and `site`. Every other column rides along
/// untouched, in its original position, so it can be written back out next
/// to the diagnosis. A null, missing or non-text `sms`/`site` cell reads as
/// `""` and the row still gets diagnosed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Sample {
    columns: Map<String, Value>,
}

impl Sample {
    pub fn new(sms: impl Into<String>, site: impl Into<String>) -> Self {
        let mut columns = Map::new();
        columns.insert("sms".into(), Value::String(sms.into()));
        columns.insert("site".into(), Value::String(site.into()));
        Self { columns }
    }

    pub fn sms(&self) -> &str {
        self.text("sms")
    }

    pub fn site(&self) -> &str {
        self.text("site")
    }

    pub fn columns(&self) -> &Map<String, Value> {
        &self.columns
    }

    /// Set a column. Existing columns keep their position, new ones go last.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    fn text(&self, column: &str) -> &str {
        match self.columns.get(column) {
            Some(Value::String(text)) => text.as_str(),
            _ => "",
        }
    }
}

/// An input row followed by its `diagnosis` column (and `error`, when the
/// row failed).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct DiagnosedSample {
    columns: Map<String, Value>,
}

impl DiagnosedSample {
    pub fn new(sample: Sample, outcome: &Result<Diagnosis, RowError>) -> Self {
        // Stale columns from a previous run would collide with ours.
        let mut columns: Map<String, Value> = sample
            .columns
            .into_iter()
            .filter(|(column, _)| column != "diagnosis" && column != "error")
            .collect();

        match outcome {
            Ok(diagnosis) => {
                columns.insert("diagnosis".into(), Value::String(diagnosis.label().into()));
            }
            Err(e) => {
                columns.insert("diagnosis".into(), Value::Null);
                columns.insert("error".into(), Value::String(e.message.clone()));
            }
        }

        Self { columns }
    }

    pub fn columns(&self) -> &Map<String, Value> {
        &self.columns
    }
}

/// Everything the engine learned while diagnosing one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub diagnosis: Diagnosis,
    /// Registrable domain of the sample's URL (`""` if unparsable).
    pub domain: String,
    /// What the extractor pulled out of the message.
    pub key_words: Vec<String>,
    /// Organizations whose aliases matched, in whitelist order.
    pub organizations: Vec<String>,
}
