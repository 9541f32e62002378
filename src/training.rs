// =============================================================================
// training.rs: FROM HUMAN LABELS TO AN ENTITY MODEL
// =============================================================================
//
// Two steps, both offline:
//
// 1. `convert_label_studio` turns a Label Studio export into a training set
//    of `[text, {"entities": [[start, end, label], ...]}]` tuples, where
//    offsets are character positions in the original message.
//
// 2. `train_gazetteer` compiles that training set into a gazetteer entity
//    model: every labelled span becomes a lowercase pattern. The result is
//    written as a model directory that `GazetteerModel::load` understands.
// =============================================================================

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset;
use crate::error::TrainingError;
use crate::extractor::{self, EntityPattern, ModelMeta};

/// One task of a Label Studio JSON export.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelStudioTask {
    pub data: TaskData,
    /// Older exports say `completions`, newer ones `annotations`.
    #[serde(default, alias = "annotations")]
    pub completions: Vec<Completion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskData {
    pub messagetext: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub result: Vec<CompletionResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResult {
    pub value: SpanValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpanValue {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// `(start, end, label)` in character offsets.
pub type EntityAnnotation = (usize, usize, String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Annotations {
    pub entities: Vec<EntityAnnotation>,
}

/// Serialized as `[text, {"entities": [...]}]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingExample(pub String, pub Annotations);

impl TrainingExample {
    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn entities(&self) -> &[EntityAnnotation] {
        &self.1.entities
    }
}

/// Convert Label Studio tasks to training examples. Only the first
/// completion of each task counts, and only the first label of each span.
pub fn tasks_to_examples(
    tasks: Vec<LabelStudioTask>,
) -> Result<Vec<TrainingExample>, TrainingError> {
    let mut examples = Vec::with_capacity(tasks.len());

    for (index, task) in tasks.into_iter().enumerate() {
        let text = task
            .data
            .messagetext
            .ok_or(TrainingError::MissingField {
                index,
                field: "data.messagetext",
            })?;

        let mut entities = Vec::new();
        if let Some(completion) = task.completions.into_iter().next() {
            for item in completion.result {
                match item.value.labels.into_iter().next() {
                    Some(label) => entities.push((item.value.start, item.value.end, label)),
                    None => warn!(task = index, "Span without a label skipped"),
                }
            }
        }

        examples.push(TrainingExample(text, Annotations { entities }));
    }

    Ok(examples)
}

/// Read a Label Studio export and write the training set to `dest`.
pub fn convert_label_studio(
    source: &Path,
    dest: &Path,
) -> Result<Vec<TrainingExample>, TrainingError> {
    let tasks: Vec<LabelStudioTask> = dataset::read_records(source)?;
    let examples = tasks_to_examples(tasks)?;
    dataset::write_records(dest, &examples)?;

    info!(
        source = %source.display(),
        dest = %dest.display(),
        examples = examples.len(),
        entities = examples.iter().map(|e| e.entities().len()).sum::<usize>(),
        "Label Studio export converted"
    );
    Ok(examples)
}

/// Collect one pattern per distinct labelled span. Spans whose offsets do
/// not fit their text are skipped with a warning.
pub fn train_gazetteer(examples: &[TrainingExample]) -> Vec<EntityPattern> {
    let mut seen = HashSet::new();
    let mut patterns = Vec::new();

    for (index, example) in examples.iter().enumerate() {
        let chars: Vec<char> = example.text().chars().collect();
        for (start, end, label) in example.entities() {
            if start >= end || *end > chars.len() {
                warn!(
                    example = index,
                    start = start,
                    end = end,
                    len = chars.len(),
                    "Entity span out of bounds, skipped"
                );
                continue;
            }

            let span: String = chars[*start..*end].iter().collect();
            let span = span.trim().to_lowercase();
            if span.is_empty() {
                continue;
            }

            let pattern = EntityPattern {
                label: label.clone(),
                pattern: span,
            };
            if seen.insert(pattern.clone()) {
                patterns.push(pattern);
            }
        }
    }

    patterns
}

/// Compile the training set at `dataset_path` into a model directory.
pub fn train_model(dataset_path: &Path, model_dir: &Path) -> Result<ModelMeta, TrainingError> {
    let examples: Vec<TrainingExample> = dataset::read_records(dataset_path)?;
    let patterns = train_gazetteer(&examples);
    if patterns.is_empty() {
        return Err(TrainingError::NoSpans);
    }

    let name = model_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("gazetteer");

    let meta = extractor::write_model(model_dir, name, &patterns).map_err(|source| {
        TrainingError::Io {
            path: model_dir.to_path_buf(),
            source,
        }
    })?;

    info!(
        model = %model_dir.display(),
        examples = examples.len(),
        patterns = meta.pattern_count,
        labels = ?meta.labels,
        "Entity model trained"
    );
    Ok(meta)
}
