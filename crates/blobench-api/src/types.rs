//! Response shapes for the Grafana datasource-query API.
//!
//! `/api/ds/query` answers with a map of per-refId results, each carrying a
//! list of data frames. Probes only consume the frame *schemas*: every field
//! may carry a label map (`instance`, `pubkey`, ...) identifying the series.

use std::collections::HashMap;

use serde::Deserialize;

/// Response envelope from `POST /api/ds/query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: HashMap<String, RefIdResult>,
}

/// Result set for a single query refId.
#[derive(Debug, Clone, Deserialize)]
pub struct RefIdResult {
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// One data frame: schema plus (ignored) column data.
#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub schema: FrameSchema,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameSchema {
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A single frame field; label maps identify the originating series.
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}

impl QueryResponse {
    /// Iterate every field across all refIds and frames.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.results
            .values()
            .flat_map(|r| &r.frames)
            .flat_map(|f| &f.schema.fields)
    }

    /// Collect `(a, b)` label-value pairs from every field that carries
    /// non-empty values for both labels. Order follows frame order;
    /// duplicates are preserved (callers dedupe as needed).
    pub fn label_pairs(&self, a: &str, b: &str) -> Vec<(String, String)> {
        self.fields()
            .filter_map(|field| {
                let labels = field.labels.as_ref()?;
                let va = labels.get(a).filter(|v| !v.is_empty())?;
                let vb = labels.get(b).filter(|v| !v.is_empty())?;
                Some((va.clone(), vb.clone()))
            })
            .collect()
    }

    /// Collect the distinct, non-empty values of one label, preserving
    /// first-seen order.
    pub fn distinct_label_values(&self, label: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for field in self.fields() {
            if let Some(value) = field
                .labels
                .as_ref()
                .and_then(|l| l.get(label))
                .filter(|v| !v.is_empty())
            {
                if !seen.iter().any(|s| s == value) {
                    seen.push(value.clone());
                }
            }
        }
        seen
    }
}

/// One entry from `GET /api/datasources`.
#[derive(Debug, Clone, Deserialize)]
pub struct Datasource {
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}
