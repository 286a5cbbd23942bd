//! Hosted classification model client
//!
//! Talks to inference endpoints that answer with a list of `{label, score}`
//! pairs (optionally nested one level, as text-classification pipelines do).
//! Model labels are mapped onto [`Signal`]s through a [`LabelMap`].

use super::{FeatureVector, ScoringError, Signal};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default label mapping covering common sentiment/emotion labels and
/// scene labels from ImageNet-style classifiers
const DEFAULT_LABELS: &[(&str, Signal)] = &[
    // Sentiment and emotion heads
    ("positive", Signal::Positivity),
    ("negative", Signal::Negativity),
    ("neutral", Signal::Calm),
    ("joy", Signal::Positivity),
    ("optimism", Signal::Positivity),
    ("love", Signal::Warmth),
    ("gratitude", Signal::Warmth),
    ("caring", Signal::Warmth),
    ("sadness", Signal::Negativity),
    ("fear", Signal::Negativity),
    ("anger", Signal::Negativity),
    ("nervousness", Signal::Negativity),
    ("surprise", Signal::Curiosity),
    ("curiosity", Signal::Curiosity),
    ("excitement", Signal::Sociability),
    ("pride", Signal::Achievement),
    ("admiration", Signal::Warmth),
    ("relief", Signal::Calm),
    // Scene and object labels
    ("seashore", Signal::Calm),
    ("lakeside", Signal::Calm),
    ("valley", Signal::Calm),
    ("alp", Signal::Curiosity),
    ("volcano", Signal::Curiosity),
    ("cliff", Signal::Curiosity),
    ("library", Signal::Curiosity),
    ("book jacket", Signal::Curiosity),
    ("museum", Signal::Curiosity),
    ("desk", Signal::Order),
    ("notebook", Signal::Order),
    ("desktop computer", Signal::Order),
    ("suit", Signal::Achievement),
    ("mortarboard", Signal::Achievement),
    ("academic gown", Signal::Achievement),
    ("restaurant", Signal::Sociability),
    ("beer glass", Signal::Sociability),
    ("stage", Signal::Sociability),
    ("wedding gown", Signal::Warmth),
    ("golden retriever", Signal::Warmth),
    ("labrador retriever", Signal::Warmth),
    ("tabby", Signal::Warmth),
];

/// Model label → signal lookup
#[derive(Debug, Clone)]
pub struct LabelMap {
    labels: HashMap<String, Signal>,
}

impl LabelMap {
    /// Built-in defaults with configured entries layered on top
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ScoringError> {
        let mut labels: HashMap<String, Signal> = DEFAULT_LABELS
            .iter()
            .map(|(label, signal)| (normalize_label(label), *signal))
            .collect();

        for (label, signal_name) in overrides {
            let signal = Signal::from_name(signal_name).ok_or_else(|| {
                ScoringError::Config(format!(
                    "label_map entry '{}' names unknown signal '{}'",
                    label, signal_name
                ))
            })?;
            labels.insert(normalize_label(label), signal);
        }

        Ok(Self { labels })
    }

    /// Resolve a model label
    ///
    /// Labels like `"seashore, coast, seacoast"` are tried synonym by synonym.
    pub fn lookup(&self, label: &str) -> Option<Signal> {
        let whole = normalize_label(label);
        if let Some(signal) = self.labels.get(&whole) {
            return Some(*signal);
        }
        label
            .split(',')
            .map(normalize_label)
            .find_map(|part| self.labels.get(&part).copied())
    }

    /// Fold label scores into a normalized feature vector; unmapped labels are dropped
    pub fn to_vector(&self, predictions: &[LabelScore]) -> FeatureVector {
        let mut vector = FeatureVector::zero();
        for prediction in predictions {
            if !prediction.score.is_finite() || prediction.score <= 0.0 {
                continue;
            }
            if let Some(signal) = self.lookup(&prediction.label) {
                vector.add_to(signal, prediction.score);
            }
        }
        vector.normalized()
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS
                .iter()
                .map(|(label, signal)| (normalize_label(label), *signal))
                .collect(),
        }
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase().replace('_', " ")
}

/// One prediction from a classification endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

/// Parse a classification response body
pub fn parse_predictions(body: &[u8]) -> Result<Vec<LabelScore>, ScoringError> {
    let parsed: ClassificationResponse = serde_json::from_slice(body)
        .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

    match parsed {
        ClassificationResponse::Nested(batches) => Ok(batches.into_iter().flatten().collect()),
        ClassificationResponse::Flat(predictions) => Ok(predictions),
        ClassificationResponse::Error { error } => Err(ScoringError::Model(error)),
    }
}

/// HTTP client for a hosted classifier
pub struct HostedClassifier {
    http_client: Client,
    endpoint: String,
    api_token: Option<String>,
    label_map: LabelMap,
}

impl HostedClassifier {
    pub fn new(
        endpoint: &str,
        api_token: Option<String>,
        label_map: LabelMap,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ScoringError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)))
            .build()
            .map_err(|e| ScoringError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_token,
            label_map,
        })
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    /// POST a JSON payload and map the predictions
    pub async fn classify_json(&self, payload: &serde_json::Value) -> Result<FeatureVector, ScoringError> {
        let request = self.http_client.post(&self.endpoint).json(payload);
        self.send(request).await
    }

    /// POST raw bytes (images) and map the predictions
    pub async fn classify_bytes(&self, bytes: Vec<u8>) -> Result<FeatureVector, ScoringError> {
        let request = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<FeatureVector, ScoringError> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ScoringError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ScoringError::Model(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        let predictions = parse_predictions(&body)?;
        debug!(endpoint = %self.endpoint, predictions = predictions.len(), "Model predictions received");
        Ok(self.label_map.to_vector(&predictions))
    }
}
