//! Caption scoring

use super::hosted::HostedClassifier;
use super::{FeatureScore, FeatureVector, Lexicon, ScoringError};
use async_trait::async_trait;
use persona_common::caption;
use serde_json::json;

/// Maps a caption to a feature vector
///
/// Implementations must be stateless between calls: scoring the same caption
/// twice, or captions in any order, gives the same results.
#[async_trait]
pub trait TextScorer: Send + Sync {
    /// Scorer name for logs
    fn name(&self) -> &'static str;

    /// Score one caption; empty captions are unavailable, not errors
    async fn score_text(&self, caption: &str) -> Result<FeatureScore, ScoringError>;
}

/// Lexicon-based scorer
///
/// Each signal's value is its share of the matched words, so any caption
/// with at least one match produces a vector summing to 1.
pub struct LexiconTextScorer {
    lexicon: Lexicon,
}

impl LexiconTextScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Synchronous core, shared with tests
    pub fn score(&self, text: &str) -> FeatureScore {
        if text.trim().is_empty() {
            return FeatureScore::unavailable();
        }

        let mut vector = FeatureVector::zero();
        for word in caption::words(&caption::clean_text(text)) {
            for signal in self.lexicon.lookup(&word) {
                vector.add_to(*signal, 1.0);
            }
        }

        FeatureScore::available(vector.normalized())
    }
}

impl Default for LexiconTextScorer {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

#[async_trait]
impl TextScorer for LexiconTextScorer {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    async fn score_text(&self, caption: &str) -> Result<FeatureScore, ScoringError> {
        Ok(self.score(caption))
    }
}

/// Hosted text-classification model
pub struct HttpTextScorer {
    classifier: HostedClassifier,
}

impl HttpTextScorer {
    pub fn new(classifier: HostedClassifier) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl TextScorer for HttpTextScorer {
    fn name(&self) -> &'static str {
        "hosted-text"
    }

    async fn score_text(&self, text: &str) -> Result<FeatureScore, ScoringError> {
        let cleaned = caption::clean_text(text);
        if cleaned.is_empty() {
            return Ok(FeatureScore::unavailable());
        }

        let vector = self.classifier.classify_json(&json!({ "inputs": cleaned })).await?;
        Ok(FeatureScore::available(vector))
    }
}
