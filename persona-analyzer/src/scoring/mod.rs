//! Text and image scoring
//!
//! Both scorers map their input into the same fixed feature space: one slot
//! per [`Signal`]. The trait-weight table in the aggregator turns these
//! vectors into Big Five contributions.
//!
//! Model handles are built once at startup ([`ScoringModels::load`]) and
//! passed into the analyzer explicitly.

pub mod hosted;
pub mod image;
pub mod lexicon;
pub mod text;

pub use image::{DisabledImageScorer, HttpImageScorer, ImageScorer};
pub use lexicon::Lexicon;
pub use text::{HttpTextScorer, LexiconTextScorer, TextScorer};

use persona_common::config::ModelsConfig;
use serde::Serialize;
use std::fmt;
use std::ops::{Add, Mul};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Scoring errors for a single input
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Model configuration error: {0}")]
    Config(String),
}

/// Feature dimensions shared by text and image scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Curiosity,
    Order,
    Achievement,
    Sociability,
    Warmth,
    Positivity,
    Negativity,
    Calm,
}

impl Signal {
    pub const COUNT: usize = 8;

    pub const ALL: [Signal; Signal::COUNT] = [
        Signal::Curiosity,
        Signal::Order,
        Signal::Achievement,
        Signal::Sociability,
        Signal::Warmth,
        Signal::Positivity,
        Signal::Negativity,
        Signal::Calm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Curiosity => "curiosity",
            Signal::Order => "order",
            Signal::Achievement => "achievement",
            Signal::Sociability => "sociability",
            Signal::Warmth => "warmth",
            Signal::Positivity => "positivity",
            Signal::Negativity => "negativity",
            Signal::Calm => "calm",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_name(name: &str) -> Option<Signal> {
        Signal::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size vector over [`Signal`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FeatureVector(pub [f64; Signal::COUNT]);

impl FeatureVector {
    pub fn zero() -> Self {
        Self([0.0; Signal::COUNT])
    }

    pub fn get(&self, signal: Signal) -> f64 {
        self.0[signal.index()]
    }

    pub fn add_to(&mut self, signal: Signal, amount: f64) {
        self.0[signal.index()] += amount;
    }

    /// True when no slot carries signal
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| v.abs() < 1e-12)
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Rescale so the slots sum to 1; the zero vector stays zero
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return Self::zero();
        }
        *self * (1.0 / total)
    }
}

impl Add for FeatureVector {
    type Output = FeatureVector;

    fn add(self, rhs: FeatureVector) -> FeatureVector {
        let mut out = self.0;
        for (slot, v) in out.iter_mut().zip(rhs.0) {
            *slot += v;
        }
        FeatureVector(out)
    }
}

impl Mul<f64> for FeatureVector {
    type Output = FeatureVector;

    fn mul(self, rhs: f64) -> FeatureVector {
        FeatureVector(self.0.map(|v| v * rhs))
    }
}

/// Scorer output for one caption or image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureScore {
    pub vector: FeatureVector,
    /// False for empty captions and missing or unreachable images
    pub available: bool,
}

impl FeatureScore {
    pub fn available(vector: FeatureVector) -> Self {
        Self { vector, available: true }
    }

    pub fn unavailable() -> Self {
        Self {
            vector: FeatureVector::zero(),
            available: false,
        }
    }
}

/// Model handles shared by every request
#[derive(Clone)]
pub struct ScoringModels {
    pub text: Arc<dyn TextScorer>,
    pub image: Arc<dyn ImageScorer>,
}

impl ScoringModels {
    pub fn new(text: Arc<dyn TextScorer>, image: Arc<dyn ImageScorer>) -> Self {
        Self { text, image }
    }

    /// Build scorers from configuration; called once at startup
    ///
    /// Hosted endpoints take precedence. Without a text endpoint the lexicon
    /// scorer is used; without an image endpoint images are not scored.
    pub fn load(config: &ModelsConfig) -> Result<Self, ScoringError> {
        let label_map = hosted::LabelMap::with_overrides(&config.label_map)?;

        let text: Arc<dyn TextScorer> = match &config.text_endpoint {
            Some(endpoint) => {
                info!(endpoint = %endpoint, "Text scoring via hosted model");
                Arc::new(HttpTextScorer::new(hosted::HostedClassifier::new(
                    endpoint,
                    config.api_token.clone(),
                    label_map.clone(),
                    config.timeout_secs,
                )?))
            }
            None => {
                let lexicon = match &config.lexicon_path {
                    Some(path) => {
                        info!(path = %path.display(), "Loading lexicon");
                        Lexicon::from_file(path)?
                    }
                    None => Lexicon::builtin(),
                };
                info!(words = lexicon.len(), "Text scoring via lexicon");
                Arc::new(LexiconTextScorer::new(lexicon))
            }
        };

        let image: Arc<dyn ImageScorer> = match &config.image_endpoint {
            Some(endpoint) => {
                info!(endpoint = %endpoint, "Image scoring via hosted model");
                Arc::new(HttpImageScorer::new(hosted::HostedClassifier::new(
                    endpoint,
                    config.api_token.clone(),
                    label_map,
                    config.timeout_secs,
                )?)?)
            }
            None => {
                info!("No image endpoint configured; posts are scored from captions only");
                Arc::new(DisabledImageScorer)
            }
        };

        Ok(Self { text, image })
    }
}
