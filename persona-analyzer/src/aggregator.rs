//! Trait aggregation
//!
//! Combines each post's text and image feature vectors, projects the result
//! onto the Big Five through a [`TraitWeights`] table, and averages the
//! per-post contributions into [`TraitScores`].
//!
//! ## Built-in weights
//!
//! | Trait | Strongest positive signals | Negative signals |
//! |-------|---------------------------|------------------|
//! | Openness | curiosity | order |
//! | Conscientiousness | order, achievement | negativity, curiosity |
//! | Extraversion | sociability, positivity | calm, order, negativity |
//! | Agreeableness | warmth, positivity | negativity |
//! | Neuroticism | negativity | calm, positivity, order |
//!
//! Rows can be replaced from the `[trait_weights]` config table.

use crate::error::AnalysisError;
use crate::scoring::{FeatureScore, FeatureVector, Signal};
use persona_common::config::{AnalysisConfig, ZeroSignalPolicy};
use persona_common::{Trait, TraitScores};
use std::collections::BTreeMap;

/// Variance of a [0,1] variable cannot exceed this
const MAX_VARIANCE: f64 = 0.25;

/// 5×8 projection from feature space onto the Big Five
#[derive(Debug, Clone, PartialEq)]
pub struct TraitWeights {
    rows: [[f64; Signal::COUNT]; 5],
}

impl TraitWeights {
    /// Built-in weights, rows in canonical trait order, columns in signal order
    pub fn builtin() -> Self {
        Self {
            rows: [
                // curiosity, order, achievement, sociability, warmth, positivity, negativity, calm
                [0.8, -0.3, 0.1, 0.1, 0.0, 0.2, 0.0, 0.1],
                [-0.1, 0.8, 0.6, -0.1, 0.0, 0.1, -0.2, 0.2],
                [0.2, -0.2, 0.2, 0.8, 0.3, 0.5, -0.2, -0.4],
                [0.0, 0.1, -0.1, 0.3, 0.8, 0.4, -0.4, 0.3],
                [0.0, -0.2, 0.0, -0.2, -0.1, -0.4, 0.9, -0.5],
            ],
        }
    }

    /// Built-in weights with rows replaced from a `trait -> signal -> weight` table
    ///
    /// A trait named in the table gets exactly the listed weights; signals it
    /// omits weigh 0.
    pub fn from_table(table: &BTreeMap<String, BTreeMap<String, f64>>) -> Result<Self, AnalysisError> {
        let mut weights = Self::builtin();

        for (trait_name, row) in table {
            let t = Trait::from_name(trait_name).ok_or_else(|| {
                AnalysisError::Config(format!("Unknown trait in trait_weights: '{}'", trait_name))
            })?;

            let mut values = [0.0; Signal::COUNT];
            for (signal_name, &weight) in row {
                let signal = Signal::from_name(signal_name).ok_or_else(|| {
                    AnalysisError::Config(format!(
                        "Unknown signal '{}' in trait_weights.{}",
                        signal_name, trait_name
                    ))
                })?;
                if !weight.is_finite() || !(-1.0..=1.0).contains(&weight) {
                    return Err(AnalysisError::Config(format!(
                        "trait_weights.{}.{} = {} is outside [-1, 1]",
                        trait_name, signal_name, weight
                    )));
                }
                values[signal.index()] = weight;
            }
            weights.rows[t.index()] = values;
        }

        Ok(weights)
    }

    pub fn weight(&self, t: Trait, signal: Signal) -> f64 {
        self.rows[t.index()][signal.index()]
    }

    /// Per-trait contribution `W·f`, each clamped to [-1, 1]
    pub fn contribution(&self, features: &FeatureVector) -> [f64; 5] {
        let mut out = [0.0; 5];
        for (slot, row) in out.iter_mut().zip(&self.rows) {
            let dot: f64 = row.iter().zip(features.0).map(|(w, f)| w * f).sum();
            *slot = dot.clamp(-1.0, 1.0);
        }
        out
    }
}

impl Default for TraitWeights {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Text and image scores of one post
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostFeatures {
    pub text: FeatureScore,
    pub image: FeatureScore,
}

/// Aggregation knobs, taken from `[analysis]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorSettings {
    pub text_weight: f64,
    pub image_weight: f64,
    pub zero_signal_policy: ZeroSignalPolicy,
    pub full_confidence_posts: usize,
}

impl AggregatorSettings {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            text_weight: config.text_weight,
            image_weight: config.image_weight,
            zero_signal_policy: config.zero_signal_policy,
            full_confidence_posts: config.full_confidence_posts,
        }
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// Aggregated scores for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub scores: TraitScores,
    pub dominant: Trait,
    pub confidence: f64,
    /// Posts included in the average
    pub contributing: usize,
    /// Posts whose combined vector carried any signal
    pub with_signal: usize,
}

/// Weighted combination of a post's text and image vectors
///
/// When only one side is available it takes the full weight. When neither
/// is, the result is the zero vector.
pub fn combine(post: &PostFeatures, settings: &AggregatorSettings) -> FeatureVector {
    match (post.text.available, post.image.available) {
        (true, true) => {
            post.text.vector * settings.text_weight + post.image.vector * settings.image_weight
        }
        (true, false) => post.text.vector,
        (false, true) => post.image.vector,
        (false, false) => FeatureVector::zero(),
    }
}

fn to_unit(contribution: f64) -> f64 {
    (0.5 + 0.5 * contribution).clamp(0.0, 1.0)
}

/// Aggregate scored posts into trait scores and a confidence
pub fn aggregate(
    posts: &[PostFeatures],
    weights: &TraitWeights,
    settings: &AggregatorSettings,
) -> Result<Aggregate, AnalysisError> {
    if posts.is_empty() {
        return Err(AnalysisError::InsufficientData("no posts could be scored".to_string()));
    }

    let mut contributions: Vec<[f64; 5]> = Vec::with_capacity(posts.len());
    let mut with_signal = 0;

    for post in posts {
        let combined = combine(post, settings);
        let has_signal = !combined.is_zero();
        if has_signal {
            with_signal += 1;
        }

        match (has_signal, settings.zero_signal_policy) {
            (true, _) => contributions.push(weights.contribution(&combined)),
            (false, ZeroSignalPolicy::Neutral) => contributions.push([0.0; 5]),
            (false, ZeroSignalPolicy::Exclude) => {}
        }
    }

    if contributions.is_empty() {
        return Err(AnalysisError::InsufficientData(format!(
            "none of the {} posts carried any text or image signal",
            posts.len()
        )));
    }

    let n = contributions.len() as f64;
    let mut mean = [0.0; 5];
    for c in &contributions {
        for (m, v) in mean.iter_mut().zip(c) {
            *m += v / n;
        }
    }

    let scores = TraitScores::new(mean.map(to_unit));
    let dominant = scores.dominant();

    // Agreement: how consistently posts back the dominant trait
    let per_post: Vec<f64> = contributions.iter().map(|c| to_unit(c[dominant.index()])).collect();
    let avg = per_post.iter().sum::<f64>() / n;
    let variance = per_post.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;
    let agreement = (1.0 - variance / MAX_VARIANCE).clamp(0.0, 1.0);

    let coverage = with_signal as f64 / posts.len() as f64;
    let sample = if settings.full_confidence_posts == 0 {
        1.0
    } else {
        (n / settings.full_confidence_posts as f64).min(1.0)
    };

    let confidence = (agreement * coverage * sample).clamp(0.0, 1.0);

    Ok(Aggregate {
        scores,
        dominant,
        confidence,
        contributing: contributions.len(),
        with_signal,
    })
}
