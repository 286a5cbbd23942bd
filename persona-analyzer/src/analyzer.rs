//! Analysis pipeline
//!
//! `analyze` runs validate → cache lookup → fetch → score → aggregate →
//! render under one overall timeout. Identical concurrent requests share a
//! single computation through the result cache.

use crate::aggregator::{aggregate, AggregatorSettings, PostFeatures, TraitWeights};
use crate::cache::TtlCache;
use crate::error::AnalysisError;
use crate::fetcher::ProfileFetcher;
use crate::scoring::{ScoringError, ScoringModels};
use crate::visualizer::{render_radar_chart, Chart};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use persona_common::config::{AnalysisConfig, CacheConfig, ServiceConfig};
use persona_common::handle::parse_handle;
use persona_common::models::engagement_rate;
use persona_common::{Post, Profile, Trait, TraitScores};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one profile analysis
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub username: String,
    pub profile: Profile,
    /// Sampled posts, newest first
    pub posts: Vec<Post>,
    pub scores: TraitScores,
    pub dominant_trait: Trait,
    pub confidence: f64,
    /// Posts that contributed to the average
    pub posts_scored: usize,
    pub engagement_rate: f64,
    pub chart: Chart,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Description of each trait at its scored level
    pub fn trait_descriptions(&self) -> BTreeMap<&'static str, &'static str> {
        self.scores
            .iter()
            .map(|(t, score)| (t.name(), t.describe(score)))
            .collect()
    }
}

type ResultCache = TtlCache<(String, usize), AnalysisResult>;

/// Runs analyses against a fetcher and a set of scoring models
pub struct Analyzer {
    fetcher: Arc<dyn ProfileFetcher>,
    models: ScoringModels,
    weights: TraitWeights,
    settings: AggregatorSettings,
    default_max_posts: usize,
    max_posts_limit: usize,
    scoring_concurrency: usize,
    sample_size: usize,
    request_timeout: Duration,
    cache: Option<ResultCache>,
}

impl Analyzer {
    /// Analyzer without a result cache
    pub fn new(
        fetcher: Arc<dyn ProfileFetcher>,
        models: ScoringModels,
        weights: TraitWeights,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            fetcher,
            models,
            weights,
            settings: AggregatorSettings::from_config(config),
            default_max_posts: config.default_max_posts.max(1),
            max_posts_limit: config.max_posts_limit.max(1),
            scoring_concurrency: config.scoring_concurrency.max(1),
            sample_size: config.sample_size,
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            cache: None,
        }
    }

    /// Analyzer wired from the full service configuration
    pub fn from_config(
        config: &ServiceConfig,
        fetcher: Arc<dyn ProfileFetcher>,
        models: ScoringModels,
    ) -> Result<Self, AnalysisError> {
        let weights = TraitWeights::from_table(&config.trait_weights)?;
        Ok(Self::new(fetcher, models, weights, &config.analysis).with_cache(&config.cache))
    }

    /// Enable the result cache when `config.enabled`
    pub fn with_cache(mut self, config: &CacheConfig) -> Self {
        self.cache = config
            .enabled
            .then(|| TtlCache::new(Duration::from_secs(config.ttl_secs), config.max_entries));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Number of posts echoed back in responses
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Apply the default and the upper bound to a requested post count
    pub fn resolve_max_posts(&self, requested: Option<usize>) -> Result<usize, AnalysisError> {
        match requested {
            Some(0) => Err(AnalysisError::InvalidInput("max_posts must be at least 1".to_string())),
            Some(n) if n > self.max_posts_limit => {
                debug!(requested = n, limit = self.max_posts_limit, "Clamping max_posts");
                Ok(self.max_posts_limit)
            }
            Some(n) => Ok(n),
            None => Ok(self.default_max_posts.min(self.max_posts_limit)),
        }
    }

    /// Analyze a profile given its handle or URL
    pub async fn analyze(
        &self,
        input: &str,
        max_posts: Option<usize>,
    ) -> Result<Arc<AnalysisResult>, AnalysisError> {
        let handle = parse_handle(input)?;
        let max_posts = self.resolve_max_posts(max_posts)?;

        let work = async {
            match &self.cache {
                Some(cache) => {
                    cache
                        .get_or_try_compute((handle.clone(), max_posts), || self.run(&handle, max_posts))
                        .await
                }
                None => self.run(&handle, max_posts).await.map(Arc::new),
            }
        };

        match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(handle = %handle, timeout_secs = self.request_timeout.as_secs(), "Analysis timed out");
                Err(AnalysisError::Timeout(self.request_timeout))
            }
        }
    }

    async fn run(&self, handle: &str, max_posts: usize) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        info!(handle = %handle, max_posts, "Starting analysis");

        let fetched = self.fetcher.fetch(handle, max_posts).await?;

        let mut posts = fetched.posts;
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        posts.truncate(max_posts);

        if posts.is_empty() {
            return Err(AnalysisError::InsufficientData(format!("{} has no posts", handle)));
        }

        let outcomes: Vec<Result<PostFeatures, ScoringError>> = stream::iter(0..posts.len())
            .map(|i| self.score_post(&posts[i]))
            .buffered(self.scoring_concurrency)
            .collect()
            .await;

        let mut features = Vec::with_capacity(posts.len());
        let mut failures = 0;
        for (post, outcome) in posts.iter().zip(outcomes) {
            match outcome {
                Ok(f) => features.push(f),
                Err(e) => {
                    warn!(handle = %handle, post = %post.id, error = %e, "Post scoring failed, excluding post");
                    failures += 1;
                }
            }
        }

        if features.is_empty() {
            return Err(AnalysisError::InternalScoring(format!(
                "all {} posts failed to score",
                failures
            )));
        }

        let result = aggregate(&features, &self.weights, &self.settings)?;
        let chart = render_radar_chart(&result.scores);
        let engagement = engagement_rate(&posts, fetched.profile.followers);

        info!(
            handle = %handle,
            posts = posts.len(),
            scored = result.contributing,
            failed = failures,
            dominant = %result.dominant,
            confidence = result.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            id: Uuid::new_v4(),
            username: fetched.profile.username.clone(),
            profile: fetched.profile,
            posts,
            scores: result.scores,
            dominant_trait: result.dominant,
            confidence: result.confidence,
            posts_scored: result.contributing,
            engagement_rate: engagement,
            chart,
            analyzed_at: Utc::now(),
        })
    }

    /// Score a post's text (caption plus comments) and image concurrently
    async fn score_post(&self, post: &Post) -> Result<PostFeatures, ScoringError> {
        let text = post.scoring_text();
        let (text, image) = tokio::join!(
            self.models.text.score_text(&text),
            self.models.image.score_image(post.image_path.as_ref()),
        );
        Ok(PostFeatures {
            text: text?,
            image: image?,
        })
    }
}
