//! Deterministic stand-ins for the fetcher and the scorers

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use persona_analyzer::aggregator::TraitWeights;
use persona_analyzer::fetcher::{FetchError, FetchedProfile, ProfileFetcher};
use persona_analyzer::scoring::{
    DisabledImageScorer, FeatureScore, LexiconTextScorer, ScoringError, ScoringModels, TextScorer,
};
use persona_analyzer::Analyzer;
use persona_common::config::{AnalysisConfig, CacheConfig};
use persona_common::{ImageRef, Post, Profile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SOCIAL_CAPTIONS: [&str; 4] = [
    "Party with friends tonight, so much fun!",
    "Birthday celebration with the whole squad #friends",
    "Festival weekend, dancing with everyone",
    "Great night out with the team",
];

fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn profile(handle: &str, followers: u64) -> Profile {
    Profile {
        username: handle.to_string(),
        full_name: format!("{} Test", handle),
        biography: "Just a test account".to_string(),
        profile_pic_url: None,
        followers,
        following: 10,
        posts_count: 0,
        is_private: false,
        is_verified: false,
    }
}

/// `count` posts cycling through `captions`, newest first, one hour apart
pub fn posts(count: usize, captions: &[&str]) -> Vec<Post> {
    (0..count)
        .map(|i| {
            let caption = captions.get(i % captions.len().max(1)).copied().unwrap_or("");
            let mut post = Post::from_caption(
                format!("post{:03}", i),
                caption,
                base_date() - ChronoDuration::hours(i as i64),
            );
            post.likes = 50;
            post.comments_count = 5;
            post
        })
        .collect()
}

pub fn fetched(handle: &str, posts: Vec<Post>) -> FetchedProfile {
    let mut profile = profile(handle, 1000);
    profile.posts_count = posts.len() as u64;
    FetchedProfile { profile, posts }
}

/// In-memory fetcher counting calls
pub struct FakeFetcher {
    profiles: HashMap<String, FetchedProfile>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(mut self, handle: &str, posts: Vec<Post>) -> Self {
        self.profiles.insert(handle.to_string(), fetched(handle, posts));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileFetcher for FakeFetcher {
    async fn fetch(&self, handle: &str, max_posts: usize) -> Result<FetchedProfile, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut found = self
            .profiles
            .get(handle)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(handle.to_string()))?;
        found.posts.truncate(max_posts);
        Ok(found)
    }
}

/// Fails on captions containing `marker`, otherwise delegates to the lexicon
pub struct FlakyTextScorer {
    marker: &'static str,
    inner: LexiconTextScorer,
}

impl FlakyTextScorer {
    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            marker,
            inner: LexiconTextScorer::default(),
        }
    }
}

#[async_trait]
impl TextScorer for FlakyTextScorer {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn score_text(&self, caption: &str) -> Result<FeatureScore, ScoringError> {
        if caption.contains(self.marker) {
            return Err(ScoringError::Model("model crashed".to_string()));
        }
        self.inner.score_text(caption).await
    }
}

pub fn lexicon_models() -> ScoringModels {
    ScoringModels::new(Arc::new(LexiconTextScorer::default()), Arc::new(DisabledImageScorer))
}

/// Analyzer over `fetcher` with lexicon scoring and the result cache on
pub fn analyzer(fetcher: Arc<FakeFetcher>, config: &AnalysisConfig) -> Analyzer {
    Analyzer::new(fetcher, lexicon_models(), TraitWeights::builtin(), config)
        .with_cache(&CacheConfig::default())
}

pub fn with_unreachable_image(mut post: Post) -> Post {
    post.image_path = Some(ImageRef::Remote {
        url: "http://127.0.0.1:9/unreachable.jpg".to_string(),
    });
    post
}
