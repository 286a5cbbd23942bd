//! Analysis pipeline tests with deterministic fakes

mod helpers;

use helpers::fakes::{self, FakeFetcher, FlakyTextScorer, SOCIAL_CAPTIONS};
use persona_analyzer::aggregator::TraitWeights;
use persona_analyzer::scoring::hosted::{HostedClassifier, LabelMap};
use persona_analyzer::scoring::{HttpImageScorer, LexiconTextScorer, ScoringModels};
use persona_analyzer::{AnalysisError, Analyzer};
use persona_common::config::{AnalysisConfig, CacheConfig, ZeroSignalPolicy};
use persona_common::Trait;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_social_profile_scores_extraversion() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(30, &SOCIAL_CAPTIONS)));
    let analyzer = fakes::analyzer(fetcher, &AnalysisConfig::default());

    let result = analyzer.analyze("https://www.instagram.com/alice/", None).await.unwrap();

    assert_eq!(result.username, "alice");
    assert_eq!(result.posts.len(), 30);
    assert_eq!(result.posts_scored, 30);
    assert_eq!(result.dominant_trait, Trait::Extraversion);
    assert!(result.scores.get(Trait::Extraversion) > 0.5);
    for (_, score) in result.scores.iter() {
        assert!((0.0..=1.0).contains(&score));
    }
    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    // 50 likes + 2 * 5 comments per post over 1000 followers
    assert!((result.engagement_rate - 0.06).abs() < 1e-9);
}

#[tokio::test]
async fn test_max_posts_samples_most_recent() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(100, &SOCIAL_CAPTIONS)));
    let analyzer = fakes::analyzer(fetcher, &AnalysisConfig::default());

    let result = analyzer.analyze("alice", Some(5)).await.unwrap();

    assert_eq!(result.posts.len(), 5);
    let ids: Vec<&str> = result.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["post000", "post001", "post002", "post003", "post004"]);
}

#[tokio::test]
async fn test_concurrent_identical_requests_fetch_once() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_profile("alice", fakes::posts(30, &SOCIAL_CAPTIONS))
            .with_delay(Duration::from_millis(100)),
    );
    let analyzer = Arc::new(fakes::analyzer(Arc::clone(&fetcher), &AnalysisConfig::default()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let analyzer = Arc::clone(&analyzer);
        handles.push(tokio::spawn(async move { analyzer.analyze("alice", Some(10)).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(fetcher.calls(), 1);
    for r in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], r));
    }
}

#[tokio::test]
async fn test_cache_keyed_by_post_count() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(30, &SOCIAL_CAPTIONS)));
    let analyzer = fakes::analyzer(Arc::clone(&fetcher), &AnalysisConfig::default());

    analyzer.analyze("alice", Some(10)).await.unwrap();
    analyzer.analyze("@alice", Some(10)).await.unwrap();
    assert_eq!(fetcher.calls(), 1);

    analyzer.analyze("alice", Some(20)).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_cache_disabled_fetches_every_time() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(10, &SOCIAL_CAPTIONS)));
    let analyzer = Analyzer::new(
        Arc::clone(&fetcher) as Arc<_>,
        fakes::lexicon_models(),
        TraitWeights::builtin(),
        &AnalysisConfig::default(),
    )
    .with_cache(&CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });

    analyzer.analyze("alice", None).await.unwrap();
    analyzer.analyze("alice", None).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let fetcher = Arc::new(FakeFetcher::new());
    let analyzer = fakes::analyzer(Arc::clone(&fetcher), &AnalysisConfig::default());

    assert!(matches!(analyzer.analyze("ghost", None).await, Err(AnalysisError::NotFound(_))));
    assert!(matches!(analyzer.analyze("ghost", None).await, Err(AnalysisError::NotFound(_))));
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_timeout() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_profile("alice", fakes::posts(5, &SOCIAL_CAPTIONS))
            .with_delay(Duration::from_secs(5)),
    );
    let analyzer = fakes::analyzer(fetcher, &AnalysisConfig::default())
        .with_request_timeout(Duration::from_millis(50));

    let result = analyzer.analyze("alice", None).await;
    assert!(matches!(result, Err(AnalysisError::Timeout(_))));
}

#[tokio::test]
async fn test_empty_posts_excluded_is_insufficient() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("quiet", fakes::posts(30, &[""])));
    let analyzer = fakes::analyzer(fetcher, &AnalysisConfig::default());

    let result = analyzer.analyze("quiet", None).await;
    assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
}

#[tokio::test]
async fn test_empty_posts_neutral_policy() {
    let config = AnalysisConfig {
        zero_signal_policy: ZeroSignalPolicy::Neutral,
        ..AnalysisConfig::default()
    };
    let fetcher = Arc::new(FakeFetcher::new().with_profile("quiet", fakes::posts(30, &[""])));
    let analyzer = fakes::analyzer(fetcher, &config);

    let result = analyzer.analyze("quiet", None).await.unwrap();
    for (_, score) in result.scores.iter() {
        assert_eq!(score, 0.5);
    }
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.posts_scored, 30);
}

#[tokio::test]
async fn test_profile_without_posts_is_insufficient() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("new", Vec::new()));
    let analyzer = fakes::analyzer(fetcher, &AnalysisConfig::default());

    assert!(matches!(
        analyzer.analyze("new", None).await,
        Err(AnalysisError::InsufficientData(_))
    ));
}

#[tokio::test]
async fn test_unreachable_image_still_scored_from_text() {
    let posts: Vec<_> = fakes::posts(6, &SOCIAL_CAPTIONS)
        .into_iter()
        .map(fakes::with_unreachable_image)
        .collect();
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", posts));

    let classifier =
        HostedClassifier::new("http://127.0.0.1:9/classify", None, LabelMap::default(), Some(2)).unwrap();
    let models = ScoringModels::new(
        Arc::new(LexiconTextScorer::default()),
        Arc::new(HttpImageScorer::new(classifier).unwrap()),
    );
    let analyzer = Analyzer::new(fetcher, models, TraitWeights::builtin(), &AnalysisConfig::default());

    let result = analyzer.analyze("alice", None).await.unwrap();
    assert_eq!(result.posts_scored, 6);
    assert_eq!(result.dominant_trait, Trait::Extraversion);
}

#[tokio::test]
async fn test_failing_posts_are_excluded() {
    let captions = ["Party with friends tonight", "ERR corrupted", "Dancing with everyone"];
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(9, &captions)));
    let models = ScoringModels::new(
        Arc::new(FlakyTextScorer::failing_on("ERR")),
        Arc::new(persona_analyzer::scoring::DisabledImageScorer),
    );
    let analyzer = Analyzer::new(fetcher, models, TraitWeights::builtin(), &AnalysisConfig::default());

    let result = analyzer.analyze("alice", None).await.unwrap();
    assert_eq!(result.posts.len(), 9);
    assert_eq!(result.posts_scored, 6);
}

#[tokio::test]
async fn test_every_post_failing_is_internal_scoring() {
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(4, &["ERR"])));
    let models = ScoringModels::new(
        Arc::new(FlakyTextScorer::failing_on("ERR")),
        Arc::new(persona_analyzer::scoring::DisabledImageScorer),
    );
    let analyzer = Analyzer::new(fetcher, models, TraitWeights::builtin(), &AnalysisConfig::default());

    assert!(matches!(
        analyzer.analyze("alice", None).await,
        Err(AnalysisError::InternalScoring(_))
    ));
}

#[tokio::test]
async fn test_custom_weights_change_outcome() {
    let mut table = std::collections::BTreeMap::new();
    let mut row = std::collections::BTreeMap::new();
    row.insert("sociability".to_string(), 1.0);
    table.insert("Neuroticism".to_string(), row);
    let weights = TraitWeights::from_table(&table).unwrap();

    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", fakes::posts(10, &SOCIAL_CAPTIONS)));
    let analyzer = Analyzer::new(fetcher, fakes::lexicon_models(), weights, &AnalysisConfig::default());

    let result = analyzer.analyze("alice", None).await.unwrap();
    assert!(result.scores.get(Trait::Neuroticism) > 0.5);
}

#[tokio::test]
async fn test_comments_scored_without_caption() {
    let posts: Vec<_> = fakes::posts(10, &[""])
        .into_iter()
        .map(|mut post| {
            post.comments = vec!["Party with friends tonight, so much fun!".to_string()];
            post
        })
        .collect();
    let fetcher = Arc::new(FakeFetcher::new().with_profile("alice", posts));
    let analyzer = fakes::analyzer(fetcher, &AnalysisConfig::default());

    let result = analyzer.analyze("alice", None).await.unwrap();
    assert_eq!(result.posts_scored, 10);
    assert_eq!(result.dominant_trait, Trait::Extraversion);
}
