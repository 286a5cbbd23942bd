//! Image scoring
//!
//! Missing or unreachable images are reported as unavailable so the post can
//! still be scored from its caption.

use super::hosted::HostedClassifier;
use super::{FeatureScore, ScoringError};
use async_trait::async_trait;
use persona_common::ImageRef;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Maps a post image to a feature vector
#[async_trait]
pub trait ImageScorer: Send + Sync {
    /// Scorer name for logs
    fn name(&self) -> &'static str;

    /// Score one image; `None` and unreachable images are unavailable, not errors
    async fn score_image(&self, image: Option<&ImageRef>) -> Result<FeatureScore, ScoringError>;
}

/// Scorer used when no image model is configured
pub struct DisabledImageScorer;

#[async_trait]
impl ImageScorer for DisabledImageScorer {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn score_image(&self, _image: Option<&ImageRef>) -> Result<FeatureScore, ScoringError> {
        Ok(FeatureScore::unavailable())
    }
}

/// Hosted image-classification model
pub struct HttpImageScorer {
    classifier: HostedClassifier,
    http_client: Client,
}

impl HttpImageScorer {
    pub fn new(classifier: HostedClassifier) -> Result<Self, ScoringError> {
        let http_client = Client::builder()
            .timeout(IMAGE_FETCH_TIMEOUT)
            .build()
            .map_err(|e| ScoringError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            classifier,
            http_client,
        })
    }

    /// Read image bytes; `None` when the image cannot be reached
    async fn load(&self, image: &ImageRef) -> Option<Vec<u8>> {
        match image {
            ImageRef::Local { path, .. } => match tokio::fs::read(path).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Image file unreadable");
                    None
                }
            },
            ImageRef::Remote { url } => {
                let response = match self.http_client.get(url).send().await {
                    Ok(response) if response.status().is_success() => response,
                    Ok(response) => {
                        debug!(url = %url, status = %response.status(), "Image fetch failed");
                        return None;
                    }
                    Err(e) => {
                        debug!(url = %url, error = %e, "Image fetch failed");
                        return None;
                    }
                };
                response.bytes().await.ok().map(|b| b.to_vec())
            }
        }
    }
}

#[async_trait]
impl ImageScorer for HttpImageScorer {
    fn name(&self) -> &'static str {
        "hosted-image"
    }

    async fn score_image(&self, image: Option<&ImageRef>) -> Result<FeatureScore, ScoringError> {
        let Some(image) = image else {
            return Ok(FeatureScore::unavailable());
        };

        let bytes = match self.load(image).await {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(FeatureScore::unavailable()),
        };

        let vector = self.classifier.classify_bytes(bytes).await?;
        Ok(FeatureScore::available(vector))
    }
}
