//! Profile fetching
//!
//! The upstream source is an external collaborator behind [`ProfileFetcher`],
//! so tests can substitute deterministic fakes.

pub mod instagram;
pub mod retention;
mod wire;

pub use instagram::InstagramClient;
pub use retention::{spawn_download_sweeper, sweep_downloads, SweepStats};

use async_trait::async_trait;
use persona_common::{Post, Profile};
use thiserror::Error;

/// Profile fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile {0} is private")]
    PrivateProfile(String),

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error {0}: {1}")]
    Upstream(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Fetcher configuration error: {0}")]
    Config(String),
}

/// Profile snapshot with its most recent posts, newest first
#[derive(Debug, Clone)]
pub struct FetchedProfile {
    pub profile: Profile,
    pub posts: Vec<Post>,
}

/// Source of profiles and posts
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch the profile and up to `max_posts` most recent posts
    ///
    /// Posts whose image could not be retrieved are returned without one.
    async fn fetch(&self, handle: &str, max_posts: usize) -> Result<FetchedProfile, FetchError>;
}
