//! Instagram web client
//!
//! Reads the public web profile endpoint for the profile and its first page
//! of posts, then follows the timeline cursor until enough posts are
//! collected. All API calls share one token-bucket rate limiter.
//!
//! Post images are downloaded to `<download_dir>/<handle>/<shortcode>.jpg`
//! so the HTTP layer can serve them; a failed download leaves the post
//! without an image rather than failing the fetch.

use super::wire::{FailureBody, MediaNode, ProfileResponse, TimelineResponse, User};
use super::{FetchError, FetchedProfile, ProfileFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use governor::{Quota, RateLimiter};
use persona_common::caption::{extract_hashtags, extract_mentions};
use persona_common::config::FetcherConfig;
use persona_common::{ImageRef, Post, Profile};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const WEB_APP_ID: &str = "936619743392459";
const TIMELINE_QUERY_HASH: &str = "003056d32c2554def87228bc3fd9668a";
const PAGE_SIZE: usize = 12;
const PREVIEW_COMMENTS: usize = 5;
const IMAGE_DOWNLOAD_CONCURRENCY: usize = 4;
/// Suffix of in-progress downloads
pub(crate) const PARTIAL_SUFFIX: &str = ".part";

type DirectLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Rate-limited client for the Instagram web API
pub struct InstagramClient {
    http_client: Client,
    base_url: String,
    session_id: Option<String>,
    download_images: bool,
    download_dir: PathBuf,
    rate_limiter: DirectLimiter,
}

impl InstagramClient {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_id: config.session_id.clone().filter(|s| !s.trim().is_empty()),
            download_images: config.download_images,
            download_dir: config.download_dir.clone(),
            rate_limiter,
        })
    }

    /// Directory images for `handle` are written to
    pub fn image_dir(&self, handle: &str) -> PathBuf {
        self.download_dir.join(handle)
    }

    /// GET an API URL through the rate limiter and check the status
    async fn api_get(&self, handle: &str, url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        self.rate_limiter.until_ready().await;

        debug!(handle = %handle, url = %url, "Querying upstream");

        let mut request = self
            .http_client
            .get(url)
            .query(query)
            .header("x-ig-app-id", WEB_APP_ID)
            .header("Accept", "application/json");
        if let Some(session) = &self.session_id {
            request = request.header("Cookie", format!("sessionid={}", session));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(handle, status, &body));
        }
        Ok(body.to_vec())
    }

    async fn fetch_user(&self, handle: &str) -> Result<User, FetchError> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.base_url);
        let body = self.api_get(handle, &url, &[("username", handle)]).await?;

        let parsed: ProfileResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        parsed
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| FetchError::NotFound(handle.to_string()))
    }

    /// One timeline page after `cursor`; returns the nodes and the next cursor
    async fn fetch_page(
        &self,
        handle: &str,
        user_id: &str,
        cursor: &str,
    ) -> Result<(Vec<MediaNode>, Option<String>), FetchError> {
        let url = format!("{}/graphql/query/", self.base_url);
        let variables = json!({ "id": user_id, "first": PAGE_SIZE, "after": cursor }).to_string();
        let body = self
            .api_get(
                handle,
                &url,
                &[("query_hash", TIMELINE_QUERY_HASH), ("variables", &variables)],
            )
            .await?;

        let parsed: TimelineResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let timeline = parsed
            .data
            .and_then(|d| d.user)
            .map(|u| u.edge_owner_to_timeline_media)
            .unwrap_or_default();

        let next = next_cursor(timeline.page_info.has_next_page, timeline.page_info.end_cursor);
        Ok((timeline.edges.into_iter().map(|e| e.node).collect(), next))
    }

    async fn resolve_image(&self, handle: &str, node: &MediaNode) -> Option<ImageRef> {
        if node.is_video {
            return None;
        }
        let url = node.display_url.as_deref().filter(|u| !u.is_empty())?;

        if !self.download_images {
            return Some(ImageRef::Remote { url: url.to_string() });
        }

        let id = post_id(node);
        if !is_safe_file_stem(id) {
            warn!(handle = %handle, post = %id, "Refusing to store image under an unsafe name");
            return None;
        }

        let file_name = format!("{}.jpg", id);
        let path = self.image_dir(handle).join(&file_name);
        match self.download_image(url, &path).await {
            Ok(()) => Some(ImageRef::Local {
                path,
                served_as: format!("{}/{}", handle, file_name),
            }),
            Err(e) => {
                warn!(handle = %handle, post = %post_id(node), error = %e, "Image download failed");
                None
            }
        }
    }

    async fn download_image(&self, url: &str, path: &Path) -> Result<(), FetchError> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!(path = %path.display(), "Image already downloaded");
            return Ok(());
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream(status.as_u16(), format!("image {}", url)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(FetchError::Parse(format!("empty image body from {}", url)));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::Config(format!("Create {} failed: {}", parent.display(), e)))?;
        }

        // Write aside and rename so an interrupted write never looks complete
        let partial = partial_path(path);
        if let Err(e) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(FetchError::Config(format!("Write {} failed: {}", partial.display(), e)));
        }
        if let Err(e) = tokio::fs::rename(&partial, path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(FetchError::Config(format!("Rename to {} failed: {}", path.display(), e)));
        }

        Ok(())
    }
}

#[async_trait]
impl ProfileFetcher for InstagramClient {
    async fn fetch(&self, handle: &str, max_posts: usize) -> Result<FetchedProfile, FetchError> {
        let user = self.fetch_user(handle).await?;
        let profile = build_profile(handle, &user);

        if profile.is_private && self.session_id.is_none() {
            return Err(FetchError::PrivateProfile(handle.to_string()));
        }

        let timeline = user.edge_owner_to_timeline_media;
        let mut cursor = next_cursor(timeline.page_info.has_next_page, timeline.page_info.end_cursor);
        let mut nodes: Vec<MediaNode> = timeline.edges.into_iter().map(|e| e.node).collect();

        while nodes.len() < max_posts {
            let Some(after) = cursor.take() else { break };
            let (page, next) = self.fetch_page(handle, &user.id, &after).await?;
            if page.is_empty() {
                break;
            }
            debug!(handle = %handle, page_len = page.len(), "Fetched timeline page");
            nodes.extend(page);
            cursor = next;
        }

        nodes.sort_by(|a, b| b.taken_at_timestamp.cmp(&a.taken_at_timestamp));
        nodes.truncate(max_posts);

        let images: Vec<Option<ImageRef>> = stream::iter(0..nodes.len())
            .map(|i| self.resolve_image(handle, &nodes[i]))
            .buffered(IMAGE_DOWNLOAD_CONCURRENCY)
            .collect()
            .await;

        let posts: Vec<Post> = nodes
            .iter()
            .zip(images)
            .map(|(node, image)| build_post(&self.base_url, node, image))
            .collect();

        info!(
            handle = %handle,
            followers = profile.followers,
            posts = posts.len(),
            with_images = posts.iter().filter(|p| p.image_path.is_some()).count(),
            "Fetched profile"
        );

        Ok(FetchedProfile { profile, posts })
    }
}

/// Map a non-success API status to a fetch error
fn classify_failure(handle: &str, status: StatusCode, body: &[u8]) -> FetchError {
    let text = String::from_utf8_lossy(body);
    let failure: FailureBody = serde_json::from_slice(body).unwrap_or_default();
    let throttled = text.to_ascii_lowercase().contains("wait a few minutes")
        || failure.message.to_ascii_lowercase().contains("please wait");

    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound(handle.to_string()),
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if throttled => FetchError::RateLimited,
        _ => {
            let mut detail: String = text.chars().take(200).collect();
            if detail.is_empty() {
                detail = status.canonical_reason().unwrap_or("no body").to_string();
            }
            FetchError::Upstream(status.as_u16(), detail)
        }
    }
}

fn next_cursor(has_next_page: bool, end_cursor: Option<String>) -> Option<String> {
    end_cursor.filter(|c| has_next_page && !c.is_empty())
}

fn post_id(node: &MediaNode) -> &str {
    if node.shortcode.is_empty() {
        &node.id
    } else {
        &node.shortcode
    }
}

/// Shortcodes become file names: letters, digits, `_` and `-` only
fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Unique sibling of `path` used while a download is in progress
fn partial_path(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("image");
    path.with_file_name(format!(".{}.{}{}", name, Uuid::new_v4().simple(), PARTIAL_SUFFIX))
}

fn build_profile(handle: &str, user: &User) -> Profile {
    let username = if user.username.is_empty() {
        handle.to_string()
    } else {
        user.username.clone()
    };

    Profile {
        username,
        full_name: user.full_name.clone().unwrap_or_default(),
        biography: user.biography.clone().unwrap_or_default(),
        profile_pic_url: user
            .profile_pic_url_hd
            .clone()
            .or_else(|| user.profile_pic_url.clone()),
        followers: user.edge_followed_by.count,
        following: user.edge_follow.count,
        posts_count: user.edge_owner_to_timeline_media.count,
        is_private: user.is_private,
        is_verified: user.is_verified,
    }
}

fn build_post(base_url: &str, node: &MediaNode, image: Option<ImageRef>) -> Post {
    let caption = node.caption();
    let id = post_id(node).to_string();

    Post {
        url: format!("{}/p/{}/", base_url, id),
        hashtags: extract_hashtags(&caption),
        mentions: extract_mentions(&caption),
        likes: node.likes(),
        comments_count: node.edge_media_to_comment.count,
        date: DateTime::<Utc>::from_timestamp(node.taken_at_timestamp, 0).unwrap_or_default(),
        image_path: image,
        is_video: node.is_video,
        comments: node.preview_comments(PREVIEW_COMMENTS),
        caption,
        id,
    }
}
