// Upstream JSON shapes for the web profile and timeline endpoints.
// Every field is defaulted: the upstream omits keys freely.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
    #[serde(default)]
    pub data: Option<ProfileData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileData {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct User {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub profile_pic_url: Option<String>,
    pub profile_pic_url_hd: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
    pub edge_followed_by: Count,
    pub edge_follow: Count,
    pub edge_owner_to_timeline_media: Timeline,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Count {
    pub count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Timeline {
    pub count: u64,
    pub page_info: PageInfo,
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaEdge {
    pub node: MediaNode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MediaNode {
    pub id: String,
    pub shortcode: String,
    pub display_url: Option<String>,
    pub is_video: bool,
    pub taken_at_timestamp: i64,
    pub edge_media_to_caption: TextEdges,
    pub edge_liked_by: Option<Count>,
    pub edge_media_preview_like: Option<Count>,
    pub edge_media_to_comment: Count,
    pub edge_media_preview_comment: Option<TextEdges>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TextEdges {
    pub edges: Vec<TextEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextEdge {
    pub node: TextNode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TextNode {
    pub text: String,
}

/// Paginated timeline response
#[derive(Debug, Deserialize)]
pub(crate) struct TimelineResponse {
    #[serde(default)]
    pub data: Option<TimelineData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelineData {
    #[serde(default)]
    pub user: Option<TimelineUser>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TimelineUser {
    pub edge_owner_to_timeline_media: Timeline,
}

/// Error body the upstream sends alongside 401/429 throttling
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FailureBody {
    pub message: String,
    pub status: String,
}

impl MediaNode {
    pub fn caption(&self) -> String {
        self.edge_media_to_caption
            .edges
            .first()
            .map(|e| e.node.text.clone())
            .unwrap_or_default()
    }

    pub fn likes(&self) -> u64 {
        self.edge_liked_by
            .as_ref()
            .or(self.edge_media_preview_like.as_ref())
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn preview_comments(&self, limit: usize) -> Vec<String> {
        self.edge_media_preview_comment
            .as_ref()
            .map(|edges| {
                edges
                    .edges
                    .iter()
                    .map(|e| e.node.text.clone())
                    .filter(|t| !t.is_empty())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }
}
