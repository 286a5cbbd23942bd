//! Domain models shared between the fetcher, the scorers and the HTTP layer
//!
//! Profiles and posts are read-only snapshots of what the upstream source
//! returned for one request. Trait scores always carry all five Big Five
//! traits with values clamped to [0, 1].

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Big Five traits
// ============================================================================

/// Big Five (OCEAN) personality trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    /// Canonical trait order, used for tie-breaking and chart axes
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Trait::Openness => "Openness",
            Trait::Conscientiousness => "Conscientiousness",
            Trait::Extraversion => "Extraversion",
            Trait::Agreeableness => "Agreeableness",
            Trait::Neuroticism => "Neuroticism",
        }
    }

    /// Position in the canonical order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Parse a trait name, case-insensitive
    pub fn from_name(name: &str) -> Option<Trait> {
        Trait::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Human-readable description for a score level
    ///
    /// Above 0.6 reads as high, below 0.4 as low, anything else as medium.
    pub fn describe(&self, score: f64) -> &'static str {
        let level = if score > 0.6 {
            Level::High
        } else if score < 0.4 {
            Level::Low
        } else {
            Level::Medium
        };

        match (self, level) {
            (Trait::Openness, Level::High) => "Highly creative, curious, and open to new experiences. Enjoys exploring ideas and art.",
            (Trait::Openness, Level::Medium) => "Balanced between tradition and innovation. Open to new experiences but also values routine.",
            (Trait::Openness, Level::Low) => "More conventional and practical. Prefers familiar experiences and proven methods.",
            (Trait::Conscientiousness, Level::High) => "Highly organized, responsible, and goal-oriented. Plans ahead and follows through.",
            (Trait::Conscientiousness, Level::Medium) => "Generally organized with some flexibility. Balances planning with spontaneity.",
            (Trait::Conscientiousness, Level::Low) => "More spontaneous and flexible. Prefers going with the flow rather than strict planning.",
            (Trait::Extraversion, Level::High) => "Outgoing, energetic, and socially engaged. Draws energy from social interactions.",
            (Trait::Extraversion, Level::Medium) => "Ambivert - comfortable in both social and solitary settings.",
            (Trait::Extraversion, Level::Low) => "More reserved and introspective. Prefers quiet environments and smaller groups.",
            (Trait::Agreeableness, Level::High) => "Highly cooperative, compassionate, and friendly. Values harmony and helping others.",
            (Trait::Agreeableness, Level::Medium) => "Balanced between cooperation and independence. Can be both supportive and assertive.",
            (Trait::Agreeableness, Level::Low) => "More independent and analytical. Prioritizes logic over emotions in decision-making.",
            (Trait::Neuroticism, Level::High) => "More emotionally sensitive and reactive. May experience stress more intensely.",
            (Trait::Neuroticism, Level::Medium) => "Emotionally balanced with normal stress responses. Generally stable mood.",
            (Trait::Neuroticism, Level::Low) => "Emotionally stable and calm. Handles stress well and maintains composure.",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy)]
enum Level {
    High,
    Medium,
    Low,
}

/// Scores for all five traits, each in [0, 1]
///
/// Serializes as a JSON object keyed by trait name in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitScores {
    values: [f64; 5],
}

impl TraitScores {
    /// Build from values in canonical order; out-of-range and NaN values are clamped
    pub fn new(values: [f64; 5]) -> Self {
        let mut clamped = [0.0; 5];
        for (slot, value) in clamped.iter_mut().zip(values) {
            *slot = if value.is_nan() { 0.5 } else { value.clamp(0.0, 1.0) };
        }
        Self { values: clamped }
    }

    /// All traits at 0.5
    pub fn neutral() -> Self {
        Self { values: [0.5; 5] }
    }

    pub fn get(&self, t: Trait) -> f64 {
        self.values[t.index()]
    }

    pub fn to_array(&self) -> [f64; 5] {
        self.values
    }

    /// Iterate `(trait, score)` in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::ALL.into_iter().map(move |t| (t, self.get(t)))
    }

    /// Trait with the highest score; ties go to the earliest trait in canonical order
    pub fn dominant(&self) -> Trait {
        let mut best = Trait::ALL[0];
        for t in Trait::ALL.into_iter().skip(1) {
            if self.get(t) > self.get(best) {
                best = t;
            }
        }
        best
    }
}

impl Default for TraitScores {
    fn default() -> Self {
        Self::neutral()
    }
}

impl Serialize for TraitScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Trait::ALL.len()))?;
        for (t, score) in self.iter() {
            map.serialize_entry(t.name(), &score)?;
        }
        map.end()
    }
}

// ============================================================================
// Profiles and posts
// ============================================================================

/// Public profile snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub full_name: String,
    pub biography: String,
    pub profile_pic_url: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub posts_count: u64,
    pub is_private: bool,
    pub is_verified: bool,
}

/// Where a post's image can be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Downloaded copy on disk; `served_as` is the path relative to the downloads route
    Local { path: PathBuf, served_as: String },
    /// Remote URL that was not downloaded
    Remote { url: String },
}

/// Route under which downloaded images are served
pub const DOWNLOADS_ROUTE: &str = "/downloads";

impl ImageRef {
    /// Value exposed to API consumers: a server path for local copies, the URL otherwise
    pub fn public_ref(&self) -> String {
        match self {
            ImageRef::Local { served_as, .. } => format!("{}/{}", DOWNLOADS_ROUTE, served_as),
            ImageRef::Remote { url } => url.clone(),
        }
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.public_ref())
    }
}

/// One fetched post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    /// Upstream short code
    pub id: String,
    pub caption: String,
    pub likes: u64,
    pub comments_count: u64,
    pub date: DateTime<Utc>,
    /// `None` when the image is a video or could not be retrieved
    pub image_path: Option<ImageRef>,
    pub is_video: bool,
    pub hashtags: BTreeSet<String>,
    pub mentions: BTreeSet<String>,
    pub url: String,
    /// A few preview comments, when the upstream provided them
    pub comments: Vec<String>,
}

impl Post {
    /// Caption followed by the preview comments, blank entries skipped
    pub fn scoring_text(&self) -> String {
        std::iter::once(self.caption.as_str())
            .chain(self.comments.iter().map(String::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Post carrying only a caption; used by fakes and tests
    pub fn from_caption(id: impl Into<String>, caption: impl Into<String>, date: DateTime<Utc>) -> Self {
        let id = id.into();
        let caption = caption.into();
        Self {
            url: format!("https://www.instagram.com/p/{}/", id),
            hashtags: crate::caption::extract_hashtags(&caption),
            mentions: crate::caption::extract_mentions(&caption),
            id,
            caption,
            likes: 0,
            comments_count: 0,
            date,
            image_path: None,
            is_video: false,
            comments: Vec::new(),
        }
    }
}

/// Average engagement per post relative to follower count, capped at 1.0
///
/// Comments count double. Returns 0 for profiles without followers or posts.
pub fn engagement_rate(posts: &[Post], followers: u64) -> f64 {
    if followers == 0 || posts.is_empty() {
        return 0.0;
    }
    let total: f64 = posts
        .iter()
        .map(|p| p.likes as f64 + 2.0 * p.comments_count as f64)
        .sum();
    (total / posts.len() as f64 / followers as f64).min(1.0)
}
