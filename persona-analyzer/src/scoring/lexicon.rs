//! Word lexicon for caption scoring
//!
//! Each word points at one or more [`Signal`]s. The built-in lexicon covers
//! English and French vocabulary common in social captions. A replacement can
//! be loaded from TOML:
//!
//! ```toml
//! curiosity = ["travel", "explore", "voyage"]
//! calm = ["peace", "sérénité"]
//! ```

use super::{ScoringError, Signal};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const CURIOSITY_WORDS: &[&str] = &[
    "travel", "explore", "exploring", "adventure", "discover", "discovery", "new", "art",
    "artist", "museum", "book", "books", "read", "reading", "learn", "learning", "idea",
    "ideas", "create", "creative", "design", "photography", "wanderlust", "curious",
    "culture", "music", "science", "journey", "inspiration", "imagine",
    "voyage", "découverte", "découvrir", "explorer", "aventure", "livre", "lire", "créer",
    "créatif", "musée", "apprendre", "idée", "curieux", "culture", "inspiration",
];

const ORDER_WORDS: &[&str] = &[
    "plan", "planning", "organized", "organize", "routine", "schedule", "discipline",
    "habit", "habits", "focus", "productive", "productivity", "prepare", "prepared",
    "clean", "tidy", "list", "morning", "early", "consistent", "consistency", "detail",
    "organisé", "organiser", "planning", "discipline", "habitude", "préparer", "matin",
    "routine", "rangé", "objectif",
];

const ACHIEVEMENT_WORDS: &[&str] = &[
    "goal", "goals", "work", "working", "success", "successful", "achieve", "achieved",
    "achievement", "win", "won", "proud", "graduation", "graduated", "milestone", "career",
    "business", "hustle", "training", "workout", "gym", "progress", "promotion", "award",
    "travail", "réussite", "réussir", "gagné", "fier", "fière", "diplôme", "carrière",
    "entraînement", "progrès", "objectifs",
];

const SOCIABILITY_WORDS: &[&str] = &[
    "friends", "friend", "party", "together", "crew", "squad", "team", "night", "out",
    "celebrate", "celebrating", "celebration", "festival", "concert", "dance", "dancing",
    "weekend", "fun", "people", "meet", "everyone", "club", "birthday", "drinks",
    "amis", "ami", "amie", "fête", "soirée", "ensemble", "danse", "danser", "équipe",
    "anniversaire", "weekend", "copains",
];

const WARMTH_WORDS: &[&str] = &[
    "love", "loved", "family", "thanks", "thank", "grateful", "gratitude", "kind",
    "kindness", "care", "caring", "support", "hug", "hugs", "mom", "dad", "sister",
    "brother", "baby", "together", "heart", "blessed", "sweet", "help",
    "amour", "aime", "famille", "merci", "reconnaissant", "reconnaissante", "gentil",
    "câlin", "maman", "papa", "soeur", "frère", "bébé", "coeur", "cœur",
];

const POSITIVITY_WORDS: &[&str] = &[
    "happy", "happiness", "joy", "amazing", "awesome", "beautiful", "great", "best",
    "wonderful", "perfect", "smile", "smiling", "fun", "excited", "good", "lovely",
    "fantastic", "enjoy", "enjoying", "laugh", "sunshine", "yay",
    "heureux", "heureuse", "bonheur", "joie", "magnifique", "génial", "super", "parfait",
    "sourire", "beau", "belle", "merveilleux", "incroyable", "content", "contente",
];

const NEGATIVITY_WORDS: &[&str] = &[
    "sad", "tired", "stress", "stressed", "anxious", "anxiety", "worried", "worry",
    "alone", "lonely", "angry", "hate", "cry", "crying", "hurt", "pain", "bad", "worst",
    "sick", "exhausted", "fear", "scared", "depressed", "upset", "miss",
    "triste", "fatigué", "fatiguée", "stressé", "stressée", "angoisse", "inquiet", "seul",
    "seule", "colère", "déteste", "pleurer", "mal", "peur", "malade", "épuisé",
];

const CALM_WORDS: &[&str] = &[
    "peace", "peaceful", "calm", "relax", "relaxing", "quiet", "nature", "sunset",
    "sunrise", "beach", "ocean", "sea", "lake", "forest", "mountain", "mountains",
    "meditation", "meditate", "yoga", "slow", "serene", "breathe", "chill",
    "paix", "calme", "détente", "nature", "coucher", "plage", "mer", "océan", "lac",
    "forêt", "montagne", "méditation", "sérénité", "tranquille", "respirer",
];

/// Word → signal lookup used by the lexicon text scorer
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: HashMap<String, Vec<Signal>>,
}

impl Lexicon {
    /// Built-in English and French lexicon
    pub fn builtin() -> Self {
        let lists: [(Signal, &[&str]); Signal::COUNT] = [
            (Signal::Curiosity, CURIOSITY_WORDS),
            (Signal::Order, ORDER_WORDS),
            (Signal::Achievement, ACHIEVEMENT_WORDS),
            (Signal::Sociability, SOCIABILITY_WORDS),
            (Signal::Warmth, WARMTH_WORDS),
            (Signal::Positivity, POSITIVITY_WORDS),
            (Signal::Negativity, NEGATIVITY_WORDS),
            (Signal::Calm, CALM_WORDS),
        ];

        let mut lexicon = Self { entries: HashMap::new() };
        for (signal, words) in lists {
            for word in words {
                lexicon.insert(word, signal);
            }
        }
        lexicon
    }

    /// Load a lexicon from a TOML file of `signal = [words]`
    pub fn from_file(path: &Path) -> Result<Self, ScoringError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScoringError::Config(format!("Read lexicon {} failed: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScoringError> {
        let table: BTreeMap<String, Vec<String>> = toml::from_str(content)
            .map_err(|e| ScoringError::Config(format!("Parse lexicon failed: {}", e)))?;

        let mut lexicon = Self { entries: HashMap::new() };
        for (signal_name, words) in &table {
            let signal = Signal::from_name(signal_name).ok_or_else(|| {
                ScoringError::Config(format!("Lexicon names unknown signal '{}'", signal_name))
            })?;
            for word in words {
                lexicon.insert(word, signal);
            }
        }

        if lexicon.is_empty() {
            return Err(ScoringError::Config("Lexicon contains no words".to_string()));
        }
        Ok(lexicon)
    }

    fn insert(&mut self, word: &str, signal: Signal) {
        let signals = self.entries.entry(word.trim().to_lowercase()).or_default();
        if !signals.contains(&signal) {
            signals.push(signal);
        }
    }

    /// Signals a lower-cased word maps to
    pub fn lookup(&self, word: &str) -> &[Signal] {
        self.entries.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}
