//! Caption parsing helpers
//!
//! Word characters follow the usual `\w` notion: Unicode letters, digits and `_`.

use std::collections::BTreeSet;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collect the words that directly follow `marker` (e.g. `#tag`, `@user`)
fn extract_marked(text: &str, marker: char) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != marker {
            continue;
        }
        let mut word = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            word.push(next);
            chars.next();
        }
        if !word.is_empty() {
            found.insert(word);
        }
    }

    found
}

/// Unique hashtags in a caption, without the leading `#`
pub fn extract_hashtags(text: &str) -> BTreeSet<String> {
    extract_marked(text, '#')
}

/// Unique mentions in a caption, without the leading `@`
pub fn extract_mentions(text: &str) -> BTreeSet<String> {
    extract_marked(text, '@')
}

/// Prepare a caption for lexical analysis
///
/// Drops URLs and `@mentions`, keeps hashtag words without the `#`, and
/// collapses whitespace.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| {
            let lower = token.to_lowercase();
            !(lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www."))
        })
        .filter(|token| !token.starts_with('@'))
        .map(|token| token.trim_start_matches('#'))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-cased words of a caption, split on anything that is not a word character
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !is_word_char(c))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hashtags_dedups() {
        let tags = extract_hashtags("Sunset #travel #beach and more #travel!");
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("travel"));
        assert!(tags.contains("beach"));
    }

    #[test]
    fn test_extract_hashtags_unicode() {
        let tags = extract_hashtags("Vacances #été #café_du_matin");
        assert!(tags.contains("été"));
        assert!(tags.contains("café_du_matin"));
    }

    #[test]
    fn test_extract_mentions() {
        let mentions = extract_mentions("with @alice and @bob.smith, @ alone");
        assert!(mentions.contains("alice"));
        assert!(mentions.contains("bob"));
        assert_eq!(mentions.len(), 2);
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_hashtags("").is_empty());
        assert!(extract_mentions("").is_empty());
        assert_eq!(clean_text(""), "");
        assert!(words("").is_empty());
    }

    #[test]
    fn test_clean_text() {
        let cleaned = clean_text("Great day with @alice   at https://example.com #Happy");
        assert_eq!(cleaned, "Great day with at Happy");
    }

    #[test]
    fn test_words_lowercase_and_split() {
        assert_eq!(words("Love, LIFE & friends!"), vec!["love", "life", "friends"]);
        assert_eq!(words("Très heureux"), vec!["très", "heureux"]);
    }
}
