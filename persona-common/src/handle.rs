//! Profile handle parsing
//!
//! Accepts either a bare handle (`nasa`) or a profile URL
//! (`https://www.instagram.com/nasa/`).

use crate::{Error, Result};

/// Longest handle the upstream allows
pub const MAX_HANDLE_LEN: usize = 30;

/// Extract the handle from a profile URL or bare handle
pub fn extract_username(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Profile URL or handle is empty".to_string()));
    }

    let without_scheme = if let Some(rest) = strip_prefix_ignore_case(trimmed, "https://") {
        rest
    } else if let Some(rest) = strip_prefix_ignore_case(trimmed, "http://") {
        rest
    } else if trimmed.to_ascii_lowercase().contains("instagram.com/") {
        trimmed
    } else {
        return Ok(trimmed.trim_start_matches('@').to_string());
    };

    // Strip query and fragment, then take the first path segment after the host
    let without_query = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);

    without_query
        .split('/')
        .skip(1)
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .ok_or_else(|| Error::InvalidInput(format!("Cannot extract username from URL: {}", input)))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// Validate a handle: 1-30 characters of letters, digits, `_` and `.`
///
/// Periods may not lead, trail or repeat.
pub fn validate_username(handle: &str) -> bool {
    !handle.is_empty()
        && handle.chars().count() <= MAX_HANDLE_LEN
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !handle.starts_with('.')
        && !handle.ends_with('.')
        && !handle.contains("..")
}

/// Extract and validate in one step
pub fn parse_handle(input: &str) -> Result<String> {
    let handle = extract_username(input)?;
    if !validate_username(&handle) {
        return Err(Error::InvalidInput(format!("Invalid username: {}", handle)));
    }
    Ok(handle)
}
