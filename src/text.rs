//! Text normalization shared by encoding and search

/// Lowercase `text`, drop everything that is not an ASCII letter, digit or
/// whitespace, and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Normalized tokens of `text`, in order of appearance.
///
/// No stemming and no stop-word removal; duplicates are kept so callers can
/// count occurrences.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}
