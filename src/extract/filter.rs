//! Validity filter for captured place names.

const MIN_NAME_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    // Articles, pronouns, conjunctions
    "a", "an", "the", "this", "that", "these", "those", "it", "its", "and", "or", "but",
    // Prepositions
    "in", "at", "on", "of", "near", "by", "to", "from", "for", "with", "into", "onto", "around",
    "across", "along", "outside", "inside",
    // Fire-domain adjectives and nouns that follow the trigger phrases
    "severe", "active", "major", "minor", "large", "small", "new", "ongoing", "current", "high",
    "low", "extreme", "moderate", "dangerous", "wild", "fire", "fires", "wildfire", "blaze",
    "area", "region", "location", "unknown", "several", "multiple", "many", "some",
];

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Trim whitespace, trailing punctuation and leading stop words
/// ("Near Los Padres" -> "Los Padres") from a captured name. An article
/// directly before the first real word belongs to the name ("The Dalles").
pub fn clean_name(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '\'' | '-' | '!' | '?'))
        .trim();

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let mut first = words.iter().position(|w| !is_stop_word(w)).unwrap_or(words.len());
    if first > 0 && first < words.len() && ARTICLES.contains(&words[first - 1].to_lowercase().as_str()) {
        first -= 1;
    }
    words[first..].join(" ")
}

fn is_stop_word(word: &str) -> bool {
    let w = word.to_lowercase();
    STOP_WORDS.contains(&w.as_str())
}

/// At least three characters and at least one word outside the stop list.
pub fn is_valid_location_name(name: &str) -> bool {
    if name.chars().count() < MIN_NAME_LEN {
        return false;
    }
    name.split_whitespace().any(|w| !is_stop_word(w))
}
