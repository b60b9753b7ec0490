//! Marker counting

/// The character counted in messages
pub const MARKER: char = '+';

/// Number of marker occurrences in a message
pub fn count_markers(text: &str) -> u64 {
    text.chars().filter(|c| *c == MARKER).count() as u64
}

/// Whether a message contributes to the counters at all
pub fn contains_marker(text: &str) -> bool {
    text.contains(MARKER)
}
