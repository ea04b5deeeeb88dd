//! Sliding-window text chunker.
//!
//! Splits file content into fixed-size character windows where adjacent
//! windows share `floor(chunk_size * overlap_ratio)` characters. The split
//! is deterministic: the same input always produces the same chunk
//! sequence, which keeps chunk ids stable across runs.

use crate::error::VcError;

/// Validate chunking parameters without touching any text.
///
/// Called by the vectorization pipeline before any file is read, so a bad
/// configuration fails the run up front rather than mid-stream.
pub fn validate_params(chunk_size: i64, overlap_ratio: f64) -> Result<(), VcError> {
    if chunk_size <= 0 {
        return Err(VcError::Config(format!(
            "chunk_size must be positive, got {chunk_size}"
        )));
    }
    if !(0.0..1.0).contains(&overlap_ratio) {
        return Err(VcError::Config(format!(
            "overlap_ratio must be in [0, 1), got {overlap_ratio}"
        )));
    }
    Ok(())
}

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// Text no longer than one window is returned as a single chunk. Because
/// `overlap_ratio < 1`, the window start always advances by at least one
/// character, so the split is finite.
pub fn chunk_text(text: &str, chunk_size: i64, overlap_ratio: f64) -> Result<Vec<String>, VcError> {
    validate_params(chunk_size, overlap_ratio)?;

    let size = chunk_size as usize;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return Ok(vec![text.to_string()]);
    }

    let overlap = (size as f64 * overlap_ratio).floor() as usize;
    let step = size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_text("hello world", 50, 0.2).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_single_empty_chunk() {
        let chunks = chunk_text("", 50, 0.2).unwrap();
        assert_eq!(chunks, vec![String::new()]);
    }

    #[test]
    fn windows_overlap_by_configured_ratio() {
        // 120 chars, size 50, overlap 10 -> starts at 0, 40, 80.
        let text: String = ('a'..='z').cycle().take(120).collect();
        let chunks = chunk_text(&text, 50, 0.2).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 50);
        assert_eq!(chunks[1].chars().count(), 50);
        assert_eq!(chunks[2].chars().count(), 40);
        // Adjacent chunks share the 10-char overlap.
        assert_eq!(&chunks[0][40..], &chunks[1][..10]);
    }

    #[test]
    fn deterministic() {
        let text: String = "abcdef".chars().cycle().take(500).collect();
        let a = chunk_text(&text, 64, 0.25).unwrap();
        let b = chunk_text(&text, 64, 0.25).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_overlap_partitions_exactly() {
        let text: String = "x".repeat(100);
        let chunks = chunk_text(&text, 25, 0.0).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 25));
    }

    #[test]
    fn non_positive_chunk_size_is_config_error() {
        assert!(matches!(chunk_text("abc", 0, 0.2), Err(VcError::Config(_))));
        assert!(matches!(chunk_text("abc", -1, 0.2), Err(VcError::Config(_))));
    }

    #[test]
    fn overlap_ratio_out_of_range_is_config_error() {
        assert!(matches!(chunk_text("abc", 10, 1.0), Err(VcError::Config(_))));
        assert!(matches!(
            chunk_text("abc", 10, -0.1),
            Err(VcError::Config(_))
        ));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text: String = "héllo wörld ".chars().cycle().take(90).collect();
        let chunks = chunk_text(&text, 40, 0.1).unwrap();
        assert!(chunks.len() > 1);
        let max: usize = chunks.iter().map(|c| c.chars().count()).max().unwrap();
        assert!(max <= 40);
    }
}
