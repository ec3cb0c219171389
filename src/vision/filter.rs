//! Candidate filter: single letters only

use serde::{Deserialize, Serialize};

use super::DetectionCandidate;

/// Candidate filter tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Candidates must score strictly above this (0 - 100)
    pub min_confidence: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 50.0,
        }
    }
}

/// Whether trimmed text is exactly one ASCII letter
fn is_single_letter(text: &str) -> bool {
    let mut chars = text.trim().chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

/// Keep single-letter candidates above the confidence threshold, in input order
pub fn filter_candidates(
    candidates: Vec<DetectionCandidate>,
    config: &FilterConfig,
) -> Vec<DetectionCandidate> {
    candidates
        .into_iter()
        .filter(|c| is_single_letter(&c.text) && c.confidence > config.min_confidence)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;

    fn candidate(text: &str, confidence: f32) -> DetectionCandidate {
        DetectionCandidate::new(text, confidence, BoundingBox::new(0, 0, 10, 10))
    }

    #[test]
    fn test_filter_mixed_candidates() {
        let input = vec![
            candidate("A", 60.0),
            candidate("AB", 90.0),
            candidate("b", 45.0),
            candidate("c", 51.0),
        ];

        let kept = filter_candidates(input, &FilterConfig::default());
        let texts: Vec<&str> = kept.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "c"]);
        assert_eq!(kept[0].confidence, 60.0);
        assert_eq!(kept[1].confidence, 51.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let kept = filter_candidates(vec![candidate("x", 50.0)], &FilterConfig::default());
        assert!(kept.is_empty());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let kept = filter_candidates(vec![candidate("  z\n", 80.0)], &FilterConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "  z\n");
    }

    #[test]
    fn test_non_letters_rejected() {
        let input = vec![
            candidate("7", 99.0),
            candidate("?", 99.0),
            candidate("é", 99.0),
            candidate("", 99.0),
            candidate("   ", 99.0),
        ];
        assert!(filter_candidates(input, &FilterConfig::default()).is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let config = FilterConfig { min_confidence: 80.0 };
        let kept = filter_candidates(vec![candidate("K", 79.0), candidate("L", 81.0)], &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "L");
    }
}
