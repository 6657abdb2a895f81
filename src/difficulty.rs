//! Difficulty classification.
//!
//! Maps a repository's raw difficulty value onto a human-readable label.
//! Pure and deterministic; the difficulty aggregation pass buckets
//! repositories by the returned label.

/// Label for a raw difficulty value on the 1–5 scale. Values are clamped,
/// so out-of-range input still maps to the nearest label. Non-finite
/// values get no label.
pub fn label(value: f64) -> Option<&'static str> {
    if !value.is_finite() {
        return None;
    }

    let level = value.round().clamp(1.0, 5.0) as u8;
    Some(match level {
        1 => "novice",
        2 => "beginner",
        3 => "intermediate",
        4 => "advanced",
        _ => "expert",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_labels() {
        assert_eq!(label(1.0), Some("novice"));
        assert_eq!(label(2.0), Some("beginner"));
        assert_eq!(label(3.0), Some("intermediate"));
        assert_eq!(label(4.0), Some("advanced"));
        assert_eq!(label(5.0), Some("expert"));
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(label(0.0), Some("novice"));
        assert_eq!(label(-3.0), Some("novice"));
        assert_eq!(label(99.0), Some("expert"));
    }

    #[test]
    fn test_fractional_rounds() {
        assert_eq!(label(2.4), Some("beginner"));
        assert_eq!(label(2.6), Some("intermediate"));
    }

    #[test]
    fn test_non_finite_unlabeled() {
        assert_eq!(label(f64::NAN), None);
        assert_eq!(label(f64::INFINITY), None);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(label(3.3), label(3.3));
    }
}
