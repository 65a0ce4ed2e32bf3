use crate::models::Level;

const LOWER_BOUND: f64 = 0.33;
const UPPER_BOUND: f64 = 0.66;

/// Maps a composite index onto its qualitative level. Undefined scores have no level.
pub fn categorize(value: Option<f64>) -> Option<Level> {
    let value = value.filter(|value| !value.is_nan())?;
    if value < LOWER_BOUND {
        Some(Level::BelowNormative)
    } else if value <= UPPER_BOUND {
        Some(Level::Normative)
    } else {
        Some(Level::AboveNormative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_for_normative() {
        assert_eq!(categorize(Some(0.32)), Some(Level::BelowNormative));
        assert_eq!(categorize(Some(0.33)), Some(Level::Normative));
        assert_eq!(categorize(Some(0.66)), Some(Level::Normative));
        assert_eq!(categorize(Some(0.67)), Some(Level::AboveNormative));
    }

    #[test]
    fn handles_out_of_range_values() {
        assert_eq!(categorize(Some(-0.4)), Some(Level::BelowNormative));
        assert_eq!(categorize(Some(1.0)), Some(Level::AboveNormative));
    }

    #[test]
    fn undefined_has_no_level() {
        assert_eq!(categorize(None), None);
        assert_eq!(categorize(Some(f64::NAN)), None);
    }
}
