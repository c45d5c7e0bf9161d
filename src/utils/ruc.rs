//! RUC identifier normalization
//!
//! Identifiers arrive from spreadsheets, so a RUC can show up as
//! `20606564016.0`, `2.0606564016E10`, or with a leading `'` text marker.
//! Normalization undoes those artifacts without validating the number.

/// Number of digits in a Peruvian RUC
pub const RUC_LENGTH: usize = 11;

/// Strip formatting and float artifacts from a raw identifier.
///
/// Non-numeric input is returned trimmed; the caller owns validation.
#[must_use]
pub fn normalize_ruc(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches('\'')
        .trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim();

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    if let Some(integral) = strip_zero_fraction(trimmed) {
        return integral.to_string();
    }

    // Scientific notation from a numeric cell
    if trimmed.contains(['e', 'E'])
        && let Ok(value) = trimmed.parse::<f64>()
        && value.is_finite()
        && value >= 0.0
        && value.fract() == 0.0
        && value < 1e15
    {
        return format!("{value:.0}");
    }

    trimmed.to_string()
}

/// `"20606564016.0"` / `"20606564016.00"` -> `"20606564016"`
fn strip_zero_fraction(value: &str) -> Option<&str> {
    let (integral, fraction) = value.split_once('.')?;
    let integral_ok = !integral.is_empty() && integral.chars().all(|c| c.is_ascii_digit());
    let fraction_ok = fraction.chars().all(|c| c == '0');
    (integral_ok && fraction_ok).then_some(integral)
}

/// Exactly eleven ASCII digits
#[must_use]
pub fn is_well_formed_ruc(value: &str) -> bool {
    value.len() == RUC_LENGTH && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ruc_is_untouched() {
        assert_eq!(normalize_ruc("20606564016"), "20606564016");
        assert_eq!(normalize_ruc("  20606564016\n"), "20606564016");
    }

    #[test]
    fn test_float_artifacts_are_removed() {
        assert_eq!(normalize_ruc("20606564016.0"), "20606564016");
        assert_eq!(normalize_ruc("20606564016.000"), "20606564016");
        assert_eq!(normalize_ruc("2.0606564016E10"), "20606564016");
        assert_eq!(normalize_ruc("2.0606564016e+10"), "20606564016");
    }

    #[test]
    fn test_spreadsheet_text_markers() {
        assert_eq!(normalize_ruc("'20606564016"), "20606564016");
        assert_eq!(normalize_ruc("\"20606564016\""), "20606564016");
    }

    #[test]
    fn test_non_numeric_passes_through_trimmed() {
        assert_eq!(normalize_ruc(" abc "), "abc");
        assert_eq!(normalize_ruc("20606564016.5"), "20606564016.5");
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed_ruc("20606564016"));
        assert!(!is_well_formed_ruc("2060656401"));
        assert!(!is_well_formed_ruc("2060656401a"));
    }
}
