//! Sizing placeholder and background overlay helpers.
//!
//! Before the real image arrives, the visible surface carries a synthetic
//! inline-SVG source whose only job is to report the configured intrinsic
//! width/height, so the layout reserves the right space and nothing shifts
//! when the fetch completes.

/// Width/height configuration input: a number or free-form text.
#[derive(Clone, Debug, PartialEq)]
pub enum Dimension {
    Number(f64),
    Text(String),
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Number(0.0)
    }
}

impl From<f64> for Dimension {
    fn from(value: f64) -> Self {
        Dimension::Number(value)
    }
}

impl From<u32> for Dimension {
    fn from(value: u32) -> Self {
        Dimension::Number(value as f64)
    }
}

impl From<&str> for Dimension {
    fn from(value: &str) -> Self {
        Dimension::Text(value.to_owned())
    }
}

/// Coerces a dimension to a pixel count; anything non-numeric becomes 0.
pub fn coerce_dimension(value: &Dimension) -> f64 {
    let number = match value {
        Dimension::Number(n) => *n,
        Dimension::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Builds the synthetic sizing source for the given intrinsic dimensions.
///
/// The result is a minimal SVG data URI sized exactly to the request, e.g.
/// `width="800" height="200"` for `(800, 200)`.
pub fn placeholder_source(width: &Dimension, height: &Dimension) -> String {
    let w = coerce_dimension(width);
    let h = coerce_dimension(height);
    format!(
        "data:image/svg+xml,%3Csvg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\"%3E%3C/svg%3E"
    )
}

/// Composes the pending-image placeholder on top of any existing background.
///
/// The placeholder is prepended, not substituted, so a pre-existing
/// background image stays visible underneath once the placeholder resolves.
pub fn overlay_background(placeholder_url: &str, existing: Option<&str>) -> String {
    match existing {
        Some(current) if !current.is_empty() => format!("url({placeholder_url}),{current}"),
        _ => format!("url({placeholder_url})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_encodes_exact_dimensions() {
        let source = placeholder_source(&Dimension::from(800u32), &Dimension::from(200u32));
        assert!(source.starts_with("data:image/svg+xml,"));
        assert!(source.contains("width=\"800\" height=\"200\""));
    }

    #[test]
    fn test_text_dimensions_parse_like_numbers() {
        let from_text = placeholder_source(&Dimension::from("800"), &Dimension::from("200"));
        let from_numbers = placeholder_source(&Dimension::from(800.0), &Dimension::from(200.0));
        assert_eq!(from_text, from_numbers);
    }

    #[test]
    fn test_non_numeric_dimension_coerces_to_zero() {
        assert_eq!(coerce_dimension(&Dimension::from("wide")), 0.0);
        assert_eq!(coerce_dimension(&Dimension::from("")), 0.0);
        assert_eq!(coerce_dimension(&Dimension::Number(f64::NAN)), 0.0);

        let source = placeholder_source(&Dimension::from("wide"), &Dimension::from("tall"));
        assert!(source.contains("width=\"0\" height=\"0\""));
    }

    #[test]
    fn test_overlay_prepends_to_existing_background() {
        assert_eq!(
            overlay_background("pending.png", Some("url(old.png)")),
            "url(pending.png),url(old.png)"
        );
        assert_eq!(overlay_background("pending.png", None), "url(pending.png)");
        assert_eq!(overlay_background("pending.png", Some("")), "url(pending.png)");
    }
}
