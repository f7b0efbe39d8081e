use crate::config::{MAX_TIER_COUNT, MIN_TIER_COUNT};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Generic numeric input validation
pub fn validate_numeric_input<T>(
    input: &str,
    min: Option<T>,
    max: Option<T>,
    field_name: &str,
) -> Result<T, String>
where
    T: std::str::FromStr + std::fmt::Display + PartialOrd,
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(format!("{} cannot be empty", field_name));
    }

    match trimmed.parse::<T>() {
        Ok(val) => {
            if let Some(min_val) = min {
                if val < min_val {
                    return Err(format!("{} must be at least {}", field_name, min_val));
                }
            }
            if let Some(max_val) = max {
                if val > max_val {
                    return Err(format!("{} cannot exceed {}", field_name, max_val));
                }
            }
            Ok(val)
        }
        Err(_) => Err(format!("{} must be a valid number", field_name)),
    }
}

/// Validate the tier slider value
pub fn validate_tier_count(input: &str) -> Result<usize, String> {
    validate_numeric_input(input, Some(MIN_TIER_COUNT), Some(MAX_TIER_COUNT), "Tier count")
}

/// Validate a tier label typed into the row editor. Inner runs of
/// whitespace collapse to one space.
pub fn validate_tier_label(input: &str) -> Result<String, String> {
    let collapsed = WHITESPACE_REGEX.replace_all(input.trim(), " ");
    if collapsed.is_empty() {
        return Err("Tier label cannot be empty".to_string());
    }
    Ok(collapsed.into_owned())
}

/// Validate a typed voice-style command
pub fn validate_command(input: &str) -> Result<String, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Please enter a command".to_string());
    }
    Ok(trimmed.to_string())
}

/// Scale `(width, height)` down so the longer edge is at most `edge`,
/// keeping the aspect ratio. Images already small enough are untouched.
pub fn fit_within(width: u32, height: u32, edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= edge || longest == 0 {
        return (width, height);
    }
    let scale = edge as f64 / longest as f64;
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Short label for a theme option: "synthwave" -> "Synthwave".
pub fn theme_title(theme: &str) -> String {
    let mut chars = theme.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_count_bounds() {
        assert_eq!(validate_tier_count("7"), Ok(7));
        assert_eq!(validate_tier_count(" 1 "), Ok(1));
        assert_eq!(
            validate_tier_count("0"),
            Err("Tier count must be at least 1".to_string())
        );
        assert_eq!(
            validate_tier_count("11"),
            Err("Tier count cannot exceed 10".to_string())
        );
        assert!(validate_tier_count("many").is_err());
    }

    #[test]
    fn tier_label_is_trimmed_and_collapsed() {
        assert_eq!(validate_tier_label("  Top   Picks "), Ok("Top Picks".to_string()));
        assert!(validate_tier_label(" \t ").is_err());
    }

    #[test]
    fn command_must_not_be_blank() {
        assert_eq!(
            validate_command(" move cat to s tier "),
            Ok("move cat to s tier".to_string())
        );
        assert!(validate_command("").is_err());
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        assert_eq!(fit_within(1024, 512, 512), (512, 256));
        assert_eq!(fit_within(300, 1200, 512), (128, 512));
        assert_eq!(fit_within(200, 100, 512), (200, 100));
        assert_eq!(fit_within(5000, 1, 512), (512, 1));
    }

    #[test]
    fn theme_titles() {
        assert_eq!(theme_title("coffee"), "Coffee");
        assert_eq!(theme_title(""), "");
    }
}
