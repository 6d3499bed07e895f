//! Utility functions

use std::path::PathBuf;

use crate::constants::APP_NAME;

/// Get the app data directory path
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Format a percentage without a trailing ".0" for whole numbers
pub fn format_percentage(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Default file name for a saved generated image, matching the name the
/// backend uses for its download attachment
pub fn generated_image_name(percentage: f64) -> String {
    format!("elongation_{}.png", format_percentage(percentage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_formatting() {
        assert_eq!(format_percentage(25.0), "25");
        assert_eq!(format_percentage(7.5), "7.5");
        assert_eq!(generated_image_name(60.0), "elongation_60.png");
    }
}
