//! Application constants and configuration

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const GENERATE_PATH: &str = "/generate_image";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "Elongation Predictor";

/// Generic failure messages shown in the UI; the underlying cause only
/// goes to the log.
pub const PREDICT_FAILED_MSG: &str = "Error: Unable to get prediction";
pub const GENERATE_FAILED_MSG: &str = "Error: Unable to generate image";
