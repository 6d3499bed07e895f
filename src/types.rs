//! Common types and data structures

/// Which kind of microscopy map a session works with
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MapKind {
    Kam,
    PhaseMap,
}

impl MapKind {
    /// Human-readable name for labels and headings
    pub fn label(self) -> &'static str {
        match self {
            MapKind::Kam => "KAM",
            MapKind::PhaseMap => "Phase Map",
        }
    }

    /// Identifier the backend expects in the generate request body
    pub fn wire_name(self) -> &'static str {
        match self {
            MapKind::Kam => "kam",
            MapKind::PhaseMap => "phase_map",
        }
    }

    /// Prediction endpoint path for this kind
    pub fn predict_path(self) -> &'static str {
        match self {
            MapKind::Kam => "/predict_kam",
            MapKind::PhaseMap => "/predict_phase_map",
        }
    }
}

/// Which flow tab is visible
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FlowTab {
    Predict,
    Generate,
}

/// Response body of the predict endpoints
#[derive(serde::Deserialize)]
pub struct PredictionResponse {
    pub prediction: PredictionValue,
}

/// The backend returns the prediction as either a bare number or a string
#[derive(serde::Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    Number(f64),
    Text(String),
}

impl PredictionValue {
    pub fn display(&self) -> String {
        match self {
            PredictionValue::Number(n) => format!("{}", n),
            PredictionValue::Text(s) => s.clone(),
        }
    }
}

/// Request body of the generate endpoint
#[derive(serde::Serialize)]
pub struct GenerateRequest {
    pub percentage: f64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}
