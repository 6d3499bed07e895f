//! Per-flow session state machines
//!
//! Both flows share the same shape: pick a map kind, provide an input,
//! submit once, and watch the request move through
//! Idle -> Loading -> Succeeded/Failed. Everything here is synchronous;
//! the HTTP layer hands completions back through `finish` together with
//! the generation it was spawned under, so a response that arrives after
//! the session was reset is dropped instead of resurrecting old state.

use std::path::PathBuf;

use crate::types::MapKind;

pub const MIN_PERCENTAGE: f64 = 5.0;
pub const MAX_PERCENTAGE: f64 = 60.0;

pub const MSG_NOT_A_NUMBER: &str = "Please enter a valid number";
pub const MSG_BELOW_MIN: &str = "Enter minimum 5%";
pub const MSG_ABOVE_MAX: &str = "Enter maximum 60%";

/// Outcome of validating the percentage field
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Validity {
    Valid(ValidPercentage),
    Invalid(&'static str),
}

/// A percentage that passed range validation
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ValidPercentage(f64);

// f64 here never holds NaN (validation rejects non-finite values)
impl Eq for ValidPercentage {}

impl ValidPercentage {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Validate the raw percentage text. Recomputed on every keystroke,
/// never deferred to submit time.
pub fn validate_percentage(text: &str) -> Validity {
    let value = match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return Validity::Invalid(MSG_NOT_A_NUMBER),
    };
    if value < MIN_PERCENTAGE {
        Validity::Invalid(MSG_BELOW_MIN)
    } else if value > MAX_PERCENTAGE {
        Validity::Invalid(MSG_ABOVE_MAX)
    } else {
        Validity::Valid(ValidPercentage(value))
    }
}

/// Request lifecycle of a single flow
#[derive(Clone, PartialEq, Debug)]
pub enum Lifecycle<T> {
    Idle,
    Loading,
    Succeeded(T),
    Failed(String),
}

impl<T> Default for Lifecycle<T> {
    fn default() -> Self {
        Lifecycle::Idle
    }
}

impl<T> Lifecycle<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Lifecycle::Loading)
    }
}

/// An image the user picked from disk, held wholesale until replaced
#[derive(Clone, PartialEq, Debug)]
pub struct PickedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything a predict request task needs, captured at submit time
pub struct PredictJob {
    pub generation: u64,
    pub kind: MapKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Completion of a predict request, tagged with its generation
pub struct PredictCompletion {
    pub generation: u64,
    pub result: Result<String, String>,
}

/// Flow A: upload an image, get back an elongation percentage
#[derive(Default)]
pub struct PredictSession {
    kind: Option<MapKind>,
    image: Option<PickedImage>,
    lifecycle: Lifecycle<String>,
    generation: u64,
}

impl PredictSession {
    pub fn kind(&self) -> Option<MapKind> {
        self.kind
    }

    pub fn image(&self) -> Option<&PickedImage> {
        self.image.as_ref()
    }

    pub fn lifecycle(&self) -> &Lifecycle<String> {
        &self.lifecycle
    }

    /// Select a kind (or none). Always a full reset, even when re-selecting
    /// the active kind. Bumps the generation so an in-flight response
    /// cannot land in the fresh session.
    pub fn select_kind(&mut self, kind: Option<MapKind>) {
        self.kind = kind;
        self.image = None;
        self.lifecycle = Lifecycle::Idle;
        self.generation += 1;
    }

    /// Replace the chosen image wholesale. Ignored until a kind is selected.
    pub fn set_image(&mut self, image: PickedImage) {
        if self.kind.is_none() {
            return;
        }
        self.image = Some(image);
    }

    pub fn can_submit(&self) -> bool {
        self.kind.is_some() && self.image.is_some() && !self.lifecycle.is_loading()
    }

    /// Move to Loading and hand back the job for the request layer,
    /// or None when submission is gated.
    pub fn begin_submit(&mut self) -> Option<PredictJob> {
        if !self.can_submit() {
            return None;
        }
        let kind = self.kind?;
        let image = self.image.as_ref()?;
        self.lifecycle = Lifecycle::Loading;
        Some(PredictJob {
            generation: self.generation,
            kind,
            file_name: image.file_name.clone(),
            bytes: image.bytes.clone(),
        })
    }

    /// Apply a completion. Stale generations are dropped.
    pub fn finish(&mut self, completion: PredictCompletion) {
        if completion.generation != self.generation || !self.lifecycle.is_loading() {
            return;
        }
        self.lifecycle = match completion.result {
            Ok(prediction) => Lifecycle::Succeeded(prediction),
            Err(message) => Lifecycle::Failed(message),
        };
    }
}

/// A generated map image paired with the percentage confirmed at submit time
#[derive(Clone, PartialEq, Debug)]
pub struct GeneratedImage {
    pub percentage: f64,
    pub png: Vec<u8>,
}

/// Everything a generate request task needs, captured at submit time
pub struct GenerateJob {
    pub generation: u64,
    pub kind: MapKind,
    pub percentage: f64,
}

/// Completion of a generate request, tagged with its generation
pub struct GenerateCompletion {
    pub generation: u64,
    pub result: Result<Vec<u8>, String>,
}

/// Flow B: enter a target percentage, get back a generated map image
#[derive(Default)]
pub struct GenerateSession {
    kind: Option<MapKind>,
    percent_text: String,
    // Snapshot taken at submit time; the result binds to this, not to
    // whatever the field says when the response arrives.
    confirmed_percentage: Option<f64>,
    lifecycle: Lifecycle<GeneratedImage>,
    generation: u64,
}

impl GenerateSession {
    pub fn kind(&self) -> Option<MapKind> {
        self.kind
    }

    pub fn percent_text(&self) -> &str {
        &self.percent_text
    }

    pub fn percent_text_mut(&mut self) -> &mut String {
        &mut self.percent_text
    }

    pub fn lifecycle(&self) -> &Lifecycle<GeneratedImage> {
        &self.lifecycle
    }

    pub fn validity(&self) -> Validity {
        validate_percentage(&self.percent_text)
    }

    pub fn select_kind(&mut self, kind: Option<MapKind>) {
        self.kind = kind;
        self.percent_text.clear();
        self.confirmed_percentage = None;
        self.lifecycle = Lifecycle::Idle;
        self.generation += 1;
    }

    /// Store the raw text verbatim; validity is derived, never stored.
    pub fn set_percent_text(&mut self, text: impl Into<String>) {
        self.percent_text = text.into();
    }

    pub fn can_submit(&self) -> bool {
        self.kind.is_some()
            && matches!(self.validity(), Validity::Valid(_))
            && !self.lifecycle.is_loading()
    }

    pub fn begin_submit(&mut self) -> Option<GenerateJob> {
        if !self.can_submit() {
            return None;
        }
        let kind = self.kind?;
        let percentage = match self.validity() {
            Validity::Valid(p) => p.value(),
            Validity::Invalid(_) => return None,
        };
        self.confirmed_percentage = Some(percentage);
        self.lifecycle = Lifecycle::Loading;
        Some(GenerateJob {
            generation: self.generation,
            kind,
            percentage,
        })
    }

    pub fn finish(&mut self, completion: GenerateCompletion) {
        if completion.generation != self.generation || !self.lifecycle.is_loading() {
            return;
        }
        self.lifecycle = match (completion.result, self.confirmed_percentage) {
            (Ok(png), Some(percentage)) => Lifecycle::Succeeded(GeneratedImage { percentage, png }),
            (Ok(_), None) => Lifecycle::Idle,
            (Err(message), _) => Lifecycle::Failed(message),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> PickedImage {
        PickedImage {
            path: PathBuf::from("kam_25.png"),
            file_name: "kam_25.png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[test]
    fn percentage_validation_messages() {
        assert_eq!(validate_percentage("abc"), Validity::Invalid(MSG_NOT_A_NUMBER));
        assert_eq!(validate_percentage(""), Validity::Invalid(MSG_NOT_A_NUMBER));
        assert_eq!(validate_percentage("NaN"), Validity::Invalid(MSG_NOT_A_NUMBER));
        assert_eq!(validate_percentage("3"), Validity::Invalid(MSG_BELOW_MIN));
        assert_eq!(validate_percentage("61"), Validity::Invalid(MSG_ABOVE_MAX));
        assert_eq!(validate_percentage("30"), Validity::Valid(ValidPercentage(30.0)));
    }

    #[test]
    fn percentage_range_is_inclusive() {
        assert!(matches!(validate_percentage("5"), Validity::Valid(_)));
        assert!(matches!(validate_percentage("60"), Validity::Valid(_)));
        assert!(matches!(validate_percentage("7.5"), Validity::Valid(_)));
        assert!(matches!(validate_percentage(" 25 "), Validity::Valid(_)));
        assert_eq!(validate_percentage("4.999"), Validity::Invalid(MSG_BELOW_MIN));
        assert_eq!(validate_percentage("60.001"), Validity::Invalid(MSG_ABOVE_MAX));
    }

    #[test]
    fn predict_submit_requires_kind_and_image() {
        let mut session = PredictSession::default();
        assert!(!session.can_submit());
        assert!(session.begin_submit().is_none());

        session.select_kind(Some(MapKind::Kam));
        assert!(!session.can_submit());

        session.set_image(sample_image());
        assert!(session.can_submit());
        let job = session.begin_submit().expect("submit accepted");
        assert_eq!(job.kind, MapKind::Kam);
        assert!(session.lifecycle().is_loading());
    }

    #[test]
    fn image_ignored_without_kind() {
        let mut session = PredictSession::default();
        session.set_image(sample_image());
        assert!(session.image().is_none());
    }

    #[test]
    fn submit_while_loading_is_a_no_op() {
        let mut session = PredictSession::default();
        session.select_kind(Some(MapKind::PhaseMap));
        session.set_image(sample_image());
        let job = session.begin_submit().expect("first submit accepted");

        assert!(!session.can_submit());
        assert!(session.begin_submit().is_none());
        assert!(session.lifecycle().is_loading());

        session.finish(PredictCompletion {
            generation: job.generation,
            result: Ok("25".into()),
        });
        assert_eq!(*session.lifecycle(), Lifecycle::Succeeded("25".into()));
    }

    #[test]
    fn selecting_kind_resets_everything() {
        let mut session = PredictSession::default();
        session.select_kind(Some(MapKind::Kam));
        session.set_image(sample_image());
        let job = session.begin_submit().expect("submit accepted");
        session.finish(PredictCompletion {
            generation: job.generation,
            result: Ok("40".into()),
        });

        // Re-selecting the active kind is still a full reset
        session.select_kind(Some(MapKind::Kam));
        assert!(session.image().is_none());
        assert_eq!(*session.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn stale_predict_completion_is_dropped() {
        let mut session = PredictSession::default();
        session.select_kind(Some(MapKind::Kam));
        session.set_image(sample_image());
        let job = session.begin_submit().expect("submit accepted");

        // Kind switch while the request is outstanding
        session.select_kind(Some(MapKind::PhaseMap));
        session.finish(PredictCompletion {
            generation: job.generation,
            result: Ok("25".into()),
        });
        assert_eq!(*session.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn failure_then_resubmit_recovers() {
        let mut session = GenerateSession::default();
        session.select_kind(Some(MapKind::Kam));
        session.set_percent_text("30");
        let job = session.begin_submit().expect("submit accepted");
        session.finish(GenerateCompletion {
            generation: job.generation,
            result: Err("Error: Unable to generate image".into()),
        });
        assert!(matches!(session.lifecycle(), Lifecycle::Failed(_)));

        // Lifecycle is re-submittable, not stuck
        let job = session.begin_submit().expect("resubmit accepted");
        assert!(session.lifecycle().is_loading());
        session.finish(GenerateCompletion {
            generation: job.generation,
            result: Ok(vec![1, 2, 3]),
        });
        assert!(matches!(session.lifecycle(), Lifecycle::Succeeded(_)));
    }

    #[test]
    fn result_binds_percentage_confirmed_at_submit() {
        let mut session = GenerateSession::default();
        session.select_kind(Some(MapKind::PhaseMap));
        session.set_percent_text("25");
        let job = session.begin_submit().expect("submit accepted");
        assert_eq!(job.percentage, 25.0);

        // Editing the field while the request is outstanding must not
        // change what the result reports.
        session.set_percent_text("40");
        session.finish(GenerateCompletion {
            generation: job.generation,
            result: Ok(vec![0xff]),
        });
        match session.lifecycle() {
            Lifecycle::Succeeded(image) => assert_eq!(image.percentage, 25.0),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn generate_submit_gated_on_validity() {
        let mut session = GenerateSession::default();
        session.select_kind(Some(MapKind::Kam));

        session.set_percent_text("61");
        assert!(!session.can_submit());
        assert!(session.begin_submit().is_none());

        session.set_percent_text("60");
        assert!(session.can_submit());
    }

    #[test]
    fn stale_generate_completion_is_dropped() {
        let mut session = GenerateSession::default();
        session.select_kind(Some(MapKind::Kam));
        session.set_percent_text("10");
        let job = session.begin_submit().expect("submit accepted");

        session.select_kind(None);
        session.finish(GenerateCompletion {
            generation: job.generation,
            result: Ok(vec![1]),
        });
        assert_eq!(*session.lifecycle(), Lifecycle::Idle);
    }
}
