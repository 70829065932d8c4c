//! Coarse task progress as displayed, and the tracker's per-tick decision.

use crate::model::{TaskProgress, TaskStatus};

/// Message shown when the backend reports `error` without any text.
const UNKNOWN_FAILURE: &str = "translation failed";

/// What the progress tracker should do after applying a status fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// Keep polling on the fixed cadence.
    Continue,
    /// Schedule one final block refresh, then stop polling.
    Finished,
    /// Stop polling and surface the message. No automatic retry.
    Failed(String),
}

/// Latest fetched progress, with no smoothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressView {
    /// Always within `[0, 1]`.
    pub fraction: f64,
    pub status: Option<TaskStatus>,
    pub error: Option<String>,
}

impl ProgressView {
    /// Replace the view with `fetched` and decide how polling continues.
    pub fn apply(&mut self, fetched: &TaskProgress) -> TrackerOutcome {
        self.fraction = fetched.fraction();
        self.status = Some(fetched.status.clone());
        match fetched.status {
            TaskStatus::Finished => {
                self.error = None;
                TrackerOutcome::Finished
            }
            TaskStatus::Error => {
                let message = fetched
                    .error
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_FAILURE.to_string());
                self.error = Some(message.clone());
                TrackerOutcome::Failed(message)
            }
            _ => {
                self.error = fetched.error.clone().filter(|m| !m.trim().is_empty());
                TrackerOutcome::Continue
            }
        }
    }

    /// Whole percent for gauges and labels.
    pub fn percent(&self) -> u16 {
        (self.fraction * 100.0).round() as u16
    }

    pub fn status_label(&self) -> &str {
        self.status.as_ref().map_or("—", TaskStatus::label)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(TaskStatus::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(progress: Option<f64>, status: &str, error: Option<&str>) -> TaskProgress {
        TaskProgress {
            progress,
            status: TaskStatus::from(status.to_string()),
            error: error.map(Into::into),
            direction: None,
        }
    }

    #[test]
    fn running_continues_and_clamps() {
        let mut view = ProgressView::default();
        assert_eq!(
            view.apply(&fetched(Some(1.4), "running", None)),
            TrackerOutcome::Continue
        );
        assert_eq!(view.fraction, 1.0);
        assert_eq!(view.percent(), 100);
        assert_eq!(view.status_label(), "running");
    }

    #[test]
    fn non_finite_displays_zero() {
        let mut view = ProgressView::default();
        view.apply(&fetched(Some(f64::NAN), "running", None));
        assert_eq!(view.fraction, 0.0);
        assert_eq!(view.percent(), 0);
    }

    #[test]
    fn latest_fetch_wins_without_smoothing() {
        let mut view = ProgressView::default();
        view.apply(&fetched(Some(0.8), "running", None));
        view.apply(&fetched(Some(0.3), "running", None));
        assert_eq!(view.fraction, 0.3);
    }

    #[test]
    fn finished_outcome() {
        let mut view = ProgressView::default();
        assert_eq!(
            view.apply(&fetched(Some(1.0), "finished", None)),
            TrackerOutcome::Finished
        );
        assert!(view.is_terminal());
    }

    #[test]
    fn error_outcome_surfaces_message() {
        let mut view = ProgressView::default();
        assert_eq!(
            view.apply(&fetched(Some(0.25), "error", Some("invalid api key"))),
            TrackerOutcome::Failed("invalid api key".into())
        );
        assert_eq!(view.error.as_deref(), Some("invalid api key"));
    }

    #[test]
    fn error_without_message_gets_placeholder() {
        let mut view = ProgressView::default();
        assert_eq!(
            view.apply(&fetched(None, "error", Some("  "))),
            TrackerOutcome::Failed(UNKNOWN_FAILURE.into())
        );
    }

    #[test]
    fn empty_view_label() {
        let view = ProgressView::default();
        assert_eq!(view.status_label(), "—");
        assert!(!view.is_terminal());
    }
}
