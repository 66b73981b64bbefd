use std::time::Duration;

use crate::domain::response::RequestOutcome;

/// Totals for one run over a request file.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Labels of failed descriptors, in file order.
    pub failed_labels: Vec<String>,
    /// Descriptors never reached because the run was interrupted.
    pub not_attempted: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
    sent: usize,
}

impl RunSummary {
    pub fn from_outcomes(
        total: usize,
        outcomes: &[RequestOutcome],
        interrupted: bool,
        elapsed: Duration,
    ) -> Self {
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        let failed_labels: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.label.clone())
            .collect();
        RunSummary {
            total,
            successful,
            failed: failed_labels.len(),
            failed_labels,
            not_attempted: total.saturating_sub(outcomes.len()),
            interrupted,
            elapsed,
            sent: outcomes.iter().filter(|o| o.was_sent()).count(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        !self.interrupted && self.successful == self.total
    }

    /// Mean wall time per request that actually went out, `None` when nothing
    /// was sent.
    pub fn average_per_request(&self) -> Option<Duration> {
        if self.sent == 0 {
            None
        } else {
            Some(self.elapsed / self.sent as u32)
        }
    }
}
