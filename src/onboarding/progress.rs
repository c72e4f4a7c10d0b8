//! Setup progress reporting.

use crate::onboarding::model::BusinessField;

/// Answered-over-total setup progress. Once the assistant signals setup
/// completion the percentage saturates at 100 regardless of the counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub setup_complete: bool,
}

impl Progress {
    pub fn measure(fields: &[BusinessField], setup_complete: bool) -> Self {
        Self {
            answered: fields.iter().filter(|f| f.is_answered).count(),
            total: fields.len(),
            setup_complete,
        }
    }

    pub fn percent(&self) -> u8 {
        if self.setup_complete {
            return 100;
        }
        if self.total == 0 {
            return 0;
        }
        ((self.answered * 100) / self.total).min(100) as u8
    }
}
