// src/upload.rs

/// Stan wysyłki obrazu w jednym formularzu.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading { key: String, progress: f64 },
    Complete { url: String },
    /// `progress` zostaje na ostatniej zgłoszonej wartości.
    Failed { progress: f64, message: String },
}

impl UploadState {
    pub fn progress(&self) -> f64 {
        match self {
            UploadState::Idle => 0.0,
            UploadState::Uploading { progress, .. } | UploadState::Failed { progress, .. } => {
                *progress
            }
            UploadState::Complete { .. } => 100.0,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadState::Uploading { .. })
    }
}

/// Bilet wydawany przy starcie wysyłki. Zdarzenia ze starszej generacji są ignorowane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadTracker {
    state: UploadState,
    generation: u64,
}

impl Default for UploadTracker {
    fn default() -> Self {
        Self {
            state: UploadState::Idle,
            generation: 0,
        }
    }
}

impl UploadTracker {
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    /// Idle/Complete/Failed -> Uploading. Zwraca `None`, jeśli inna wysyłka trwa.
    pub fn start(&mut self, key: String) -> Option<UploadTicket> {
        if self.state.is_in_flight() {
            return None;
        }
        self.generation += 1;
        self.state = UploadState::Uploading { key, progress: 0.0 };
        Some(UploadTicket {
            generation: self.generation,
        })
    }

    fn is_current(&self, ticket: UploadTicket) -> bool {
        ticket.generation == self.generation && self.state.is_in_flight()
    }

    /// Uploading -> Uploading. Postęp nigdy nie maleje i nie przekracza 100.
    pub fn report(&mut self, ticket: UploadTicket, sent: u64, total: u64) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let pct = if total == 0 {
            0.0
        } else {
            (sent as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        if let UploadState::Uploading { progress, .. } = &mut self.state {
            if pct > *progress {
                *progress = pct;
            }
        }
        true
    }

    /// Uploading -> Complete.
    pub fn complete(&mut self, ticket: UploadTicket, url: String) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state = UploadState::Complete { url };
        true
    }

    /// Uploading -> Failed.
    pub fn fail(&mut self, ticket: UploadTicket, message: String) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let progress = self.state.progress();
        self.state = UploadState::Failed { progress, message };
        true
    }

    /// Powrót do Idle; trwająca wysyłka zostaje osierocona.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = UploadState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let mut tracker = UploadTracker::default();
        let ticket = tracker.start("images/1a.jpg".into()).unwrap();

        let mut seen = vec![tracker.progress()];
        for (sent, total) in [(10, 100), (50, 100), (30, 100), (100, 100)] {
            tracker.report(ticket, sent, total);
            seen.push(tracker.progress());
        }
        assert!(tracker.complete(ticket, "https://img/1a.jpg".into()));
        seen.push(tracker.progress());

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(seen.last().copied(), Some(100.0));
        assert_eq!(
            tracker.state(),
            &UploadState::Complete {
                url: "https://img/1a.jpg".into()
            }
        );
    }

    #[test]
    fn second_start_while_uploading_is_rejected() {
        let mut tracker = UploadTracker::default();
        assert!(tracker.start("images/1a.jpg".into()).is_some());
        assert!(tracker.start("images/2b.jpg".into()).is_none());
    }

    #[test]
    fn failure_keeps_last_progress_and_allows_retry() {
        let mut tracker = UploadTracker::default();
        let ticket = tracker.start("images/1a.jpg".into()).unwrap();
        tracker.report(ticket, 40, 100);
        assert!(tracker.fail(ticket, "timeout".into()));
        assert_eq!(tracker.progress(), 40.0);

        let retry = tracker.start("images/2a.jpg".into()).unwrap();
        assert_ne!(retry, ticket);
        assert_eq!(tracker.progress(), 0.0);
    }

    #[test]
    fn events_from_a_stale_ticket_are_ignored() {
        let mut tracker = UploadTracker::default();
        let old = tracker.start("images/1a.jpg".into()).unwrap();
        tracker.reset();
        assert!(!tracker.report(old, 50, 100));
        assert!(!tracker.complete(old, "https://img/late.jpg".into()));
        assert_eq!(tracker.state(), &UploadState::Idle);
    }

    #[test]
    fn zero_length_total_does_not_divide_by_zero() {
        let mut tracker = UploadTracker::default();
        let ticket = tracker.start("images/empty".into()).unwrap();
        tracker.report(ticket, 0, 0);
        assert_eq!(tracker.progress(), 0.0);
    }
}
