use std::time::{Duration, Instant};

/// Tracks when an action should fire after a period of inactivity
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// How long to wait after the last event
    delay: Duration,
    last_event: Option<Instant>,
    pending: bool,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_event: None,
            pending: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Register that an event occurred
    pub fn trigger(&mut self) {
        self.trigger_at(Instant::now());
    }

    pub fn trigger_at(&mut self, now: Instant) {
        self.last_event = Some(now);
        self.pending = true;
    }

    /// True once the delay has passed since the last event. Firing clears
    /// the pending state.
    pub fn should_execute(&mut self) -> bool {
        self.should_execute_at(Instant::now())
    }

    pub fn should_execute_at(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }

        if let Some(last) = self.last_event {
            if now.saturating_duration_since(last) >= self.delay {
                self.pending = false;
                self.last_event = None;
                return true;
            }
        }
        false
    }

    /// Time left before the pending action fires; None when nothing is pending
    pub fn time_remaining(&self) -> Option<Duration> {
        if !self.pending {
            return None;
        }

        self.last_event.map(|last| {
            let elapsed = last.elapsed();
            if elapsed >= self.delay {
                Duration::from_millis(0)
            } else {
                self.delay - elapsed
            }
        })
    }

    /// Cancel any pending action
    pub fn reset(&mut self) {
        self.last_event = None;
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Debounced search box input.
///
/// Keystrokes replace the pending term and restart the delay. A settled term
/// equal to the last applied one is swallowed.
#[derive(Debug, Clone)]
pub struct SearchInput {
    debouncer: Debouncer,
    pending: Option<String>,
    last_applied: String,
}

impl SearchInput {
    pub fn new(delay_ms: u64, current_term: &str) -> Self {
        Self {
            debouncer: Debouncer::new(delay_ms),
            pending: None,
            last_applied: current_term.to_string(),
        }
    }

    pub fn input(&mut self, term: &str) {
        self.input_at(term, Instant::now());
    }

    pub fn input_at(&mut self, term: &str, now: Instant) {
        self.pending = Some(term.to_string());
        self.debouncer.trigger_at(now);
    }

    /// The settled term, if the delay has passed and it differs from the
    /// last applied term
    pub fn take_ready(&mut self) -> Option<String> {
        self.take_ready_at(Instant::now())
    }

    pub fn take_ready_at(&mut self, now: Instant) -> Option<String> {
        if !self.debouncer.should_execute_at(now) {
            return None;
        }
        let term = self.pending.take()?;
        if term == self.last_applied {
            return None;
        }
        Some(term)
    }

    /// Record a term that reached the table, typed or set directly
    pub fn mark_applied(&mut self, term: &str) {
        if self.pending.as_deref() == Some(term) {
            self.pending = None;
            self.debouncer.reset();
        }
        self.last_applied = term.to_string();
    }

    pub fn last_applied(&self) -> &str {
        &self.last_applied
    }

    pub fn pending_term(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        self.debouncer.time_remaining()
    }
}
