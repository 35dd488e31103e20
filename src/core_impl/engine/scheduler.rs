use super::*;

/// Minimal interval between two throttled apply passes.
pub(crate) const THROTTLE_DELAY_MS: u64 = 150;

/// Attribute mutations this close to a hover-like event are not worth a pass.
const LAST_EVENT_TIMEOUT_MS: u64 = 10;

const IGNORED_EVENTS: [&str; 4] = ["mouseover", "mouseleave", "mouseenter", "mouseout"];

const SUPPORTED_EVENTS: [&str; 18] = [
    "keydown",
    "keypress",
    "keyup",
    "auxclick",
    "click",
    "contextmenu",
    "dblclick",
    "mousedown",
    "mouseenter",
    "mouseleave",
    "mousemove",
    "mouseover",
    "mouseout",
    "mouseup",
    "pointerlockchange",
    "pointerlockerror",
    "select",
    "wheel",
];

/// Coalesces apply requests into at most one pass per [`THROTTLE_DELAY_MS`].
#[derive(Debug, Clone, Default)]
pub(crate) struct ThrottleWrapper {
    last_run_ms: Option<u64>,
    due_at_ms: Option<u64>,
}

impl ThrottleWrapper {
    /// Requests a pass. Ignored while one is pending; otherwise scheduled for
    /// the next tick, or for the end of the interval when the last pass ran
    /// too recently.
    pub(crate) fn run(&mut self, now_ms: u64) {
        if self.due_at_ms.is_some() {
            log::debug!("[scheduler] pass already pending");
            return;
        }
        if let Some(last_run_ms) = self.last_run_ms {
            let elapsed = now_ms.saturating_sub(last_run_ms);
            if elapsed < THROTTLE_DELAY_MS {
                let due_at_ms = now_ms + (THROTTLE_DELAY_MS - elapsed);
                log::debug!("[scheduler] deferred to {due_at_ms}ms");
                self.due_at_ms = Some(due_at_ms);
                return;
            }
        }
        self.due_at_ms = Some(now_ms);
    }

    /// Consumes the pending pass when its deadline has come.
    pub(crate) fn take_due(&mut self, now_ms: u64) -> bool {
        match self.due_at_ms {
            Some(due_at_ms) if due_at_ms <= now_ms => {
                self.due_at_ms = None;
                self.last_run_ms = Some(now_ms);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn pending_deadline(&self) -> Option<u64> {
        self.due_at_ms
    }

    pub(crate) fn cancel(&mut self) {
        self.due_at_ms = None;
    }
}

/// Tells hover-driven attribute churn apart from real document changes.
#[derive(Debug, Clone)]
pub(crate) struct EventTracker {
    tracked_events: Vec<&'static str>,
    tracking_since_ms: Option<u64>,
}

impl Default for EventTracker {
    fn default() -> Self {
        Self {
            tracked_events: SUPPORTED_EVENTS.to_vec(),
            tracking_since_ms: None,
        }
    }
}

impl EventTracker {
    pub(crate) fn start_tracking(&mut self, now_ms: u64) {
        if self.tracking_since_ms.is_none() {
            self.tracking_since_ms = Some(now_ms);
        }
    }

    pub(crate) fn stop_tracking(&mut self) {
        self.tracking_since_ms = None;
    }

    /// True when the last tracked event is hover-like and happened less than
    /// [`LAST_EVENT_TIMEOUT_MS`] ago.
    pub(crate) fn is_ignored_event_type(&self, last_event: Option<&InputEvent>, now_ms: u64) -> bool {
        let (Some(event), Some(since_ms)) = (last_event, self.tracking_since_ms) else {
            return false;
        };
        if event.time_ms < since_ms {
            return false;
        }
        let event_type = event.event_type.as_str();
        if !self.tracked_events.contains(&event_type) || !IGNORED_EVENTS.contains(&event_type) {
            return false;
        }
        now_ms.saturating_sub(event.time_ms) < LAST_EVENT_TIMEOUT_MS
    }
}

/// Whether every record is an attribute change, i.e. nothing was added or removed.
pub(crate) fn only_attribute_mutations<N>(records: &[&MutationRecord<N>]) -> bool {
    records.iter().all(|record| record.is_attribute())
}
