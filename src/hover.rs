//! Hover and pin state for marker popups.
//!
//! A popup opens while the pointer rests on its marker, survives the short
//! trip from marker to popup, and closes once the pointer has been away for
//! `close_delay`. Clicking a marker pins its popup until it is explicitly
//! closed.
//!
//! Time is passed in by the caller. The machine never sleeps or spawns; the
//! host calls [`HoverMachine::poll`] from its frame or timer callback to let
//! a pending close fire.

use std::time::{Duration, Instant};

use log::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverState<K> {
    Closed,
    /// Popup open because the pointer is over the marker or popup
    Hovering(K),
    /// Popup opened by a click; ignores hover events
    Pinned(K),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEvent<K> {
    MarkerEnter(K),
    MarkerLeave(K),
    PopupEnter,
    PopupLeave,
    MarkerClick(K),
    PopupCloseClicked,
}

/// What the host should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome<K> {
    Unchanged,
    /// Show the popup for this marker (replacing any other)
    Opened(K),
    Pinned(K),
    Closed,
}

#[derive(Debug, Clone)]
pub struct HoverMachine<K> {
    state: HoverState<K>,
    pending_close: Option<Instant>,
    close_delay: Duration,
}

impl<K: Clone + PartialEq> HoverMachine<K> {
    pub fn new(close_delay: Duration) -> Self {
        Self {
            state: HoverState::Closed,
            pending_close: None,
            close_delay,
        }
    }

    pub fn state(&self) -> &HoverState<K> {
        &self.state
    }

    /// Marker whose popup is open, hovered or pinned.
    pub fn active(&self) -> Option<&K> {
        match &self.state {
            HoverState::Closed => None,
            HoverState::Hovering(k) | HoverState::Pinned(k) => Some(k),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self.state, HoverState::Pinned(_))
    }

    /// When a scheduled close will fire, if one is pending.
    pub fn close_deadline(&self) -> Option<Instant> {
        self.pending_close
    }

    /// Apply one UI event observed at `now`.
    ///
    /// # Example
    /// ```
    /// use std::time::{Duration, Instant};
    /// use spatial_grouping::{HoverEvent, HoverMachine, HoverOutcome};
    ///
    /// let mut hover = HoverMachine::new(Duration::from_millis(300));
    /// let t0 = Instant::now();
    ///
    /// assert_eq!(hover.handle(HoverEvent::MarkerEnter("a"), t0), HoverOutcome::Opened("a"));
    /// hover.handle(HoverEvent::MarkerLeave("a"), t0);
    /// // Reaching the popup in time keeps it open
    /// hover.handle(HoverEvent::PopupEnter, t0 + Duration::from_millis(100));
    /// assert_eq!(hover.poll(t0 + Duration::from_secs(1)), HoverOutcome::Unchanged);
    /// ```
    pub fn handle(&mut self, event: HoverEvent<K>, now: Instant) -> HoverOutcome<K> {
        // A due close fires before anything that happens after it
        if let HoverOutcome::Closed = self.poll(now) {
            let outcome = self.apply(event, now);
            return match outcome {
                HoverOutcome::Unchanged => HoverOutcome::Closed,
                other => other,
            };
        }
        self.apply(event, now)
    }

    /// Fire a pending close whose deadline has passed.
    pub fn poll(&mut self, now: Instant) -> HoverOutcome<K> {
        match self.pending_close {
            Some(deadline) if now >= deadline => {
                trace!("[HoverMachine] delayed close fired");
                self.close()
            }
            _ => HoverOutcome::Unchanged,
        }
    }

    fn apply(&mut self, event: HoverEvent<K>, now: Instant) -> HoverOutcome<K> {
        match (&self.state, event) {
            (_, HoverEvent::MarkerClick(key)) => {
                self.pending_close = None;
                self.state = HoverState::Pinned(key.clone());
                HoverOutcome::Pinned(key)
            }
            (HoverState::Pinned(_), HoverEvent::PopupCloseClicked) => self.close(),
            (HoverState::Pinned(_), _) => HoverOutcome::Unchanged,

            (HoverState::Closed, HoverEvent::MarkerEnter(key)) => {
                self.state = HoverState::Hovering(key.clone());
                HoverOutcome::Opened(key)
            }
            (HoverState::Closed, _) => HoverOutcome::Unchanged,

            (HoverState::Hovering(current), HoverEvent::MarkerEnter(key)) => {
                self.pending_close = None;
                if *current == key {
                    HoverOutcome::Unchanged
                } else {
                    self.state = HoverState::Hovering(key.clone());
                    HoverOutcome::Opened(key)
                }
            }
            (HoverState::Hovering(current), HoverEvent::MarkerLeave(key)) => {
                if *current == key {
                    self.schedule_close(now);
                }
                HoverOutcome::Unchanged
            }
            (HoverState::Hovering(_), HoverEvent::PopupEnter) => {
                self.pending_close = None;
                HoverOutcome::Unchanged
            }
            (HoverState::Hovering(_), HoverEvent::PopupLeave) => {
                self.schedule_close(now);
                HoverOutcome::Unchanged
            }
            (HoverState::Hovering(_), HoverEvent::PopupCloseClicked) => self.close(),
        }
    }

    fn schedule_close(&mut self, now: Instant) {
        self.pending_close = Some(now + self.close_delay);
    }

    fn close(&mut self) -> HoverOutcome<K> {
        self.pending_close = None;
        if matches!(self.state, HoverState::Closed) {
            return HoverOutcome::Unchanged;
        }
        self.state = HoverState::Closed;
        HoverOutcome::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(300);

    fn ms(t0: Instant, n: u64) -> Instant {
        t0 + Duration::from_millis(n)
    }

    #[test]
    fn test_enter_opens_and_leave_closes_after_delay() {
        let mut hover = HoverMachine::new(DELAY);
        let t0 = Instant::now();

        assert_eq!(hover.handle(HoverEvent::MarkerEnter(1), t0), HoverOutcome::Opened(1));
        assert_eq!(hover.handle(HoverEvent::MarkerLeave(1), ms(t0, 10)), HoverOutcome::Unchanged);
        assert_eq!(hover.close_deadline(), Some(ms(t0, 310)));

        assert_eq!(hover.poll(ms(t0, 200)), HoverOutcome::Unchanged);
        assert_eq!(hover.poll(ms(t0, 310)), HoverOutcome::Closed);
        assert_eq!(hover.state(), &HoverState::Closed);
        assert_eq!(hover.poll(ms(t0, 400)), HoverOutcome::Unchanged);
    }

    #[test]
    fn test_reentering_marker_cancels_close() {
        let mut hover = HoverMachine::new(DELAY);
        let t0 = Instant::now();

        hover.handle(HoverEvent::MarkerEnter(1), t0);
        hover.handle(HoverEvent::MarkerLeave(1), ms(t0, 10));
        hover.handle(HoverEvent::MarkerEnter(1), ms(t0, 100));

        assert_eq!(hover.close_deadline(), None);
        assert_eq!(hover.poll(ms(t0, 1000)), HoverOutcome::Unchanged);
        assert_eq!(hover.active(), Some(&1));
    }

    #[test]
    fn test_popup_leave_schedules_close() {
        let mut hover = HoverMachine::new(DELAY);
        let t0 = Instant::now();

        hover.handle(HoverEvent::MarkerEnter(1), t0);
        hover.handle(HoverEvent::MarkerLeave(1), ms(t0, 10));
        hover.handle(HoverEvent::PopupEnter, ms(t0, 50));
        hover.handle(HoverEvent::PopupLeave, ms(t0, 500));

        assert_eq!(hover.poll(ms(t0, 799)), HoverOutcome::Unchanged);
        assert_eq!(hover.poll(ms(t0, 800)), HoverOutcome::Closed);
    }

    #[test]
    fn test_hovering_another_marker_switches_popup() {
        let mut hover = HoverMachine::new(DELAY);
        let t0 = Instant::now();

        hover.handle(HoverEvent::MarkerEnter(1), t0);
        hover.handle(HoverEvent::MarkerLeave(1), ms(t0, 10));
        assert_eq!(hover.handle(HoverEvent::MarkerEnter(2), ms(t0, 20)), HoverOutcome::Opened(2));
        assert_eq!(hover.close_deadline(), None);

        // A stale leave from the old marker does not close the new popup
        hover.handle(HoverEvent::MarkerLeave(1), ms(t0, 30));
        assert_eq!(hover.close_deadline(), None);
    }

    #[test]
    fn test_event_after_deadline_sees_closed_state() {
        let mut hover = HoverMachine::new(DELAY);
        let t0 = Instant::now();

        hover.handle(HoverEvent::MarkerEnter(1), t0);
        hover.handle(HoverEvent::MarkerLeave(1), t0);
        // The close was due before the popup was reached
        assert_eq!(hover.handle(HoverEvent::PopupEnter, ms(t0, 400)), HoverOutcome::Closed);
        assert_eq!(hover.state(), &HoverState::Closed);
    }

    #[test]
    fn test_click_pins_and_ignores_hover() {
        let mut hover = HoverMachine::new(DELAY);
        let t0 = Instant::now();

        hover.handle(HoverEvent::MarkerEnter(1), t0);
        hover.handle(HoverEvent::MarkerLeave(1), ms(t0, 10));
        assert_eq!(hover.handle(HoverEvent::MarkerClick(1), ms(t0, 20)), HoverOutcome::Pinned(1));
        assert!(hover.is_pinned());

        assert_eq!(hover.poll(ms(t0, 1000)), HoverOutcome::Unchanged);
        assert_eq!(hover.handle(HoverEvent::MarkerEnter(2), ms(t0, 1000)), HoverOutcome::Unchanged);
        assert_eq!(hover.handle(HoverEvent::PopupLeave, ms(t0, 1000)), HoverOutcome::Unchanged);
        assert_eq!(hover.active(), Some(&1));

        assert_eq!(hover.handle(HoverEvent::MarkerClick(2), ms(t0, 1100)), HoverOutcome::Pinned(2));
        assert_eq!(hover.handle(HoverEvent::PopupCloseClicked, ms(t0, 1200)), HoverOutcome::Closed);
        assert_eq!(hover.state(), &HoverState::Closed);
    }

    #[test]
    fn test_closed_ignores_stray_events() {
        let mut hover: HoverMachine<u8> = HoverMachine::new(DELAY);
        let t0 = Instant::now();
        assert_eq!(hover.handle(HoverEvent::PopupLeave, t0), HoverOutcome::Unchanged);
        assert_eq!(hover.handle(HoverEvent::PopupCloseClicked, t0), HoverOutcome::Unchanged);
        assert_eq!(hover.handle(HoverEvent::MarkerLeave(3), t0), HoverOutcome::Unchanged);
    }
}
