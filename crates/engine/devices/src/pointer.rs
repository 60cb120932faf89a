//! Pointer and touch input
//!
//! Raw pointer events from mouse, pen, and touch are reduced to pick triggers:
//! a continuous hover check and a discrete tap. Mouse move maps to hover and
//! click to tap. On touch devices a finger move never hovers, and lifting the
//! finger without dragging is a tap that also ends the hover.

use glam::Vec2;

/// Source device of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// Pointer event phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    /// A button was pressed or a finger touched the screen
    Down,
    /// The pointer moved
    Move,
    /// A button was released or a finger was lifted
    Up,
    /// The touch was cancelled (e.g., by a system gesture)
    Cancel,
    /// The pointer left the view
    Leave,
}

/// A single pointer event in viewport pixels (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Identifier for multi-touch tracking; mice use 0
    pub id: u64,
    pub kind: PointerKind,
    pub phase: PointerPhase,
    pub position: Vec2,
}

impl PointerEvent {
    pub fn new(id: u64, kind: PointerKind, phase: PointerPhase, position: Vec2) -> Self {
        Self {
            id,
            kind,
            phase,
            position,
        }
    }

    pub fn mouse(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self::new(0, PointerKind::Mouse, phase, Vec2::new(x, y))
    }

    pub fn touch(id: u64, phase: PointerPhase, x: f32, y: f32) -> Self {
        Self::new(id, PointerKind::Touch, phase, Vec2::new(x, y))
    }
}

/// What the picking system should do in response to pointer input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickTrigger {
    /// Update hover state at this position
    Hover(Vec2),
    /// Select whatever lies at this position
    Tap(Vec2),
    /// The pointer is gone; clear hover state
    ClearHover,
}

#[derive(Debug, Clone, Copy)]
struct ActivePress {
    id: u64,
    start: Vec2,
    travel: f32,
}

/// Reduces pointer events to pick triggers
///
/// Only the primary pointer participates; additional touches are ignored so a
/// pinch never selects a marker.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    /// Maximum travel in pixels for a press to count as a tap
    tap_slop: f32,
    press: Option<ActivePress>,
    last_position: Option<Vec2>,
}

impl PointerTracker {
    /// Create a tracker with the given tap slop in pixels
    pub fn new(tap_slop: f32) -> Self {
        Self {
            tap_slop,
            press: None,
            last_position: None,
        }
    }

    /// Last position the pointer was seen at
    pub fn last_position(&self) -> Option<Vec2> {
        self.last_position
    }

    /// Whether a press is in progress
    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    /// Feed one event, returning the pick triggers it produces
    ///
    /// Mouse and pen move are hover checks. A touch has no hover between
    /// contacts: the finger on the glass hovers where it lands, moving it only
    /// tracks travel, and lifting it taps and clears the hover.
    pub fn handle(&mut self, event: PointerEvent) -> Vec<PickTrigger> {
        let touch = event.kind == PointerKind::Touch;
        match event.phase {
            PointerPhase::Down => {
                if self.press.is_some() {
                    return Vec::new();
                }
                self.press = Some(ActivePress {
                    id: event.id,
                    start: event.position,
                    travel: 0.0,
                });
                self.last_position = Some(event.position);
                if touch {
                    vec![PickTrigger::Hover(event.position)]
                } else {
                    Vec::new()
                }
            }
            PointerPhase::Move => {
                if let Some(press) = self.press.as_mut() {
                    if press.id != event.id {
                        return Vec::new();
                    }
                    press.travel = press.travel.max(press.start.distance(event.position));
                }
                self.last_position = Some(event.position);
                if touch {
                    Vec::new()
                } else {
                    vec![PickTrigger::Hover(event.position)]
                }
            }
            PointerPhase::Up => {
                let press = match self.press {
                    Some(press) if press.id == event.id => press,
                    // Mouse up without a tracked press (e.g. pressed outside the view)
                    _ => return Vec::new(),
                };
                self.press = None;

                let mut triggers = Vec::with_capacity(2);
                let travel = press.travel.max(press.start.distance(event.position));
                if travel <= self.tap_slop {
                    triggers.push(PickTrigger::Tap(event.position));
                }
                if touch {
                    self.last_position = None;
                    triggers.push(PickTrigger::ClearHover);
                } else {
                    self.last_position = Some(event.position);
                }
                triggers
            }
            PointerPhase::Cancel | PointerPhase::Leave => {
                if matches!(self.press, Some(p) if p.id != event.id) {
                    return Vec::new();
                }
                self.press = None;
                self.last_position = None;
                vec![PickTrigger::ClearHover]
            }
        }
    }

    /// Forget all pointer state
    pub fn clear(&mut self) {
        self.press = None;
        self.last_position = None;
    }
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_move_is_hover() {
        let mut tracker = PointerTracker::default();
        let triggers = tracker.handle(PointerEvent::mouse(PointerPhase::Move, 10.0, 20.0));
        assert_eq!(triggers, [PickTrigger::Hover(Vec2::new(10.0, 20.0))]);
        assert_eq!(tracker.last_position(), Some(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn test_mouse_click_is_tap() {
        let mut tracker = PointerTracker::default();
        assert!(tracker
            .handle(PointerEvent::mouse(PointerPhase::Down, 50.0, 50.0))
            .is_empty());
        assert_eq!(
            tracker.handle(PointerEvent::mouse(PointerPhase::Up, 52.0, 51.0)),
            [PickTrigger::Tap(Vec2::new(52.0, 51.0))]
        );
        assert!(!tracker.is_pressed());
        // The mouse is still over the view
        assert_eq!(tracker.last_position(), Some(Vec2::new(52.0, 51.0)));
    }

    #[test]
    fn test_touch_move_does_not_hover() {
        let mut tracker = PointerTracker::default();
        assert_eq!(
            tracker.handle(PointerEvent::touch(1, PointerPhase::Down, 100.0, 100.0)),
            [PickTrigger::Hover(Vec2::new(100.0, 100.0))]
        );
        assert!(tracker
            .handle(PointerEvent::touch(1, PointerPhase::Move, 104.0, 100.0))
            .is_empty());
    }

    #[test]
    fn test_touch_end_taps_then_clears_hover() {
        let mut tracker = PointerTracker::default();
        tracker.handle(PointerEvent::touch(1, PointerPhase::Down, 100.0, 100.0));
        tracker.handle(PointerEvent::touch(1, PointerPhase::Move, 104.0, 100.0));

        let triggers = tracker.handle(PointerEvent::touch(1, PointerPhase::Up, 104.0, 100.0));
        assert_eq!(
            triggers,
            [
                PickTrigger::Tap(Vec2::new(104.0, 100.0)),
                PickTrigger::ClearHover
            ]
        );
        assert_eq!(tracker.last_position(), None);
    }

    #[test]
    fn test_drag_is_not_a_tap() {
        let mut tracker = PointerTracker::new(10.0);
        tracker.handle(PointerEvent::touch(1, PointerPhase::Down, 100.0, 100.0));
        tracker.handle(PointerEvent::touch(1, PointerPhase::Move, 160.0, 100.0));
        // Returning to the start does not undo the drag
        tracker.handle(PointerEvent::touch(1, PointerPhase::Move, 100.0, 100.0));
        assert_eq!(
            tracker.handle(PointerEvent::touch(1, PointerPhase::Up, 100.0, 100.0)),
            [PickTrigger::ClearHover]
        );
    }

    #[test]
    fn test_secondary_touch_ignored() {
        let mut tracker = PointerTracker::default();
        tracker.handle(PointerEvent::touch(1, PointerPhase::Down, 100.0, 100.0));
        assert!(tracker
            .handle(PointerEvent::touch(2, PointerPhase::Down, 200.0, 200.0))
            .is_empty());
        assert!(tracker
            .handle(PointerEvent::touch(2, PointerPhase::Move, 210.0, 200.0))
            .is_empty());
        assert!(tracker
            .handle(PointerEvent::touch(2, PointerPhase::Up, 210.0, 200.0))
            .is_empty());
        assert!(tracker.is_pressed());
    }

    #[test]
    fn test_cancel_clears_hover() {
        let mut tracker = PointerTracker::default();
        tracker.handle(PointerEvent::touch(1, PointerPhase::Down, 100.0, 100.0));
        assert_eq!(
            tracker.handle(PointerEvent::touch(1, PointerPhase::Cancel, 100.0, 100.0)),
            [PickTrigger::ClearHover]
        );
        assert!(!tracker.is_pressed());
        assert_eq!(tracker.last_position(), None);
    }
}
