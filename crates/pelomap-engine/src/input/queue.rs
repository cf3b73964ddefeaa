/// Input events the map understands, in surface (page) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Mouse wheel / trackpad scroll. Positive `delta_y` zooms out.
    Wheel { delta_y: f32 },
    /// A contact began. Only `button == 0` (primary) is used.
    PointerDown { id: i32, button: i16, x: f32, y: f32 },
    /// A contact moved.
    PointerMove { id: i32, x: f32, y: f32 },
    /// A contact ended.
    PointerUp { id: i32 },
    /// The platform took the contact away (scroll, palm rejection, ...).
    PointerCancel { id: i32 },
}

/// A queue of input events.
/// The host pushes events as they arrive; the map drains them once per frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    /// Push a new input event (called from JS via wasm-bindgen).
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain() {
        let mut q = InputQueue::new();
        q.push(InputEvent::PointerDown { id: 1, button: 0, x: 10.0, y: 20.0 });
        q.push(InputEvent::Wheel { delta_y: -120.0 });
        let events = q.drain();
        assert_eq!(events.len(), 2);
        assert!(q.drain().is_empty());
    }

    #[test]
    fn drain_preserves_order() {
        let mut q = InputQueue::new();
        q.push(InputEvent::PointerMove { id: 1, x: 1.0, y: 1.0 });
        q.push(InputEvent::PointerUp { id: 1 });
        let events = q.drain();
        assert!(matches!(events[0], InputEvent::PointerMove { .. }));
        assert_eq!(events[1], InputEvent::PointerUp { id: 1 });
    }
}
