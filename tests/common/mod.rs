//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::time::{Duration, Instant};

use patchbay_rs::editor::{EditorEvent, GraphEditor, PointerEvent, PointerPhase};
use egui::Pos2;

/// Upper bound for anything that waits on the worker thread
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Poll `check` until it yields a value or the timeout expires.
pub fn wait_for<T>(mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + test_timeout();
    while Instant::now() < deadline {
        if let Some(value) = check() {
            return Some(value);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    None
}

/// Press, move and release the mouse, returning what the editor emitted.
pub fn mouse_drag(editor: &mut GraphEditor, from: Pos2, to: Pos2) -> Vec<EditorEvent> {
    [
        PointerEvent::mouse(from, PointerPhase::Down),
        PointerEvent::mouse(from + (to - from) * 0.5, PointerPhase::Move),
        PointerEvent::mouse(to, PointerPhase::Move),
        PointerEvent::mouse(to, PointerPhase::Up),
    ]
    .into_iter()
    .filter_map(|event| editor.handle_pointer(event))
    .collect()
}
