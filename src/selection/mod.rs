//! Region selection.
//!
//! This module provides:
//! - The drag-selection state machine (`SelectionState`)
//! - A full-screen overlay that drives it interactively (`OverlaySelector`)
//! - Non-interactive providers for command-line regions and tests

pub mod overlay;
pub mod state;

use anyhow::Result;

pub use overlay::OverlaySelector;
pub use state::Rect;

/// Something that yields the region to capture.
///
/// Returns `Ok(None)` when the user cancels.
pub trait RegionProvider {
    fn select_region(&mut self) -> Result<Option<Rect>>;
}

/// Always returns the same region (from `--region`).
#[derive(Debug, Clone, Copy)]
pub struct FixedRegion(pub Rect);

impl RegionProvider for FixedRegion {
    fn select_region(&mut self) -> Result<Option<Rect>> {
        Ok(Some(self.0))
    }
}

#[cfg(test)]
pub use scripted::ScriptedSelector;


#[cfg(test)]
mod tests {
    use super::state::SelectionEvent;
    use super::*;

    #[test]
    fn test_scripted_selector_completes() {
        let mut selector = ScriptedSelector::new(vec![
            SelectionEvent::PointerDown { x: 150, y: 120 },
            SelectionEvent::PointerMove { x: 90, y: 90 },
            SelectionEvent::PointerUp { x: 50, y: 50 },
        ]);
        assert_eq!(
            selector.select_region().unwrap(),
            Some(Rect::new(50, 50, 100, 70))
        );
    }

    #[test]
    fn test_scripted_selector_cancel() {
        let mut selector = ScriptedSelector::new(vec![
            SelectionEvent::PointerDown { x: 1, y: 1 },
            SelectionEvent::Cancel,
        ]);
        assert_eq!(selector.select_region().unwrap(), None);
    }

    #[test]
    fn test_scripted_selector_runs_out_of_events() {
        let mut selector = ScriptedSelector::new(vec![SelectionEvent::PointerDown { x: 1, y: 1 }]);
        assert_eq!(selector.select_region().unwrap(), None);
    }

    #[test]
    fn test_fixed_region() {
        let rect = Rect::new(0, 0, 640, 480);
        assert_eq!(FixedRegion(rect).select_region().unwrap(), Some(rect));
    }
}
