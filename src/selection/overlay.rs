//! Full-screen translucent overlay for drag-selecting a region.
//!
//! Pointer and keyboard input from egui is translated into
//! [`SelectionEvent`]s; the overlay closes itself as soon as the state
//! machine reaches a terminal state.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use eframe::egui::{self, Color32, Pos2, Stroke};

use super::state::{Rect, SelectionEvent, SelectionState};
use super::RegionProvider;

const HINT_TEXT: &str = "Drag with the mouse to select the capture region\nPress ESC to cancel";

/// Interactive region provider backed by an eframe window.
#[derive(Debug, Default)]
pub struct OverlaySelector;

impl RegionProvider for OverlaySelector {
    fn select_region(&mut self) -> Result<Option<Rect>> {
        let shared = Rc::new(Cell::new(SelectionState::Idle));
        let app_state = Rc::clone(&shared);

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("Select region")
                .with_fullscreen(true)
                .with_decorations(false)
                .with_transparent(true)
                .with_always_on_top(),
            ..Default::default()
        };

        eframe::run_native(
            "Select region",
            options,
            Box::new(move |_cc| Ok(Box::new(OverlayApp::new(app_state)))),
        )
        .map_err(|e| anyhow!("Selection overlay failed: {}", e))?;

        Ok(shared.get().result())
    }
}

struct OverlayApp {
    state: Rc<Cell<SelectionState>>,
}

impl OverlayApp {
    fn new(state: Rc<Cell<SelectionState>>) -> Self {
        Self { state }
    }

    /// Reads this frame's input and converts it into selector events.
    fn collect_events(ctx: &egui::Context) -> Vec<SelectionEvent> {
        ctx.input(|i| {
            let mut events = Vec::new();
            let ppp = i.pixels_per_point();
            let origin = i
                .viewport()
                .inner_rect
                .map(|r| r.min)
                .unwrap_or(Pos2::ZERO);

            if i.key_pressed(egui::Key::Escape) || i.viewport().close_requested() {
                events.push(SelectionEvent::Cancel);
                return events;
            }

            let Some(pos) = i.pointer.interact_pos() else {
                return events;
            };
            let (x, y) = to_screen_pixels(pos, origin, ppp);

            if i.pointer.primary_pressed() {
                events.push(SelectionEvent::PointerDown { x, y });
            }
            if i.pointer.is_moving() && i.pointer.primary_down() {
                events.push(SelectionEvent::PointerMove { x, y });
            }
            if i.pointer.primary_released() {
                events.push(SelectionEvent::PointerUp { x, y });
            }
            events
        })
    }

    fn paint(&self, ctx: &egui::Context) {
        let ppp = ctx.pixels_per_point();
        let origin = ctx
            .input(|i| i.viewport().inner_rect.map(|r| r.min))
            .unwrap_or(Pos2::ZERO);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_black_alpha(77)))
            .show(ctx, |ui| {
                let painter = ui.painter();
                let screen = ui.max_rect();

                painter.text(
                    Pos2::new(screen.center().x, screen.top() + 30.0),
                    egui::Align2::CENTER_TOP,
                    HINT_TEXT,
                    egui::FontId::proportional(16.0),
                    Color32::WHITE,
                );

                if let Some(rect) = self.state.get().preview() {
                    let min = Pos2::new(rect.x as f32 / ppp, rect.y as f32 / ppp) - origin.to_vec2();
                    let size = egui::vec2(rect.width as f32 / ppp, rect.height as f32 / ppp);
                    painter.rect_stroke(
                        egui::Rect::from_min_size(min, size),
                        0.0,
                        Stroke::new(2.0, Color32::RED),
                    );
                }
            });
    }
}

/// Converts a position in window points to absolute screen pixels.
fn to_screen_pixels(pos: Pos2, origin: Pos2, pixels_per_point: f32) -> (u32, u32) {
    let x = ((pos.x + origin.x) * pixels_per_point).round().max(0.0) as u32;
    let y = ((pos.y + origin.y) * pixels_per_point).round().max(0.0) as u32;
    (x, y)
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut state = self.state.get();
        for event in Self::collect_events(ctx) {
            state = state.handle(event);
        }
        self.state.set(state);

        if state.is_terminal() {
            match state {
                SelectionState::Completed(rect) => {
                    crate::log(&format!("Overlay: selected {}", rect))
                }
                _ => crate::log("Overlay: selection cancelled"),
            }
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.paint(ctx);
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_screen_pixels_scales_and_offsets() {
        assert_eq!(to_screen_pixels(Pos2::new(10.0, 20.0), Pos2::ZERO, 1.0), (10, 20));
        assert_eq!(to_screen_pixels(Pos2::new(10.0, 20.0), Pos2::ZERO, 1.5), (15, 30));
        assert_eq!(
            to_screen_pixels(Pos2::new(10.0, 20.0), Pos2::new(100.0, 0.0), 2.0),
            (220, 40)
        );
    }

    #[test]
    fn test_to_screen_pixels_clamps_negative() {
        assert_eq!(to_screen_pixels(Pos2::new(-5.0, 3.0), Pos2::ZERO, 1.0), (0, 3));
    }
}
