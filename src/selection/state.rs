//! Drag-selection state machine.
//!
//! Idle → Dragging → Completed(Rect) | Cancelled. Pointer positions are in
//! absolute screen pixels. The machine knows nothing about the toolkit that
//! feeds it events.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context};

/// A screen region in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the rectangle spanned by two corner points, in any order.
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: a.0.abs_diff(b.0),
            height: a.1.abs_diff(b.1),
        }
    }

    /// The part of this rectangle inside a `width`×`height` screen.
    ///
    /// Empty when the rectangle lies entirely off screen.
    pub fn clip_to(&self, width: u32, height: u32) -> Rect {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// True when width or height is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Rect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(anyhow!("expected X,Y,WIDTH,HEIGHT but got \"{}\"", s));
        }
        let mut values = [0u32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .with_context(|| format!("invalid region component \"{}\"", part))?;
        }
        Ok(Rect::new(values[0], values[1], values[2], values[3]))
    }
}

/// Input events driving the selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerDown { x: u32, y: u32 },
    PointerMove { x: u32, y: u32 },
    PointerUp { x: u32, y: u32 },
    Cancel,
}

/// Selector states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging {
        anchor: (u32, u32),
        current: (u32, u32),
    },
    Completed(Rect),
    Cancelled,
}

impl SelectionState {
    /// Applies one event and returns the next state.
    ///
    /// Terminal states absorb every event. Moves and releases without a
    /// preceding press are ignored.
    pub fn handle(self, event: SelectionEvent) -> Self {
        match (self, event) {
            (Self::Completed(_) | Self::Cancelled, _) => self,
            (_, SelectionEvent::Cancel) => Self::Cancelled,
            (Self::Idle, SelectionEvent::PointerDown { x, y }) => Self::Dragging {
                anchor: (x, y),
                current: (x, y),
            },
            (Self::Idle, _) => self,
            (Self::Dragging { anchor, .. }, SelectionEvent::PointerMove { x, y }) => {
                Self::Dragging {
                    anchor,
                    current: (x, y),
                }
            }
            (Self::Dragging { anchor, .. }, SelectionEvent::PointerUp { x, y }) => {
                Self::Completed(Rect::from_corners(anchor, (x, y)))
            }
            // A second press while dragging restarts from the new anchor.
            (Self::Dragging { .. }, SelectionEvent::PointerDown { x, y }) => Self::Dragging {
                anchor: (x, y),
                current: (x, y),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled)
    }

    /// The rectangle to draw as drag feedback.
    pub fn preview(&self) -> Option<Rect> {
        match self {
            Self::Dragging { anchor, current } => Some(Rect::from_corners(*anchor, *current)),
            _ => None,
        }
    }

    /// The final result: `Some(rect)` when completed, `None` otherwise.
    pub fn result(&self) -> Option<Rect> {
        match self {
            Self::Completed(rect) => Some(*rect),
            _ => None,
        }
    }
}
