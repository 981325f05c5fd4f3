//! Hover focus on a collision group, derived without touching the base
//! layout.
//!
//! The focused member widens to `focus_width_percent` of the column and
//! its siblings collapse into narrow strips to its right. Dropping the
//! focus is just calling [`focus_frames`] with `None`.

use std::fmt;

use serde::Serialize;

use crate::config::LayoutMetrics;
use crate::layout::{Placement, WeekLayout};
use crate::order::{COLLISION_Z, FOCUSED_Z};

/// A horizontal length: percent of the day column plus fixed pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Span {
    pub percent: f64,
    pub pixels: f64,
}

impl Span {
    pub fn percent(percent: f64) -> Self {
        Self {
            percent,
            pixels: 0.0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.percent == 0.0, self.pixels == 0.0) {
            (_, true) => write!(f, "{}%", trim_number(self.percent)),
            (true, false) => write!(f, "{}px", trim_number(self.pixels)),
            (false, false) => write!(
                f,
                "{}%+{}px",
                trim_number(self.percent),
                trim_number(self.pixels)
            ),
        }
    }
}

pub(crate) fn trim_number(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub entry_id: String,
    pub left: Span,
    pub width: Span,
    pub dimmed: bool,
    pub z_index: u32,
}

impl Frame {
    fn base(placement: &Placement) -> Self {
        Self {
            entry_id: placement.entry_id.clone(),
            left: Span::percent(placement.offset_percent),
            width: Span::percent(placement.width_percent),
            dimmed: false,
            z_index: placement.draw.z_index,
        }
    }
}

/// One frame per placement, in draw order.
pub fn focus_frames(layout: &WeekLayout, focused: Option<&str>, metrics: &LayoutMetrics) -> Vec<Frame> {
    let target = focused
        .and_then(|id| layout.placement(id))
        .and_then(|p| p.collision.map(|slot| (slot.key, p.is_blocked)));

    layout
        .placements
        .iter()
        .map(|placement| {
            let mut frame = Frame::base(placement);
            let Some((key, is_blocked)) = target else {
                return frame;
            };
            let Some(slot) = placement.collision else {
                return frame;
            };
            if slot.key != key || placement.is_blocked != is_blocked {
                return frame;
            }

            if Some(placement.entry_id.as_str()) == focused {
                frame.left = Span::percent(0.0);
                frame.width = Span::percent(metrics.focus_width_percent);
                frame.z_index = FOCUSED_Z;
            } else {
                frame.left = Span {
                    percent: metrics.focus_width_percent,
                    pixels: slot.index as f64 * metrics.sibling_strip_step,
                };
                frame.width = Span {
                    percent: 0.0,
                    pixels: metrics.sibling_strip_width,
                };
                frame.dimmed = true;
                frame.z_index = COLLISION_Z;
            }
            frame
        })
        .collect()
}
