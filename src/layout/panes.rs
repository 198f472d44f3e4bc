//! Fixed-pane synchronization.
//!
//! The left-fixed, main and right-fixed panes are separate scroll
//! containers on the host side that must move together vertically.
//! [`PaneSync`] turns native scroll events from any pane into one shared
//! scroll position plus the writes needed to bring the other panes in
//! line, and swallows the echo events those writes produce.

use serde::Serialize;

use crate::index::ColumnIndex;
use crate::types::{FixedSide, WindowState};

use super::PaneWidths;

/// Sub-pixel tolerance when matching an echoed scroll event
const ECHO_TOLERANCE_PX: f32 = 0.5;

/// One of the three synchronized body panes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Pane {
    Left,
    #[default]
    Main,
    Right,
}

impl Pane {
    pub const ALL: [Pane; 3] = [Pane::Left, Pane::Main, Pane::Right];

    fn slot(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Main => 1,
            Self::Right => 2,
        }
    }

    /// Fixed side this pane shows, `None` for main
    pub fn fixed_side(self) -> FixedSide {
        match self {
            Self::Left => FixedSide::Left,
            Self::Main => FixedSide::None,
            Self::Right => FixedSide::Right,
        }
    }
}

/// A scroll position the host must apply to a pane
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollWrite {
    pub pane: Pane,
    pub top: f32,
    /// Only set for the main pane
    pub left: Option<f32>,
}

/// Result of a scroll input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollUpdate {
    pub top: f32,
    pub left: f32,
    pub vertical: bool,
    pub horizontal: bool,
    /// Writes to perform in the same frame
    pub writes: Vec<ScrollWrite>,
}

/// Shared scroll position of the body panes
#[derive(Debug, Clone, Default)]
pub struct PaneSync {
    top: f32,
    left: f32,
    has_left: bool,
    has_right: bool,
    /// Last programmatic `top` written to each pane, awaiting its echo
    pending: [Option<f32>; 3],
}

impl PaneSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare which fixed panes exist
    pub fn set_panes(&mut self, has_left: bool, has_right: bool) {
        self.has_left = has_left;
        self.has_right = has_right;
        for pane in [Pane::Left, Pane::Right] {
            if !self.exists(pane) {
                self.forget_echo(pane);
            }
        }
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    /// Move the shared position without issuing writes (the engine
    /// clamped it after the content shrank). Pending echoes are dropped.
    pub fn reset(&mut self, top: f32, left: f32) {
        self.top = top;
        self.left = left;
        self.pending = [None; 3];
    }

    fn forget_echo(&mut self, pane: Pane) {
        if let Some(slot) = self.pending.get_mut(pane.slot()) {
            *slot = None;
        }
    }

    fn exists(&self, pane: Pane) -> bool {
        match pane {
            Pane::Left => self.has_left,
            Pane::Main => true,
            Pane::Right => self.has_right,
        }
    }

    /// A native scroll event from `pane`.
    ///
    /// Returns `None` when the event is the echo of a write this
    /// synchronizer issued (or changes nothing). `left` is ignored for
    /// fixed panes, which never scroll horizontally.
    pub fn on_scroll(&mut self, pane: Pane, top: f32, left: f32, max: (f32, f32)) -> Option<ScrollUpdate> {
        if let Some(expected) = self.pending.get_mut(pane.slot()).and_then(Option::take) {
            let echo = (expected - top).abs() <= ECHO_TOLERANCE_PX;
            if echo && (pane != Pane::Main || (left - self.left).abs() <= ECHO_TOLERANCE_PX) {
                return None;
            }
        }
        let left = if pane == Pane::Main { left } else { self.left };
        self.apply(top, left, Some(pane), max)
    }

    /// Wheel input over any pane; drives the shared position directly.
    pub fn on_wheel(&mut self, delta_x: f32, delta_y: f32, max: (f32, f32)) -> Option<ScrollUpdate> {
        self.apply(self.top + delta_y, self.left + delta_x, None, max)
    }

    /// Programmatic scroll (e.g. scroll-to-row)
    pub fn scroll_to(&mut self, top: f32, left: f32, max: (f32, f32)) -> Option<ScrollUpdate> {
        self.apply(top, left, None, max)
    }

    fn apply(&mut self, top: f32, left: f32, source: Option<Pane>, max: (f32, f32)) -> Option<ScrollUpdate> {
        let top = clamp(top, max.1);
        let left = clamp(left, max.0);
        let vertical = (top - self.top).abs() > f32::EPSILON;
        let horizontal = (left - self.left).abs() > f32::EPSILON;
        if !vertical && !horizontal {
            return None;
        }
        self.top = top;
        self.left = left;

        let mut writes = Vec::with_capacity(3);
        for pane in Pane::ALL {
            if !self.exists(pane) || Some(pane) == source {
                continue;
            }
            // Fixed panes only follow vertical movement
            if pane != Pane::Main && !vertical {
                continue;
            }
            if let Some(slot) = self.pending.get_mut(pane.slot()) {
                *slot = Some(top);
            }
            writes.push(ScrollWrite {
                pane,
                top,
                left: (pane == Pane::Main).then_some(left),
            });
        }
        Some(ScrollUpdate {
            top,
            left,
            vertical,
            horizontal,
            writes,
        })
    }
}

fn clamp(value: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, max.max(0.0))
    } else {
        0.0
    }
}

/// One column slot of a pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneColumn {
    /// Leaf position in the column index
    pub position: usize,
    /// Slot kept for geometry, content shown by another pane
    pub fixed_hidden: bool,
}

/// Whether fixed panes can list only their own columns.
///
/// Requires some form of windowing (or uniform clipped overflow) and no
/// feature that makes a cell in a fixed pane depend on foreign columns
/// (detail expand column, span callbacks).
pub fn is_optimize_mode(
    any_windowed: bool,
    all_clipped: bool,
    has_expand_column: bool,
    has_span_callback: bool,
) -> bool {
    (any_windowed || all_clipped) && !has_expand_column && !has_span_callback
}

/// Column slots rendered by `pane`.
///
/// The main pane lists left-fixed columns, the materialized part of the
/// scrollable columns (`center_window` indexes the scrollable strip) and
/// right-fixed columns; its fixed columns are hidden while there is
/// horizontal overflow. In optimize mode a fixed pane lists only its own
/// columns; otherwise it lists every leaf and hides the foreign ones.
pub fn pane_columns(
    columns: &ColumnIndex,
    center_window: &WindowState,
    pane: Pane,
    optimize: bool,
    overflow_x: bool,
) -> Vec<PaneColumn> {
    match pane {
        Pane::Main => {
            let center = columns.center_range();
            let window = center.start.saturating_add(center_window.start).min(center.end)
                ..center.start.saturating_add(center_window.end).min(center.end);
            columns
                .left_range()
                .chain(window)
                .chain(columns.right_range())
                .map(|position| PaneColumn {
                    position,
                    fixed_hidden: overflow_x
                        && columns.get(position).is_some_and(|c| c.is_fixed()),
                })
                .collect()
        }
        Pane::Left | Pane::Right => {
            let side = pane.fixed_side();
            if optimize {
                let range = if pane == Pane::Left {
                    columns.left_range()
                } else {
                    columns.right_range()
                };
                range
                    .map(|position| PaneColumn {
                        position,
                        fixed_hidden: false,
                    })
                    .collect()
            } else {
                columns
                    .leaves()
                    .iter()
                    .map(|c| PaneColumn {
                        position: c.order,
                        fixed_hidden: c.fixed != side,
                    })
                    .collect()
            }
        }
    }
}

/// Widths of the fixed strips and the scrollable strip
pub fn pane_widths(columns: &ColumnIndex) -> PaneWidths {
    let sum = |range: std::ops::Range<usize>| -> f32 {
        range
            .filter_map(|p| columns.get(p))
            .map(|c| c.width)
            .sum()
    };
    PaneWidths {
        left: sum(columns.left_range()),
        center: sum(columns.center_range()),
        right: sum(columns.right_range()),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::diagnostics::Diagnostics;
    use crate::types::{AxisMode, ColumnDescriptor};

    const MAX: (f32, f32) = (500.0, 1000.0);

    fn sync() -> PaneSync {
        let mut s = PaneSync::new();
        s.set_panes(true, true);
        s
    }

    #[test]
    fn test_main_scroll_updates_fixed_panes() {
        let mut s = sync();
        let update = s.on_scroll(Pane::Main, 120.0, 0.0, MAX).unwrap();
        assert!(update.vertical);
        let panes: Vec<Pane> = update.writes.iter().map(|w| w.pane).collect();
        assert_eq!(panes, [Pane::Left, Pane::Right]);
        assert!(update.writes.iter().all(|w| w.top == 120.0));
    }

    #[test]
    fn test_echo_is_swallowed() {
        let mut s = sync();
        s.on_scroll(Pane::Main, 120.0, 0.0, MAX).unwrap();
        assert!(s.on_scroll(Pane::Left, 120.0, 0.0, MAX).is_none());
        assert!(s.on_scroll(Pane::Right, 120.2, 0.0, MAX).is_none());
        // After the echo, a genuine fixed-pane scroll drives the main pane
        let update = s.on_scroll(Pane::Left, 200.0, 0.0, MAX).unwrap();
        let panes: Vec<Pane> = update.writes.iter().map(|w| w.pane).collect();
        assert_eq!(panes, [Pane::Main, Pane::Right]);
        assert_eq!(s.top(), 200.0);
    }

    #[test]
    fn test_horizontal_only_moves_main() {
        let mut s = sync();
        let update = s.on_wheel(80.0, 0.0, MAX).unwrap();
        assert!(update.horizontal);
        assert!(!update.vertical);
        assert_eq!(update.writes.len(), 1);
        assert_eq!(update.writes[0].pane, Pane::Main);
        assert_eq!(update.writes[0].left, Some(80.0));
        // Fixed panes never carry horizontal scroll
        assert!(s.on_scroll(Pane::Main, 0.0, 80.0, MAX).is_none());
        assert!(s.on_scroll(Pane::Left, 0.0, 300.0, MAX).is_none());
        assert_eq!(s.left(), 80.0);
    }

    #[test]
    fn test_scroll_clamped() {
        let mut s = sync();
        let update = s.scroll_to(5000.0, -10.0, MAX).unwrap();
        assert_eq!(update.top, 1000.0);
        assert_eq!(update.left, 0.0);
    }

    fn columns() -> ColumnIndex {
        let cols = vec![
            ColumnDescriptor::new("l").with_fixed(FixedSide::Left).with_width(50.0),
            ColumnDescriptor::new("a"),
            ColumnDescriptor::new("b"),
            ColumnDescriptor::new("c"),
            ColumnDescriptor::new("r").with_fixed(FixedSide::Right).with_width(70.0),
        ];
        ColumnIndex::build(&cols, &ColumnConfig::default(), 1, &mut Diagnostics::new())
    }

    #[test]
    fn test_pane_columns_optimize() {
        let cols = columns();
        let window = WindowState {
            mode: AxisMode::Windowed,
            len: 3,
            visible_start: 1,
            visible_end: 1,
            preload: 0,
            start: 1,
            end: 2,
        };
        let main = pane_columns(&cols, &window, Pane::Main, true, true);
        let positions: Vec<usize> = main.iter().map(|c| c.position).collect();
        assert_eq!(positions, [0, 2, 4]);
        assert!(main[0].fixed_hidden && !main[1].fixed_hidden && main[2].fixed_hidden);

        let left = pane_columns(&cols, &window, Pane::Left, true, true);
        assert_eq!(left, [PaneColumn { position: 0, fixed_hidden: false }]);

        let right = pane_columns(&cols, &window, Pane::Right, false, true);
        assert_eq!(right.len(), 5);
        assert_eq!(right.iter().filter(|c| !c.fixed_hidden).count(), 1);
    }

    #[test]
    fn test_pane_widths() {
        let w = pane_widths(&columns());
        assert_eq!(w.left, 50.0);
        assert_eq!(w.center, 300.0);
        assert_eq!(w.right, 70.0);
        assert!(is_optimize_mode(true, false, false, false));
        assert!(!is_optimize_mode(true, false, false, true));
    }
}
