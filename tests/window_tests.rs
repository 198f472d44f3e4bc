//! Viewport window tests
//!
//! Tests for the STATIC/WINDOWED decision, the sliding preload window and
//! the window cache, both on the pure calculator and through the engine.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::*;
use gridview::config::VirtualAxisConfig;
use gridview::layout::{compute_window, AxisSizing, WindowCalculator};
use gridview::{AxisMode, GridEngine};
use proptest::prelude::*;
use test_case::test_case;

// ============================================================================
// Pure Calculator
// ============================================================================

/// 10,000 rows of 24px in a 480px viewport with preload 5 materialize
/// exactly 30 rows at the top.
#[test]
fn test_scenario_a_initial_window() {
    let sizing = AxisSizing::fixed(24.0, 10_000);
    let window = compute_window(&sizing, AxisMode::Windowed, 0.0, 480.0, 5);
    assert_eq!(window.visible(), 0..20);
    assert_eq!(window.materialized(), 0..30);
    assert_eq!(window.materialized_len(), 30);
}

#[test_case(0.0, 0..30 ; "top slides down")]
#[test_case(2400.0, 95..125 ; "middle")]
#[test_case(240_000.0, 9970..10_000 ; "past the end clamps and slides up")]
fn test_window_keeps_constant_size(offset: f32, expected: std::ops::Range<usize>) {
    let sizing = AxisSizing::fixed(24.0, 10_000);
    let window = compute_window(&sizing, AxisMode::Windowed, offset, 480.0, 5);
    assert_eq!(window.materialized(), expected);
}

#[test]
fn test_static_mode_materializes_everything() {
    let sizing = AxisSizing::fixed(24.0, 100);
    let window = compute_window(&sizing, AxisMode::Static, 1000.0, 480.0, 5);
    assert_eq!(window.materialized(), 0..100);
}

#[test]
fn test_empty_axis() {
    let sizing = AxisSizing::fixed(24.0, 0);
    let window = compute_window(&sizing, AxisMode::Windowed, 0.0, 480.0, 5);
    assert!(window.is_empty());
}

#[test]
fn test_variable_heights_window() {
    // 10 rows of 10px, then tall rows
    let sizing = AxisSizing::variable((0..50).map(|i| if i < 10 { 10.0 } else { 100.0 }));
    let window = compute_window(&sizing, AxisMode::Windowed, 100.0, 200.0, 1);
    assert_eq!(window.visible(), 10..12);
    assert_eq!(window.materialized(), 9..13);
}

#[test_case(Some(true), 10 => AxisMode::Windowed ; "forced on")]
#[test_case(Some(false), 10_000 => AxisMode::Static ; "forced off")]
#[test_case(None, 10 => AxisMode::Static ; "fits the viewport")]
#[test_case(None, 10_000 => AxisMode::Windowed ; "overflows the viewport")]
fn test_mode_rule(enabled: Option<bool>, len: usize) -> AxisMode {
    let calc = WindowCalculator::new(VirtualAxisConfig {
        enabled,
        ..VirtualAxisConfig::default()
    });
    calc.mode_for(&AxisSizing::fixed(24.0, len), 480.0)
}

#[test]
fn test_min_items_keeps_small_axes_static() {
    let calc = WindowCalculator::new(VirtualAxisConfig {
        min_items: 100,
        ..VirtualAxisConfig::default()
    });
    assert_eq!(
        calc.mode_for(&AxisSizing::fixed(24.0, 100), 480.0),
        AxisMode::Static
    );
    assert_eq!(
        calc.mode_for(&AxisSizing::fixed(24.0, 101), 480.0),
        AxisMode::Windowed
    );
}

#[test]
fn test_identical_inputs_hit_the_cache() {
    let mut calc = WindowCalculator::new(VirtualAxisConfig::default());
    let sizing = AxisSizing::fixed(24.0, 1000);
    let first = calc.compute(&sizing, 1, 0.0, 480.0);
    let second = calc.compute(&sizing, 1, 0.0, 480.0);
    assert_eq!(first, second);
    assert_eq!(calc.recomputes(), 1);
}

#[test]
fn test_small_delta_keeps_cached_range() {
    let mut calc = WindowCalculator::new(VirtualAxisConfig {
        scroll_threshold_px: 50.0,
        ..VirtualAxisConfig::default()
    });
    let sizing = AxisSizing::fixed(24.0, 1000);
    let first = calc.compute(&sizing, 1, 240.0, 480.0);
    let nudged = calc.compute(&sizing, 1, 264.0, 480.0);
    assert_eq!(nudged.materialized(), first.materialized());
    assert_eq!(nudged.visible_start, 11);
    assert_eq!(calc.recomputes(), 1);
}

#[test]
fn test_sizing_version_change_recomputes() {
    let mut calc = WindowCalculator::new(VirtualAxisConfig::default());
    calc.compute(&AxisSizing::fixed(24.0, 1000), 1, 0.0, 480.0);
    let window = calc.compute(&AxisSizing::fixed(48.0, 1000), 2, 0.0, 480.0);
    assert_eq!(window.materialized(), 0..20);
}

// ============================================================================
// Through the Engine
// ============================================================================

#[test]
fn test_scenario_a_through_engine() {
    let engine = GridBuilder::new()
        .row_height(24.0)
        .preload(5)
        .rows(flat_records(10_000))
        .view(800.0, 480.0)
        .build();
    assert_eq!(engine.row_window().mode, AxisMode::Windowed);
    assert_row_window(&engine, 0, 30);
}

#[test]
fn test_scroll_moves_window_after_flush() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .rows(flat_records(10_000))
        .view(800.0, 480.0)
        .build();
    engine.on_wheel(0.0, 2400.0).unwrap();
    // Nothing moves until the flush
    assert_row_window(&engine, 0, 30);
    engine.flush();
    assert_row_window(&engine, 95, 125);
}

#[test]
fn test_render_materializes_only_the_window() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .rows(flat_records(10_000))
        .view(800.0, 480.0)
        .build();
    let pass = render(&mut engine);
    let main = pass.pane(gridview::layout::Pane::Main).unwrap();
    assert_eq!(main.rows.len(), 30);
    assert_eq!(pass.content_height, 240_000.0);
}

#[test]
fn test_window_shrinks_with_dataset() {
    let mut engine = GridBuilder::new()
        .row_height(24.0)
        .rows(flat_records(10_000))
        .view(800.0, 480.0)
        .build();
    engine.scroll_to(200_000.0, 0.0);
    engine.load_rows(flat_records(10));
    engine.flush();
    assert_eq!(engine.viewport().scroll_y, 0.0);
    assert_eq!(engine.row_window().materialized(), 0..10);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Any scroll sequence leaves the window inside the axis and covering
    /// the visible range. A misaligned offset straddles one extra row.
    #[test]
    fn prop_window_bounds(offsets in proptest::collection::vec(-1000.0f32..300_000.0, 1..20)) {
        let sizing = AxisSizing::fixed(24.0, 10_000);
        let mut calc = WindowCalculator::new(VirtualAxisConfig {
            enabled: Some(true),
            scroll_threshold_px: 30.0,
            ..VirtualAxisConfig::default()
        });
        for offset in offsets {
            let window = calc.compute(&sizing, 1, offset, 480.0);
            prop_assert!(window.start <= window.visible_start);
            prop_assert!(window.visible_end < window.end);
            prop_assert!(window.end <= 10_000);
            prop_assert!((30..=31).contains(&window.materialized_len()));
        }
    }

    #[test]
    fn prop_variable_window_covers_visible(
        sizes in proptest::collection::vec(1.0f32..80.0, 1..300),
        offset in 0.0f32..20_000.0,
        preload in 0usize..8,
    ) {
        let len = sizes.len();
        let sizing = AxisSizing::variable(sizes);
        let window = compute_window(&sizing, AxisMode::Windowed, offset, 300.0, preload);
        prop_assert!(window.start <= window.visible_start);
        prop_assert!(window.visible_end < window.end);
        prop_assert!(window.end <= len);
    }

    /// Through the engine, for any dataset size (empty and single-row
    /// included), row heights and scroll sequence, the visible range stays
    /// ordered and inside the dataset.
    #[test]
    fn prop_engine_window_stays_in_dataset(
        heights in proptest::collection::vec(1.0f32..120.0, 0..400),
        fixed in proptest::option::of(4.0f32..60.0),
        windowed in proptest::option::of(any::<bool>()),
        scrolls in proptest::collection::vec(
            (any::<bool>(), -5_000.0f32..60_000.0),
            0..12,
        ),
    ) {
        let len = heights.len();
        let mut engine = GridBuilder::new()
            .config(|c| {
                c.row.height = fixed;
                c.virtual_y.enabled = windowed;
            })
            .rows(flat_records(len))
            .view(800.0, 300.0)
            .build();
        for (i, height) in heights.iter().enumerate() {
            engine.set_row_height(&rid(&i.to_string()), *height);
        }
        engine.flush();

        let check = |engine: &GridEngine| -> Result<(), TestCaseError> {
            let window = engine.row_window();
            prop_assert_eq!(window.len, len);
            prop_assert!(window.visible_start <= window.visible_end);
            prop_assert!(window.end <= len);
            if len == 0 {
                prop_assert_eq!(window.visible_end, 0);
                prop_assert!(window.is_empty());
            } else {
                prop_assert!(window.visible_end < len);
                prop_assert!(window.start <= window.visible_start);
                prop_assert!(window.visible_end < window.end);
            }
            Ok(())
        };
        check(&engine)?;
        for (wheel, amount) in scrolls {
            if wheel {
                engine.on_wheel(0.0, amount);
            } else {
                engine.scroll_to(amount, 0.0);
            }
            engine.flush();
            check(&engine)?;
        }
    }
}
