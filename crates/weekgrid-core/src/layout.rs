//! Week layout pipeline.
//!
//! Entries are located on the grid one by one, split into blocked and
//! regular domains, grouped by `(day, slot)` within each domain, given
//! equal-width columns inside each collision group, and finally put in
//! draw order. Every call builds a fresh [`WeekLayout`]; nothing is
//! cached between calls.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::LayoutMetrics;
use crate::conflict::{CollisionKey, collision_groups};
use crate::entry::Entry;
use crate::order::{DrawOrder, OrderKey, Tier, draw_sequence};
use crate::position::{MalformedTime, Position, PositionCalculator, SkipReason};
use crate::time::TimeGrid;
use crate::window::WeekWindow;

/// Membership of a placement in a collision group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollisionSlot {
    pub key: CollisionKey,
    pub size: usize,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub entry_id: String,
    pub resource_id: Option<String>,
    pub is_blocked: bool,
    pub day_index: usize,
    pub date: NaiveDate,
    pub start_minutes: i64,
    pub end_minutes: i64,
    pub top: f64,
    pub height: f64,
    /// Percent of the day column's width.
    pub width_percent: f64,
    /// Percent offset from the day column's left edge.
    pub offset_percent: f64,
    pub collision: Option<CollisionSlot>,
    pub draw: DrawOrder,
    pub warnings: Vec<MalformedTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub entry_id: String,
    pub reason: SkipReason,
    pub warnings: Vec<MalformedTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekLayout {
    pub label: String,
    pub columns: Vec<NaiveDate>,
    pub slot_labels: Vec<String>,
    /// In draw order.
    pub placements: Vec<Placement>,
    /// In input order.
    pub skipped: Vec<SkippedEntry>,
}

impl WeekLayout {
    pub fn placement(&self, entry_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.entry_id == entry_id)
    }

    pub fn skip_reason(&self, entry_id: &str) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|s| s.entry_id == entry_id)
            .map(|s| s.reason)
    }

    /// Members of the collision group at `key` within one domain, in group
    /// order.
    pub fn group_members(&self, key: CollisionKey, is_blocked: bool) -> Vec<&Placement> {
        let mut members: Vec<&Placement> = self
            .placements
            .iter()
            .filter(|p| p.is_blocked == is_blocked)
            .filter(|p| p.collision.is_some_and(|slot| slot.key == key))
            .collect();
        members.sort_by_key(|p| p.collision.map(|slot| slot.index));
        members
    }
}

/// Width and offset for member `index` of a group of `size`.
pub fn split_column(size: usize, index: usize) -> (f64, f64) {
    if size <= 1 {
        return (100.0, 0.0);
    }
    let width = 100.0 / size as f64;
    (width, index as f64 * width)
}

struct Located<'e> {
    entry: &'e Entry,
    position: Position,
    warnings: Vec<MalformedTime>,
    collision: Option<CollisionSlot>,
}

pub struct LayoutEngine<'a> {
    grid: &'a TimeGrid,
    window: &'a WeekWindow,
    metrics: &'a LayoutMetrics,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(grid: &'a TimeGrid, window: &'a WeekWindow, metrics: &'a LayoutMetrics) -> Self {
        Self {
            grid,
            window,
            metrics,
        }
    }

    #[tracing::instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn compute(&self, entries: &[Entry]) -> WeekLayout {
        let calculator = PositionCalculator::new(self.grid, self.window, self.metrics);

        let mut blocked = Vec::new();
        let mut regular = Vec::new();
        let mut skipped = Vec::new();
        for entry in entries {
            let attempt = calculator.locate(entry);
            match attempt.outcome {
                Ok(position) => {
                    let located = Located {
                        entry,
                        position,
                        warnings: attempt.warnings,
                        collision: None,
                    };
                    if entry.is_blocked {
                        blocked.push(located);
                    } else {
                        regular.push(located);
                    }
                }
                Err(reason) => skipped.push(SkippedEntry {
                    entry_id: entry.id.clone(),
                    reason,
                    warnings: attempt.warnings,
                }),
            }
        }

        self.mark_collisions(&mut blocked);
        self.mark_collisions(&mut regular);

        let located: Vec<Located<'_>> = blocked.into_iter().chain(regular).collect();
        let keys: Vec<OrderKey> = located
            .iter()
            .map(|l| OrderKey {
                tier: Tier::of(l.entry.is_blocked),
                start_minutes: l.position.start_minutes,
                in_collision: l.collision.is_some(),
            })
            .collect();

        let mut slots: Vec<Option<Located<'_>>> = located.into_iter().map(Some).collect();
        let mut placements = Vec::with_capacity(slots.len());
        for (idx, draw) in draw_sequence(&keys) {
            if let Some(l) = slots[idx].take() {
                placements.push(into_placement(l, draw));
            }
        }

        info!(
            placed = placements.len(),
            skipped = skipped.len(),
            collisions = placements.iter().filter(|p| p.collision.is_some()).count(),
            "computed week layout"
        );

        WeekLayout {
            label: self.window.label(),
            columns: self.window.column_dates(),
            slot_labels: self.grid.labels().to_vec(),
            placements,
            skipped,
        }
    }

    fn mark_collisions(&self, domain: &mut [Located<'_>]) {
        let slot_height = self.metrics.slot_height;
        let groups = collision_groups(domain, |l| CollisionKey::of(&l.position, slot_height));
        for (key, members) in groups {
            debug!(
                day = key.day_index,
                bucket = key.slot_bucket,
                size = members.len(),
                "collision group"
            );
            let size = members.len();
            for (index, member) in members.into_iter().enumerate() {
                domain[member].collision = Some(CollisionSlot { key, size, index });
            }
        }
    }
}

fn into_placement(located: Located<'_>, draw: DrawOrder) -> Placement {
    let (width_percent, offset_percent) = match located.collision {
        Some(slot) => split_column(slot.size, slot.index),
        None => (100.0, 0.0),
    };

    Placement {
        entry_id: located.entry.id.clone(),
        resource_id: located.entry.resource_id.clone(),
        is_blocked: located.entry.is_blocked,
        day_index: located.position.day_index,
        date: located.position.date,
        start_minutes: located.position.start_minutes,
        end_minutes: located.position.end_minutes,
        top: located.position.top,
        height: located.position.height,
        width_percent,
        offset_percent,
        collision: located.collision,
        draw,
        warnings: located.warnings,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::{LayoutEngine, WeekLayout, split_column};
    use crate::config::LayoutMetrics;
    use crate::entry::Entry;
    use crate::order::{COLLISION_Z, Tier};
    use crate::position::{SkipReason, UnplaceableReason};
    use crate::time::TimeGrid;
    use crate::window::WeekWindow;

    fn layout(entries: &[Entry]) -> WeekLayout {
        let today = NaiveDate::from_ymd_opt(2026, 10, 21).expect("date");
        let grid = TimeGrid::new(480, 1080, 30).expect("grid");
        let window = WeekWindow::resolve(today, Weekday::Mon, 0, 5).expect("window");
        let metrics = LayoutMetrics::default();
        LayoutEngine::new(&grid, &window, &metrics).compute(entries)
    }

    #[test]
    fn split_column_partitions_width() {
        assert_eq!(split_column(1, 0), (100.0, 0.0));
        assert_eq!(split_column(2, 1), (50.0, 50.0));
        assert_eq!(split_column(4, 3), (25.0, 75.0));
    }

    #[test]
    fn overlapping_monday_entries_share_the_column() {
        let result = layout(&[
            Entry::new("A", "2026-10-19", "09:00", "09:30"),
            Entry::new("B", "2026-10-19", "09:00", "09:45"),
        ]);

        let a = result.placement("A").expect("A placed");
        let b = result.placement("B").expect("B placed");
        assert_eq!(a.width_percent, 50.0);
        assert_eq!(b.width_percent, 50.0);
        assert_eq!(a.offset_percent, 0.0);
        assert_eq!(b.offset_percent, 50.0);
        assert_eq!(a.collision.map(|c| c.size), Some(2));
        assert_eq!(a.collision.map(|c| c.key), b.collision.map(|c| c.key));
    }

    #[test]
    fn lone_entries_take_full_width() {
        let result = layout(&[
            Entry::new("A", "2026-10-19", "09:00", "09:30"),
            Entry::new("B", "2026-10-19", "09:30", "10:00"),
            Entry::new("C", "2026-10-20", "09:00", "09:30"),
        ]);

        for placement in &result.placements {
            assert_eq!(placement.width_percent, 100.0);
            assert_eq!(placement.offset_percent, 0.0);
            assert!(placement.collision.is_none());
        }
    }

    #[test]
    fn group_of_three_splits_in_input_order() {
        let result = layout(&[
            Entry::new("x", "2026-10-21", "10:15", "10:45"),
            Entry::new("y", "2026-10-21", "10:00", "11:00"),
            Entry::new("z", "2026-10-21", "10:00", "10:30"),
        ]);

        let x = result.placement("x").expect("x");
        let y = result.placement("y").expect("y");
        let z = result.placement("z").expect("z");
        let third = 100.0 / 3.0;
        assert_eq!(x.width_percent, third);
        assert_eq!(x.offset_percent, 0.0);
        assert_eq!(y.offset_percent, third);
        assert_eq!(z.offset_percent, 2.0 * third);
        assert!((z.offset_percent + z.width_percent - 100.0).abs() < 1e-9);

        let key = x.collision.expect("grouped").key;
        let members: Vec<&str> = result
            .group_members(key, false)
            .iter()
            .map(|p| p.entry_id.as_str())
            .collect();
        assert_eq!(members, vec!["x", "y", "z"]);
    }

    #[test]
    fn blocked_and_regular_never_collide() {
        let result = layout(&[
            Entry::new("visit", "2026-10-19", "09:00", "09:30"),
            Entry::new("block", "2026-10-19", "09:00", "12:00").blocked(),
        ]);

        assert_eq!(result.placement("visit").expect("visit").width_percent, 100.0);
        assert_eq!(result.placement("block").expect("block").width_percent, 100.0);
    }

    #[test]
    fn blocked_entries_collide_among_themselves() {
        let result = layout(&[
            Entry::new("b1", "2026-10-19", "12:00", "13:00").blocked(),
            Entry::new("b2", "2026-10-19", "12:00", "14:00").blocked(),
        ]);

        let b2 = result.placement("b2").expect("b2");
        assert_eq!(b2.width_percent, 50.0);
        assert_eq!(b2.offset_percent, 50.0);
    }

    #[test]
    fn draw_order_puts_blocked_first_then_by_start() {
        let result = layout(&[
            Entry::new("late", "2026-10-19", "15:00", "15:30"),
            Entry::new("early", "2026-10-20", "08:00", "08:30"),
            Entry::new("block", "2026-10-21", "16:00", "17:00").blocked(),
            Entry::new("c1", "2026-10-22", "10:00", "10:30"),
            Entry::new("c2", "2026-10-22", "10:00", "10:30"),
        ]);

        let ids: Vec<&str> = result.placements.iter().map(|p| p.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["block", "early", "c1", "c2", "late"]);

        assert_eq!(result.placements[0].draw.tier, Tier::Blocked);
        assert_eq!(result.placements[0].draw.z_index, 10);
        assert_eq!(result.placement("early").expect("early").draw.z_index, 50);
        assert_eq!(result.placement("c1").expect("c1").draw.z_index, COLLISION_Z);
        assert_eq!(result.placement("late").expect("late").draw.z_index, 53);
    }

    #[test]
    fn skipped_entries_are_reported_by_cause() {
        let result = layout(&[
            Entry::new("next-week", "2026-10-26", "09:00", "09:30"),
            Entry::new("blank", "2026-10-19", "", ""),
            Entry::new("ok", "2026-10-19", "09:00", "09:30"),
        ]);

        assert_eq!(result.placements.len(), 1);
        assert_eq!(result.skip_reason("next-week"), Some(SkipReason::OutOfWindow));
        assert_eq!(
            result.skip_reason("blank"),
            Some(SkipReason::Unplaceable {
                cause: UnplaceableReason::DegenerateTimes
            })
        );
        assert_eq!(result.skipped[1].warnings.len(), 2);
    }

    #[test]
    fn recomputing_yields_identical_layouts() {
        let entries = vec![
            Entry::new("A", "2026-10-19", "09:00", "09:30"),
            Entry::new("B", "2026-10-19", "09:00", "09:45"),
            Entry::new("C", "2026-10-23", "13:00", "17:00").blocked(),
            Entry::new("D", "2026-10-20", "bad", "10:00"),
        ];

        let first = layout(&entries);
        let second = layout(&entries);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json")
        );
    }

    #[test]
    fn layout_carries_window_axes() {
        let result = layout(&[]);
        assert_eq!(result.label, "19 – 23 Oct");
        assert_eq!(result.columns.len(), 5);
        assert_eq!(result.slot_labels.first().map(String::as_str), Some("08:00"));
        assert_eq!(result.slot_labels.last().map(String::as_str), Some("18:00"));
    }
}
