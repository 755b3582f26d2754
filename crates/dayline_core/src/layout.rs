use serde::{Deserialize, Serialize};

use crate::model::Event;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacedEvent {
    pub event: Event,
    pub row: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayLayout {
    pub placed: Vec<PlacedEvent>,
    pub row_count: usize,
}

/// Pixel rectangle for one placed event at a given zoom scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventGeometry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Packs a day's events into non-overlapping rows.
///
/// Events are processed in `(start, end)` order so ties place
/// deterministically, and each event takes the first row whose last occupant
/// ends at or before its start. Greedy first-fit matches the peak
/// simultaneous-overlap count whenever start times are pairwise distinct; with
/// identical starts it can occasionally use one row more than a minimal
/// coloring would.
///
/// Callers are expected to have normalized events so `end > start`.
pub fn layout(events: &[Event]) -> DayLayout {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| {
        a.start_minute
            .cmp(&b.start_minute)
            .then_with(|| a.end_minute.cmp(&b.end_minute))
    });

    // Earliest free minute per row.
    let mut row_end: Vec<u32> = Vec::new();
    let mut placed = Vec::with_capacity(ordered.len());

    for event in ordered {
        let row = match row_end.iter().position(|end| *end <= event.start_minute) {
            Some(row) => row,
            None => {
                row_end.push(0);
                row_end.len() - 1
            }
        };
        row_end[row] = event.end_minute;
        placed.push(PlacedEvent {
            event: event.clone(),
            row,
        });
    }

    DayLayout {
        placed,
        row_count: row_end.len(),
    }
}

/// Maps a placed event through the current zoom scale. Very short events are
/// widened to `min_width_px` so they stay tappable.
pub fn geometry(
    placed: &PlacedEvent,
    scale: f32,
    row_height: f32,
    min_width_px: f32,
) -> EventGeometry {
    let duration = placed.event.end_minute - placed.event.start_minute;
    EventGeometry {
        left: placed.event.start_minute as f32 * scale,
        top: placed.row as f32 * row_height,
        width: (duration as f32 * scale).max(min_width_px),
        height: row_height,
    }
}
