use std::collections::HashSet;

use crate::ColorMapSummary;
use crate::protocols::rfb::SetColorMapEntries;

/// Per-stream accounting of SetColorMapEntries messages.
#[derive(Debug, Default)]
pub(crate) struct ColorMapStats {
    updates: u64,
    entries_written: u64,
    wrapped_updates: u64,
    touched: HashSet<u16>,
}

impl ColorMapStats {
    pub(crate) fn add_update(&mut self, update: &SetColorMapEntries) {
        self.updates += 1;
        self.entries_written += update.colors.len() as u64;
        if update.wraps() {
            self.wrapped_updates += 1;
        }
        let mut index = update.first_index;
        for _ in &update.colors {
            self.touched.insert(index);
            index = index.wrapping_add(1);
        }
    }

    /// `None` when the stream never touched the color map.
    pub(crate) fn into_summary(self) -> Option<ColorMapSummary> {
        if self.updates == 0 {
            return None;
        }
        Some(ColorMapSummary {
            updates: self.updates,
            entries_written: self.entries_written,
            distinct_entries: self.touched.len() as u64,
            wrapped_updates: self.wrapped_updates,
        })
    }
}
