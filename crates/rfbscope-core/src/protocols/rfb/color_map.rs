use std::fmt;

use super::layout::COLOR_MAP_SIZE;
use super::types::Color;

/// The client's 65536-entry palette.
///
/// Only the decoder writes to it, through SetColorMapEntries; every other
/// holder gets read access.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorMap {
    entries: Box<[Color]>,
}

impl ColorMap {
    /// A map with every entry black.
    pub fn new() -> Self {
        Self {
            entries: vec![Color::default(); COLOR_MAP_SIZE].into_boxed_slice(),
        }
    }

    pub fn get(&self, index: u16) -> Color {
        self.entries[usize::from(index)]
    }

    pub fn entries(&self) -> &[Color] {
        &self.entries
    }

    /// Entries that differ from the initial black.
    pub fn populated(&self) -> usize {
        self.entries
            .iter()
            .filter(|color| **color != Color::default())
            .count()
    }

    pub(crate) fn set(&mut self, index: u16, color: Color) {
        self.entries[usize::from(index)] = color;
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to a session's [`ColorMap`] during decoding.
///
/// Entries can only be set by the SetColorMapEntries decoder; holders of the
/// handle cannot replace or reset the map.
pub struct ColorMapWriter<'a> {
    map: &'a mut ColorMap,
}

impl<'a> ColorMapWriter<'a> {
    pub fn new(map: &'a mut ColorMap) -> Self {
        Self { map }
    }

    pub fn get(&self, index: u16) -> Color {
        self.map.get(index)
    }

    pub(crate) fn set(&mut self, index: u16, color: Color) {
        self.map.set(index, color);
    }
}

impl fmt::Debug for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorMap")
            .field("populated", &self.populated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_is_black_and_full_size() {
        let map = ColorMap::new();
        assert_eq!(map.entries().len(), 65536);
        assert_eq!(map.get(u16::MAX), Color::default());
        assert_eq!(map.populated(), 0);
    }

    #[test]
    fn set_replaces_single_entry() {
        let mut map = ColorMap::new();
        map.set(5, Color::new(0x10, 0x20, 0x30));
        assert_eq!(map.get(5), Color::new(0x10, 0x20, 0x30));
        assert_eq!(map.get(4), Color::default());
        assert_eq!(map.populated(), 1);
    }

    #[test]
    fn writer_sets_entries_in_place() {
        let mut map = ColorMap::new();
        map.set(1, Color::new(1, 1, 1));
        let mut writer = ColorMapWriter::new(&mut map);
        writer.set(2, Color::new(2, 2, 2));
        assert_eq!(writer.get(1), Color::new(1, 1, 1));
        assert_eq!(map.get(2), Color::new(2, 2, 2));
        assert_eq!(map.populated(), 2);
    }
}
