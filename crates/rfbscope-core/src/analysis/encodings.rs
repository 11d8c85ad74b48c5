use std::collections::HashMap;

use crate::EncodingSummary;
use crate::protocols::rfb::{Rectangle, encoding_name};

#[derive(Debug, Default, Clone)]
pub(crate) struct EncodingStats {
    pub name: Option<&'static str>,
    pub rectangles: u64,
    pub pixels: u64,
    pub payload_bytes: u64,
}

/// Account one decoded rectangle under its encoding identifier.
///
/// `name` is the decoder that handled it, which may differ from the built-in
/// name when a session negotiates its own encoding under that identifier.
pub(crate) fn add_rectangle(
    stats: &mut HashMap<i32, EncodingStats>,
    rectangle: &Rectangle,
    name: &'static str,
) {
    let entry = stats.entry(rectangle.encoding).or_default();
    entry.name.get_or_insert(name);
    entry.rectangles += 1;
    entry.pixels += rectangle.header().pixel_count();
    entry.payload_bytes += rectangle.payload.wire_len() as u64;
}

pub(crate) fn build_encoding_summaries(
    stats: HashMap<i32, EncodingStats>,
) -> Vec<EncodingSummary> {
    let mut summaries: Vec<EncodingSummary> = stats
        .into_iter()
        .map(|(encoding, stats)| EncodingSummary {
            encoding,
            name: stats
                .name
                .unwrap_or_else(|| encoding_name(encoding))
                .to_string(),
            rectangles: stats.rectangles,
            pixels: stats.pixels,
            payload_bytes: stats.payload_bytes,
        })
        .collect();

    summaries.sort_by_key(|summary| summary.encoding);
    summaries
}
