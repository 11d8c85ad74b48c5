//! rfbscope core library for decoding RFB (VNC) server-to-client streams.
//!
//! The decoder lives in [`protocols::rfb`]: given a blocking byte stream, a
//! session context and an injected logger it reads one message at a time
//! (FramebufferUpdate, SetColorMapEntries, Bell, ServerCutText). On top of
//! it, `source` turns a stream into positioned messages and the analysis
//! layer aggregates a whole capture into a deterministic report.
//!
//! Invariants:
//! - Rectangle encodings resolve through a per-decode registry: the
//!   negotiated encodings plus the Raw fallback, which always wins its id.
//! - The color map is only written by SetColorMapEntries decoding.
//! - A failed message ends the stream; nothing after it is decoded.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use rfbscope_core::{AnalysisOptions, analyze_stream_file};
//!
//! let report = analyze_stream_file(
//!     Path::new("server.bin"),
//!     &AnalysisOptions::default(),
//!     log::logger(),
//! )?;
//! println!("messages: {}", report.summary.messages_total);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
pub mod protocols;
mod source;

pub use analysis::{
    AnalysisError, AnalysisOptions, analyze_source, analyze_stream, analyze_stream_file,
};
pub use source::{
    DecodedMessage, MessageSource, ServerStream, SourceError, StreamError, StreamFileSource,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when the input has no modification time.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated decode report with deterministic ordering.
///
/// # Examples
/// ```
/// use rfbscope_core::make_stub_report;
///
/// let report = make_stub_report("server.bin", 123);
/// assert_eq!(report.report_version, rfbscope_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,
    pub input: InputInfo,
    /// Session parameters the stream was decoded with.
    pub session: SessionInfo,
    pub summary: StreamSummary,
    /// Per-encoding rectangle counts, sorted by identifier.
    pub encodings: Vec<EncodingSummary>,
    /// Present when the stream contained SetColorMapEntries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<ColorMapSummary>,
    /// The error that ended decoding, if the stream did not end cleanly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StreamFailure>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use rfbscope_core::InputInfo;
///
/// let input = InputInfo {
///     path: "server.bin".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    pub bits_per_pixel: u8,
    pub true_color: bool,
    /// Negotiated encoding identifiers in advertisement order.
    pub negotiated_encodings: Vec<i32>,
}

/// Message counts over the decoded part of the stream.
///
/// # Examples
/// ```
/// use rfbscope_core::StreamSummary;
///
/// let summary = StreamSummary {
///     messages_total: 2,
///     bells: 2,
///     bytes_consumed: 2,
///     ..StreamSummary::default()
/// };
/// assert_eq!(summary.framebuffer_updates, 0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamSummary {
    pub messages_total: u64,
    pub framebuffer_updates: u64,
    pub rectangles_total: u64,
    pub color_map_updates: u64,
    pub colors_written: u64,
    pub bells: u64,
    pub cut_texts: u64,
    pub cut_text_bytes: u64,
    /// Bytes of fully decoded messages; a failed message is not counted.
    pub bytes_consumed: u64,
    /// Last framebuffer size announced through the DesktopSize pseudo-encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_size: Option<DesktopSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopSize {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSummary {
    /// Signed wire identifier.
    pub encoding: i32,
    /// Name of the decoder that handled the rectangles.
    pub name: String,
    pub rectangles: u64,
    /// Sum of `width * height` over the rectangles.
    pub pixels: u64,
    /// Body bytes on the wire, rectangle headers excluded.
    pub payload_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorMapSummary {
    pub updates: u64,
    pub entries_written: u64,
    /// Distinct indices written at least once.
    pub distinct_entries: u64,
    /// Updates whose range ran past index 65535 and wrapped to 0.
    pub wrapped_updates: u64,
}

/// The decode error that ended the stream.
///
/// # Examples
/// ```
/// use rfbscope_core::StreamFailure;
///
/// let failure = StreamFailure {
///     message_index: 3,
///     offset: 120,
///     phase: "decoding-body".to_string(),
///     code: "truncated".to_string(),
///     error: "I/O error: stream ended after 2 of 6 bytes".to_string(),
/// };
/// assert_eq!(failure.message_index, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFailure {
    /// Zero-based index of the failed message.
    pub message_index: u64,
    /// Byte offset of the failed message's type tag.
    pub offset: u64,
    /// Decode phase the message was in when it failed.
    pub phase: String,
    /// Stable error code (`truncated`, `unsupported-encoding`, ...).
    pub code: String,
    pub error: String,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use rfbscope_core::make_stub_report;
///
/// let report = make_stub_report("server.bin", 123);
/// assert!(report.encodings.is_empty());
/// assert!(report.failure.is_none());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "rfbscope".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        session: SessionInfo::default(),
        summary: StreamSummary::default(),
        encodings: vec![],
        color_map: None,
        failure: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_optional_fields_when_none() {
        let report = make_stub_report("server.bin", 1);

        let value = serde_json::to_value(&report).expect("report json");
        assert!(value.get("color_map").is_none());
        assert!(value.get("failure").is_none());
        assert!(value["summary"].get("desktop_size").is_none());
        assert_eq!(value["tool"]["name"], "rfbscope");
    }

    #[test]
    fn report_roundtrips_with_failure() {
        let mut report = make_stub_report("server.bin", 9);
        report.failure = Some(StreamFailure {
            message_index: 1,
            offset: 1,
            phase: "decoding-header".to_string(),
            code: "truncated".to_string(),
            error: "I/O error: stream ended after 1 of 2 bytes".to_string(),
        });

        let json = serde_json::to_string(&report).expect("report json");
        let parsed: Report = serde_json::from_str(&json).expect("parse report");
        let failure = parsed.failure.expect("failure");
        assert_eq!(failure.code, "truncated");
        assert_eq!(failure.offset, 1);
    }
}
