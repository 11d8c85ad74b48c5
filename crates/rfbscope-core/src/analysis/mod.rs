use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::Log;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::protocols::rfb::{
    ClientSession, CopyRectEncoding, DecodeLimits, DesktopSizeEncoding, Encoding,
    EncodingRegistry, PixelFormat, RectanglePayload, ServerMessage, SessionContext,
};
use crate::source::{
    DecodedMessage, MessageSource, ServerStream, SourceError, StreamError, StreamFileSource,
};
use crate::{
    DEFAULT_GENERATED_AT, DesktopSize, Report, SessionInfo, StreamFailure, StreamSummary,
    make_stub_report,
};

mod color_map;
mod encodings;

use color_map::ColorMapStats;
use encodings::{EncodingStats, add_rectangle, build_encoding_summaries};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Session parameters the stream was negotiated with.
#[derive(Clone)]
pub struct AnalysisOptions {
    pub pixel_format: PixelFormat,
    /// Negotiated encodings; Raw is always available as the fallback.
    pub encodings: Vec<Arc<dyn Encoding>>,
    pub limits: DecodeLimits,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::default(),
            encodings: vec![Arc::new(CopyRectEncoding), Arc::new(DesktopSizeEncoding)],
            limits: DecodeLimits::default(),
        }
    }
}

impl AnalysisOptions {
    /// A fresh session configured with these options.
    pub fn session(&self) -> ClientSession {
        ClientSession::new(self.pixel_format)
            .with_encodings(self.encodings.clone())
            .with_limits(self.limits)
    }
}

impl fmt::Debug for AnalysisOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encodings: Vec<i32> = self.encodings.iter().map(|e| e.identifier()).collect();
        f.debug_struct("AnalysisOptions")
            .field("pixel_format", &self.pixel_format)
            .field("encodings", &encodings)
            .field("limits", &self.limits)
            .finish()
    }
}

/// Decode a capture file of server-to-client bytes into a report.
///
/// `generated_at` is the file's modification time.
pub fn analyze_stream_file(
    path: &Path,
    options: &AnalysisOptions,
    logger: &dyn Log,
) -> Result<Report, AnalysisError> {
    let metadata = path.metadata()?;
    let source = StreamFileSource::open(path)?;
    let mut report = analyze_source(
        &path.display().to_string(),
        metadata.len(),
        source,
        options,
        logger,
    );
    report.generated_at = metadata
        .modified()
        .ok()
        .and_then(|modified| OffsetDateTime::from(modified).format(&Rfc3339).ok())
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    Ok(report)
}

/// Decode an in-memory or otherwise already opened stream.
pub fn analyze_stream<R: Read>(
    path_label: &str,
    bytes_len: u64,
    reader: R,
    options: &AnalysisOptions,
    logger: &dyn Log,
) -> Report {
    analyze_source(
        path_label,
        bytes_len,
        ServerStream::new(reader),
        options,
        logger,
    )
}

/// Drain `source` into a report. A decode error ends the stream and is
/// recorded in the report rather than returned.
pub fn analyze_source<S: MessageSource>(
    input_path: &str,
    input_bytes: u64,
    mut source: S,
    options: &AnalysisOptions,
    logger: &dyn Log,
) -> Report {
    let mut session = options.session();
    let registry = EncodingRegistry::for_session(&session);
    let mut summary = StreamSummary::default();
    let mut encoding_stats: HashMap<i32, EncodingStats> = HashMap::new();
    let mut color_map_stats = ColorMapStats::default();
    let mut failure = None;

    loop {
        match source.next_message(&mut session, logger) {
            Ok(Some(decoded)) => {
                add_message(
                    &mut summary,
                    &mut encoding_stats,
                    &mut color_map_stats,
                    &registry,
                    &decoded,
                );
            }
            Ok(None) => break,
            Err(err) => {
                failure = Some(describe_failure(&err));
                break;
            }
        }
    }

    let mut report = make_stub_report(input_path, input_bytes);
    report.session = SessionInfo {
        bits_per_pixel: options.pixel_format.bits_per_pixel,
        true_color: options.pixel_format.true_color,
        negotiated_encodings: session
            .negotiated_encodings()
            .iter()
            .map(|encoding| encoding.identifier())
            .collect(),
    };
    report.summary = summary;
    report.encodings = build_encoding_summaries(encoding_stats);
    report.color_map = color_map_stats.into_summary();
    report.failure = failure;
    report
}

fn add_message(
    summary: &mut StreamSummary,
    encoding_stats: &mut HashMap<i32, EncodingStats>,
    color_map_stats: &mut ColorMapStats,
    registry: &EncodingRegistry,
    decoded: &DecodedMessage,
) {
    summary.messages_total += 1;
    summary.bytes_consumed += decoded.len;
    match &decoded.message {
        ServerMessage::FramebufferUpdate(update) => {
            summary.framebuffer_updates += 1;
            for rectangle in &update.rectangles {
                summary.rectangles_total += 1;
                if let Some(name) = registry.name_of(rectangle.encoding) {
                    add_rectangle(encoding_stats, rectangle, name);
                }
                if matches!(rectangle.payload, RectanglePayload::DesktopSize) {
                    summary.desktop_size = Some(DesktopSize {
                        width: rectangle.width,
                        height: rectangle.height,
                    });
                }
            }
        }
        ServerMessage::SetColorMapEntries(update) => {
            summary.color_map_updates += 1;
            summary.colors_written += update.colors.len() as u64;
            color_map_stats.add_update(update);
        }
        ServerMessage::Bell => summary.bells += 1,
        ServerMessage::ServerCutText(cut) => {
            summary.cut_texts += 1;
            summary.cut_text_bytes += cut.text.len() as u64;
        }
    }
}

fn describe_failure(err: &StreamError) -> StreamFailure {
    match err {
        StreamError::Decode {
            index,
            offset,
            phase,
            source,
        } => StreamFailure {
            message_index: *index,
            offset: *offset,
            phase: phase.name().to_string(),
            code: source.code().to_string(),
            error: source.to_string(),
        },
        StreamError::Failed { index } => StreamFailure {
            message_index: *index,
            offset: 0,
            phase: "failed".to_string(),
            code: "failed".to_string(),
            error: err.to_string(),
        },
    }
}
