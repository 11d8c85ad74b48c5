use std::fmt;
use std::sync::Arc;

use super::color_map::{ColorMap, ColorMapWriter};
use super::encoding::Encoding;
use super::limits::DecodeLimits;
use super::types::PixelFormat;

/// The per-connection state the decoder reads from and updates.
///
/// Negotiation (handshake, SetPixelFormat, SetEncodings) happens outside
/// this crate; implementors expose its outcome.
pub trait SessionContext {
    /// Encodings the client advertised, in advertisement order.
    fn negotiated_encodings(&self) -> &[Arc<dyn Encoding>];

    fn pixel_format(&self) -> &PixelFormat;

    fn limits(&self) -> &DecodeLimits;

    fn color_map(&self) -> &ColorMap;

    /// Decoder-only write access; the handle can set entries but never
    /// replace the map.
    fn color_map_writer(&mut self) -> ColorMapWriter<'_>;
}

/// Session state owned by a single decoding client.
pub struct ClientSession {
    pixel_format: PixelFormat,
    encodings: Vec<Arc<dyn Encoding>>,
    limits: DecodeLimits,
    color_map: ColorMap,
}

impl ClientSession {
    pub fn new(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            encodings: Vec::new(),
            limits: DecodeLimits::default(),
            color_map: ColorMap::new(),
        }
    }

    #[must_use]
    pub fn with_encodings(mut self, encodings: Vec<Arc<dyn Encoding>>) -> Self {
        self.encodings = encodings;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Apply a SetPixelFormat the client sent mid-stream.
    pub fn set_pixel_format(&mut self, pixel_format: PixelFormat) {
        self.pixel_format = pixel_format;
    }

    /// Apply a SetEncodings the client sent mid-stream.
    pub fn set_encodings(&mut self, encodings: Vec<Arc<dyn Encoding>>) {
        self.encodings = encodings;
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new(PixelFormat::default())
    }
}

impl SessionContext for ClientSession {
    fn negotiated_encodings(&self) -> &[Arc<dyn Encoding>] {
        &self.encodings
    }

    fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    fn color_map_writer(&mut self) -> ColorMapWriter<'_> {
        ColorMapWriter::new(&mut self.color_map)
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encodings: Vec<i32> = self.encodings.iter().map(|e| e.identifier()).collect();
        f.debug_struct("ClientSession")
            .field("pixel_format", &self.pixel_format)
            .field("encodings", &encodings)
            .field("limits", &self.limits)
            .field("color_map", &self.color_map)
            .finish()
    }
}
