use std::borrow::Cow;
use std::fmt;

use super::encoding::RectanglePayload;
use super::error::DecodeError;
use super::layout;

/// Server-to-client message kinds, numbered as on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    FramebufferUpdate = layout::MSG_FRAMEBUFFER_UPDATE,
    SetColorMapEntries = layout::MSG_SET_COLOR_MAP_ENTRIES,
    Bell = layout::MSG_BELL,
    ServerCutText = layout::MSG_SERVER_CUT_TEXT,
}

impl MessageKind {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::FramebufferUpdate => "framebuffer-update",
            Self::SetColorMapEntries => "set-color-map-entries",
            Self::Bell => "bell",
            Self::ServerCutText => "server-cut-text",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            layout::MSG_FRAMEBUFFER_UPDATE => Ok(Self::FramebufferUpdate),
            layout::MSG_SET_COLOR_MAP_ENTRIES => Ok(Self::SetColorMapEntries),
            layout::MSG_BELL => Ok(Self::Bell),
            layout::MSG_SERVER_CUT_TEXT => Ok(Self::ServerCutText),
            _ => Err(DecodeError::UnknownMessageType { tag }),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of a single message decode.
///
/// `AwaitingTag -> DecodingHeader -> DecodingBody -> Done`; any failure
/// moves to `Failed`, which is terminal for that message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodePhase {
    AwaitingTag,
    DecodingHeader,
    DecodingBody,
    Done,
    Failed,
}

impl DecodePhase {
    pub const fn name(self) -> &'static str {
        match self {
            Self::AwaitingTag => "awaiting-tag",
            Self::DecodingHeader => "decoding-header",
            Self::DecodingBody => "decoding-body",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DecodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A color map entry; each channel spans the full 16-bit range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Color {
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }
}

/// Wire pixel format (RFC 6143 §7.4), negotiated outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_color: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::rgb888()
    }
}

impl PixelFormat {
    /// 32 bits per pixel, 24-bit depth true color.
    pub const fn rgb888() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// 16 bits per pixel, 5-6-5 true color.
    pub const fn rgb565() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 16,
            big_endian: false,
            true_color: true,
            red_max: 31,
            green_max: 63,
            blue_max: 31,
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
        }
    }

    /// 8 bits per pixel, pixel values index the color map.
    pub const fn indexed8() -> Self {
        Self {
            bits_per_pixel: 8,
            depth: 8,
            big_endian: false,
            true_color: false,
            red_max: 0,
            green_max: 0,
            blue_max: 0,
            red_shift: 0,
            green_shift: 0,
            blue_shift: 0,
        }
    }

    /// Pixel format for a bits-per-pixel value as accepted on the command line.
    pub fn for_bits_per_pixel(bits_per_pixel: u8) -> Result<Self, DecodeError> {
        match bits_per_pixel {
            8 => Ok(Self::indexed8()),
            16 => Ok(Self::rgb565()),
            32 => Ok(Self::rgb888()),
            _ => Err(DecodeError::InvalidPixelFormat { bits_per_pixel }),
        }
    }

    /// Bytes used by one pixel on the wire; only 8, 16 and 32 bpp are valid.
    pub fn bytes_per_pixel(&self) -> Result<usize, DecodeError> {
        match self.bits_per_pixel {
            8 => Ok(1),
            16 => Ok(2),
            32 => Ok(4),
            bits_per_pixel => Err(DecodeError::InvalidPixelFormat { bits_per_pixel }),
        }
    }

    /// Parse the 16-byte wire form (the last three bytes are padding).
    pub fn from_bytes(bytes: &[u8; layout::PIXEL_FORMAT_LEN]) -> Self {
        Self {
            bits_per_pixel: bytes[0],
            depth: bytes[1],
            big_endian: bytes[2] != 0,
            true_color: bytes[3] != 0,
            red_max: u16::from_be_bytes([bytes[4], bytes[5]]),
            green_max: u16::from_be_bytes([bytes[6], bytes[7]]),
            blue_max: u16::from_be_bytes([bytes[8], bytes[9]]),
            red_shift: bytes[10],
            green_shift: bytes[11],
            blue_shift: bytes[12],
        }
    }

    pub fn to_bytes(&self) -> [u8; layout::PIXEL_FORMAT_LEN] {
        let mut bytes = [0u8; layout::PIXEL_FORMAT_LEN];
        bytes[0] = self.bits_per_pixel;
        bytes[1] = self.depth;
        bytes[2] = u8::from(self.big_endian);
        bytes[3] = u8::from(self.true_color);
        bytes[4..6].copy_from_slice(&self.red_max.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.green_max.to_be_bytes());
        bytes[8..10].copy_from_slice(&self.blue_max.to_be_bytes());
        bytes[10] = self.red_shift;
        bytes[11] = self.green_shift;
        bytes[12] = self.blue_shift;
        bytes
    }
}

/// The fixed part of a rectangle, read before its encoding is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectangleHeader {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
}

impl RectangleHeader {
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A screen region together with the payload its encoding produced.
///
/// Bounds are not checked against the framebuffer size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rectangle {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
    pub payload: RectanglePayload,
}

impl Rectangle {
    pub fn new(header: RectangleHeader, payload: RectanglePayload) -> Self {
        Self {
            x: header.x,
            y: header.y,
            width: header.width,
            height: header.height,
            encoding: header.encoding,
            payload,
        }
    }

    pub fn header(&self) -> RectangleHeader {
        RectangleHeader {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            encoding: self.encoding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferUpdate {
    pub rect_count: u16,
    /// Wire order; later rectangles may overlap earlier ones.
    pub rectangles: Vec<Rectangle>,
}

impl FramebufferUpdate {
    /// Build an update whose count matches the rectangles given, or `None`
    /// when there are more than `u16::MAX` of them.
    pub fn from_rectangles(rectangles: Vec<Rectangle>) -> Option<Self> {
        let rect_count = u16::try_from(rectangles.len()).ok()?;
        Some(Self {
            rect_count,
            rectangles,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetColorMapEntries {
    pub first_index: u16,
    pub colors: Vec<Color>,
}

impl SetColorMapEntries {
    /// Whether the written range runs past index 65535 and wraps to 0.
    pub fn wraps(&self) -> bool {
        usize::from(self.first_index) + self.colors.len() > layout::COLOR_MAP_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCutText {
    /// Raw bytes as sent; no charset is assumed.
    pub text: Vec<u8>,
}

impl ServerCutText {
    /// Text for display, replacing bytes that are not valid UTF-8.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}

/// A decoded server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    FramebufferUpdate(FramebufferUpdate),
    SetColorMapEntries(SetColorMapEntries),
    Bell,
    ServerCutText(ServerCutText),
}

impl ServerMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::FramebufferUpdate(_) => MessageKind::FramebufferUpdate,
            Self::SetColorMapEntries(_) => MessageKind::SetColorMapEntries,
            Self::Bell => MessageKind::Bell,
            Self::ServerCutText(_) => MessageKind::ServerCutText,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_roundtrip() {
        for kind in [
            MessageKind::FramebufferUpdate,
            MessageKind::SetColorMapEntries,
            MessageKind::Bell,
            MessageKind::ServerCutText,
        ] {
            assert_eq!(MessageKind::try_from(kind.tag()).unwrap(), kind);
        }
    }

    #[test]
    fn message_kind_invalid() {
        let err = MessageKind::try_from(150).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownMessageType { tag: 150 }));
    }

    #[test]
    fn pixel_format_wire_form() {
        let format = PixelFormat::rgb565();
        let bytes = format.to_bytes();
        assert_eq!(bytes[0], 16);
        assert_eq!(&bytes[13..], &[0, 0, 0]);
        assert_eq!(PixelFormat::from_bytes(&bytes), format);
    }

    #[test]
    fn bytes_per_pixel_rejects_odd_sizes() {
        let mut format = PixelFormat::rgb888();
        assert_eq!(format.bytes_per_pixel().unwrap(), 4);
        format.bits_per_pixel = 24;
        assert!(matches!(
            format.bytes_per_pixel(),
            Err(DecodeError::InvalidPixelFormat { bits_per_pixel: 24 })
        ));
    }

    #[test]
    fn color_map_update_wrap_detection() {
        let update = SetColorMapEntries {
            first_index: u16::MAX,
            colors: vec![Color::default(); 2],
        };
        assert!(update.wraps());
        let update = SetColorMapEntries {
            first_index: u16::MAX,
            colors: vec![Color::default()],
        };
        assert!(!update.wraps());
    }

    #[test]
    fn cut_text_is_not_validated() {
        let text = ServerCutText {
            text: vec![b'h', 0xFF, b'i'],
        };
        assert_eq!(text.text.len(), 3);
        assert_eq!(text.text_lossy(), "h\u{FFFD}i");
    }
}
