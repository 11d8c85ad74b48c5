//! Server-to-client message tags, field sizes and encoding identifiers
//! (RFC 6143 §7.6 and §7.7).

pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;
pub const MSG_SET_COLOR_MAP_ENTRIES: u8 = 1;
pub const MSG_BELL: u8 = 2;
pub const MSG_SERVER_CUT_TEXT: u8 = 3;

pub const TAG_LEN: usize = 1;
pub const PADDING_LEN: usize = 1;

/// pad + rect_count
pub const FRAMEBUFFER_UPDATE_HEADER_LEN: usize = PADDING_LEN + 2;
/// x, y, width, height, encoding
pub const RECTANGLE_HEADER_LEN: usize = 2 * 4 + 4;

/// pad + first_index + count
pub const COLOR_MAP_HEADER_LEN: usize = PADDING_LEN + 2 + 2;
/// r, g, b
pub const COLOR_LEN: usize = 2 * 3;
pub const COLOR_MAP_SIZE: usize = 1 << 16;

/// pad + length
pub const CUT_TEXT_HEADER_LEN: usize = PADDING_LEN + 4;

pub const PIXEL_FORMAT_LEN: usize = 16;

pub const ENCODING_RAW: i32 = 0;
pub const ENCODING_COPY_RECT: i32 = 1;
pub const ENCODING_DESKTOP_SIZE: i32 = -223;

/// src_x, src_y
pub const COPY_RECT_PAYLOAD_LEN: usize = 2 * 2;
