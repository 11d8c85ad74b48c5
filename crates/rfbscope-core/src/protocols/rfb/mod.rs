//! RFB (RFC 6143) server-to-client message decoding.
//!
//! Entry points take the byte stream, the caller's [`SessionContext`] and an
//! injected [`log::Log`]:
//!
//! ```
//! use std::io::Cursor;
//!
//! use rfbscope_core::protocols::rfb::{ClientSession, ServerMessage, read_server_message};
//!
//! let mut session = ClientSession::default();
//! let mut stream = Cursor::new(vec![0x02]);
//! let message = read_server_message(&mut stream, &mut session, log::logger()).unwrap();
//! assert_eq!(message, ServerMessage::Bell);
//! ```

mod color_map;
pub mod encoding;
mod error;
pub mod layout;
mod limits;
mod parser;
mod reader;
mod session;
mod types;
mod writer;

pub use color_map::{ColorMap, ColorMapWriter};
pub use encoding::{
    CopyRectEncoding, DesktopSizeEncoding, Encoding, EncodingRegistry, RawEncoding,
    RectanglePayload, builtin_encoding, builtin_encoding_by_name, encoding_name,
};
pub use error::{DecodeError, LimitKind};
pub use limits::DecodeLimits;
pub use parser::{decode_message, read_server_message};
pub(crate) use parser::decode_with_reader;
pub use reader::WireReader;
pub use session::{ClientSession, SessionContext};
pub use types::{
    Color, DecodePhase, FramebufferUpdate, MessageKind, PixelFormat, Rectangle, RectangleHeader,
    ServerCutText, ServerMessage, SetColorMapEntries,
};
pub use writer::{encode_server_message, write_server_message};
