use std::io::Read;

use super::{Encoding, RectanglePayload};
use crate::protocols::rfb::error::DecodeError;
use crate::protocols::rfb::layout;
use crate::protocols::rfb::session::SessionContext;
use crate::protocols::rfb::types::RectangleHeader;

/// Pseudo-encoding announcing a framebuffer resize. The rectangle's width
/// and height are the new size; there is no body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopSizeEncoding;

impl Encoding for DesktopSizeEncoding {
    fn identifier(&self) -> i32 {
        layout::ENCODING_DESKTOP_SIZE
    }

    fn name(&self) -> &'static str {
        "desktop-size"
    }

    fn decode(
        &self,
        _header: &RectangleHeader,
        _stream: &mut dyn Read,
        _session: &dyn SessionContext,
    ) -> Result<RectanglePayload, DecodeError> {
        Ok(RectanglePayload::DesktopSize)
    }
}
