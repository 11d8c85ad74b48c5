use std::io::Read;

use super::{Encoding, RectanglePayload};
use crate::protocols::rfb::error::DecodeError;
use crate::protocols::rfb::layout;
use crate::protocols::rfb::reader::read_u16_be;
use crate::protocols::rfb::session::SessionContext;
use crate::protocols::rfb::types::RectangleHeader;

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyRectEncoding;

impl Encoding for CopyRectEncoding {
    fn identifier(&self) -> i32 {
        layout::ENCODING_COPY_RECT
    }

    fn name(&self) -> &'static str {
        "copyrect"
    }

    fn decode(
        &self,
        _header: &RectangleHeader,
        stream: &mut dyn Read,
        _session: &dyn SessionContext,
    ) -> Result<RectanglePayload, DecodeError> {
        let src_x = read_u16_be(stream)?;
        let src_y = read_u16_be(stream)?;
        Ok(RectanglePayload::CopyRect { src_x, src_y })
    }
}
