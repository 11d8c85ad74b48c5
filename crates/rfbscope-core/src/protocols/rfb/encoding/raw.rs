use std::io::Read;

use super::{Encoding, RectanglePayload};
use crate::protocols::rfb::error::{DecodeError, LimitKind};
use crate::protocols::rfb::layout;
use crate::protocols::rfb::reader::read_bytes;
use crate::protocols::rfb::session::SessionContext;
use crate::protocols::rfb::types::RectangleHeader;

/// Uncompressed pixels, `width * height` of them in the session format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoding;

impl Encoding for RawEncoding {
    fn identifier(&self) -> i32 {
        layout::ENCODING_RAW
    }

    fn name(&self) -> &'static str {
        "raw"
    }

    fn decode(
        &self,
        header: &RectangleHeader,
        stream: &mut dyn Read,
        session: &dyn SessionContext,
    ) -> Result<RectanglePayload, DecodeError> {
        let bytes_per_pixel = session.pixel_format().bytes_per_pixel()?;
        let len = header.pixel_count() * bytes_per_pixel as u64;
        let limit = session.limits().max_rect_payload_bytes;
        let exceeded = || DecodeError::LimitExceeded {
            kind: LimitKind::RectanglePayloadBytes,
            limit: limit as u64,
            actual: len,
        };
        let len_bytes = usize::try_from(len).map_err(|_| exceeded())?;
        if len_bytes > limit {
            return Err(exceeded());
        }
        let pixels = read_bytes(stream, len_bytes)?;
        Ok(RectanglePayload::Raw { pixels })
    }
}
