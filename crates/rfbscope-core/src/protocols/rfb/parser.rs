use std::io::{self, Read};

use log::Log;

use super::encoding::EncodingRegistry;
use super::error::{DecodeError, LimitKind};
use super::layout;
use super::reader::WireReader;
use super::session::SessionContext;
use super::types::{
    Color, DecodePhase, FramebufferUpdate, Rectangle, RectangleHeader, ServerCutText,
    ServerMessage, SetColorMapEntries,
};
use crate::protocols::common::diag;

type MessageDecoder = fn(
    &mut WireReader<'_>,
    &mut dyn SessionContext,
    &dyn Log,
) -> Result<ServerMessage, DecodeError>;

/// Decoders indexed by message type tag.
static ROUTES: [MessageDecoder; 4] = [
    decode_framebuffer_update,
    decode_set_color_map_entries,
    decode_bell,
    decode_server_cut_text,
];

/// Read one message type tag from `stream`, then decode the message body.
pub fn read_server_message(
    stream: &mut dyn Read,
    session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    let mut reader = WireReader::new(stream);
    let tag = reader.read_tag()?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream ended before a message type",
        )
    })?;
    decode_with_reader(tag, &mut reader, session, logger)
}

/// Decode the body of a message whose type tag was already consumed.
pub fn decode_message(
    tag: u8,
    stream: &mut dyn Read,
    session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    let mut reader = WireReader::new(stream);
    decode_with_reader(tag, &mut reader, session, logger)
}

pub(crate) fn decode_with_reader(
    tag: u8,
    reader: &mut WireReader<'_>,
    session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    reader.set_phase(DecodePhase::DecodingHeader);
    let result = match ROUTES.get(usize::from(tag)).copied() {
        Some(decoder) => decoder(reader, session, logger),
        None => Err(DecodeError::UnknownMessageType { tag }),
    };
    match result {
        Ok(message) => {
            reader.set_phase(DecodePhase::Done);
            Ok(message)
        }
        Err(err) => {
            diag::debug(
                logger,
                format_args!(
                    "message type {tag} failed while {} after {} bytes: {err}",
                    reader.phase(),
                    reader.consumed()
                ),
            );
            reader.fail();
            Err(err)
        }
    }
}

fn decode_framebuffer_update(
    reader: &mut WireReader<'_>,
    session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    reader.skip_padding(layout::PADDING_LEN)?;
    let rect_count = reader.read_u16_be()?;
    let limits = *session.limits();
    if usize::from(rect_count) > limits.max_rectangles {
        return Err(DecodeError::LimitExceeded {
            kind: LimitKind::Rectangles,
            limit: limits.max_rectangles as u64,
            actual: u64::from(rect_count),
        });
    }
    reader.set_phase(DecodePhase::DecodingBody);

    let registry = EncodingRegistry::for_session(&*session);
    let mut rectangles =
        Vec::with_capacity(usize::from(rect_count).min(limits.max_rectangles_prealloc));
    for index in 0..rect_count {
        let header = read_rectangle_header(reader)?;
        let Some(encoding) = registry.get(header.encoding) else {
            return Err(DecodeError::UnsupportedEncoding {
                encoding: header.encoding,
            });
        };
        diag::trace(
            logger,
            format_args!(
                "rectangle {index}/{rect_count}: {}x{} at ({}, {}) encoding {} ({})",
                header.width,
                header.height,
                header.x,
                header.y,
                header.encoding,
                encoding.name()
            ),
        );
        let payload = encoding.decode(&header, &mut *reader, &*session)?;
        rectangles.push(Rectangle::new(header, payload));
    }

    diag::debug(
        logger,
        format_args!("framebuffer update with {rect_count} rectangles"),
    );
    Ok(ServerMessage::FramebufferUpdate(FramebufferUpdate {
        rect_count,
        rectangles,
    }))
}

fn read_rectangle_header(reader: &mut WireReader<'_>) -> Result<RectangleHeader, DecodeError> {
    Ok(RectangleHeader {
        x: reader.read_u16_be()?,
        y: reader.read_u16_be()?,
        width: reader.read_u16_be()?,
        height: reader.read_u16_be()?,
        encoding: reader.read_i32_be()?,
    })
}

/// Entries are written into the color map as they are read; a truncated
/// message leaves the earlier ones applied.
fn decode_set_color_map_entries(
    reader: &mut WireReader<'_>,
    session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    reader.skip_padding(layout::PADDING_LEN)?;
    let first_index = reader.read_u16_be()?;
    let count = reader.read_u16_be()?;
    reader.set_phase(DecodePhase::DecodingBody);

    if usize::from(first_index) + usize::from(count) > layout::COLOR_MAP_SIZE {
        diag::debug(
            logger,
            format_args!(
                "color map update of {count} entries from {first_index} wraps past the last index"
            ),
        );
    }

    let mut color_map = session.color_map_writer();
    let mut colors = Vec::with_capacity(usize::from(count));
    for offset in 0..count {
        let color = Color {
            r: reader.read_u16_be()?,
            g: reader.read_u16_be()?,
            b: reader.read_u16_be()?,
        };
        color_map.set(first_index.wrapping_add(offset), color);
        colors.push(color);
    }

    diag::debug(
        logger,
        format_args!("color map update: {count} entries from index {first_index}"),
    );
    Ok(ServerMessage::SetColorMapEntries(SetColorMapEntries {
        first_index,
        colors,
    }))
}

fn decode_bell(
    reader: &mut WireReader<'_>,
    _session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    reader.set_phase(DecodePhase::DecodingBody);
    diag::debug(logger, format_args!("bell"));
    Ok(ServerMessage::Bell)
}

fn decode_server_cut_text(
    reader: &mut WireReader<'_>,
    session: &mut dyn SessionContext,
    logger: &dyn Log,
) -> Result<ServerMessage, DecodeError> {
    reader.skip_padding(layout::PADDING_LEN)?;
    let length = reader.read_u32_be()?;
    let limit = session.limits().max_cut_text_bytes;
    if u64::from(length) > limit as u64 {
        return Err(DecodeError::LimitExceeded {
            kind: LimitKind::CutTextBytes,
            limit: limit as u64,
            actual: u64::from(length),
        });
    }
    reader.set_phase(DecodePhase::DecodingBody);

    // Bounded by the limit check above.
    let text = reader.read_bytes(length as usize)?;
    diag::debug(logger, format_args!("server cut text of {length} bytes"));
    Ok(ServerMessage::ServerCutText(ServerCutText { text }))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::protocols::common::diag::testing::RecordingLogger;
    use crate::protocols::rfb::encoding::{
        CopyRectEncoding, DesktopSizeEncoding, Encoding, RectanglePayload,
    };
    use crate::protocols::rfb::limits::DecodeLimits;
    use crate::protocols::rfb::session::ClientSession;
    use crate::protocols::rfb::types::PixelFormat;
    use crate::protocols::rfb::writer::encode_server_message;

    fn quiet() -> &'static dyn Log {
        log::logger()
    }

    fn rect_header(bytes: &mut Vec<u8>, x: u16, y: u16, w: u16, h: u16, encoding: i32) {
        for field in [x, y, w, h] {
            bytes.extend_from_slice(&field.to_be_bytes());
        }
        bytes.extend_from_slice(&encoding.to_be_bytes());
    }

    /// Claims the Raw identifier and reads a single byte.
    struct OneByteRaw;

    impl Encoding for OneByteRaw {
        fn identifier(&self) -> i32 {
            layout::ENCODING_RAW
        }

        fn name(&self) -> &'static str {
            "one-byte"
        }

        fn decode(
            &self,
            _header: &RectangleHeader,
            stream: &mut dyn Read,
            _session: &dyn SessionContext,
        ) -> Result<RectanglePayload, DecodeError> {
            let mut byte = [0u8; 1];
            stream.read_exact(&mut byte)?;
            Ok(RectanglePayload::Opaque {
                data: byte.to_vec(),
            })
        }
    }

    #[test]
    fn truncated_color_map_update_keeps_applied_entries() {
        let bytes = [
            0x01, 0x00, 0x00, 0x05, 0x00, 0x03, 0x00, 0x10, 0x00, 0x20, 0x00, 0x30, 0x00, 0x40,
        ];
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(bytes.to_vec());
        let err = read_server_message(&mut cursor, &mut session, quiet()).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
        assert!(err.is_unexpected_eof());
        assert_eq!(session.color_map().get(5), Color::new(0x10, 0x20, 0x30));
        assert_eq!(session.color_map().get(6), Color::default());
    }

    #[test]
    fn color_map_update_writes_consecutive_entries() {
        let mut bytes = vec![0x00, 0x00, 0x0A, 0x00, 0x02];
        for value in [1u16, 2, 3, 4, 5, 6] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(bytes);
        let message = decode_message(1, &mut cursor, &mut session, quiet()).unwrap();
        let ServerMessage::SetColorMapEntries(update) = message else {
            panic!("expected color map entries");
        };
        assert_eq!(update.first_index, 10);
        assert_eq!(update.colors, vec![Color::new(1, 2, 3), Color::new(4, 5, 6)]);
        assert_eq!(session.color_map().get(10), Color::new(1, 2, 3));
        assert_eq!(session.color_map().get(11), Color::new(4, 5, 6));
    }

    #[test]
    fn color_map_update_wraps_to_index_zero() {
        let mut bytes = vec![0x00, 0xFF, 0xFF, 0x00, 0x02];
        for value in [7u16, 7, 7, 9, 9, 9] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        let mut session = ClientSession::default();
        let logger = RecordingLogger::default();
        let mut cursor = Cursor::new(bytes);
        decode_message(1, &mut cursor, &mut session, &logger).unwrap();
        assert_eq!(session.color_map().get(u16::MAX), Color::new(7, 7, 7));
        assert_eq!(session.color_map().get(0), Color::new(9, 9, 9));
        assert!(logger.messages().iter().any(|m| m.contains("wraps")));
    }

    #[test]
    fn raw_fallback_decodes_without_negotiation() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x01];
        rect_header(&mut bytes, 0, 0, 16, 16, layout::ENCODING_RAW);
        bytes.extend(std::iter::repeat_n(0x5A, 16 * 16 * 4));
        let mut session = ClientSession::new(PixelFormat::rgb888());
        let mut cursor = Cursor::new(bytes);
        let message = read_server_message(&mut cursor, &mut session, quiet()).unwrap();
        let ServerMessage::FramebufferUpdate(update) = message else {
            panic!("expected framebuffer update");
        };
        assert_eq!(update.rect_count, 1);
        let rect = &update.rectangles[0];
        assert_eq!((rect.width, rect.height), (16, 16));
        assert_eq!(rect.payload.wire_len(), 1024);
    }

    #[test]
    fn unsupported_encoding_discards_message() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x02];
        rect_header(&mut bytes, 0, 0, 1, 1, layout::ENCODING_COPY_RECT);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        rect_header(&mut bytes, 0, 0, 8, 8, 16);
        let mut session =
            ClientSession::default().with_encodings(vec![Arc::new(CopyRectEncoding)]);
        let mut cursor = Cursor::new(bytes);
        let err = read_server_message(&mut cursor, &mut session, quiet()).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedEncoding { encoding: 16 }));
    }

    #[test]
    fn minus_one_is_not_the_raw_fallback() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x01];
        rect_header(&mut bytes, 0, 0, 16, 16, -1);
        bytes.extend(std::iter::repeat_n(0x5A, 16 * 16 * 4));
        let mut session = ClientSession::new(PixelFormat::rgb888());
        let mut cursor = Cursor::new(bytes);
        let err = read_server_message(&mut cursor, &mut session, quiet()).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedEncoding { encoding: -1 }));
        assert_eq!(err.code(), "unsupported-encoding");
    }

    #[test]
    fn negotiated_encoding_is_used() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x02];
        rect_header(&mut bytes, 4, 4, 8, 8, layout::ENCODING_COPY_RECT);
        bytes.extend_from_slice(&[0, 1, 0, 2]);
        rect_header(&mut bytes, 0, 0, 800, 600, layout::ENCODING_DESKTOP_SIZE);
        let mut session = ClientSession::default().with_encodings(vec![
            Arc::new(CopyRectEncoding),
            Arc::new(DesktopSizeEncoding),
        ]);
        let mut cursor = Cursor::new(bytes.clone());
        let message = read_server_message(&mut cursor, &mut session, quiet()).unwrap();
        let ServerMessage::FramebufferUpdate(update) = &message else {
            panic!("expected framebuffer update");
        };
        assert_eq!(
            update.rectangles[0].payload,
            RectanglePayload::CopyRect { src_x: 1, src_y: 2 }
        );
        assert_eq!(update.rectangles[1].payload, RectanglePayload::DesktopSize);
        assert_eq!(encode_server_message(&message).unwrap(), bytes);
    }

    #[test]
    fn fallback_overrides_negotiated_raw() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x01];
        rect_header(&mut bytes, 0, 0, 1, 1, layout::ENCODING_RAW);
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let mut session = ClientSession::default().with_encodings(vec![Arc::new(OneByteRaw)]);
        let mut cursor = Cursor::new(bytes);
        let message = read_server_message(&mut cursor, &mut session, quiet()).unwrap();
        let ServerMessage::FramebufferUpdate(update) = message else {
            panic!("expected framebuffer update");
        };
        assert_eq!(
            update.rectangles[0].payload,
            RectanglePayload::Raw {
                pixels: vec![1, 2, 3, 4]
            }
        );
    }

    #[test]
    fn framebuffer_update_roundtrips() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x02];
        rect_header(&mut bytes, 1, 2, 2, 1, layout::ENCODING_RAW);
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        rect_header(&mut bytes, 3, 4, 1, 1, layout::ENCODING_RAW);
        bytes.push(0xCC);
        let mut session = ClientSession::new(PixelFormat::indexed8());
        let mut cursor = Cursor::new(bytes.clone());
        let message = read_server_message(&mut cursor, &mut session, quiet()).unwrap();
        let expected_len = layout::TAG_LEN
            + layout::FRAMEBUFFER_UPDATE_HEADER_LEN
            + 2 * layout::RECTANGLE_HEADER_LEN
            + 3;
        assert_eq!(cursor.position(), expected_len as u64);
        assert_eq!(encode_server_message(&message).unwrap(), bytes);
    }

    #[test]
    fn rect_count_above_limit_is_rejected() {
        let bytes = vec![0x00, 0x00, 0x01, 0x00];
        let mut session = ClientSession::default().with_limits(DecodeLimits::for_testing());
        let mut cursor = Cursor::new(bytes);
        let err = read_server_message(&mut cursor, &mut session, quiet()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitExceeded {
                kind: LimitKind::Rectangles,
                limit: 16,
                actual: 256,
            }
        ));
    }

    #[test]
    fn bell_consumes_nothing_after_tag() {
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(vec![0x02, 0xFF]);
        let message = read_server_message(&mut cursor, &mut session, quiet()).unwrap();
        assert_eq!(message, ServerMessage::Bell);
        assert_eq!(cursor.position(), 1);
        assert_eq!(session.color_map().populated(), 0);
    }

    #[test]
    fn empty_cut_text_consumes_five_bytes() {
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x02]);
        let message = decode_message(3, &mut cursor, &mut session, quiet()).unwrap();
        assert_eq!(
            message,
            ServerMessage::ServerCutText(ServerCutText { text: Vec::new() })
        );
        assert_eq!(cursor.position(), layout::CUT_TEXT_HEADER_LEN as u64);
    }

    #[test]
    fn cut_text_is_returned_unvalidated() {
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(vec![0x03, 0x00, 0x00, 0x00, 0x00, 0x02, 0xC3, 0x28]);
        let message = read_server_message(&mut cursor, &mut session, quiet()).unwrap();
        let ServerMessage::ServerCutText(cut) = message else {
            panic!("expected cut text");
        };
        assert_eq!(cut.text, vec![0xC3, 0x28]);
    }

    #[test]
    fn cut_text_above_limit_is_rejected_before_reading() {
        let mut session = ClientSession::default().with_limits(DecodeLimits::for_testing());
        let mut cursor = Cursor::new(vec![0x00, 0x00, 0x00, 0x10, 0x00]);
        let err = decode_message(3, &mut cursor, &mut session, quiet()).unwrap_err();
        assert_eq!(err.code(), "limit-exceeded");
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(vec![0x04]);
        let err = read_server_message(&mut cursor, &mut session, quiet()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownMessageType { tag: 4 }));
    }

    #[test]
    fn empty_stream_is_eof() {
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(Vec::new());
        let err = read_server_message(&mut cursor, &mut session, quiet()).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn phases_track_progress() {
        let mut session = ClientSession::default();
        let mut cursor = Cursor::new(vec![0x00, 0x00]);
        let mut reader = WireReader::new(&mut cursor);
        assert_eq!(reader.phase(), DecodePhase::AwaitingTag);
        decode_with_reader(2, &mut reader, &mut session, quiet()).unwrap();
        assert_eq!(reader.phase(), DecodePhase::Done);
        decode_with_reader(0, &mut reader, &mut session, quiet()).unwrap_err();
        assert_eq!(reader.phase(), DecodePhase::Failed);
        assert_eq!(reader.failed_in(), Some(DecodePhase::DecodingHeader));
    }

    #[test]
    fn rectangles_are_logged_through_injected_logger() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x01];
        rect_header(&mut bytes, 0, 0, 1, 1, layout::ENCODING_RAW);
        bytes.push(0x01);
        let mut session = ClientSession::new(PixelFormat::indexed8());
        let logger = RecordingLogger::default();
        let mut cursor = Cursor::new(bytes);
        read_server_message(&mut cursor, &mut session, &logger).unwrap();
        let messages = logger.messages();
        assert!(messages.iter().any(|m| m.starts_with("TRACE rectangle 0/1: 1x1")));
        assert!(messages.iter().any(|m| m == "DEBUG framebuffer update with 1 rectangles"));
    }
}
