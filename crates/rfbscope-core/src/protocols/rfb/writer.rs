use std::io::{self, Write};

use super::encoding::RectanglePayload;
use super::layout;
use super::types::{Rectangle, ServerMessage};

/// Write the wire form of `message`.
///
/// A FramebufferUpdate is written with its `rect_count` field as stored,
/// followed by the rectangles it holds; keeping the two consistent is up to
/// the caller.
pub fn write_server_message(out: &mut dyn Write, message: &ServerMessage) -> io::Result<()> {
    out.write_all(&[message.kind().tag()])?;
    match message {
        ServerMessage::FramebufferUpdate(update) => {
            out.write_all(&[0u8; layout::PADDING_LEN])?;
            out.write_all(&update.rect_count.to_be_bytes())?;
            for rectangle in &update.rectangles {
                write_rectangle(out, rectangle)?;
            }
        }
        ServerMessage::SetColorMapEntries(entries) => {
            let count = u16::try_from(entries.colors.len())
                .map_err(|_| invalid_input("more than 65535 color map entries"))?;
            out.write_all(&[0u8; layout::PADDING_LEN])?;
            out.write_all(&entries.first_index.to_be_bytes())?;
            out.write_all(&count.to_be_bytes())?;
            for color in &entries.colors {
                out.write_all(&color.r.to_be_bytes())?;
                out.write_all(&color.g.to_be_bytes())?;
                out.write_all(&color.b.to_be_bytes())?;
            }
        }
        ServerMessage::Bell => {}
        ServerMessage::ServerCutText(cut) => {
            let length = u32::try_from(cut.text.len())
                .map_err(|_| invalid_input("cut text longer than u32::MAX bytes"))?;
            out.write_all(&[0u8; layout::PADDING_LEN])?;
            out.write_all(&length.to_be_bytes())?;
            out.write_all(&cut.text)?;
        }
    }
    Ok(())
}

/// Encode `message` into a fresh buffer.
pub fn encode_server_message(message: &ServerMessage) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_server_message(&mut out, message)?;
    Ok(out)
}

fn write_rectangle(out: &mut dyn Write, rectangle: &Rectangle) -> io::Result<()> {
    out.write_all(&rectangle.x.to_be_bytes())?;
    out.write_all(&rectangle.y.to_be_bytes())?;
    out.write_all(&rectangle.width.to_be_bytes())?;
    out.write_all(&rectangle.height.to_be_bytes())?;
    out.write_all(&rectangle.encoding.to_be_bytes())?;
    match &rectangle.payload {
        RectanglePayload::Raw { pixels } => out.write_all(pixels),
        RectanglePayload::CopyRect { src_x, src_y } => {
            out.write_all(&src_x.to_be_bytes())?;
            out.write_all(&src_y.to_be_bytes())
        }
        RectanglePayload::DesktopSize => Ok(()),
        RectanglePayload::Opaque { data } => out.write_all(data),
    }
}

fn invalid_input(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}
