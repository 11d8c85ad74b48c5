use std::fs;
use std::path::{Path, PathBuf};

use rfbscope_core::protocols::rfb::{
    Color, FramebufferUpdate, Rectangle, RectangleHeader, RectanglePayload, ServerCutText,
    ServerMessage, SetColorMapEntries, encode_server_message, layout,
};

/// Zlib-compressed rectangles; not decodable by the built-in encodings.
const ENCODING_ZRLE: i32 = 16;

fn main() -> Result<(), String> {
    let root = PathBuf::from("tests/golden");
    write_stream(root.join("mixed").join("input.bin"), &mixed()?)?;
    write_stream(root.join("truncated").join("input.bin"), &truncated()?)?;
    write_stream(
        root.join("unsupported_encoding").join("input.bin"),
        &unsupported_encoding()?,
    )?;
    write_stream(root.join("color_map_wrap").join("input.bin"), &color_map_wrap()?)?;
    Ok(())
}

fn mixed() -> Result<Vec<u8>, String> {
    let messages = [
        update(vec![
            rect(0, 0, 2, 2, layout::ENCODING_RAW, RectanglePayload::Raw {
                pixels: (0u8..16).collect(),
            }),
            rect(8, 8, 4, 4, layout::ENCODING_COPY_RECT, RectanglePayload::CopyRect {
                src_x: 0,
                src_y: 0,
            }),
        ])?,
        colors(0, &[(0xFFFF, 0, 0), (0, 0xFFFF, 0)]),
        ServerMessage::Bell,
        ServerMessage::ServerCutText(ServerCutText {
            text: b"hello".to_vec(),
        }),
        update(vec![rect(
            0,
            0,
            1280,
            720,
            layout::ENCODING_DESKTOP_SIZE,
            RectanglePayload::DesktopSize,
        )])?,
    ];
    encode_all(&messages)
}

/// A Bell, then a color map update cut off inside its second color.
fn truncated() -> Result<Vec<u8>, String> {
    let mut bytes = encode_all(&[ServerMessage::Bell])?;
    let update = encode_all(&[colors(5, &[(0x10, 0x20, 0x30), (0x40, 0x50, 0x60), (0, 0, 0)])])?;
    bytes.extend_from_slice(&update[..14]);
    Ok(bytes)
}

fn unsupported_encoding() -> Result<Vec<u8>, String> {
    let messages = [
        ServerMessage::Bell,
        update(vec![
            rect(0, 0, 1, 1, layout::ENCODING_RAW, RectanglePayload::Raw {
                pixels: vec![1, 2, 3, 4],
            }),
            rect(0, 0, 8, 8, ENCODING_ZRLE, RectanglePayload::Opaque {
                data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }),
        ])?,
    ];
    encode_all(&messages)
}

fn color_map_wrap() -> Result<Vec<u8>, String> {
    let messages = [
        colors(65534, &[(1, 2, 3), (4, 5, 6), (7, 8, 9), (10, 11, 12)]),
        colors(0, &[(0x100, 0x200, 0x300), (0x400, 0x500, 0x600)]),
    ];
    encode_all(&messages)
}

fn rect(x: u16, y: u16, width: u16, height: u16, encoding: i32, payload: RectanglePayload) -> Rectangle {
    Rectangle::new(
        RectangleHeader {
            x,
            y,
            width,
            height,
            encoding,
        },
        payload,
    )
}

fn update(rectangles: Vec<Rectangle>) -> Result<ServerMessage, String> {
    FramebufferUpdate::from_rectangles(rectangles)
        .map(ServerMessage::FramebufferUpdate)
        .ok_or_else(|| "too many rectangles".to_string())
}

fn colors(first_index: u16, colors: &[(u16, u16, u16)]) -> ServerMessage {
    ServerMessage::SetColorMapEntries(SetColorMapEntries {
        first_index,
        colors: colors.iter().map(|&(r, g, b)| Color::new(r, g, b)).collect(),
    })
}

fn encode_all(messages: &[ServerMessage]) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    for message in messages {
        let encoded = encode_server_message(message)
            .map_err(|err| format!("failed to encode {}: {}", message.kind(), err))?;
        bytes.extend_from_slice(&encoded);
    }
    Ok(bytes)
}

fn write_stream(path: PathBuf, bytes: &[u8]) -> Result<(), String> {
    ensure_parent(&path)?;
    fs::write(&path, bytes).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}

fn ensure_parent(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    Ok(())
}
