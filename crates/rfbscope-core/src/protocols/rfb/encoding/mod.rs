//! Rectangle encodings.
//!
//! Each encoding decodes the body of one rectangle. A FramebufferUpdate
//! builds an [`EncodingRegistry`] from the session's negotiated encodings
//! plus the Raw fallback and resolves every rectangle header through it.

mod copy_rect;
mod desktop_size;
mod raw;

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use super::error::DecodeError;
use super::layout;
use super::session::SessionContext;
use super::types::RectangleHeader;

pub use copy_rect::CopyRectEncoding;
pub use desktop_size::DesktopSizeEncoding;
pub use raw::RawEncoding;

/// A rectangle body decoder, keyed by its wire identifier.
pub trait Encoding: Send + Sync {
    /// Signed wire identifier; pseudo-encodings are negative.
    fn identifier(&self) -> i32;

    fn name(&self) -> &'static str;

    /// Read the body that follows `header` from `stream`.
    fn decode(
        &self,
        header: &RectangleHeader,
        stream: &mut dyn Read,
        session: &dyn SessionContext,
    ) -> Result<RectanglePayload, DecodeError>;
}

/// Decoded rectangle body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RectanglePayload {
    /// Pixels in the session's pixel format, row-major.
    Raw { pixels: Vec<u8> },
    /// Copy from another framebuffer region of the same size.
    CopyRect { src_x: u16, src_y: u16 },
    /// Framebuffer resize; the header carries the new size.
    DesktopSize,
    /// Body bytes of an encoding this crate does not interpret.
    Opaque { data: Vec<u8> },
}

impl RectanglePayload {
    /// Bytes this payload occupies on the wire.
    pub fn wire_len(&self) -> usize {
        match self {
            Self::Raw { pixels } => pixels.len(),
            Self::CopyRect { .. } => layout::COPY_RECT_PAYLOAD_LEN,
            Self::DesktopSize => 0,
            Self::Opaque { data } => data.len(),
        }
    }
}

/// Encodings available to one FramebufferUpdate decode.
pub struct EncodingRegistry {
    entries: HashMap<i32, Arc<dyn Encoding>>,
}

impl EncodingRegistry {
    /// Seed with the negotiated encodings, then install the Raw fallback
    /// over whatever was negotiated under its identifier.
    pub fn for_session(session: &dyn SessionContext) -> Self {
        let negotiated = session.negotiated_encodings();
        let mut entries = HashMap::with_capacity(negotiated.len() + 1);
        for encoding in negotiated {
            entries.insert(encoding.identifier(), Arc::clone(encoding));
        }
        let fallback: Arc<dyn Encoding> = Arc::new(RawEncoding);
        entries.insert(fallback.identifier(), fallback);
        Self { entries }
    }

    pub fn get(&self, identifier: i32) -> Option<&Arc<dyn Encoding>> {
        self.entries.get(&identifier)
    }

    pub fn name_of(&self, identifier: i32) -> Option<&'static str> {
        self.get(identifier).map(|encoding| encoding.name())
    }

    /// Registered identifiers in ascending order.
    pub fn identifiers(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Built-in encoding for a wire identifier.
pub fn builtin_encoding(identifier: i32) -> Option<Arc<dyn Encoding>> {
    match identifier {
        layout::ENCODING_RAW => Some(Arc::new(RawEncoding)),
        layout::ENCODING_COPY_RECT => Some(Arc::new(CopyRectEncoding)),
        layout::ENCODING_DESKTOP_SIZE => Some(Arc::new(DesktopSizeEncoding)),
        _ => None,
    }
}

/// Built-in encoding by name (`raw`, `copyrect`, `desktop-size`) or by
/// decimal identifier.
pub fn builtin_encoding_by_name(name: &str) -> Option<Arc<dyn Encoding>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "raw" => builtin_encoding(layout::ENCODING_RAW),
        "copyrect" | "copy-rect" => builtin_encoding(layout::ENCODING_COPY_RECT),
        "desktop-size" | "desktopsize" => builtin_encoding(layout::ENCODING_DESKTOP_SIZE),
        other => other.parse::<i32>().ok().and_then(builtin_encoding),
    }
}

/// Display name for an identifier, whether or not it is built in.
pub fn encoding_name(identifier: i32) -> &'static str {
    builtin_encoding(identifier).map_or("unknown", |encoding| encoding.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::rfb::session::ClientSession;

    /// Claims the Raw identifier but reads nothing.
    struct ShadowRaw;

    impl Encoding for ShadowRaw {
        fn identifier(&self) -> i32 {
            layout::ENCODING_RAW
        }

        fn name(&self) -> &'static str {
            "shadow"
        }

        fn decode(
            &self,
            _header: &RectangleHeader,
            _stream: &mut dyn Read,
            _session: &dyn SessionContext,
        ) -> Result<RectanglePayload, DecodeError> {
            Ok(RectanglePayload::Opaque { data: Vec::new() })
        }
    }

    #[test]
    fn registry_always_contains_fallback() {
        let session = ClientSession::default();
        let registry = EncodingRegistry::for_session(&session);
        assert_eq!(registry.identifiers(), vec![layout::ENCODING_RAW]);
        assert_eq!(registry.name_of(layout::ENCODING_RAW), Some("raw"));
    }

    #[test]
    fn fallback_replaces_negotiated_entry_with_same_id() {
        let session = ClientSession::default().with_encodings(vec![
            Arc::new(ShadowRaw),
            Arc::new(CopyRectEncoding),
        ]);
        let registry = EncodingRegistry::for_session(&session);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name_of(layout::ENCODING_RAW), Some("raw"));
        assert_eq!(registry.name_of(layout::ENCODING_COPY_RECT), Some("copyrect"));
    }

    #[test]
    fn builtins_resolve_by_name_and_id() {
        assert_eq!(builtin_encoding_by_name("CopyRect").unwrap().identifier(), 1);
        assert_eq!(builtin_encoding_by_name("-223").unwrap().name(), "desktop-size");
        assert!(builtin_encoding_by_name("tight").is_none());
        assert_eq!(encoding_name(7), "unknown");
    }

    #[test]
    fn payload_wire_len() {
        assert_eq!(RectanglePayload::CopyRect { src_x: 1, src_y: 2 }.wire_len(), 4);
        assert_eq!(RectanglePayload::DesktopSize.wire_len(), 0);
        assert_eq!(RectanglePayload::Raw { pixels: vec![0; 12] }.wire_len(), 12);
    }
}
