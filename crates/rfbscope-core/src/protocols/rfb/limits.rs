//! Limits for peer-controlled sizes.

/// Caps applied to sizes read from the wire before they drive allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum `rect_count` accepted in a FramebufferUpdate.
    pub max_rectangles: usize,
    /// Rectangle slots reserved up front, regardless of the declared count.
    pub max_rectangles_prealloc: usize,
    /// Maximum pixel bytes for a single Raw rectangle.
    pub max_rect_payload_bytes: usize,
    /// Maximum ServerCutText length.
    pub max_cut_text_bytes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_rectangles: u16::MAX as usize,
            max_rectangles_prealloc: 4096,
            max_rect_payload_bytes: 64 * 1024 * 1024,
            max_cut_text_bytes: 16 * 1024 * 1024,
        }
    }
}

impl DecodeLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_rectangles: 16,
            max_rectangles_prealloc: 4,
            max_rect_payload_bytes: 4096,
            max_cut_text_bytes: 256,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_rectangles: usize::MAX,
            max_rectangles_prealloc: usize::MAX,
            max_rect_payload_bytes: usize::MAX,
            max_cut_text_bytes: usize::MAX,
        }
    }
}
