//! Protocol decoding modules.
//!
//! The RFB decoder follows a layered structure:
//! - `layout`: message tags, field sizes and encoding identifiers (source of truth)
//! - `reader`: big-endian field access over a blocking byte stream
//! - `parser`: message dispatch and per-message decoding
//! - `encoding`: the per-rectangle pixel decoders and their registry
//! - `error`: explicit, actionable errors
//!
//! Parsers contain no transport logic; they read from any `std::io::Read`
//! and leave connection management to the caller.

pub(crate) mod common;
pub mod rfb;
