//! Low-level, protocol-agnostic building blocks: the byte cursor and the
//! integer codecs layered on top of it.
pub mod codec;
pub mod cursor;
