//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (byte-cursor access,
//! header parsing, frame decoding, session lookup).
use thiserror::Error;

use crate::core::{EncodingTag, PredictorTag};

//==================================================================================CURSOR_ERROR
#[derive(Debug, Error)]
/// Errors raised while reading from the byte cursor.
pub enum CursorError {
    /// `unread_byte` was called without a preceding successful read.
    #[error("unread_byte called with nothing to push back")]
    NothingToUnread,
}

//==================================================================================CODEC_ERROR
#[derive(Debug, Error)]
/// Errors raised while decoding a field's wire encoding into a residual value.
pub enum CodecError {
    /// Cursor-level misuse while decoding a field.
    #[error(transparent)]
    Cursor(#[from] CursorError),
    /// A `TAG2_3S32` leading byte selected an undefined per-slot width mode.
    #[error("invalid TAG2_3S32 per-slot width selector {selector:#04b}")]
    InvalidTag2Selector { selector: u8 },
}

//==================================================================================HEADER_ERROR
#[derive(Debug, Error)]
/// Soft errors encountered while parsing one `H key:value` header line.
/// None of these fail the overall parse; the offending line is dropped.
pub enum HeaderError {
    #[error("header line missing ':' separator")]
    MissingSeparator,
    #[error("header line exceeds the maximum accepted length")]
    LineTooLong,
    #[error("unrecognized header key {key:?}")]
    UnknownKey { key: String },
    #[error("malformed value for key {key:?}: {value:?}")]
    MalformedValue { key: String, value: String },
}

//==================================================================================DECODE_ERROR
#[derive(Debug, Error)]
/// Fatal errors that abort a `parse` call outright. These correspond to
/// spec.md §7's two fatal classes: malformed/incompatible frame
/// definitions are caught early rather than silently producing wrong data.
pub enum DecodeError {
    /// A predictor referencing a named field (`motor[0]`, `GPS_home[0/1]`)
    /// ran before header finalization resolved that field's index.
    #[error("predictor {predictor:?} used before its cross-field reference was resolved")]
    UnresolvedReference { predictor: PredictorTag },
    /// Frame definition names a predictor tag the decoder does not implement.
    #[error("unknown predictor tag {0:?}")]
    UnknownPredictor(PredictorTag),
    /// Frame definition names an encoding tag the decoder does not implement.
    #[error("unknown encoding tag {0:?}")]
    UnknownEncoding(EncodingTag),
    /// Propagated cursor/codec failure while decoding a field.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

//==================================================================================SESSION_ERROR
#[derive(Debug, Error)]
/// Errors raised by the session/file collaborator layer.
pub enum SessionError {
    /// `parse` received a session index outside `[0, session_count)`.
    #[error("session index {index} out of range (file holds {count} sessions)")]
    IndexOutOfRange { index: usize, count: usize },
    /// The input region is empty.
    #[error("input is zero bytes long")]
    EmptyInput,
    /// Failed to open or map the backing file.
    #[error("failed to map input file: {0}")]
    Io(#[from] std::io::Error),
}

//==================================================================================TOP_LEVEL
#[derive(Debug, Error)]
/// Top-level error type returned by the public API.
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
