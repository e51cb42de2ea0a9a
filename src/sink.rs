//! Push-style callback interface (spec.md §6), modeled as a trait with
//! default no-op methods rather than raw C function pointers — the
//! idiomatic Rust shape for the teacher's collaborator-trait seams
//! (`CanBus` in the original `protocol/transport/traits/`).
use crate::core::FrameKind;
use crate::protocol::event::EventKind;
use crate::protocol::header::LogHeader;

/// One decoded (or corrupt) frame, handed to `FrameSink::on_frame_ready`.
pub struct FrameEvent<'a> {
    /// Raw wire marker byte, even for a frame kind the decoder didn't
    /// recognize.
    pub marker: u8,
    /// `None` for a marker byte that didn't match any known frame kind.
    pub kind: Option<FrameKind>,
    pub valid: bool,
    /// Decoded field values, absent when the frame was corrupt.
    pub fields: Option<&'a [i32]>,
    pub offset: usize,
    pub length: usize,
}

/// Receives decoded output from one `parse` call. All methods default to
/// doing nothing, so callers implement only what they need.
pub trait FrameSink {
    fn on_metadata_ready(&mut self, _header: &LogHeader) {}
    fn on_frame_ready(&mut self, _event: &FrameEvent) {}
    fn on_event(&mut self, _kind: &EventKind) {}
}

/// A sink that discards everything; useful when a caller only cares about
/// the returned `Stats`.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {}
