//! Streaming decoder for small-vehicle flight-controller blackbox
//! telemetry logs: a single binary file holding one or more
//! session-delimited recordings, each an ASCII header block followed by a
//! tagged, predictively-delta-encoded binary frame stream.
pub mod core;
pub mod error;
pub mod infra;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod util;

pub use error::Error;
pub use protocol::header::LogHeader;
pub use protocol::stats::Stats;
pub use session::{LogFile, Session};
pub use sink::{FrameEvent, FrameSink, NullSink};
