//! Host → editor direction: output events streamed as UDP datagrams.
//!
//! ```text
//! host output ─► ChunkedEmitter ─► datagrams ─► StreamListener ─► mpsc ─► consumer
//! ```
//!
//! Datagrams carry raw text with no framing; each one is an independently
//! displayable fragment.

mod controller;
mod emitter;
mod listener;
mod output;

pub use controller::StreamController;
pub use emitter::{ChunkedEmitter, DatagramTransport, EmitReport, MAX_CHUNK_SIZE};
pub use listener::StreamListener;
pub use output::{Fragment, OutputKind, StreamEvent};
