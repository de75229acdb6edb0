//! Editor → host direction: scripts delivered over the host's command port.
//!
//! - `codec`: the `function("<escaped>")` invocation syntax
//! - `sender`: one TCP connection per script
//! - `remote`: the scripts that toggle output streaming on the host

mod codec;
mod remote;
mod sender;

pub use codec::{escape, unescape, InvocationCodec};
pub use remote::{is_stop_stream, parse_begin_stream, RemoteCommands};
pub use sender::CommandSender;
