//! Hop A: the message channel between the sandboxed plugin context and the
//! plugin UI.

pub mod message;
pub mod router;
pub mod sandbox;

pub use message::{Envelope, PluginMessage};
pub use router::{channel, BridgeError, PortReceiver, PortSender};
pub use sandbox::{Canvas, CanvasError, FileIdentity, SandboxContext};
