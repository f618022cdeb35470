//! Event-loop bridge between libxio and a host-owned [`Reactor`].
//!
//! libxio asks its context's loop operations to watch descriptors; this crate
//! implements those operations on top of any [`Reactor`], so the host's event
//! loop serves the transport instead of a private polling thread.
//!
//! The reactor must be driven on the thread that opened the [`Context`]. No
//! synchronisation happens here.

pub mod context;
pub mod error;
pub mod handler;
pub mod loop_ops;

pub use context::{Context, ContextOptions};
pub use error::BridgeError;
pub use handler::XioEventHandler;
pub use loop_ops::{interest_from_events, loop_ops};
pub use xioloop_reactor::Reactor;
