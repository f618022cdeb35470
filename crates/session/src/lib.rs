//! Typed libxio callbacks and lifecycle handles.
//!
//! Applications implement [`SessionHandler`], overriding only the callbacks
//! they need, and declare those callbacks as a [`Callbacks`] mask. A handle
//! ([`Server`], [`Session`], [`Connection`]) owns the handler at a stable heap
//! address, builds the native callback table from the mask on `open`, and
//! registers itself as the callback user context. The library then reaches
//! the handler through one `extern "C"` trampoline per callback kind.
//!
//! Undeclared callbacks are never wired: overriding a method without setting
//! its bit means the library never calls it.
//!
//! Everything here is single-threaded. Handles are `!Send` and every callback
//! runs on the thread driving the reactor.

mod binding;
pub mod callbacks;
pub mod connection;
pub mod cx;
pub mod error;
pub mod lifecycle;
pub mod server;
pub mod session;
mod trampoline;

pub use callbacks::{Callbacks, SessionHandler};
pub use connection::Connection;
pub use cx::Cx;
pub use error::{Error, HandleKind, Result};
pub use lifecycle::{Lifecycle, State};
pub use server::Server;
pub use session::Session;
pub use xioloop_abi as abi;
