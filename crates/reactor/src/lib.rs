//! Reactor contract consumed by the event-loop bridge.
//!
//! * `Reactor`: register/remove handlers per file descriptor, stop the loop
//! * `EventHandler`: readiness callbacks owned by the reactor once registered
//! * `PollReactor`: single-threaded implementation over `poll(2)`

pub mod error;
pub mod handler;
pub mod poll;

pub use error::ReactorError;
pub use handler::{EventHandler, Interest};
pub use poll::PollReactor;

use std::os::fd::RawFd;

/// Readiness dispatcher owned by the host application.
///
/// Methods take `&self`: handlers register and remove other handlers while
/// the reactor is dispatching to them.
pub trait Reactor {
	/// Starts watching `handler.fd()` for `interest`.
	///
	/// The reactor takes ownership of the handler and drops it once the fd is
	/// no longer watched.
	fn register_handler(&self, handler: Box<dyn EventHandler>, interest: Interest) -> Result<(), ReactorError>;

	/// Stops watching `fd` for `interest`. The handler is dropped when no
	/// interest remains.
	fn remove_handler(&self, fd: RawFd, interest: Interest) -> Result<(), ReactorError>;

	/// Requests the running event loop to return.
	fn end_event_loop(&self);

	/// Whether [`Reactor::end_event_loop`] has been requested.
	fn event_loop_done(&self) -> bool;
}
