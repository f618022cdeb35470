//! Single-threaded reactor over `poll(2)`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::os::fd::{BorrowedFd, RawFd};
use std::rc::Rc;
use std::time::Duration;

use rustix::event::{PollFd, PollFlags, Timespec};
use rustix::io::Errno;

use crate::{EventHandler, Interest, Reactor, ReactorError};

type SharedHandler = Rc<RefCell<Box<dyn EventHandler>>>;

struct Registration {
	interest: Interest,
	handler: SharedHandler,
}

/// Level-triggered reactor driving handlers on the calling thread.
///
/// Registered descriptors must stay open until they are removed.
#[derive(Default)]
pub struct PollReactor {
	handlers: RefCell<BTreeMap<RawFd, Registration>>,
	done: Cell<bool>,
}

impl PollReactor {
	/// Creates a reactor with no handlers.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of watched descriptors.
	pub fn len(&self) -> usize {
		self.handlers.borrow().len()
	}

	/// Returns true when nothing is watched.
	pub fn is_empty(&self) -> bool {
		self.handlers.borrow().is_empty()
	}

	/// Interest currently registered for `fd`.
	pub fn interest(&self, fd: RawFd) -> Option<Interest> {
		self.handlers.borrow().get(&fd).map(|reg| reg.interest)
	}

	/// Clears a previous [`Reactor::end_event_loop`] request.
	pub fn restart(&self) {
		self.done.set(false);
	}

	/// Dispatches events until [`Reactor::end_event_loop`] is requested or no
	/// descriptor is left to watch.
	pub fn run_event_loop(&self) -> Result<(), ReactorError> {
		tracing::debug!(handlers = self.len(), "Reactor loop started");
		while !self.done.get() {
			if self.is_empty() {
				tracing::debug!("Reactor loop has no handlers left");
				break;
			}
			self.handle_events(None)?;
		}
		tracing::debug!(done = self.done.get(), "Reactor loop stopped");
		Ok(())
	}

	/// Waits up to `timeout` (forever when `None`) and dispatches one round
	/// of readiness. Returns the number of handler invocations.
	pub fn handle_events(&self, timeout: Option<Duration>) -> Result<usize, ReactorError> {
		let snapshot: Vec<(RawFd, Interest, SharedHandler)> = self
			.handlers
			.borrow()
			.iter()
			.map(|(fd, reg)| (*fd, reg.interest, Rc::clone(&reg.handler)))
			.collect();
		if snapshot.is_empty() && timeout.is_none() {
			return Ok(0);
		}

		let ready = {
			let mut fds: Vec<PollFd<'_>> = snapshot
				.iter()
				.map(|(fd, interest, _)| {
					// SAFETY: registered descriptors stay open until removed, and
					// removal cannot happen while this poll call is in progress.
					let borrowed = unsafe { BorrowedFd::borrow_raw(*fd) };
					PollFd::from_borrowed_fd(borrowed, poll_flags(*interest))
				})
				.collect();
			let timeout = timeout.map(timespec);
			match rustix::event::poll(&mut fds, timeout.as_ref()) {
				Ok(_) => {}
				Err(err) if err == Errno::INTR => return Ok(0),
				Err(err) => return Err(ReactorError::Poll(err.into())),
			}
			fds.iter().map(PollFd::revents).collect::<Vec<_>>()
		};

		let mut dispatched = 0;
		for ((fd, _, handler), revents) in snapshot.iter().zip(ready) {
			if revents.is_empty() {
				continue;
			}
			if revents.contains(PollFlags::NVAL) {
				tracing::warn!(fd, "Dropping handler for invalid descriptor");
				self.detach(*fd, handler);
				continue;
			}

			if revents.intersects(PollFlags::IN | PollFlags::HUP | PollFlags::ERR)
				&& self.watching(*fd, handler, Interest::READ)
			{
				dispatched += 1;
				if self.dispatch(handler, |h| h.handle_input(*fd)) {
					self.detach(*fd, handler);
					continue;
				}
			}

			if revents.intersects(PollFlags::OUT | PollFlags::HUP | PollFlags::ERR)
				&& self.watching(*fd, handler, Interest::WRITE)
			{
				dispatched += 1;
				if self.dispatch(handler, |h| h.handle_output(*fd)) {
					self.detach(*fd, handler);
				}
			}
		}
		Ok(dispatched)
	}

	/// Whether `handler` is still the registration for `fd` with `interest`.
	///
	/// Earlier dispatches in the same round may have removed or replaced it.
	fn watching(&self, fd: RawFd, handler: &SharedHandler, interest: Interest) -> bool {
		self.handlers
			.borrow()
			.get(&fd)
			.is_some_and(|reg| Rc::ptr_eq(&reg.handler, handler) && reg.interest.contains(interest))
	}

	/// Runs `f` on the handler; returns true when it asked to be dropped.
	fn dispatch(
		&self,
		handler: &SharedHandler,
		f: impl FnOnce(&mut dyn EventHandler) -> std::ops::ControlFlow<()>,
	) -> bool {
		let Ok(mut guard) = handler.try_borrow_mut() else {
			tracing::warn!("Skipping re-entrant dispatch");
			return false;
		};
		f(&mut **guard).is_break()
	}

	fn detach(&self, fd: RawFd, handler: &SharedHandler) {
		let removed = {
			let mut handlers = self.handlers.borrow_mut();
			match handlers.get(&fd) {
				Some(reg) if Rc::ptr_eq(&reg.handler, handler) => handlers.remove(&fd),
				_ => None,
			}
		};
		drop(removed);
	}
}

impl Reactor for PollReactor {
	fn register_handler(&self, handler: Box<dyn EventHandler>, interest: Interest) -> Result<(), ReactorError> {
		let fd = handler.fd();
		if fd < 0 {
			return Err(ReactorError::InvalidFd(fd));
		}
		let mut handlers = self.handlers.borrow_mut();
		if handlers.contains_key(&fd) {
			return Err(ReactorError::AlreadyRegistered(fd));
		}
		handlers.insert(
			fd,
			Registration {
				interest,
				handler: Rc::new(RefCell::new(handler)),
			},
		);
		tracing::trace!(fd, ?interest, "Registered handler");
		Ok(())
	}

	fn remove_handler(&self, fd: RawFd, interest: Interest) -> Result<(), ReactorError> {
		let removed = {
			let mut handlers = self.handlers.borrow_mut();
			let Some(reg) = handlers.get_mut(&fd) else {
				return Err(ReactorError::NotRegistered(fd));
			};
			reg.interest.remove(interest);
			if reg.interest.is_empty() {
				handlers.remove(&fd)
			} else {
				None
			}
		};
		tracing::trace!(fd, ?interest, dropped = removed.is_some(), "Removed handler interest");
		// Dropped outside the borrow: handler destructors may call back in.
		drop(removed);
		Ok(())
	}

	fn end_event_loop(&self) {
		tracing::debug!("Reactor loop stop requested");
		self.done.set(true);
	}

	fn event_loop_done(&self) -> bool {
		self.done.get()
	}
}

impl std::fmt::Debug for PollReactor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PollReactor")
			.field("fds", &self.handlers.borrow().keys().collect::<Vec<_>>())
			.field("done", &self.done.get())
			.finish()
	}
}

fn poll_flags(interest: Interest) -> PollFlags {
	let mut flags = PollFlags::empty();
	if interest.contains(Interest::READ) {
		flags |= PollFlags::IN;
	}
	if interest.contains(Interest::WRITE) {
		flags |= PollFlags::OUT;
	}
	flags
}

fn timespec(timeout: Duration) -> Timespec {
	Timespec {
		tv_sec: timeout.as_secs().min(i64::MAX as u64) as _,
		tv_nsec: timeout.subsec_nanos() as _,
	}
}
