use core::ffi::{c_int, c_void};
use std::ops::ControlFlow;
use std::os::fd::RawFd;

use xioloop_abi::XioEvHandler;
use xioloop_reactor::EventHandler;

/// Reactor handler for one descriptor registered by libxio.
///
/// Input and output readiness both invoke the library callback; which
/// direction fired is left for the library to discover.
#[derive(Debug)]
pub struct XioEventHandler {
	fd: RawFd,
	handler: XioEvHandler,
	data: *mut c_void,
}

impl XioEventHandler {
	pub fn new(fd: RawFd, handler: XioEvHandler, data: *mut c_void) -> Self {
		Self { fd, handler, data }
	}

	fn notify(&self, fd: RawFd) {
		// SAFETY: libxio supplied `handler` and `data` together and keeps
		// `data` alive until it removes the descriptor.
		unsafe { (self.handler)(fd as c_int, 0, self.data) };
	}
}

impl EventHandler for XioEventHandler {
	fn fd(&self) -> RawFd {
		self.fd
	}

	fn handle_input(&mut self, fd: RawFd) -> ControlFlow<()> {
		self.notify(fd);
		ControlFlow::Continue(())
	}

	fn handle_output(&mut self, fd: RawFd) -> ControlFlow<()> {
		self.notify(fd);
		ControlFlow::Continue(())
	}
}
