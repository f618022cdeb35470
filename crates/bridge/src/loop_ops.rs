//! `xio_loop_ops` implemented over a [`Reactor`].

use core::ffi::{c_int, c_void};
use std::rc::Rc;

use xioloop_abi::{XIO_POLLIN, XIO_POLLOUT, XioEvHandler, XioLoopOps};
use xioloop_reactor::{Interest, Reactor};

use crate::handler::XioEventHandler;

/// What the library's `ev_loop` pointer refers to.
pub(crate) struct LoopBinding<R> {
	pub(crate) reactor: Rc<R>,
	pub(crate) ops: XioLoopOps,
}

/// Loop operations whose `ev_loop` argument must point at a binding for `R`.
pub fn loop_ops<R: Reactor + 'static>() -> XioLoopOps {
	XioLoopOps {
		ev_loop_add_cb: Some(add_handler::<R>),
		ev_loop_del_cb: Some(remove_handler::<R>),
	}
}

/// Maps libxio readiness bits onto reactor interest.
pub fn interest_from_events(events: c_int) -> Interest {
	let mut interest = Interest::empty();
	if events & XIO_POLLIN != 0 {
		interest |= Interest::READ;
	}
	if events & XIO_POLLOUT != 0 {
		interest |= Interest::WRITE;
	}
	interest
}

unsafe extern "C" fn add_handler<R: Reactor + 'static>(
	ev_loop: *mut c_void,
	fd: c_int,
	events: c_int,
	handler: Option<XioEvHandler>,
	data: *mut c_void,
) -> c_int {
	// SAFETY: libxio echoes the loop pointer given to xio_ctx_open, which is a
	// LoopBinding<R> owned by the open Context.
	let Some(binding) = (unsafe { ev_loop.cast::<LoopBinding<R>>().as_ref() }) else {
		tracing::error!(fd, "Loop add called with null loop");
		return -1;
	};
	let Some(handler) = handler else {
		tracing::warn!(fd, "Loop add called with null handler");
		return -1;
	};

	let interest = interest_from_events(events);
	match binding
		.reactor
		.register_handler(Box::new(XioEventHandler::new(fd, handler, data)), interest)
	{
		Ok(()) => {
			tracing::trace!(fd, ?interest, "Watching descriptor");
			0
		}
		Err(err) => {
			tracing::warn!(fd, %err, "Reactor refused registration");
			-1
		}
	}
}

unsafe extern "C" fn remove_handler<R: Reactor + 'static>(ev_loop: *mut c_void, fd: c_int) -> c_int {
	// SAFETY: see add_handler.
	let Some(binding) = (unsafe { ev_loop.cast::<LoopBinding<R>>().as_ref() }) else {
		tracing::error!(fd, "Loop delete called with null loop");
		return -1;
	};

	match binding.reactor.remove_handler(fd, Interest::ALL) {
		Ok(()) => {
			tracing::trace!(fd, "Stopped watching descriptor");
			0
		}
		Err(err) => {
			tracing::warn!(fd, %err, "Reactor refused removal");
			-1
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn readiness_bits_map_to_interest() {
		assert_eq!(interest_from_events(0), Interest::empty());
		assert_eq!(interest_from_events(XIO_POLLIN), Interest::READ);
		assert_eq!(interest_from_events(XIO_POLLOUT), Interest::WRITE);
		assert_eq!(interest_from_events(XIO_POLLIN | XIO_POLLOUT), Interest::ALL);
		assert_eq!(interest_from_events(xioloop_abi::XIO_POLLET | XIO_POLLIN), Interest::READ);
	}
}
