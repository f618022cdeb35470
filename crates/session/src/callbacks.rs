//! Callback capability mask, the handler trait, and native table construction.

use core::ffi::c_int;
use std::ptr::NonNull;

use xioloop_abi::{
	XioMsg, XioNewSessionReq, XioNewSessionRsp, XioSession, XioSessionEventData, XioSessionOps, XioStatus,
};

use crate::cx::Cx;
use crate::trampoline;

bitflags::bitflags! {
	/// Callback kinds a handler declares it implements.
	///
	/// Only declared kinds are installed in the native table. A handler method
	/// overridden without its bit here is never called.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Callbacks: u32 {
		const ASSIGN_DATA_IN_BUF = 0x1;
		const ON_MSG = 0x2;
		const ON_MSG_DELIVERED = 0x4;
		const ON_MSG_ERROR = 0x8;
		const ON_MSG_SEND_COMPLETE = 0x10;
		const ON_NEW_SESSION = 0x20;
		const ON_SESSION_ESTABLISHED = 0x40;
		const ON_SESSION_EVENT = 0x80;
	}
}

impl Callbacks {
	/// Name of the lowest set flag, for logging.
	pub fn name(self) -> &'static str {
		self.iter_names().next().map_or("none", |(name, _)| name)
	}
}

/// Application side of the libxio callbacks.
///
/// Every method defaults to returning `0` and doing nothing. `cx` gives the
/// body access to the handle it is registered with; the remaining arguments
/// are exactly what the library passed.
#[allow(unused_variables)]
pub trait SessionHandler {
	/// Supplies a receive buffer for an incoming message.
	fn assign_data_in_buf(&mut self, cx: &mut Cx<'_>, msg: *mut XioMsg) -> c_int {
		0
	}

	fn on_msg(&mut self, cx: &mut Cx<'_>, session: *mut XioSession, msg: *mut XioMsg, more_in_batch: c_int) -> c_int {
		0
	}

	fn on_msg_delivered(
		&mut self,
		cx: &mut Cx<'_>,
		session: *mut XioSession,
		msg: *mut XioMsg,
		more_in_batch: c_int,
	) -> c_int {
		0
	}

	fn on_msg_error(&mut self, cx: &mut Cx<'_>, session: *mut XioSession, error: XioStatus, msg: *mut XioMsg) -> c_int {
		0
	}

	/// A response passed to `xio_send_response` may now be freed.
	fn on_msg_send_complete(&mut self, cx: &mut Cx<'_>, session: *mut XioSession, msg: *mut XioMsg) -> c_int {
		0
	}

	/// A peer asked for a session; call [`Cx::accept`] to take it.
	fn on_new_session(&mut self, cx: &mut Cx<'_>, session: *mut XioSession, req: *mut XioNewSessionReq) -> c_int {
		0
	}

	fn on_session_established(
		&mut self,
		cx: &mut Cx<'_>,
		session: *mut XioSession,
		rsp: *mut XioNewSessionRsp,
	) -> c_int {
		0
	}

	/// Session and connection lifecycle notifications.
	fn on_session_event(&mut self, cx: &mut Cx<'_>, session: *mut XioSession, data: &XioSessionEventData) -> c_int {
		0
	}
}

/// Something registered as a callback user context: it yields the handler to
/// call and the context to call it with.
pub(crate) trait Receiver {
	/// # Safety
	///
	/// `this` must point to a live receiver whose handler is not borrowed for `'a`.
	unsafe fn split<'a>(this: NonNull<Self>) -> (&'a mut dyn SessionHandler, Cx<'a>);
}

/// Builds a native callback table with a slot for each kind in `callbacks`,
/// dispatching to receivers of type `T`.
pub(crate) fn build_session_ops<T: Receiver>(callbacks: Callbacks) -> XioSessionOps {
	let mut ops = XioSessionOps::default();
	if callbacks.contains(Callbacks::ASSIGN_DATA_IN_BUF) {
		ops.assign_data_in_buf = Some(trampoline::assign_data_in_buf::<T>);
	}
	if callbacks.contains(Callbacks::ON_MSG) {
		ops.on_msg = Some(trampoline::on_msg::<T>);
	}
	if callbacks.contains(Callbacks::ON_MSG_DELIVERED) {
		ops.on_msg_delivered = Some(trampoline::on_msg_delivered::<T>);
	}
	if callbacks.contains(Callbacks::ON_MSG_ERROR) {
		ops.on_msg_error = Some(trampoline::on_msg_error::<T>);
	}
	if callbacks.contains(Callbacks::ON_MSG_SEND_COMPLETE) {
		ops.on_msg_send_complete = Some(trampoline::on_msg_send_complete::<T>);
	}
	if callbacks.contains(Callbacks::ON_NEW_SESSION) {
		ops.on_new_session = Some(trampoline::on_new_session::<T>);
	}
	if callbacks.contains(Callbacks::ON_SESSION_ESTABLISHED) {
		ops.on_session_established = Some(trampoline::on_session_established::<T>);
	}
	if callbacks.contains(Callbacks::ON_SESSION_EVENT) {
		ops.on_session_event = Some(trampoline::on_session_event::<T>);
	}
	ops
}

#[cfg(test)]
mod tests;
