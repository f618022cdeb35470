//! `extern "C"` entry points the library calls.
//!
//! Each trampoline recovers the receiver from the user context pointer and
//! forwards to the matching [`SessionHandler`](crate::SessionHandler) method,
//! returning its result unchanged.

use core::ffi::{c_int, c_void};
use std::ptr::NonNull;

use xioloop_abi::{XioMsg, XioNewSessionReq, XioNewSessionRsp, XioSession, XioSessionEventData, XioStatus};

use crate::callbacks::{Callbacks, Receiver, SessionHandler};
use crate::cx::Cx;

/// Turns a callback user context back into its receiver.
///
/// The library hands back exactly the pointer it was registered with, so the
/// only check possible here is for null.
pub(crate) fn from_context<T>(ctx: *mut c_void) -> Option<NonNull<T>> {
	NonNull::new(ctx.cast::<T>())
}

/// Splits the receiver behind `ctx`, aborting on a null context.
///
/// # Safety
///
/// `ctx` must be null or point to a live `T` registered for this table.
unsafe fn receiver<'a, T: Receiver>(ctx: *mut c_void, kind: Callbacks) -> (&'a mut dyn SessionHandler, Cx<'a>) {
	let Some(receiver) = from_context::<T>(ctx) else {
		contract_violation(kind, "null user context");
	};
	// SAFETY: the library echoes the pointer registered at bind/open/connect.
	unsafe { T::split(receiver) }
}

#[cold]
fn contract_violation(kind: Callbacks, what: &'static str) -> ! {
	tracing::error!(callback = kind.name(), what, "libxio broke the callback contract, aborting");
	std::process::abort()
}

pub(crate) unsafe extern "C" fn assign_data_in_buf<T: Receiver>(msg: *mut XioMsg, ctx: *mut c_void) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ASSIGN_DATA_IN_BUF) };
	handler.assign_data_in_buf(&mut cx, msg)
}

pub(crate) unsafe extern "C" fn on_msg<T: Receiver>(
	session: *mut XioSession,
	msg: *mut XioMsg,
	more_in_batch: c_int,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_MSG) };
	handler.on_msg(&mut cx, session, msg, more_in_batch)
}

pub(crate) unsafe extern "C" fn on_msg_delivered<T: Receiver>(
	session: *mut XioSession,
	msg: *mut XioMsg,
	more_in_batch: c_int,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_MSG_DELIVERED) };
	handler.on_msg_delivered(&mut cx, session, msg, more_in_batch)
}

pub(crate) unsafe extern "C" fn on_msg_error<T: Receiver>(
	session: *mut XioSession,
	error: XioStatus,
	msg: *mut XioMsg,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_MSG_ERROR) };
	handler.on_msg_error(&mut cx, session, error, msg)
}

pub(crate) unsafe extern "C" fn on_msg_send_complete<T: Receiver>(
	session: *mut XioSession,
	msg: *mut XioMsg,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_MSG_SEND_COMPLETE) };
	handler.on_msg_send_complete(&mut cx, session, msg)
}

pub(crate) unsafe extern "C" fn on_new_session<T: Receiver>(
	session: *mut XioSession,
	req: *mut XioNewSessionReq,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_NEW_SESSION) };
	handler.on_new_session(&mut cx, session, req)
}

pub(crate) unsafe extern "C" fn on_session_established<T: Receiver>(
	session: *mut XioSession,
	rsp: *mut XioNewSessionRsp,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_SESSION_ESTABLISHED) };
	handler.on_session_established(&mut cx, session, rsp)
}

pub(crate) unsafe extern "C" fn on_session_event<T: Receiver>(
	session: *mut XioSession,
	data: *mut XioSessionEventData,
	ctx: *mut c_void,
) -> c_int {
	// SAFETY: event data lives for the duration of the callback.
	let Some(data) = (unsafe { data.as_ref() }) else {
		contract_violation(Callbacks::ON_SESSION_EVENT, "null event data");
	};
	// SAFETY: ctx is the receiver registered for this table.
	let (handler, mut cx) = unsafe { receiver::<T>(ctx, Callbacks::ON_SESSION_EVENT) };
	handler.on_session_event(&mut cx, session, data)
}
