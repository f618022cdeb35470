//! Callback-slot tables handed to the library.

use core::ffi::{c_int, c_void};

use crate::types::{XioMsg, XioNewSessionReq, XioNewSessionRsp, XioSession, XioSessionEventData, XioStatus};

pub type OnSessionEventFn =
	unsafe extern "C" fn(session: *mut XioSession, data: *mut XioSessionEventData, cb_user_context: *mut c_void) -> c_int;
pub type OnNewSessionFn =
	unsafe extern "C" fn(session: *mut XioSession, req: *mut XioNewSessionReq, cb_user_context: *mut c_void) -> c_int;
pub type OnSessionEstablishedFn =
	unsafe extern "C" fn(session: *mut XioSession, rsp: *mut XioNewSessionRsp, cb_user_context: *mut c_void) -> c_int;
pub type OnMsgSendCompleteFn =
	unsafe extern "C" fn(session: *mut XioSession, msg: *mut XioMsg, conn_user_context: *mut c_void) -> c_int;
pub type OnMsgFn = unsafe extern "C" fn(
	session: *mut XioSession,
	msg: *mut XioMsg,
	more_in_batch: c_int,
	conn_user_context: *mut c_void,
) -> c_int;
pub type OnMsgErrorFn = unsafe extern "C" fn(
	session: *mut XioSession,
	error: XioStatus,
	msg: *mut XioMsg,
	conn_user_context: *mut c_void,
) -> c_int;
pub type AssignDataInBufFn = unsafe extern "C" fn(msg: *mut XioMsg, conn_user_context: *mut c_void) -> c_int;

/// Per-session callback table (`struct xio_session_ops`).
///
/// A `None` slot tells the library the callback is not implemented.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct XioSessionOps {
	pub on_session_event: Option<OnSessionEventFn>,
	pub on_new_session: Option<OnNewSessionFn>,
	pub on_session_established: Option<OnSessionEstablishedFn>,
	pub on_msg_send_complete: Option<OnMsgSendCompleteFn>,
	pub on_msg: Option<OnMsgFn>,
	pub on_msg_delivered: Option<OnMsgFn>,
	pub on_msg_error: Option<OnMsgErrorFn>,
	pub assign_data_in_buf: Option<AssignDataInBufFn>,
}

impl XioSessionOps {
	/// Number of populated slots.
	pub fn populated(&self) -> usize {
		[
			self.on_session_event.is_some(),
			self.on_new_session.is_some(),
			self.on_session_established.is_some(),
			self.on_msg_send_complete.is_some(),
			self.on_msg.is_some(),
			self.on_msg_delivered.is_some(),
			self.on_msg_error.is_some(),
			self.assign_data_in_buf.is_some(),
		]
		.into_iter()
		.filter(|set| *set)
		.count()
	}
}

/// Session attributes for `xio_session_open`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XioSessionAttr {
	pub ses_ops: *mut XioSessionOps,
	/// Sent to the server with the new-session request. The library copies it.
	pub user_context: *mut c_void,
	pub user_context_len: usize,
}

/// Readiness callback the library asks the event loop to invoke.
pub type XioEvHandler = unsafe extern "C" fn(fd: c_int, events: c_int, data: *mut c_void);

pub type EvLoopAddFn = unsafe extern "C" fn(
	ev_loop: *mut c_void,
	fd: c_int,
	events: c_int,
	handler: Option<XioEvHandler>,
	data: *mut c_void,
) -> c_int;
pub type EvLoopDelFn = unsafe extern "C" fn(ev_loop: *mut c_void, fd: c_int) -> c_int;

/// External event-loop operations (`struct xio_loop_ops`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct XioLoopOps {
	pub ev_loop_add_cb: Option<EvLoopAddFn>,
	pub ev_loop_del_cb: Option<EvLoopDelFn>,
}
