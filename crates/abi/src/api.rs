//! Function table for the transport library entry points.
//!
//! Every native call made by the bridge and the session handles goes through
//! an [`XioApi`]. Production code resolves it from the shared library with
//! [`crate::LoadedXio`]; tests fill it with recording stand-ins.

use core::ffi::{c_char, c_int, c_void};

use crate::ops::{XioLoopOps, XioSessionAttr, XioSessionOps};
use crate::types::{XioConnection, XioContext, XioMsg, XioServer, XioSession, XioSessionType, XioStr};

pub type CtxOpenFn =
	unsafe extern "C" fn(loop_ops: *mut XioLoopOps, ev_loop: *mut c_void, polling_timeout_us: c_int) -> *mut XioContext;
pub type CtxCloseFn = unsafe extern "C" fn(ctx: *mut XioContext);
pub type BindFn = unsafe extern "C" fn(
	ctx: *mut XioContext,
	ops: *mut XioSessionOps,
	uri: *const c_char,
	src_port: *mut u16,
	flags: i32,
	cb_user_context: *mut c_void,
) -> *mut XioServer;
pub type UnbindFn = unsafe extern "C" fn(server: *mut XioServer) -> c_int;
pub type SessionOpenFn = unsafe extern "C" fn(
	session_type: XioSessionType,
	attr: *mut XioSessionAttr,
	uri: *const c_char,
	initial_sn: u32,
	flags: u32,
	cb_user_context: *mut c_void,
) -> *mut XioSession;
pub type SessionCloseFn = unsafe extern "C" fn(session: *mut XioSession) -> c_int;
pub type ConnectFn = unsafe extern "C" fn(
	session: *mut XioSession,
	ctx: *mut XioContext,
	conn_idx: u32,
	conn_user_context: *mut c_void,
) -> *mut XioConnection;
pub type AcceptFn = unsafe extern "C" fn(
	session: *mut XioSession,
	portals_array: *mut *const c_char,
	portals_array_len: usize,
	user_context: *mut c_void,
	user_context_len: usize,
) -> c_int;
pub type DisconnectFn = unsafe extern "C" fn(conn: *mut XioConnection) -> c_int;
pub type SendRequestFn = unsafe extern "C" fn(conn: *mut XioConnection, req: *mut XioMsg) -> c_int;
pub type SendResponseFn = unsafe extern "C" fn(rsp: *mut XioMsg) -> c_int;
pub type ReleaseResponseFn = unsafe extern "C" fn(rsp: *mut XioMsg) -> c_int;
pub type SessionEventStrFn = unsafe extern "C" fn(event: c_int) -> XioStr;

/// Entry points of the transport library.
#[derive(Debug, Clone, Copy)]
pub struct XioApi {
	pub ctx_open: CtxOpenFn,
	pub ctx_close: CtxCloseFn,
	pub bind: BindFn,
	pub unbind: UnbindFn,
	pub session_open: SessionOpenFn,
	pub session_close: SessionCloseFn,
	pub connect: ConnectFn,
	pub accept: AcceptFn,
	pub disconnect: DisconnectFn,
	pub send_request: SendRequestFn,
	pub send_response: SendResponseFn,
	pub release_response: ReleaseResponseFn,
	pub session_event_str: SessionEventStrFn,
}

impl XioApi {
	/// Library-provided description of a session event.
	///
	/// Falls back to [`crate::XioSessionEvent::name`] when the library
	/// returns null.
	pub fn event_str(&self, event: crate::XioSessionEvent) -> String {
		// SAFETY: xio_session_event_str takes any integer and returns either
		// null or a static NUL-terminated string.
		let raw = unsafe { (self.session_event_str)(event.0) };
		if raw.is_null() {
			return event.name().to_string();
		}
		// SAFETY: non-null results point at static NUL-terminated strings.
		unsafe { core::ffi::CStr::from_ptr(raw) }.to_string_lossy().into_owned()
	}
}
