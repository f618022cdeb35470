//! Recording stand-in for the libxio entry points.
//!
//! [`api`] returns an [`XioApi`] whose functions record every call into
//! thread-local state, so tests running in parallel never observe each other.
//! Native handles handed out are addresses of records owned by that state and
//! stay valid until [`reset`]. The callback tables the code under test
//! registers are kept, and [`Endpoint`] replays notifications through them the
//! way the library would.

use core::ffi::{c_char, c_int, c_void};
use std::cell::RefCell;
use std::ffi::CStr;

use xioloop_abi::{
	XioApi, XioConnection, XioContext, XioLoopOps, XioMsg, XioNewSessionReq, XioNewSessionRsp, XioServer,
	XioSession, XioSessionAttr, XioSessionEventData, XioSessionOps, XioSessionType, XioStatus,
};

/// One recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	CtxOpen {
		polling_timeout_us: c_int,
	},
	CtxClose,
	Bind {
		uri: String,
		flags: i32,
		populated: usize,
	},
	Unbind,
	SessionOpen {
		uri: String,
		initial_sn: u32,
		flags: u32,
		user_context: Vec<u8>,
		user_context_null: bool,
		populated: usize,
	},
	SessionClose,
	Connect {
		conn_idx: u32,
	},
	Accept {
		portals: usize,
		portals_null: bool,
		user_context_len: usize,
		user_context_null: bool,
	},
	Disconnect {
		conn: usize,
	},
	SendRequest {
		conn: usize,
		msg: usize,
	},
	SendResponse {
		msg: usize,
	},
	ReleaseResponse {
		msg: usize,
	},
}

/// Failure switches. Booleans make the matching open call return null;
/// integers are returned as the status of the matching close call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
	pub ctx_open: bool,
	pub bind: bool,
	pub unbind: c_int,
	pub session_open: bool,
	pub session_close: c_int,
	pub connect: bool,
}

/// A callback table together with the user context registered next to it.
///
/// Each replay method panics when its slot was not wired.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
	pub ops: XioSessionOps,
	pub context: *mut c_void,
}

impl Endpoint {
	pub fn session_event(&self, session: *mut XioSession, data: &mut XioSessionEventData) -> c_int {
		let slot = self.ops.on_session_event.expect("on_session_event is not wired");
		unsafe { slot(session, data, self.context) }
	}

	pub fn new_session(&self, session: *mut XioSession, req: *mut XioNewSessionReq) -> c_int {
		let slot = self.ops.on_new_session.expect("on_new_session is not wired");
		unsafe { slot(session, req, self.context) }
	}

	pub fn session_established(&self, session: *mut XioSession, rsp: *mut XioNewSessionRsp) -> c_int {
		let slot = self.ops.on_session_established.expect("on_session_established is not wired");
		unsafe { slot(session, rsp, self.context) }
	}

	pub fn msg(&self, session: *mut XioSession, msg: *mut XioMsg, more_in_batch: c_int) -> c_int {
		let slot = self.ops.on_msg.expect("on_msg is not wired");
		unsafe { slot(session, msg, more_in_batch, self.context) }
	}

	pub fn msg_delivered(&self, session: *mut XioSession, msg: *mut XioMsg, more_in_batch: c_int) -> c_int {
		let slot = self.ops.on_msg_delivered.expect("on_msg_delivered is not wired");
		unsafe { slot(session, msg, more_in_batch, self.context) }
	}

	pub fn msg_error(&self, session: *mut XioSession, error: XioStatus, msg: *mut XioMsg) -> c_int {
		let slot = self.ops.on_msg_error.expect("on_msg_error is not wired");
		unsafe { slot(session, error, msg, self.context) }
	}

	pub fn msg_send_complete(&self, session: *mut XioSession, msg: *mut XioMsg) -> c_int {
		let slot = self.ops.on_msg_send_complete.expect("on_msg_send_complete is not wired");
		unsafe { slot(session, msg, self.context) }
	}

	pub fn assign_data_in_buf(&self, msg: *mut XioMsg) -> c_int {
		let slot = self.ops.assign_data_in_buf.expect("assign_data_in_buf is not wired");
		unsafe { slot(msg, self.context) }
	}
}

struct SessionRecord {
	endpoint: Endpoint,
}

struct ConnectionRecord {
	session: *mut XioSession,
	context: *mut c_void,
}

#[derive(Default)]
struct State {
	calls: Vec<Call>,
	failures: Failures,
	loop_binding: Option<(XioLoopOps, *mut c_void)>,
	contexts: Vec<Box<u8>>,
	servers: Vec<Box<SessionRecord>>,
	sessions: Vec<Box<SessionRecord>>,
	connections: Vec<Box<ConnectionRecord>>,
}

thread_local! {
	static STATE: RefCell<State> = RefCell::new(State::default());
}

fn with_state<R>(f: impl FnOnce(&mut State) -> R) -> R {
	STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Entry points backed by the thread-local recorder.
pub fn api() -> XioApi {
	XioApi {
		ctx_open: mock_ctx_open,
		ctx_close: mock_ctx_close,
		bind: mock_bind,
		unbind: mock_unbind,
		session_open: mock_session_open,
		session_close: mock_session_close,
		connect: mock_connect,
		accept: mock_accept,
		disconnect: mock_disconnect,
		send_request: mock_send_request,
		send_response: mock_send_response,
		release_response: mock_release_response,
		session_event_str: mock_session_event_str,
	}
}

/// Drops every record and failure switch of the current thread.
pub fn reset() {
	with_state(|state| *state = State::default());
}

/// Installs failure switches.
pub fn set_failures(failures: Failures) {
	with_state(|state| state.failures = failures);
}

/// Calls recorded so far.
pub fn calls() -> Vec<Call> {
	with_state(|state| state.calls.clone())
}

/// Number of recorded calls matching `pred`.
pub fn count(pred: impl Fn(&Call) -> bool) -> usize {
	with_state(|state| state.calls.iter().filter(|call| pred(call)).count())
}

/// Loop operations and loop pointer passed to the last `xio_ctx_open`.
pub fn loop_binding() -> Option<(XioLoopOps, *mut c_void)> {
	with_state(|state| state.loop_binding)
}

/// Callback table and context registered by `xio_bind`.
pub fn server_endpoint(server: *mut XioServer) -> Option<Endpoint> {
	with_state(|state| find(&state.servers, server.cast()).map(|rec| rec.endpoint))
}

/// Callback table and context registered by `xio_session_open`.
pub fn session_endpoint(session: *mut XioSession) -> Option<Endpoint> {
	with_state(|state| find(&state.sessions, session.cast()).map(|rec| rec.endpoint))
}

/// Callbacks for a connection: the owning session's table with the
/// connection's own context, as the library routes them.
pub fn connection_endpoint(conn: *mut XioConnection) -> Option<(Endpoint, *mut XioSession)> {
	with_state(|state| {
		let conn = find(&state.connections, conn.cast())?;
		let session = find(&state.sessions, conn.session.cast())?;
		Some((
			Endpoint {
				ops: session.endpoint.ops,
				context: conn.context,
			},
			conn.session,
		))
	})
}

/// A distinct, never dereferenced pointer for use as a message or request.
pub fn fake<T>(tag: usize) -> *mut T {
	std::ptr::without_provenance_mut(tag.max(1) * 16)
}

fn find<T>(records: &[Box<T>], ptr: *mut T) -> Option<&T> {
	records.iter().map(|rec| &**rec).find(|rec| std::ptr::eq(*rec, ptr))
}

fn record(call: Call) {
	with_state(|state| state.calls.push(call));
}

fn uri_string(uri: *const c_char) -> String {
	if uri.is_null() {
		return String::new();
	}
	unsafe { CStr::from_ptr(uri) }.to_string_lossy().into_owned()
}

unsafe extern "C" fn mock_ctx_open(
	loop_ops: *mut XioLoopOps,
	ev_loop: *mut c_void,
	polling_timeout_us: c_int,
) -> *mut XioContext {
	record(Call::CtxOpen { polling_timeout_us });
	with_state(|state| {
		if state.failures.ctx_open {
			return std::ptr::null_mut();
		}
		let ops = unsafe { loop_ops.as_ref() }.copied().unwrap_or_default();
		state.loop_binding = Some((ops, ev_loop));
		let mut ctx = Box::new(0u8);
		let ptr: *mut u8 = &mut *ctx;
		state.contexts.push(ctx);
		ptr.cast()
	})
}

unsafe extern "C" fn mock_ctx_close(_ctx: *mut XioContext) {
	record(Call::CtxClose);
}

unsafe extern "C" fn mock_bind(
	_ctx: *mut XioContext,
	ops: *mut XioSessionOps,
	uri: *const c_char,
	src_port: *mut u16,
	flags: i32,
	cb_user_context: *mut c_void,
) -> *mut XioServer {
	let ops = unsafe { ops.as_ref() }.copied().unwrap_or_default();
	record(Call::Bind {
		uri: uri_string(uri),
		flags,
		populated: ops.populated(),
	});
	if let Some(port) = unsafe { src_port.as_mut() } {
		*port = 18515;
	}
	with_state(|state| {
		if state.failures.bind {
			return std::ptr::null_mut();
		}
		let mut rec = Box::new(SessionRecord {
			endpoint: Endpoint {
				ops,
				context: cb_user_context,
			},
		});
		let ptr: *mut SessionRecord = &mut *rec;
		state.servers.push(rec);
		ptr.cast()
	})
}

unsafe extern "C" fn mock_unbind(_server: *mut XioServer) -> c_int {
	record(Call::Unbind);
	with_state(|state| state.failures.unbind)
}

unsafe extern "C" fn mock_session_open(
	_session_type: XioSessionType,
	attr: *mut XioSessionAttr,
	uri: *const c_char,
	initial_sn: u32,
	flags: u32,
	cb_user_context: *mut c_void,
) -> *mut XioSession {
	let user_context_null = unsafe { attr.as_ref() }.is_none_or(|attr| attr.user_context.is_null());
	let (ops, user_context) = match unsafe { attr.as_ref() } {
		Some(attr) => {
			let ops = unsafe { attr.ses_ops.as_ref() }.copied().unwrap_or_default();
			let bytes = if attr.user_context.is_null() {
				Vec::new()
			} else {
				unsafe { std::slice::from_raw_parts(attr.user_context.cast::<u8>(), attr.user_context_len) }.to_vec()
			};
			(ops, bytes)
		}
		None => (XioSessionOps::default(), Vec::new()),
	};
	record(Call::SessionOpen {
		uri: uri_string(uri),
		initial_sn,
		flags,
		user_context,
		user_context_null,
		populated: ops.populated(),
	});
	with_state(|state| {
		if state.failures.session_open {
			return std::ptr::null_mut();
		}
		let mut rec = Box::new(SessionRecord {
			endpoint: Endpoint {
				ops,
				context: cb_user_context,
			},
		});
		let ptr: *mut SessionRecord = &mut *rec;
		state.sessions.push(rec);
		ptr.cast()
	})
}

unsafe extern "C" fn mock_session_close(_session: *mut XioSession) -> c_int {
	record(Call::SessionClose);
	with_state(|state| state.failures.session_close)
}

unsafe extern "C" fn mock_connect(
	session: *mut XioSession,
	_ctx: *mut XioContext,
	conn_idx: u32,
	conn_user_context: *mut c_void,
) -> *mut XioConnection {
	record(Call::Connect { conn_idx });
	with_state(|state| {
		if state.failures.connect {
			return std::ptr::null_mut();
		}
		let mut rec = Box::new(ConnectionRecord {
			session,
			context: conn_user_context,
		});
		let ptr: *mut ConnectionRecord = &mut *rec;
		state.connections.push(rec);
		ptr.cast()
	})
}

unsafe extern "C" fn mock_accept(
	_session: *mut XioSession,
	portals_array: *mut *const c_char,
	portals_array_len: usize,
	user_context: *mut c_void,
	user_context_len: usize,
) -> c_int {
	record(Call::Accept {
		portals: portals_array_len,
		portals_null: portals_array.is_null(),
		user_context_len,
		user_context_null: user_context.is_null(),
	});
	0
}

unsafe extern "C" fn mock_disconnect(conn: *mut XioConnection) -> c_int {
	record(Call::Disconnect { conn: conn.addr() });
	0
}

unsafe extern "C" fn mock_send_request(conn: *mut XioConnection, req: *mut XioMsg) -> c_int {
	record(Call::SendRequest {
		conn: conn.addr(),
		msg: req.addr(),
	});
	0
}

unsafe extern "C" fn mock_send_response(rsp: *mut XioMsg) -> c_int {
	record(Call::SendResponse { msg: rsp.addr() });
	0
}

unsafe extern "C" fn mock_release_response(rsp: *mut XioMsg) -> c_int {
	record(Call::ReleaseResponse { msg: rsp.addr() });
	0
}

unsafe extern "C" fn mock_session_event_str(event: c_int) -> *const c_char {
	match event {
		1 => c"session teardown".as_ptr(),
		_ => std::ptr::null(),
	}
}
