use core::ffi::{c_int, c_void};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use std::ptr::{self, NonNull};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use xioloop_abi::{
	XioApi, XioMsg, XioNewSessionReq, XioNewSessionRsp, XioSession, XioSessionEvent, XioSessionEventData,
	XioSessionOps, XioStatus,
};
use xioloop_mock::{Call, Failures, fake};

use super::*;
use crate::binding::Native;
use crate::error::HandleKind;
use crate::lifecycle::State;
use crate::trampoline::from_context;

const KINDS: [Callbacks; 8] = [
	Callbacks::ASSIGN_DATA_IN_BUF,
	Callbacks::ON_MSG,
	Callbacks::ON_MSG_DELIVERED,
	Callbacks::ON_MSG_ERROR,
	Callbacks::ON_MSG_SEND_COMPLETE,
	Callbacks::ON_NEW_SESSION,
	Callbacks::ON_SESSION_ESTABLISHED,
	Callbacks::ON_SESSION_EVENT,
];

/// Arguments observed by [`Recorder`], as pointer tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Seen {
	kind: Callbacks,
	session: usize,
	target: usize,
	extra: c_int,
}

#[derive(Default)]
struct Recorder {
	seen: Vec<Seen>,
}

impl Recorder {
	fn record(&mut self, kind: Callbacks, session: *mut XioSession, target: usize, extra: c_int) -> c_int {
		self.seen.push(Seen {
			kind,
			session: session.addr() / 16,
			target: target / 16,
			extra,
		});
		0x100 | kind.bits() as c_int
	}
}

impl SessionHandler for Recorder {
	fn assign_data_in_buf(&mut self, _cx: &mut Cx<'_>, msg: *mut XioMsg) -> c_int {
		self.record(Callbacks::ASSIGN_DATA_IN_BUF, ptr::null_mut(), msg.addr(), 0)
	}

	fn on_msg(&mut self, _cx: &mut Cx<'_>, session: *mut XioSession, msg: *mut XioMsg, more: c_int) -> c_int {
		self.record(Callbacks::ON_MSG, session, msg.addr(), more)
	}

	fn on_msg_delivered(&mut self, _cx: &mut Cx<'_>, session: *mut XioSession, msg: *mut XioMsg, more: c_int) -> c_int {
		self.record(Callbacks::ON_MSG_DELIVERED, session, msg.addr(), more)
	}

	fn on_msg_error(&mut self, _cx: &mut Cx<'_>, session: *mut XioSession, error: XioStatus, msg: *mut XioMsg) -> c_int {
		self.record(Callbacks::ON_MSG_ERROR, session, msg.addr(), error.0)
	}

	fn on_msg_send_complete(&mut self, _cx: &mut Cx<'_>, session: *mut XioSession, msg: *mut XioMsg) -> c_int {
		self.record(Callbacks::ON_MSG_SEND_COMPLETE, session, msg.addr(), 0)
	}

	fn on_new_session(&mut self, _cx: &mut Cx<'_>, session: *mut XioSession, req: *mut XioNewSessionReq) -> c_int {
		self.record(Callbacks::ON_NEW_SESSION, session, req.addr(), 0)
	}

	fn on_session_established(
		&mut self,
		_cx: &mut Cx<'_>,
		session: *mut XioSession,
		rsp: *mut XioNewSessionRsp,
	) -> c_int {
		self.record(Callbacks::ON_SESSION_ESTABLISHED, session, rsp.addr(), 0)
	}

	fn on_session_event(&mut self, _cx: &mut Cx<'_>, session: *mut XioSession, data: &XioSessionEventData) -> c_int {
		self.record(Callbacks::ON_SESSION_EVENT, session, data.conn.addr(), data.event.0)
	}
}

/// Handler that overrides nothing.
struct Quiet;

impl SessionHandler for Quiet {}

struct Host<H> {
	api: XioApi,
	native: Native,
	handler: H,
}

impl<H: SessionHandler> Host<H> {
	fn new(handler: H) -> Self {
		Self {
			api: xioloop_mock::api(),
			native: Native::new(HandleKind::Session),
			handler,
		}
	}

	fn context(&mut self) -> *mut c_void {
		ptr::from_mut(self).cast()
	}
}

impl<H: SessionHandler + 'static> Receiver for Host<H> {
	unsafe fn split<'a>(this: NonNull<Self>) -> (&'a mut dyn SessionHandler, Cx<'a>) {
		let this = this.as_ptr();
		unsafe {
			let native = NonNull::new_unchecked(&raw mut (*this).native);
			(&mut (*this).handler, Cx::new((*this).api, native))
		}
	}
}

/// Closes its own handle from inside `on_msg`, recording the state around it.
#[derive(Default)]
struct Closer {
	seen: Vec<(State, bool, State)>,
}

impl SessionHandler for Closer {
	fn on_msg(&mut self, cx: &mut Cx<'_>, _session: *mut XioSession, _msg: *mut XioMsg, _more: c_int) -> c_int {
		let before = cx.state();
		let closed = cx.close().is_ok();
		self.seen.push((before, closed, cx.state()));
		0
	}
}

const ABORT_CASE: &str = "XIOLOOP_ABORT_CASE";
const SIGABRT: i32 = 6;

/// Reruns `test` alone in a child copy of this binary with [`ABORT_CASE`] set.
fn run_child(test: &str) -> ExitStatus {
	Command::new(std::env::current_exe().unwrap())
		.args([test, "--exact", "--nocapture", "--test-threads=1"])
		.env(ABORT_CASE, "1")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.unwrap()
}

/// Calls the slot for `kind` the way the library would: session tag 1,
/// message/request/response/connection tag 2, batch hint 3, status 5,
/// teardown event.
fn invoke(ops: &XioSessionOps, kind: Callbacks, ctx: *mut c_void) -> Option<c_int> {
	let session = fake::<XioSession>(1);
	let mut data = XioSessionEventData::new(XioSessionEvent::TEARDOWN);
	data.conn = fake(2);
	unsafe {
		if kind == Callbacks::ASSIGN_DATA_IN_BUF {
			ops.assign_data_in_buf.map(|f| f(fake(2), ctx))
		} else if kind == Callbacks::ON_MSG {
			ops.on_msg.map(|f| f(session, fake(2), 3, ctx))
		} else if kind == Callbacks::ON_MSG_DELIVERED {
			ops.on_msg_delivered.map(|f| f(session, fake(2), 3, ctx))
		} else if kind == Callbacks::ON_MSG_ERROR {
			ops.on_msg_error.map(|f| f(session, XioStatus(5), fake(2), ctx))
		} else if kind == Callbacks::ON_MSG_SEND_COMPLETE {
			ops.on_msg_send_complete.map(|f| f(session, fake(2), ctx))
		} else if kind == Callbacks::ON_NEW_SESSION {
			ops.on_new_session.map(|f| f(session, fake(2), ctx))
		} else if kind == Callbacks::ON_SESSION_ESTABLISHED {
			ops.on_session_established.map(|f| f(session, fake(2), ctx))
		} else {
			ops.on_session_event.map(|f| f(session, &mut data, ctx))
		}
	}
}

fn wired(ops: &XioSessionOps) -> Callbacks {
	let mut mask = Callbacks::empty();
	mask.set(Callbacks::ASSIGN_DATA_IN_BUF, ops.assign_data_in_buf.is_some());
	mask.set(Callbacks::ON_MSG, ops.on_msg.is_some());
	mask.set(Callbacks::ON_MSG_DELIVERED, ops.on_msg_delivered.is_some());
	mask.set(Callbacks::ON_MSG_ERROR, ops.on_msg_error.is_some());
	mask.set(Callbacks::ON_MSG_SEND_COMPLETE, ops.on_msg_send_complete.is_some());
	mask.set(Callbacks::ON_NEW_SESSION, ops.on_new_session.is_some());
	mask.set(Callbacks::ON_SESSION_ESTABLISHED, ops.on_session_established.is_some());
	mask.set(Callbacks::ON_SESSION_EVENT, ops.on_session_event.is_some());
	mask
}

#[test]
fn flag_values_match_native_bits() {
	assert_eq!(Callbacks::all().bits(), 0xff);
	assert_eq!(Callbacks::ON_MSG_SEND_COMPLETE.bits(), 0x10);
	assert_eq!(Callbacks::ON_SESSION_EVENT.bits(), 0x80);
}

#[test]
fn names() {
	assert_eq!(Callbacks::ON_MSG.name(), "ON_MSG");
	assert_eq!(Callbacks::empty().name(), "none");
}

#[test]
fn empty_mask_builds_empty_table() {
	let ops = build_session_ops::<Host<Recorder>>(Callbacks::empty());
	assert_eq!(ops.populated(), 0);
}

#[rstest]
#[case(Callbacks::ASSIGN_DATA_IN_BUF, 0, 0)]
#[case(Callbacks::ON_MSG, 1, 3)]
#[case(Callbacks::ON_MSG_DELIVERED, 1, 3)]
#[case(Callbacks::ON_MSG_ERROR, 1, 5)]
#[case(Callbacks::ON_MSG_SEND_COMPLETE, 1, 0)]
#[case(Callbacks::ON_NEW_SESSION, 1, 0)]
#[case(Callbacks::ON_SESSION_ESTABLISHED, 1, 0)]
#[case(Callbacks::ON_SESSION_EVENT, 1, XioSessionEvent::TEARDOWN.0)]
fn declared_slot_forwards_arguments_and_result(#[case] kind: Callbacks, #[case] session: usize, #[case] extra: c_int) {
	let mut host = Host::new(Recorder::default());
	let ops = build_session_ops::<Host<Recorder>>(kind);
	assert_eq!(ops.populated(), 1);

	let ret = invoke(&ops, kind, host.context());

	assert_eq!(ret, Some(0x100 | kind.bits() as c_int));
	assert_eq!(host.handler.seen, vec![Seen {
		kind,
		session,
		target: 2,
		extra,
	}]);
}

#[test]
fn overridden_but_undeclared_is_never_called() {
	for kind in KINDS {
		let mut host = Host::new(Recorder::default());
		let ops = build_session_ops::<Host<Recorder>>(Callbacks::all() - kind);

		assert_eq!(invoke(&ops, kind, host.context()), None, "{}", kind.name());
		assert!(host.handler.seen.is_empty());
	}
}

#[test]
fn declared_but_not_overridden_returns_zero() {
	let mut host = Host::new(Quiet);
	let ops = build_session_ops::<Host<Quiet>>(Callbacks::all());

	for kind in KINDS {
		assert_eq!(invoke(&ops, kind, host.context()), Some(0), "{}", kind.name());
	}
}

#[test]
fn from_context_maps_null_to_none() {
	assert!(from_context::<u32>(ptr::null_mut()).is_none());

	let mut value = 5u32;
	let ctx = ptr::from_mut(&mut value).cast();
	let mut back = from_context::<u32>(ctx).expect("non-null context");
	unsafe { *back.as_mut() += 1 };
	assert_eq!(value, 6);
}

#[test]
fn closing_from_a_callback_releases_the_handle_once() {
	xioloop_mock::reset();
	let mut host = Host::new(Closer::default());
	host.native.handle.opened(NonNull::new(fake::<c_void>(7)).unwrap());
	let ops = build_session_ops::<Host<Closer>>(Callbacks::ON_MSG);

	let ctx = host.context();
	assert_eq!(invoke(&ops, Callbacks::ON_MSG, ctx), Some(0));
	assert_eq!(invoke(&ops, Callbacks::ON_MSG, ctx), Some(0));

	assert_eq!(host.handler.seen, vec![(State::Open, true, State::Closed), (State::Closed, true, State::Closed)]);
	assert_eq!(xioloop_mock::calls(), vec![Call::SessionClose]);
	assert_eq!(host.native.handle.state(), State::Closed);
}

#[test]
fn failed_close_from_a_callback_keeps_the_handle_open() {
	xioloop_mock::reset();
	xioloop_mock::set_failures(Failures {
		session_close: -1,
		..Failures::default()
	});
	let mut host = Host::new(Closer::default());
	host.native.handle.opened(NonNull::new(fake::<c_void>(7)).unwrap());
	let ops = build_session_ops::<Host<Closer>>(Callbacks::ON_MSG);

	assert_eq!(invoke(&ops, Callbacks::ON_MSG, host.context()), Some(0));

	assert_eq!(host.handler.seen, vec![(State::Open, false, State::Open)]);
	assert_eq!(host.native.handle.state(), State::Open);
	xioloop_mock::reset();
}

#[test]
fn null_user_context_aborts() {
	if std::env::var_os(ABORT_CASE).is_some() {
		let ops = build_session_ops::<Host<Recorder>>(Callbacks::ON_MSG);
		invoke(&ops, Callbacks::ON_MSG, ptr::null_mut());
		return;
	}

	let status = run_child("callbacks::tests::null_user_context_aborts");
	assert!(!status.success());
	assert_eq!(status.signal(), Some(SIGABRT));
}

#[test]
fn null_event_data_aborts() {
	if std::env::var_os(ABORT_CASE).is_some() {
		let mut host = Host::new(Recorder::default());
		let ops = build_session_ops::<Host<Recorder>>(Callbacks::ON_SESSION_EVENT);
		let slot = ops.on_session_event.unwrap();
		unsafe { slot(fake(1), ptr::null_mut(), host.context()) };
		return;
	}

	let status = run_child("callbacks::tests::null_event_data_aborts");
	assert!(!status.success());
	assert_eq!(status.signal(), Some(SIGABRT));
}

proptest! {
	#[test]
	fn table_matches_mask(bits in any::<u32>()) {
		let mask = Callbacks::from_bits_truncate(bits);
		let ops = build_session_ops::<Host<Quiet>>(mask);

		prop_assert_eq!(wired(&ops), mask);
		prop_assert_eq!(ops.populated(), mask.bits().count_ones() as usize);
	}
}
