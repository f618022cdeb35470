//! Lifecycle rules of the server, session and connection handles.

use std::ptr::NonNull;

use pretty_assertions::assert_eq;
use xioloop_abi::{XioContext, XioMsg, XioSessionEvent};
use xioloop_mock::{Call, Failures, fake};
use xioloop_session::{Callbacks, Connection, Error, HandleKind, Server, Session, SessionHandler, State};

struct Idle;

impl SessionHandler for Idle {}

fn ctx() -> NonNull<XioContext> {
	NonNull::new(fake(9)).unwrap()
}

fn server() -> Server {
	Server::new(xioloop_mock::api(), Callbacks::ON_NEW_SESSION | Callbacks::ON_MSG, Idle)
}

fn open_session() -> Session {
	let mut session = Session::new(xioloop_mock::api(), Callbacks::ON_SESSION_EVENT, Idle);
	session.open("tcp://127.0.0.1:18515", 0, 0, &[]).unwrap();
	session
}

#[test]
fn server_open_close_is_repeatable() {
	xioloop_mock::reset();
	let mut server = server();
	assert_eq!(server.state(), State::Unopened);

	for _ in 0..3 {
		server.open(ctx(), "tcp://127.0.0.1:18515", None, 0).unwrap();
		assert!(server.is_bound());
		server.close().unwrap();
		assert!(!server.is_bound());
		assert_eq!(server.server(), None);
	}

	assert_eq!(xioloop_mock::count(|call| matches!(call, Call::Bind { .. })), 3);
	assert_eq!(xioloop_mock::count(|call| *call == Call::Unbind), 3);
	server.close().unwrap();
	assert_eq!(xioloop_mock::count(|call| *call == Call::Unbind), 3);
}

#[test]
fn server_rejects_second_open() {
	xioloop_mock::reset();
	let mut server = server();
	let first = server.open(ctx(), "tcp://127.0.0.1:18515", None, 0).unwrap();

	let err = server.open(ctx(), "tcp://127.0.0.1:18516", None, 0).unwrap_err();
	assert!(matches!(err, Error::AlreadyOpen(HandleKind::Server)));
	assert_eq!(server.server(), Some(first));
	assert_eq!(xioloop_mock::count(|call| matches!(call, Call::Bind { .. })), 1);
}

#[test]
fn server_reports_bound_port() {
	xioloop_mock::reset();
	let mut server = server();
	let mut port = 0u16;
	server.open(ctx(), "tcp://127.0.0.1:0", Some(&mut port), 0).unwrap();
	assert_eq!(port, 18515);
}

#[test]
fn failed_bind_stores_nothing() {
	xioloop_mock::reset();
	xioloop_mock::set_failures(Failures {
		bind: true,
		..Default::default()
	});
	let mut server = server();

	let err = server.open(ctx(), "tcp://127.0.0.1:18515", None, 0).unwrap_err();
	assert!(matches!(err, Error::Bind { ref uri } if uri == "tcp://127.0.0.1:18515"));
	assert_eq!(server.state(), State::Unopened);
	drop(server);
	assert_eq!(xioloop_mock::count(|call| *call == Call::Unbind), 0);
}

#[test]
fn uri_with_nul_is_rejected_before_binding() {
	xioloop_mock::reset();
	let mut server = server();
	let err = server.open(ctx(), "tcp://\0", None, 0).unwrap_err();
	assert!(matches!(err, Error::Uri(_)));
	assert!(xioloop_mock::calls().is_empty());
}

#[test]
fn failed_unbind_keeps_server_bound() {
	xioloop_mock::reset();
	let mut server = server();
	let native = server.open(ctx(), "tcp://127.0.0.1:18515", None, 0).unwrap();
	xioloop_mock::set_failures(Failures {
		unbind: -1,
		..Default::default()
	});

	let err = server.close().unwrap_err();
	assert!(matches!(err, Error::Native { op: "xio_unbind", code: -1 }));
	assert_eq!(server.server(), Some(native));

	xioloop_mock::set_failures(Failures::default());
	server.close().unwrap();
	assert_eq!(server.state(), State::Closed);
}

#[test]
fn drop_unbinds_open_server() {
	xioloop_mock::reset();
	let mut server = server();
	server.open(ctx(), "tcp://127.0.0.1:18515", None, 0).unwrap();
	drop(server);
	assert_eq!(xioloop_mock::count(|call| *call == Call::Unbind), 1);
}

#[test]
fn drop_survives_failed_unbind() {
	let _ = tracing_subscriber::fmt::try_init();
	xioloop_mock::reset();
	let mut server = server();
	server.open(ctx(), "tcp://127.0.0.1:18515", None, 0).unwrap();
	xioloop_mock::set_failures(Failures {
		unbind: -1,
		..Default::default()
	});
	drop(server);
	assert_eq!(xioloop_mock::count(|call| *call == Call::Unbind), 1);
}

#[test]
fn session_open_passes_attributes_verbatim() {
	xioloop_mock::reset();
	let mut session = Session::new(xioloop_mock::api(), Callbacks::ON_SESSION_EVENT, Idle)
		.with_connection_callbacks(Callbacks::ON_MSG | Callbacks::ON_SESSION_EVENT);
	assert_eq!(
		session.joint_callbacks(),
		Callbacks::ON_SESSION_EVENT | Callbacks::ON_MSG
	);

	session.open("rdma://10.0.0.1:1234", 17, 2, b"hello").unwrap();

	assert_eq!(xioloop_mock::calls(), vec![Call::SessionOpen {
		uri: "rdma://10.0.0.1:1234".to_owned(),
		initial_sn: 17,
		flags: 2,
		user_context: b"hello".to_vec(),
		user_context_null: false,
		populated: 2,
	}]);
	assert!(session.is_open());
}

#[test]
fn empty_session_user_context_is_passed_as_null() {
	xioloop_mock::reset();
	let _session = open_session();

	assert_eq!(xioloop_mock::calls(), vec![Call::SessionOpen {
		uri: "tcp://127.0.0.1:18515".to_owned(),
		initial_sn: 0,
		flags: 0,
		user_context: Vec::new(),
		user_context_null: true,
		populated: 1,
	}]);
}

#[test]
fn session_reopens_after_close() {
	xioloop_mock::reset();
	let mut session = open_session();
	assert!(matches!(
		session.open("tcp://127.0.0.1:18515", 0, 0, &[]),
		Err(Error::AlreadyOpen(HandleKind::Session))
	));

	session.close().unwrap();
	assert_eq!(session.state(), State::Closed);
	session.open("tcp://127.0.0.1:18515", 0, 0, &[]).unwrap();
	assert!(session.is_open());
}

#[test]
fn failed_session_open_and_close() {
	xioloop_mock::reset();
	xioloop_mock::set_failures(Failures {
		session_open: true,
		..Default::default()
	});
	let mut session = Session::new(xioloop_mock::api(), Callbacks::empty(), Idle);
	assert!(matches!(
		session.open("tcp://127.0.0.1:18515", 0, 0, &[]),
		Err(Error::SessionOpen { .. })
	));
	assert_eq!(session.state(), State::Unopened);

	xioloop_mock::set_failures(Failures {
		session_close: 5,
		..Default::default()
	});
	session.open("tcp://127.0.0.1:18515", 0, 0, &[]).unwrap();
	assert!(matches!(
		session.close(),
		Err(Error::Native {
			op: "xio_session_close",
			code: 5
		})
	));
	assert!(session.is_open());

	xioloop_mock::set_failures(Failures::default());
}

#[test]
fn second_connect_fails_and_keeps_first_connection() {
	xioloop_mock::reset();
	let session = open_session();
	let mut conn = Connection::new(xioloop_mock::api(), Idle);
	let first = conn.open(&session, ctx(), 0).unwrap();

	let err = conn.open(&session, ctx(), 1).unwrap_err();
	assert!(matches!(err, Error::AlreadyOpen(HandleKind::Connection)));
	assert_eq!(conn.connection(), Some(first));
	assert_eq!(conn.session(), session.session());
	assert_eq!(xioloop_mock::count(|call| matches!(call, Call::Connect { .. })), 1);
	conn.close();
}

#[test]
fn connect_needs_open_session() {
	xioloop_mock::reset();
	let session = Session::new(xioloop_mock::api(), Callbacks::empty(), Idle);
	let mut conn = Connection::new(xioloop_mock::api(), Idle);

	assert!(matches!(conn.open(&session, ctx(), 0), Err(Error::SessionNotOpen)));
	assert!(xioloop_mock::calls().is_empty());
}

#[test]
fn failed_connect_records_nothing() {
	xioloop_mock::reset();
	let session = open_session();
	xioloop_mock::set_failures(Failures {
		connect: true,
		..Default::default()
	});
	let mut conn = Connection::new(xioloop_mock::api(), Idle);

	assert!(matches!(conn.open(&session, ctx(), 3), Err(Error::Connect { conn_idx: 3 })));
	assert_eq!(conn.state(), State::Unopened);
	assert_eq!(conn.session(), None);
}

#[test]
fn connection_close_is_local_and_terminal() {
	xioloop_mock::reset();
	let session = open_session();
	let mut conn = Connection::new(xioloop_mock::api(), Idle);
	conn.open(&session, ctx(), 0).unwrap();
	let before = xioloop_mock::calls();

	conn.close();
	assert_eq!(xioloop_mock::calls(), before);
	assert_eq!(conn.state(), State::Closed);
	assert_eq!(conn.connection(), None);
	assert_eq!(conn.session(), None);

	assert!(matches!(
		conn.open(&session, ctx(), 0),
		Err(Error::Reopen(HandleKind::Connection))
	));
}

#[test]
fn send_request_needs_connection() {
	xioloop_mock::reset();
	let session = open_session();
	let mut conn = Connection::new(xioloop_mock::api(), Idle);
	let msg = fake::<XioMsg>(4);

	assert!(matches!(
		unsafe { conn.send_request(msg) },
		Err(Error::NotOpen(HandleKind::Connection))
	));

	let native = conn.open(&session, ctx(), 0).unwrap();
	unsafe { conn.send_request(msg) }.unwrap();
	assert_eq!(xioloop_mock::calls().last(), Some(&Call::SendRequest {
		conn: native.as_ptr().addr(),
		msg: msg.addr(),
	}));
	conn.close();
}

#[test]
fn event_names_fall_back_when_library_has_none() {
	let api = xioloop_mock::api();
	assert_eq!(api.event_str(XioSessionEvent::TEARDOWN), "session teardown");
	assert_eq!(api.event_str(XioSessionEvent::CONNECTION_ERROR), "connection_error");
}
