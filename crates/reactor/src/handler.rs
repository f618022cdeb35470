use std::ops::ControlFlow;
use std::os::fd::RawFd;

bitflags::bitflags! {
	/// Readiness directions a handler is registered for.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Interest: u8 {
		/// Input is available or the peer hung up.
		const READ = 1 << 0;
		/// Output will not block.
		const WRITE = 1 << 1;
		/// Every direction.
		const ALL = Self::READ.bits() | Self::WRITE.bits();
	}
}

/// Receives readiness notifications for one file descriptor.
///
/// Returning [`ControlFlow::Break`] asks the reactor to drop the handler.
pub trait EventHandler {
	/// Descriptor this handler watches.
	fn fd(&self) -> RawFd;

	/// Input readiness on `fd`.
	fn handle_input(&mut self, fd: RawFd) -> ControlFlow<()> {
		let _ = fd;
		ControlFlow::Continue(())
	}

	/// Output readiness on `fd`.
	fn handle_output(&mut self, fd: RawFd) -> ControlFlow<()> {
		let _ = fd;
		ControlFlow::Continue(())
	}
}
