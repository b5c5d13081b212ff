use cots_stream::{BridgeReceiver, BridgeSender, Emit};
use tracing::debug;

/// Status text sent once the queue has drained.
pub const STATUS_IDLE: &str = "idle";

/// Notification from the builder thread to the consumer.
///
/// Signals are hints: a consumer reacts by re-reading state through the
/// query surface, so a dropped or repeated signal is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
	/// The initial crawl started (`true`) or its first job finished (`false`).
	SetBusy(bool),
	/// The index changed; re-read the listing.
	Update,
	/// Human-readable progress text.
	Status(String),
	/// The builder thread failed and stopped.
	Error(String),
}

impl Signal {
	#[must_use]
	pub fn is_idle(&self) -> bool {
		matches!(self, Self::Status(text) if text == STATUS_IDLE)
	}
}

pub type SignalReceiver = BridgeReceiver<Signal>;

/// Sending half owned by the builder thread.
#[derive(Debug, Clone)]
pub(crate) struct Signals {
	sender: BridgeSender<Signal>,
}

impl Signals {
	pub(crate) fn new(sender: BridgeSender<Signal>) -> Self {
		Self { sender }
	}

	pub(crate) fn emit(&self, signal: Signal) {
		match self.sender.emit(signal) {
			Emit::Delivered => {}
			Emit::Dropped => debug!("signal channel full; dropping signal"),
			Emit::Disconnected => debug!("signal receiver gone; dropping signal"),
		}
	}

	pub(crate) fn status(&self, text: impl Into<String>) {
		self.emit(Signal::Status(text.into()));
	}
}
