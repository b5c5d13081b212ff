//! Bounded signal bridge for delivering messages from a worker thread to a
//! consumer without ever blocking the worker.
//!
//! The producer side wraps a [`mpsc::SyncSender`] and uses `try_send`, so a
//! slow or absent consumer costs the worker nothing: when the buffer is full
//! the message is dropped and the caller learns about it through [`Emit`].
//! Every message travels inside an [`Envelope`] carrying a monotonically
//! increasing sequence number, which lets consumers detect gaps.
//!
//! ```
//! use cots_stream::{Emit, bridge};
//!
//! let (tx, rx) = bridge::<&'static str>(4);
//! assert_eq!(tx.emit("update"), Emit::Delivered);
//! let envelope = rx.try_next().unwrap();
//! assert_eq!(envelope.seq, 0);
//! assert_eq!(envelope.message, "update");
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::time::Duration;

/// Message emitted by a producer and delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<M> {
	/// Position of the message in the producer's emission order.
	pub seq: u64,
	/// Payload delivered to the consumer.
	pub message: M,
}

impl<M> Envelope<M> {
	/// Transform the payload while preserving the sequence number.
	pub fn map<N>(self, f: impl FnOnce(M) -> N) -> Envelope<N> {
		Envelope {
			seq: self.seq,
			message: f(self.message),
		}
	}
}

/// Outcome of a single [`BridgeSender::emit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
	/// The message was queued for the consumer.
	Delivered,
	/// The buffer was full and the message was discarded.
	Dropped,
	/// The consumer has gone away.
	Disconnected,
}

/// Create a bridge that buffers at most `capacity` undelivered messages.
pub fn bridge<M>(capacity: usize) -> (BridgeSender<M>, BridgeReceiver<M>) {
	let (tx, rx) = mpsc::sync_channel(capacity.max(1));
	let sender = BridgeSender {
		tx,
		seq: Arc::new(AtomicU64::new(0)),
	};
	(sender, BridgeReceiver { rx })
}

/// Producer half of the bridge.
pub struct BridgeSender<M> {
	tx: SyncSender<Envelope<M>>,
	seq: Arc<AtomicU64>,
}

impl<M> BridgeSender<M> {
	/// Emit a message without blocking.
	pub fn emit(&self, message: M) -> Emit {
		let seq = self.seq.fetch_add(1, Ordering::Relaxed);
		match self.tx.try_send(Envelope { seq, message }) {
			Ok(()) => Emit::Delivered,
			Err(TrySendError::Full(_)) => Emit::Dropped,
			Err(TrySendError::Disconnected(_)) => Emit::Disconnected,
		}
	}

	/// Number of messages emitted so far, delivered or not.
	#[must_use]
	pub fn emitted(&self) -> u64 {
		self.seq.load(Ordering::Relaxed)
	}
}

impl<M> Clone for BridgeSender<M> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			seq: Arc::clone(&self.seq),
		}
	}
}

impl<M> fmt::Debug for BridgeSender<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BridgeSender")
			.field("emitted", &self.emitted())
			.finish()
	}
}

/// Consumer half of the bridge.
pub struct BridgeReceiver<M> {
	rx: Receiver<Envelope<M>>,
}

impl<M> BridgeReceiver<M> {
	/// Return the next buffered message, if any.
	pub fn try_next(&self) -> Option<Envelope<M>> {
		match self.rx.try_recv() {
			Ok(envelope) => Some(envelope),
			Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
		}
	}

	/// Wait up to `timeout` for the next message.
	pub fn next_timeout(&self, timeout: Duration) -> Result<Envelope<M>, RecvTimeoutError> {
		self.rx.recv_timeout(timeout)
	}

	/// Block until the next message arrives or every sender is dropped.
	pub fn next_blocking(&self) -> Option<Envelope<M>> {
		self.rx.recv().ok()
	}

	/// Take every message currently buffered.
	pub fn drain(&self) -> Vec<Envelope<M>> {
		let mut out = Vec::new();
		while let Some(envelope) = self.try_next() {
			out.push(envelope);
		}
		out
	}
}

impl<M> fmt::Debug for BridgeReceiver<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("BridgeReceiver(..)")
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use super::*;

	#[test]
	fn sequence_numbers_increase_across_clones() {
		let (tx, rx) = bridge::<u8>(8);
		let other = tx.clone();
		tx.emit(1);
		other.emit(2);
		tx.emit(3);

		let seqs: Vec<u64> = rx.drain().into_iter().map(|env| env.seq).collect();
		assert_eq!(seqs, vec![0, 1, 2]);
		assert_eq!(tx.emitted(), 3);
	}

	#[test]
	fn full_buffer_drops_instead_of_blocking() {
		let (tx, rx) = bridge::<u8>(1);
		assert_eq!(tx.emit(1), Emit::Delivered);
		assert_eq!(tx.emit(2), Emit::Dropped);

		let received: Vec<u8> = rx.drain().into_iter().map(|env| env.message).collect();
		assert_eq!(received, vec![1]);
	}

	#[test]
	fn dropped_receiver_reports_disconnect() {
		let (tx, rx) = bridge::<u8>(1);
		drop(rx);
		assert_eq!(tx.emit(1), Emit::Disconnected);
	}

	#[test]
	fn messages_cross_threads() {
		let (tx, rx) = bridge::<String>(16);
		let worker = thread::spawn(move || {
			for index in 0..5 {
				tx.emit(format!("status {index}"));
			}
		});
		worker.join().expect("worker");

		let messages: Vec<String> = rx.drain().into_iter().map(|env| env.message).collect();
		assert_eq!(messages.len(), 5);
		assert_eq!(messages[4], "status 4");
	}

	#[test]
	fn map_keeps_sequence() {
		let envelope = Envelope {
			seq: 7,
			message: 21,
		};
		let mapped = envelope.map(|value| value * 2);
		assert_eq!(mapped.seq, 7);
		assert_eq!(mapped.message, 42);
	}
}
