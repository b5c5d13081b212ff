//! The background thread that crawls the project and maintains the index.

mod config;
mod context;
mod scheduler;
mod signal;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use cots_store_api::StoreProvider;
use tracing::{error, info};

pub use config::{
	DEFAULT_PART_EXTENSION, DEFAULT_PROJECT, DEFAULT_SIGNAL_CAPACITY, DEFAULT_STORAGE_FOLDER,
	EngineConfig, ICONS_DIR_NAME, INDEX_FILE_NAME, SchedulerTiming,
};
pub use context::EngineContext;
pub use signal::{STATUS_IDLE, Signal, SignalReceiver};
pub(crate) use signal::Signals;

/// Start the builder thread. Failures inside the thread, panics included,
/// are reported through [`Signal::Error`] and never unwind into the host.
pub(crate) fn spawn(
	cx: Arc<EngineContext>,
	provider: Arc<dyn StoreProvider>,
	signals: Signals,
) -> Result<JoinHandle<()>> {
	thread::Builder::new()
		.name("cots-index-builder".to_string())
		.spawn(move || {
			let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
				scheduler::run(&cx, provider.as_ref(), &signals)
			}));
			let failure = match outcome {
				Ok(Ok(())) => None,
				Ok(Err(err)) => Some(format!("{err:#}")),
				Err(payload) => Some(format!("index builder panicked: {}", panic_message(&*payload))),
			};
			cx.set_busy(false);
			match failure {
				None => info!("index builder exited"),
				Some(message) => {
					error!(error = %message, "index builder failed");
					cx.record_failure(message.clone());
					signals.emit(Signal::Error(message));
				}
			}
		})
		.context("failed to spawn index builder thread")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(text) = payload.downcast_ref::<&str>() {
		(*text).to_string()
	} else if let Some(text) = payload.downcast_ref::<String>() {
		text.clone()
	} else {
		"unknown panic".to_string()
	}
}
