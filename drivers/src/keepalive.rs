/*!
Keep-alive scheduler.

Some boards drop the session unless they receive a liveness byte on a fixed
period. The heartbeat runs on its own thread, sharing the instance's
transport. It only writes once the decoder has armed it, and it stops when
the decode worker drops the stop channel: the two loops quit together.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use shared::DeviceKey;
use tracing::{debug, error, warn};

use crate::transport::TransportChannel;

/// Heartbeat requested by a decoder
#[derive(Debug, Clone)]
pub struct KeepAlive {
    pub payload: Vec<u8>,
    pub period: Duration,
    /// Set by the decoder once the device confirmed its session
    pub armed: Arc<AtomicBool>,
}

/// Running heartbeat thread of one instance
pub struct KeepAliveScheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl KeepAliveScheduler {
    pub fn spawn(
        key: DeviceKey,
        keep_alive: KeepAlive,
        channel: Arc<dyn TransportChannel>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name(format!("keepalive-{}", key))
            .spawn(move || {
                debug!("Keep-alive for {} started", key);
                loop {
                    match stop_rx.recv_timeout(keep_alive.period) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !keep_alive.armed.load(Ordering::Acquire) {
                                continue;
                            }
                            if let Err(e) = channel.write(&keep_alive.payload) {
                                warn!("Keep-alive write to {} failed: {}", key, e);
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Keep-alive for {} stopped", key);
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the heartbeat and wait for its thread
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Keep-alive thread panicked");
            }
        }
    }
}

impl Drop for KeepAliveScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
