/*!
Decode worker.

One thread per instance: open the transport, announce Ready, then read,
decode and dispatch until the quit flag is raised. A read blocks at most
`read_timeout`, which bounds how long `stop` waits.

Events of an instance are delivered in order on this thread, and nothing is
delivered after its Shutdown.
*/

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use shared::{CanonicalEvent, CommErrorLatch, DeviceKey, DriverError, ParameterTable, Status};
use tracing::{debug, error, info, warn};

use crate::dispatch::EventDispatcher;
use crate::keepalive::KeepAliveScheduler;
use crate::kind::DriverKind;
use crate::options::DriverOptions;
use crate::protocol::{DecodeContext, ProtocolDecoder};
use crate::registry::InstanceState;
use crate::transport::{OpenRequest, ReadOutcome, TransportChannel, TransportFactory};

/// Everything a worker needs, moved into its thread
pub struct WorkerContext {
    pub key: DeviceKey,
    pub kind: DriverKind,
    pub params: Arc<ParameterTable>,
    pub dispatcher: Arc<EventDispatcher>,
    pub transports: Arc<dyn TransportFactory>,
    pub options: DriverOptions,
    pub quit: Arc<AtomicBool>,
    pub state: Arc<AtomicU8>,
}

impl WorkerContext {
    fn emit_status(&self, status: Status) {
        self.dispatcher.dispatch(CanonicalEvent::status(self.key, status));
    }

    fn set_state(&self, state: InstanceState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Spawn the decode worker of one instance
pub fn spawn(ctx: WorkerContext, decoder: Box<dyn ProtocolDecoder>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{}", ctx.kind.tag(), ctx.key))
        .spawn(move || run(ctx, decoder))
}

fn run(ctx: WorkerContext, mut decoder: Box<dyn ProtocolDecoder>) {
    ctx.set_state(InstanceState::Starting);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| session(&ctx, decoder.as_mut())));
    let opened = match outcome {
        Ok(opened) => opened,
        Err(payload) => {
            // Unwinding has already dropped the heartbeat and the channel
            error!("Worker for {} panicked: {}", ctx.key, panic_message(payload.as_ref()));
            ctx.set_state(InstanceState::Stopping);
            ctx.emit_status(Status::CommError);
            true
        }
    };

    if !opened {
        ctx.quit.store(true, Ordering::Release);
        ctx.set_state(InstanceState::Stopped);
        return;
    }

    info!("{} shut down", ctx.key);
    ctx.emit_status(Status::Shutdown);
    ctx.set_state(InstanceState::Stopped);
}

/// Open the transport, announce Ready and decode until quit. Returns false
/// when the transport never opened.
fn session(ctx: &WorkerContext, decoder: &mut dyn ProtocolDecoder) -> bool {
    let Some(channel) = open(ctx, decoder) else {
        return false;
    };

    info!("{} ready", ctx.key);
    ctx.emit_status(Status::Ready);
    ctx.set_state(InstanceState::Running);

    let heartbeat = decoder.keep_alive().and_then(|keep_alive| {
        KeepAliveScheduler::spawn(ctx.key, keep_alive, Arc::clone(&channel))
            .map_err(|e| error!("Failed to start keep-alive for {}: {}", ctx.key, e))
            .ok()
    });

    decode_loop(ctx, decoder, channel.as_ref());

    ctx.set_state(InstanceState::Stopping);
    if let Some(mut heartbeat) = heartbeat {
        heartbeat.stop();
    }
    true
}

/// Open the transport and run the session setup. Failures are reported as a
/// CommError; no Ready is sent.
fn open(ctx: &WorkerContext, decoder: &mut dyn ProtocolDecoder) -> Option<Arc<dyn TransportChannel>> {
    let request = OpenRequest {
        key: ctx.key,
        kind: ctx.kind.transport_for(ctx.key, &ctx.params, &ctx.options),
        timeout: ctx.options.read_timeout,
    };
    debug!("Opening {:?} for {}", request.kind, ctx.key);

    let channel = match ctx.transports.open(&request) {
        Ok(channel) => channel,
        Err(e) => {
            let err = DriverError::transport_open(ctx.key, e.to_string());
            error!("{}", err);
            ctx.emit_status(Status::CommError);
            return None;
        }
    };

    if let Err(e) = decoder.open_session(channel.as_ref()) {
        let err = DriverError::transport_open(ctx.key, format!("session setup failed: {}", e));
        error!("{}", err);
        ctx.emit_status(Status::CommError);
        return None;
    }

    Some(channel)
}

fn decode_loop(ctx: &WorkerContext, decoder: &mut dyn ProtocolDecoder, channel: &dyn TransportChannel) {
    let mut buffer = vec![0u8; decoder.read_len()];
    let mut decode_ctx = DecodeContext::new(Arc::clone(&ctx.params));
    let mut read_errors = CommErrorLatch::new();

    while !ctx.quit.load(Ordering::Acquire) {
        decoder.before_read(&mut decode_ctx);
        flush(ctx, decoder, channel, &mut decode_ctx);

        match channel.read(&mut buffer, ctx.options.read_timeout) {
            Ok(ReadOutcome::Data(len)) => {
                read_errors.succeed();
                decoder.decode(&buffer[..len.min(buffer.len())], &mut decode_ctx);
            }
            Ok(ReadOutcome::Timeout) => {
                decoder.on_idle();
                thread::sleep(ctx.options.idle_backoff);
            }
            Err(e) => {
                let err = DriverError::TransportRead(e.to_string());
                if read_errors.fail() {
                    error!("{}: {}", ctx.key, err);
                    ctx.emit_status(Status::CommError);
                } else {
                    debug!("{}: {}", ctx.key, err);
                }
                thread::sleep(ctx.options.error_backoff);
            }
        }

        flush(ctx, decoder, channel, &mut decode_ctx);
    }
}

/// Send queued writes, then deliver queued events
fn flush(
    ctx: &WorkerContext,
    decoder: &mut dyn ProtocolDecoder,
    channel: &dyn TransportChannel,
    decode_ctx: &mut DecodeContext,
) {
    for bytes in decode_ctx.take_writes() {
        if let Err(e) = channel.write(&bytes) {
            warn!("Write to {} failed: {}", ctx.key, e);
            decoder.on_write_error();
        }
    }
    for kind in decode_ctx.take_events() {
        ctx.dispatcher.dispatch(CanonicalEvent::new(ctx.key, kind));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
