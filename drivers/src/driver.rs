/*!
The host-facing driver object.

A [`Driver`] is one loaded plugin: one device family with its own parameter
table, callback and instance registry. Creating it is `init`, dropping it (or
calling [`Driver::shutdown`]) stops every instance.
*/

use std::sync::Arc;

use shared::{Address, DeviceKey, DriverError, EventSink, ParameterTable, Result, SupportedDevice};
use tracing::{debug, info};

use crate::dispatch::EventDispatcher;
use crate::kind::DriverKind;
use crate::options::DriverOptions;
use crate::registry::{DeviceStatus, InstanceRegistry, InstanceState};
use crate::transport::{SystemTransports, TransportFactory};
use crate::worker::{self, WorkerContext};

pub struct Driver {
    kind: DriverKind,
    params: Arc<ParameterTable>,
    registry: InstanceRegistry,
    dispatcher: Arc<EventDispatcher>,
    transports: Arc<dyn TransportFactory>,
    options: DriverOptions,
}

impl Driver {
    /// Initialize a driver backed by the system transports
    pub fn init(kind: DriverKind) -> Self {
        Self::with_transports(kind, DriverOptions::default(), Arc::new(SystemTransports))
    }

    pub fn with_options(kind: DriverKind, options: DriverOptions) -> Self {
        Self::with_transports(kind, options, Arc::new(SystemTransports))
    }

    /// Initialize a driver opening its devices through `transports`
    pub fn with_transports(
        kind: DriverKind,
        options: DriverOptions,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        info!("{} {} initialized", kind.name(), kind.version());
        Self {
            kind,
            params: Arc::new(ParameterTable::with_defaults(kind.parameters())),
            registry: InstanceRegistry::new(),
            dispatcher: Arc::new(EventDispatcher::new()),
            transports,
            options,
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn version(&self) -> &'static str {
        self.kind.version()
    }

    pub fn supported_devices(&self) -> &'static [SupportedDevice] {
        self.kind.supported_devices()
    }

    /// Stop and join every instance. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.registry.is_empty() {
            info!("Shutting down {}", self.kind.name());
        }
        self.registry.stop_all();
    }

    /// Start an instance for the device `id` at `address`.
    ///
    /// Returns once the worker is spawned; the instance reports Ready (or
    /// CommError if its transport cannot be opened) through the callback.
    pub fn start(&self, id: u32, address: u32) -> Result<()> {
        let key = DeviceKey::new(id, address);
        let decoder = self
            .kind
            .decoder(key.id, &self.options)
            .ok_or(DriverError::UnsupportedDevice(key))?;

        self.registry.start_with(key, |flags| {
            worker::spawn(
                WorkerContext {
                    key,
                    kind: self.kind,
                    params: Arc::clone(&self.params),
                    dispatcher: Arc::clone(&self.dispatcher),
                    transports: Arc::clone(&self.transports),
                    options: self.options.clone(),
                    quit: flags.quit,
                    state: flags.state,
                },
                decoder,
            )
        })
    }

    /// Stop an instance, blocking until its worker has delivered Shutdown
    /// and terminated
    pub fn stop(&self, id: u32, address: u32) -> Result<()> {
        self.registry.stop(DeviceKey::new(id, address))
    }

    /// Set a parameter. Unknown keys change nothing and are reported as
    /// [`DriverError::UnknownParameter`].
    pub fn set_parameter(&self, key: &str, value: u32) -> Result<()> {
        if self.params.set(key, value) {
            Ok(())
        } else {
            Err(DriverError::UnknownParameter(key.to_string()))
        }
    }

    /// Current value of a parameter, `None` if the key is unknown
    pub fn get_parameter(&self, key: &str) -> Option<u32> {
        self.params.get(key)
    }

    /// Every parameter with its current value
    pub fn parameters(&self) -> Vec<(&'static str, u32)> {
        self.params.snapshot()
    }

    pub fn get_status(&self, address: u32) -> DeviceStatus {
        self.registry.status(Address(address))
    }

    /// Register the event sink. Replaces any previous sink, including for
    /// instances already running.
    pub fn set_callback(&self, sink: Arc<dyn EventSink>) {
        debug!("Callback registered for {}", self.kind.name());
        self.dispatcher.set_sink(sink);
    }

    pub fn instance_state(&self, id: u32, address: u32) -> Option<InstanceState> {
        self.registry.state(DeviceKey::new(id, address))
    }

    pub fn instances(&self) -> Vec<DeviceKey> {
        self.registry.keys()
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
