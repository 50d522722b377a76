/*!
Instance registry.

Maps each (device id, address) key to its running worker. At most one
instance exists per key. Removing an instance always joins its worker first,
so no worker outlives its registry entry.
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use serde::Serialize;
use shared::{Address, DeviceKey, DriverError, Result};
use tracing::{error, info, warn};

/// Lifecycle of one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum InstanceState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl InstanceState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Status reported for a device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceStatus {
    Stopped,
    Running,
}

/// Flags shared between the registry and one worker
#[derive(Debug, Clone)]
pub struct InstanceFlags {
    pub quit: Arc<AtomicBool>,
    pub state: Arc<AtomicU8>,
}

struct Instance {
    flags: InstanceFlags,
    worker: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct InstanceRegistry {
    instances: Mutex<HashMap<DeviceKey, Instance>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceKey, Instance>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `key` and spawn its worker with `spawn`. The registry lock is
    /// held while spawning, so two racing starts cannot both succeed.
    pub fn start_with<F>(&self, key: DeviceKey, spawn: F) -> Result<()>
    where
        F: FnOnce(InstanceFlags) -> std::io::Result<JoinHandle<()>>,
    {
        let mut instances = self.lock();
        if instances.contains_key(&key) {
            warn!("Instance {} already loaded, ignoring start", key);
            return Err(DriverError::InstanceExists(key));
        }

        let flags = InstanceFlags {
            quit: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(InstanceState::Starting as u8)),
        };
        let worker = spawn(flags.clone())?;

        info!("Started instance {}", key);
        instances.insert(
            key,
            Instance {
                flags,
                worker: Some(worker),
            },
        );
        Ok(())
    }

    /// Signal quit, wait for the worker to finish, then remove the instance.
    /// Blocks for at most one read timeout plus teardown.
    pub fn stop(&self, key: DeviceKey) -> Result<()> {
        let worker = {
            let mut instances = self.lock();
            let instance = instances
                .get_mut(&key)
                .ok_or(DriverError::UnknownInstance(key))?;

            let Some(worker) = instance.worker.take() else {
                // Another caller is already stopping this instance
                return Err(DriverError::UnknownInstance(key));
            };
            instance.flags.quit.store(true, Ordering::Release);
            worker
        };

        if worker.join().is_err() {
            error!("Worker for {} terminated abnormally", key);
        }

        self.lock().remove(&key);
        info!("Stopped instance {}", key);
        Ok(())
    }

    /// Stop every instance
    pub fn stop_all(&self) {
        for key in self.keys() {
            if let Err(e) = self.stop(key) {
                warn!("{}", e);
            }
        }
    }

    /// `Running` iff any registered instance has this address
    pub fn status(&self, address: Address) -> DeviceStatus {
        if self.lock().keys().any(|key| key.address == address) {
            DeviceStatus::Running
        } else {
            DeviceStatus::Stopped
        }
    }

    pub fn state(&self, key: DeviceKey) -> Option<InstanceState> {
        self.lock()
            .get(&key)
            .map(|instance| InstanceState::from_u8(instance.flags.state.load(Ordering::Acquire)))
    }

    pub fn keys(&self) -> Vec<DeviceKey> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn idle_worker(flags: InstanceFlags) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new().spawn(move || {
            flags.state.store(InstanceState::Running as u8, Ordering::Release);
            while !flags.quit.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(2));
            }
            flags.state.store(InstanceState::Stopped as u8, Ordering::Release);
        })
    }

    #[test]
    fn test_duplicate_start_rejected() {
        let registry = InstanceRegistry::new();
        let key = DeviceKey::new(0x0d480001, 0x0001_0200);

        registry.start_with(key, idle_worker).unwrap();
        assert!(matches!(
            registry.start_with(key, idle_worker),
            Err(DriverError::InstanceExists(_))
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.status(key.address), DeviceStatus::Running);

        registry.stop(key).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.status(key.address), DeviceStatus::Stopped);
    }

    #[test]
    fn test_stop_unknown_key() {
        let registry = InstanceRegistry::new();
        let key = DeviceKey::new(0x0d480001, 0x0001_0200);
        registry.start_with(key, idle_worker).unwrap();

        let other = DeviceKey::new(0x0d480001, 0x0002_0200);
        assert!(matches!(
            registry.stop(other),
            Err(DriverError::UnknownInstance(_))
        ));
        assert_eq!(registry.keys(), vec![key]);
        registry.stop_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_spawn_is_not_registered() {
        let registry = InstanceRegistry::new();
        let key = DeviceKey::new(0x0d480001, 0x0001_0200);
        let result = registry.start_with(key, |_| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no threads"))
        });
        assert!(matches!(result, Err(DriverError::Io(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_state_tracks_worker() {
        let registry = InstanceRegistry::new();
        let key = DeviceKey::new(0x0d480001, 0x0001_0200);
        registry.start_with(key, idle_worker).unwrap();

        for _ in 0..100 {
            if registry.state(key) == Some(InstanceState::Running) {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(registry.state(key), Some(InstanceState::Running));

        registry.stop(key).unwrap();
        assert_eq!(registry.state(key), None);
    }
}
