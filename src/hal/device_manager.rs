use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::config::NegotiationConfig;
use super::exclusive::{self, HogMode};
use super::probe;
use super::switch::SwitchOutcome;
use super::traits::{HardwareDevice, HardwareStream};
use super::types::{DeviceId, FormatDescriptor, StreamId};

/// Marks a stream as having a switch in flight; cleared on drop
struct BusyGuard {
    busy: Arc<Mutex<HashSet<StreamId>>>,
    stream_id: StreamId,
}

impl BusyGuard {
    fn acquire(busy: &Arc<Mutex<HashSet<StreamId>>>, stream_id: StreamId) -> Result<Self> {
        if !busy.lock().insert(stream_id) {
            anyhow::bail!("Format switch already in flight on stream {}", stream_id);
        }
        Ok(Self {
            busy: Arc::clone(busy),
            stream_id,
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.lock().remove(&self.stream_id);
    }
}

/// Owns hardware streams and negotiates their physical formats.
///
/// At most one switch runs per stream; switches on different streams
/// are independent. Devices are tracked separately for exclusive access.
pub struct DeviceManager {
    config: NegotiationConfig,
    streams: HashMap<StreamId, Arc<dyn HardwareStream>>,
    devices: HashMap<DeviceId, Arc<dyn HardwareDevice>>,
    busy: Arc<Mutex<HashSet<StreamId>>>,
}

impl DeviceManager {
    pub fn new(config: NegotiationConfig) -> Self {
        Self {
            config,
            streams: HashMap::new(),
            devices: HashMap::new(),
            busy: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    /// Register a stream, replacing any previous one with the same id
    pub fn add_stream(&mut self, stream: Arc<dyn HardwareStream>) {
        self.streams.insert(stream.id(), stream);
    }

    pub fn remove_stream(&mut self, stream_id: StreamId) -> Option<Arc<dyn HardwareStream>> {
        self.streams.remove(&stream_id)
    }

    pub fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.streams.keys().copied().collect();
        ids.sort();
        ids
    }

    fn stream(&self, stream_id: StreamId) -> Result<&Arc<dyn HardwareStream>> {
        self.streams
            .get(&stream_id)
            .ok_or_else(|| anyhow!("Stream {} not found", stream_id))
    }

    pub fn add_device(&mut self, device: Arc<dyn HardwareDevice>) {
        self.devices.insert(device.id(), device);
    }

    pub fn remove_device(&mut self, device_id: DeviceId) -> Option<Arc<dyn HardwareDevice>> {
        self.devices.remove(&device_id)
    }

    fn device(&self, device_id: DeviceId) -> Result<&Arc<dyn HardwareDevice>> {
        self.devices
            .get(&device_id)
            .ok_or_else(|| anyhow!("Device {} not found", device_id))
    }

    /// Take hog mode on `device_id` for this process
    pub fn lock_device(&self, device_id: DeviceId) -> Result<HogMode> {
        let device = self.device(device_id)?;
        exclusive::lock_device(device.as_ref())
            .with_context(|| format!("Failed to take exclusive access to device {}", device_id))
    }

    /// Release hog mode taken through [`DeviceManager::lock_device`]
    pub fn unlock_device(&self, device_id: DeviceId, hog: &mut HogMode) -> Result<()> {
        let device = self.device(device_id)?;
        exclusive::unlock_device(device.as_ref(), hog)
            .with_context(|| format!("Failed to release device {}", device_id))
    }

    /// Turn mixing off; the returned flag feeds [`DeviceManager::enable_mixing`]
    pub fn disable_mixing(&self, device_id: DeviceId) -> Result<bool> {
        let device = self.device(device_id)?;
        exclusive::disable_mixing(device.as_ref())
            .with_context(|| format!("Failed to disable mixing on device {}", device_id))
    }

    pub fn enable_mixing(&self, device_id: DeviceId, changed: bool) -> Result<()> {
        let device = self.device(device_id)?;
        exclusive::enable_mixing(device.as_ref(), changed)
            .with_context(|| format!("Failed to restore mixing on device {}", device_id))
    }

    pub fn supports_compressed(&self, stream_id: StreamId) -> Result<bool> {
        Ok(probe::supports_compressed(self.stream(stream_id)?.as_ref()))
    }

    /// Best advertised physical format for `target`, if any qualifies
    pub fn negotiate(
        &self,
        stream_id: StreamId,
        target: &FormatDescriptor,
    ) -> Result<Option<FormatDescriptor>> {
        let stream = self.stream(stream_id)?;
        let candidates = stream
            .available_physical_formats()
            .with_context(|| format!("Failed to list physical formats of stream {}", stream_id))?;

        let request = self.config.request(*target);
        let best = self.config.ranker().select_best(&request, &candidates);
        match &best {
            Some(format) => debug!(stream = %stream_id, %format, "selected physical format"),
            None => debug!(stream = %stream_id, candidates = candidates.len(), "no suitable physical format"),
        }
        Ok(best)
    }

    /// Switch `stream_id` to `target`, blocking until confirmed or timed out
    pub fn apply(&self, stream_id: StreamId, target: &FormatDescriptor) -> Result<SwitchOutcome> {
        let stream = self.stream(stream_id)?;
        let _guard = BusyGuard::acquire(&self.busy, stream_id)?;
        Ok(self.config.switcher().switch(stream.as_ref(), target))
    }

    /// Negotiate, then switch to the chosen format
    pub fn negotiate_and_apply(
        &self,
        stream_id: StreamId,
        target: &FormatDescriptor,
    ) -> Result<FormatDescriptor> {
        let chosen = self
            .negotiate(stream_id, target)?
            .ok_or_else(|| anyhow!("No physical format of stream {} matches {}", stream_id, target))?;

        match self.apply(stream_id, &chosen)? {
            SwitchOutcome::Committed => {
                info!(stream = %stream_id, format = %chosen, "physical format changed");
                Ok(chosen)
            }
            SwitchOutcome::Aborted(reason) => Err(anyhow!(
                "Failed to switch stream {} to {}: {:?}",
                stream_id,
                chosen,
                reason
            )),
        }
    }

    /// Run the blocking switch on the blocking thread pool
    pub async fn switch_format(
        &self,
        stream_id: StreamId,
        target: FormatDescriptor,
    ) -> Result<SwitchOutcome> {
        let stream = Arc::clone(self.stream(stream_id)?);
        let guard = BusyGuard::acquire(&self.busy, stream_id)?;
        let switcher = self.config.switcher();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            switcher.switch(stream.as_ref(), &target)
        })
        .await
        .context("Format switch task failed")
    }
}
