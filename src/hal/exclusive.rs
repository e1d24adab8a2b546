//! Exclusive device access: hog mode and the device mixing switch.
//!
//! Non-mixable passthrough formats are only honoured while the process
//! owns the device and mixing is off, so these wrap the negotiation.

use tracing::{debug, warn};

use super::error::PropertyError;
use super::traits::HardwareDevice;

/// Hog-mode ownership recorded by [`lock_device`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HogMode {
    owner: Option<u32>,
}

impl HogMode {
    pub fn owner(&self) -> Option<u32> {
        self.owner
    }

    /// Whether this process took the lock
    pub fn is_owned(&self) -> bool {
        self.owner == Some(std::process::id())
    }
}

/// Take exclusive access to `device` for this process
pub fn lock_device(device: &dyn HardwareDevice) -> Result<HogMode, PropertyError> {
    let pid = std::process::id();
    match device.set_hog_owner(Some(pid)) {
        Ok(()) => {
            debug!(device = %device.id(), pid, "hog mode acquired");
            Ok(HogMode { owner: Some(pid) })
        }
        Err(e) => {
            warn!(device = %device.id(), error = %e, "failed to set hogmode");
            Err(e)
        }
    }
}

/// Release exclusive access, but only if `hog` shows this process owns it.
/// The record is cleared before the release is attempted.
pub fn unlock_device(device: &dyn HardwareDevice, hog: &mut HogMode) -> Result<(), PropertyError> {
    if !hog.is_owned() {
        return Ok(());
    }
    hog.owner = None;

    device.set_hog_owner(None).map_err(|e| {
        warn!(device = %device.id(), error = %e, "failed to release hogmode");
        e
    })
}

/// Turn mixing off. Returns whether the property was actually changed;
/// a device without a settable mixing property is left alone.
pub fn disable_mixing(device: &dyn HardwareDevice) -> Result<bool, PropertyError> {
    change_mixing(device, false)
}

/// Turn mixing back on if [`disable_mixing`] reported a change
pub fn enable_mixing(device: &dyn HardwareDevice, changed: bool) -> Result<(), PropertyError> {
    if changed {
        change_mixing(device, true)?;
    }
    Ok(())
}

fn change_mixing(device: &dyn HardwareDevice, enabled: bool) -> Result<bool, PropertyError> {
    if !device.has_mixing_property() {
        return Ok(false);
    }

    let settable = device.mixing_settable().map_err(|e| {
        warn!(device = %device.id(), error = %e, "can't tell if mixing property is settable");
        e
    })?;
    if !settable {
        debug!(device = %device.id(), "mixing property is read-only");
        return Ok(false);
    }

    device.set_mixing(enabled).map_err(|e| {
        warn!(device = %device.id(), error = %e, "can't set mix mode");
        e
    })?;
    Ok(true)
}
