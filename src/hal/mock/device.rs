use parking_lot::Mutex;

use crate::hal::error::PropertyError;
use crate::hal::traits::HardwareDevice;
use crate::hal::types::DeviceId;

struct DeviceState {
    hog_owner: Option<u32>,
    /// `None` when the device has no mixing property
    mixing: Option<bool>,
    mixing_settable: bool,
    settable_query_fails: bool,
    reject_mixing: bool,
    hog_calls: Vec<Option<u32>>,
    mixing_calls: Vec<bool>,
}

/// In-memory device with hog-mode and mixing properties.
///
/// Starts unowned with a settable mixing property that is on.
pub struct SimulatedDevice {
    id: DeviceId,
    state: Mutex<DeviceState>,
}

impl SimulatedDevice {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            state: Mutex::new(DeviceState {
                hog_owner: None,
                mixing: Some(true),
                mixing_settable: true,
                settable_query_fails: false,
                reject_mixing: false,
                hog_calls: Vec::new(),
                mixing_calls: Vec::new(),
            }),
        }
    }

    /// Device already hogged by another process
    pub fn with_hog_owner(self, pid: u32) -> Self {
        self.state.lock().hog_owner = Some(pid);
        self
    }

    pub fn without_mixing_property(self) -> Self {
        self.state.lock().mixing = None;
        self
    }

    pub fn with_read_only_mixing(self) -> Self {
        self.state.lock().mixing_settable = false;
        self
    }

    pub fn fail_settable_query(self) -> Self {
        self.state.lock().settable_query_fails = true;
        self
    }

    pub fn reject_mixing(self) -> Self {
        self.state.lock().reject_mixing = true;
        self
    }

    /// Current mixing state, `None` without the property
    pub fn mixing(&self) -> Option<bool> {
        self.state.lock().mixing
    }

    /// Every value passed to `set_hog_owner`, in order
    pub fn hog_calls(&self) -> Vec<Option<u32>> {
        self.state.lock().hog_calls.clone()
    }

    /// Every value passed to `set_mixing`, in order
    pub fn mixing_calls(&self) -> Vec<bool> {
        self.state.lock().mixing_calls.clone()
    }
}

impl HardwareDevice for SimulatedDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn hog_owner(&self) -> Result<Option<u32>, PropertyError> {
        Ok(self.state.lock().hog_owner)
    }

    fn set_hog_owner(&self, owner: Option<u32>) -> Result<(), PropertyError> {
        let mut state = self.state.lock();
        state.hog_calls.push(owner);
        match (state.hog_owner, owner) {
            (Some(current), Some(requested)) if current != requested => {
                Err(PropertyError::Rejected {
                    status: 0x2172_6F67,
                    reason: format!("device hogged by pid {}", current),
                })
            }
            _ => {
                state.hog_owner = owner;
                Ok(())
            }
        }
    }

    fn has_mixing_property(&self) -> bool {
        self.state.lock().mixing.is_some()
    }

    fn mixing_settable(&self) -> Result<bool, PropertyError> {
        let state = self.state.lock();
        if state.mixing.is_none() {
            return Err(PropertyError::Unsupported);
        }
        if state.settable_query_fails {
            return Err(PropertyError::Backend("settable query failed".to_string()));
        }
        Ok(state.mixing_settable)
    }

    fn set_mixing(&self, enabled: bool) -> Result<(), PropertyError> {
        let mut state = self.state.lock();
        state.mixing_calls.push(enabled);
        if state.mixing.is_none() || !state.mixing_settable {
            return Err(PropertyError::Unsupported);
        }
        if state.reject_mixing {
            return Err(PropertyError::Rejected {
                status: -50,
                reason: "mix mode not accepted".to_string(),
            });
        }
        state.mixing = Some(enabled);
        Ok(())
    }
}
