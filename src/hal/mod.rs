pub mod config;
pub mod device_manager;
pub mod equality;
pub mod error;
pub mod exclusive;
pub mod mock;
pub mod probe;
pub mod ranking;
pub mod switch;
pub mod traits;
pub mod types;

pub use config::NegotiationConfig;
pub use device_manager::DeviceManager;
pub use equality::{descriptors_equal, EqualityMode};
pub use error::PropertyError;
pub use exclusive::{disable_mixing, enable_mixing, lock_device, unlock_device, HogMode};
pub use probe::supports_compressed;
pub use ranking::{
    is_better, select_best, value_is_better, FormatRanker, NegotiationRequest, MAX_CHANNELS,
    PACKED_BYTES_THRESHOLD,
};
pub use switch::{
    switch_physical_format, AbortReason, FormatSwitcher, SwitchOutcome, DEFAULT_SWITCH_TIMEOUT,
};
pub use traits::{FormatListener, HardwareDevice, HardwareStream, ListenerId};
pub use types::{DeviceId, FormatDescriptor, FormatFlags, FormatKind, FourCc, SampleFormat, StreamId};
