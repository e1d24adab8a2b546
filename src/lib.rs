pub mod hal;
pub mod logging;

pub use hal::{
    descriptors_equal, is_better, switch_physical_format, DeviceManager, EqualityMode,
    FormatDescriptor, NegotiationConfig, NegotiationRequest, SwitchOutcome,
};
