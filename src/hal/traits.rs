use std::fmt;
use std::sync::Arc;

use super::error::PropertyError;
use super::types::{DeviceId, FormatDescriptor, StreamId};

/// Change-notification callback. Carries no payload; the hardware may
/// invoke it from any thread, including inside `set_physical_format`.
pub type FormatListener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Handle returned by [`HardwareStream::add_format_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Physical-format properties of one hardware stream
pub trait HardwareStream: Send + Sync {
    /// Stream object identifier
    fn id(&self) -> StreamId;

    /// Read back the active physical format
    fn physical_format(&self) -> Result<FormatDescriptor, PropertyError>;

    /// Request a new physical format. The driver may apply it
    /// asynchronously and in several steps.
    fn set_physical_format(&self, format: &FormatDescriptor) -> Result<(), PropertyError>;

    /// Formats the stream advertises as physically supported
    fn available_physical_formats(&self) -> Result<Vec<FormatDescriptor>, PropertyError>;

    /// Subscribe to physical-format change notifications
    fn add_format_listener(&self, listener: FormatListener) -> Result<ListenerId, PropertyError>;

    /// Tear down a subscription made with `add_format_listener`
    fn remove_format_listener(&self, id: ListenerId) -> Result<(), PropertyError>;
}

/// Device-wide ownership and mixing properties
pub trait HardwareDevice: Send + Sync {
    fn id(&self) -> DeviceId;

    /// Process id holding exclusive (hog mode) access, if any
    fn hog_owner(&self) -> Result<Option<u32>, PropertyError>;

    /// Take exclusive access for `Some(pid)`, release it with `None`
    fn set_hog_owner(&self, owner: Option<u32>) -> Result<(), PropertyError>;

    /// Whether the device exposes a mixing property at all
    fn has_mixing_property(&self) -> bool;

    fn mixing_settable(&self) -> Result<bool, PropertyError>;

    fn set_mixing(&self, enabled: bool) -> Result<(), PropertyError>;
}
