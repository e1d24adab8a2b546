pub mod device;
pub mod stream;

pub use device::SimulatedDevice;
pub use stream::{Behavior, SimulatedStream};
