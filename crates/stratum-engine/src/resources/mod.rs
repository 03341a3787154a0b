//! GPU resource lifecycle.
//!
//! Every handle lives in a [`Slot`]; [`RenderDeviceState`] groups them so
//! teardown is one idempotent call.

mod buffer;
mod slot;
mod state;

pub use buffer::{grown_capacity, DeviceBuffer, MIN_BUFFER_SIZE};
pub use slot::Slot;
pub use state::{RenderDeviceState, COMMAND_BUFFERS};
