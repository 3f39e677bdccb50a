//! Device-facing types for the render target pool: texture definitions, formats, flags and the
//! `RtDeviceContext` trait the pool allocates through.

pub use device_context::*;
pub use error::*;
pub use types::*;

pub use backends::empty;

mod backends;
mod device_context;
mod error;
mod types;
