mod config;
mod error;
mod flags;
mod range;

pub use config::ContextConfig;
pub use error::{functions::*, BuildError, Error, ErrorKind};
pub use flags::{DeviceClass, DeviceInfo, MemFlags, QueueProperties};
pub use range::{resolve_global_size, Launch, NdRange};
