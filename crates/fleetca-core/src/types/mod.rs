mod connection;
mod identity;
mod registry;

pub use connection::*;
pub use identity::*;
pub use registry::*;
