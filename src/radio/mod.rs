mod client;
mod params;
mod protocol;
mod session;

pub use client::{RadioClient, RadioError};
pub use params::ParamUpdate;
pub use protocol::RadioMessage;
#[cfg(test)]
pub use protocol::StatusUpdate;
pub use session::{RadioLink, Session};
