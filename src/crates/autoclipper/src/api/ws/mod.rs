//! WebSocket progress subscription support.

pub mod socket;

pub use socket::ws_handler;
