pub mod client;
pub mod protocol;
pub mod server;

pub use client::SeatingClient;
pub use protocol::{ClientMessage, ErrorKind, ServerMessage};
pub use server::SeatingServer;
