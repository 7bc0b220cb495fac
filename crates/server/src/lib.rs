#![forbid(unsafe_code)]

mod connection;
pub mod handler;
pub mod html;
mod server;

pub use connection::Connection;
pub use handler::{Handler, handle_connection};
pub use server::serve;
