#![forbid(unsafe_code)]

mod command;
mod form;
mod head;
mod request;
mod response;

pub use command::{Command, CreateRequest};
pub use form::{Form, percent_decode, percent_encode};
pub use request::{Method, Request, Version};
pub use response::{Response, Status};
