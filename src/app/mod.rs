// HTTP surface: router, handlers and error responses.

pub mod handlers;
pub mod response;
pub mod server;

pub use server::{build_router, start_server, AppState};
