//! HTTP surface: router, handlers, error mapping.

pub mod handlers;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
