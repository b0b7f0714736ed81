//! HTTP control surface
//!
//! REST API for submitting crawl jobs and polling their status and results.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use server::HttpServer;
