pub mod demo;
pub mod http;

pub use demo::{DemoBackend, DemoConfig};
pub use http::HttpBackend;
