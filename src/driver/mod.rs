//! Automation driver protocol
//!
//! The browser is driven through a subprocess speaking a framed JSON
//! request/response protocol over stdin/stdout. The driver itself is a
//! black box: it may wrap a real webdriver or simulate one.

pub mod client;
pub mod codec;
pub mod types;

pub use client::DriverClient;
