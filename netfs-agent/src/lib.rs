//! Server dispatcher and handlers (spec.md §4.4).
//!
//! Exposed as a library, not just the `main.rs` binary, so integration tests
//! can drive a real worker over a real [`std::net::TcpStream`] pair without
//! shelling out to the built binary.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod session;
pub mod worker;
