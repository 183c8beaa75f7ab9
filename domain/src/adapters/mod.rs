//! Backends that live inside the domain crate for tests and local demos.
//!
//! The HTTP backend used against a real server lives in the `http-backend`
//! crate.

pub mod memory_backend;
