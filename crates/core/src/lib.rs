//! Domain logic for the scriptbox execution service.
//!
//! Everything that touches the container runtime or the host filesystem lives
//! here, free of HTTP types, so the API crate stays a thin transport layer.

pub mod error;
pub mod sandbox;
