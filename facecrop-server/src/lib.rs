//! HTTP front-end for the facecrop engine.
//!
//! One shared [`FaceCropper`](facecrop_core::FaceCropper) serves every
//! request; crops run on the blocking thread pool.

pub mod api;
pub mod config;

pub use api::rest::{AppState, create_router};
pub use config::{LISTEN_ADDR_ENV, resolve_listen_addr};
