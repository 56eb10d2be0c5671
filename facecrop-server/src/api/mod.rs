//! REST handlers and their wire types.

pub mod dto;
pub mod rest;

pub use rest::create_router;
