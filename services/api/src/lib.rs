//! Voxrelay API Library Crate
//!
//! This library contains the web layer of the voice relay service: the
//! configuration, the application state, the chat handler, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
