//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the turn pipeline
//! and the configuration every handler needs.

use crate::config::Config;
use std::sync::Arc;
use voxrelay_core::TurnOrchestrator;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub config: Arc<Config>,
}
