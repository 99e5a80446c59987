// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Keepsake: face/voice-driven media album pipeline
//!
//! Ingests a batch of heterogeneous uploads, runs face and voice detection
//! through external recognition services, emits a pure-data analysis batch for
//! human review, and reconciles the reviewer's decisions into a persistent
//! collection of per-person albums.

pub mod analyze;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod services;
pub mod summary;

pub use config::AppConfig;
pub use error::{KeepsakeError, Result};
