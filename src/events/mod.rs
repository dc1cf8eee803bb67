// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Events
//!
//! Events are immutable facts about stack operations, published after the
//! engine call returns.
//!
//! # Correlation and Causation
//!
//! - **correlation_id**: groups every event of one operator request
//!   (a full `deploy_all` shares one correlation id)
//! - **causation_id**: the previous event in that request
//!
//! ```text
//! deploy_all
//!   correlation_id: req-123
//!   ↓
//! network deployed   (event_id: evt-1, causation: None)
//!   ↓
//! data deployed      (event_id: evt-2, causation: evt-1)
//!   ↓
//! compute deployed   (event_id: evt-3, causation: evt-2)
//! ```

pub mod deployment;

pub use deployment::{DeploymentEvent, EVENT_VERSION};
