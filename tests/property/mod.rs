// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of identifier prediction and address planning that must hold
//! for every valid input.

mod identifier_prediction;
mod network_plan;
