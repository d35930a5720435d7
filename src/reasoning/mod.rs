// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote reasoning lookups for detected instruments
//!
//! One short natural-language explanation is fetched per detected label
//! from a hosted generative-text endpoint. The lookup is best-effort: the
//! page must always be able to render something per label, so every failure
//! collapses to a fixed fallback string after being logged.

pub mod client;
pub mod types;

pub use client::ReasoningClient;
pub use types::{ReasoningConfig, ReasoningError, FALLBACK_EXPLANATION};
