//! Narration module: HTTP client and prompt template
//!
//! This module provides:
//! - `NarrationConfig`, `NarrationClient`, `NarrationResult` for talking to the text generator
//! - `build_tour_prompt` for turning a `PointOfInterest` into a tour-guide prompt
//! - `NarrationGenerator`, the seam the orchestrator depends on

mod client;
mod prompt;

pub use client::{NarrationClient, NarrationConfig, NarrationGenerator, NarrationResult};
pub use prompt::{build_tour_prompt, DEFAULT_CATEGORY, TARGET_WORDS};
