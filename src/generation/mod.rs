// SPDX-License-Identifier: MIT
// AI-assisted snippet generation: prompt construction, the rate-limited
// endpoint call, and response normalization.

pub mod client;
pub mod prompt;

pub use client::{GenerationBackend, GenerationClient, HttpBackend};
pub use prompt::{build_generation_prompt, strip_code_fences};
