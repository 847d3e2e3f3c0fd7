//! Pipeline stages for outline and poster generation.
//!
//! Each submodule implements exactly one step, so each can be tested
//! without the others.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ provider ──▶ prompts ──▶ llm ──▶ parse
//! (normalise)  (resolve)   (compose)   (call)   (pages / poster)
//! ```
//!
//! 1. [`request`]  — map multipart or JSON bodies onto one request shape
//! 2. [`provider`] — pick the active provider and check its credential
//! 3. [`crate::prompts`] — choose the template and fill in the topic
//! 4. [`llm`]      — the single provider call; the only stage with network I/O
//! 5. [`parse`]    — split outline text into pages or validate poster JSON

pub mod llm;
pub mod parse;
pub mod provider;
pub mod request;
