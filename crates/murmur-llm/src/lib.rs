//! # murmur-llm
//!
//! Text generation backends for the Murmur relay.
//!
//! - [`Generator`]: the trait every backend implements
//! - [`ChatCompletionsGenerator`]: OpenAI-compatible HTTP client shared by the
//!   `remote-http`, `local-inference`, and `managed-api` variants
//! - [`create_generator`]: resolves the configured [`GeneratorKind`] once at startup
//! - [`mock::ScriptedGenerator`]: deterministic stand-in for tests

#![deny(unsafe_code)]

pub mod chat_completions;
pub mod errors;
pub mod factory;
pub mod generator;
pub mod mock;

pub use chat_completions::{ChatCompletionsConfig, ChatCompletionsGenerator};
pub use errors::{GenerationError, GenerationResult};
pub use factory::{GeneratorKind, create_generator, create_generator_with};
pub use generator::{Generation, Generator, TokenUsage};
