//! Language model backends.
//!
//! The only backend is an OpenAI-compatible HTTP server (LM Studio, Ollama,
//! llama.cpp server, vLLM, ...), see [`ApiLlm`].

pub mod api;

pub use api::ApiLlm;
