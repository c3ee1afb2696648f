//! LLM provider abstraction: the `AIProvider` trait and the Anthropic
//! Messages API implementation the binary wires up by default.

pub mod anthropic;
pub mod base;
