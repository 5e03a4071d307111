//! These models represent the objects passed around by the glossary and the agent
//!
//! There are several different related formats we need to interact with:
//! - anthropic messages/tools, sent from the agent to the LLM
//! - openai messages/tools, sent from the agent to the LLM
//! - gemini contents/function declarations, sent from the agent to the LLM
//! - telegraph pages and nodes, where the glossary lives
//! - stream events, sent from the agent worker to the interface
//!
//! Vendor payloads are converted into these structs as soon as they are received,
//! so nothing past the provider boundary branches on vendor field names.
pub mod glossary;
pub mod message;
pub mod stream;
pub mod tool;
