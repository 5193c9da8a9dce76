//! icaet-mcp - ICAET knowledge base access for IDE assistants
//!
//! This crate provides:
//! - Validated credentials loaded from the environment
//! - An HTTP client for the ICAET query API with a typed error taxonomy
//! - An MCP server over stdio exposing a single `query` tool

pub mod commands;
pub mod config;
pub mod error;
pub mod kb;
pub mod mcp;

pub use config::{Config, Settings};
pub use error::{Error, Result};
