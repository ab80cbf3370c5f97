//! MCP (Model Context Protocol) module
//!
//! Implements the MCP server protocol for tool discovery and invocation.

pub mod dispatcher;
pub mod negotiator;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;
