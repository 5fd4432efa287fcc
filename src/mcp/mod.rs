//! Model Context Protocol (MCP) client side: endpoints, transports and the
//! session the conversation engine calls tools through.

pub mod client;
pub mod endpoint;
pub mod schema;
pub mod session;
pub mod transport;

pub use client::{MCPClient, MCPConnectionState};
pub use endpoint::ServerEndpoint;
pub use schema::{SchemaBuilder, ToolDescriptor};
pub use session::ToolSession;
pub use transport::{MCPTransport, StdioTransport};
