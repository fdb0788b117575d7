//! Line-oriented JSON request server.
//!
//! Each input line is one request; each request gets exactly one envelope
//! line in reply, in input order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Server                            │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │   │  Transport  │───▶│  Built-ins  │───▶│ RequestRouter  │   │
//! │   │   (lines)   │    │ (providers) │    │ (schema gate,  │   │
//! │   └─────────────┘    └─────────────┘    │  tools)        │   │
//! │          │                  │           └────────────────┘   │
//! │          ▼                  ▼                   │            │
//! │   ┌─────────────────────────────────────────────────────┐    │
//! │   │         Envelopes {version, id, result|error, meta}  │    │
//! │   └─────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! Envelopes carry protocol version [`PROTOCOL_VERSION`].

pub mod protocol;
pub mod router;
pub mod schema;
pub mod server;
pub mod transport;

pub use protocol::{Envelope, ErrorBody, ErrorCode, Request, RequestId, PROTOCOL_VERSION};
pub use router::{RegisteredTool, Registration, RequestRouter, Tool, ToolKind};
pub use schema::SchemaValidator;
pub use server::Server;
pub use transport::{LineTransport, StdioTransport};
