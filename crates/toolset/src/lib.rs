//! Schema-validated tool dispatch.
//!
//! [`Toolset`] owns the search and maps gateways and exposes them as named
//! tools behind one uniform contract: [`Toolset::list_tools`] advertises
//! name, description, and input schema; [`Toolset::dispatch`] validates the
//! incoming arguments against that schema, invokes the matching gateway
//! operation, and wraps every outcome — success or failure — into an
//! `rmcp` [`rmcp::model::CallToolResult`] envelope.

pub mod dispatch;
pub mod registry;

pub use dispatch::{DispatchError, Toolset};
pub use registry::list_tools;
