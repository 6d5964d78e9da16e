//! Local HTTP API.
//!
//! `POST /api/analyze` streams pipeline events over SSE; the remaining
//! routes expose the standards, tolerance and FreeCAD collaborators
//! directly. The router is composable: `api_router()` returns a `Router`
//! that `server::start_server` mounts on a listener.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::AppState;
