//! botstat-api: Wire types for the botstat.io HTTP API
//!
//! Contains the `{ok, result}` response envelope and the typed records
//! (`BotInfo`, `TaskId`, `TaskStatus`) shared by API consumers.

pub mod envelope;
pub mod models;

pub use envelope::{Envelope, ErrorPayload};
pub use models::{BotInfo, TaskId, TaskStatus};
