//! One manager per backend surface. Each exposes its tool names in `TOOLS`
//! and dispatches on them in `handle_tool`.

pub mod autotask;
pub mod connectwise;
pub mod connectwise_sync;
pub mod connectwise_ticketing;
pub mod psa;
pub mod psa_sync;
pub mod psa_ticketing;
pub mod tickets;
pub mod time_entry;
pub mod weaviate;

use serde::Deserialize;

/// Arguments shared by every tool that only needs the tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainArgs {
    pub msp_custom_domain: String,
}
