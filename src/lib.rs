//! inngestabot - chat mentions relayed into durable, memoized workflows
//!
//! Messages that mention the bot are submitted to an external orchestrator
//! as events. The orchestrator calls back into this process to run the
//! matching workflow, whose steps call the completion backend and reply in
//! the chat channel.
//!
//! # Architecture
//!
//! The system is built around memoized steps:
//! - Every step outcome (result or failure) is recorded in a per-run memo
//! - The orchestrator owns the memo and passes it back on every invoke
//! - Replaying a run skips completed steps, so side effects never repeat
//!
//! # Modules
//!
//! - `adapters`: External systems (Discord, completion backend, orchestrator)
//! - `core`: Step engine (StepMemo, StepRunner, registry, protocol adapter)
//! - `domain`: Data structures (Event, WorkflowRun, RunReport)
//! - `workflows`: The workflows this app serves
//! - `relay`: Gateway glue from chat messages to events
//! - `server`: HTTP surface for the protocol adapter
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the orchestrator endpoint
//! inngestabot serve --address 0.0.0.0:8000
//!
//! # Run a workflow locally, then resume it from the written memo
//! inngestabot run --event event.json --memo memo.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod relay;
pub mod server;
pub mod workflows;

// Re-export main types at crate root for convenience
pub use core::{ProtocolAdapter, StepMemo, StepOutcome, StepRunner, WorkflowRegistry};
pub use domain::{Event, RunReport, RunState, WorkflowRun};
pub use error::{Error, ErrorKind, Result};
pub use relay::{MessageRelay, RelayOutcome};
