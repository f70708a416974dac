//! Command dispatcher
//!
//! Reads opcodes from the link, collects their parameters and drives the
//! [`Programmer`](crate::programmer::Programmer).
//!
//! ```text
//!            opcode               0xAA + magic
//!   Idle ───────────► ParamWait ───────────────► TransferPending
//!    ▲                   │                            │ 1024 bytes
//!    │   other commands  │                            ▼
//!    └───────────────────┴─────────────────────── VerifyCommit
//! ```

mod dispatcher;
mod state;

pub use dispatcher::Dispatcher;
pub use state::{Registers, State};
