//! # Application Layer
//!
//! Contains the core logic and orchestration of the agent loop:
//! decision parsing, the oracle boundary, action dispatch and the session state machine.

pub mod dispatcher;
pub mod oracle;
pub mod parsing;
pub mod session;
