//! # Interface Layer
//!
//! The console front-end and its runtime commands. A thin driver of the
//! session state machine.

pub mod commands;
pub mod console;
