//! Convergence engine for oidsync
//!
//! The reconcile crate does the planning and applying; this module renders
//! deltas and outcomes and asks for confirmation on the terminal.

pub mod differ;
pub mod executor;

pub use executor::{ConsoleProgress, TerminalConfirm, print_summary};
