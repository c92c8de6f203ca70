//! Application-level orchestration.
//!
//! `app` composes the session store, history cache and the generation and
//! publish workflows behind one [`Orchestrator`]. `controller` runs the
//! interactive loop that front ends talk to through [`UiCommand`]s.

mod app;
mod controller;

pub use app::{Orchestrator, Snapshot};
#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub(crate) use controller::{run_controller, UiCommand};
