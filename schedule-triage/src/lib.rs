//! Schedule-change triage
//!
//! Loads a sheet of schedule changes, derives a priority and a change
//! magnitude for each row, enriches rows with Intercom contact status and
//! conversation counts, and exports filtered views.

pub mod api;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod export;
pub mod records;
pub mod session;
pub mod view;

pub use session::Session;
