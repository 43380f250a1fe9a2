//! Backend polling.
//!
//! This module owns the dashboard's background pollers and routes their
//! results to the view.

pub mod poller_manager;

pub use poller_manager::PollerManager;
