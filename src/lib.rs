//! # authgate
//!
//! Client side of a token-authenticated application: field validation, a
//! typed HTTP client for the auth API, the process-wide session store, the
//! sign-in / sign-up form controller and the two-route guard.
//!
//! `app::App` wires these together; the `authgate` binary drives it from
//! the command line.

pub mod app;
pub mod config;
pub mod events;
pub mod net;
pub mod routes;
pub mod state;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod test_helpers;
