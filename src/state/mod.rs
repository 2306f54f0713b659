//! Client-side state.
//!
//! DESIGN
//! ======
//! `session` is the process-wide authentication state; `form` is the
//! short-lived state of the sign-in / sign-up form that drives it.

pub mod form;
pub mod session;
