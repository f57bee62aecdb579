//! HTTP surface: webhook intake plus read-only inspection of the audit log and
//! sync jobs.

pub mod app;
