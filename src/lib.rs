//! Back-office core for property rental management.
//!
//! The heart of the crate is [`portfolio`]: the ownership tree of
//! properties, accommodations, stays, tenants, and expenses, with a
//! cascading soft-delete lifecycle, temporal stay resolution, and the trash
//! listing that sits on top of both. [`config`] and [`telemetry`] carry the
//! runtime plumbing for the console binary.

pub mod config;
pub mod error;
pub mod portfolio;
pub mod telemetry;
