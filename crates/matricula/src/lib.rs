//! Core library for the admissions/registration backend.
//!
//! The interesting subsystem lives in [`workflows::enrollment`]: section
//! enrollment with a fixed seat count, an ordered waitlist, and atomic
//! promotion of the next waitlisted student whenever a seat frees up.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
