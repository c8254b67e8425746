//! # Workflows Module
//!
//! High-level entry points that run a complete structure-function computation.
//!
//! ## Overview
//!
//! A workflow owns the order of operations that every rank of the process group must follow:
//! validating the decomposition, sweeping the owned lags, and gathering the contributions to
//! the root. Callers only supply a [`Communicator`](crate::engine::comm::Communicator), the
//! field store and a validated configuration.
//!
//! ## Architecture
//!
//! - **Compute Workflow** ([`compute`]) - The distributed sweep and reduction, either on a
//!   caller-provided process group or on an in-process thread group.
//! - **Validation Workflow** ([`validate`]) - Comparison of computed grids against the closed
//!   form results for the linear synthetic fields.

pub mod compute;
pub mod validate;
