//! # Engine Module
//!
//! This module implements the distributed displacement-sweep and reduction engine that
//! turns a field store into structure-function grids.
//!
//! ## Overview
//!
//! The work of a structure-function computation is a sweep over the symmetry-reduced
//! displacement domain. The cost of one displacement is proportional to its overlap window,
//! which shrinks with the lag, so the domain is triangular in cost. The engine splits that
//! domain evenly across a fixed group of ranks, evaluates every owned displacement for every
//! requested order, and gathers the per-rank contributions into result grids owned by the
//! root rank.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Sweep parameters, order ranges and their validation
//! - **Partitioning** ([`partition`]) - Mirror-paired, load-balanced lag assignment per rank
//! - **Sweep** ([`sweep`]) - Windowed differencing, projection and averaging per lag
//! - **Process Group** ([`comm`]) - The collective gather behind the `Communicator` trait
//! - **Reduction** ([`reduction`]) - Batched, rank-ordered gathering of contributions
//! - **Results** ([`results`]) - Result grids and the root-side assembler
//! - **Progress Monitoring** ([`progress`]) - Progress events for user feedback
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod comm;
pub mod config;
pub mod error;
pub mod partition;
pub mod progress;
pub mod reduction;
pub mod results;
pub mod sweep;
