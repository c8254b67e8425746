//! # fastsf Core Library
//!
//! A load-balanced, distributed engine for computing turbulence structure functions
//! from gridded two- and three-dimensional velocity or scalar fields.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that the numerical kernel, the
//! distribution machinery and the user-facing procedures can be tested in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models: grid geometry and displacement
//!   vectors (`Geometry`, `Lag`), the immutable field store (`FieldSet`), synthetic analytic
//!   fields and CSV grid I/O.
//!
//! - **[`engine`]: The Logic Core.** The index partitioner that balances the triangular
//!   displacement domain across ranks, the displacement sweep kernel, the `Communicator`
//!   abstraction over the process group, and the reduction stage that assembles per-rank
//!   contributions into the root's result grids.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that tie `engine` and `core`
//!   together: a distributed structure-function computation and the analytic validation of
//!   its output against synthetic fields.

pub mod core;
pub mod engine;
pub mod workflows;
