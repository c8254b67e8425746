//! # Core Module
//!
//! Foundational data types shared by the engine and the workflows.
//!
//! - **Geometry** ([`grid`]) - Grid extents, physical spacing and displacement vectors
//! - **Fields** ([`field`]) - The read-only field store consumed by the sweep
//! - **Synthetic Fields** ([`synthetic`]) - Linear fields with closed-form structure functions
//! - **I/O** ([`io`]) - Reading field components and writing result grids as CSV

pub mod field;
pub mod grid;
pub mod io;
pub mod synthetic;
