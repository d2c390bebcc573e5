//! Test utilities for runtime testing
//!
//! Guest fixtures built from Rust closures, standing in for engine-compiled
//! code, shared by the unit tests of every runtime module.
