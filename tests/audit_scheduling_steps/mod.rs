//! Step definitions for audit scheduling behaviour tests.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
