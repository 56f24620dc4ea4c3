// src/dev/mod.rs
// Helpers shared by tests and tools; not part of the compiler proper.
pub mod generator;
