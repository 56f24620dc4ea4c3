// src/lexer/mod.rs
pub mod cpu;
pub mod selftest;
pub mod session;
pub mod tables;
