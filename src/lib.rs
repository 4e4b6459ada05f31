// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod body;
pub mod config;
pub mod core;
pub mod csv;
pub mod elab;
pub mod file;
pub mod gateway;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;
