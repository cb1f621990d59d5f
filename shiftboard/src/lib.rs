//! Shiftboard library
//!
//! Shift assignment model, snapshot reports and the sync engine that keeps
//! display boards current. The binary is a thin reader on top of this.

pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod services;
pub mod storage;
pub mod sync;
