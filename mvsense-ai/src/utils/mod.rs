//! Utility helpers shared by the upstream clients

pub mod sigv4;
