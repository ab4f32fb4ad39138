//! Integration test crate for Mouse Chaser.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the engine worker over its real queues with synthetic video.

#[cfg(test)]
mod session;

#[cfg(test)]
mod persistence;
