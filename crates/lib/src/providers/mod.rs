//! # Completion Service Providers
//!
//! Concrete [`ai::AiProvider`] implementations and the factory that builds them from
//! configuration.

pub mod ai;
pub mod factory;
