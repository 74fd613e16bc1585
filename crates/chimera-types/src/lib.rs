//! Chimera Types - Canonical domain types for the governance core
//!
//! This crate has zero dependencies on other chimera crates. It defines:
//!
//! - Identity types (SkillId, QueueId, AccountId)
//! - Task manifests, route decisions and dispatch envelopes
//! - The shared error taxonomy consumed by every other component
//!
//! # Governance Flow
//!
//! ```text
//! Manifest → Schema check → Capability resolution → Judgment → Ledger (OCC)
//! ```
//!
//! No task may be dispatched or mutate shared state without passing every
//! stage to its left, in that order.

pub mod error;
pub mod identity;
pub mod manifest;

pub use error::*;
pub use identity::*;
pub use manifest::*;

/// Version of the chimera types schema
pub const TYPES_VERSION: &str = "0.1.0";
