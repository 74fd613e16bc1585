//! Error taxonomy for Chimera
//!
//! Every failure in the governance core is part of the normal control-flow
//! vocabulary of a multi-agent system. None of them is process-fatal, and all
//! of them are typed so callers can pick a recovery policy per kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for Chimera operations
pub type Result<T> = std::result::Result<T, ChimeraError>;

/// Why a well-formed manifest could not be dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchReason {
    /// `skill_required` was absent, empty, or not a string
    MissingSkill,
    /// The registry has no entry for the requested skill
    UnknownSkill,
}

impl fmt::Display for DispatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSkill => f.write_str("no skill_required given"),
            Self::UnknownSkill => f.write_str("skill is not registered"),
        }
    }
}

/// Chimera error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChimeraError {
    // ========================================================================
    // Routing Errors
    // ========================================================================

    /// Manifest is structurally invalid. Fix and resubmit; never auto-retried.
    #[error("Schema violation on {field}: {reason}")]
    SchemaViolation { field: String, reason: String },

    /// Manifest is well formed but names a capability that cannot be served.
    #[error("Dispatch failed for skill '{skill}': {reason}")]
    DispatchError { skill: String, reason: DispatchReason },

    /// Registry-level lookup failure
    #[error("Unknown skill: {skill}")]
    UnknownSkill { skill: String },

    /// Registry was built with the same skill twice
    #[error("Skill {skill} is registered more than once")]
    DuplicateSkill { skill: String },

    // ========================================================================
    // Ledger Errors
    // ========================================================================

    /// Optimistic concurrency conflict. Reread and retry.
    #[error("Version conflict on account {account}: expected {expected}, found {actual}")]
    ConsistencyError {
        account: String,
        expected: u64,
        actual: u64,
    },

    /// Account has not been provisioned
    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    /// Account was provisioned twice
    #[error("Account already exists: {account}")]
    AccountExists { account: String },

    /// Mutation would leave the account in an unrepresentable state
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Account has reached the last representable version
    #[error("Account {account} cannot advance past version {version}")]
    VersionExhausted { account: String, version: u64 },
}

/// Field-free discriminant of [`ChimeraError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SchemaViolation,
    DispatchError,
    UnknownSkill,
    DuplicateSkill,
    ConsistencyError,
    AccountNotFound,
    AccountExists,
    InvalidAmount,
    VersionExhausted,
}

impl ChimeraError {
    /// Create a schema violation error
    pub fn schema_violation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch(skill: impl Into<String>, reason: DispatchReason) -> Self {
        Self::DispatchError {
            skill: skill.into(),
            reason,
        }
    }

    /// Create an unknown skill error
    pub fn unknown_skill(skill: impl Into<String>) -> Self {
        Self::UnknownSkill {
            skill: skill.into(),
        }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Surface a registry failure at the gateway boundary.
    ///
    /// `UnknownSkill` becomes `DispatchError { reason: UnknownSkill }`; every
    /// other error is returned untouched.
    pub fn into_dispatch_error(self) -> Self {
        match self {
            Self::UnknownSkill { skill } => Self::DispatchError {
                skill,
                reason: DispatchReason::UnknownSkill,
            },
            other => other,
        }
    }

    /// Get the field-free kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Self::DispatchError { .. } => ErrorKind::DispatchError,
            Self::UnknownSkill { .. } => ErrorKind::UnknownSkill,
            Self::DuplicateSkill { .. } => ErrorKind::DuplicateSkill,
            Self::ConsistencyError { .. } => ErrorKind::ConsistencyError,
            Self::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            Self::AccountExists { .. } => ErrorKind::AccountExists,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::VersionExhausted { .. } => ErrorKind::VersionExhausted,
        }
    }

    /// True only for OCC conflicts, the one kind a caller should answer with
    /// a reread-and-retry loop.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConsistencyError { .. })
    }

    /// Get an error code for API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "SCHEMA_VIOLATION",
            Self::DispatchError { .. } => "DISPATCH_ERROR",
            Self::UnknownSkill { .. } => "UNKNOWN_SKILL",
            Self::DuplicateSkill { .. } => "DUPLICATE_SKILL",
            Self::ConsistencyError { .. } => "CONSISTENCY_ERROR",
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::AccountExists { .. } => "ACCOUNT_EXISTS",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::VersionExhausted { .. } => "VERSION_EXHAUSTED",
        }
    }
}
