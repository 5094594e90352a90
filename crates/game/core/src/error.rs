//! Common error infrastructure for arena-core.
//!
//! Every error enum in the crate implements [`GameError`] so callers can pick a
//! recovery strategy from [`ErrorSeverity`] without matching on variants.
//! Most combat errors are expected in normal play: remote entities disappear
//! between send and receipt, and the transport may deliver a message twice.

use std::time::Duration;

use crate::ability::AbilityKey;
use crate::state::{EntityId, PeerId, StatKind};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: benign races (unknown target, duplicate delivery); turn into a no-op
/// - **Validation**: invalid input that should be rejected without retry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all arena-core errors.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Failures of the combat and replication paths.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CombatError {
    /// Caster of an ability instance is not in the directory.
    #[error("caster {caster} of ability {ability} does not exist")]
    InvalidCaster { ability: EntityId, caster: EntityId },

    /// Referenced entity is unknown or already removed.
    #[error("target {target} not found")]
    TargetNotFound { target: EntityId },

    /// Duplicate delivery of a message whose effect was already applied.
    #[error("{what} for {entity} already processed")]
    AlreadyProcessed { entity: EntityId, what: &'static str },

    /// A peer without authority attempted to write authoritative state.
    #[error("{from} is not authoritative for {what}")]
    AuthorityViolation { from: PeerId, what: &'static str },

    /// Nonsensical ability parameter, clamped to a usable value.
    #[error("ability {ability}: {field} = {value} clamped to {clamped_to}")]
    Configuration {
        ability: AbilityKey,
        field: &'static str,
        value: f32,
        clamped_to: f32,
    },

    /// The ability factory could not resolve the identifier.
    #[error("ability prefab {key} not found")]
    PrefabNotFound { key: AbilityKey },
}

impl GameError for CombatError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TargetNotFound { .. } | Self::AlreadyProcessed { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::Configuration { .. } => ErrorSeverity::Recoverable,
            Self::InvalidCaster { .. } | Self::PrefabNotFound { .. } => ErrorSeverity::Validation,
            Self::AuthorityViolation { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCaster { .. } => "COMBAT_INVALID_CASTER",
            Self::TargetNotFound { .. } => "COMBAT_TARGET_NOT_FOUND",
            Self::AlreadyProcessed { .. } => "COMBAT_ALREADY_PROCESSED",
            Self::AuthorityViolation { .. } => "COMBAT_AUTHORITY_VIOLATION",
            Self::Configuration { .. } => "COMBAT_CONFIGURATION",
            Self::PrefabNotFound { .. } => "COMBAT_PREFAB_NOT_FOUND",
        }
    }
}

/// Reasons a cast request is refused. Casts are never retried.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastError {
    #[error("caster {caster} not found")]
    CasterNotFound { caster: EntityId },

    #[error("caster {caster} is owned by {owner}")]
    NotOwner { caster: EntityId, owner: PeerId },

    #[error("caster {caster} is dead")]
    CasterDead { caster: EntityId },

    #[error("{ability} is on cooldown for another {remaining:?}")]
    OnCooldown {
        ability: AbilityKey,
        remaining: Duration,
    },

    #[error("not enough mana: {required} required, {available} available")]
    InsufficientMana { required: f32, available: f32 },

    #[error("ability prefab {key} not found")]
    PrefabNotFound { key: AbilityKey },

    #[error("caster {caster} vanished during initialization")]
    InvalidCaster { caster: EntityId },
}

impl GameError for CastError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OnCooldown { .. } | Self::InsufficientMana { .. } => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CasterNotFound { .. } => "CAST_CASTER_NOT_FOUND",
            Self::NotOwner { .. } => "CAST_NOT_OWNER",
            Self::CasterDead { .. } => "CAST_CASTER_DEAD",
            Self::OnCooldown { .. } => "CAST_ON_COOLDOWN",
            Self::InsufficientMana { .. } => "CAST_INSUFFICIENT_MANA",
            Self::PrefabNotFound { .. } => "CAST_PREFAB_NOT_FOUND",
            Self::InvalidCaster { .. } => "CAST_INVALID_CASTER",
        }
    }
}

/// Buff ledger rejections.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuffError {
    /// Same (target, stat, ability) record is already active.
    #[error("{stat} buff from {ability} already active on {target}")]
    AlreadyActive {
        target: EntityId,
        stat: StatKind,
        ability: EntityId,
    },

    #[error("{target} already carries the maximum number of buffs")]
    LedgerFull { target: EntityId },

    #[error("buff target {target} not found")]
    TargetNotFound { target: EntityId },

    /// The application was already expired here; it arrived after its expiry.
    #[error("{stat} buff from {ability} on {target} already expired")]
    Retired {
        target: EntityId,
        stat: StatKind,
        ability: EntityId,
    },
}

impl GameError for BuffError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AlreadyActive { .. } | Self::Retired { .. } | Self::TargetNotFound { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::LedgerFull { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyActive { .. } => "BUFF_ALREADY_ACTIVE",
            Self::LedgerFull { .. } => "BUFF_LEDGER_FULL",
            Self::TargetNotFound { .. } => "BUFF_TARGET_NOT_FOUND",
            Self::Retired { .. } => "BUFF_RETIRED",
        }
    }
}

impl From<BuffError> for CombatError {
    fn from(err: BuffError) -> Self {
        match err {
            BuffError::AlreadyActive { target, .. } => Self::AlreadyProcessed {
                entity: target,
                what: "buff apply",
            },
            BuffError::Retired { target, .. } => Self::AlreadyProcessed {
                entity: target,
                what: "expired buff",
            },
            BuffError::LedgerFull { target } | BuffError::TargetNotFound { target } => {
                Self::TargetNotFound { target }
            }
        }
    }
}
