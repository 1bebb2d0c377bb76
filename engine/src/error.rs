//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Error types for the progression engine
//!
//! None of these terminate the host: storage errors are logged and retried, configuration
//! errors skip the offending entry, formula errors fall back to `base * multiplier`.

use skillforge_common::ActorId;
use thiserror::Error;

/// Errors raised by persistence backends and the persistence worker.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// A stored record exists but is not usable.
    #[error("Corrupt record for actor {actor}: {reason}")]
    Corrupt { actor: ActorId, reason: String },

    /// A value does not fit the column it is stored in.
    #[error("Level {level} of skill {skill} for actor {actor} is out of range for storage")]
    LevelOutOfRange {
        actor: ActorId,
        skill: String,
        level: u32,
    },

    /// The persistence worker has stopped and can no longer accept requests.
    #[error("Persistence worker unavailable")]
    WorkerUnavailable,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors found while turning configuration into engine data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid material identifier: {0:?}")]
    InvalidMaterial(String),

    #[error("Invalid level range: {0:?}")]
    InvalidLevelRange(String),

    #[error("Invalid experience formula {formula:?}: {source}")]
    InvalidFormula {
        formula: String,
        #[source]
        source: FormulaError,
    },

    #[error("Invalid ability type: {0:?}")]
    InvalidAbilityType(String),

    #[error("Invalid storage settings: {0}")]
    InvalidStorage(String),
}

/// Result type for configuration processing.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from parsing or evaluating an experience formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unexpected token {token:?} at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("unknown variable or function {0:?}")]
    UnknownIdentifier(String),

    #[error("function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

/// Errors returned by administrative operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    #[error("Level must be between 0 and {max}, got {level}")]
    LevelOutOfRange { level: i64, max: u32 },

    #[error("Amount must be a finite, non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("Progression engine is shutting down")]
    ShuttingDown,
}
