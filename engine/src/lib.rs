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

//! Skillforge Progression Engine
//!
//! Tracks per-actor, per-skill levels and experience, evaluates level-gated abilities with
//! per-actor cooldowns, maps configured trigger categories onto custom skills, and keeps actor
//! state in a write-coalescing cache backed by a pluggable persistence backend.
//!
//! The game runtime stays outside this crate: it calls into [`ProgressionEngine`] and supplies
//! listeners, effect callbacks and world queries through [`EngineHooks`].

pub mod ability;
pub mod admin;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod persistence;
pub mod progression;
pub mod rules;
pub mod skill;

pub use ability::{Ability, AbilityKind, CustomAbilityInfo, EffectDisplay};
pub use admin::AdminCommands;
pub use cache::{ActorStateCache, FlushReport};
pub use engine::{AbilityStatus, EngineHooks, EngineSettings, ProgressionEngine, SkillSummary};
pub use error::{AdminError, ConfigError, FormulaError, StorageError};
pub use events::{Listeners, ProgressionListener};
pub use persistence::{BackendSpec, PersistenceBackend, open_backend};
pub use progression::{ExperienceCurve, Formula, ProgressionState};
pub use rules::{AbilityEffects, ActorWorld, DispatchReport, TriggerRule, TriggerRuleEngine};
pub use skill::{AwardOutcome, DropEntry, DropTable, DropTier, SkillDefinition, SkillRegistry};
