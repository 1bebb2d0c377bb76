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

//! Skill progress records
//!
//! A [`ProgressionSnapshot`] is the persisted shape of one actor: one [`SkillProgress`]
//! (level + experience toward the next level) per skill. Backends store exactly this, one
//! record per (actor, skill).

use crate::actor::ActorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalize a skill name into its storage key.
///
/// Skill names are case-insensitive everywhere; keys are always lower-case.
pub fn skill_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Level and banked experience of a single skill
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillProgress {
    /// Current level, never negative
    pub level: u32,
    /// Experience accumulated toward the next level, never negative
    pub experience: f64,
}

impl SkillProgress {
    pub fn new(level: u32, experience: f64) -> Self {
        Self { level, experience }
    }
}

/// Point-in-time copy of an actor's progression, used for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub actor_id: ActorId,
    pub skills: BTreeMap<String, SkillProgress>,
}

impl ProgressionSnapshot {
    /// Create an empty snapshot for an actor
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            skills: BTreeMap::new(),
        }
    }

    /// Insert or replace a skill record, normalizing the key and clamping negative experience
    pub fn insert(&mut self, skill: &str, progress: SkillProgress) {
        let progress = SkillProgress {
            level: progress.level,
            experience: if progress.experience.is_finite() {
                progress.experience.max(0.0)
            } else {
                0.0
            },
        };
        self.skills.insert(skill_key(skill), progress);
    }

    /// Get a skill record
    pub fn get(&self, skill: &str) -> Option<&SkillProgress> {
        self.skills.get(&skill_key(skill))
    }

    /// Sum of all skill levels
    pub fn total_level(&self) -> u64 {
        self.skills.values().map(|p| u64::from(p.level)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Named rank bands for skill levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillRank {
    Novice,
    Apprentice,
    Skilled,
    Adept,
    Expert,
    Master,
}

impl SkillRank {
    /// Rank band for a level
    pub fn for_level(level: u32) -> Self {
        match level {
            90.. => SkillRank::Master,
            75..=89 => SkillRank::Expert,
            50..=74 => SkillRank::Adept,
            25..=49 => SkillRank::Skilled,
            10..=24 => SkillRank::Apprentice,
            _ => SkillRank::Novice,
        }
    }
}

impl fmt::Display for SkillRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillRank::Novice => write!(f, "Novice"),
            SkillRank::Apprentice => write!(f, "Apprentice"),
            SkillRank::Skilled => write!(f, "Skilled"),
            SkillRank::Adept => write!(f, "Adept"),
            SkillRank::Expert => write!(f, "Expert"),
            SkillRank::Master => write!(f, "Master"),
        }
    }
}

/// Compact human-readable experience amount (`950.0`, `1.50K`, `2.00M`)
pub fn format_experience(exp: f64) -> String {
    if exp >= 1_000_000.0 {
        format!("{:.2}M", exp / 1_000_000.0)
    } else if exp >= 1_000.0 {
        format!("{:.2}K", exp / 1_000.0)
    } else {
        format!("{:.1}", exp)
    }
}
