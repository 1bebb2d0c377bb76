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

//! Per-actor progression state

use crate::progression::curve::ExperienceCurve;
use skillforge_common::{ActorId, ProgressionSnapshot, SkillProgress, SkillRank, skill_key};
use std::collections::HashMap;

/// Mutable progression of a single actor.
///
/// Levels and banked experience are kept in two maps with identical key sets. Every mutation
/// sets the dirty flag and bumps `revision`; the flag is only cleared by [`mark_clean`] with the
/// revision that was actually written.
///
/// [`mark_clean`]: ProgressionState::mark_clean
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionState {
    actor_id: ActorId,
    skill_levels: HashMap<String, u32>,
    skill_experience: HashMap<String, f64>,
    dirty: bool,
    revision: u64,
}

impl ProgressionState {
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            skill_levels: HashMap::new(),
            skill_experience: HashMap::new(),
            dirty: false,
            revision: 0,
        }
    }

    /// Rebuild state from a persisted snapshot. The result is clean.
    pub fn from_snapshot(snapshot: &ProgressionSnapshot) -> Self {
        let mut state = Self::new(snapshot.actor_id);
        for (skill, progress) in &snapshot.skills {
            let key = skill_key(skill);
            state.skill_levels.insert(key.clone(), progress.level);
            state
                .skill_experience
                .insert(key, sanitize(progress.experience));
        }
        state
    }

    /// Copy of the current state in persisted form.
    pub fn snapshot(&self) -> ProgressionSnapshot {
        let mut snapshot = ProgressionSnapshot::new(self.actor_id);
        for (skill, level) in &self.skill_levels {
            snapshot.insert(skill, SkillProgress::new(*level, self.experience(skill)));
        }
        snapshot
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Clear the dirty flag if nothing changed since `revision` was snapshotted.
    ///
    /// Returns whether the flag was cleared.
    pub fn mark_clean(&mut self, revision: u64) -> bool {
        if self.revision == revision {
            self.dirty = false;
        }
        !self.dirty
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Ensure a skill has entries in both maps. Existing values are kept.
    pub fn initialize_skill(&mut self, skill: &str) {
        let key = skill_key(skill);
        let mut changed = false;
        if !self.skill_levels.contains_key(&key) {
            self.skill_levels.insert(key.clone(), 0);
            changed = true;
        }
        if !self.skill_experience.contains_key(&key) {
            self.skill_experience.insert(key, 0.0);
            changed = true;
        }
        if changed {
            self.touch();
        }
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skill_levels.contains_key(&skill_key(skill))
    }

    pub fn skills(&self) -> impl Iterator<Item = &str> {
        self.skill_levels.keys().map(String::as_str)
    }

    pub fn level(&self, skill: &str) -> u32 {
        self.skill_levels.get(&skill_key(skill)).copied().unwrap_or(0)
    }

    /// Experience banked toward the next level.
    pub fn experience(&self, skill: &str) -> f64 {
        self.skill_experience
            .get(&skill_key(skill))
            .copied()
            .unwrap_or(0.0)
    }

    /// Add (or with a negative amount, deduct) experience and re-derive the level.
    ///
    /// Deductions clamp banked experience at 0 and never lower the level. Non-finite amounts
    /// are ignored. Returns whether at least one level was gained.
    pub fn add_experience(&mut self, skill: &str, amount: f64, curve: &ExperienceCurve) -> bool {
        if !amount.is_finite() {
            tracing::warn!(
                "Ignoring non-finite experience amount {} for {} in {}",
                amount,
                self.actor_id,
                skill
            );
            return false;
        }
        let key = skill_key(skill);
        let old_level = self.level(&key);
        let banked = (self.experience(&key) + amount).max(0.0);
        let (new_level, remainder) = curve.advance(old_level, banked);

        self.skill_levels.insert(key.clone(), new_level);
        self.skill_experience.insert(key, remainder);
        self.touch();

        new_level > old_level
    }

    /// Set a level directly, clearing banked experience.
    pub fn set_level(&mut self, skill: &str, level: u32) {
        let key = skill_key(skill);
        self.skill_levels.insert(key.clone(), level);
        self.skill_experience.insert(key, 0.0);
        self.touch();
    }

    /// Set banked experience directly, without re-deriving the level.
    pub fn set_experience(&mut self, skill: &str, experience: f64) {
        let key = skill_key(skill);
        self.skill_levels.entry(key.clone()).or_insert(0);
        self.skill_experience.insert(key, sanitize(experience));
        self.touch();
    }

    pub fn reset_skill(&mut self, skill: &str) {
        self.set_level(skill, 0);
    }

    pub fn reset_all(&mut self) {
        for level in self.skill_levels.values_mut() {
            *level = 0;
        }
        for experience in self.skill_experience.values_mut() {
            *experience = 0.0;
        }
        self.touch();
    }

    pub fn total_level(&self) -> u64 {
        self.skill_levels.values().map(|l| u64::from(*l)).sum()
    }

    /// Fraction of the current level step already earned, in `[0, 1)`.
    pub fn level_progress(&self, skill: &str, curve: &ExperienceCurve) -> f64 {
        let step = curve.exp_to_next_level(self.level(skill));
        (self.experience(skill) / step).clamp(0.0, 1.0)
    }

    pub fn exp_remaining(&self, skill: &str, curve: &ExperienceCurve) -> f64 {
        let step = curve.exp_to_next_level(self.level(skill));
        (step - self.experience(skill)).max(0.0)
    }

    pub fn rank(&self, skill: &str) -> SkillRank {
        SkillRank::for_level(self.level(skill))
    }
}

fn sanitize(experience: f64) -> f64 {
    if experience.is_finite() {
        experience.max(0.0)
    } else {
        0.0
    }
}
