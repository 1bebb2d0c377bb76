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

//! Administrative operations
//!
//! Direct corrections of an actor's progression for an operator command layer. These go
//! through the cache like any other mutation and fire no level-up notifications.

use crate::cache::ActorStateCache;
use crate::engine::Gate;
use crate::error::AdminError;
use crate::progression::ExperienceCurve;
use crate::skill::SkillRegistry;
use skillforge_common::ActorId;
use std::sync::Arc;

/// Administrative command surface
#[derive(Clone)]
pub struct AdminCommands {
    registry: Arc<SkillRegistry>,
    cache: Arc<ActorStateCache>,
    curve: Arc<ExperienceCurve>,
    gate: Arc<Gate>,
    max_level: u32,
}

impl AdminCommands {
    pub(crate) fn new(
        registry: Arc<SkillRegistry>,
        cache: Arc<ActorStateCache>,
        curve: Arc<ExperienceCurve>,
        gate: Arc<Gate>,
        max_level: u32,
    ) -> Self {
        Self {
            registry,
            cache,
            curve,
            gate,
            max_level,
        }
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    fn skill_name(&self, skill: &str) -> Result<String, AdminError> {
        self.registry
            .get(skill)
            .map(|definition| definition.name().to_string())
            .ok_or_else(|| AdminError::UnknownSkill(skill.to_string()))
    }

    fn check_amount(amount: f64) -> Result<(), AdminError> {
        if amount.is_finite() && amount >= 0.0 {
            Ok(())
        } else {
            Err(AdminError::InvalidAmount(amount))
        }
    }

    /// Set a skill level, clearing banked experience
    pub async fn set_level(&self, actor: ActorId, skill: &str, level: i64) -> Result<(), AdminError> {
        let _open = self.gate.enter().await.ok_or(AdminError::ShuttingDown)?;
        let skill = self.skill_name(skill)?;
        let level = u32::try_from(level)
            .ok()
            .filter(|level| *level <= self.max_level)
            .ok_or(AdminError::LevelOutOfRange {
                level,
                max: self.max_level,
            })?;

        self.cache
            .update(actor, |state| state.set_level(&skill, level))
            .await;
        tracing::info!("Set {} level of {} to {}", skill, actor, level);
        Ok(())
    }

    /// Add experience; returns whether a level was gained
    pub async fn add_experience(&self, actor: ActorId, skill: &str, amount: f64) -> Result<bool, AdminError> {
        let _open = self.gate.enter().await.ok_or(AdminError::ShuttingDown)?;
        let skill = self.skill_name(skill)?;
        Self::check_amount(amount)?;

        let leveled = self
            .cache
            .update(actor, |state| state.add_experience(&skill, amount, &self.curve))
            .await;
        tracing::info!("Added {} {} experience to {}", amount, skill, actor);
        Ok(leveled)
    }

    /// Remove banked experience, stopping at 0; returns what is left
    pub async fn remove_experience(&self, actor: ActorId, skill: &str, amount: f64) -> Result<f64, AdminError> {
        let _open = self.gate.enter().await.ok_or(AdminError::ShuttingDown)?;
        let skill = self.skill_name(skill)?;
        Self::check_amount(amount)?;

        let remaining = self
            .cache
            .update(actor, |state| {
                state.add_experience(&skill, -amount, &self.curve);
                state.experience(&skill)
            })
            .await;
        tracing::info!("Removed {} {} experience from {}", amount, skill, actor);
        Ok(remaining)
    }

    pub async fn reset_skill(&self, actor: ActorId, skill: &str) -> Result<(), AdminError> {
        let _open = self.gate.enter().await.ok_or(AdminError::ShuttingDown)?;
        let skill = self.skill_name(skill)?;
        self.cache
            .update(actor, |state| state.reset_skill(&skill))
            .await;
        tracing::info!("Reset {} for {}", skill, actor);
        Ok(())
    }

    pub async fn reset_all(&self, actor: ActorId) -> Result<(), AdminError> {
        let _open = self.gate.enter().await.ok_or(AdminError::ShuttingDown)?;
        self.cache.update(actor, |state| state.reset_all()).await;
        tracing::info!("Reset all skills for {}", actor);
        Ok(())
    }
}
