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

//! Declarative trigger rules
//!
//! Custom skills declare which trigger categories (`BREAK`, `CRAFT`, ...) and, optionally,
//! which materials award them experience. [`TriggerRuleEngine::dispatch`] matches one game
//! action against every custom skill, awards experience and runs the skill's abilities.

pub mod hooks;

pub use hooks::{AbilityEffects, ActorWorld, EffectContext, EmptyWorld, NoEffects};

use crate::ability::{Ability, AbilityKind};
use crate::skill::{AwardOutcome, DEFAULT_BASE_EXPERIENCE, DropEntry, SkillContext, SkillDefinition};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skillforge_common::ActorId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Trigger categories and material filter of a custom skill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRule {
    triggers: HashSet<String>,
    materials: HashSet<String>,
    /// When set, only `materials` match, even if that set is empty
    restricted: bool,
}

impl TriggerRule {
    /// Trigger categories are upper-cased; materials are matched exactly
    pub fn new<T, M>(triggers: T, materials: M) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let materials: HashSet<String> = materials.into_iter().map(Into::into).collect();
        Self {
            triggers: triggers
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .collect(),
            restricted: !materials.is_empty(),
            materials,
        }
    }

    /// Like [`new`](Self::new), but an empty material set matches no material at all
    pub fn restricted_to<T, M>(triggers: T, materials: M) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            restricted: true,
            ..Self::new(triggers, materials)
        }
    }

    pub fn triggers(&self) -> &HashSet<String> {
        &self.triggers
    }

    pub fn materials(&self) -> &HashSet<String> {
        &self.materials
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Whether an action matches. An unrestricted rule accepts every material.
    pub fn accepts(&self, trigger: &str, material: &str) -> bool {
        if !self.triggers.contains(&trigger.trim().to_uppercase()) {
            return false;
        }
        !self.restricted || self.materials.contains(material)
    }
}

/// What one skill did for a dispatched action
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDispatch {
    pub skill: String,
    pub award: AwardOutcome,
    /// Abilities that fired, in registration order
    pub activated: Vec<String>,
}

/// Result of [`TriggerRuleEngine::dispatch`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub skills: Vec<SkillDispatch>,
}

impl DispatchReport {
    pub fn matched(&self) -> bool {
        !self.skills.is_empty()
    }

    pub fn get(&self, skill: &str) -> Option<&SkillDispatch> {
        self.skills.iter().find(|s| s.skill == skill)
    }
}

/// Maps game actions to custom-skill experience and ability activations
pub struct TriggerRuleEngine {
    skills: Vec<Arc<SkillDefinition>>,
    ctx: SkillContext,
    effects: Arc<dyn AbilityEffects>,
    world: Arc<dyn ActorWorld>,
    rng: Mutex<StdRng>,
}

impl TriggerRuleEngine {
    /// Build an engine over the skills that carry a trigger rule
    pub fn new(
        skills: Vec<Arc<SkillDefinition>>,
        ctx: SkillContext,
        effects: Arc<dyn AbilityEffects>,
        world: Arc<dyn ActorWorld>,
    ) -> Self {
        let skills = skills
            .into_iter()
            .filter(|skill| skill.trigger_rule().is_some())
            .collect();
        Self {
            skills,
            ctx,
            effects,
            world,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a deterministic random source
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn skills(&self) -> &[Arc<SkillDefinition>] {
        &self.skills
    }

    /// Roll a skill's tiered reward table at `level`, sharing the passive-roll random source
    pub fn roll_drop(&self, skill: &SkillDefinition, level: u32) -> Option<DropEntry> {
        let table = skill.drop_table()?;
        let multiplier = skill.drop_chance_multiplier(level);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        table.roll(level, multiplier, &mut *rng).cloned()
    }

    fn roll(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random::<f64>()
    }

    /// Match an action against every custom skill.
    ///
    /// Each accepting skill awards its base experience, then evaluates its abilities in
    /// registration order against the level reached by that award.
    pub async fn dispatch(
        &self,
        actor: ActorId,
        trigger: &str,
        material: &str,
        multiplier: f64,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        for skill in &self.skills {
            let Some(rule) = skill.trigger_rule() else {
                continue;
            };
            if !rule.accepts(trigger, material) {
                continue;
            }

            let base = skill.base_experience().unwrap_or(DEFAULT_BASE_EXPERIENCE);
            let award = skill
                .award_experience(&self.ctx, actor, base, multiplier)
                .await;
            let level = award.new_level;

            let mut activated = Vec::new();
            for ability in skill.abilities() {
                if self.run_ability(skill, ability, actor, level, trigger, material) {
                    activated.push(ability.name().to_string());
                }
            }

            report.skills.push(SkillDispatch {
                skill: skill.name().to_string(),
                award,
                activated,
            });
        }
        report
    }

    fn run_ability(
        &self,
        skill: &SkillDefinition,
        ability: &Arc<Ability>,
        actor: ActorId,
        level: u32,
        trigger: &str,
        material: &str,
    ) -> bool {
        let Some(info) = ability.info() else {
            return false;
        };
        if !ability.is_unlocked(level) {
            return false;
        }

        let effect = ability.effect_for_level(level);
        let ctx = EffectContext {
            actor,
            skill: skill.name().to_string(),
            ability: ability.clone(),
            level,
            effect,
            trigger: trigger.to_string(),
            material: material.to_string(),
            drops: skill.drop_table().cloned(),
        };
        let listeners = &self.ctx.listeners;

        match info.kind {
            AbilityKind::Passive => {
                if self.roll() >= effect {
                    return false;
                }
                if !ability.trigger(actor, level, Duration::ZERO, listeners) {
                    return false;
                }
                self.effects.apply_passive(&ctx);
            }
            AbilityKind::Active => {
                if !self.world.is_activating(actor) || !ability.can_use(actor, level) {
                    return false;
                }
                if !ability.trigger(actor, level, info.cooldown, listeners) {
                    return false;
                }
                self.effects.apply_active(&ctx);
                if !info.effect_duration.is_zero() {
                    let effects = self.effects.clone();
                    let duration = info.effect_duration;
                    tokio::spawn(async move {
                        tokio::time::sleep(duration).await;
                        effects.effect_ended(&ctx);
                    });
                }
            }
            AbilityKind::Area => {
                if !self.world.is_activating(actor) || !ability.can_use(actor, level) {
                    return false;
                }
                if !ability.trigger(actor, level, info.cooldown, listeners) {
                    return false;
                }
                let nearby: Vec<ActorId> = self
                    .world
                    .nearby_actors(actor, info.effective_radius())
                    .into_iter()
                    .filter(|other| *other != actor)
                    .collect();
                self.effects.apply_area(&ctx, &nearby);
            }
        }
        true
    }
}
