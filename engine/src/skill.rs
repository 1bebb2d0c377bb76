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

//! Skill definitions and experience awards

pub mod builtin;
pub mod drops;
pub mod registry;

pub use builtin::builtin_skills;
pub use drops::{DropEntry, DropTable, DropTier};
pub use registry::SkillRegistry;

use crate::ability::Ability;
use crate::cache::ActorStateCache;
use crate::events::{AbilityUnlockedEvent, Listeners, SkillLevelUpEvent};
use crate::progression::ExperienceCurve;
use crate::rules::TriggerRule;
use skillforge_common::{ActorId, skill_key};
use std::collections::HashMap;
use std::sync::Arc;

/// Base experience for declarative skills that do not configure one
pub const DEFAULT_BASE_EXPERIENCE: f64 = 5.0;

/// Collaborators an award needs, passed explicitly instead of looked up globally
#[derive(Clone)]
pub struct SkillContext {
    pub cache: Arc<ActorStateCache>,
    pub curve: Arc<ExperienceCurve>,
    pub listeners: Listeners,
    /// Ask the adapter to show level-up messages
    pub announce_level_ups: bool,
    /// Emit ability-unlocked notifications
    pub announce_unlocks: bool,
}

impl SkillContext {
    pub fn new(cache: Arc<ActorStateCache>, curve: Arc<ExperienceCurve>, listeners: Listeners) -> Self {
        Self {
            cache,
            curve,
            listeners,
            announce_level_ups: true,
            announce_unlocks: true,
        }
    }
}

/// What one award did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwardOutcome {
    pub old_level: u32,
    pub new_level: u32,
    /// A listener cancelled the level-up notification
    pub level_up_cancelled: bool,
    /// The adapter should display a level-up message
    pub announce: bool,
    /// Abilities whose unlock level equals the new level
    pub unlocked: Vec<String>,
}

impl AwardOutcome {
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

/// A named progression track and its abilities
#[derive(Debug)]
pub struct SkillDefinition {
    name: String,
    display_name: String,
    description: String,
    abilities: Vec<Arc<Ability>>,
    sources: HashMap<String, f64>,
    base_experience: Option<f64>,
    trigger_rule: Option<TriggerRule>,
    drop_table: Option<Arc<DropTable>>,
}

impl SkillDefinition {
    pub fn new(name: &str, display_name: impl Into<String>) -> Self {
        Self {
            name: skill_key(name),
            display_name: display_name.into(),
            description: String::new(),
            abilities: Vec::new(),
            sources: HashMap::new(),
            base_experience: None,
            trigger_rule: None,
            drop_table: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Experience for sources missing from the source table; `None` awards nothing for them
    pub fn with_base_experience(mut self, base: Option<f64>) -> Self {
        self.base_experience = base;
        self
    }

    pub fn with_source(mut self, material: &str, experience: f64) -> Self {
        self.set_source(material, experience);
        self
    }

    pub fn with_trigger_rule(mut self, rule: TriggerRule) -> Self {
        self.trigger_rule = Some(rule);
        self
    }

    pub fn with_drop_table(mut self, table: DropTable) -> Self {
        self.set_drop_table(table);
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.add_ability(ability);
        self
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    pub fn set_drop_table(&mut self, table: DropTable) {
        self.drop_table = Some(Arc::new(table));
    }

    pub fn set_source(&mut self, material: &str, experience: f64) {
        self.sources.insert(material.to_string(), experience);
    }

    /// Register an ability, replacing one with the same name in place
    pub fn add_ability(&mut self, ability: Ability) {
        let ability = Arc::new(ability);
        match self
            .abilities
            .iter_mut()
            .find(|existing| existing.name() == ability.name())
        {
            Some(existing) => *existing = ability,
            None => self.abilities.push(ability),
        }
    }

    pub fn remove_ability(&mut self, name: &str) -> Option<Arc<Ability>> {
        let index = self
            .abilities
            .iter()
            .position(|ability| ability.name().eq_ignore_ascii_case(name))?;
        Some(self.abilities.remove(index))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Abilities in registration order
    pub fn abilities(&self) -> &[Arc<Ability>] {
        &self.abilities
    }

    pub fn ability(&self, name: &str) -> Option<&Arc<Ability>> {
        self.abilities
            .iter()
            .find(|ability| ability.name().eq_ignore_ascii_case(name))
    }

    pub fn base_experience(&self) -> Option<f64> {
        self.base_experience
    }

    pub fn sources(&self) -> &HashMap<String, f64> {
        &self.sources
    }

    /// Base experience for a material: its table entry, else the skill's base experience
    pub fn source_experience(&self, material: &str) -> Option<f64> {
        self.sources.get(material).copied().or(self.base_experience)
    }

    pub fn trigger_rule(&self) -> Option<&TriggerRule> {
        self.trigger_rule.as_ref()
    }

    pub fn is_custom(&self) -> bool {
        self.trigger_rule.is_some()
    }

    pub fn drop_table(&self) -> Option<&Arc<DropTable>> {
        self.drop_table.as_ref()
    }

    /// Chance multiplier for the drop table at `level`: 1 plus the bonus ability's effect
    /// once it is unlocked
    pub fn drop_chance_multiplier(&self, level: u32) -> f64 {
        let bonus = self
            .drop_table
            .as_ref()
            .and_then(|table| table.bonus_ability())
            .and_then(|name| self.ability(name))
            .map(|ability| ability.effect_for_level(level))
            .unwrap_or(0.0);
        1.0 + bonus
    }

    /// Award `amount * multiplier` experience to an actor.
    ///
    /// The numeric change is applied first. On a level-up listeners are notified; a cancelled
    /// level-up suppresses messages and unlock notifications but keeps the new level.
    pub async fn award_experience(
        &self,
        ctx: &SkillContext,
        actor: ActorId,
        amount: f64,
        multiplier: f64,
    ) -> AwardOutcome {
        let amount = amount * multiplier;
        let (old_level, new_level) = ctx
            .cache
            .update(actor, |state| {
                let old = state.level(&self.name);
                state.add_experience(&self.name, amount, &ctx.curve);
                (old, state.level(&self.name))
            })
            .await;

        let mut outcome = AwardOutcome {
            old_level,
            new_level,
            ..Default::default()
        };
        if !outcome.leveled_up() {
            return outcome;
        }

        metrics::counter!("skillforge_level_ups_total").increment(1);
        let mut event = SkillLevelUpEvent::new(actor, &self.name, old_level, new_level);
        if !ctx.listeners.level_up(&mut event) {
            outcome.level_up_cancelled = true;
            return outcome;
        }
        outcome.announce = ctx.announce_level_ups;

        if ctx.announce_unlocks {
            for ability in &self.abilities {
                if ability.unlock_level() != new_level {
                    continue;
                }
                ctx.listeners.ability_unlocked(&AbilityUnlockedEvent {
                    actor_id: actor,
                    skill: self.name.clone(),
                    ability: ability.name().to_string(),
                    unlock_level: new_level,
                });
                outcome.unlocked.push(ability.name().to_string());
            }
        }
        outcome
    }
}
