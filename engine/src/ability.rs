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

//! Abilities
//!
//! An [`Ability`] is level-gated data: an unlock level, a sparse effect table keyed by
//! breakpoint levels, and a display style. The only mutable part is the per-actor cooldown map.
//!
//! Per (ability, actor) the lifecycle is `Locked -> Ready -> OnCooldown -> Ready`. Nothing is
//! cached about the locked state; every call re-checks the level it is given, so an admin can
//! move an actor back below the unlock level at any time.

use crate::events::{AbilityUseEvent, Listeners};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use skillforge_common::ActorId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Highest level covered by a generated effect table
pub const DEFAULT_EFFECT_CEILING: u32 = 100;

/// Radius used by area abilities that do not configure one
pub const DEFAULT_AREA_RADIUS: f64 = 5.0;

/// How an ability is activated by the trigger rule engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbilityKind {
    /// Rolled against the effect value on every matching action
    Passive,
    /// Requires the activation gesture and respects a cooldown
    Active,
    /// Like `Active`, but the effect also reaches nearby actors
    Area,
}

impl FromStr for AbilityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passive" => Ok(AbilityKind::Passive),
            "active" => Ok(AbilityKind::Active),
            "area" | "aoe" => Ok(AbilityKind::Area),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbilityKind::Passive => write!(f, "passive"),
            AbilityKind::Active => write!(f, "active"),
            AbilityKind::Area => write!(f, "area"),
        }
    }
}

/// How the level-scaled description of an ability is rendered.
///
/// `Count` and `Linear` substitute their value for `{}` in the description.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EffectDisplay {
    /// Description shown as-is
    #[default]
    Plain,
    /// `"12.5% <description>"`
    Chance,
    /// `"+25% <description>"`
    Bonus,
    /// `"1.75x <description>"`
    Multiplier,
    /// `min(base + level / divisor, cap)` in whole units
    Count { base: u32, divisor: u32, cap: u32 },
    /// `base + level * per_level`, one decimal place
    Linear { base: f64, per_level: f64 },
}

impl EffectDisplay {
    fn render(&self, description: &str, effect: f64, level: u32) -> String {
        match self {
            EffectDisplay::Plain => description.to_string(),
            EffectDisplay::Chance => format!("{:.1}% {}", effect * 100.0, description),
            EffectDisplay::Bonus => format!("+{:.0}% {}", effect * 100.0, description),
            EffectDisplay::Multiplier => format!("{:.2}x {}", effect, description),
            EffectDisplay::Count { base, divisor, cap } => {
                let value = (base + level / (*divisor).max(1)).min(*cap);
                description.replacen("{}", &value.to_string(), 1)
            }
            EffectDisplay::Linear { base, per_level } => {
                let value = base + f64::from(level) * per_level;
                description.replacen("{}", &format!("{:.1}", value), 1)
            }
        }
    }
}

/// Metadata for abilities of declaratively defined skills
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAbilityInfo {
    pub display_name: Option<String>,
    pub kind: AbilityKind,
    pub cooldown: Duration,
    pub area_radius: f64,
    pub effect_duration: Duration,
    pub messages: HashMap<String, String>,
    pub parameters: HashMap<String, String>,
}

impl CustomAbilityInfo {
    pub fn new(kind: AbilityKind) -> Self {
        Self {
            display_name: None,
            kind,
            cooldown: Duration::ZERO,
            area_radius: 0.0,
            effect_duration: Duration::ZERO,
            messages: HashMap::new(),
            parameters: HashMap::new(),
        }
    }

    /// Radius for area effects, falling back to [`DEFAULT_AREA_RADIUS`]
    pub fn effective_radius(&self) -> f64 {
        if self.area_radius > 0.0 {
            self.area_radius
        } else {
            DEFAULT_AREA_RADIUS
        }
    }

    pub fn message(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// A level-gated ability with per-actor cooldowns
#[derive(Debug, Clone)]
pub struct Ability {
    name: String,
    unlock_level: u32,
    description: String,
    level_effects: BTreeMap<u32, f64>,
    display: EffectDisplay,
    info: Option<CustomAbilityInfo>,
    cooldowns: DashMap<ActorId, Instant>,
}

impl Ability {
    /// Create an ability with the generated effect table: at every tenth level from the unlock
    /// level through 100 the effect is `(level - unlock + 10) / 100`.
    pub fn new(name: impl Into<String>, unlock_level: u32, description: impl Into<String>) -> Self {
        let level_effects = (unlock_level..=DEFAULT_EFFECT_CEILING)
            .step_by(10)
            .map(|level| (level, f64::from(level - unlock_level + 10) / 100.0))
            .collect();
        Self {
            name: name.into(),
            unlock_level,
            description: description.into(),
            level_effects,
            display: EffectDisplay::Plain,
            info: None,
            cooldowns: DashMap::new(),
        }
    }

    /// Set or replace one breakpoint
    pub fn with_effect(mut self, level: u32, effect: f64) -> Self {
        self.level_effects.insert(level, effect);
        self
    }

    /// Replace the whole effect table
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = (u32, f64)>) -> Self {
        self.level_effects = effects.into_iter().collect();
        self
    }

    pub fn with_display(mut self, display: EffectDisplay) -> Self {
        self.display = display;
        self
    }

    pub fn with_info(mut self, info: CustomAbilityInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_unlock_level(mut self, unlock_level: u32) -> Self {
        self.unlock_level = unlock_level;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unlock_level(&self) -> u32 {
        self.unlock_level
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn display(&self) -> &EffectDisplay {
        &self.display
    }

    pub fn info(&self) -> Option<&CustomAbilityInfo> {
        self.info.as_ref()
    }

    pub fn level_effects(&self) -> &BTreeMap<u32, f64> {
        &self.level_effects
    }

    /// Effect at the highest breakpoint between the unlock level and `level`, or 0 when locked
    pub fn effect_for_level(&self, level: u32) -> f64 {
        if level < self.unlock_level {
            return 0.0;
        }
        self.level_effects
            .range(self.unlock_level..=level)
            .next_back()
            .map(|(_, effect)| *effect)
            .unwrap_or(0.0)
    }

    pub fn is_unlocked(&self, level: u32) -> bool {
        level >= self.unlock_level
    }

    pub fn can_use(&self, actor: ActorId, level: u32) -> bool {
        if !self.is_unlocked(level) {
            return false;
        }
        let now = Instant::now();
        self.cooldowns
            .get(&actor)
            .is_none_or(|expiry| *expiry <= now)
    }

    /// Activate the ability for an actor.
    ///
    /// The cooldown slot is reserved atomically before listeners run, so two concurrent
    /// triggers cannot both pass. If a listener vetoes, the reservation is released again.
    pub fn trigger(
        &self,
        actor: ActorId,
        level: u32,
        cooldown: Duration,
        listeners: &Listeners,
    ) -> bool {
        if !self.is_unlocked(level) {
            return false;
        }

        let now = Instant::now();
        let reserved = now + cooldown;
        match self.cooldowns.entry(actor) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return false;
                }
                if cooldown.is_zero() {
                    entry.remove();
                } else {
                    entry.insert(reserved);
                }
            }
            Entry::Vacant(entry) => {
                if !cooldown.is_zero() {
                    entry.insert(reserved);
                }
            }
        }

        let mut event = AbilityUseEvent::new(actor, &self.name, level, cooldown);
        if listeners.ability_use(&mut event) {
            return true;
        }

        if !cooldown.is_zero() {
            self.cooldowns
                .remove_if(&actor, |_, expiry| *expiry == reserved);
        }
        tracing::debug!("Activation of {} for {} was cancelled", self.name, actor);
        false
    }

    /// Whole seconds until the actor may use the ability again, rounded up.
    ///
    /// Expired entries are removed here.
    pub fn remaining_cooldown(&self, actor: ActorId) -> u64 {
        let now = Instant::now();
        let expiry = match self.cooldowns.get(&actor) {
            Some(expiry) => *expiry,
            None => return 0,
        };
        if expiry <= now {
            self.cooldowns.remove_if(&actor, |_, expiry| *expiry <= now);
            return 0;
        }
        let remaining = expiry - now;
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    /// Drop an actor's cooldown regardless of expiry
    pub fn clear_cooldown(&self, actor: ActorId) {
        self.cooldowns.remove(&actor);
    }

    /// Level-scaled, human readable description
    pub fn describe(&self, level: u32) -> String {
        if !self.is_unlocked(level) {
            return format!("Locked (Unlocks at level {})", self.unlock_level);
        }
        self.display
            .render(&self.description, self.effect_for_level(level), level)
    }
}
