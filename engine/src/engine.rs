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

//! Progression engine facade
//!
//! Wires the registry, curve, cache, persistence worker and rule engine together and exposes
//! the calls a game adapter makes. Shutdown order: stop accepting events, stop the auto-flush
//! timer, flush every dirty actor, close the backend.

use crate::ability::Ability;
use crate::admin::AdminCommands;
use crate::cache::{ActorStateCache, FlushReport};
use crate::error::StorageResult;
use crate::events::Listeners;
use crate::persistence::{PersistenceBackend, PersistenceWorker};
use crate::progression::{DEFAULT_MAX_LEVEL, ExperienceCurve};
use crate::rules::{AbilityEffects, ActorWorld, DispatchReport, EmptyWorld, NoEffects, TriggerRuleEngine};
use crate::skill::{AwardOutcome, DropEntry, SkillContext, SkillDefinition, SkillRegistry};
use skillforge_common::{ActorId, SkillRank};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

/// Admission control for engine calls.
///
/// Calls hold a read guard while they run; shutdown closes the gate and takes the write guard,
/// which waits for in-flight calls to finish before the final flush.
#[derive(Debug)]
pub(crate) struct Gate {
    open: AtomicBool,
    lock: RwLock<()>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            lock: RwLock::new(()),
        }
    }

    pub(crate) async fn enter(&self) -> Option<RwLockReadGuard<'_, ()>> {
        let guard = self.lock.read().await;
        self.open.load(Ordering::SeqCst).then_some(guard)
    }

    /// Close the gate and wait for in-flight calls. `None` if it was already closed.
    pub(crate) async fn close(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return None;
        }
        Some(self.lock.write().await)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Auto-flush period; zero disables the timer
    pub save_interval: Duration,
    /// Multiplier applied when the caller does not resolve one
    pub exp_multiplier: f64,
    pub max_level: u32,
    pub level_up_messages: bool,
    pub ability_messages: bool,
    /// Delay between an actor leaving and its eviction
    pub departure_save_delay: Duration,
    /// Seed for passive-ability rolls; `None` seeds from the OS
    pub random_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            save_interval: Duration::from_secs(300),
            exp_multiplier: 1.0,
            max_level: DEFAULT_MAX_LEVEL,
            level_up_messages: true,
            ability_messages: true,
            departure_save_delay: Duration::from_millis(1000),
            random_seed: None,
        }
    }
}

/// Game-side collaborators
#[derive(Clone)]
pub struct EngineHooks {
    pub listeners: Listeners,
    pub effects: Arc<dyn AbilityEffects>,
    pub world: Arc<dyn ActorWorld>,
}

impl Default for EngineHooks {
    fn default() -> Self {
        Self {
            listeners: Listeners::new(),
            effects: Arc::new(NoEffects),
            world: Arc::new(EmptyWorld),
        }
    }
}

/// Level-scaled view of one ability for one actor
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityStatus {
    pub name: String,
    pub unlock_level: u32,
    pub unlocked: bool,
    pub effect: f64,
    pub description: String,
    pub remaining_cooldown: u64,
}

/// Read-side view of one skill for one actor
#[derive(Debug, Clone, PartialEq)]
pub struct SkillSummary {
    pub skill: String,
    pub display_name: String,
    pub level: u32,
    pub experience: f64,
    pub exp_to_next_level: f64,
    pub exp_remaining: f64,
    pub progress: f64,
    pub rank: SkillRank,
}

/// The progression engine
pub struct ProgressionEngine {
    settings: EngineSettings,
    registry: Arc<SkillRegistry>,
    curve: Arc<ExperienceCurve>,
    cache: Arc<ActorStateCache>,
    worker: Arc<PersistenceWorker>,
    ctx: SkillContext,
    rules: TriggerRuleEngine,
    gate: Arc<Gate>,
    auto_flush: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressionEngine {
    /// Start the persistence worker and the auto-flush timer. Must run inside a tokio runtime.
    pub fn start(
        settings: EngineSettings,
        registry: SkillRegistry,
        curve: ExperienceCurve,
        backend: Box<dyn PersistenceBackend>,
        hooks: EngineHooks,
    ) -> Arc<Self> {
        let registry = Arc::new(registry);
        let curve = Arc::new(curve.with_max_level(settings.max_level));
        let worker = Arc::new(PersistenceWorker::spawn(backend));
        let cache = Arc::new(ActorStateCache::new(worker.clone(), registry.names()));

        let mut ctx = SkillContext::new(cache.clone(), curve.clone(), hooks.listeners);
        ctx.announce_level_ups = settings.level_up_messages;
        ctx.announce_unlocks = settings.ability_messages;

        let mut rules = TriggerRuleEngine::new(
            registry.custom_skills(),
            ctx.clone(),
            hooks.effects,
            hooks.world,
        );
        if let Some(seed) = settings.random_seed {
            rules = rules.with_seed(seed);
        }

        let auto_flush = if settings.save_interval.is_zero() {
            tracing::info!("Auto-flush disabled");
            None
        } else {
            Some(cache.clone().spawn_auto_flush(settings.save_interval))
        };

        tracing::info!(
            "Progression engine started with {} skill(s), {} custom",
            registry.len(),
            rules.skills().len()
        );

        Arc::new(Self {
            settings,
            registry,
            curve,
            cache,
            worker,
            ctx,
            rules,
            gate: Arc::new(Gate::new()),
            auto_flush: Mutex::new(auto_flush),
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    pub fn curve(&self) -> &Arc<ExperienceCurve> {
        &self.curve
    }

    pub fn cache(&self) -> &Arc<ActorStateCache> {
        &self.cache
    }

    pub fn listeners(&self) -> &Listeners {
        &self.ctx.listeners
    }

    pub fn is_accepting(&self) -> bool {
        self.gate.is_open()
    }

    pub fn admin(&self) -> AdminCommands {
        AdminCommands::new(
            self.registry.clone(),
            self.cache.clone(),
            self.curve.clone(),
            self.gate.clone(),
            self.settings.max_level,
        )
    }

    fn skill(&self, name: &str) -> Option<&Arc<SkillDefinition>> {
        let skill = self.registry.get(name);
        if skill.is_none() {
            tracing::warn!("Ignoring event for unknown skill {}", name);
        }
        skill
    }

    fn multiplier(&self, multiplier: Option<f64>) -> f64 {
        multiplier.unwrap_or(self.settings.exp_multiplier)
    }

    /// Load an actor's state ahead of their first event
    pub async fn actor_joined(&self, actor: ActorId) {
        let Some(_open) = self.gate.enter().await else {
            return;
        };
        self.cache.get(actor).await;
        tracing::debug!("Actor {} joined", actor);
    }

    /// Save and evict an actor after the departure delay
    pub async fn actor_departed(&self, actor: ActorId) -> StorageResult<()> {
        if !self.settings.departure_save_delay.is_zero() {
            tokio::time::sleep(self.settings.departure_save_delay).await;
        }
        let Some(_open) = self.gate.enter().await else {
            return Ok(());
        };
        let result = self.cache.evict(actor).await;
        match &result {
            Ok(()) => tracing::debug!("Actor {} departed, state saved", actor),
            Err(e) => tracing::error!("Failed to save {} on departure: {}", actor, e),
        }
        result
    }

    /// Award experience for a skill.
    ///
    /// `multiplier` is the caller-resolved multiplier; `None` uses the configured one.
    /// Returns `None` for unknown skills or after shutdown started.
    pub async fn award_experience(
        &self,
        actor: ActorId,
        skill: &str,
        amount: f64,
        multiplier: Option<f64>,
    ) -> Option<AwardOutcome> {
        let Some(_open) = self.gate.enter().await else {
            tracing::debug!("Ignoring award for {} during shutdown", actor);
            return None;
        };
        let skill = self.skill(skill)?;
        Some(
            skill
                .award_experience(&self.ctx, actor, amount, self.multiplier(multiplier))
                .await,
        )
    }

    /// Award experience for an action on a material, using the skill's source table and the
    /// award formula at the actor's current level
    pub async fn award_for_source(
        &self,
        actor: ActorId,
        skill: &str,
        material: &str,
        multiplier: Option<f64>,
    ) -> Option<AwardOutcome> {
        let Some(_open) = self.gate.enter().await else {
            tracing::debug!("Ignoring award for {} during shutdown", actor);
            return None;
        };
        let skill = self.skill(skill)?;
        let base = skill.source_experience(material)?;
        let level = self.cache.read(actor, |state| state.level(skill.name())).await;
        let amount = self
            .curve
            .award_amount(base, level, self.multiplier(multiplier));
        Some(skill.award_experience(&self.ctx, actor, amount, 1.0).await)
    }

    /// Match a game action against every custom skill
    pub async fn dispatch(
        &self,
        actor: ActorId,
        trigger: &str,
        material: &str,
        multiplier: Option<f64>,
    ) -> DispatchReport {
        let Some(_open) = self.gate.enter().await else {
            tracing::debug!("Ignoring {} dispatch for {} during shutdown", trigger, actor);
            return DispatchReport::default();
        };
        self.rules
            .dispatch(actor, trigger, material, self.multiplier(multiplier))
            .await
    }

    /// Roll a skill's tiered reward table for an actor at their current level.
    ///
    /// `None` for unknown skills, skills without a table, levels outside every tier, or when
    /// every entry misses.
    pub async fn special_drop(&self, actor: ActorId, skill: &str) -> Option<DropEntry> {
        let _open = self.gate.enter().await?;
        let definition = self.skill(skill)?;
        definition.drop_table()?;
        let level = self
            .cache
            .read(actor, |state| state.level(definition.name()))
            .await;
        self.rules.roll_drop(definition, level)
    }

    /// Roll a skill's tiered reward table at a known level, e.g. from an effect callback
    pub fn roll_drop(&self, skill: &str, level: u32) -> Option<DropEntry> {
        self.rules.roll_drop(self.registry.get(skill)?, level)
    }

    fn find_ability(
        &self,
        skill: &str,
        ability: &str,
    ) -> Option<(&Arc<SkillDefinition>, &Arc<Ability>)> {
        let definition = self.registry.get(skill)?;
        Some((definition, definition.ability(ability)?))
    }

    /// Activate an ability on behalf of the adapter, applying its configured cooldown
    pub async fn activate_ability(&self, actor: ActorId, skill: &str, ability: &str) -> bool {
        let Some(_open) = self.gate.enter().await else {
            return false;
        };
        let Some((definition, found)) = self.find_ability(skill, ability) else {
            return false;
        };
        let level = self
            .cache
            .read(actor, |state| state.level(definition.name()))
            .await;
        let cooldown = found.info().map(|info| info.cooldown).unwrap_or_default();
        found.trigger(actor, level, cooldown, &self.ctx.listeners)
    }

    pub async fn can_use_ability(&self, actor: ActorId, skill: &str, ability: &str) -> bool {
        let Some((definition, found)) = self.find_ability(skill, ability) else {
            return false;
        };
        let level = self
            .cache
            .inspect(actor, |state| state.level(definition.name()))
            .await;
        found.can_use(actor, level)
    }

    pub fn remaining_cooldown(&self, actor: ActorId, skill: &str, ability: &str) -> u64 {
        self.find_ability(skill, ability)
            .map(|(_, found)| found.remaining_cooldown(actor))
            .unwrap_or(0)
    }

    /// Level-scaled state of every ability of a skill, in registration order
    pub async fn ability_info(&self, actor: ActorId, skill: &str) -> Vec<AbilityStatus> {
        let Some(definition) = self.registry.get(skill) else {
            return Vec::new();
        };
        let level = self
            .cache
            .inspect(actor, |state| state.level(definition.name()))
            .await;
        definition
            .abilities()
            .iter()
            .map(|ability| AbilityStatus {
                name: ability.name().to_string(),
                unlock_level: ability.unlock_level(),
                unlocked: ability.is_unlocked(level),
                effect: ability.effect_for_level(level),
                description: ability.describe(level),
                remaining_cooldown: ability.remaining_cooldown(actor),
            })
            .collect()
    }

    pub async fn skill_summary(&self, actor: ActorId, skill: &str) -> Option<SkillSummary> {
        let definition = self.registry.get(skill)?;
        let curve = &self.curve;
        let summary = self
            .cache
            .inspect(actor, |state| {
                let name = definition.name();
                let level = state.level(name);
                SkillSummary {
                    skill: name.to_string(),
                    display_name: definition.display_name().to_string(),
                    level,
                    experience: state.experience(name),
                    exp_to_next_level: curve.exp_to_next_level(level),
                    exp_remaining: state.exp_remaining(name, curve),
                    progress: state.level_progress(name, curve),
                    rank: state.rank(name),
                }
            })
            .await;
        Some(summary)
    }

    pub async fn total_level(&self, actor: ActorId) -> u64 {
        self.cache.inspect(actor, |state| state.total_level()).await
    }

    pub async fn flush_one(&self, actor: ActorId) -> StorageResult<bool> {
        self.cache.flush_one(actor).await
    }

    pub async fn flush_all(&self) -> FlushReport {
        self.cache.flush_all().await
    }

    /// Stop accepting events, write every dirty actor and close the backend.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn shutdown(&self) -> StorageResult<FlushReport> {
        let Some(_closed) = self.gate.close().await else {
            return Ok(FlushReport::default());
        };
        tracing::info!("Shutting down progression engine");

        let timer = self
            .auto_flush
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
            let _ = timer.await;
        }

        let report = self.cache.flush_all().await;
        if !report.failed.is_empty() {
            tracing::error!(
                "{} actor(s) could not be saved before shutdown",
                report.failed.len()
            );
        }
        self.worker.close().await?;
        tracing::info!("Progression engine stopped");
        Ok(report)
    }
}
