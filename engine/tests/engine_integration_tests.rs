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

//! End-to-end tests of the progression engine against in-memory and flat-file storage

use async_trait::async_trait;
use skillforge_common::{ActorId, ProgressionSnapshot, SkillProgress};
use skillforge_engine::ability::{Ability, AbilityKind, CustomAbilityInfo};
use skillforge_engine::error::{AdminError, StorageError, StorageResult};
use skillforge_engine::events::{ProgressionListener, SkillLevelUpEvent};
use skillforge_engine::persistence::FlatFileBackend;
use skillforge_engine::rules::EffectContext;
use skillforge_engine::skill::{DropEntry, DropTable, DropTier, builtin_skills};
use skillforge_engine::{
    AbilityEffects, ActorWorld, EngineHooks, EngineSettings, ExperienceCurve, PersistenceBackend,
    ProgressionEngine, SkillDefinition, SkillRegistry, TriggerRule,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend keeping snapshots in memory, with per-actor save failures on demand
#[derive(Default)]
struct MemoryBackend {
    records: Mutex<HashMap<ActorId, ProgressionSnapshot>>,
    failing: Mutex<HashSet<ActorId>>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    fn fail_saves_for(&self, actor: ActorId) {
        self.failing.lock().unwrap().insert(actor);
    }

    fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn stored(&self, actor: ActorId) -> Option<ProgressionSnapshot> {
        self.records.lock().unwrap().get(&actor).cloned()
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

/// Lets the test keep a handle on the backend the engine owns
struct SharedBackend(Arc<MemoryBackend>);

#[async_trait]
impl PersistenceBackend for SharedBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, actor: ActorId) -> StorageResult<Option<ProgressionSnapshot>> {
        Ok(self.0.stored(actor))
    }

    async fn save(&self, snapshot: &ProgressionSnapshot) -> StorageResult<()> {
        if self.0.failing.lock().unwrap().contains(&snapshot.actor_id) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.0.saves.fetch_add(1, Ordering::SeqCst);
        self.0
            .records
            .lock()
            .unwrap()
            .insert(snapshot.actor_id, snapshot.clone());
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingEffects {
    passive: Mutex<Vec<EffectContext>>,
    active: AtomicUsize,
    ended: AtomicUsize,
    area: Mutex<Vec<Vec<ActorId>>>,
}

struct SharedEffects(Arc<RecordingEffects>);

impl AbilityEffects for SharedEffects {
    fn apply_passive(&self, ctx: &EffectContext) {
        self.0.passive.lock().unwrap().push(ctx.clone());
    }

    fn apply_active(&self, _ctx: &EffectContext) {
        self.0.active.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_area(&self, _ctx: &EffectContext, nearby: &[ActorId]) {
        self.0.area.lock().unwrap().push(nearby.to_vec());
    }

    fn effect_ended(&self, _ctx: &EffectContext) {
        self.0.ended.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct TestWorld {
    activating: AtomicBool,
    nearby: Mutex<Vec<ActorId>>,
}

struct SharedWorld(Arc<TestWorld>);

impl ActorWorld for SharedWorld {
    fn is_activating(&self, _actor: ActorId) -> bool {
        self.0.activating.load(Ordering::SeqCst)
    }

    fn nearby_actors(&self, _actor: ActorId, _radius: f64) -> Vec<ActorId> {
        self.0.nearby.lock().unwrap().clone()
    }
}

fn settings() -> EngineSettings {
    EngineSettings {
        save_interval: Duration::ZERO,
        departure_save_delay: Duration::ZERO,
        random_seed: Some(7),
        ..Default::default()
    }
}

fn builtin_registry() -> SkillRegistry {
    let mut registry = SkillRegistry::new();
    for skill in builtin_skills() {
        registry.register(skill);
    }
    registry
}

fn custom_skill(name: &str, materials: &[&str]) -> SkillDefinition {
    SkillDefinition::new(name, name)
        .with_base_experience(Some(10.0))
        .with_trigger_rule(TriggerRule::new(
            ["BREAK"],
            materials.iter().map(|m| m.to_string()),
        ))
}

fn start_memory(
    registry: SkillRegistry,
    hooks: EngineHooks,
) -> (Arc<ProgressionEngine>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::default());
    let engine = ProgressionEngine::start(
        settings(),
        registry,
        ExperienceCurve::default(),
        Box::new(SharedBackend(backend.clone())),
        hooks,
    );
    (engine, backend)
}

#[tokio::test]
async fn test_award_crosses_two_levels() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    let curve = ExperienceCurve::default();

    let first = engine
        .award_experience(actor, "mining", 100.0, Some(1.0))
        .await
        .unwrap();
    assert_eq!((first.old_level, first.new_level), (0, 1));

    let outcome = engine
        .award_experience(actor, "mining", 250.0, Some(1.0))
        .await
        .unwrap();
    assert_eq!(outcome.old_level, 1);
    assert_eq!(outcome.new_level, 3);
    assert!(outcome.announce);

    let summary = engine.skill_summary(actor, "mining").await.unwrap();
    let expected = (250.0 - curve.exp_to_next_level(1)) - curve.exp_to_next_level(2);
    assert_eq!(summary.level, 3);
    assert_eq!(summary.experience.to_bits(), expected.to_bits());
    assert_eq!(engine.total_level(actor).await, 3);
}

#[tokio::test]
async fn test_unknown_skill_is_ignored() {
    let (engine, backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();

    assert!(engine
        .award_experience(actor, "underwater_basket_weaving", 50.0, None)
        .await
        .is_none());
    assert!(engine.skill_summary(actor, "nope").await.is_none());
    assert!(!engine.flush_one(actor).await.unwrap());
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_configured_multiplier_applies_when_caller_has_none() {
    let backend = Arc::new(MemoryBackend::default());
    let engine = ProgressionEngine::start(
        EngineSettings {
            exp_multiplier: 2.0,
            ..settings()
        },
        builtin_registry(),
        ExperienceCurve::default(),
        Box::new(SharedBackend(backend)),
        EngineHooks::default(),
    );
    let actor = ActorId::new();

    engine.award_experience(actor, "fishing", 30.0, None).await;
    engine.award_experience(actor, "fishing", 5.0, Some(1.0)).await;
    let summary = engine.skill_summary(actor, "fishing").await.unwrap();
    assert_eq!(summary.experience, 65.0);
}

#[tokio::test]
async fn test_award_for_source() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();

    // Level 0 under the default formula awards the source value itself
    let outcome = engine
        .award_for_source(actor, "mining", "IRON_ORE", Some(1.0))
        .await
        .unwrap();
    assert!(!outcome.leveled_up());
    let summary = engine.skill_summary(actor, "mining").await.unwrap();
    assert_eq!(summary.experience, 7.0);

    // Mining only pays for listed ores; other skills fall back to the base experience
    assert!(engine
        .award_for_source(actor, "mining", "DIRT", Some(1.0))
        .await
        .is_none());
    engine
        .award_for_source(actor, "woodcutting", "DIRT", Some(1.0))
        .await
        .unwrap();
    let summary = engine.skill_summary(actor, "woodcutting").await.unwrap();
    assert_eq!(summary.experience, 5.0);
}

#[tokio::test]
async fn test_award_for_source_scales_with_level() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    engine.admin().set_level(actor, "mining", 10).await.unwrap();

    engine
        .award_for_source(actor, "mining", "GOLD_ORE", Some(2.0))
        .await
        .unwrap();
    let summary = engine.skill_summary(actor, "mining").await.unwrap();
    // 10 * (1 + 10 * 0.1) * 2
    assert!((summary.experience - 40.0).abs() < 1e-9);
    assert_eq!(summary.level, 10);
}

struct CancelLevelUps;

impl ProgressionListener for CancelLevelUps {
    fn on_level_up(&self, event: &mut SkillLevelUpEvent) {
        event.cancel();
    }
}

#[tokio::test]
async fn test_cancelled_level_up_keeps_level() {
    let hooks = EngineHooks::default();
    hooks.listeners.subscribe(Arc::new(CancelLevelUps));
    let (engine, _backend) = start_memory(builtin_registry(), hooks);
    let actor = ActorId::new();

    let outcome = engine
        .award_experience(actor, "archery", 1000.0, Some(1.0))
        .await
        .unwrap();
    assert!(outcome.level_up_cancelled);
    assert!(!outcome.announce);
    assert!(outcome.unlocked.is_empty());
    assert!(outcome.new_level > 0);
    assert_eq!(
        engine.skill_summary(actor, "archery").await.unwrap().level,
        outcome.new_level
    );
}

#[tokio::test]
async fn test_unlock_notifications_at_exact_level() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    engine.admin().set_level(actor, "mining", 9).await.unwrap();

    let curve = ExperienceCurve::default();
    let outcome = engine
        .award_experience(actor, "mining", curve.exp_to_next_level(9), Some(1.0))
        .await
        .unwrap();
    assert_eq!(outcome.new_level, 10);
    assert_eq!(outcome.unlocked, vec!["doubleore".to_string()]);

    let info = engine.ability_info(actor, "mining").await;
    let double_ore = info.iter().find(|a| a.name == "doubleore").unwrap();
    assert!(double_ore.unlocked);
    let vein_miner = info.iter().find(|a| a.name == "veinminer").unwrap();
    assert!(!vein_miner.unlocked);
    assert_eq!(vein_miner.description, "Locked (Unlocks at level 50)");
}

#[tokio::test]
async fn test_dispatch_respects_material_filters() {
    let mut registry = SkillRegistry::new();
    registry.register(custom_skill("digging", &[]));
    registry.register(custom_skill("prospecting", &["GOLD_ORE"]));
    let (engine, _backend) = start_memory(registry, EngineHooks::default());
    let actor = ActorId::new();

    let report = engine.dispatch(actor, "break", "IRON_ORE", Some(1.0)).await;
    assert!(report.matched());
    assert!(report.get("digging").is_some());
    assert!(report.get("prospecting").is_none());

    let report = engine.dispatch(actor, "BREAK", "GOLD_ORE", Some(1.0)).await;
    assert_eq!(report.skills.len(), 2);

    let report = engine.dispatch(actor, "PLACE", "GOLD_ORE", Some(1.0)).await;
    assert!(!report.matched());

    assert_eq!(
        engine.skill_summary(actor, "digging").await.unwrap().experience,
        20.0
    );
    assert_eq!(
        engine
            .skill_summary(actor, "prospecting")
            .await
            .unwrap()
            .experience,
        10.0
    );
}

#[tokio::test]
async fn test_dispatch_fires_certain_passive() {
    let mut registry = SkillRegistry::new();
    registry.register(
        custom_skill("digging", &[]).with_ability(
            Ability::new("lucky_find", 0, "always lucky")
                .with_effects([(0, 1.0)])
                .with_info(CustomAbilityInfo::new(AbilityKind::Passive)),
        ),
    );
    let effects = Arc::new(RecordingEffects::default());
    let hooks = EngineHooks {
        effects: Arc::new(SharedEffects(effects.clone())),
        ..Default::default()
    };
    let (engine, _backend) = start_memory(registry, hooks);
    let actor = ActorId::new();

    let report = engine.dispatch(actor, "BREAK", "IRON_ORE", Some(1.0)).await;
    assert_eq!(
        report.get("digging").unwrap().activated,
        vec!["lucky_find".to_string()]
    );
    let report = engine.dispatch(actor, "BREAK", "IRON_ORE", Some(1.0)).await;
    assert_eq!(report.get("digging").unwrap().activated.len(), 1);

    let passive = effects.passive.lock().unwrap();
    assert_eq!(passive.len(), 2);
    assert_eq!(passive[0].effect, 1.0);
    assert_eq!(passive[0].material, "IRON_ORE");
    assert_eq!(passive[0].skill, "digging");
}

fn brawling() -> SkillDefinition {
    let mut frenzy = CustomAbilityInfo::new(AbilityKind::Active);
    frenzy.cooldown = Duration::from_secs(30);
    frenzy.effect_duration = Duration::from_secs(5);
    let mut shockwave = CustomAbilityInfo::new(AbilityKind::Area);
    shockwave.cooldown = Duration::from_secs(60);
    shockwave.area_radius = 3.0;
    SkillDefinition::new("brawling", "Brawling")
        .with_base_experience(Some(1.0))
        .with_trigger_rule(TriggerRule::new(["ATTACK"], Vec::<String>::new()))
        .with_ability(
            Ability::new("frenzy", 0, "rage")
                .with_effects([(0, 1.0)])
                .with_info(frenzy),
        )
        .with_ability(
            Ability::new("shockwave", 0, "knock back")
                .with_effects([(0, 1.0)])
                .with_info(shockwave),
        )
}

#[tokio::test(start_paused = true)]
async fn test_active_and_area_abilities_need_activation() {
    let mut registry = SkillRegistry::new();
    registry.register(brawling());
    let effects = Arc::new(RecordingEffects::default());
    let world = Arc::new(TestWorld::default());
    let hooks = EngineHooks {
        effects: Arc::new(SharedEffects(effects.clone())),
        world: Arc::new(SharedWorld(world.clone())),
        ..Default::default()
    };
    let (engine, _backend) = start_memory(registry, hooks);
    let actor = ActorId::new();
    let bystander = ActorId::new();
    *world.nearby.lock().unwrap() = vec![actor, bystander];

    let report = engine.dispatch(actor, "ATTACK", "ZOMBIE", Some(1.0)).await;
    assert!(report.get("brawling").unwrap().activated.is_empty());

    world.activating.store(true, Ordering::SeqCst);
    let report = engine.dispatch(actor, "ATTACK", "ZOMBIE", Some(1.0)).await;
    assert_eq!(
        report.get("brawling").unwrap().activated,
        vec!["frenzy".to_string(), "shockwave".to_string()]
    );
    assert_eq!(effects.active.load(Ordering::SeqCst), 1);
    assert_eq!(*effects.area.lock().unwrap(), vec![vec![bystander]]);
    assert_eq!(engine.remaining_cooldown(actor, "brawling", "frenzy"), 30);
    assert_eq!(engine.remaining_cooldown(actor, "brawling", "shockwave"), 60);

    // On cooldown
    let report = engine.dispatch(actor, "ATTACK", "ZOMBIE", Some(1.0)).await;
    assert!(report.get("brawling").unwrap().activated.is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(effects.ended.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(25)).await;
    let report = engine.dispatch(actor, "ATTACK", "ZOMBIE", Some(1.0)).await;
    assert_eq!(
        report.get("brawling").unwrap().activated,
        vec!["frenzy".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_counts_down() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    engine.admin().set_level(actor, "mining", 60).await.unwrap();

    assert!(engine.can_use_ability(actor, "mining", "veinminer").await);
    assert!(engine.activate_ability(actor, "mining", "veinminer").await);
    assert!(!engine.activate_ability(actor, "mining", "veinminer").await);

    let mut previous = engine.remaining_cooldown(actor, "mining", "veinminer");
    assert_eq!(previous, 120);
    for _ in 0..12 {
        tokio::time::advance(Duration::from_secs(10)).await;
        let remaining = engine.remaining_cooldown(actor, "mining", "veinminer");
        assert!(remaining <= previous);
        previous = remaining;
    }
    assert_eq!(previous, 0);
    assert!(engine.can_use_ability(actor, "mining", "veinminer").await);
}

#[tokio::test]
async fn test_locked_ability_cannot_activate() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    assert!(!engine.can_use_ability(actor, "mining", "veinminer").await);
    assert!(!engine.activate_ability(actor, "mining", "veinminer").await);
    assert!(!engine.activate_ability(actor, "mining", "no_such_ability").await);
    assert_eq!(engine.remaining_cooldown(actor, "mining", "veinminer"), 0);
}

#[tokio::test]
async fn test_special_drop_uses_tier_for_level() {
    let mut registry = SkillRegistry::new();
    for skill in builtin_skills() {
        let skill = if skill.name() == "fishing" {
            skill.with_drop_table(
                DropTable::new()
                    .with_bonus_ability("treasurehunter")
                    .with_tier(
                        DropTier::new("shallows", 1, 9)
                            .with_entry(DropEntry::material("COD", 100.0)),
                    )
                    .with_tier(
                        DropTier::new("depths", 10, 100)
                            .with_entry(DropEntry::material("NAUTILUS_SHELL", 0.0))
                            .with_entry(DropEntry::named("CHEST", "Sunken Chest", 100.0)),
                    ),
            )
        } else {
            skill
        };
        registry.register(skill);
    }
    let (engine, _backend) = start_memory(registry, EngineHooks::default());
    let actor = ActorId::new();

    // level 0 is below every tier
    assert!(engine.special_drop(actor, "fishing").await.is_none());

    engine.admin().set_level(actor, "fishing", 5).await.unwrap();
    let drop = engine.special_drop(actor, "Fishing").await.unwrap();
    assert_eq!(drop.material, "COD");

    engine.admin().set_level(actor, "fishing", 40).await.unwrap();
    let drop = engine.special_drop(actor, "fishing").await.unwrap();
    assert_eq!(drop.name.as_deref(), Some("Sunken Chest"));
    assert_eq!(engine.roll_drop("fishing", 3).unwrap().material, "COD");

    assert!(engine.special_drop(actor, "mining").await.is_none());
    assert!(engine.special_drop(actor, "no_such_skill").await.is_none());
    assert!(engine.roll_drop("fishing", 500).is_none());
}

#[tokio::test]
async fn test_queries_do_not_cache_absent_actors() {
    let (engine, backend) = start_memory(builtin_registry(), EngineHooks::default());
    let stranger = ActorId::new();
    assert_eq!(engine.total_level(stranger).await, 0);
    assert_eq!(engine.skill_summary(stranger, "mining").await.unwrap().level, 0);
    assert!(!engine.ability_info(stranger, "mining").await.is_empty());
    assert!(!engine.can_use_ability(stranger, "mining", "veinminer").await);

    let offline = ActorId::new();
    let mut snapshot = ProgressionSnapshot::new(offline);
    snapshot.insert("mining", SkillProgress::new(12, 3.0));
    backend.records.lock().unwrap().insert(offline, snapshot);
    let summary = engine.skill_summary(offline, "Mining").await.unwrap();
    assert_eq!((summary.level, summary.experience), (12, 3.0));
    assert!(engine.can_use_ability(offline, "MINING", "doubleore").await);

    assert!(engine.cache().is_empty());
    assert_eq!(backend.saves(), 0);
}

#[tokio::test]
async fn test_flush_one_is_idempotent() {
    let (engine, backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    engine.award_experience(actor, "fishing", 12.0, Some(1.0)).await;

    assert!(engine.flush_one(actor).await.unwrap());
    assert!(!engine.flush_one(actor).await.unwrap());
    assert_eq!(backend.saves(), 1);
    let stored = backend.stored(actor).unwrap();
    assert_eq!(stored.get("fishing").unwrap().experience, 12.0);
}

#[tokio::test]
async fn test_flush_all_isolates_failures() {
    let (engine, backend) = start_memory(builtin_registry(), EngineHooks::default());
    let healthy = ActorId::new();
    let broken = ActorId::new();
    backend.fail_saves_for(broken);

    engine.award_experience(healthy, "farming", 3.0, Some(1.0)).await;
    engine.award_experience(broken, "farming", 4.0, Some(1.0)).await;

    let report = engine.flush_all().await;
    assert_eq!(report.saved, 1);
    assert_eq!(report.failed, vec![broken]);
    assert!(backend.stored(healthy).is_some());
    assert!(engine.cache().peek(broken).unwrap().is_dirty());
    assert!(!engine.cache().peek(healthy).unwrap().is_dirty());

    backend.heal();
    let report = engine.flush_all().await;
    assert_eq!(report.saved, 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        backend.stored(broken).unwrap().get("farming").unwrap().experience,
        4.0
    );
}

#[tokio::test]
async fn test_state_is_reloaded_after_departure() {
    let (engine, backend) = start_memory(builtin_registry(), EngineHooks::default());
    let actor = ActorId::new();
    engine.actor_joined(actor).await;
    assert!(engine.cache().contains(actor));

    engine.award_experience(actor, "acrobatics", 150.0, Some(1.0)).await;
    engine.actor_departed(actor).await.unwrap();
    assert!(!engine.cache().contains(actor));
    assert_eq!(backend.stored(actor).unwrap().get("acrobatics").unwrap().level, 1);

    let summary = engine.skill_summary(actor, "acrobatics").await.unwrap();
    assert_eq!(summary.level, 1);
    assert_eq!(summary.experience, 50.0);
}

#[tokio::test]
async fn test_admin_commands() {
    let (engine, _backend) = start_memory(builtin_registry(), EngineHooks::default());
    let admin = engine.admin();
    let actor = ActorId::new();

    admin.set_level(actor, "fencing", 25).await.unwrap();
    assert_eq!(engine.skill_summary(actor, "fencing").await.unwrap().level, 25);
    assert_eq!(
        admin.set_level(actor, "fencing", 101).await,
        Err(AdminError::LevelOutOfRange {
            level: 101,
            max: 100
        })
    );
    assert_eq!(
        admin.set_level(actor, "cooking", 5).await,
        Err(AdminError::UnknownSkill("cooking".to_string()))
    );

    admin.reset_all(actor).await.unwrap();
    assert_eq!(engine.total_level(actor).await, 0);
}

#[tokio::test]
async fn test_shutdown_flushes_then_refuses_work() {
    let temp_dir = tempfile::tempdir().unwrap();
    let backend = FlatFileBackend::open(temp_dir.path()).await.unwrap();
    let engine = ProgressionEngine::start(
        settings(),
        builtin_registry(),
        ExperienceCurve::default(),
        Box::new(backend),
        EngineHooks::default(),
    );
    let actor = ActorId::new();
    engine.award_experience(actor, "woodcutting", 230.0, Some(1.0)).await;

    let report = engine.shutdown().await.unwrap();
    assert_eq!(report.saved, 1);
    assert!(report.failed.is_empty());
    assert!(!engine.is_accepting());

    assert!(engine
        .award_experience(actor, "woodcutting", 10.0, Some(1.0))
        .await
        .is_none());
    assert!(!engine.dispatch(actor, "BREAK", "OAK_LOG", None).await.matched());
    assert_eq!(
        engine.admin().add_experience(actor, "woodcutting", 1.0).await,
        Err(AdminError::ShuttingDown)
    );
    assert_eq!(engine.shutdown().await.unwrap().saved, 0);

    let reopened = FlatFileBackend::open(temp_dir.path()).await.unwrap();
    let stored = reopened.load(actor).await.unwrap().unwrap();
    let woodcutting = stored.get("woodcutting").unwrap();
    assert_eq!(woodcutting.level, 2);
    assert!((woodcutting.experience - 20.0).abs() < 1e-9);
}
