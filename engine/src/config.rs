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

//! Service configuration
//!
//! The YAML document is deserialized into the plain structures below and then converted into
//! the data the engine runs on: an [`ExperienceCurve`], [`EngineSettings`], a [`BackendSpec`]
//! and a [`SkillRegistry`]. Malformed entries are skipped with a warning.

use crate::ability::{Ability, AbilityKind, CustomAbilityInfo};
use crate::engine::EngineSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::persistence::BackendSpec;
use crate::persistence::relational::DEFAULT_TABLE_PREFIX;
use crate::progression::{DEFAULT_AWARD_FORMULA, DEFAULT_MAX_LEVEL, ExperienceCurve, Formula};
use crate::rules::TriggerRule;
use crate::skill::builtin::builtin_skills;
use crate::skill::registry::SkillRegistry;
use crate::skill::{DEFAULT_BASE_EXPERIENCE, DropEntry, DropTable, DropTier, SkillDefinition};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use skillforge_common::skill_key;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Spacing of the levels produced by a `"start-end"` breakpoint range
const LEVEL_RANGE_STEP: usize = 10;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "engine/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "engine/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub settings: SettingsConfig,
    pub experience: ExperienceConfig,
    pub storage: StorageConfig,
    pub skills: SkillsConfig,
    pub custom_skills: Vec<CustomSkillConfig>,
}

impl Configuration {
    pub fn load(path: &str) -> ConfigResult<Configuration> {
        let conf = serde_yaml::from_reader(std::fs::File::open(path)?)?;
        Ok(conf)
    }

    /// Step costs and award formula. An unparsable formula is reported here, once, and every
    /// award then uses `base * multiplier`.
    pub fn curve(&self) -> ExperienceCurve {
        let curve = ExperienceCurve::new(self.experience.step_base, self.experience.step_growth)
            .with_max_level(self.settings.max_level);
        match Formula::parse(&self.experience.formula) {
            Ok(formula) => curve.with_award_formula(Some(formula)),
            Err(source) => {
                let error = ConfigError::InvalidFormula {
                    formula: self.experience.formula.clone(),
                    source,
                };
                tracing::warn!("{}; awards use base * multiplier", error);
                curve.with_award_formula(None)
            }
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let settings = &self.settings;
        let exp_multiplier = if settings.exp_multiplier.is_finite() && settings.exp_multiplier >= 0.0
        {
            settings.exp_multiplier
        } else {
            tracing::warn!(
                "Ignoring invalid experience multiplier {}, using 1.0",
                settings.exp_multiplier
            );
            1.0
        };
        EngineSettings {
            save_interval: Duration::from_secs(settings.save_interval_secs),
            exp_multiplier,
            max_level: settings.max_level,
            level_up_messages: settings.level_up_messages,
            ability_messages: settings.ability_messages,
            departure_save_delay: Duration::from_millis(settings.departure_save_delay_ms),
            random_seed: None,
        }
    }

    pub fn backend_spec(&self) -> ConfigResult<BackendSpec> {
        self.storage.backend_spec()
    }

    /// Built-in skills filtered and adjusted by the `skills` section, followed by every enabled
    /// custom skill.
    pub fn skill_registry(&self) -> SkillRegistry {
        let mut registry = SkillRegistry::new();
        for mut skill in builtin_skills() {
            if !self.skills.is_enabled(skill.name()) {
                tracing::info!("Skill {} disabled by configuration", skill.name());
                continue;
            }
            self.skills.apply(&mut skill);
            registry.register(skill);
        }
        for custom in &self.custom_skills {
            if !custom.enabled {
                tracing::info!("Custom skill {} disabled by configuration", custom.name);
                continue;
            }
            match custom.build() {
                Some(skill) => {
                    tracing::info!("Loaded custom skill {}", skill.name());
                    registry.register(skill);
                }
                None => tracing::warn!("Skipping custom skill with an empty name"),
            }
        }
        registry
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Seconds between automatic flushes; 0 disables them
    pub save_interval_secs: u64,
    pub exp_multiplier: f64,
    pub max_level: u32,
    pub level_up_messages: bool,
    pub ability_messages: bool,
    pub departure_save_delay_ms: u64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: 300,
            exp_multiplier: 1.0,
            max_level: DEFAULT_MAX_LEVEL,
            level_up_messages: true,
            ability_messages: true,
            departure_save_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    pub formula: String,
    pub step_base: f64,
    pub step_growth: f64,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            formula: DEFAULT_AWARD_FORMULA.to_string(),
            step_base: 100.0,
            step_growth: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Yaml,
    Sqlite,
    Postgres,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: StorageKind,
    /// Root of the flat-file store
    pub directory: String,
    pub sqlite: SqliteConfig,
    pub postgres: PostgresConfig,
    pub table_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Yaml,
            directory: "data/players".to_string(),
            sqlite: SqliteConfig::default(),
            postgres: PostgresConfig::default(),
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn backend_spec(&self) -> ConfigResult<BackendSpec> {
        if !self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidStorage(format!(
                "table prefix {:?} may only contain letters, digits and underscores",
                self.table_prefix
            )));
        }
        match self.kind {
            StorageKind::Yaml => {
                if self.directory.trim().is_empty() {
                    return Err(ConfigError::InvalidStorage(
                        "storage directory is empty".to_string(),
                    ));
                }
                Ok(BackendSpec::FlatFile {
                    directory: PathBuf::from(&self.directory),
                })
            }
            StorageKind::Sqlite => {
                if self.sqlite.file.trim().is_empty() {
                    return Err(ConfigError::InvalidStorage(
                        "sqlite file is empty".to_string(),
                    ));
                }
                Ok(BackendSpec::Sqlite {
                    file: PathBuf::from(&self.sqlite.file),
                    table_prefix: self.table_prefix.clone(),
                })
            }
            StorageKind::Postgres => {
                let url = self.postgres.url.as_str();
                if url.trim().is_empty() {
                    return Err(ConfigError::InvalidStorage(
                        "postgres url is empty".to_string(),
                    ));
                }
                let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
                Ok(BackendSpec::Postgres {
                    url: url.to_string(),
                    username: non_empty(self.postgres.username.as_str()),
                    password: non_empty(self.postgres.password.as_str()),
                    table_prefix: self.table_prefix.clone(),
                })
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub file: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            file: "data/skills.db".to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub url: EnvField<String>,
    pub username: EnvField<String>,
    pub password: EnvField<String>,
}

/// Adjustments to the built-in skills
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub enabled: BTreeMap<String, bool>,
    pub display_names: BTreeMap<String, String>,
    /// skill -> ability -> override
    pub abilities: BTreeMap<String, BTreeMap<String, AbilityOverride>>,
    /// skill -> material -> base experience
    pub sources: BTreeMap<String, BTreeMap<String, f64>>,
    /// skill -> tiered reward table
    pub drops: BTreeMap<String, DropTableConfig>,
}

impl SkillsConfig {
    pub fn is_enabled(&self, skill: &str) -> bool {
        self.enabled
            .iter()
            .find(|(name, _)| skill_key(name) == skill)
            .is_none_or(|(_, enabled)| *enabled)
    }

    fn entries<'a, V>(
        map: &'a BTreeMap<String, V>,
        skill: &'a str,
    ) -> impl Iterator<Item = &'a V> + 'a {
        map.iter()
            .filter(move |(name, _)| skill_key(name) == skill)
            .map(|(_, value)| value)
    }

    /// Apply display name, ability and source overrides to one built-in skill
    pub fn apply(&self, skill: &mut SkillDefinition) {
        let name = skill.name().to_string();
        if let Some(display) = Self::entries(&self.display_names, &name).next() {
            skill.set_display_name(display.clone());
        }
        for overrides in Self::entries(&self.abilities, &name) {
            for (ability_name, config) in overrides {
                let Some(existing) = skill.ability(ability_name).cloned() else {
                    tracing::warn!("Skill {} has no ability {}, skipping override", name, ability_name);
                    continue;
                };
                if !config.enabled {
                    tracing::info!("Ability {}.{} disabled by configuration", name, existing.name());
                    skill.remove_ability(existing.name());
                    continue;
                }
                skill.add_ability(config.apply((*existing).clone()));
            }
        }
        for sources in Self::entries(&self.sources, &name) {
            for (material, experience) in sources {
                match parse_material(material) {
                    Ok(material) => skill.set_source(&material, *experience),
                    Err(error) => tracing::warn!("Skill {}: {}, skipping source", name, error),
                }
            }
        }
        if let Some(drops) = Self::entries(&self.drops, &name).next() {
            skill.set_drop_table(drops.build(&name));
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityOverride {
    pub enabled: bool,
    pub unlock_level: Option<u32>,
    pub description: Option<String>,
    /// Breakpoint table replacing the built-in one when non-empty
    pub effects: BTreeMap<String, f64>,
}

impl Default for AbilityOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            unlock_level: None,
            description: None,
            effects: BTreeMap::new(),
        }
    }
}

impl AbilityOverride {
    fn apply(&self, mut ability: Ability) -> Ability {
        if let Some(unlock_level) = self.unlock_level {
            ability = ability.with_unlock_level(unlock_level);
        }
        if let Some(description) = &self.description {
            ability = ability.with_description(description.clone());
        }
        if !self.effects.is_empty() {
            ability = ability.with_effects(parse_breakpoints(&self.effects));
        }
        ability
    }
}

/// A skill defined entirely by configuration
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSkillConfig {
    pub name: String,
    pub enabled: bool,
    pub display_name: Option<String>,
    pub description: String,
    pub base_exp: f64,
    pub sources: BTreeMap<String, f64>,
    pub triggers: Vec<String>,
    pub trigger_materials: Vec<String>,
    /// Ability id -> definition, kept in document order
    pub abilities: serde_yaml::Mapping,
    pub drops: Option<DropTableConfig>,
}

impl Default for CustomSkillConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            display_name: None,
            description: String::new(),
            base_exp: DEFAULT_BASE_EXPERIENCE,
            sources: BTreeMap::new(),
            triggers: Vec::new(),
            trigger_materials: Vec::new(),
            abilities: serde_yaml::Mapping::new(),
            drops: None,
        }
    }
}

impl CustomSkillConfig {
    /// `None` when the skill has no usable name
    pub fn build(&self) -> Option<SkillDefinition> {
        let name = skill_key(&self.name);
        if name.is_empty() {
            return None;
        }
        let display_name = self.display_name.clone().unwrap_or_else(|| self.name.clone());
        if self.triggers.is_empty() {
            tracing::warn!("Custom skill {} has no triggers and will never be awarded", name);
        }
        let rule = if self.trigger_materials.is_empty() {
            TriggerRule::new(&self.triggers, Vec::<String>::new())
        } else {
            let materials = parse_materials(&self.trigger_materials, &name);
            if materials.is_empty() {
                tracing::warn!(
                    "Custom skill {} has no valid trigger materials and will never be awarded",
                    name
                );
            }
            TriggerRule::restricted_to(&self.triggers, materials)
        };
        let mut skill = SkillDefinition::new(&name, display_name)
            .with_description(self.description.clone())
            .with_base_experience(Some(self.base_exp))
            .with_trigger_rule(rule);
        for (material, experience) in &self.sources {
            match parse_material(material) {
                Ok(material) => skill.set_source(&material, *experience),
                Err(error) => tracing::warn!("Skill {}: {}, skipping source", name, error),
            }
        }
        for (key, value) in &self.abilities {
            let Some(id) = key.as_str() else {
                tracing::warn!("Skill {}: ability keys must be strings, skipping {:?}", name, key);
                continue;
            };
            let config: CustomAbilityConfig = match serde_yaml::from_value(value.clone()) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!("Skill {}: ability {} is malformed: {}", name, id, error);
                    continue;
                }
            };
            if !config.enabled {
                tracing::info!("Ability {}.{} disabled by configuration", name, id);
                continue;
            }
            skill.add_ability(config.build(id, &name));
        }
        if let Some(drops) = &self.drops {
            skill.set_drop_table(drops.build(&name));
        }
        Some(skill)
    }
}

/// Level-tiered reward table of one skill
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DropTableConfig {
    /// Ability whose effect raises every chance once unlocked
    pub bonus_ability: Option<String>,
    /// Tier name -> tier, kept in document order
    pub tiers: serde_yaml::Mapping,
}

impl DropTableConfig {
    /// Malformed tiers and entries are skipped with a warning
    pub fn build(&self, skill: &str) -> DropTable {
        let mut table = DropTable::new();
        if let Some(bonus) = &self.bonus_ability {
            table = table.with_bonus_ability(bonus.clone());
        }
        for (key, value) in &self.tiers {
            let Some(name) = key.as_str() else {
                tracing::warn!("Skill {}: drop tier keys must be strings, skipping {:?}", skill, key);
                continue;
            };
            let config: DropTierConfig = match serde_yaml::from_value(value.clone()) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!("Skill {}: drop tier {} is malformed: {}", skill, name, error);
                    continue;
                }
            };
            match config.build(name, skill) {
                Ok(tier) => table = table.with_tier(tier),
                Err(error) => tracing::warn!("Skill {}: drop tier {}: {}, skipping", skill, name, error),
            }
        }
        tracing::debug!("Skill {} has {} drop tier(s)", skill, table.tiers().len());
        table
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DropTierConfig {
    pub level_range: String,
    /// Material -> percent chance, kept in document order
    pub drops: serde_yaml::Mapping,
    /// Item id -> named item, kept in document order
    pub custom_items: serde_yaml::Mapping,
}

impl Default for DropTierConfig {
    fn default() -> Self {
        Self {
            level_range: "1-100".to_string(),
            drops: serde_yaml::Mapping::new(),
            custom_items: serde_yaml::Mapping::new(),
        }
    }
}

impl DropTierConfig {
    fn build(&self, name: &str, skill: &str) -> ConfigResult<DropTier> {
        let (min_level, max_level) = parse_level_bounds(&self.level_range)?;
        let mut tier = DropTier::new(name, min_level, max_level);
        for (material, chance) in &self.drops {
            let (Some(material), Some(chance)) = (material.as_str(), chance.as_f64()) else {
                tracing::warn!("Skill {}: tier {}: skipping drop {:?}", skill, name, material);
                continue;
            };
            match parse_material(material) {
                Ok(material) => tier = tier.with_entry(DropEntry::material(material, chance)),
                Err(error) => tracing::warn!("Skill {}: tier {}: {}, skipping drop", skill, name, error),
            }
        }
        for (key, value) in &self.custom_items {
            let Some(id) = key.as_str() else {
                continue;
            };
            let item: CustomDropConfig = match serde_yaml::from_value(value.clone()) {
                Ok(item) => item,
                Err(error) => {
                    tracing::warn!("Skill {}: tier {}: item {} is malformed: {}", skill, name, id, error);
                    continue;
                }
            };
            match parse_material(&item.material) {
                Ok(material) => {
                    let display = item.name.clone().unwrap_or_else(|| id.to_string());
                    let mut entry = DropEntry::named(material, display, item.chance);
                    entry.lore = item.lore.clone();
                    tier = tier.with_entry(entry);
                }
                Err(error) => tracing::warn!("Skill {}: tier {}: {}, skipping item {}", skill, name, error, id),
            }
        }
        Ok(tier)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomDropConfig {
    pub material: String,
    /// Percent chance
    pub chance: f64,
    pub name: Option<String>,
    pub lore: Vec<String>,
}

impl Default for CustomDropConfig {
    fn default() -> Self {
        Self {
            material: "CHEST".to_string(),
            chance: 1.0,
            name: None,
            lore: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomAbilityConfig {
    pub enabled: bool,
    pub unlock_level: u32,
    /// Display name; the map key is the ability id
    pub name: Option<String>,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Seconds
    pub cooldown: u64,
    pub radius: f64,
    /// Seconds until the effect-end notification
    pub duration: u64,
    pub effects: BTreeMap<String, f64>,
    pub messages: HashMap<String, String>,
    pub parameters: HashMap<String, String>,
}

impl Default for CustomAbilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unlock_level: 1,
            name: None,
            description: String::new(),
            kind: "passive".to_string(),
            cooldown: 0,
            radius: 0.0,
            duration: 0,
            effects: BTreeMap::new(),
            messages: HashMap::new(),
            parameters: HashMap::new(),
        }
    }
}

impl CustomAbilityConfig {
    fn build(&self, id: &str, skill: &str) -> Ability {
        let kind = self.kind.parse::<AbilityKind>().unwrap_or_else(|_| {
            let error = ConfigError::InvalidAbilityType(self.kind.clone());
            tracing::warn!("Skill {}: ability {}: {}, using passive", skill, id, error);
            AbilityKind::Passive
        });
        let info = CustomAbilityInfo {
            display_name: self.name.clone(),
            kind,
            cooldown: Duration::from_secs(self.cooldown),
            area_radius: self.radius,
            effect_duration: Duration::from_secs(self.duration),
            messages: self.messages.clone(),
            parameters: self.parameters.clone(),
        };
        let mut ability = Ability::new(id.to_lowercase(), self.unlock_level, self.description.clone())
            .with_info(info);
        if !self.effects.is_empty() {
            ability = ability.with_effects(parse_breakpoints(&self.effects));
        }
        ability
    }
}

/// Normalize a material identifier: upper-cased, `A-Z`, `0-9` and `_` only
pub fn parse_material(raw: &str) -> ConfigResult<String> {
    let material = raw.trim().to_ascii_uppercase();
    if material.is_empty()
        || !material
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ConfigError::InvalidMaterial(raw.to_string()));
    }
    Ok(material)
}

fn parse_materials(raw: &[String], skill: &str) -> Vec<String> {
    raw.iter()
        .filter_map(|material| match parse_material(material) {
            Ok(material) => Some(material),
            Err(error) => {
                tracing::warn!("Skill {}: {}, skipping material filter", skill, error);
                None
            }
        })
        .collect()
}

/// Inclusive bounds of a level range: `"30"`, or `"1-100"`
pub fn parse_level_bounds(key: &str) -> ConfigResult<(u32, u32)> {
    let invalid = || ConfigError::InvalidLevelRange(key.to_string());
    let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());
    let (start, end) = match key.split_once('-') {
        None => {
            let level = parse(key)?;
            (level, level)
        }
        Some((start, end)) => (parse(start)?, parse(end)?),
    };
    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

/// Levels named by a breakpoint key: `"30"`, or `"30-60"` for every tenth level in between
pub fn parse_level_range(key: &str) -> ConfigResult<Vec<u32>> {
    let (start, end) = parse_level_bounds(key)?;
    Ok((start..=end).step_by(LEVEL_RANGE_STEP).collect())
}

/// Expand a breakpoint table, skipping malformed keys and non-finite values
pub fn parse_breakpoints(effects: &BTreeMap<String, f64>) -> Vec<(u32, f64)> {
    let mut table = Vec::new();
    for (key, value) in effects {
        if !value.is_finite() {
            tracing::warn!("Ignoring non-finite effect value at {}", key);
            continue;
        }
        match parse_level_range(key) {
            Ok(levels) => table.extend(levels.into_iter().map(|level| (level, *value))),
            Err(error) => tracing::warn!("{}, skipping breakpoint", error),
        }
    }
    table
}
