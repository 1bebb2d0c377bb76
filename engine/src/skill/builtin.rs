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

//! Built-in skill catalogue
//!
//! Seven skills whose abilities are plain data. Breakpoints sit at the unlock level and every
//! ten levels after it.

use crate::ability::{Ability, AbilityKind, CustomAbilityInfo, EffectDisplay};
use crate::skill::{DEFAULT_BASE_EXPERIENCE, SkillDefinition};
use std::time::Duration;

pub const ACROBATICS: &str = "acrobatics";
pub const ARCHERY: &str = "archery";
pub const FARMING: &str = "farming";
pub const FENCING: &str = "fencing";
pub const FISHING: &str = "fishing";
pub const MINING: &str = "mining";
pub const WOODCUTTING: &str = "woodcutting";

/// Names of every built-in skill
pub const BUILTIN_SKILLS: [&str; 7] = [
    ACROBATICS,
    ARCHERY,
    FARMING,
    FENCING,
    FISHING,
    MINING,
    WOODCUTTING,
];

const MINING_SOURCES: &[(&str, f64)] = &[
    ("COAL_ORE", 5.0),
    ("DEEPSLATE_COAL_ORE", 5.5),
    ("IRON_ORE", 7.0),
    ("DEEPSLATE_IRON_ORE", 7.5),
    ("COPPER_ORE", 6.0),
    ("DEEPSLATE_COPPER_ORE", 6.5),
    ("GOLD_ORE", 10.0),
    ("DEEPSLATE_GOLD_ORE", 10.5),
    ("REDSTONE_ORE", 8.0),
    ("DEEPSLATE_REDSTONE_ORE", 8.5),
    ("LAPIS_ORE", 10.0),
    ("DEEPSLATE_LAPIS_ORE", 10.5),
    ("DIAMOND_ORE", 15.0),
    ("DEEPSLATE_DIAMOND_ORE", 15.5),
    ("EMERALD_ORE", 20.0),
    ("DEEPSLATE_EMERALD_ORE", 20.5),
    ("NETHER_GOLD_ORE", 8.0),
    ("NETHER_QUARTZ_ORE", 6.0),
    ("ANCIENT_DEBRIS", 25.0),
];

const WOODCUTTING_SOURCES: &[(&str, f64)] = &[
    ("OAK_LOG", 5.0),
    ("SPRUCE_LOG", 5.0),
    ("BIRCH_LOG", 5.0),
    ("JUNGLE_LOG", 7.0),
    ("ACACIA_LOG", 6.0),
    ("DARK_OAK_LOG", 6.0),
    ("CHERRY_LOG", 7.0),
    ("MANGROVE_LOG", 7.0),
    ("CRIMSON_STEM", 8.0),
    ("WARPED_STEM", 8.0),
    ("BAMBOO", 2.0),
];

const FARMING_SOURCES: &[(&str, f64)] = &[
    ("WHEAT", 7.5),
    ("POTATOES", 7.0),
    ("CARROTS", 7.0),
    ("BEETROOTS", 8.0),
    ("NETHER_WART", 10.0),
    ("COCOA", 8.0),
    ("SWEET_BERRY_BUSH", 6.0),
    ("MELON", 5.0),
    ("PUMPKIN", 5.0),
    ("SUGAR_CANE", 3.5),
    ("BAMBOO", 3.0),
    ("CACTUS", 4.0),
    ("KELP", 3.0),
    ("SEA_PICKLE", 5.0),
];

/// Effect table with one value per ten levels starting at `unlock`
fn breakpoints(unlock: u32, values: &[f64]) -> Vec<(u32, f64)> {
    values
        .iter()
        .zip((unlock..).step_by(10))
        .map(|(value, level)| (level, *value))
        .collect()
}

fn chance(name: &str, unlock: u32, description: &str, values: &[f64]) -> Ability {
    Ability::new(name, unlock, description)
        .with_effects(breakpoints(unlock, values))
        .with_display(EffectDisplay::Chance)
}

/// An ability the actor activates with the gesture, on a cooldown
fn activated(name: &str, unlock: u32, description: &str, cooldown_secs: u64, display: EffectDisplay) -> Ability {
    let mut info = CustomAbilityInfo::new(AbilityKind::Active);
    info.cooldown = Duration::from_secs(cooldown_secs);
    Ability::new(name, unlock, description)
        .with_effects([(unlock, 1.0)])
        .with_display(display)
        .with_info(info)
}

fn with_sources(mut skill: SkillDefinition, sources: &[(&str, f64)]) -> SkillDefinition {
    for (material, experience) in sources {
        skill.set_source(material, *experience);
    }
    skill
}

fn acrobatics() -> SkillDefinition {
    SkillDefinition::new(ACROBATICS, "Acrobatics")
        .with_description("Survive falls and land gracefully")
        .with_base_experience(Some(DEFAULT_BASE_EXPERIENCE))
        .with_ability(chance(
            "roll",
            10,
            "chance to reduce fall damage by 50%",
            &[0.10, 0.20, 0.30, 0.40, 0.50, 0.60],
        ))
        .with_ability(
            Ability::new("safefall", 30, "chance to take no fall damage")
                .with_display(EffectDisplay::Chance),
        )
        .with_ability(
            Ability::new("gracefullanding", 50, "experience from fall damage")
                .with_effects(breakpoints(50, &[1.25, 1.50, 1.75, 2.00, 2.25, 2.50]))
                .with_display(EffectDisplay::Multiplier),
        )
}

fn archery() -> SkillDefinition {
    SkillDefinition::new(ARCHERY, "Archery")
        .with_description("Hit targets with bows and crossbows")
        .with_base_experience(Some(DEFAULT_BASE_EXPERIENCE))
        .with_ability(chance(
            "bullseye",
            10,
            "chance for 50% extra damage",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
        ))
        .with_ability(chance(
            "dazingarrow",
            30,
            "chance to apply confusion",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
        ))
        .with_ability(activated(
            "multishot",
            50,
            "Fire {} arrows at once (30s cooldown)",
            30,
            EffectDisplay::Count {
                base: 2,
                divisor: 25,
                cap: 6,
            },
        ))
}

fn farming() -> SkillDefinition {
    let skill = SkillDefinition::new(FARMING, "Farming")
        .with_description("Harvest and replant crops")
        .with_base_experience(Some(DEFAULT_BASE_EXPERIENCE))
        .with_ability(chance(
            "greenthumb",
            10,
            "chance to auto-replant crops",
            &[0.10, 0.20, 0.30, 0.40, 0.50, 0.60],
        ))
        .with_ability(chance(
            "bountifulharvest",
            30,
            "chance for bonus crop drops",
            &[0.10, 0.20, 0.30, 0.40, 0.50, 0.60],
        ))
        .with_ability(chance(
            "naturesblessing",
            50,
            "chance for instant crop growth",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
        ));
    with_sources(skill, FARMING_SOURCES)
}

fn fencing() -> SkillDefinition {
    SkillDefinition::new(FENCING, "Fencing")
        .with_description("Fight up close with swords")
        .with_base_experience(Some(DEFAULT_BASE_EXPERIENCE))
        .with_ability(chance(
            "bleed",
            10,
            "chance to cause bleeding",
            &[0.10, 0.15, 0.20, 0.25, 0.30, 0.35],
        ))
        .with_ability(chance(
            "parry",
            30,
            "chance to reduce incoming damage",
            &[0.30, 0.40, 0.50, 0.60, 0.70, 0.80],
        ))
        .with_ability(activated(
            "counterattack",
            50,
            "Deal {} bonus damage to attackers (30s cooldown)",
            30,
            EffectDisplay::Linear {
                base: 4.0,
                per_level: 0.1,
            },
        ))
}

fn fishing() -> SkillDefinition {
    SkillDefinition::new(FISHING, "Fishing")
        .with_description("Catch fish and treasure")
        .with_base_experience(Some(DEFAULT_BASE_EXPERIENCE))
        .with_ability(chance(
            "doubledrop",
            10,
            "chance for double drops",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
        ))
        .with_ability(
            Ability::new("experiencedfisher", 20, "fishing experience")
                .with_effects(breakpoints(20, &[0.10, 0.20, 0.30, 0.40, 0.50, 0.75]))
                .with_display(EffectDisplay::Bonus),
        )
        .with_ability(
            Ability::new("treasurehunter", 30, "treasure chance")
                .with_effects(breakpoints(30, &[0.10, 0.20, 0.30, 0.50, 0.75, 1.00]))
                .with_display(EffectDisplay::Bonus),
        )
        .with_ability(chance(
            "masterangler",
            50,
            "chance for instant catches",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.33],
        ))
}

fn mining() -> SkillDefinition {
    let skill = SkillDefinition::new(MINING, "Mining")
        .with_description("Break ores for experience")
        .with_ability(chance(
            "doubleore",
            10,
            "chance for double ore drops",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
        ))
        .with_ability(activated(
            "superbreaker",
            30,
            "Haste {} for 30 seconds (3m cooldown)",
            180,
            EffectDisplay::Count {
                base: 1,
                divisor: 20,
                cap: 3,
            },
        ))
        .with_ability(activated(
            "veinminer",
            50,
            "Mine up to {} connected ores (2m cooldown)",
            120,
            EffectDisplay::Count {
                base: 5,
                divisor: 10,
                cap: 15,
            },
        ));
    with_sources(skill, MINING_SOURCES)
}

fn woodcutting() -> SkillDefinition {
    let skill = SkillDefinition::new(WOODCUTTING, "Woodcutting")
        .with_description("Fell trees for logs")
        .with_base_experience(Some(DEFAULT_BASE_EXPERIENCE))
        .with_ability(chance(
            "lumberjack",
            10,
            "chance for double log drops",
            &[0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
        ))
        .with_ability(activated(
            "treefeller",
            30,
            "Cut up to {} connected logs (60s cooldown)",
            60,
            EffectDisplay::Count {
                base: 10,
                divisor: 5,
                cap: 30,
            },
        ))
        .with_ability(
            Ability::new("harvestmaster", 50, "chance for saplings from leaves")
                .with_effects(breakpoints(50, &[1.25, 1.50, 1.75, 2.00, 2.25, 2.50]))
                .with_display(EffectDisplay::Multiplier),
        );
    with_sources(skill, WOODCUTTING_SOURCES)
}

/// Fresh definitions of every built-in skill, in name order
pub fn builtin_skills() -> Vec<SkillDefinition> {
    vec![
        acrobatics(),
        archery(),
        farming(),
        fencing(),
        fishing(),
        mining(),
        woodcutting(),
    ]
}
