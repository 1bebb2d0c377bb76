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

//! Level-tiered reward tables
//!
//! A skill may carry a table of tiers, each covering an inclusive level range and listing
//! rewards with a percent chance. The first tier containing the actor's level is used; its
//! entries are rolled in order and the first success wins.

use rand::Rng;

/// One possible reward
#[derive(Debug, Clone, PartialEq)]
pub struct DropEntry {
    pub material: String,
    /// Display name for named items; `None` for plain materials
    pub name: Option<String>,
    /// Percent chance before the bonus multiplier
    pub chance: f64,
    pub lore: Vec<String>,
}

impl DropEntry {
    pub fn material(material: impl Into<String>, chance: f64) -> Self {
        Self {
            material: material.into(),
            name: None,
            chance,
            lore: Vec::new(),
        }
    }

    pub fn named(material: impl Into<String>, name: impl Into<String>, chance: f64) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::material(material, chance)
        }
    }
}

/// Rewards available within an inclusive level range
#[derive(Debug, Clone, PartialEq)]
pub struct DropTier {
    name: String,
    min_level: u32,
    max_level: u32,
    entries: Vec<DropEntry>,
}

impl DropTier {
    pub fn new(name: impl Into<String>, min_level: u32, max_level: u32) -> Self {
        Self {
            name: name.into(),
            min_level,
            max_level,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: DropEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, level: u32) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }

    pub fn entries(&self) -> &[DropEntry] {
        &self.entries
    }
}

/// Ordered tiers plus the ability whose effect raises every chance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropTable {
    tiers: Vec<DropTier>,
    bonus_ability: Option<String>,
}

impl DropTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, tier: DropTier) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Ability whose level effect is added to the chance multiplier once unlocked
    pub fn with_bonus_ability(mut self, ability: impl Into<String>) -> Self {
        self.bonus_ability = Some(ability.into().to_lowercase());
        self
    }

    pub fn bonus_ability(&self) -> Option<&str> {
        self.bonus_ability.as_deref()
    }

    pub fn tiers(&self) -> &[DropTier] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// First tier whose range contains `level`
    pub fn tier_for_level(&self, level: u32) -> Option<&DropTier> {
        self.tiers.iter().find(|tier| tier.contains(level))
    }

    /// Roll the tier for `level`, every chance scaled by `multiplier`
    pub fn roll<R: Rng>(
        &self,
        level: u32,
        multiplier: f64,
        rng: &mut R,
    ) -> Option<&DropEntry> {
        let tier = self.tier_for_level(level)?;
        tier.entries
            .iter()
            .find(|entry| rng.random::<f64>() * 100.0 < entry.chance * multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn table() -> DropTable {
        DropTable::new()
            .with_bonus_ability("TreasureHunter")
            .with_tier(
                DropTier::new("novice", 1, 24)
                    .with_entry(DropEntry::material("COD", 40.0))
                    .with_entry(DropEntry::material("SALMON", 20.0)),
            )
            .with_tier(
                DropTier::new("expert", 25, 100)
                    .with_entry(DropEntry::named("CHEST", "Sunken Chest", 100.0)),
            )
    }

    #[test]
    fn test_tier_selection_by_level() {
        let table = table();
        assert!(table.tier_for_level(0).is_none());
        assert_eq!(table.tier_for_level(1).unwrap().name(), "novice");
        assert_eq!(table.tier_for_level(24).unwrap().name(), "novice");
        assert_eq!(table.tier_for_level(25).unwrap().name(), "expert");
        assert!(table.tier_for_level(101).is_none());
        assert_eq!(table.bonus_ability(), Some("treasurehunter"));
    }

    #[test]
    fn test_overlapping_tiers_use_the_first() {
        let table = DropTable::new()
            .with_tier(DropTier::new("wide", 1, 100))
            .with_tier(DropTier::new("narrow", 10, 20));
        assert_eq!(table.tier_for_level(15).unwrap().name(), "wide");
    }

    #[test]
    fn test_roll_respects_chances() {
        let table = table();
        let mut rng = StdRng::seed_from_u64(3);

        let chest = table.roll(50, 1.0, &mut rng).unwrap();
        assert_eq!(chest.name.as_deref(), Some("Sunken Chest"));
        assert!(table.roll(0, 1.0, &mut rng).is_none());
        for _ in 0..100 {
            assert!(table.roll(10, 0.0, &mut rng).is_none());
        }

        let mut hits = 0;
        for _ in 0..1000 {
            if table.roll(10, 1.0, &mut rng).is_some() {
                hits += 1;
            }
        }
        // 40% then 20% of the rest
        assert!((420..=620).contains(&hits), "hits = {hits}");
    }
}
