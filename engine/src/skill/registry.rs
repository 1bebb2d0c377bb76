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

//! Registry of skills by name

use crate::ability::Ability;
use crate::skill::SkillDefinition;
use skillforge_common::skill_key;
use std::collections::BTreeMap;
use std::sync::Arc;

/// All registered skills, keyed by lower-case name.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Arc<SkillDefinition>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill, replacing any skill with the same name
    pub fn register(&mut self, skill: SkillDefinition) -> Arc<SkillDefinition> {
        let skill = Arc::new(skill);
        if self
            .skills
            .insert(skill.name().to_string(), skill.clone())
            .is_some()
        {
            tracing::warn!("Skill {} registered twice, keeping the last definition", skill.name());
        }
        skill
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SkillDefinition>> {
        self.skills.get(&skill_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(&skill_key(name))
    }

    pub fn ability(&self, skill: &str, ability: &str) -> Option<&Arc<Ability>> {
        self.get(skill)?.ability(ability)
    }

    /// Skill names in order
    pub fn names(&self) -> Vec<String> {
        self.skills.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SkillDefinition>> {
        self.skills.values()
    }

    /// Skills driven by declarative trigger rules
    pub fn custom_skills(&self) -> Vec<Arc<SkillDefinition>> {
        self.skills
            .values()
            .filter(|skill| skill.is_custom())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
