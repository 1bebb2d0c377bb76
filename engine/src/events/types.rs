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

//! Progression notifications
//!
//! Level-up and ability-use notifications carry a `cancelled` flag that listeners may set.
//! Cancelling suppresses only the side effect gated by that notification (unlock messages,
//! cooldown). Experience and level changes have already been applied when listeners run.

use skillforge_common::ActorId;
use std::time::Duration;

/// An actor gained one or more levels in a skill
#[derive(Debug, Clone, PartialEq)]
pub struct SkillLevelUpEvent {
    pub actor_id: ActorId,
    pub skill: String,
    pub old_level: u32,
    pub new_level: u32,
    cancelled: bool,
}

impl SkillLevelUpEvent {
    pub fn new(actor_id: ActorId, skill: impl Into<String>, old_level: u32, new_level: u32) -> Self {
        Self {
            actor_id,
            skill: skill.into(),
            old_level,
            new_level,
            cancelled: false,
        }
    }

    /// Suppress unlock notifications for this level-up
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// An ability became available because its unlock level was reached
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityUnlockedEvent {
    pub actor_id: ActorId,
    pub skill: String,
    pub ability: String,
    pub unlock_level: u32,
}

/// An ability is about to be activated
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityUseEvent {
    pub actor_id: ActorId,
    pub ability: String,
    pub level: u32,
    pub cooldown: Duration,
    cancelled: bool,
}

impl AbilityUseEvent {
    pub fn new(actor_id: ActorId, ability: impl Into<String>, level: u32, cooldown: Duration) -> Self {
        Self {
            actor_id,
            ability: ability.into(),
            level,
            cooldown,
            cancelled: false,
        }
    }

    /// Veto the activation; no cooldown is recorded
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
