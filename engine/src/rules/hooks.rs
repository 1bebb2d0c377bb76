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

//! Game-side hooks used by the trigger rule engine

use crate::ability::Ability;
use crate::skill::DropTable;
use skillforge_common::ActorId;
use std::sync::Arc;

/// Everything an effect callback needs to know about an activation
#[derive(Debug, Clone)]
pub struct EffectContext {
    pub actor: ActorId,
    pub skill: String,
    pub ability: Arc<Ability>,
    pub level: u32,
    pub effect: f64,
    pub trigger: String,
    pub material: String,
    /// The skill's tiered reward table, if it has one
    pub drops: Option<Arc<DropTable>>,
}

/// Applies ability effects in the game. Callbacks must not block.
pub trait AbilityEffects: Send + Sync {
    /// A passive ability won its roll, e.g. grant a duplicate drop
    fn apply_passive(&self, _ctx: &EffectContext) {}

    fn apply_active(&self, _ctx: &EffectContext) {}

    /// An area ability fired; `nearby` excludes the activating actor
    fn apply_area(&self, _ctx: &EffectContext, _nearby: &[ActorId]) {}

    /// The configured effect duration of an active ability elapsed
    fn effect_ended(&self, _ctx: &EffectContext) {}
}

/// Read-only view of the game world
pub trait ActorWorld: Send + Sync {
    /// Whether the actor is performing the activation gesture (e.g. sneaking)
    fn is_activating(&self, actor: ActorId) -> bool;

    /// Actors within `radius` of `actor`
    fn nearby_actors(&self, actor: ActorId, radius: f64) -> Vec<ActorId>;
}

/// Effects sink that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffects;

impl AbilityEffects for NoEffects {}

/// World in which nobody activates abilities and nobody is nearby
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyWorld;

impl ActorWorld for EmptyWorld {
    fn is_activating(&self, _actor: ActorId) -> bool {
        false
    }

    fn nearby_actors(&self, _actor: ActorId, _radius: f64) -> Vec<ActorId> {
        Vec::new()
    }
}
