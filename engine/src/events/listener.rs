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

//! Listener registration and dispatch

use super::types::{AbilityUnlockedEvent, AbilityUseEvent, SkillLevelUpEvent};
use std::sync::{Arc, PoisonError, RwLock};

/// Receiver of progression notifications, implemented by the game adapter.
///
/// Callbacks run synchronously on the caller's task and must not block.
pub trait ProgressionListener: Send + Sync {
    fn on_level_up(&self, _event: &mut SkillLevelUpEvent) {}

    fn on_ability_unlocked(&self, _event: &AbilityUnlockedEvent) {}

    fn on_ability_use(&self, _event: &mut AbilityUseEvent) {}
}

/// Shared, ordered set of listeners
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Arc<RwLock<Vec<Arc<dyn ProgressionListener>>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe(&self, listener: Arc<dyn ProgressionListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Listeners are cloned out so callbacks never run under the lock.
    fn current(&self) -> Vec<Arc<dyn ProgressionListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notify every listener; returns whether the level-up survived
    pub fn level_up(&self, event: &mut SkillLevelUpEvent) -> bool {
        for listener in self.current() {
            listener.on_level_up(event);
        }
        !event.is_cancelled()
    }

    pub fn ability_unlocked(&self, event: &AbilityUnlockedEvent) {
        for listener in self.current() {
            listener.on_ability_unlocked(event);
        }
    }

    /// Notify every listener; returns whether the activation survived
    pub fn ability_use(&self, event: &mut AbilityUseEvent) -> bool {
        for listener in self.current() {
            listener.on_ability_use(event);
        }
        !event.is_cancelled()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}

/// Listener that writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ProgressionListener for TracingListener {
    fn on_level_up(&self, event: &mut SkillLevelUpEvent) {
        tracing::info!(
            "Actor {} advanced {} from level {} to {}",
            event.actor_id,
            event.skill,
            event.old_level,
            event.new_level
        );
    }

    fn on_ability_unlocked(&self, event: &AbilityUnlockedEvent) {
        tracing::info!(
            "Actor {} unlocked {} ({} level {})",
            event.actor_id,
            event.ability,
            event.skill,
            event.unlock_level
        );
    }

    fn on_ability_use(&self, event: &mut AbilityUseEvent) {
        tracing::debug!(
            "Actor {} used {} at level {}",
            event.actor_id,
            event.ability,
            event.level
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillforge_common::ActorId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        level_ups: AtomicUsize,
        veto: bool,
    }

    impl ProgressionListener for Counting {
        fn on_level_up(&self, event: &mut SkillLevelUpEvent) {
            self.level_ups.fetch_add(1, Ordering::SeqCst);
            if self.veto {
                event.cancel();
            }
        }

        fn on_ability_use(&self, event: &mut AbilityUseEvent) {
            if self.veto {
                event.cancel();
            }
        }
    }

    #[test]
    fn test_all_listeners_are_called() {
        let listeners = Listeners::new();
        let first = Arc::new(Counting {
            level_ups: AtomicUsize::new(0),
            veto: false,
        });
        let second = Arc::new(Counting {
            level_ups: AtomicUsize::new(0),
            veto: false,
        });
        listeners.subscribe(first.clone());
        listeners.subscribe(second.clone());
        listeners.subscribe(Arc::new(TracingListener));

        let mut event = SkillLevelUpEvent::new(ActorId::new(), "mining", 1, 2);
        assert!(listeners.level_up(&mut event));
        assert_eq!(first.level_ups.load(Ordering::SeqCst), 1);
        assert_eq!(second.level_ups.load(Ordering::SeqCst), 1);
        assert_eq!(listeners.len(), 3);
    }

    #[test]
    fn test_veto_is_reported() {
        let listeners = Listeners::new();
        listeners.subscribe(Arc::new(Counting {
            level_ups: AtomicUsize::new(0),
            veto: true,
        }));

        let mut level_up = SkillLevelUpEvent::new(ActorId::new(), "mining", 1, 2);
        assert!(!listeners.level_up(&mut level_up));

        let mut use_event = AbilityUseEvent::new(ActorId::new(), "roll", 10, Duration::ZERO);
        assert!(!listeners.ability_use(&mut use_event));
    }

    #[test]
    fn test_empty_set_accepts() {
        let listeners = Listeners::new();
        assert!(listeners.is_empty());
        let mut event = AbilityUseEvent::new(ActorId::new(), "roll", 10, Duration::ZERO);
        assert!(listeners.ability_use(&mut event));
    }
}
