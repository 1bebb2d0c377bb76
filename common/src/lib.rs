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

//! Skillforge Common Types
//!
//! This crate defines the engine-agnostic types shared between the progression engine and the
//! adapters that sit around it (game event adapters, admin tooling, stat displays):
//! - Actor identity ([`ActorId`])
//! - Per-skill progress and whole-actor snapshots ([`SkillProgress`], [`ProgressionSnapshot`])
//! - Display helpers such as [`SkillRank`] and [`format_experience`]

pub mod actor;
pub mod progress;

pub use actor::ActorId;
pub use progress::{ProgressionSnapshot, SkillProgress, SkillRank, format_experience, skill_key};
