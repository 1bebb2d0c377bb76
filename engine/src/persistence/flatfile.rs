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

//! One YAML document per actor
//!
//! ```yaml
//! data:
//!   levels:
//!     mining: 12
//!   experience:
//!     mining: 37.5
//! ```

use crate::error::StorageResult;
use crate::persistence::PersistenceBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillforge_common::{ActorId, ProgressionSnapshot, SkillProgress, skill_key};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ActorDocument {
    #[serde(default)]
    data: ActorData,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ActorData {
    #[serde(default)]
    levels: BTreeMap<String, u32>,
    #[serde(default)]
    experience: BTreeMap<String, f64>,
}

impl ActorDocument {
    fn from_snapshot(snapshot: &ProgressionSnapshot) -> Self {
        let mut data = ActorData::default();
        for (skill, progress) in &snapshot.skills {
            data.levels.insert(skill.clone(), progress.level);
            data.experience.insert(skill.clone(), progress.experience);
        }
        Self { data }
    }

    fn into_snapshot(self, actor: ActorId) -> ProgressionSnapshot {
        let experience: BTreeMap<String, f64> = self
            .data
            .experience
            .into_iter()
            .map(|(skill, exp)| (skill_key(&skill), exp))
            .collect();

        let mut snapshot = ProgressionSnapshot::new(actor);
        for (skill, exp) in &experience {
            snapshot.insert(skill, SkillProgress::new(0, *exp));
        }
        for (skill, level) in self.data.levels {
            let key = skill_key(&skill);
            let exp = experience.get(&key).copied().unwrap_or(0.0);
            snapshot.insert(&key, SkillProgress::new(level, exp));
        }
        snapshot
    }
}

/// Flat-file backend storing `<actor>.yml` files in one directory
#[derive(Debug, Clone)]
pub struct FlatFileBackend {
    directory: PathBuf,
}

impl FlatFileBackend {
    /// Open (and create if needed) the data directory
    pub async fn open(directory: impl AsRef<Path>) -> StorageResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, actor: ActorId) -> PathBuf {
        self.directory.join(format!("{}.yml", actor))
    }
}

#[async_trait]
impl PersistenceBackend for FlatFileBackend {
    fn name(&self) -> &'static str {
        "yaml"
    }

    async fn load(&self, actor: ActorId) -> StorageResult<Option<ProgressionSnapshot>> {
        let text = match tokio::fs::read_to_string(self.path_for(actor)).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        let document: ActorDocument = serde_yaml::from_str(&text)?;
        Ok(Some(document.into_snapshot(actor)))
    }

    async fn save(&self, snapshot: &ProgressionSnapshot) -> StorageResult<()> {
        let path = self.path_for(snapshot.actor_id);
        let temp = path.with_extension("yml.tmp");
        let text = serde_yaml::to_string(&ActorDocument::from_snapshot(snapshot))?;

        tokio::fs::write(&temp, text).await?;
        tokio::fs::rename(&temp, &path).await?;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
