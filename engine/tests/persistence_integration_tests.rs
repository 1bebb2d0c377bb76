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

//! Round trips through every backend, driven by configuration

use skillforge_common::{ActorId, ProgressionSnapshot, SkillProgress};
use skillforge_engine::config::Configuration;
use skillforge_engine::{
    BackendSpec, EngineHooks, PersistenceBackend, ProgressionEngine, open_backend,
};
use std::path::Path;

fn load_config(dir: &Path, yaml: &str) -> Configuration {
    let file_path = dir.join("config.yaml");
    std::fs::write(&file_path, yaml).unwrap();
    Configuration::load(file_path.to_str().unwrap()).unwrap()
}

fn specs(dir: &Path) -> Vec<BackendSpec> {
    vec![
        BackendSpec::FlatFile {
            directory: dir.join("players"),
        },
        BackendSpec::Sqlite {
            file: dir.join("skills.db"),
            table_prefix: "skillforge_".to_string(),
        },
    ]
}

#[tokio::test]
async fn test_backends_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    for spec in specs(temp_dir.path()) {
        let backend = open_backend(&spec).await.unwrap();
        let actor = ActorId::new();
        assert!(backend.load(actor).await.unwrap().is_none());

        let mut snapshot = ProgressionSnapshot::new(actor);
        snapshot.insert("mining", SkillProgress::new(12, 37.5));
        snapshot.insert("fishing", SkillProgress::new(0, 4.25));
        backend.save(&snapshot).await.unwrap();

        snapshot.insert("mining", SkillProgress::new(13, 0.5));
        backend.save(&snapshot).await.unwrap();
        backend.close().await.unwrap();

        let reopened = open_backend(&spec).await.unwrap();
        let loaded = reopened.load(actor).await.unwrap().unwrap();
        assert_eq!(loaded, snapshot, "backend {}", reopened.name());
        reopened.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_engine_state_survives_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    for spec in specs(temp_dir.path()) {
        let actor = ActorId::new();
        let config = Configuration::default();

        let engine = ProgressionEngine::start(
            config.engine_settings(),
            config.skill_registry(),
            config.curve(),
            open_backend(&spec).await.unwrap(),
            EngineHooks::default(),
        );
        engine
            .award_experience(actor, "fishing", 345.0, Some(1.0))
            .await
            .unwrap();
        let before = engine.skill_summary(actor, "fishing").await.unwrap();
        engine.shutdown().await.unwrap();

        let engine = ProgressionEngine::start(
            config.engine_settings(),
            config.skill_registry(),
            config.curve(),
            open_backend(&spec).await.unwrap(),
            EngineHooks::default(),
        );
        let after = engine.skill_summary(actor, "fishing").await.unwrap();
        assert_eq!(after.level, before.level);
        assert_eq!(after.experience, before.experience);
        assert_eq!(after.level, 3);
        engine.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn test_configured_custom_skill_end_to_end() {
    let temp_dir = tempfile::tempdir().unwrap();
    let directory = temp_dir.path().join("players");
    let config = load_config(
        temp_dir.path(),
        &format!(
            r#"
settings:
  save_interval_secs: 0
  departure_save_delay_ms: 0
storage:
  type: yaml
  directory: "{}"
skills:
  enabled:
    fencing: false
custom_skills:
  - name: excavation
    base_exp: 25
    triggers: [BREAK]
    trigger_materials: [dirt, sand]
"#,
            directory.display()
        ),
    );

    let spec = config.backend_spec().unwrap();
    assert_eq!(spec, BackendSpec::FlatFile { directory });
    let engine = ProgressionEngine::start(
        config.engine_settings(),
        config.skill_registry(),
        config.curve(),
        open_backend(&spec).await.unwrap(),
        EngineHooks::default(),
    );
    assert!(!engine.registry().contains("fencing"));

    let actor = ActorId::new();
    for _ in 0..4 {
        let report = engine.dispatch(actor, "BREAK", "DIRT", None).await;
        assert!(report.get("excavation").is_some());
    }
    assert!(!engine.dispatch(actor, "BREAK", "STONE", None).await.matched());

    let summary = engine.skill_summary(actor, "excavation").await.unwrap();
    assert_eq!(summary.level, 1);
    assert_eq!(summary.experience, 0.0);

    engine.actor_departed(actor).await.unwrap();
    assert!(!engine.cache().contains(actor));
    let report = engine.shutdown().await.unwrap();
    assert_eq!(report.saved, 0);

    let stored = open_backend(&spec).await.unwrap().load(actor).await.unwrap().unwrap();
    assert_eq!(stored.get("excavation").unwrap().level, 1);
}
