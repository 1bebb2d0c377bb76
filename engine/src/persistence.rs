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

//! Durable storage of actor progression
//!
//! Backends are only ever driven by the single [`PersistenceWorker`] task, so they do not need
//! to be safe for concurrent writers. Two implementations share one contract:
//!
//! - [`FlatFileBackend`]: one YAML document per actor, rewritten on every save
//! - [`SqlBackend`]: one row per (actor, skill), upserted on every save, on SQLite or PostgreSQL

pub mod flatfile;
pub mod relational;
pub mod worker;

pub use flatfile::FlatFileBackend;
pub use relational::SqlBackend;
pub use worker::PersistenceWorker;

use crate::error::StorageResult;
use async_trait::async_trait;
use skillforge_common::{ActorId, ProgressionSnapshot};
use std::path::PathBuf;

/// Storage contract for actor progression
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Load an actor's stored progression, `None` if nothing was ever saved
    async fn load(&self, actor: ActorId) -> StorageResult<Option<ProgressionSnapshot>>;

    /// Write every skill record in the snapshot
    async fn save(&self, snapshot: &ProgressionSnapshot) -> StorageResult<()>;

    /// Release files or connections
    async fn close(&self) -> StorageResult<()>;
}

/// Which backend to open and where
#[derive(Debug, Clone, PartialEq)]
pub enum BackendSpec {
    FlatFile {
        directory: PathBuf,
    },
    Sqlite {
        file: PathBuf,
        table_prefix: String,
    },
    Postgres {
        url: String,
        username: Option<String>,
        password: Option<String>,
        table_prefix: String,
    },
}

/// Open the backend described by `spec`
pub async fn open_backend(spec: &BackendSpec) -> StorageResult<Box<dyn PersistenceBackend>> {
    let backend: Box<dyn PersistenceBackend> = match spec {
        BackendSpec::FlatFile { directory } => Box::new(FlatFileBackend::open(directory).await?),
        BackendSpec::Sqlite { file, table_prefix } => {
            Box::new(SqlBackend::connect_sqlite(file, table_prefix).await?)
        }
        BackendSpec::Postgres {
            url,
            username,
            password,
            table_prefix,
        } => Box::new(
            SqlBackend::connect_postgres(url, username.as_deref(), password.as_deref(), table_prefix)
                .await?,
        ),
    };
    tracing::info!("Opened {} persistence backend", backend.name());
    Ok(backend)
}
