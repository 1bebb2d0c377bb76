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

//! Relational backend
//!
//! One row per (actor, skill) in `<prefix>skills`, upserted inside a transaction on every
//! save. SQLite (embedded file) and PostgreSQL (networked server) share the same schema and
//! upsert semantics; only placeholder syntax and integer width differ.

use crate::error::{StorageError, StorageResult};
use crate::persistence::PersistenceBackend;
use async_trait::async_trait;
use skillforge_common::{ActorId, ProgressionSnapshot, SkillProgress};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};
use std::path::Path;
use std::str::FromStr;

/// Default table prefix
pub const DEFAULT_TABLE_PREFIX: &str = "skillforge_";

#[derive(Debug, Clone)]
enum SqlPool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

/// SQL backend over SQLite or PostgreSQL
#[derive(Debug, Clone)]
pub struct SqlBackend {
    pool: SqlPool,
    table: String,
}

fn table_name(prefix: &str) -> String {
    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("{}skills", prefix)
}

fn level_from_row(level: i64) -> u32 {
    u32::try_from(level.max(0)).unwrap_or(u32::MAX)
}

/// PostgreSQL stores levels as `INTEGER`
fn level_to_column(actor: ActorId, skill: &str, level: u32) -> StorageResult<i32> {
    i32::try_from(level).map_err(|_| StorageError::LevelOutOfRange {
        actor,
        skill: skill.to_string(),
        level,
    })
}

impl SqlBackend {
    /// Open (creating if missing) an SQLite database file
    pub async fn connect_sqlite(file: impl AsRef<Path>, table_prefix: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(file.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_sqlite_pool(pool, table_prefix).await
    }

    /// Connect to a PostgreSQL server. Credentials given here override those in the URL.
    pub async fn connect_postgres(
        url: &str,
        username: Option<&str>,
        password: Option<&str>,
        table_prefix: &str,
    ) -> StorageResult<Self> {
        let mut options = PgConnectOptions::from_str(url)?;
        if let Some(username) = username {
            options = options.username(username);
        }
        if let Some(password) = password {
            options = options.password(password);
        }
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;
        Self::from_pg_pool(pool, table_prefix).await
    }

    pub async fn from_sqlite_pool(pool: SqlitePool, table_prefix: &str) -> StorageResult<Self> {
        let backend = Self {
            pool: SqlPool::Sqlite(pool),
            table: table_name(table_prefix),
        };
        backend.create_table().await?;
        Ok(backend)
    }

    pub async fn from_pg_pool(pool: PgPool, table_prefix: &str) -> StorageResult<Self> {
        let backend = Self {
            pool: SqlPool::Postgres(pool),
            table: table_name(table_prefix),
        };
        backend.create_table().await?;
        Ok(backend)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn create_table(&self) -> StorageResult<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                actor_id VARCHAR(36) NOT NULL,
                skill VARCHAR(32) NOT NULL,
                level INTEGER NOT NULL DEFAULT 0,
                experience DOUBLE PRECISION NOT NULL DEFAULT 0,
                PRIMARY KEY (actor_id, skill)
            )
            "#,
            self.table
        );
        match &self.pool {
            SqlPool::Sqlite(pool) => {
                sqlx::query(&ddl).execute(pool).await?;
            }
            SqlPool::Postgres(pool) => {
                sqlx::query(&ddl).execute(pool).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for SqlBackend {
    fn name(&self) -> &'static str {
        match self.pool {
            SqlPool::Sqlite(_) => "sqlite",
            SqlPool::Postgres(_) => "postgres",
        }
    }

    async fn load(&self, actor: ActorId) -> StorageResult<Option<ProgressionSnapshot>> {
        let rows: Vec<(String, u32, f64)> = match &self.pool {
            SqlPool::Sqlite(pool) => {
                let sql = format!(
                    "SELECT skill, level, experience FROM {} WHERE actor_id = ?1",
                    self.table
                );
                sqlx::query_as::<_, (String, i64, f64)>(&sql)
                    .bind(actor.to_string())
                    .fetch_all(pool)
                    .await?
                    .into_iter()
                    .map(|(skill, level, exp)| (skill, level_from_row(level), exp))
                    .collect()
            }
            SqlPool::Postgres(pool) => {
                let sql = format!(
                    "SELECT skill, level, experience FROM {} WHERE actor_id = $1",
                    self.table
                );
                sqlx::query_as::<_, (String, i32, f64)>(&sql)
                    .bind(actor.to_string())
                    .fetch_all(pool)
                    .await?
                    .into_iter()
                    .map(|(skill, level, exp)| (skill, level_from_row(i64::from(level)), exp))
                    .collect()
            }
        };

        if rows.is_empty() {
            return Ok(None);
        }
        let mut snapshot = ProgressionSnapshot::new(actor);
        for (skill, level, experience) in rows {
            snapshot.insert(&skill, SkillProgress::new(level, experience));
        }
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &ProgressionSnapshot) -> StorageResult<()> {
        let actor = snapshot.actor_id.to_string();
        match &self.pool {
            SqlPool::Sqlite(pool) => {
                let sql = format!(
                    r#"
                    INSERT INTO {} (actor_id, skill, level, experience)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT (actor_id, skill) DO UPDATE SET
                        level = excluded.level,
                        experience = excluded.experience
                    "#,
                    self.table
                );
                let mut tx = pool.begin().await?;
                for (skill, progress) in &snapshot.skills {
                    sqlx::query(&sql)
                        .bind(&actor)
                        .bind(skill)
                        .bind(i64::from(progress.level))
                        .bind(progress.experience)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
            }
            SqlPool::Postgres(pool) => {
                let sql = format!(
                    r#"
                    INSERT INTO {} (actor_id, skill, level, experience)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (actor_id, skill) DO UPDATE SET
                        level = EXCLUDED.level,
                        experience = EXCLUDED.experience
                    "#,
                    self.table
                );
                let mut tx = pool.begin().await?;
                for (skill, progress) in &snapshot.skills {
                    let level = level_to_column(snapshot.actor_id, skill, progress.level)?;
                    sqlx::query(&sql)
                        .bind(&actor)
                        .bind(skill)
                        .bind(level)
                        .bind(progress.experience)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
            }
        }
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        match &self.pool {
            SqlPool::Sqlite(pool) => pool.close().await,
            SqlPool::Postgres(pool) => pool.close().await,
        }
        Ok(())
    }
}
