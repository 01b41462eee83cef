use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info, instrument};

pub mod error;
pub mod models;
mod session;
pub mod users;

pub use error::Error;
pub use session::Session;

const SCHEMA: &[&str] = &[
    "
    create table if not exists audio_files (
        name text primary key not null,
        duration real not null check (duration > 0)
    )
    ",
    "create index if not exists audio_files_duration on audio_files(duration)",
    "
    create table if not exists sample_sets (
        id integer primary key autoincrement,
        name text not null,
        created_at text not null
    )
    ",
    "
    create table if not exists samples (
        id integer primary key autoincrement,
        sample_set_id integer not null references sample_sets(id) on delete cascade,
        audio_file text not null references audio_files(name),
        start real not null check (start >= 0),
        duration real not null check (duration > 0)
    )
    ",
    "create index if not exists samples_sample_set_id on samples(sample_set_id)",
    "
    create table if not exists users (
        id integer primary key autoincrement,
        name text not null unique,
        hashed_password text not null,
        role text not null default 'user'
    )
    ",
];

pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // every connection to `:memory:` is its own database, so keep exactly one alive
        let pool_options = if is_in_memory(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options.connect_with(options).await?;
        debug!(url, "connected to database");

        Ok(Self { pool })
    }

    /// Connects and makes sure every table exists.
    pub async fn open(url: &str) -> Result<Self, Error> {
        let database = Self::connect(url).await?;
        database.init_schema().await?;
        Ok(database)
    }

    #[instrument(skip(self), level = "trace")]
    pub async fn init_schema(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("database schema ready");

        Ok(())
    }

    /// Starts a storage session. Nothing it writes is visible until
    /// [`Session::commit`]; dropping it rolls back.
    pub async fn begin(&self) -> Result<Session, Error> {
        Ok(Session::new(self.pool.begin().await?))
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    pub async fn audio_files(&self) -> Result<Vec<models::AudioFile>, Error> {
        let files = sqlx::query_as("select name, duration from audio_files order by name")
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    pub async fn sample_sets(&self) -> Result<Vec<models::SampleSet>, Error> {
        let sample_sets = sqlx::query_as("select id, name, created_at from sample_sets order by id")
            .fetch_all(&self.pool)
            .await?;

        Ok(sample_sets)
    }

    pub async fn samples_in_set(&self, sample_set_id: i64) -> Result<Vec<models::Sample>, Error> {
        let samples = sqlx::query_as(
            "
            select id, sample_set_id, audio_file, start, duration from samples
            where sample_set_id = ?
            order by id
        ",
        )
        .bind(sample_set_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(samples)
    }

    pub async fn count_samples(&self) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as("select count(*) from samples")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Removes a sample set together with its samples. Returns whether it existed.
    #[instrument(skip(self), level = "trace")]
    pub async fn delete_sample_set(&self, sample_set_id: i64) -> Result<bool, Error> {
        let result = sqlx::query("delete from sample_sets where id = ?")
            .bind(sample_set_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
