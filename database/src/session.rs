use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, Transaction};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::{
    models::{AudioFile, NewSample, Sample, SampleSet},
    Error,
};

// sqlite caps bound parameters per statement; four columns per sample keeps this well under it
const ROWS_PER_INSERT: usize = 200;

/// One unit of work against the database.
///
/// Everything done through a session lands in a single transaction: either
/// [`Session::commit`] makes all of it visible, or dropping the session (on
/// any error path) throws all of it away.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub(crate) fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Every indexed audio file name, loaded in one query.
    #[instrument(skip(self), level = "trace")]
    pub async fn audio_file_names(&mut self) -> Result<HashSet<String>, Error> {
        let names: Vec<(String,)> = sqlx::query_as("select name from audio_files")
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    #[instrument(skip(self), level = "trace")]
    pub async fn insert_audio_file(&mut self, file: &AudioFile) -> Result<(), Error> {
        sqlx::query("insert into audio_files(name, duration) values (?, ?)")
            .bind(&file.name)
            .bind(file.duration)
            .execute(&mut *self.tx)
            .await
            .map_err(|err| Error::from_insert(err, &file.name))?;

        Ok(())
    }

    /// Bulk insert. A name that is already indexed fails the whole call with
    /// [`Error::DuplicateName`].
    #[instrument(skip_all, fields(n_files = files.len()), level = "trace")]
    pub async fn insert_audio_files(&mut self, files: &[AudioFile]) -> Result<u64, Error> {
        let mut inserted = 0;

        for chunk in files.chunks(ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("insert into audio_files(name, duration) ");
            builder.push_values(chunk, |mut row, file| {
                row.push_bind(file.name.clone()).push_bind(file.duration);
            });

            match builder.build().execute(&mut *self.tx).await {
                Ok(result) => inserted += result.rows_affected(),
                Err(err) => {
                    let name = self.first_indexed(chunk).await?;
                    return Err(match name {
                        Some(name) => Error::from_insert(err, &name),
                        None => Error::Sqlx(err),
                    });
                }
            }
        }
        debug!(n_rows = inserted, "inserted audio files");

        Ok(inserted)
    }

    async fn first_indexed(&mut self, files: &[AudioFile]) -> Result<Option<String>, Error> {
        let existing = self.audio_file_names().await?;
        let mut seen = HashSet::new();

        // either already in the table or repeated within the batch
        Ok(files
            .iter()
            .find(|file| existing.contains(&file.name) || !seen.insert(&file.name))
            .map(|file| file.name.clone()))
    }

    /// Audio files long enough to host a clip of `duration` seconds, ordered by name.
    #[instrument(skip(self), level = "trace")]
    pub async fn audio_files_at_least(&mut self, duration: f64) -> Result<Vec<AudioFile>, Error> {
        let files = sqlx::query_as(
            "
            select name, duration from audio_files
            where duration >= ?
            order by name
        ",
        )
        .bind(duration)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(files)
    }

    #[instrument(skip(self), level = "trace")]
    pub async fn create_sample_set(&mut self, name: &str) -> Result<SampleSet, Error> {
        let sample_set = sqlx::query_as(
            "insert into sample_sets(name, created_at) values (?, ?) returning id, name, created_at",
        )
        .bind(name)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(sample_set)
    }

    /// Writes `samples` and returns every sample of the sets they belong to,
    /// ordered by id.
    #[instrument(skip_all, fields(n_samples = samples.len()), level = "trace")]
    pub async fn insert_samples(&mut self, samples: &[NewSample]) -> Result<Vec<Sample>, Error> {
        for chunk in samples.chunks(ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "insert into samples(sample_set_id, audio_file, start, duration) ",
            );
            builder.push_values(chunk, |mut row, sample| {
                row.push_bind(sample.sample_set_id)
                    .push_bind(sample.audio_file.clone())
                    .push_bind(sample.start)
                    .push_bind(sample.duration);
            });
            builder.build().execute(&mut *self.tx).await?;
        }

        let mut set_ids: Vec<i64> = samples.iter().map(|s| s.sample_set_id).collect();
        set_ids.dedup();

        let mut stored = Vec::with_capacity(samples.len());
        for set_id in set_ids {
            let rows: Vec<Sample> = sqlx::query_as(
                "
                select id, sample_set_id, audio_file, start, duration from samples
                where sample_set_id = ?
                order by id
            ",
            )
            .bind(set_id)
            .fetch_all(&mut *self.tx)
            .await?;
            stored.extend(rows);
        }
        debug!(n_rows = stored.len(), "inserted samples");

        Ok(stored)
    }
}
