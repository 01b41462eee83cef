use time::OffsetDateTime;

/// An indexed audio file, keyed by its path relative to the datasets root.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AudioFile {
    pub name: String,
    /// Seconds.
    pub duration: f64,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// One batch of samples produced by a single generation run.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SampleSet {
    pub id: i64,
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// A clip reference into an [`AudioFile`]: `start..start + duration` seconds.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Sample {
    pub id: i64,
    pub sample_set_id: i64,
    pub audio_file: String,
    pub start: f64,
    pub duration: f64,
}

impl Sample {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A sample that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub sample_set_id: i64,
    pub audio_file: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// bcrypt hash in modular crypt format (`$2b$...`), see [`crate::users`].
    pub hashed_password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub role: Role,
}
