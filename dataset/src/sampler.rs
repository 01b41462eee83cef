//! Weighted random clip selection.
//!
//! Files are drawn with replacement, each weighted by the square root of how
//! many clip lengths it holds. Longer files offer more distinct start
//! positions and so are favoured, but less than proportionally.

use database::{
    models::{AudioFile, NewSample, Sample, SampleSet},
    Session,
};
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use tracing::{debug, info, instrument};

use crate::{rng::seeded_rng, Error};

#[derive(Debug, Clone)]
pub struct SampleRequest {
    /// Name of the sample set; does not have to be unique.
    pub name: String,
    pub count: i64,
    /// Clip length in seconds.
    pub duration: f64,
    pub seed: String,
}

impl SampleRequest {
    fn validate(&self) -> Result<usize, Error> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "sample duration must be positive, got {}",
                self.duration
            )));
        }

        usize::try_from(self.count).map_err(|_| {
            Error::InvalidArgument(format!("sample count must not be negative, got {}", self.count))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSampleSet {
    pub sample_set: SampleSet,
    pub samples: Vec<Sample>,
}

/// One clip picked from the pool, before it is tied to a sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub audio_file: String,
    pub start: f64,
}

pub fn headroom_weight(file_duration: f64, duration: f64) -> f64 {
    (file_duration / duration).sqrt()
}

/// Draws `count` clips of `duration` seconds from `pool`.
///
/// Every file in `pool` must be at least `duration` long. Each draw takes one
/// value from `rng` to pick the file and then one for the start offset, so
/// the same generator state always yields the same clips.
pub fn draw<R: Rng + ?Sized>(
    pool: &[AudioFile],
    count: usize,
    duration: f64,
    rng: &mut R,
) -> Result<Vec<Draw>, Error> {
    if pool.is_empty() {
        return Err(Error::PoolExhausted { duration });
    }

    let weights: Vec<f64> = pool
        .iter()
        .map(|file| headroom_weight(file.duration, duration))
        .collect();
    // a tiny duration can push the ratio past f64::MAX
    if let Some((file, _)) = pool.iter().zip(&weights).find(|(_, w)| !w.is_finite()) {
        return Err(Error::InvalidArgument(format!(
            "sample duration {duration}s is too small for {} ({}s)",
            file.name, file.duration
        )));
    }
    let weights = WeightedIndex::new(&weights)?;

    let draws = (0..count)
        .map(|_| {
            let file = &pool[weights.sample(rng)];
            let headroom = file.duration - duration;
            Draw {
                audio_file: file.name.clone(),
                start: rng.gen::<f64>() * headroom,
            }
        })
        .collect();

    Ok(draws)
}

/// Creates a sample set of `request.count` clips drawn from every indexed
/// file at least `request.duration` long.
///
/// The pool read, the new set and all of its samples share `session`, which is
/// committed only once everything is written: a failure at any point leaves
/// no trace in the database.
#[instrument(skip(session), level = "trace")]
pub async fn generate(
    mut session: Session,
    request: &SampleRequest,
) -> Result<GeneratedSampleSet, Error> {
    let count = request.validate()?;

    let pool = session.audio_files_at_least(request.duration).await?;
    debug!(pool_size = pool.len(), "loaded eligible files");
    if pool.is_empty() {
        return Err(Error::PoolExhausted {
            duration: request.duration,
        });
    }

    let sample_set = session.create_sample_set(&request.name).await?;

    let mut rng = seeded_rng(&request.seed);
    let new_samples: Vec<NewSample> = draw(&pool, count, request.duration, &mut rng)?
        .into_iter()
        .map(|draw| NewSample {
            sample_set_id: sample_set.id,
            audio_file: draw.audio_file,
            start: draw.start,
            duration: request.duration,
        })
        .collect();

    let samples = session.insert_samples(&new_samples).await?;
    session.commit().await?;
    info!(
        sample_set_id = sample_set.id,
        n_samples = samples.len(),
        "created sample set"
    );

    Ok(GeneratedSampleSet {
        sample_set,
        samples,
    })
}
