//! Duration extraction for audio files.

use std::{fs::File, path::Path};

use symphonia::core::{
    codecs::CodecParameters,
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use thiserror::Error;
use tracing::{debug, instrument, trace};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Symphonia(#[from] SymphoniaError),

    #[error("file has no audio track")]
    NoTrack,

    #[error("track does not report a sample rate")]
    UnknownSampleRate,

    #[error("invalid duration: {0}s")]
    InvalidDuration(f64),
}

/// Something that can tell how long an audio file is, in seconds.
pub trait DurationProbe {
    fn duration(&self, path: &Path) -> Result<f64, DecodeError>;
}

impl<F> DurationProbe for F
where
    F: Fn(&Path) -> Result<f64, DecodeError>,
{
    fn duration(&self, path: &Path) -> Result<f64, DecodeError> {
        self(path)
    }
}

/// Reads durations from container metadata with symphonia.
///
/// When the container does not carry a frame count the packets are walked
/// and their durations summed; samples are never decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    #[instrument(skip(self), level = "trace")]
    fn duration(&self, path: &Path) -> Result<f64, DecodeError> {
        let file = File::open(path)?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let mut format = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )?
            .format;

        let track = format.default_track().ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let ticks = match params.n_frames {
            Some(n_frames) => n_frames,
            None => {
                debug!("no frame count in container, summing packet durations");
                let mut total = 0u64;
                loop {
                    match format.next_packet() {
                        Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                        Ok(_) => continue,
                        Err(SymphoniaError::IoError(ref e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            break
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                total
            }
        };

        let seconds = ticks_to_seconds(&params, ticks)?;
        trace!(seconds, "read duration");
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(DecodeError::InvalidDuration(seconds));
        }

        Ok(seconds)
    }
}

fn ticks_to_seconds(params: &CodecParameters, ticks: u64) -> Result<f64, DecodeError> {
    match params.time_base {
        Some(time_base) => {
            let time = time_base.calc_time(ticks);
            Ok(time.seconds as f64 + time.frac)
        }
        None => {
            let sample_rate = params.sample_rate.ok_or(DecodeError::UnknownSampleRate)?;
            Ok(ticks as f64 / sample_rate as f64)
        }
    }
}
