// LibAV decoding - Demux and decode a recording into media units

use std::collections::VecDeque;
use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{Pixel, Sample};
use ffmpeg::software::scaling::{context::Context as Scaler, flag::Flags};
use ffmpeg::util::frame;
use ffmpeg::{media, Rational};
use tracing::{debug, info};

use crate::domain::errors::SourceError;
use crate::domain::model::{MediaUnit, TimeSpec};
use crate::ports::MediaSource;

/// Frames are scaled down to at most this width before analysis
const ANALYSIS_WIDTH: u32 = 160;

struct VideoTrack {
    index: usize,
    time_base: Rational,
    decoder: ffmpeg::decoder::Video,
    scaler: FrameScaler,
}

struct AudioTrack {
    index: usize,
    time_base: Rational,
    decoder: ffmpeg::decoder::Audio,
}

/// Recording decoded through FFmpeg
pub struct LibavSource {
    identifier: String,
    size: u64,
    input: ffmpeg::format::context::Input,
    video: Option<VideoTrack>,
    audio: Option<AudioTrack>,
    pending: VecDeque<MediaUnit>,
    flushed: bool,
}

fn decoder_unavailable(path: &Path, reason: impl ToString) -> SourceError {
    SourceError::DecoderUnavailable {
        identifier: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn seconds(ts: Option<i64>, time_base: Rational) -> TimeSpec {
    let ts = ts.unwrap_or(0) as f64;
    TimeSpec::from_seconds(ts * f64::from(time_base.numerator()) / f64::from(time_base.denominator()))
}

impl LibavSource {
    pub fn open(path: &Path, size: u64) -> Result<Self, SourceError> {
        ffmpeg::init().map_err(|e| decoder_unavailable(path, e))?;
        let input = ffmpeg::format::input(&path).map_err(|e| decoder_unavailable(path, e))?;

        let video = match input.streams().best(media::Type::Video) {
            Some(stream) => {
                let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                    .and_then(|context| context.decoder().video())
                    .map_err(|e| decoder_unavailable(path, e))?;
                Some(VideoTrack {
                    index: stream.index(),
                    time_base: stream.time_base(),
                    decoder,
                    scaler: FrameScaler::default(),
                })
            }
            None => None,
        };

        let audio = match input.streams().best(media::Type::Audio) {
            Some(stream) => {
                let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                    .and_then(|context| context.decoder().audio())
                    .map_err(|e| decoder_unavailable(path, e))?;
                Some(AudioTrack {
                    index: stream.index(),
                    time_base: stream.time_base(),
                    decoder,
                })
            }
            None => None,
        };

        if video.is_none() && audio.is_none() {
            return Err(decoder_unavailable(path, "no audio or video stream"));
        }

        info!(
            "Decoding {} (video stream: {}, audio stream: {})",
            path.display(),
            video.as_ref().map(|t| t.index.to_string()).unwrap_or_else(|| "none".into()),
            audio.as_ref().map(|t| t.index.to_string()).unwrap_or_else(|| "none".into()),
        );

        Ok(Self {
            identifier: path.display().to_string(),
            size,
            input,
            video,
            audio,
            pending: VecDeque::new(),
            flushed: false,
        })
    }

    fn drain_video(track: &mut VideoTrack, pending: &mut VecDeque<MediaUnit>) -> Result<(), SourceError> {
        let mut decoded = frame::Video::empty();
        while track.decoder.receive_frame(&mut decoded).is_ok() {
            let Some((width, height, pixels)) = track.scaler.scale(&decoded)? else {
                continue;
            };
            let pts = seconds(decoded.timestamp().or(decoded.pts()), track.time_base);
            pending.push_back(MediaUnit::video(pts, width, height, pixels));
        }
        Ok(())
    }

    fn drain_audio(track: &mut AudioTrack, pending: &mut VecDeque<MediaUnit>) -> Result<(), SourceError> {
        let mut decoded = frame::Audio::empty();
        while track.decoder.receive_frame(&mut decoded).is_ok() {
            let channels = decoded.ch_layout().channels() as usize;
            let count = decoded.samples();
            if channels == 0 || count == 0 {
                continue;
            }
            let samples = interleaved_samples(&decoded, channels, count)?;
            let pts = seconds(decoded.timestamp().or(decoded.pts()), track.time_base);
            pending.push_back(MediaUnit::audio(pts, decoded.rate(), channels as u16, samples));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SourceError> {
        self.flushed = true;
        if let Some(track) = self.video.as_mut() {
            let _ = track.decoder.send_eof();
            Self::drain_video(track, &mut self.pending)?;
        }
        if let Some(track) = self.audio.as_mut() {
            let _ = track.decoder.send_eof();
            Self::drain_audio(track, &mut self.pending)?;
        }
        Ok(())
    }
}

/// Scales decoded frames down to GRAY8 for analysis
///
/// The context is rebuilt whenever the decoded format or geometry changes,
/// which broadcast streams do at programme boundaries.
#[derive(Default)]
struct FrameScaler {
    scaler: Option<Scaler>,
}

impl FrameScaler {
    fn analysis_size(width: u32, height: u32) -> (u32, u32) {
        let out_width = width.min(ANALYSIS_WIDTH);
        let out_height = (u64::from(height) * u64::from(out_width) / u64::from(width)).max(1) as u32;
        (out_width, out_height)
    }

    fn matches(scaler: &Scaler, decoded: &frame::Video) -> bool {
        let input = scaler.input();
        input.format == decoded.format()
            && input.width == decoded.width()
            && input.height == decoded.height()
    }

    /// Width, height and packed luma rows; `None` for frames without geometry
    fn scale(&mut self, decoded: &frame::Video) -> Result<Option<(u32, u32, Vec<u8>)>, SourceError> {
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Ok(None);
        }
        let (out_width, out_height) = Self::analysis_size(width, height);

        let stale = match &self.scaler {
            Some(scaler) => !Self::matches(scaler, decoded),
            None => true,
        };
        if stale {
            if self.scaler.is_some() {
                info!(
                    "Video input changed to {}x{} {:?}, rebuilding scaler",
                    width,
                    height,
                    decoded.format()
                );
            }
            let scaler = Scaler::get(
                decoded.format(),
                width,
                height,
                Pixel::GRAY8,
                out_width,
                out_height,
                Flags::BILINEAR,
            )
            .map_err(|e| SourceError::Read(format!("scaler: {}", e)))?;
            self.scaler = Some(scaler);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Ok(None);
        };

        let mut gray = frame::Video::empty();
        scaler
            .run(decoded, &mut gray)
            .map_err(|e| SourceError::Read(format!("scale: {}", e)))?;

        let stride = gray.stride(0);
        let plane = gray.data(0);
        let mut pixels = Vec::with_capacity((out_width * out_height) as usize);
        for row in 0..out_height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&plane[start..start + out_width as usize]);
        }
        Ok(Some((out_width, out_height, pixels)))
    }
}

fn sample_width(format: Sample) -> Option<usize> {
    match format {
        Sample::U8(_) => Some(1),
        Sample::I16(_) => Some(2),
        Sample::I32(_) | Sample::F32(_) => Some(4),
        Sample::F64(_) => Some(8),
        _ => None,
    }
}

fn sample_to_f32(format: Sample, b: &[u8]) -> f32 {
    match format {
        Sample::U8(_) => (f32::from(b[0]) - 128.0) / 128.0,
        Sample::I16(_) => f32::from(i16::from_ne_bytes([b[0], b[1]])) / 32768.0,
        Sample::I32(_) => i32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0,
        Sample::F32(_) => f32::from_ne_bytes([b[0], b[1], b[2], b[3]]),
        Sample::F64(_) => {
            f64::from_ne_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
        }
        _ => 0.0,
    }
}

/// Convert one decoded frame to interleaved f32 samples
fn interleaved_samples(decoded: &frame::Audio, channels: usize, count: usize) -> Result<Vec<f32>, SourceError> {
    let format = decoded.format();
    let width = sample_width(format)
        .ok_or_else(|| SourceError::Read(format!("unsupported sample format {:?}", format)))?;

    let mut samples = Vec::with_capacity(channels * count);
    let planar = matches!(
        format,
        Sample::U8(SampleType::Planar)
            | Sample::I16(SampleType::Planar)
            | Sample::I32(SampleType::Planar)
            | Sample::F32(SampleType::Planar)
            | Sample::F64(SampleType::Planar)
    );

    if planar {
        for index in 0..count {
            let offset = index * width;
            for channel in 0..channels {
                let plane = decoded.data(channel);
                samples.push(sample_to_f32(format, &plane[offset..offset + width]));
            }
        }
    } else {
        let plane = decoded.data(0);
        for chunk in plane.chunks_exact(width).take(channels * count) {
            samples.push(sample_to_f32(format, chunk));
        }
    }
    Ok(samples)
}

impl MediaSource for LibavSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_unit(&mut self) -> Result<Option<MediaUnit>, SourceError> {
        loop {
            if let Some(unit) = self.pending.pop_front() {
                return Ok(Some(unit));
            }
            if self.flushed {
                return Ok(None);
            }

            let next = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            let Some((index, packet)) = next else {
                debug!("End of {}, flushing decoders", self.identifier);
                self.flush()?;
                continue;
            };

            if let Some(track) = self.video.as_mut().filter(|t| t.index == index) {
                track
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| SourceError::Read(format!("video packet: {}", e)))?;
                Self::drain_video(track, &mut self.pending)?;
            } else if let Some(track) = self.audio.as_mut().filter(|t| t.index == index) {
                track
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| SourceError::Read(format!("audio packet: {}", e)))?;
                Self::drain_audio(track, &mut self.pending)?;
            }
        }
    }
}
