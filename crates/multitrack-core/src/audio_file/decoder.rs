//! Streaming decoders

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use super::{AudioFileError, AudioFormat, FileFormat};
use crate::types::MAX_TRACK_CHANNELS;

/// A decoder for one audio file.
///
/// `read` fills interleaved frames and returns 0 at end of stream.
pub enum Decoder {
    Wav(WavDecoder),
    Compressed(CompressedDecoder),
}

impl Decoder {
    /// Open `path`, choosing the decoder from its extension
    pub fn open(path: &Path) -> Result<Self, AudioFileError> {
        let decoder = match FileFormat::from_path(path)? {
            FileFormat::Wav => Decoder::Wav(WavDecoder::open(path)?),
            FileFormat::Mp3 | FileFormat::Aac | FileFormat::M4a | FileFormat::Flac => {
                Decoder::Compressed(CompressedDecoder::open(path)?)
            }
        };
        let format = decoder.format();
        if format.channels == 0 || format.channels > MAX_TRACK_CHANNELS {
            return Err(AudioFileError::UnsupportedFormat(format!(
                "{} channels in {:?} (mono or stereo only)",
                format.channels, path
            )));
        }
        if format.sample_rate == 0 {
            return Err(AudioFileError::Decode(format!("no sample rate in {:?}", path)));
        }
        Ok(decoder)
    }

    pub fn format(&self) -> AudioFormat {
        match self {
            Decoder::Wav(d) => d.format,
            Decoder::Compressed(d) => d.format,
        }
    }

    /// Decode up to `buf.len() / channels` frames into `buf`.
    ///
    /// Returns the number of frames written; 0 means end of stream.
    pub fn read(&mut self, buf: &mut [f32]) -> Result<usize, AudioFileError> {
        match self {
            Decoder::Wav(d) => d.read(buf),
            Decoder::Compressed(d) => d.read(buf),
        }
    }

    /// Position the decoder so the next `read` starts at `frame`
    pub fn seek(&mut self, frame: u64) -> Result<(), AudioFileError> {
        match self {
            Decoder::Wav(d) => d.seek(frame),
            Decoder::Compressed(d) => d.seek(frame),
        }
    }
}

/// WAV decoding via hound
pub struct WavDecoder {
    reader: hound::WavReader<BufReader<File>>,
    format: AudioFormat,
    sample_format: hound::SampleFormat,
    /// 1 / full-scale for integer samples
    int_scale: f32,
    position: u64,
}

impl WavDecoder {
    pub fn open(path: &Path) -> Result<Self, AudioFileError> {
        let reader = hound::WavReader::open(path).map_err(|e| AudioFileError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let spec = reader.spec();
        let format = AudioFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            total_frames: reader.duration() as u64,
        };
        let int_scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
        log::debug!(
            "WavDecoder: {:?} {}Hz {}ch {}bit {} frames",
            path,
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            format.total_frames
        );
        Ok(Self {
            reader,
            format,
            sample_format: spec.sample_format,
            int_scale,
            position: 0,
        })
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, AudioFileError> {
        let channels = self.format.channels as usize;
        let remaining = self.format.total_frames.saturating_sub(self.position) as usize;
        let frames = (buf.len() / channels).min(remaining);
        let wanted = frames * channels;
        let mut written = 0usize;

        match self.sample_format {
            hound::SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(wanted) {
                    buf[written] = sample.map_err(|e| AudioFileError::Decode(e.to_string()))?;
                    written += 1;
                }
            }
            hound::SampleFormat::Int => {
                let scale = self.int_scale;
                for sample in self.reader.samples::<i32>().take(wanted) {
                    let sample = sample.map_err(|e| AudioFileError::Decode(e.to_string()))?;
                    buf[written] = sample as f32 * scale;
                    written += 1;
                }
            }
        }

        let frames_read = written / channels;
        self.position += frames_read as u64;
        Ok(frames_read)
    }

    fn seek(&mut self, frame: u64) -> Result<(), AudioFileError> {
        let frame = frame.min(self.format.total_frames);
        self.reader
            .seek(frame as u32)
            .map_err(|e| AudioFileError::Seek(e.to_string()))?;
        self.position = frame;
        Ok(())
    }
}

/// MP3 / AAC / M4A / FLAC decoding via symphonia
pub struct CompressedDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    time_base: Option<TimeBase>,
    format: AudioFormat,
    sample_buf: Option<SampleBuffer<f32>>,
    /// Decoded samples not yet handed out
    pending: Vec<f32>,
    pending_pos: usize,
    /// Frames to drop after an accurate seek landed early
    skip_frames: u64,
    eof: bool,
}

impl CompressedDecoder {
    pub fn open(path: &Path) -> Result<Self, AudioFileError> {
        let open_err = |reason: String| AudioFileError::Open {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions {
                    enable_gapless: true,
                    ..Default::default()
                },
                &MetadataOptions::default(),
            )
            .map_err(|e| match e {
                SymphoniaError::Unsupported(what) => AudioFileError::UnsupportedFormat(what.to_string()),
                other => open_err(other.to_string()),
            })?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| open_err("no audio track".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioFileError::UnsupportedFormat(e.to_string()))?;

        let format = AudioFormat {
            sample_rate: codec_params.sample_rate.unwrap_or(0),
            channels: codec_params.channels.map(|c| c.count() as u16).unwrap_or(0),
            total_frames: codec_params.n_frames.unwrap_or(0),
        };

        let mut this = Self {
            reader,
            decoder,
            track_id,
            time_base: codec_params.time_base,
            format,
            sample_buf: None,
            pending: Vec::new(),
            pending_pos: 0,
            skip_frames: 0,
            eof: false,
        };

        // Some AAC streams only reveal their layout in the first packet
        if this.format.channels == 0 || this.format.sample_rate == 0 {
            this.decode_next_packet()?;
        }

        log::debug!(
            "CompressedDecoder: {:?} {}Hz {}ch {} frames",
            path,
            this.format.sample_rate,
            this.format.channels,
            this.format.total_frames
        );
        Ok(this)
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, AudioFileError> {
        let channels = (self.format.channels as usize).max(1);
        let wanted = (buf.len() / channels) * channels;
        let mut written = 0usize;

        while written < wanted {
            if self.pending_pos < self.pending.len() {
                let n = (wanted - written).min(self.pending.len() - self.pending_pos);
                buf[written..written + n]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                written += n;
                continue;
            }
            if self.eof || !self.decode_next_packet()? {
                break;
            }
        }

        Ok(written / channels)
    }

    /// Decode one packet into `pending`. Returns false at end of stream.
    fn decode_next_packet(&mut self) -> Result<bool, AudioFileError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.eof = true;
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.eof = true;
                    return Ok(false);
                }
                Err(e) => return Err(AudioFileError::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("CompressedDecoder: skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(AudioFileError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            if self.format.channels == 0 {
                self.format.channels = spec.channels.count() as u16;
            }
            if self.format.sample_rate == 0 {
                self.format.sample_rate = spec.rate;
            }

            let needs_alloc = self
                .sample_buf
                .as_ref()
                .map_or(true, |b| b.capacity() < decoded.capacity());
            if needs_alloc {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(sample_buf) = self.sample_buf.as_mut() else {
                continue;
            };
            sample_buf.copy_interleaved_ref(decoded);

            let channels = spec.channels.count().max(1);
            let samples = sample_buf.samples();
            let frames = samples.len() / channels;
            let skip = (self.skip_frames as usize).min(frames);
            self.skip_frames -= skip as u64;

            self.pending.clear();
            self.pending.extend_from_slice(&samples[skip * channels..]);
            self.pending_pos = 0;
            if !self.pending.is_empty() {
                return Ok(true);
            }
        }
    }

    fn frame_to_ts(&self, frame: u64) -> u64 {
        match self.time_base {
            Some(tb) if self.format.sample_rate > 0 => {
                (frame as u128 * tb.denom as u128
                    / (tb.numer as u128 * self.format.sample_rate as u128)) as u64
            }
            _ => frame,
        }
    }

    fn ts_to_frame(&self, ts: u64) -> u64 {
        match self.time_base {
            Some(tb) if tb.denom > 0 => {
                (ts as u128 * tb.numer as u128 * self.format.sample_rate as u128
                    / tb.denom as u128) as u64
            }
            _ => ts,
        }
    }

    fn seek(&mut self, frame: u64) -> Result<(), AudioFileError> {
        let target = if self.format.has_known_length() {
            frame.min(self.format.total_frames)
        } else {
            frame
        };
        let seeked = self
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: self.frame_to_ts(target),
                    track_id: self.track_id,
                },
            )
            .map_err(|e| AudioFileError::Seek(e.to_string()))?;
        self.decoder.reset();

        let actual = self.ts_to_frame(seeked.actual_ts);
        self.skip_frames = target.saturating_sub(actual);
        self.pending.clear();
        self.pending_pos = 0;
        self.eof = false;
        Ok(())
    }
}
