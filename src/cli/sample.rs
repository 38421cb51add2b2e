use crate::chunk::{Tag, HEADER_SIZE};
use crate::error::{Result, ZerofileError};
use crate::params::{ExtractionParameters, HPitch};
use crate::payload::VolumeHeader;
use crate::writer::{required_size, ZerofileWriter};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::path::Path;

/// Options for the sample command
#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub width: u32,
    pub height: u32,
    /// Number of PVOL frames to write
    pub frames: usize,
    pub h_pitch_um: f32,
    pub lambda: u16,
    pub gain: u16,
    /// Bytes for a leading CBUF chunk, skipped when empty
    pub command_buffer: Vec<u8>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 1536,
            frames: 1,
            h_pitch_um: 9.7409,
            lambda: 0xbdd8,
            gain: u16::MAX,
            command_buffer: Vec::new(),
        }
    }
}

/// Build a synthetic Zerofile with random volume samples
pub fn build_sample(options: &SampleOptions) -> Result<Vec<u8>> {
    let params = ExtractionParameters::new(
        options.width,
        options.height,
        HPitch::from_micrometers(options.h_pitch_um),
    );

    let frames = vec![Tag::PVOL; options.frames];
    let command_bytes = if options.command_buffer.is_empty() {
        0
    } else {
        HEADER_SIZE + options.command_buffer.len()
    };
    let size = required_size(&params, &frames)
        .and_then(|size| size.checked_add(command_bytes))
        .ok_or(ZerofileError::LengthOverflow(usize::MAX))?;

    let samples_len = usize::try_from(params.pixel_count())
        .map_err(|_| ZerofileError::LengthOverflow(usize::MAX))?;
    let mut samples = vec![0u8; samples_len];
    let mut storage = vec![0u8; size];
    let mut rng = OsRng;

    let mut writer = ZerofileWriter::new(&mut storage, params)?;
    if !options.command_buffer.is_empty() {
        writer.write_payload(Tag::CBUF, &options.command_buffer)?;
    }
    let volume = VolumeHeader {
        lambda: options.lambda,
        gain: options.gain,
    };
    for _ in 0..options.frames {
        rng.fill_bytes(&mut samples);
        writer.write_volume(Tag::PVOL, volume, &samples)?;
    }
    let written = writer.finish()?.len();
    storage.truncate(written);

    tracing::debug!(bytes = written, frames = options.frames, "built sample zerofile");
    Ok(storage)
}

/// Write a synthetic Zerofile to disk
/// Returns the number of bytes written
pub fn write_sample(path: &Path, options: &SampleOptions) -> Result<usize> {
    let data = build_sample(options)?;
    fs::write(path, &data)?;
    Ok(data.len())
}
