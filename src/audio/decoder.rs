use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::types::AudioData;

/// Decode an audio file to raw PCM samples (mono, f32)
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path = path.as_ref();

    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probe_result = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("failed to probe audio format")?;
    let mut format = probe_result.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no audio tracks found in file")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("sample rate not specified in audio file")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("failed to create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err).context("failed to read packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .context("failed to decode audio packet")?;
        append_mono(decoded, &mut samples);
    }

    Ok(AudioData {
        samples,
        sample_rate,
    })
}

/// Downmix one decoded buffer to mono f32 in [-1.0, 1.0] and append it.
fn append_mono(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_into(buf.as_ref(), |s| s as f32 / 128.0 - 1.0, out),
        AudioBufferRef::U16(buf) => mix_into(buf.as_ref(), |s| s as f32 / 32_768.0 - 1.0, out),
        AudioBufferRef::U24(buf) => {
            mix_into(buf.as_ref(), |s| s.inner() as f32 / 8_388_608.0 - 1.0, out)
        }
        AudioBufferRef::U32(buf) => {
            mix_into(buf.as_ref(), |s| s as f32 / 2_147_483_648.0 - 1.0, out)
        }
        AudioBufferRef::S8(buf) => mix_into(buf.as_ref(), |s| s as f32 / 128.0, out),
        AudioBufferRef::S16(buf) => mix_into(buf.as_ref(), |s| s as f32 / 32_768.0, out),
        AudioBufferRef::S24(buf) => mix_into(buf.as_ref(), |s| s.inner() as f32 / 8_388_608.0, out),
        AudioBufferRef::S32(buf) => mix_into(buf.as_ref(), |s| s as f32 / 2_147_483_648.0, out),
        AudioBufferRef::F32(buf) => mix_into(buf.as_ref(), |s| s, out),
        AudioBufferRef::F64(buf) => mix_into(buf.as_ref(), |s| s as f32, out),
    }
}

fn mix_into<T, F>(buf: &AudioBuffer<T>, convert: F, out: &mut Vec<f32>)
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.reserve(frames);

    if channels == 1 {
        out.extend(buf.chan(0).iter().map(|&s| convert(s)));
        return;
    }

    for frame in 0..frames {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += convert(buf.chan(ch)[frame]);
        }
        out.push(sum / channels as f32);
    }
}
