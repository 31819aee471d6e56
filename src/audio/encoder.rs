use std::path::Path;

use anyhow::{Context, Result};

use crate::types::AudioData;

/// Encode AudioData as 16-bit PCM WAV.
pub fn encode_wav<P: AsRef<Path>>(audio: &AudioData, path: P) -> Result<()> {
    let path = path.as_ref();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file {}", path.display()))?;
    for &sample in &audio.samples {
        writer
            .write_sample(quantize(sample))
            .context("failed to write audio sample")?;
    }
    writer.finalize().context("failed to finalize WAV file")?;

    Ok(())
}

fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32_767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::quantize;

    #[test]
    fn quantize_clamps_out_of_range_samples() {
        assert_eq!(quantize(2.0), i16::MAX);
        assert_eq!(quantize(-2.0), -i16::MAX);
        assert_eq!(quantize(0.0), 0);
    }
}
