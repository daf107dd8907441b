//! In-memory WAV encoding: RIFF/WAVE, PCM 16-bit, interleaved channels.

use std::io::Cursor;

/// Convert a float sample to 16-bit PCM, clamping out-of-range values.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode interleaved samples as a complete WAV file.
pub fn encode(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_describes_pcm16() {
        let bytes = encode(&[0.0, 0.5, -0.5, 1.0], 44100, 2).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // fmt chunk: PCM format tag, channels, rate, bits.
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            44100
        );
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(bytes.len(), 44 + 4 * 2);
    }

    #[test]
    fn samples_survive_decoding() {
        let bytes = encode(&[0.0, 0.5, -0.5, 2.0], 22050, 1).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(decoded, [0, 16383, -16383, i16::MAX]);
    }

    #[test]
    fn empty_input_is_a_valid_file() {
        let bytes = encode(&[], 44100, 2).unwrap();
        assert_eq!(bytes.len(), 44);
    }
}
