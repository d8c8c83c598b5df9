//! Channel layout conversion between the mono wire format and whatever the
//! ALSA device negotiated.

/// Average interleaved channels down to mono.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Duplicate mono samples across `channels`, writing into `out`.
pub fn expand_into(mono: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    out.reserve(mono.len() * channels);
    for &sample in mono {
        for _ in 0..channels {
            out.push(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_averages_to_mono() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_passes_through_downmix() {
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn expand_duplicates_each_sample() {
        let mut out = vec![9.0];
        expand_into(&[0.25, -0.25], 3, &mut out);
        assert_eq!(out, vec![0.25, 0.25, 0.25, -0.25, -0.25, -0.25]);
    }
}
