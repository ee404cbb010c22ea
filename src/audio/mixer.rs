use super::queue::BlockSender;

/// Downmix multi-channel input to mono while applying the provided converter so
/// Whisper receives a single channel regardless of the device layout.
pub fn downmix_to_mono<T, F>(buf: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Scale a block to unit peak when its peak exceeds `clip_guard`.
///
/// Blocks whose peak sits at or below the guard pass through unscaled, so
/// near-silent noise is not amplified into full-scale static.
pub fn peak_normalize(block: &mut [f32], clip_guard: f32) {
    let peak = block.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > clip_guard {
        let scale = peak.recip();
        for sample in block.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Lightweight linear resampler; works well for short speech blocks where
/// phase accuracy matters less than latency.
pub(crate) fn resample_linear(input: &[f32], ratio: f32) -> Vec<f32> {
    let input_len = input.len();
    let output_len = (input_len as f32 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f32 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = src_idx - idx as f32;

        if idx + 1 < input_len {
            output.push(input[idx] * (1.0 - frac) + input[idx + 1] * frac);
        } else if idx < input_len {
            output.push(input[idx]);
        } else {
            output.push(input.last().copied().unwrap_or(0.0));
        }
    }

    output
}

/// Capture-callback-side block conditioner.
///
/// Owns the scratch storage for one callback invocation: downmixes the
/// incoming interleaved block to mono, peak-normalizes it, resamples when the
/// device refused the target rate, and hands the finished block to the
/// processing loop. Runs inside the audio driver's callback, so every path
/// through `push` is non-blocking and swallows failures.
pub struct BlockMixer {
    channels: usize,
    clip_guard: f32,
    device_rate: u32,
    target_rate: u32,
    sender: BlockSender,
    scratch: Vec<f32>,
}

impl BlockMixer {
    pub fn new(
        channels: usize,
        clip_guard: f32,
        device_rate: u32,
        target_rate: u32,
        sender: BlockSender,
    ) -> Self {
        Self {
            channels: channels.max(1),
            clip_guard,
            device_rate,
            target_rate,
            sender,
            scratch: Vec::new(),
        }
    }

    pub fn push<T, F>(&mut self, data: &[T], convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        downmix_to_mono(&mut self.scratch, data, self.channels, convert);
        peak_normalize(&mut self.scratch, self.clip_guard);

        let block = if self.device_rate != self.target_rate && self.device_rate != 0 {
            resample_linear(
                &self.scratch,
                self.target_rate as f32 / self.device_rate as f32,
            )
        } else {
            self.scratch.clone()
        };
        self.sender.push(block);
    }
}
