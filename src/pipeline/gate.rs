/// Coarse energy gate that skips inference on near-total silence.
///
/// This is a mean-amplitude heuristic, not voice activity detection: it only
/// suppresses windows with essentially no signal in them.
#[derive(Debug, Clone, Copy)]
pub struct SilenceGate {
    threshold: f32,
}

impl SilenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn is_silent(&self, mean_abs: f32) -> bool {
        mean_abs < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_below_threshold_only() {
        let gate = SilenceGate::new(0.01);
        assert!(gate.is_silent(0.0));
        assert!(gate.is_silent(0.009));
        assert!(!gate.is_silent(0.01));
        assert!(!gate.is_silent(0.5));
    }
}
