use crate::domain::PairBar;

use super::SignalSource;

/// Replays a fixed z-score sequence, one entry per bar.
///
/// Bars beyond the end of the script produce `None`. Useful for driving the
/// position state machine through an exact scenario.
#[derive(Debug, Clone)]
pub struct ScriptedSignal {
    script: Vec<Option<f64>>,
    cursor: usize,
}

impl ScriptedSignal {
    pub fn new(script: Vec<Option<f64>>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl SignalSource for ScriptedSignal {
    fn name(&self) -> &str {
        "scripted"
    }

    fn warmup_bars(&self) -> usize {
        self.script.iter().take_while(|z| z.is_none()).count()
    }

    fn update(&mut self, _bar: &PairBar) -> Option<f64> {
        let z = self.script.get(self.cursor).copied().flatten();
        self.cursor += 1;
        z
    }
}
