use serde::{Deserialize, Serialize};

/// Best progress through a level plus which coins have ever been collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub percentage: u8,
    #[serde(default)]
    pub coins: Vec<bool>,
}

#[derive(Debug)]
pub enum RecordError {
    Serialize(String),
    Deserialize(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(e) => write!(f, "completion record serialize error: {e}"),
            Self::Deserialize(e) => write!(f, "completion record deserialize error: {e}"),
        }
    }
}

impl std::error::Error for RecordError {}

impl CompletionRecord {
    pub fn with_coin_count(coin_count: usize) -> Self {
        Self {
            percentage: 0,
            coins: vec![false; coin_count],
        }
    }

    /// Keep the best percentage seen so far. Returns true if it improved.
    pub fn record_progress(&mut self, percentage: u8) -> bool {
        let percentage = percentage.min(100);
        if percentage > self.percentage {
            self.percentage = percentage;
            true
        } else {
            false
        }
    }

    /// OR-merge coin flags. The record grows if `collected` is longer.
    pub fn merge_coins(&mut self, collected: &[bool]) {
        if self.coins.len() < collected.len() {
            self.coins.resize(collected.len(), false);
        }
        for (slot, &got) in self.coins.iter_mut().zip(collected) {
            *slot |= got;
        }
    }

    pub fn is_coin_collected(&self, index: usize) -> bool {
        self.coins.get(index).copied().unwrap_or(false)
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        serde_json::to_string(self).map_err(|e| RecordError::Serialize(e.to_string()))
    }

    pub fn from_json(data: &str) -> Result<Self, RecordError> {
        serde_json::from_str(data).map_err(|e| RecordError::Deserialize(e.to_string()))
    }
}

/// Horizontal progress as a whole percentage, clamped to 0..=100.
pub fn progress_percentage(x: f32, stage_width: f32) -> u8 {
    if stage_width <= 0.0 || !x.is_finite() {
        return if x.is_finite() && x > 0.0 { 100 } else { 0 };
    }
    let pc = ((x / stage_width) * 100.0).floor();
    pc.clamp(0.0, 100.0) as u8
}

/// What the persistence sink receives on death and on win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub percentage: u8,
    pub coins: Vec<bool>,
    pub won: bool,
}
