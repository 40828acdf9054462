use serde::{Deserialize, Serialize};

use cubedash_core::StageColors;

use crate::level::{LevelSettings, PaletteSection};

/// A value that moves linearly toward a target over a number of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interpolated {
    start: f32,
    end: f32,
    elapsed: f32,
    /// `None` when settled.
    duration: Option<f32>,
}

impl Interpolated {
    pub fn new(value: f32) -> Self {
        Self {
            start: value,
            end: value,
            elapsed: 0.0,
            duration: None,
        }
    }

    pub fn get(&self) -> f32 {
        match self.duration {
            Some(total) => self.start + (self.end - self.start) * (self.elapsed / total),
            None => self.start,
        }
    }

    /// Head toward `target`, starting from the current value. A zero
    /// duration jumps immediately.
    pub fn retarget(&mut self, target: f32, duration: f32) {
        if duration <= 0.0 {
            *self = Self::new(target);
            return;
        }
        self.start = self.get();
        self.end = target;
        self.elapsed = 0.0;
        self.duration = Some(duration);
    }

    pub fn advance(&mut self, dt: f32) {
        let Some(total) = self.duration else {
            return;
        };
        self.elapsed += dt;
        if self.elapsed >= total {
            *self = Self::new(self.end);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color([Interpolated; 3]);

impl Color {
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self(rgb.map(|c| Interpolated::new(f32::from(c))))
    }

    pub fn rgb(&self) -> [f32; 3] {
        self.0.map(|c| c.get())
    }

    pub fn retarget(&mut self, rgb: [u8; 3], duration: f32) {
        for (channel, target) in self.0.iter_mut().zip(rgb) {
            channel.retarget(f32::from(target), duration);
        }
    }

    pub fn advance(&mut self, dt: f32) {
        for channel in &mut self.0 {
            channel.advance(dt);
        }
    }
}

/// Stage and background colors. Observational only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub stage: Color,
    pub bg: Color,
}

impl Palette {
    pub fn new(settings: &LevelSettings) -> Self {
        Self {
            stage: Color::from_rgb(settings.color_stage),
            bg: Color::from_rgb(settings.color_bg),
        }
    }

    pub fn retarget(&mut self, section: PaletteSection, rgb: [u8; 3], duration: f32) {
        match section {
            PaletteSection::Stage => self.stage.retarget(rgb, duration),
            PaletteSection::Bg => self.bg.retarget(rgb, duration),
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.stage.advance(dt);
        self.bg.advance(dt);
    }

    pub fn colors(&self) -> StageColors {
        StageColors {
            bg: self.bg.rgb(),
            stage: self.stage.rgb(),
        }
    }
}
