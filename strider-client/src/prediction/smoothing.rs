use glam::DVec3;

/// Default blend window in seconds.
pub const BLEND_WINDOW: f64 = 0.12;

/// Visual-only layer between the physics state and the renderer. When a
/// correction lands, the physics state snaps immediately; the rendered
/// position keeps a decaying offset so the player sees a short glide
/// instead of a teleport. Velocity, grounded, and move-state are never
/// blended; replacing those instantly is not visually jarring.
#[derive(Clone, Debug)]
pub struct CorrectionBlend {
    visual_offset: DVec3,
    initial_offset: DVec3,
    time_remaining: f64,
    window: f64,
}

impl CorrectionBlend {
    /// Start a blend from the pre-correction render position. The offset is
    /// old predicted position minus corrected position.
    pub fn start(offset: DVec3, window: f64) -> CorrectionBlend {
        CorrectionBlend {
            visual_offset: offset,
            initial_offset: offset,
            time_remaining: window,
            window,
        }
    }

    /// Advance the blend and return the current visual offset.
    pub fn update(&mut self, delta: f64) -> DVec3 {
        if self.time_remaining <= 0.0 {
            return DVec3::ZERO;
        }

        self.time_remaining -= delta;
        if self.time_remaining <= 0.0 {
            self.visual_offset = DVec3::ZERO;
            return DVec3::ZERO;
        }

        let t = 1.0 - (self.time_remaining / self.window);
        self.visual_offset = self.initial_offset * (1.0 - ease_out_cubic(t));
        self.visual_offset
    }

    pub fn offset(&self) -> DVec3 {
        self.visual_offset
    }

    pub fn is_complete(&self) -> bool {
        self.time_remaining <= 0.0
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_runs_to_completion() {
        let mut blend = CorrectionBlend::start(DVec3::new(3.0, 0.0, 0.0), BLEND_WINDOW);

        let mut frames = 0;
        while !blend.is_complete() && frames < 100 {
            blend.update(1.0 / 60.0);
            frames += 1;
        }

        assert!(blend.is_complete());
        assert_eq!(blend.offset(), DVec3::ZERO);
    }

    #[test]
    fn offset_shrinks_every_frame() {
        let mut blend = CorrectionBlend::start(DVec3::new(3.0, 0.0, 0.0), BLEND_WINDOW);

        let mut previous = blend.offset().length();
        while !blend.is_complete() {
            let current = blend.update(1.0 / 60.0).length();
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn ease_out_starts_fast_and_settles() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert!((ease_out_cubic(1.0) - 1.0).abs() < 1e-12);
        assert!(ease_out_cubic(0.5) > 0.5);
    }
}
