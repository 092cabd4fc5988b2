use crate::constants::{INTERPOLATION_WINDOW, RECONCILE_TICKS, TICK_DURATION, TILE_SIZE};
use crate::engine::entity::Entity;
use crate::types::Vec2;

/// Interpolation window expressed in simulation ticks (at least one).
pub fn interpolation_ticks() -> u32 {
    let window = INTERPOLATION_WINDOW.as_nanos();
    let tick = TICK_DURATION.as_nanos().max(1);
    (window.div_ceil(tick) as u32).max(1)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Correction {
    cell: Vec2,
    pixel: (f64, f64),
    remaining: u32,
}

/// Pulls the locally predicted player onto the host's position when the two
/// disagree about the grid cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciler {
    pending: Option<Correction>,
}

impl Reconciler {
    pub fn observe(&mut self, predicted: Vec2, authoritative: Vec2, pixel: (f64, f64)) {
        if predicted == authoritative {
            self.pending = None;
            return;
        }
        self.pending = Some(Correction {
            cell: authoritative,
            pixel,
            remaining: RECONCILE_TICKS.max(1),
        });
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Blends one tick; on the last tick the body lands on the host's cell
    /// and pixel position.
    pub fn apply(&mut self, body: &mut Entity) {
        let Some(correction) = self.pending.as_mut() else {
            return;
        };
        let alpha = 1.0 / f64::from(correction.remaining);
        body.pixel_x += (correction.pixel.0 - body.pixel_x) * alpha;
        body.pixel_y += (correction.pixel.1 - body.pixel_y) * alpha;
        correction.remaining -= 1;
        if correction.remaining == 0 {
            body.cell = correction.cell;
            body.pixel_x = correction.pixel.0;
            body.pixel_y = correction.pixel.1;
            self.pending = None;
        }
    }
}

/// Display smoothing for an entity the client does not simulate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interpolator {
    from: (f64, f64),
    to: (f64, f64),
    elapsed: u32,
    window: u32,
}

impl Interpolator {
    pub fn new(at: (f64, f64)) -> Self {
        let window = interpolation_ticks();
        Self {
            from: at,
            to: at,
            elapsed: window,
            window,
        }
    }

    /// Starts a new blend from `shown` to `target`. Jumps longer than a tile
    /// (tunnel, respawn) snap.
    pub fn retarget(&mut self, shown: (f64, f64), target: (f64, f64)) {
        let jump = (target.0 - shown.0).hypot(target.1 - shown.1);
        if jump > TILE_SIZE {
            self.from = target;
        } else {
            self.from = shown;
        }
        self.to = target;
        self.elapsed = 0;
    }

    pub fn tick(&mut self) -> (f64, f64) {
        self.elapsed = (self.elapsed + 1).min(self.window);
        self.position()
    }

    pub fn position(&self) -> (f64, f64) {
        let t = f64::from(self.elapsed) / f64::from(self.window);
        (
            self.from.0 + (self.to.0 - self.from.0) * t,
            self.from.1 + (self.to.1 - self.from.1) * t,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_two_ticks_at_sixty_hertz() {
        assert_eq!(interpolation_ticks(), 2);
    }

    #[test]
    fn reconciler_lands_on_host_position_after_window() {
        let mut body = Entity::new(Vec2::new(3, 1), 0.75, false);
        let mut reconciler = Reconciler::default();
        reconciler.observe(body.cell, Vec2::new(5, 1), (125.0, 25.0));
        for _ in 0..RECONCILE_TICKS - 1 {
            let before = body.pixel_x;
            reconciler.apply(&mut body);
            assert!(body.pixel_x > before);
            assert_eq!(body.cell, Vec2::new(3, 1));
        }
        reconciler.apply(&mut body);
        assert_eq!(body.cell, Vec2::new(5, 1));
        assert_eq!((body.pixel_x, body.pixel_y), (125.0, 25.0));
        body.pixel_x = 130.0;
        reconciler.apply(&mut body);
        assert_eq!(body.pixel_x, 130.0);
    }

    #[test]
    fn matching_cell_cancels_correction() {
        let mut body = Entity::new(Vec2::new(3, 1), 0.75, false);
        let mut reconciler = Reconciler::default();
        reconciler.observe(body.cell, Vec2::new(4, 1), (100.0, 25.0));
        reconciler.observe(body.cell, Vec2::new(3, 1), (75.0, 25.0));
        reconciler.apply(&mut body);
        assert_eq!(body.pixel_x, 75.0);
    }

    #[test]
    fn interpolator_blends_short_moves_and_snaps_long_ones() {
        let mut interp = Interpolator::new((0.0, 0.0));
        interp.retarget((0.0, 0.0), (10.0, 0.0));
        assert_eq!(interp.tick(), (5.0, 0.0));
        assert_eq!(interp.tick(), (10.0, 0.0));
        assert_eq!(interp.tick(), (10.0, 0.0));

        interp.retarget((10.0, 0.0), (675.0, 0.0));
        assert_eq!(interp.tick(), (675.0, 0.0));
    }
}
