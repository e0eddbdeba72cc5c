use glam::DVec3;

use crate::volume::ScalarVolume;

/// Trilinear lookups into the current (possibly masked) scalars.
#[derive(Clone, Copy)]
pub struct VolumeSampler<'a> {
    volume: &'a ScalarVolume,
    origin: DVec3,
    inv_spacing: DVec3,
    outside: f64,
}

impl<'a> VolumeSampler<'a> {
    pub fn new(volume: &'a ScalarVolume) -> Self {
        let spacing = DVec3::from(volume.spacing());
        let inv_spacing = DVec3::new(
            safe_recip(spacing.x),
            safe_recip(spacing.y),
            safe_recip(spacing.z),
        );
        Self {
            volume,
            origin: DVec3::from(volume.origin()),
            inv_spacing,
            outside: 0.0,
        }
    }

    pub fn with_outside(mut self, outside: f64) -> Self {
        self.outside = outside;
        self
    }

    pub fn sample_world(&self, world_pos: DVec3) -> f64 {
        let grid = (world_pos - self.origin) * self.inv_spacing;
        self.sample_grid(grid)
    }

    /// Central-difference gradient in world units.
    pub fn gradient_world(&self, world_pos: DVec3) -> DVec3 {
        let spacing = DVec3::from(self.volume.spacing());
        let dx = DVec3::new(spacing.x, 0.0, 0.0);
        let dy = DVec3::new(0.0, spacing.y, 0.0);
        let dz = DVec3::new(0.0, 0.0, spacing.z);
        DVec3::new(
            (self.sample_world(world_pos + dx) - self.sample_world(world_pos - dx))
                * 0.5
                * self.inv_spacing.x,
            (self.sample_world(world_pos + dy) - self.sample_world(world_pos - dy))
                * 0.5
                * self.inv_spacing.y,
            (self.sample_world(world_pos + dz) - self.sample_world(world_pos - dz))
                * 0.5
                * self.inv_spacing.z,
        )
    }

    fn sample_grid(&self, grid: DVec3) -> f64 {
        let [nx, ny, nz] = self.volume.dims();
        let max = DVec3::new(
            nx.saturating_sub(1) as f64,
            ny.saturating_sub(1) as f64,
            nz.saturating_sub(1) as f64,
        );
        if !grid.is_finite() || grid.cmplt(DVec3::ZERO).any() || grid.cmpgt(max).any() {
            return self.outside;
        }

        let x0 = grid.x.floor() as usize;
        let y0 = grid.y.floor() as usize;
        let z0 = grid.z.floor() as usize;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let z1 = (z0 + 1).min(nz - 1);

        let fx = if x0 == x1 { 0.0 } else { grid.x - x0 as f64 };
        let fy = if y0 == y1 { 0.0 } else { grid.y - y0 as f64 };
        let fz = if z0 == z1 { 0.0 } else { grid.z - z0 as f64 };

        let values = self.volume.scalars();
        let at = |x, y, z| values[self.volume.value_index(x, y, z)];

        let c00 = lerp(at(x0, y0, z0), at(x1, y0, z0), fx);
        let c10 = lerp(at(x0, y1, z0), at(x1, y1, z0), fx);
        let c01 = lerp(at(x0, y0, z1), at(x1, y0, z1), fx);
        let c11 = lerp(at(x0, y1, z1), at(x1, y1, z1), fx);
        let c0 = lerp(c00, c10, fy);
        let c1 = lerp(c01, c11, fy);
        lerp(c0, c1, fz)
    }
}

fn safe_recip(value: f64) -> f64 {
    if value.abs() > 1.0e-12 {
        1.0 / value
    } else {
        0.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_grid_points() {
        let volume = ScalarVolume::from_fn("x", [3, 2, 2], |x, _, _| x as f64).unwrap();
        let sampler = VolumeSampler::new(&volume);
        assert!((sampler.sample_world(DVec3::new(1.25, 0.5, 0.5)) - 1.25).abs() < 1.0e-12);
        assert_eq!(sampler.sample_world(DVec3::new(2.0, 1.0, 1.0)), 2.0);
    }

    #[test]
    fn outside_the_grid_returns_outside_value() {
        let volume = ScalarVolume::from_fn("x", [2, 2, 2], |_, _, _| 1.0).unwrap();
        let sampler = VolumeSampler::new(&volume);
        assert_eq!(sampler.sample_world(DVec3::new(-0.1, 0.0, 0.0)), 0.0);
        assert_eq!(
            sampler.with_outside(-1.0).sample_world(DVec3::splat(3.0)),
            -1.0
        );
    }

    #[test]
    fn gradient_points_up_the_ramp() {
        let volume = ScalarVolume::from_fn("z", [4, 4, 4], |_, _, z| z as f64).unwrap();
        let gradient = VolumeSampler::new(&volume).gradient_world(DVec3::splat(1.5));
        assert!(gradient.abs_diff_eq(DVec3::new(0.0, 0.0, 1.0), 1.0e-12));
    }
}
