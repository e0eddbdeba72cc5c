use glam::{DMat3, DQuat, DVec3, EulerRot};

use crate::Bounds;

pub const DEFAULT_VIEW_ANGLE: f64 = 30.0;
pub const VIEW_UP_ALIGNMENT_THRESHOLD: f64 = 0.95;

/// Restorable snapshot of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: DVec3,
    pub focal_point: DVec3,
    pub view_up: DVec3,
    pub distance: f64,
    pub clipping_range: [f64; 2],
    /// Euler angles (x, y, z) in degrees of the view rotation.
    pub orientation: [f64; 3],
}

/// Which up vector `repair_view_up` picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpChoice {
    PolarZ,
    StandardY,
}

/// Orbit camera with the azimuth/elevation semantics of classic
/// scientific-visualization toolkits: rotations pivot around the focal point,
/// and elevation does not touch the up vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: DVec3,
    focal_point: DVec3,
    view_up: DVec3,
    view_angle: f64,
    clipping_range: [f64; 2],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 1.0),
            focal_point: DVec3::ZERO,
            view_up: DVec3::Y,
            view_angle: DEFAULT_VIEW_ANGLE,
            clipping_range: [0.01, 1000.01],
        }
    }
}

impl Camera {
    pub fn new(position: DVec3, focal_point: DVec3, view_up: DVec3) -> Self {
        Self {
            position,
            focal_point,
            view_up: view_up.normalize_or_zero(),
            ..Self::default()
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn focal_point(&self) -> DVec3 {
        self.focal_point
    }

    pub fn view_up(&self) -> DVec3 {
        self.view_up
    }

    pub fn view_angle(&self) -> f64 {
        self.view_angle
    }

    pub fn clipping_range(&self) -> [f64; 2] {
        self.clipping_range
    }

    pub fn set_view_up(&mut self, view_up: DVec3) {
        self.view_up = view_up.normalize_or_zero();
    }

    pub fn set_view_angle(&mut self, degrees: f64) {
        self.view_angle = degrees.clamp(0.01, 179.0);
    }

    pub fn distance(&self) -> f64 {
        (self.position - self.focal_point).length()
    }

    pub fn direction_of_projection(&self) -> DVec3 {
        (self.focal_point - self.position).normalize_or_zero()
    }

    pub fn view_plane_normal(&self) -> DVec3 {
        -self.direction_of_projection()
    }

    /// Camera right vector; zero when the up vector is parallel to the view
    /// direction.
    pub fn right(&self) -> DVec3 {
        self.direction_of_projection()
            .cross(self.view_up)
            .normalize_or_zero()
    }

    /// Rotates the position about the view-up axis centred on the focal point.
    pub fn azimuth(&mut self, degrees: f64) {
        let axis = self.view_up.normalize_or_zero();
        if axis == DVec3::ZERO {
            return;
        }
        self.rotate_position(axis, degrees);
    }

    /// Rotates the position about the camera right axis centred on the focal
    /// point. The up vector is left as it was, so large elevations can leave
    /// it parallel to the view direction.
    pub fn elevation(&mut self, degrees: f64) {
        let axis = -self.right();
        if axis == DVec3::ZERO {
            return;
        }
        self.rotate_position(axis, degrees);
    }

    /// Moves the camera towards the focal point; factors above one move closer.
    pub fn dolly(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let distance = self.distance() / factor;
        self.position = self.focal_point - self.direction_of_projection() * distance;
    }

    /// Narrows the view angle; factors above one zoom in.
    pub fn zoom(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        self.set_view_angle(self.view_angle / factor);
    }

    /// Re-derives the up vector so it is perpendicular to the view direction.
    pub fn orthogonalize_view_up(&mut self) {
        let right = self.right();
        if right == DVec3::ZERO {
            return;
        }
        self.view_up = right.cross(self.direction_of_projection()).normalize_or_zero();
    }

    /// Substitutes a safe up vector: `+Z` when the current one nearly lines up
    /// with the view plane normal, `+Y` otherwise.
    pub fn repair_view_up(&mut self, threshold: f64) -> ViewUpChoice {
        let cos = self
            .view_up
            .normalize_or_zero()
            .dot(self.view_plane_normal());
        if cos.abs() > threshold {
            self.view_up = DVec3::Z;
            ViewUpChoice::PolarZ
        } else {
            self.view_up = DVec3::Y;
            ViewUpChoice::StandardY
        }
    }

    /// Places the camera so the whole box is visible, keeping the current
    /// viewing direction.
    pub fn reset(&mut self, bounds: Bounds) {
        if !bounds.is_valid() {
            return;
        }
        let center = bounds.center();
        let mut radius = bounds.diagonal() * 0.5;
        if radius <= 0.0 {
            radius = 0.5;
        }
        let mut normal = self.view_plane_normal();
        if normal == DVec3::ZERO {
            normal = DVec3::Z;
        }
        if self.view_up.normalize_or_zero().dot(normal).abs() > 0.999 {
            let up = self.view_up;
            self.view_up = DVec3::new(-up.z, up.x, up.y);
        }
        let half_angle = (self.view_angle.to_radians() * 0.5).max(1.0e-6);
        let distance = radius / half_angle.sin();
        self.focal_point = center;
        self.position = center + normal * distance;
        self.reset_clipping_range(bounds);
    }

    pub fn reset_clipping_range(&mut self, bounds: Bounds) {
        if !bounds.is_valid() {
            return;
        }
        let radius = (bounds.diagonal() * 0.5).max(1.0e-6);
        let along = (bounds.center() - self.position).dot(self.direction_of_projection());
        let far = (along + radius) * 1.01;
        let near = (along - radius).max(far * 1.0e-3);
        self.clipping_range = [near, far.max(near + 1.0e-6)];
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            focal_point: self.focal_point,
            view_up: self.view_up,
            distance: self.distance(),
            clipping_range: self.clipping_range,
            orientation: self.orientation(),
        }
    }

    pub fn restore(&mut self, pose: &CameraPose) {
        self.focal_point = pose.focal_point;
        self.position = pose.position;
        self.view_up = pose.view_up;
        self.clipping_range = pose.clipping_range;
    }

    /// Restores `home`, then applies azimuth, elevation and the view-up
    /// repair. Every call starts from the same reference, so repeated calls
    /// never compound.
    pub fn orient_from(
        &mut self,
        home: &CameraPose,
        azimuth: f64,
        elevation: f64,
        threshold: f64,
    ) -> ViewUpChoice {
        self.restore(home);
        self.azimuth(azimuth);
        self.elevation(elevation);
        self.repair_view_up(threshold)
    }

    /// Interactive trackball orbit: horizontal motion drives azimuth, vertical
    /// motion drives elevation.
    pub fn orbit(&mut self, azimuth: f64, elevation: f64) {
        self.azimuth(azimuth);
        self.elevation(elevation);
        self.orthogonalize_view_up();
    }

    /// Direction of the ray through normalized device coordinates
    /// `(u, v) ∈ [-1, 1]²`, `v` pointing up.
    pub fn view_ray(&self, u: f64, v: f64, aspect: f64) -> DVec3 {
        let forward = self.direction_of_projection();
        let (right, up) = self.screen_basis();
        let tan_half = (self.view_angle.to_radians() * 0.5).tan();
        (forward + right * (u * tan_half * aspect) + up * (v * tan_half)).normalize_or_zero()
    }

    fn screen_basis(&self) -> (DVec3, DVec3) {
        let forward = self.direction_of_projection();
        let mut right = self.right();
        if right == DVec3::ZERO {
            let fallback = if forward.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
            right = forward.cross(fallback).normalize_or_zero();
        }
        let up = right.cross(forward).normalize_or_zero();
        (right, up)
    }

    fn orientation(&self) -> [f64; 3] {
        let forward = self.direction_of_projection();
        if forward == DVec3::ZERO {
            return [0.0; 3];
        }
        let (right, up) = self.screen_basis();
        let basis = DMat3::from_cols(right, up, -forward);
        let (y, x, z) = DQuat::from_mat3(&basis).to_euler(EulerRot::YXZ);
        [x.to_degrees(), y.to_degrees(), z.to_degrees()]
    }

    fn rotate_position(&mut self, axis: DVec3, degrees: f64) {
        let rotation = DQuat::from_axis_angle(axis, degrees.to_radians());
        self.position = self.focal_point + rotation * (self.position - self.focal_point);
    }
}
