use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Composed map transform, one value per animated channel.
///
/// Applied to the map layer about `origin` in this order: translate, scale,
/// perspective + tilt (when `tilt_height` is non-zero), vertical offset,
/// rotation. All lengths are layer pixels; angles are degrees.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MapTransform {
    pub origin_x: f32,
    pub origin_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
    pub tilt_height: f32,
    pub tilt_angle: f32,
    pub vertical_offset: f32,
    pub rotate: f32,
}

impl MapTransform {
    pub const FLOATS: usize = 9;

    /// Channel vector fed to the map transition.
    pub fn to_values(&self) -> [f32; Self::FLOATS] {
        bytemuck::cast(*self)
    }

    pub fn from_values(values: &[f32]) -> Option<Self> {
        let arr: [f32; Self::FLOATS] = values.try_into().ok()?;
        Some(bytemuck::cast(arr))
    }

    /// Full 3D matrix, equivalent to the CSS transform the surface applies.
    pub fn matrix(&self) -> Mat4 {
        let origin = Vec3::new(self.origin_x, self.origin_y, 0.0);
        let mut m = Mat4::from_translation(origin)
            * Mat4::from_translation(Vec3::new(self.translate_x, self.translate_y, 0.0))
            * Mat4::from_scale(Vec3::new(self.scale, self.scale, 1.0));
        if self.tilt_height != 0.0 {
            let mut perspective = Mat4::IDENTITY;
            perspective.z_axis.w = -1.0 / self.tilt_height;
            m = m * perspective * Mat4::from_rotation_x(self.tilt_angle.to_radians());
        }
        if self.vertical_offset != 0.0 {
            m *= Mat4::from_translation(Vec3::new(0.0, self.vertical_offset, 0.0));
        }
        m * Mat4::from_rotation_z(self.rotate.to_radians()) * Mat4::from_translation(-origin)
    }

    /// Project a point on the map layer into surface coordinates.
    pub fn project(&self, point: Vec2) -> Vec2 {
        project_with(&self.matrix(), point)
    }
}

/// Project with a precomputed [`MapTransform::matrix`].
pub fn project_with(matrix: &Mat4, point: Vec2) -> Vec2 {
    let p = *matrix * Vec4::new(point.x, point.y, 0.0, 1.0);
    if p.w.abs() > f32::EPSILON {
        Vec2::new(p.x / p.w, p.y / p.w)
    } else {
        Vec2::new(p.x, p.y)
    }
}
