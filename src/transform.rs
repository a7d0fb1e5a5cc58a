//! Composable translation / rotation / scale around a pivot.
//!
//! A [`PivotTransform`] keeps its three components apart so each can be
//! nudged or replaced on its own, and recomposes them whenever the full matrix
//! is needed. Rotation and scale act about a pivot; translation is applied in
//! world space afterwards:
//!
//! ```text
//! M = Translation · T(pivot) · Scale · Rotation · T(-pivot)
//! ```
//!
//! read right to left: move the pivot to the origin, rotate, scale, move the
//! pivot back, translate.
//!
//! # Incremental vs. absolute
//!
//! `*_by` methods compose with what is already there. `set_*` methods replace
//! one component and leave the other two alone.
//!
//! Scale is the odd one out: [`PivotTransform::scale_by`] *adds* the deltas to
//! the current per-axis factors rather than multiplying them, so
//! `scale_by(d)` followed by `scale_by(-d)` always lands back where it started.
//!
//! # Example
//!
//! ```
//! use meshpick::{DVec3, PivotTransform};
//!
//! let mut transform = PivotTransform::with_pivot(DVec3::new(1.0, 0.0, 0.0));
//! transform.scale_by(1.0, 1.0, 1.0, transform.pivot()); // 1 + 1 = 2x
//! transform.translate_by(DVec3::new(0.0, 5.0, 0.0));
//!
//! // the pivot itself does not move under scale, only under translation
//! let p = transform.transform_point(DVec3::new(1.0, 0.0, 0.0));
//! assert!(p.abs_diff_eq(DVec3::new(1.0, 5.0, 0.0), 1e-12));
//! ```

use glam::{DMat3, DMat4, DVec3};

/// Translation, rotation, and scale composed around a pivot point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PivotTransform {
    /// Default pivot, in the owner's local space.
    pivot: DVec3,
    translation: DMat4,
    rotation: DMat4,
    scale: DMat4,
}

impl Default for PivotTransform {
    fn default() -> Self {
        Self::with_pivot(DVec3::ZERO)
    }
}

impl PivotTransform {
    /// Identity transform pivoting about the local origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity transform pivoting about `pivot` (normally the owner's
    /// centroid).
    pub fn with_pivot(pivot: DVec3) -> Self {
        Self {
            pivot,
            translation: DMat4::IDENTITY,
            rotation: DMat4::IDENTITY,
            scale: DMat4::IDENTITY,
        }
    }

    /// The default pivot in local space.
    #[inline]
    pub fn pivot(&self) -> DVec3 {
        self.pivot
    }

    pub fn set_pivot(&mut self, pivot: DVec3) {
        self.pivot = pivot;
    }

    /// The pivot where it currently sits in world space.
    pub fn world_pivot(&self) -> DVec3 {
        self.transform_point(self.pivot)
    }

    /// The composed matrix.
    pub fn matrix(&self) -> DMat4 {
        self.translation * self.scale * self.rotation
    }

    /// Replaces the whole transform with `matrix`.
    ///
    /// The matrix is split into translation, rotation, and per-axis scale
    /// about the current pivot. Matrices produced by [`PivotTransform::matrix`]
    /// split exactly (up to rounding); a matrix containing skew that cannot be
    /// written as scale-after-rotation is approximated.
    pub fn set_matrix(&mut self, matrix: DMat4) {
        let linear = DMat3::from_mat4(matrix);

        // linear = S · R, so each row of `linear` is a scaled row of R
        let rows = [linear.row(0), linear.row(1), linear.row(2)];
        let mut factors = DVec3::new(rows[0].length(), rows[1].length(), rows[2].length());
        if linear.determinant() < 0.0 {
            factors.x = -factors.x;
        }

        let unit_rows: [DVec3; 3] = std::array::from_fn(|i| {
            if factors[i].abs() > f64::EPSILON {
                rows[i] / factors[i]
            } else {
                DMat3::IDENTITY.row(i)
            }
        });
        let rotation = DMat3::from_cols(unit_rows[0], unit_rows[1], unit_rows[2]).transpose();

        let p = self.pivot;
        let translation = matrix.w_axis.truncate() - p + linear * p;

        self.rotation = about(p, DMat4::from_mat3(rotation));
        self.scale = about(p, DMat4::from_scale(factors));
        self.translation = DMat4::from_translation(translation);
    }

    /// Restores the identity, keeping the pivot.
    pub fn reset(&mut self) {
        *self = Self::with_pivot(self.pivot);
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.matrix().transform_point3(point)
    }

    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.matrix().transform_vector3(vector)
    }

    /// Current world-space offset.
    pub fn translation(&self) -> DVec3 {
        self.translation.w_axis.truncate()
    }

    /// Current rotation, without its pivot offset.
    pub fn rotation(&self) -> DMat3 {
        DMat3::from_mat4(self.rotation)
    }

    /// Current per-axis scale factors.
    pub fn scale_factors(&self) -> DVec3 {
        DVec3::new(self.scale.x_axis.x, self.scale.y_axis.y, self.scale.z_axis.z)
    }

    /// Adds `delta` to the current translation.
    pub fn translate_by(&mut self, delta: DVec3) {
        self.translation = DMat4::from_translation(delta) * self.translation;
    }

    /// Rotates further by the given angles (radians) about `pivot`.
    ///
    /// The increment rotates about X, then Y, then Z, and is applied after the
    /// rotation already in place.
    pub fn rotate_by(&mut self, rx: f64, ry: f64, rz: f64, pivot: DVec3) {
        self.rotation = about(pivot, euler_xyz(rx, ry, rz)) * self.rotation;
    }

    /// Adds `(sx, sy, sz)` to the current scale factors and rebuilds the scale
    /// about `pivot`.
    pub fn scale_by(&mut self, sx: f64, sy: f64, sz: f64, pivot: DVec3) {
        let factors = self.scale_factors() + DVec3::new(sx, sy, sz);
        self.scale = about(pivot, DMat4::from_scale(factors));
    }

    /// Replaces the translation.
    pub fn set_translation(&mut self, translation: DVec3) {
        self.translation = DMat4::from_translation(translation);
    }

    /// Replaces the rotation with the given angles (radians) about `pivot`.
    pub fn set_rotation(&mut self, rx: f64, ry: f64, rz: f64, pivot: DVec3) {
        self.rotation = about(pivot, euler_xyz(rx, ry, rz));
    }

    /// Replaces the scale factors, scaling about `pivot`.
    pub fn set_scale(&mut self, sx: f64, sy: f64, sz: f64, pivot: DVec3) {
        self.scale = about(pivot, DMat4::from_scale(DVec3::new(sx, sy, sz)));
    }
}

/// X first, then Y, then Z.
fn euler_xyz(rx: f64, ry: f64, rz: f64) -> DMat4 {
    DMat4::from_rotation_z(rz) * DMat4::from_rotation_y(ry) * DMat4::from_rotation_x(rx)
}

/// Conjugates `m` so it acts about `pivot` instead of the origin.
fn about(pivot: DVec3, m: DMat4) -> DMat4 {
    DMat4::from_translation(pivot) * m * DMat4::from_translation(-pivot)
}
