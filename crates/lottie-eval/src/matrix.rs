//! 4x4 homogeneous transform in row-vector convention.
//!
//! Points are rows: `p' = p · M`, so the translation lives in entries 12..14 and
//! `compose(other)` (`self = self · other`) applies `other` *after* `self`. A chain
//! such as `translate(-anchor).scale(..).rotate_z(..).translate(pos)` therefore
//! reads in the order the operations hit a point.

use std::cell::Cell;
use std::fmt::Write as _;

use glam::{Mat4, Vec2, Vec3};

use crate::errors::{EvalError, Result};

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

const SINGULAR_EPSILON: f32 = 1e-9;

#[derive(Clone, Debug)]
pub struct Matrix {
    props: [f32; 16],
    // None until `is_identity` is asked after the last `compose`.
    identity: Cell<Option<bool>>,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.props == other.props
    }
}

impl Matrix {
    pub fn new() -> Self {
        Self {
            props: IDENTITY,
            identity: Cell::new(Some(true)),
        }
    }

    pub fn from_props(props: [f32; 16]) -> Self {
        Self {
            props,
            identity: Cell::new(None),
        }
    }

    pub fn props(&self) -> &[f32; 16] {
        &self.props
    }

    pub fn reset(&mut self) -> &mut Self {
        self.props = IDENTITY;
        self.identity.set(Some(true));
        self
    }

    /// Right-multiplies by `other` (row-major). The only mutator that touches the
    /// identity cache; every other operation goes through here or `reset`.
    pub fn compose(&mut self, other: &[f32; 16]) -> &mut Self {
        if *other == IDENTITY {
            return self;
        }
        let a = self.props;
        let b = other;
        let mut out = [0.0f32; 16];
        for row in 0..4 {
            let r = row * 4;
            for col in 0..4 {
                out[r + col] = a[r] * b[col]
                    + a[r + 1] * b[4 + col]
                    + a[r + 2] * b[8 + col]
                    + a[r + 3] * b[12 + col];
            }
        }
        self.props = out;
        self.identity.set(None);
        self
    }

    pub fn multiply(&mut self, other: &Matrix) -> &mut Self {
        let props = other.props;
        self.compose(&props)
    }

    pub fn translate(&mut self, tx: f32, ty: f32, tz: f32) -> &mut Self {
        if tx == 0.0 && ty == 0.0 && tz == 0.0 {
            return self;
        }
        self.compose(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            tx, ty, tz, 1.0,
        ])
    }

    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) -> &mut Self {
        if sx == 1.0 && sy == 1.0 && sz == 1.0 {
            return self;
        }
        self.compose(&[
            sx, 0.0, 0.0, 0.0, //
            0.0, sy, 0.0, 0.0, //
            0.0, 0.0, sz, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation in the XY plane, radians. Positive angles turn +X towards +Y
    /// (clockwise on a y-down canvas).
    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        if angle == 0.0 {
            return self;
        }
        let (s, c) = angle.sin_cos();
        self.compose(&[
            c, s, 0.0, 0.0, //
            -s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn rotate_x(&mut self, angle: f32) -> &mut Self {
        if angle == 0.0 {
            return self;
        }
        let (s, c) = angle.sin_cos();
        self.compose(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, c, s, 0.0, //
            0.0, -s, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn rotate_y(&mut self, angle: f32) -> &mut Self {
        if angle == 0.0 {
            return self;
        }
        let (s, c) = angle.sin_cos();
        self.compose(&[
            c, 0.0, -s, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            s, 0.0, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Shear by `ax` along X and `ay` along Y, radians.
    pub fn skew(&mut self, ax: f32, ay: f32) -> &mut Self {
        if ax == 0.0 && ay == 0.0 {
            return self;
        }
        let (tx, ty) = (ax.tan(), ay.tan());
        self.compose(&[
            1.0, ty, 0.0, 0.0, //
            tx, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Shear by `ax` along an axis tilted `axis` radians from X.
    pub fn skew_from_axis(&mut self, ax: f32, axis: f32) -> &mut Self {
        if ax == 0.0 {
            return self;
        }
        self.rotate_z(axis);
        self.skew(ax, 0.0);
        self.rotate_z(-axis)
    }

    pub fn is_identity(&self) -> bool {
        if let Some(cached) = self.identity.get() {
            return cached;
        }
        let identity = self.props == IDENTITY;
        self.identity.set(Some(identity));
        identity
    }

    pub fn apply_to_point(&self, p: Vec3) -> Vec3 {
        let m = &self.props;
        Vec3::new(
            p.x * m[0] + p.y * m[4] + p.z * m[8] + m[12],
            p.x * m[1] + p.y * m[5] + p.z * m[9] + m[13],
            p.x * m[2] + p.y * m[6] + p.z * m[10] + m[14],
        )
    }

    pub fn apply_to_point_2d(&self, p: Vec2) -> Vec2 {
        let m = &self.props;
        Vec2::new(
            p.x * m[0] + p.y * m[4] + m[12],
            p.x * m[1] + p.y * m[5] + m[13],
        )
    }

    /// Like `apply_to_point_2d` without the translation.
    pub fn apply_to_vector_2d(&self, v: Vec2) -> Vec2 {
        let m = &self.props;
        Vec2::new(v.x * m[0] + v.y * m[4], v.x * m[1] + v.y * m[5])
    }

    /// Maps a point back through the 2D affine part of the matrix.
    pub fn apply_2d_inverse(&self, p: Vec2) -> Result<Vec2> {
        let m = &self.props;
        let det = m[0] * m[5] - m[1] * m[4];
        if det.abs() < SINGULAR_EPSILON {
            return Err(EvalError::SingularMatrix(det));
        }
        let dx = p.x - m[12];
        let dy = p.y - m[13];
        Ok(Vec2::new(
            (dx * m[5] - dy * m[4]) / det,
            (dy * m[0] - dx * m[1]) / det,
        ))
    }

    pub fn to_css_matrix3d(&self) -> String {
        let mut out = String::from("matrix3d(");
        for (i, v) in self.props.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}", round_prop(*v));
        }
        out.push(')');
        out
    }

    pub fn to_css_matrix(&self) -> String {
        let m = &self.props;
        format!(
            "matrix({},{},{},{},{},{})",
            round_prop(m[0]),
            round_prop(m[1]),
            round_prop(m[4]),
            round_prop(m[5]),
            round_prop(m[12]),
            round_prop(m[13])
        )
    }

    /// Column-vector form for backends built on glam.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array(&self.props)
    }

    pub fn from_mat4(m: &Mat4) -> Self {
        Self::from_props(m.to_cols_array())
    }

    pub fn to_affine(&self) -> kurbo::Affine {
        let m = &self.props;
        kurbo::Affine::new([
            m[0] as f64,
            m[1] as f64,
            m[4] as f64,
            m[5] as f64,
            m[12] as f64,
            m[13] as f64,
        ])
    }
}

fn round_prop(v: f32) -> f32 {
    (v * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn reset_is_identity_and_compose_invalidates() {
        let mut m = Matrix::new();
        assert!(m.is_identity());
        m.translate(10.0, 0.0, 0.0);
        assert!(!m.is_identity());
        m.reset();
        assert!(m.is_identity());

        // Composing something that cancels out is recomputed, not assumed.
        m.translate(5.0, 0.0, 0.0).translate(-5.0, 0.0, 0.0);
        assert!(m.is_identity());
    }

    #[test]
    fn operations_apply_in_call_order() {
        let mut m = Matrix::new();
        m.translate(-10.0, 0.0, 0.0).scale(2.0, 2.0, 1.0).translate(100.0, 50.0, 0.0);
        let p = m.apply_to_point_2d(Vec2::new(10.0, 5.0));
        assert!(approx(p, Vec2::new(100.0, 60.0)), "{p:?}");
    }

    #[test]
    fn rotate_z_turns_x_towards_y() {
        let mut m = Matrix::new();
        m.rotate_z(FRAC_PI_2);
        let p = m.apply_to_point_2d(Vec2::new(1.0, 0.0));
        assert!(approx(p, Vec2::new(0.0, 1.0)), "{p:?}");
    }

    #[test]
    fn skew_shears_each_axis_by_the_other() {
        let mut m = Matrix::new();
        m.skew(FRAC_PI_4, 0.0);
        let p = m.apply_to_point_2d(Vec2::new(0.0, 2.0));
        assert!(approx(p, Vec2::new(2.0, 2.0)), "{p:?}");

        let mut m = Matrix::new();
        m.skew(0.0, FRAC_PI_4);
        let p = m.apply_to_point_2d(Vec2::new(3.0, 0.0));
        assert!(approx(p, Vec2::new(3.0, 3.0)), "{p:?}");
    }

    #[test]
    fn inverse_round_trips() {
        let mut m = Matrix::new();
        m.translate(-3.0, 4.0, 0.0)
            .scale(1.5, 0.5, 1.0)
            .skew_from_axis(0.3, 0.7)
            .rotate_z(1.1)
            .translate(20.0, -7.0, 0.0);
        let p = Vec2::new(12.5, -3.25);
        let back = m.apply_2d_inverse(m.apply_to_point_2d(p)).unwrap();
        assert!(approx(back, p), "{back:?}");
    }

    #[test]
    fn singular_inverse_is_reported() {
        let mut m = Matrix::new();
        m.scale(0.0, 1.0, 1.0);
        assert!(matches!(
            m.apply_2d_inverse(Vec2::ONE),
            Err(EvalError::SingularMatrix(_))
        ));
    }

    #[test]
    fn serializations() {
        let mut m = Matrix::new();
        m.translate(1.5, -2.0, 0.0);
        assert_eq!(m.to_css_matrix(), "matrix(1,0,0,1,1.5,-2)");
        assert!(m.to_css_matrix3d().starts_with("matrix3d(1,0,0,0,"));
        assert!(m.to_css_matrix3d().ends_with(",1.5,-2,0,1)"));
    }

    #[test]
    fn glam_and_kurbo_agree() {
        let mut m = Matrix::new();
        m.scale(2.0, 3.0, 1.0).rotate_z(0.4).translate(7.0, 9.0, 0.0);
        let p = Vec2::new(3.0, -1.0);
        let ours = m.apply_to_point_2d(p);
        let theirs = m.to_mat4().transform_point3(p.extend(0.0));
        assert!(approx(ours, theirs.truncate()));
        let k = m.to_affine() * kurbo::Point::new(3.0, -1.0);
        assert!(approx(ours, Vec2::new(k.x as f32, k.y as f32)));
        assert_eq!(Matrix::from_mat4(&m.to_mat4()), m);
    }
}
