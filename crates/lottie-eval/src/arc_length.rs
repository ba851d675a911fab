//! Arc-length parameterization of cubic segments.

use std::ops::{Add, Mul, Sub};

use glam::{Vec2, Vec3};

use crate::geometry::{Cubic, PathGeometry};

pub trait ArcPoint: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> {
    fn distance_to(self, other: Self) -> f32;

    fn mix(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl ArcPoint for Vec2 {
    fn distance_to(self, other: Self) -> f32 {
        self.distance(other)
    }
}

impl ArcPoint for Vec3 {
    fn distance_to(self, other: Self) -> f32 {
        self.distance(other)
    }
}

pub fn cubic_point<P: ArcPoint>(c: &[P; 4], t: f32) -> P {
    let mt = 1.0 - t;
    c[0] * (mt * mt * mt)
        + c[1] * (3.0 * mt * mt * t)
        + c[2] * (3.0 * mt * t * t)
        + c[3] * (t * t * t)
}

/// de Casteljau split at `t`.
pub fn split<P: ArcPoint>(c: &[P; 4], t: f32) -> ([P; 4], [P; 4]) {
    let p01 = c[0].mix(c[1], t);
    let p12 = c[1].mix(c[2], t);
    let p23 = c[2].mix(c[3], t);
    let p012 = p01.mix(p12, t);
    let p123 = p12.mix(p23, t);
    let p0123 = p012.mix(p123, t);
    ([c[0], p01, p012, p0123], [p0123, p123, p23, c[3]])
}

/// The part of `c` between parameters `t0` and `t1`.
pub fn subdivide<P: ArcPoint>(c: &[P; 4], t0: f32, t1: f32) -> [P; 4] {
    let t0 = t0.clamp(0.0, 1.0);
    let t1 = t1.clamp(0.0, 1.0);
    if t1 <= 0.0 {
        return [c[0]; 4];
    }
    let head = if t1 >= 1.0 { *c } else { split(c, t1).0 };
    if t0 <= 0.0 {
        return head;
    }
    if t0 >= t1 {
        return [head[3]; 4];
    }
    split(&head, t0 / t1).1
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcSample<P> {
    /// Length travelled from the segment start up to this sample.
    pub length: f32,
    pub t: f32,
    pub point: P,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArcLengthTable<P> {
    samples: Vec<ArcSample<P>>,
    length: f32,
}

impl<P: ArcPoint> ArcLengthTable<P> {
    /// Samples `segments` evenly spaced parameters, both ends included.
    pub fn build(curve: &[P; 4], segments: usize) -> Self {
        let count = segments.max(2);
        let mut samples = Vec::with_capacity(count);
        let mut length = 0.0;
        let mut prev = curve[0];
        for k in 0..count {
            let t = k as f32 / (count - 1) as f32;
            let point = cubic_point(curve, t);
            if k > 0 {
                length += prev.distance_to(point);
            }
            samples.push(ArcSample { length, t, point });
            prev = point;
        }
        Self { samples, length }
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn samples(&self) -> &[ArcSample<P>] {
        &self.samples
    }

    // Index of the first sample at or beyond `distance`, never 0.
    fn bracket(&self, distance: f32) -> usize {
        let idx = self.samples.partition_point(|s| s.length < distance);
        idx.clamp(1, self.samples.len() - 1)
    }

    /// Curve parameter at `perc` of the arc length.
    pub fn t_at_fraction(&self, perc: f32) -> f32 {
        if perc <= 0.0 || self.length <= 0.0 {
            return 0.0;
        }
        if perc >= 1.0 {
            return 1.0;
        }
        let distance = self.length * perc;
        let hi = self.bracket(distance);
        let (a, b) = (&self.samples[hi - 1], &self.samples[hi]);
        let span = b.length - a.length;
        if span <= 0.0 {
            return a.t;
        }
        a.t + (b.t - a.t) * (distance - a.length) / span
    }

    pub fn point_at_length(&self, distance: f32) -> P {
        let first = &self.samples[0];
        if distance <= 0.0 || self.length <= 0.0 {
            return first.point;
        }
        if distance >= self.length {
            return self.samples[self.samples.len() - 1].point;
        }
        let hi = self.bracket(distance);
        let (a, b) = (&self.samples[hi - 1], &self.samples[hi]);
        let span = b.length - a.length;
        if span <= 0.0 {
            return a.point;
        }
        a.point.mix(b.point, (distance - a.length) / span)
    }

    pub fn point_at_fraction(&self, perc: f32) -> P {
        self.point_at_length(self.length * perc)
    }
}

/// Per-segment tables of one path.
#[derive(Clone, Debug, PartialEq)]
pub struct PathArcLength {
    pub segments: Vec<ArcLengthTable<Vec2>>,
    pub total: f32,
}

impl PathArcLength {
    pub fn build(path: &PathGeometry, quality: usize) -> Self {
        let segments: Vec<_> = path
            .segments()
            .map(|c| ArcLengthTable::build(&c, quality))
            .collect();
        let total = segments.iter().map(|s| s.length()).sum();
        Self { segments, total }
    }
}

/// Clips `curve` to the arc-length window `[start_perc, end_perc]`.
pub fn segment_between(
    curve: &Cubic,
    table: &ArcLengthTable<Vec2>,
    start_perc: f32,
    end_perc: f32,
) -> Cubic {
    let t0 = table.t_at_fraction(start_perc);
    let t1 = table.t_at_fraction(end_perc);
    subdivide(curve, t0, t1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(a: Vec2, b: Vec2) -> Cubic {
        [a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b]
    }

    #[test]
    fn collinear_curve_length_is_chord() {
        let curve = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(3.0, 0.0),
        ];
        let table = ArcLengthTable::build(&curve, 150);
        assert!((table.length() - 3.0).abs() < 1e-3, "{}", table.length());
        assert_eq!(table.samples().len(), 150);
        assert_eq!(table.samples()[0].length, 0.0);
    }

    #[test]
    fn fraction_lookup_on_uniform_line() {
        let table = ArcLengthTable::build(&line(Vec2::ZERO, Vec2::new(10.0, 0.0)), 150);
        assert!((table.t_at_fraction(0.5) - 0.5).abs() < 1e-3);
        assert_eq!(table.t_at_fraction(0.0), 0.0);
        assert_eq!(table.t_at_fraction(1.0), 1.0);
        let p = table.point_at_fraction(0.25);
        assert!((p - Vec2::new(2.5, 0.0)).length() < 1e-2, "{p:?}");
    }

    #[test]
    fn uneven_parameterization_is_corrected() {
        // Control points bunched near the end: t=0.5 is far from the middle,
        // but half the arc length is still the geometric midpoint.
        let curve = [
            Vec2::new(0.0, 0.0),
            Vec2::new(9.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 0.0),
        ];
        let table = ArcLengthTable::build(&curve, 150);
        assert!((cubic_point(&curve, 0.5).x - 5.0).abs() > 1.0);
        let mid = cubic_point(&curve, table.t_at_fraction(0.5));
        assert!((mid.x - 5.0).abs() < 0.05, "{mid:?}");
    }

    #[test]
    fn subdivide_keeps_the_curve() {
        let curve = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(10.0, 0.0),
        ];
        let piece = subdivide(&curve, 0.25, 0.75);
        assert!((piece[0] - cubic_point(&curve, 0.25)).length() < 1e-4);
        assert!((piece[3] - cubic_point(&curve, 0.75)).length() < 1e-4);
        let mid = cubic_point(&piece, 0.5);
        assert!((mid - cubic_point(&curve, 0.5)).length() < 1e-4);
        assert_eq!(subdivide(&curve, 0.0, 1.0), curve);
        assert_eq!(subdivide(&curve, 0.0, 0.0), [curve[0]; 4]);
    }

    #[test]
    fn segment_between_uses_arc_fractions() {
        let curve = line(Vec2::ZERO, Vec2::new(8.0, 0.0));
        let table = ArcLengthTable::build(&curve, 150);
        let piece = segment_between(&curve, &table, 0.25, 0.5);
        assert!((piece[0].x - 2.0).abs() < 1e-2);
        assert!((piece[3].x - 4.0).abs() < 1e-2);
    }

    #[test]
    fn path_totals_sum_segments() {
        let mut path = PathGeometry::new();
        path.closed = true;
        for v in [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::ONE, Vec2::new(0.0, 1.0)] {
            path.push_triple(v, v, v);
        }
        let arc = PathArcLength::build(&path, 50);
        assert_eq!(arc.segments.len(), 4);
        assert!((arc.total - 4.0).abs() < 1e-4);
    }
}
