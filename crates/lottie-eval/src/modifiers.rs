use std::mem;

use glam::Vec2;
use lottie_data::model::{RepeaterShape, RoundCornersShape, TrimShape};
use tracing::trace;

use crate::animatable::{PropertyOptions, ScalarProperty, PERCENT};
use crate::arc_length::{segment_between, PathArcLength};
use crate::easing::EasingCache;
use crate::errors::Result;
use crate::geometry::{Cubic, PathGeometry, ShapeCollection};
use crate::matrix::Matrix;
use crate::pool::GeometryPool;
use crate::shapes::ROUND_CORNER;
use crate::transform::{TransformEvaluator, TransformOptions, TransformParts};
use crate::FrameContext;

/// A path operation that rewrites the collections of the shapes it is bound to.
pub trait ShapeModifier {
    /// Brings parameters up to date. Returns whether any of them changed.
    fn update(&mut self, ctx: &FrameContext) -> bool;

    /// Replaces `collections[t]` for every `t` in `targets` with the modified geometry.
    fn apply(
        &mut self,
        collections: &mut [ShapeCollection],
        targets: &[usize],
        pool: &mut GeometryPool,
    );
}

/// Swaps a target's collection for the result of `f`, returning the old one to the pool.
fn replace_collection(
    collections: &mut [ShapeCollection],
    target: usize,
    pool: &mut GeometryPool,
    f: impl FnOnce(&ShapeCollection, &mut GeometryPool) -> ShapeCollection,
) {
    let input = mem::take(&mut collections[target]);
    let output = f(&input, pool);
    pool.release_collection(input);
    collections[target] = output;
}

// ================================================================================================
// Trim
// ================================================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimMode {
    /// Every shape is trimmed along its own length.
    Simultaneous,
    /// The window runs across all trimmed shapes as if they were one path.
    Individual,
}

/// Normalized trim result.
#[derive(Clone, Debug, PartialEq)]
pub enum TrimWindows {
    Full,
    Empty,
    /// One or two `[start, end]` fractions; two when the window wraps through 0.
    Parts(Vec<(f32, f32)>),
}

/// `start`/`end` in 0..1, `offset` in degrees (360 is one full turn along the path).
pub fn trim_windows(start: f32, end: f32, offset: f32, precision: f32) -> TrimWindows {
    let mut o = (offset % 360.0) / 360.0;
    if o < 0.0 {
        o += 1.0;
    }
    let s = start.clamp(0.0, 1.0) + o;
    let mut e = end.clamp(0.0, 1.0) + o;
    // A start past the end runs forward through the seam.
    if start > end {
        e += 1.0;
    }
    // Whole steps keep the comparisons exact.
    let steps = (1.0 / precision).round();
    let mut s = (s * steps).round();
    let mut e = (e * steps).round();
    if s >= steps {
        s -= steps;
        e -= steps;
    }
    if s == e {
        TrimWindows::Empty
    } else if e - s >= steps {
        TrimWindows::Full
    } else if e <= steps {
        TrimWindows::Parts(vec![(s / steps, e / steps)])
    } else {
        TrimWindows::Parts(vec![(s / steps, 1.0), (0.0, (e - steps) / steps)])
    }
}

#[derive(Clone, Debug)]
pub struct TrimModifier {
    start: ScalarProperty,
    end: ScalarProperty,
    offset: ScalarProperty,
    mode: TrimMode,
    quality: usize,
    precision: f32,
}

const MIN_OVERLAP: f32 = 1e-6;

impl TrimModifier {
    pub fn from_model(model: &TrimShape, cache: &mut EasingCache) -> Self {
        let percent = PropertyOptions {
            multiplier: PERCENT,
            ..PropertyOptions::default()
        };
        let config = *cache.config();
        Self {
            start: ScalarProperty::scalar(&model.s, 0.0, percent, cache),
            end: ScalarProperty::scalar(&model.e, 100.0, percent, cache),
            offset: ScalarProperty::scalar(&model.o, 0.0, PropertyOptions::default(), cache),
            mode: if model.m == 2 {
                TrimMode::Individual
            } else {
                TrimMode::Simultaneous
            },
            quality: config.curve_segments,
            precision: config.trim_precision,
        }
    }

    pub fn windows(&self) -> TrimWindows {
        trim_windows(
            self.start.value(),
            self.end.value(),
            self.offset.value(),
            self.precision,
        )
    }

    pub fn mode(&self) -> TrimMode {
        self.mode
    }

    // Trims every path of `group` as one run of length `total`.
    fn trim_group(
        &self,
        group: &[usize],
        collections: &mut [ShapeCollection],
        parts: &[(f32, f32)],
        pool: &mut GeometryPool,
    ) {
        let arcs: Vec<Vec<PathArcLength>> = group
            .iter()
            .map(|&t| {
                collections[t]
                    .paths
                    .iter()
                    .map(|p| PathArcLength::build(p, self.quality))
                    .collect()
            })
            .collect();
        let total: f32 = arcs.iter().flatten().map(|a| a.total).sum();
        let windows: Vec<(f32, f32)> = parts
            .iter()
            .map(|&(s, e)| (s * total, e * total))
            .collect();

        let mut added = 0.0;
        for (&target, shape_arcs) in group.iter().zip(&arcs) {
            replace_collection(collections, target, pool, |input, pool| {
                let mut out = pool.acquire_collection();
                for (path, arc) in input.paths.iter().zip(shape_arcs) {
                    // x..y length windows relative to this path's start.
                    let mut local = pool.acquire_points(0);
                    local.extend(
                        windows
                            .iter()
                            .map(|&(s, e)| Vec2::new(s - added, e - added))
                            .filter(|w| w.y > 0.0 && w.x < arc.total),
                    );
                    added += arc.total;
                    trim_path(path, arc, &local, &mut out, pool);
                    pool.release_points(local);
                }
                out
            });
        }
    }
}

/// Appends the pieces of `path` inside the local length windows to `out`. A
/// window pair that meets across the seam of a closed path becomes one piece.
fn trim_path(
    path: &PathGeometry,
    arc: &PathArcLength,
    windows: &[Vec2],
    out: &mut ShapeCollection,
    pool: &mut GeometryPool,
) {
    let mut pieces: Vec<(f32, f32, PathGeometry)> = Vec::with_capacity(windows.len());
    for window in windows {
        let (from, to) = (window.x.max(0.0), window.y.min(arc.total));
        if from <= 0.0 && to >= arc.total {
            pieces.push((from, to, pool.clone_path(path, None)));
            continue;
        }
        let piece = clip_path(path, arc, from, to, pool);
        if piece.is_empty() {
            pool.release_path(piece);
        } else {
            pieces.push((from, to, piece));
        }
    }

    // [s, total] followed by [0, e] on a closed path continue each other.
    if path.closed && pieces.len() == 2 {
        let joins = pieces[0].1 >= arc.total && pieces[1].0 <= 0.0;
        if joins {
            if let Some((_, _, tail)) = pieces.pop() {
                join_paths(&mut pieces[0].2, &tail);
                pool.release_path(tail);
            }
        }
    }
    for (_, _, piece) in pieces {
        out.add_path(piece);
    }
}

fn clip_path(
    path: &PathGeometry,
    arc: &PathArcLength,
    from: f32,
    to: f32,
    pool: &mut GeometryPool,
) -> PathGeometry {
    let mut out = pool.acquire_path(path.len());
    let mut seg_start = 0.0;
    for (index, table) in arc.segments.iter().enumerate() {
        let len = table.length();
        let seg_end = seg_start + len;
        let overlap = seg_end.min(to) - seg_start.max(from);
        if overlap > MIN_OVERLAP {
            let curve = path.segment(index);
            let piece = if seg_start >= from && seg_end <= to {
                curve
            } else {
                let s = (from - seg_start).max(0.0) / len;
                let e = (to - seg_start).min(len) / len;
                segment_between(&curve, table, s, e)
            };
            append_cubic(&mut out, &piece);
        }
        seg_start = seg_end;
    }
    out
}

fn append_cubic(out: &mut PathGeometry, [p0, c1, c2, p3]: &Cubic) {
    if out.is_empty() {
        out.push_triple(*p0, *c1, *p0);
    } else {
        let last = out.len() - 1;
        out.set_triple_at(*p0, *c1, out.in_point(last), last);
    }
    out.push_triple(*p3, *p3, *c2);
}

// `tail` starts where `head` ends.
fn join_paths(head: &mut PathGeometry, tail: &PathGeometry) {
    if tail.is_empty() {
        return;
    }
    if head.is_empty() {
        head.copy_from(tail);
        return;
    }
    let last = head.len() - 1;
    head.set_triple_at(head.vertex(last), tail.out_point(0), head.in_point(last), last);
    for i in 1..tail.len() {
        head.push_triple(tail.vertex(i), tail.out_point(i), tail.in_point(i));
    }
}

impl ShapeModifier for TrimModifier {
    fn update(&mut self, ctx: &FrameContext) -> bool {
        self.start.get_value(ctx);
        self.end.get_value(ctx);
        self.offset.get_value(ctx);
        self.start.changed() || self.end.changed() || self.offset.changed()
    }

    fn apply(
        &mut self,
        collections: &mut [ShapeCollection],
        targets: &[usize],
        pool: &mut GeometryPool,
    ) {
        match self.windows() {
            TrimWindows::Full => {}
            TrimWindows::Empty => {
                for &t in targets {
                    replace_collection(collections, t, pool, |_, pool| pool.acquire_collection());
                }
            }
            TrimWindows::Parts(parts) => match self.mode {
                TrimMode::Simultaneous => {
                    for &t in targets {
                        self.trim_group(&[t], collections, &parts, pool);
                    }
                }
                TrimMode::Individual => self.trim_group(targets, collections, &parts, pool),
            },
        }
    }
}

// ================================================================================================
// Round corners
// ================================================================================================

#[derive(Clone, Debug)]
pub struct RoundCornersModifier {
    radius: ScalarProperty,
}

impl RoundCornersModifier {
    pub fn from_model(model: &RoundCornersShape, cache: &mut EasingCache) -> Self {
        Self {
            radius: ScalarProperty::scalar(&model.r, 0.0, PropertyOptions::default(), cache),
        }
    }
}

/// Replaces every sharp vertex (both handles on the vertex) with two vertices
/// pulled back along the adjacent edges. Open path endpoints stay as they are.
pub fn round_path(path: &PathGeometry, radius: f32, pool: &mut GeometryPool) -> PathGeometry {
    let n = path.len();
    let mut out = pool.acquire_path(n * 2);
    out.closed = path.closed;
    for i in 0..n {
        let v = path.vertex(i);
        let sharp = path.in_point(i) == v && path.out_point(i) == v;
        let endpoint = !path.closed && (i == 0 || i == n - 1);
        if !sharp || endpoint {
            out.push_triple(v, path.out_point(i), path.in_point(i));
            continue;
        }
        let prev = path.vertex(if i == 0 { n - 1 } else { i - 1 });
        let next = path.vertex(if i == n - 1 { 0 } else { i + 1 });

        let a = pull_toward(v, prev, radius);
        out.push_triple(a, a - (a - v) * ROUND_CORNER, a);
        let b = pull_toward(v, next, radius);
        out.push_triple(b, b, b - (b - v) * ROUND_CORNER);
    }
    out
}

fn pull_toward(v: Vec2, toward: Vec2, radius: f32) -> Vec2 {
    let distance = v.distance(toward);
    let perc = if distance > 0.0 {
        (distance / 2.0).min(radius) / distance
    } else {
        0.0
    };
    v + (toward - v) * perc
}

impl ShapeModifier for RoundCornersModifier {
    fn update(&mut self, ctx: &FrameContext) -> bool {
        self.radius.get_value(ctx);
        self.radius.changed()
    }

    fn apply(
        &mut self,
        collections: &mut [ShapeCollection],
        targets: &[usize],
        pool: &mut GeometryPool,
    ) {
        let radius = self.radius.value();
        if radius == 0.0 {
            return;
        }
        for &t in targets {
            replace_collection(collections, t, pool, |input, pool| {
                let mut out = pool.acquire_collection();
                for path in &input.paths {
                    let rounded = round_path(path, radius, pool);
                    out.add_path(rounded);
                }
                out
            });
        }
    }
}

// ================================================================================================
// Repeater
// ================================================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composite {
    /// Later copies draw on top.
    Above,
    /// Later copies draw underneath.
    Below,
}

/// One repeater slot.
#[derive(Clone, Debug, PartialEq)]
pub struct RepeaterCopy {
    pub matrix: Matrix,
    pub opacity: f32,
    pub visible: bool,
}

#[derive(Clone, Debug)]
pub struct RepeaterModifier {
    copies: ScalarProperty,
    offset: ScalarProperty,
    transform: TransformEvaluator,
    start_opacity: ScalarProperty,
    end_opacity: ScalarProperty,
    composite: Composite,
    slots: Vec<RepeaterCopy>,
    laid_out: bool,
}

impl RepeaterModifier {
    pub fn from_model(model: &RepeaterShape, cache: &mut EasingCache) -> Result<Self> {
        let percent = PropertyOptions {
            multiplier: PERCENT,
            ..PropertyOptions::default()
        };
        Ok(Self {
            copies: ScalarProperty::scalar(&model.c, 1.0, PropertyOptions::default(), cache),
            offset: ScalarProperty::scalar(&model.o, 0.0, PropertyOptions::default(), cache),
            transform: TransformEvaluator::from_model(
                &model.tr.t,
                TransformOptions::default(),
                cache,
            )?,
            start_opacity: ScalarProperty::scalar(&model.tr.so, 100.0, percent, cache),
            end_opacity: ScalarProperty::scalar(&model.tr.eo, 100.0, percent, cache),
            composite: if model.m == 2 {
                Composite::Below
            } else {
                Composite::Above
            },
            slots: Vec::new(),
            laid_out: false,
        })
    }

    /// Every slot allocated so far, including hidden ones.
    pub fn copies(&self) -> &[RepeaterCopy] {
        &self.slots
    }

    /// Visible copies, first painted first.
    pub fn painted_copies(&self) -> Vec<&RepeaterCopy> {
        let visible = self.slots.iter().filter(|c| c.visible);
        match self.composite {
            Composite::Above => visible.collect(),
            Composite::Below => visible.rev().collect(),
        }
    }

    /// Recomputes the per-copy matrices and opacities.
    fn layout(&mut self) {
        let count = self.copies.value().ceil().max(0.0) as usize;
        if self.slots.len() < count {
            self.slots.resize(
                count,
                RepeaterCopy {
                    matrix: Matrix::new(),
                    opacity: 1.0,
                    visible: false,
                },
            );
        }
        let parts = *self.transform.parts();
        let offset = self.offset.value();
        let (so, eo) = (self.start_opacity.value(), self.end_opacity.value());

        let mut steps = StepMatrices::default();
        let whole = offset.trunc();
        let fraction = offset - whole;
        for _ in 0..(whole.abs() as usize) {
            steps.apply(&parts, 1.0, offset < 0.0);
        }
        if fraction != 0.0 {
            steps.apply(&parts, fraction.abs(), offset < 0.0);
        }

        for (k, slot) in self.slots.iter_mut().enumerate() {
            slot.visible = k < count;
            if !slot.visible {
                continue;
            }
            if k > 0 {
                steps.apply(&parts, 1.0, false);
            }
            slot.matrix = steps.combined();
            slot.opacity = if count <= 1 {
                so
            } else {
                so + (eo - so) * (k as f32 / (count - 1) as f32)
            };
        }
    }
}

/// Accumulated position, rotation and scale steps of a repeater transform.
#[derive(Debug, Default)]
struct StepMatrices {
    position: Matrix,
    rotation: Matrix,
    scale: Matrix,
}

impl StepMatrices {
    /// Adds `perc` of one step, or removes it when `inverse`.
    fn apply(&mut self, parts: &TransformParts, perc: f32, inverse: bool) {
        let dir = if inverse { -1.0 } else { 1.0 };
        let a = parts.anchor;
        let sx = parts.scale.x + (1.0 - parts.scale.x) * (1.0 - perc);
        let sy = parts.scale.y + (1.0 - parts.scale.y) * (1.0 - perc);
        let invert = |s: f32| if s == 0.0 { 0.0 } else { 1.0 / s };
        let (sx, sy) = if inverse { (invert(sx), invert(sy)) } else { (sx, sy) };

        self.position.translate(
            parts.position.x * dir * perc,
            parts.position.y * dir * perc,
            0.0,
        );
        self.rotation
            .translate(-a.x, -a.y, 0.0)
            .rotate_z(parts.rotation * dir * perc)
            .translate(a.x, a.y, 0.0);
        self.scale
            .translate(-a.x, -a.y, 0.0)
            .scale(sx, sy, 1.0)
            .translate(a.x, a.y, 0.0);
    }

    fn combined(&self) -> Matrix {
        let mut m = self.rotation.clone();
        m.multiply(&self.scale).multiply(&self.position);
        m
    }
}

impl ShapeModifier for RepeaterModifier {
    fn update(&mut self, ctx: &FrameContext) -> bool {
        let props = [
            &mut self.copies,
            &mut self.offset,
            &mut self.start_opacity,
            &mut self.end_opacity,
        ];
        let mut changed = false;
        for p in props {
            p.get_value(ctx);
            changed |= p.changed();
        }
        self.transform.evaluate(ctx);
        changed |= self.transform.changed();
        if changed || !self.laid_out {
            trace!(frame = ctx.frame, "repeater layout");
            self.layout();
            self.laid_out = true;
        }
        changed
    }

    fn apply(
        &mut self,
        collections: &mut [ShapeCollection],
        targets: &[usize],
        pool: &mut GeometryPool,
    ) {
        let copies = self.painted_copies();
        for &t in targets {
            replace_collection(collections, t, pool, |input, pool| {
                let mut out = pool.acquire_collection();
                for slot in &copies {
                    for path in &input.paths {
                        let copy = pool.clone_path(path, Some(&slot.matrix));
                        out.add_path(copy);
                    }
                }
                out
            });
        }
    }
}

// ================================================================================================
// Dispatch
// ================================================================================================

#[derive(Clone, Debug)]
pub enum Modifier {
    Trim(TrimModifier),
    RoundCorners(RoundCornersModifier),
    Repeater(RepeaterModifier),
}

impl Modifier {
    pub fn as_repeater(&self) -> Option<&RepeaterModifier> {
        match self {
            Modifier::Repeater(r) => Some(r),
            _ => None,
        }
    }
}

impl ShapeModifier for Modifier {
    fn update(&mut self, ctx: &FrameContext) -> bool {
        match self {
            Modifier::Trim(m) => m.update(ctx),
            Modifier::RoundCorners(m) => m.update(ctx),
            Modifier::Repeater(m) => m.update(ctx),
        }
    }

    fn apply(
        &mut self,
        collections: &mut [ShapeCollection],
        targets: &[usize],
        pool: &mut GeometryPool,
    ) {
        match self {
            Modifier::Trim(m) => m.apply(collections, targets, pool),
            Modifier::RoundCorners(m) => m.apply(collections, targets, pool),
            Modifier::Repeater(m) => m.apply(collections, targets, pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalConfig;
    use crate::geometry::PointKind;
    use lottie_data::model::{PositionProperty, Property, RepeaterTransform, Transform};

    fn cache() -> EasingCache {
        EasingCache::new(EvalConfig::default())
    }

    fn ctx() -> FrameContext {
        FrameContext::new(0.0, 1, 30.0)
    }

    fn polyline(points: &[(f32, f32)], closed: bool) -> PathGeometry {
        let mut path = PathGeometry::new();
        for &(x, y) in points {
            let v = Vec2::new(x, y);
            path.push_triple(v, v, v);
        }
        path.closed = closed;
        path
    }

    fn unit_square() -> PathGeometry {
        polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], true)
    }

    fn collection(pool: &mut GeometryPool, paths: &[PathGeometry]) -> ShapeCollection {
        let mut out = pool.acquire_collection();
        for p in paths {
            let copy = pool.clone_path(p, None);
            out.add_path(copy);
        }
        out
    }

    fn trim(s: f32, e: f32, o: f32, m: u8) -> TrimModifier {
        let model = TrimShape {
            nm: None,
            s: Property::fixed(s),
            e: Property::fixed(e),
            o: Property::fixed(o),
            m,
        };
        let mut t = TrimModifier::from_model(&model, &mut cache());
        t.update(&ctx());
        t
    }

    fn assert_vertices(path: &PathGeometry, expected: &[(f32, f32)]) {
        assert_eq!(path.len(), expected.len(), "{:?}", path.vertices());
        for (v, &(x, y)) in path.vertices().iter().zip(expected) {
            assert!((*v - Vec2::new(x, y)).length() < 1e-2, "{:?}", path.vertices());
        }
    }

    #[test]
    fn trim_start_past_end_wraps_through_the_seam() {
        assert_eq!(
            trim_windows(0.75, 0.25, 0.0, 1e-4),
            TrimWindows::Parts(vec![(0.75, 1.0), (0.0, 0.25)])
        );
        // Shifted past the seam, the wrapped window is contiguous again.
        assert_eq!(
            trim_windows(0.75, 0.25, 90.0, 1e-4),
            TrimWindows::Parts(vec![(0.0, 0.5)])
        );
        assert_eq!(
            trim_windows(0.9, 0.1, 0.0, 1e-4),
            TrimWindows::Parts(vec![(0.9, 1.0), (0.0, 0.1)])
        );
    }

    #[test]
    fn trim_windows_normalize() {
        assert_eq!(trim_windows(0.0, 1.0, 0.0, 1e-4), TrimWindows::Full);
        assert_eq!(trim_windows(1.0, 0.0, 0.0, 1e-4), TrimWindows::Empty);
        assert_eq!(trim_windows(0.3, 0.3, 90.0, 1e-4), TrimWindows::Empty);
        assert_eq!(trim_windows(0.0, 1.0, 288.0, 1e-4), TrimWindows::Full);
        assert_eq!(trim_windows(0.3, 0.3, 0.0, 1e-4), TrimWindows::Empty);
        let TrimWindows::Parts(parts) = trim_windows(0.1, 0.4, -90.0, 1e-4) else {
            panic!("expected a wrapped window");
        };
        assert_eq!(parts.len(), 2);
        assert!((parts[0].0 - 0.85).abs() < 1e-5 && parts[0].1 == 1.0);
        assert!(parts[1].0 == 0.0 && (parts[1].1 - 0.15).abs() < 1e-5);
        assert_eq!(
            trim_windows(0.5, 0.75, 180.0, 1e-4),
            TrimWindows::Parts(vec![(0.0, 0.25)])
        );
    }

    #[test]
    fn full_trim_leaves_geometry_alone() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        trim(0.0, 100.0, 0.0, 1).apply(&mut collections, &[0], &mut pool);
        assert_eq!(collections[0].paths, vec![unit_square()]);
    }

    #[test]
    fn empty_trim_clears_paths() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        trim(40.0, 40.0, 0.0, 1).apply(&mut collections, &[0], &mut pool);
        assert!(collections[0].is_empty());
        assert_eq!(pool.outstanding_paths(), 0);
    }

    #[test]
    fn middle_half_of_square() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        trim(25.0, 75.0, 0.0, 1).apply(&mut collections, &[0], &mut pool);
        assert_eq!(collections[0].len(), 1);
        let path = &collections[0].paths[0];
        assert!(!path.closed);
        assert_vertices(path, &[(1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    }

    #[test]
    fn wrapping_window_joins_across_the_seam() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        // 50%..100% shifted a quarter turn: 75%..125%.
        trim(50.0, 100.0, 90.0, 1).apply(&mut collections, &[0], &mut pool);
        assert_eq!(collections[0].len(), 1);
        assert_vertices(&collections[0].paths[0], &[(0.0, 1.0), (0.0, 0.0), (1.0, 0.0)]);
    }

    #[test]
    fn start_past_end_keeps_both_ends_of_an_open_path() {
        let mut pool = GeometryPool::new();
        let line = polyline(&[(0.0, 0.0), (10.0, 0.0)], false);
        let mut collections = vec![collection(&mut pool, &[line])];
        trim(75.0, 25.0, 0.0, 1).apply(&mut collections, &[0], &mut pool);
        assert_eq!(collections[0].len(), 2);
        assert_vertices(&collections[0].paths[0], &[(7.5, 0.0), (10.0, 0.0)]);
        assert_vertices(&collections[0].paths[1], &[(0.0, 0.0), (2.5, 0.0)]);
        assert_eq!(pool.outstanding_points(), 0);
    }

    #[test]
    fn partial_segment_is_split() {
        let mut pool = GeometryPool::new();
        let line = polyline(&[(0.0, 0.0), (10.0, 0.0)], false);
        let mut collections = vec![collection(&mut pool, &[line])];
        trim(20.0, 70.0, 0.0, 1).apply(&mut collections, &[0], &mut pool);
        assert_vertices(&collections[0].paths[0], &[(2.0, 0.0), (7.0, 0.0)]);
    }

    #[test]
    fn individual_mode_spans_shapes() {
        let mut pool = GeometryPool::new();
        let a = polyline(&[(0.0, 0.0), (1.0, 0.0)], false);
        let b = polyline(&[(0.0, 1.0), (1.0, 1.0)], false);
        let mut collections = vec![collection(&mut pool, &[a]), collection(&mut pool, &[b])];
        trim(0.0, 50.0, 0.0, 2).apply(&mut collections, &[0, 1], &mut pool);
        assert_eq!(collections[0].len(), 1);
        assert_vertices(&collections[0].paths[0], &[(0.0, 0.0), (1.0, 0.0)]);
        assert!(collections[1].is_empty());
    }

    #[test]
    fn simultaneous_mode_trims_each_shape() {
        let mut pool = GeometryPool::new();
        let a = polyline(&[(0.0, 0.0), (4.0, 0.0)], false);
        let b = polyline(&[(0.0, 1.0), (8.0, 1.0)], false);
        let mut collections = vec![collection(&mut pool, &[a]), collection(&mut pool, &[b])];
        trim(0.0, 50.0, 0.0, 1).apply(&mut collections, &[0, 1], &mut pool);
        assert_vertices(&collections[0].paths[0], &[(0.0, 0.0), (2.0, 0.0)]);
        assert_vertices(&collections[1].paths[0], &[(0.0, 1.0), (4.0, 1.0)]);
    }

    fn round(r: f32) -> RoundCornersModifier {
        let model = RoundCornersShape {
            nm: None,
            r: Property::fixed(r),
        };
        let mut m = RoundCornersModifier::from_model(&model, &mut cache());
        m.update(&ctx());
        m
    }

    #[test]
    fn zero_radius_is_a_no_op() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        round(0.0).apply(&mut collections, &[0], &mut pool);
        assert_eq!(collections[0].paths, vec![unit_square()]);
    }

    #[test]
    fn square_corners_become_arcs() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        round(0.25).apply(&mut collections, &[0], &mut pool);
        let path = &collections[0].paths[0];
        assert!(path.closed);
        assert_eq!(path.len(), 8);
        assert_eq!(path.vertex(0), Vec2::new(0.0, 0.25));
        assert_eq!(path.vertex(1), Vec2::new(0.25, 0.0));
        let k = 0.25 * (1.0 - ROUND_CORNER);
        assert!((path.out_point(0) - Vec2::new(0.0, k)).length() < 1e-6);
        assert!((path.in_point(1) - Vec2::new(k, 0.0)).length() < 1e-6);
    }

    #[test]
    fn radius_is_capped_at_half_the_edge() {
        let mut pool = GeometryPool::new();
        let rounded = round_path(&unit_square(), 10.0, &mut pool);
        assert_eq!(rounded.vertex(0), Vec2::new(0.0, 0.5));
        assert_eq!(rounded.vertex(1), Vec2::new(0.5, 0.0));
    }

    #[test]
    fn open_endpoints_and_curves_are_kept() {
        let mut pool = GeometryPool::new();
        let mut path = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], false);
        let rounded = round_path(&path, 0.2, &mut pool);
        assert_eq!(rounded.len(), 4);
        assert_eq!(rounded.vertex(0), Vec2::ZERO);
        assert_eq!(rounded.vertex(3), Vec2::new(1.0, 1.0));

        path.set_xy_at(Vec2::new(0.8, 0.0), PointKind::In, 1);
        let rounded = round_path(&path, 0.2, &mut pool);
        assert_eq!(rounded.len(), 3);
    }

    fn repeater(copies: f32, offset: f32, m: u8, so: f32, eo: f32) -> RepeaterModifier {
        let model = RepeaterShape {
            nm: None,
            c: Property::fixed(copies),
            o: Property::fixed(offset),
            m,
            tr: RepeaterTransform {
                t: Transform {
                    p: PositionProperty::Unified(Property::fixed(vec![10.0, 0.0])),
                    ..Transform::default()
                },
                so: Property::fixed(so),
                eo: Property::fixed(eo),
            },
        };
        let mut r = RepeaterModifier::from_model(&model, &mut cache()).unwrap();
        r.update(&ctx());
        r
    }

    fn first_x(c: &ShapeCollection) -> Vec<f32> {
        c.paths.iter().map(|p| p.vertex(0).x).collect()
    }

    #[test]
    fn single_copy_without_offset_is_identity() {
        let r = repeater(1.0, 0.0, 1, 100.0, 100.0);
        assert_eq!(r.painted_copies().len(), 1);
        assert!(r.copies()[0].matrix.is_identity());
        assert_eq!(r.copies()[0].opacity, 1.0);
    }

    #[test]
    fn copies_step_by_the_transform() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        repeater(3.0, 0.0, 1, 100.0, 100.0).apply(&mut collections, &[0], &mut pool);
        let xs = first_x(&collections[0]);
        assert_eq!(xs.len(), 3);
        for (x, expected) in xs.iter().zip([0.0, 10.0, 20.0]) {
            assert!((x - expected).abs() < 1e-4, "{xs:?}");
        }
    }

    #[test]
    fn below_composite_reverses_order() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        repeater(3.0, 0.0, 2, 100.0, 100.0).apply(&mut collections, &[0], &mut pool);
        let xs = first_x(&collections[0]);
        assert!((xs[0] - 20.0).abs() < 1e-4 && xs[2].abs() < 1e-4, "{xs:?}");
    }

    #[test]
    fn offset_shifts_every_copy() {
        let forward = repeater(2.0, 1.5, 1, 100.0, 100.0);
        let x = |r: &RepeaterModifier, k: usize| {
            r.copies()[k].matrix.apply_to_point_2d(Vec2::ZERO).x
        };
        assert!((x(&forward, 0) - 15.0).abs() < 1e-4);
        assert!((x(&forward, 1) - 25.0).abs() < 1e-4);

        let backward = repeater(2.0, -1.0, 1, 100.0, 100.0);
        assert!((x(&backward, 0) + 10.0).abs() < 1e-4);
        assert!(x(&backward, 1).abs() < 1e-4);
    }

    #[test]
    fn opacity_ramps_from_start_to_end() {
        let r = repeater(3.0, 0.0, 1, 0.0, 100.0);
        let opacities: Vec<f32> = r.copies().iter().map(|c| c.opacity).collect();
        assert_eq!(opacities, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn fewer_copies_hide_extra_slots() {
        let mut r = repeater(4.0, 0.0, 1, 100.0, 100.0);
        r.copies = ScalarProperty::constant(2.0);
        r.update(&FrameContext::new(1.0, 2, 30.0));
        assert_eq!(r.copies().len(), 4);
        assert_eq!(r.painted_copies().len(), 2);
    }

    #[test]
    fn modifier_enum_dispatches() {
        let mut pool = GeometryPool::new();
        let mut collections = vec![collection(&mut pool, &[unit_square()])];
        let mut m = Modifier::Trim(trim(0.0, 0.0, 0.0, 1));
        assert!(m.as_repeater().is_none());
        m.apply(&mut collections, &[0], &mut pool);
        assert!(collections[0].is_empty());
    }
}
