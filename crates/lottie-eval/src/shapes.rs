use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec4};
use lottie_data::model::{
    BezierPath, EllipseShape, PathShape, PolystarShape, Property, RectShape, Shape, Value,
};
use tracing::trace;

use crate::animatable::{
    PropertyOptions, Sample, ScalarProperty, Timeline, VectorProperty, DEG_TO_RAD, PERCENT,
};
use crate::easing::EasingCache;
use crate::errors::{EvalError, Result};
use crate::geometry::{PathGeometry, ShapeCollection};
use crate::pool::GeometryPool;
use crate::FrameContext;

/// Circle approximation constant for cubic quarter arcs.
pub const ROUND_CORNER: f32 = 0.5519;

const REVERSED: u8 = 3;

// ================================================================================================
// Literal paths
// ================================================================================================

#[derive(Clone, Debug)]
enum PathTrack {
    Static(PathGeometry),
    Keyframed {
        timeline: Timeline,
        values: Vec<(PathGeometry, PathGeometry)>,
        first: PathGeometry,
        last: PathGeometry,
    },
}

#[derive(Clone, Debug)]
struct PathSource {
    track: PathTrack,
    last_frame: Option<f32>,
    last_index: usize,
    last_sample: Option<Sample>,
}

fn template(model: &BezierPath) -> PathGeometry {
    let mut path = PathGeometry::new();
    path.copy_from_model(model);
    path
}

impl PathSource {
    fn from_model(model: &PathShape, cache: &mut EasingCache) -> Result<Self> {
        let track = match &model.ks.k {
            Value::Default => PathTrack::Static(PathGeometry::new()),
            Value::Static(p) => PathTrack::Static(template(p)),
            Value::Animated(kfs) if kfs.len() == 1 => {
                PathTrack::Static(kfs[0].s.as_ref().map(template).unwrap_or_default())
            }
            Value::Animated(kfs) => {
                let timeline = Timeline::build(kfs, cache);
                let mut values = Vec::with_capacity(timeline.len());
                let mut carried = PathGeometry::new();
                for (index, pair) in kfs.windows(2).enumerate() {
                    let (a, b) = (&pair[0], &pair[1]);
                    let start = a.s.as_ref().map_or_else(|| carried.clone(), template);
                    let end = if a.h == Some(1) {
                        start.clone()
                    } else {
                        a.e.as_ref()
                            .or(b.s.as_ref())
                            .map_or_else(|| start.clone(), template)
                    };
                    if start.len() != end.len() {
                        return Err(EvalError::VertexCountMismatch {
                            index,
                            next: index + 1,
                            count: start.len(),
                            next_count: end.len(),
                        });
                    }
                    carried = end.clone();
                    values.push((start, end));
                }
                let first = values[0].0.clone();
                let last = kfs[kfs.len() - 1]
                    .s
                    .as_ref()
                    .map_or(carried, template);
                PathTrack::Keyframed {
                    timeline,
                    values,
                    first,
                    last,
                }
            }
        };
        Ok(Self {
            track,
            last_frame: None,
            last_index: 0,
            last_sample: None,
        })
    }

    fn refresh(&mut self, ctx: &FrameContext) -> bool {
        let PathTrack::Keyframed { timeline, .. } = &self.track else {
            return false;
        };
        if self.last_frame == Some(ctx.frame) {
            return false;
        }
        let hint = match self.last_frame {
            Some(last) if ctx.frame >= last => self.last_index,
            _ => 0,
        };
        let sample = timeline.sample(ctx.frame, hint);
        self.last_index = match sample {
            Sample::Before => 0,
            Sample::After => timeline.len() - 1,
            Sample::Hold(i) | Sample::Blend(i, _) => i,
        };
        self.last_frame = Some(ctx.frame);
        let changed = self.last_sample != Some(sample);
        self.last_sample = Some(sample);
        changed
    }

    fn write(&self, out: &mut PathGeometry) {
        let (timeline, values, first, last) = match &self.track {
            PathTrack::Static(p) => return out.copy_from(p),
            PathTrack::Keyframed {
                timeline,
                values,
                first,
                last,
            } => (timeline, values, first, last),
        };
        match self.last_sample {
            None | Some(Sample::Before) => out.copy_from(first),
            Some(Sample::After) => out.copy_from(last),
            Some(Sample::Hold(i)) => out.copy_from(&values[i].0),
            Some(Sample::Blend(i, perc)) => {
                let t = timeline.ease(i, perc)[0];
                let (a, b) = &values[i];
                out.set_length(a.len());
                out.closed = a.closed;
                for k in 0..a.len() {
                    out.set_triple_at(
                        a.vertex(k).lerp(b.vertex(k), t),
                        a.out_point(k).lerp(b.out_point(k), t),
                        a.in_point(k).lerp(b.in_point(k), t),
                        k,
                    );
                }
            }
        }
    }
}

// ================================================================================================
// Parametric shapes
// ================================================================================================

#[derive(Clone, Debug)]
struct EllipseSource {
    size: VectorProperty,
    position: VectorProperty,
}

#[derive(Clone, Debug)]
struct RectSource {
    size: VectorProperty,
    position: VectorProperty,
    roundness: ScalarProperty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StarKind {
    Star,
    Polygon,
}

#[derive(Clone, Debug)]
struct StarSource {
    kind: StarKind,
    position: VectorProperty,
    points: ScalarProperty,
    rotation: ScalarProperty,
    outer_radius: ScalarProperty,
    outer_roundness: ScalarProperty,
    inner_radius: ScalarProperty,
    inner_roundness: ScalarProperty,
}

/// Evaluated star or polygon parameters. Rotation is in radians, roundness in 0..1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarParams {
    pub kind: StarKind,
    pub center: Vec2,
    pub points: f32,
    pub rotation: f32,
    pub outer_radius: f32,
    pub outer_roundness: f32,
    pub inner_radius: f32,
    pub inner_roundness: f32,
}

#[derive(Clone, Debug)]
enum ShapeSource {
    Path(PathSource),
    Ellipse(EllipseSource),
    Rect(RectSource),
    Star(StarSource),
}

fn point(p: &VectorProperty) -> Vec2 {
    p.value().truncate().truncate()
}

impl ShapeSource {
    /// Brings every input current; true if any of them moved.
    fn refresh(&mut self, ctx: &FrameContext) -> bool {
        match self {
            ShapeSource::Path(p) => p.refresh(ctx),
            ShapeSource::Ellipse(e) => {
                e.size.get_value(ctx);
                e.position.get_value(ctx);
                e.size.changed() || e.position.changed()
            }
            ShapeSource::Rect(r) => {
                r.size.get_value(ctx);
                r.position.get_value(ctx);
                r.roundness.get_value(ctx);
                r.size.changed() || r.position.changed() || r.roundness.changed()
            }
            ShapeSource::Star(s) => {
                let props = [
                    &mut s.points,
                    &mut s.rotation,
                    &mut s.outer_radius,
                    &mut s.outer_roundness,
                    &mut s.inner_radius,
                    &mut s.inner_roundness,
                ];
                let mut changed = false;
                for p in props {
                    p.get_value(ctx);
                    changed |= p.changed();
                }
                s.position.get_value(ctx);
                changed || s.position.changed()
            }
        }
    }

    fn write(&self, out: &mut PathGeometry) {
        match self {
            ShapeSource::Path(p) => p.write(out),
            ShapeSource::Ellipse(e) => {
                write_ellipse(out, point(&e.position), point(&e.size));
            }
            ShapeSource::Rect(r) => write_rect(
                out,
                point(&r.position),
                point(&r.size),
                r.roundness.value(),
            ),
            ShapeSource::Star(s) => write_polystar(
                out,
                &StarParams {
                    kind: s.kind,
                    center: point(&s.position),
                    points: s.points.value(),
                    rotation: s.rotation.value(),
                    outer_radius: s.outer_radius.value(),
                    outer_roundness: s.outer_roundness.value(),
                    inner_radius: s.inner_radius.value(),
                    inner_roundness: s.inner_roundness.value(),
                },
            ),
        }
    }
}

pub fn write_ellipse(out: &mut PathGeometry, center: Vec2, size: Vec2) {
    let Vec2 { x: cx, y: cy } = center;
    let (rx, ry) = (size.x / 2.0, size.y / 2.0);
    let (hx, hy) = (rx * ROUND_CORNER, ry * ROUND_CORNER);
    out.clear();
    out.closed = true;
    // Top, right, bottom, left; clockwise on a y-down canvas.
    out.push_triple(
        Vec2::new(cx, cy - ry),
        Vec2::new(cx + hx, cy - ry),
        Vec2::new(cx - hx, cy - ry),
    );
    out.push_triple(
        Vec2::new(cx + rx, cy),
        Vec2::new(cx + rx, cy + hy),
        Vec2::new(cx + rx, cy - hy),
    );
    out.push_triple(
        Vec2::new(cx, cy + ry),
        Vec2::new(cx - hx, cy + ry),
        Vec2::new(cx + hx, cy + ry),
    );
    out.push_triple(
        Vec2::new(cx - rx, cy),
        Vec2::new(cx - rx, cy - hy),
        Vec2::new(cx - rx, cy + hy),
    );
}

pub fn write_rect(out: &mut PathGeometry, center: Vec2, size: Vec2, radius: f32) {
    let Vec2 { x: cx, y: cy } = center;
    let (w, h) = (size.x / 2.0, size.y / 2.0);
    let round = w.min(h).min(radius).max(0.0);
    let c = round * (1.0 - ROUND_CORNER);
    let (left, right, top, bottom) = (cx - w, cx + w, cy - h, cy + h);
    out.clear();
    out.closed = true;

    let mut corner = |v: Vec2, o: Vec2, i: Vec2| out.push_triple(v, o, i);
    if round == 0.0 {
        for v in [
            Vec2::new(right, top),
            Vec2::new(right, bottom),
            Vec2::new(left, bottom),
            Vec2::new(left, top),
        ] {
            corner(v, v, v);
        }
        return;
    }
    // Each corner becomes a pair of vertices; handles reach `c` short of the sharp corner.
    let v = Vec2::new(right, top + round);
    corner(v, v, Vec2::new(right, top + c));
    let v = Vec2::new(right, bottom - round);
    corner(v, Vec2::new(right, bottom - c), v);
    let v = Vec2::new(right - round, bottom);
    corner(v, v, Vec2::new(right - c, bottom));
    let v = Vec2::new(left + round, bottom);
    corner(v, Vec2::new(left + c, bottom), v);
    let v = Vec2::new(left, bottom - round);
    corner(v, v, Vec2::new(left, bottom - c));
    let v = Vec2::new(left, top + round);
    corner(v, Vec2::new(left, top + c), v);
    let v = Vec2::new(left + round, top);
    corner(v, v, Vec2::new(left + c, top));
    let v = Vec2::new(right - round, top);
    corner(v, Vec2::new(right - c, top), v);
}

pub fn write_polystar(out: &mut PathGeometry, params: &StarParams) {
    out.clear();
    out.closed = true;
    let sides = params.points.floor().max(0.0) as usize;
    let count = match params.kind {
        StarKind::Star => sides * 2,
        StarKind::Polygon => sides,
    };
    if count == 0 {
        return;
    }
    let step = 2.0 * PI / count as f32;
    let perimeter = |radius: f32| match params.kind {
        StarKind::Star => 2.0 * PI * radius / (count as f32 * 2.0),
        StarKind::Polygon => 2.0 * PI * radius / (count as f32 * 4.0),
    };
    let mut angle = -FRAC_PI_2 + params.rotation;
    for i in 0..count {
        let outer = params.kind == StarKind::Polygon || i % 2 == 0;
        let (radius, roundness) = if outer {
            (params.outer_radius, params.outer_roundness)
        } else {
            (params.inner_radius, params.inner_roundness)
        };
        let offset = Vec2::new(radius * angle.cos(), radius * angle.sin());
        // Unit tangent, zero when the vertex sits on the center.
        let tangent = if offset == Vec2::ZERO {
            Vec2::ZERO
        } else {
            Vec2::new(offset.y, -offset.x) / offset.length()
        };
        let handle = tangent * perimeter(radius) * roundness;
        let v = params.center + offset;
        out.push_triple(v, v - handle, v + handle);
        angle += step;
    }
}

// ================================================================================================
// Evaluator
// ================================================================================================

/// Geometry of one shape item, regenerated into a pooled collection when its inputs move.
#[derive(Debug)]
pub struct ShapeEvaluator {
    name: Option<String>,
    source: ShapeSource,
    reversed: bool,
    output: Option<ShapeCollection>,
    changed: bool,
    epoch: Option<u64>,
}

impl ShapeEvaluator {
    /// `Ok(None)` for items that are not geometry (groups, modifiers, styles).
    pub fn from_shape(shape: &Shape, cache: &mut EasingCache) -> Result<Option<Self>> {
        let evaluator = match shape {
            Shape::Path(p) => Self::path(p, cache)?,
            Shape::Ellipse(e) => Self::ellipse(e, cache)?,
            Shape::Rect(r) => Self::rect(r, cache)?,
            Shape::Polystar(s) => Self::polystar(s, cache)?,
            _ => return Ok(None),
        };
        Ok(Some(evaluator))
    }

    fn new(name: Option<String>, source: ShapeSource, direction: Option<u8>) -> Self {
        Self {
            name,
            source,
            reversed: direction == Some(REVERSED),
            output: None,
            changed: true,
            epoch: None,
        }
    }

    pub fn path(model: &PathShape, cache: &mut EasingCache) -> Result<Self> {
        let source = ShapeSource::Path(PathSource::from_model(model, cache)?);
        Ok(Self::new(model.nm.clone(), source, model.d))
    }

    pub fn ellipse(model: &EllipseShape, cache: &mut EasingCache) -> Result<Self> {
        let source = ShapeSource::Ellipse(EllipseSource {
            size: vec2(&model.s, cache)?,
            position: vec2(&model.p, cache)?,
        });
        Ok(Self::new(model.nm.clone(), source, model.d))
    }

    pub fn rect(model: &RectShape, cache: &mut EasingCache) -> Result<Self> {
        let source = ShapeSource::Rect(RectSource {
            size: vec2(&model.s, cache)?,
            position: vec2(&model.p, cache)?,
            roundness: ScalarProperty::scalar(&model.r, 0.0, PropertyOptions::default(), cache),
        });
        Ok(Self::new(model.nm.clone(), source, model.d))
    }

    pub fn polystar(model: &PolystarShape, cache: &mut EasingCache) -> Result<Self> {
        let plain = PropertyOptions::default();
        let percent = PropertyOptions {
            multiplier: PERCENT,
            ..plain
        };
        let degrees = PropertyOptions {
            multiplier: DEG_TO_RAD,
            ..plain
        };
        let source = ShapeSource::Star(StarSource {
            kind: if model.sy == 2 {
                StarKind::Polygon
            } else {
                StarKind::Star
            },
            position: vec2(&model.p, cache)?,
            points: ScalarProperty::scalar(&model.pt, 5.0, plain, cache),
            rotation: ScalarProperty::scalar(&model.r, 0.0, degrees, cache),
            outer_radius: ScalarProperty::scalar(&model.or, 0.0, plain, cache),
            outer_roundness: ScalarProperty::scalar(&model.os, 0.0, percent, cache),
            inner_radius: optional_scalar(model.ir.as_ref(), plain, cache),
            inner_roundness: optional_scalar(model.is.as_ref(), percent, cache),
        });
        Ok(Self::new(model.nm.clone(), source, model.d))
    }

    /// Recomputes at most once per epoch. Returns whether the geometry changed.
    pub fn evaluate(&mut self, ctx: &FrameContext, pool: &mut GeometryPool) -> bool {
        if self.epoch == Some(ctx.epoch) {
            return self.changed;
        }
        let first = self.epoch.is_none();
        self.epoch = Some(ctx.epoch);
        let moved = self.source.refresh(ctx);
        self.changed = first || moved;
        if !self.changed {
            return false;
        }
        trace!(frame = ctx.frame, name = ?self.name, "shape recomputed");

        if let Some(old) = self.output.take() {
            pool.release_collection(old);
        }
        let mut path = pool.acquire_path(8);
        self.source.write(&mut path);
        if self.reversed {
            path.reverse();
        }
        let mut collection = pool.acquire_collection();
        collection.add_path(path);
        self.output = Some(collection);
        true
    }

    pub fn paths(&self) -> &[PathGeometry] {
        self.output.as_ref().map_or(&[], |c| &c.paths)
    }

    pub fn output(&self) -> Option<&ShapeCollection> {
        self.output.as_ref()
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the current output to the pool.
    pub fn release(&mut self, pool: &mut GeometryPool) {
        if let Some(old) = self.output.take() {
            pool.release_collection(old);
        }
        self.epoch = None;
    }
}

fn optional_scalar(
    p: Option<&Property<f32>>,
    options: PropertyOptions,
    cache: &mut EasingCache,
) -> ScalarProperty {
    match p {
        Some(p) => ScalarProperty::scalar(p, 0.0, options, cache),
        None => ScalarProperty::constant(0.0),
    }
}

fn vec2(
    p: &Property<Vec<f32>>,
    cache: &mut EasingCache,
) -> Result<VectorProperty> {
    VectorProperty::vector(p, Vec4::ZERO, 2, PropertyOptions::default(), cache)
}
