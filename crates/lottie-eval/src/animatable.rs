use std::f32::consts::PI;
use std::fmt::Debug;
use std::rc::Rc;

use glam::{Vec3, Vec4};
use lottie_data::model::{BezierTangent, Keyframe, Property, Value};

use crate::arc_length::ArcLengthTable;
use crate::easing::{BezierEasing, EasingCache};
use crate::errors::{EvalError, Result};
use crate::FrameContext;

pub const DEG_TO_RAD: f32 = PI / 180.0;
pub const PERCENT: f32 = 0.01;

pub trait Interpolatable: Copy + PartialEq + Default + Debug {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Blends each component with its own eased fraction.
    fn lerp_components(&self, other: &Self, eased: &[f32; 4]) -> Self {
        self.lerp(other, eased[0])
    }

    fn scaled(&self, factor: f32) -> Self;

    /// End value reached by turning the short way from `self`, in degrees.
    fn shortest_angle_to(&self, end: &Self) -> Self {
        *end
    }

    fn spatial_point(&self) -> Option<Vec3> {
        None
    }

    fn with_spatial_point(&self, _point: Vec3) -> Self {
        *self
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn scaled(&self, factor: f32) -> Self {
        self * factor
    }

    fn shortest_angle_to(&self, end: &Self) -> Self {
        self + ((end - self + 180.0).rem_euclid(360.0) - 180.0)
    }
}

impl Interpolatable for Vec4 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }

    fn lerp_components(&self, other: &Self, eased: &[f32; 4]) -> Self {
        *self + (*other - *self) * Vec4::from_array(*eased)
    }

    fn scaled(&self, factor: f32) -> Self {
        *self * factor
    }

    fn spatial_point(&self) -> Option<Vec3> {
        Some(self.truncate())
    }

    fn with_spatial_point(&self, point: Vec3) -> Self {
        point.extend(self.w)
    }
}

// ================================================================================================
// Keyframe timing
// ================================================================================================

#[derive(Clone, Debug)]
pub(crate) struct KeyframeSpan {
    pub start: f32,
    pub end: f32,
    pub hold: bool,
    // One solver per component; the last one repeats for the remaining components.
    easing: Vec<Rc<BezierEasing>>,
}

/// Where a frame falls on a keyframe timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Sample {
    Before,
    After,
    Hold(usize),
    Blend(usize, f32),
}

#[derive(Clone, Debug)]
pub(crate) struct Timeline {
    spans: Vec<KeyframeSpan>,
}

impl Timeline {
    /// Needs at least two keyframes.
    pub fn build<T>(keyframes: &[Keyframe<T>], cache: &mut EasingCache) -> Self {
        let spans = keyframes
            .windows(2)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                let hold = a.h == Some(1);
                let easing = if hold {
                    Vec::new()
                } else {
                    span_easing(a.o.as_ref(), a.i.as_ref(), cache)
                };
                KeyframeSpan {
                    start: a.t,
                    end: b.t,
                    hold,
                    easing,
                }
            })
            .collect();
        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn start_time(&self) -> f32 {
        self.spans[0].start
    }

    pub fn end_time(&self) -> f32 {
        self.spans[self.spans.len() - 1].end
    }

    /// Scans forward from `hint`, falling back to the first span when the hint is past `frame`.
    pub fn sample(&self, frame: f32, hint: usize) -> Sample {
        let last = self.spans.len() - 1;
        if frame < self.spans[0].start {
            return Sample::Before;
        }
        if frame >= self.spans[last].end {
            return Sample::After;
        }
        let mut index = hint.min(last);
        if frame < self.spans[index].start {
            index = 0;
        }
        while index < last && frame >= self.spans[index].end {
            index += 1;
        }
        let span = &self.spans[index];
        if span.hold {
            Sample::Hold(index)
        } else {
            Sample::Blend(index, (frame - span.start) / (span.end - span.start))
        }
    }

    pub fn ease(&self, index: usize, perc: f32) -> [f32; 4] {
        let easing = &self.spans[index].easing;
        match easing.len() {
            0 => [perc; 4],
            1 => [easing[0].get(perc); 4],
            n => std::array::from_fn(|c| easing[c.min(n - 1)].get(perc)),
        }
    }
}

fn span_easing(
    out_handle: Option<&BezierTangent>,
    in_handle: Option<&BezierTangent>,
    cache: &mut EasingCache,
) -> Vec<Rc<BezierEasing>> {
    let components = out_handle
        .map_or(1, |h| h.x.len())
        .max(in_handle.map_or(1, |h| h.x.len()))
        .clamp(1, 4);
    (0..components)
        .map(|c| {
            let (x1, y1) = handle_component(out_handle, c, 0.0);
            let (x2, y2) = handle_component(in_handle, c, 1.0);
            cache.get(x1, y1, x2, y2)
        })
        .collect()
}

fn handle_component(handle: Option<&BezierTangent>, c: usize, fallback: f32) -> (f32, f32) {
    let pick = |v: &[f32]| match v.len() {
        0 => fallback,
        n => v[c.min(n - 1)],
    };
    handle.map_or((fallback, fallback), |h| (pick(&h.x), pick(&h.y)))
}

// ================================================================================================
// Properties
// ================================================================================================

#[derive(Clone, Debug)]
struct Keyframes<V> {
    timeline: Timeline,
    // Start and end value of each span.
    values: Vec<(V, V)>,
    motion: Vec<Option<ArcLengthTable<Vec3>>>,
    first: V,
    last: V,
}

impl<V: Interpolatable> Keyframes<V> {
    fn evaluate(&self, frame: f32, hint: usize) -> (V, usize) {
        match self.timeline.sample(frame, hint) {
            Sample::Before => (self.first, 0),
            Sample::After => (self.last, self.timeline.len() - 1),
            Sample::Hold(i) => (self.values[i].0, i),
            Sample::Blend(i, perc) => {
                let eased = self.timeline.ease(i, perc);
                let (start, end) = &self.values[i];
                let value = match &self.motion[i] {
                    Some(table) => {
                        start.with_spatial_point(table.point_at_length(table.length() * eased[0]))
                    }
                    None => start.lerp_components(end, &eased),
                };
                (value, i)
            }
        }
    }
}

#[derive(Clone, Debug)]
enum ValueSource<V> {
    Static(V),
    Keyframed(Keyframes<V>),
}

/// A static or keyframed value with a per-epoch cache.
#[derive(Clone, Debug)]
pub struct AnimatedProperty<V> {
    source: ValueSource<V>,
    multiplier: f32,
    arity: usize,
    value: V,
    last_frame: Option<f32>,
    last_index: usize,
    epoch: Option<u64>,
    changed: bool,
}

pub type ScalarProperty = AnimatedProperty<f32>;
pub type VectorProperty = AnimatedProperty<Vec4>;

/// Load-time knobs for one property.
#[derive(Clone, Copy, Debug)]
pub struct PropertyOptions {
    pub multiplier: f32,
    /// Interpolate across the ±180° seam the short way. Values are in degrees.
    pub angular: bool,
    /// Follow `to`/`ti` tangents as a motion path.
    pub spatial: bool,
}

impl Default for PropertyOptions {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            angular: false,
            spatial: false,
        }
    }
}

impl<V: Interpolatable> AnimatedProperty<V> {
    pub fn constant(value: V) -> Self {
        Self::with_source(ValueSource::Static(value), 1.0, 1)
    }

    fn with_source(source: ValueSource<V>, multiplier: f32, arity: usize) -> Self {
        let value = match &source {
            ValueSource::Static(v) => v.scaled(multiplier),
            ValueSource::Keyframed(k) => k.first.scaled(multiplier),
        };
        Self {
            source,
            multiplier,
            arity,
            value,
            last_frame: None,
            last_index: 0,
            epoch: None,
            changed: true,
        }
    }

    fn build<T>(
        k: &Value<T>,
        convert: impl Fn(&T) -> V,
        fallback: V,
        options: PropertyOptions,
        arity: usize,
        cache: &mut EasingCache,
    ) -> Self {
        let keyframes = match k {
            Value::Default => {
                return Self::with_source(ValueSource::Static(fallback), options.multiplier, arity)
            }
            Value::Static(v) => {
                return Self::with_source(ValueSource::Static(convert(v)), options.multiplier, arity)
            }
            Value::Animated(kfs) => kfs,
        };
        if keyframes.len() == 1 {
            let v = keyframes[0].s.as_ref().map_or(fallback, &convert);
            return Self::with_source(ValueSource::Static(v), options.multiplier, arity);
        }

        let timeline = Timeline::build(keyframes, cache);
        let segments = cache.config().curve_segments;
        let mut values = Vec::with_capacity(timeline.len());
        let mut motion = Vec::with_capacity(timeline.len());
        let mut carried = fallback;
        for pair in keyframes.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let start = a.s.as_ref().map_or(carried, &convert);
            let mut end = if a.h == Some(1) {
                start
            } else {
                a.e.as_ref().or(b.s.as_ref()).map_or(start, &convert)
            };
            if options.angular {
                end = start.shortest_angle_to(&end);
            }
            motion.push(if options.spatial && a.h != Some(1) {
                motion_table(&start, &end, a, segments)
            } else {
                None
            });
            values.push((start, end));
            carried = end;
        }
        let first = values[0].0;
        let last = keyframes[keyframes.len() - 1]
            .s
            .as_ref()
            .map_or(carried, &convert);

        Self::with_source(
            ValueSource::Keyframed(Keyframes {
                timeline,
                values,
                motion,
                first,
                last,
            }),
            options.multiplier,
            arity,
        )
    }

    /// Value at `ctx.frame`, recomputed at most once per epoch.
    pub fn get_value(&mut self, ctx: &FrameContext) -> V {
        if self.epoch == Some(ctx.epoch) {
            return self.value;
        }
        let first = self.epoch.is_none();
        self.epoch = Some(ctx.epoch);
        match &self.source {
            ValueSource::Static(_) => self.changed = first,
            ValueSource::Keyframed(keyframes) => {
                if self.last_frame == Some(ctx.frame) {
                    self.changed = false;
                    return self.value;
                }
                let hint = match self.last_frame {
                    Some(last) if ctx.frame >= last => self.last_index,
                    _ => 0,
                };
                let (raw, index) = keyframes.evaluate(ctx.frame, hint);
                let value = raw.scaled(self.multiplier);
                self.changed = first || value != self.value;
                self.value = value;
                self.last_index = index;
                self.last_frame = Some(ctx.frame);
            }
        }
        self.value
    }

    /// Samples without touching the cache.
    pub fn value_at_frame(&self, frame: f32) -> V {
        match &self.source {
            ValueSource::Static(v) => v.scaled(self.multiplier),
            ValueSource::Keyframed(keyframes) => {
                keyframes.evaluate(frame, 0).0.scaled(self.multiplier)
            }
        }
    }

    pub fn value(&self) -> V {
        self.value
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.source, ValueSource::Keyframed(_))
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// First and last keyframe times.
    pub fn keyframe_range(&self) -> Option<(f32, f32)> {
        match &self.source {
            ValueSource::Static(_) => None,
            ValueSource::Keyframed(k) => Some((k.timeline.start_time(), k.timeline.end_time())),
        }
    }
}

fn motion_table<V: Interpolatable, T>(
    start: &V,
    end: &V,
    keyframe: &Keyframe<T>,
    segments: usize,
) -> Option<ArcLengthTable<Vec3>> {
    let (s, e) = (start.spatial_point()?, end.spatial_point()?);
    let to = tangent(keyframe.to.as_deref());
    let ti = tangent(keyframe.ti.as_deref());
    if s == e || (to == Vec3::ZERO && ti == Vec3::ZERO) {
        return None;
    }
    if on_line(s, e, s + to) && on_line(s, e, e + ti) {
        return None;
    }
    Some(ArcLengthTable::build(&[s, s + to, e + ti, e], segments))
}

fn tangent(v: Option<&[f32]>) -> Vec3 {
    let v = v.unwrap_or_default();
    let at = |i: usize| v.get(i).copied().unwrap_or(0.0);
    Vec3::new(at(0), at(1), at(2))
}

fn on_line(a: Vec3, b: Vec3, p: Vec3) -> bool {
    (b - a).cross(p - a).length() < 0.001
}

impl ScalarProperty {
    pub fn scalar(
        prop: &Property<f32>,
        default: f32,
        options: PropertyOptions,
        cache: &mut EasingCache,
    ) -> Self {
        Self::build(&prop.k, |v| *v, default, options, 1, cache)
    }

    /// Degrees in the document, radians out.
    pub fn angle(prop: &Property<f32>, cache: &mut EasingCache) -> Self {
        let options = PropertyOptions {
            multiplier: DEG_TO_RAD,
            angular: cache.config().shortest_rotation,
            spatial: false,
        };
        Self::scalar(prop, 0.0, options, cache)
    }
}

impl VectorProperty {
    /// Missing components come from `default`. The arity is the length of the
    /// first value in the document, or `arity` when the document has none.
    pub fn vector(
        prop: &Property<Vec<f32>>,
        default: Vec4,
        arity: usize,
        options: PropertyOptions,
        cache: &mut EasingCache,
    ) -> Result<Self> {
        let arity = match first_len(&prop.k) {
            Some(0) | None => arity,
            Some(n) => n,
        };
        if !(2..=4).contains(&arity) {
            return Err(EvalError::InvalidArity(arity));
        }
        let convert = |v: &Vec<f32>| to_vec4(v, default);
        Ok(Self::build(&prop.k, convert, default, options, arity, cache))
    }
}

fn first_len(k: &Value<Vec<f32>>) -> Option<usize> {
    match k {
        Value::Default => None,
        Value::Static(v) => Some(v.len()),
        Value::Animated(kfs) => kfs.iter().find_map(|kf| kf.s.as_ref().map(Vec::len)),
    }
}

fn to_vec4(values: &[f32], default: Vec4) -> Vec4 {
    let d = default.to_array();
    Vec4::from_array(std::array::from_fn(|i| values.get(i).copied().unwrap_or(d[i])))
}
