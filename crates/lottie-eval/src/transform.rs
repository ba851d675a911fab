use glam::{Vec2, Vec3, Vec4};
use lottie_data::model::{PositionProperty, Transform};
use tracing::trace;

use crate::animatable::{PropertyOptions, ScalarProperty, VectorProperty, DEG_TO_RAD, PERCENT};
use crate::easing::EasingCache;
use crate::errors::Result;
use crate::matrix::Matrix;
use crate::FrameContext;

const ORIENT_DELTA: f32 = 0.01;
const ORIENT_END_DELTA: f32 = 0.05;

#[derive(Clone, Debug)]
enum Position {
    Unified(VectorProperty),
    Split {
        x: ScalarProperty,
        y: ScalarProperty,
        z: Option<ScalarProperty>,
    },
}

impl Position {
    fn get_value(&mut self, ctx: &FrameContext) -> Vec3 {
        match self {
            Position::Unified(p) => p.get_value(ctx).truncate(),
            Position::Split { x, y, z } => Vec3::new(
                x.get_value(ctx),
                y.get_value(ctx),
                z.as_mut().map_or(0.0, |z| z.get_value(ctx)),
            ),
        }
    }

    fn changed(&self) -> bool {
        match self {
            Position::Unified(p) => p.changed(),
            Position::Split { x, y, z } => {
                x.changed() || y.changed() || z.as_ref().is_some_and(|z| z.changed())
            }
        }
    }

    fn value_at_frame(&self, frame: f32) -> Vec3 {
        match self {
            Position::Unified(p) => p.value_at_frame(frame).truncate(),
            Position::Split { x, y, z } => Vec3::new(
                x.value_at_frame(frame),
                y.value_at_frame(frame),
                z.as_ref().map_or(0.0, |z| z.value_at_frame(frame)),
            ),
        }
    }

    fn keyframe_range(&self) -> Option<(f32, f32)> {
        match self {
            Position::Unified(p) => p.keyframe_range(),
            Position::Split { x, y, .. } => match (x.keyframe_range(), y.keyframe_range()) {
                (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
                (a, b) => a.or(b),
            },
        }
    }
}

/// How a transform block is interpreted.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransformOptions {
    /// Rotate along the motion path instead of using the rotation property.
    pub auto_orient: bool,
    /// 2D transforms ignore depth, X/Y rotation and orientation.
    pub is_3d: bool,
}

/// The evaluated pieces a transform was built from, in output units
/// (radians, unit scale).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParts {
    pub anchor: Vec3,
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: f32,
    pub skew: f32,
    pub skew_axis: f32,
}

impl Default for TransformParts {
    fn default() -> Self {
        Self {
            anchor: Vec3::ZERO,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: 0.0,
            skew: 0.0,
            skew_axis: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TransformEvaluator {
    anchor: VectorProperty,
    position: Position,
    scale: VectorProperty,
    rotation: ScalarProperty,
    rotation_x: Option<ScalarProperty>,
    rotation_y: Option<ScalarProperty>,
    orientation: Option<VectorProperty>,
    skew: Option<ScalarProperty>,
    skew_axis: Option<ScalarProperty>,
    opacity: ScalarProperty,
    options: TransformOptions,
    parts: TransformParts,
    matrix: Matrix,
    opacity_value: f32,
    changed: bool,
    epoch: Option<u64>,
}

impl TransformEvaluator {
    pub fn from_model(
        t: &Transform,
        options: TransformOptions,
        cache: &mut EasingCache,
    ) -> Result<Self> {
        let percent = PropertyOptions {
            multiplier: PERCENT,
            ..PropertyOptions::default()
        };
        let degrees = PropertyOptions {
            multiplier: DEG_TO_RAD,
            ..PropertyOptions::default()
        };
        let arity = if options.is_3d { 3 } else { 2 };

        let position = match &t.p {
            PositionProperty::Unified(p) => {
                let spatial = PropertyOptions {
                    spatial: true,
                    ..PropertyOptions::default()
                };
                Position::Unified(VectorProperty::vector(p, Vec4::ZERO, arity, spatial, cache)?)
            }
            PositionProperty::Split { x, y, z } => Position::Split {
                x: ScalarProperty::scalar(x, 0.0, PropertyOptions::default(), cache),
                y: ScalarProperty::scalar(y, 0.0, PropertyOptions::default(), cache),
                z: z
                    .as_ref()
                    .filter(|_| options.is_3d)
                    .map(|z| ScalarProperty::scalar(z, 0.0, PropertyOptions::default(), cache)),
            },
        };
        let is_3d = options.is_3d;

        Ok(Self {
            anchor: VectorProperty::vector(
                &t.a,
                Vec4::ZERO,
                arity,
                PropertyOptions::default(),
                cache,
            )?,
            position,
            scale: VectorProperty::vector(
                &t.s,
                Vec4::new(100.0, 100.0, 100.0, 100.0),
                arity,
                percent,
                cache,
            )?,
            rotation: ScalarProperty::angle(&t.rz, cache),
            rotation_x: when_3d(&t.rx, is_3d).map(|p| ScalarProperty::angle(p, cache)),
            rotation_y: when_3d(&t.ry, is_3d).map(|p| ScalarProperty::angle(p, cache)),
            orientation: match when_3d(&t.or, is_3d) {
                Some(p) => Some(VectorProperty::vector(p, Vec4::ZERO, 3, degrees, cache)?),
                None => None,
            },
            skew: t.sk.as_ref().map(|p| ScalarProperty::scalar(p, 0.0, degrees, cache)),
            skew_axis: t.sa.as_ref().map(|p| ScalarProperty::scalar(p, 0.0, degrees, cache)),
            opacity: ScalarProperty::scalar(&t.o, 100.0, percent, cache),
            options,
            parts: TransformParts::default(),
            matrix: Matrix::new(),
            opacity_value: 1.0,
            changed: true,
            epoch: None,
        })
    }

    /// Brings the matrix and opacity up to date for `ctx`.
    pub fn evaluate(&mut self, ctx: &FrameContext) -> &Matrix {
        if self.epoch == Some(ctx.epoch) {
            return &self.matrix;
        }
        let first = self.epoch.is_none();
        self.epoch = Some(ctx.epoch);

        let anchor = self.anchor.get_value(ctx).truncate();
        let position = self.position.get_value(ctx);
        let scale = self.scale.get_value(ctx).truncate();
        let rotation = self.rotation.get_value(ctx);
        let rx = self.rotation_x.as_mut().map_or(0.0, |p| p.get_value(ctx));
        let ry = self.rotation_y.as_mut().map_or(0.0, |p| p.get_value(ctx));
        let orientation = self
            .orientation
            .as_mut()
            .map_or(Vec3::ZERO, |p| p.get_value(ctx).truncate());
        let skew = self.skew.as_mut().map_or(0.0, |p| p.get_value(ctx));
        let skew_axis = self.skew_axis.as_mut().map_or(0.0, |p| p.get_value(ctx));
        let opacity = self.opacity.get_value(ctx);

        let moved = self.anchor.changed()
            || self.position.changed()
            || self.scale.changed()
            || self.rotation.changed()
            || self.rotation_x.as_ref().is_some_and(|p| p.changed())
            || self.rotation_y.as_ref().is_some_and(|p| p.changed())
            || self.orientation.as_ref().is_some_and(|p| p.changed())
            || self.skew.as_ref().is_some_and(|p| p.changed())
            || self.skew_axis.as_ref().is_some_and(|p| p.changed());
        self.changed = first || moved || self.opacity.changed();
        self.opacity_value = opacity;
        if !(first || moved) {
            return &self.matrix;
        }
        trace!(frame = ctx.frame, "transform recomputed");

        let (anchor, position, scale) = if self.options.is_3d {
            (anchor, position, scale)
        } else {
            (
                anchor.truncate().extend(0.0),
                position.truncate().extend(0.0),
                scale.truncate().extend(1.0),
            )
        };
        let rotation = if self.options.auto_orient {
            self.orient_angle(ctx.frame)
        } else {
            rotation
        };
        self.parts = TransformParts {
            anchor,
            position,
            scale,
            rotation,
            skew,
            skew_axis,
        };

        let m = &mut self.matrix;
        m.reset()
            .translate(-anchor.x, -anchor.y, -anchor.z)
            .scale(scale.x, scale.y, scale.z)
            .skew_from_axis(-skew, skew_axis)
            .rotate_z(rotation)
            .rotate_y(ry)
            .rotate_x(rx)
            .rotate_z(orientation.z)
            .rotate_y(orientation.y)
            .rotate_x(orientation.x)
            .translate(position.x, position.y, position.z);
        &self.matrix
    }

    // Direction of travel from two nearby samples of the position track.
    fn orient_angle(&self, frame: f32) -> f32 {
        let Some((start, end)) = self.position.keyframe_range() else {
            return 0.0;
        };
        let (ahead, behind) = if frame <= start {
            (start + ORIENT_DELTA, start)
        } else if frame >= end {
            (end, end - ORIENT_END_DELTA)
        } else {
            (frame + ORIENT_DELTA, frame - ORIENT_DELTA)
        };
        let d: Vec2 = (self.position.value_at_frame(ahead) - self.position.value_at_frame(behind))
            .truncate();
        d.y.atan2(d.x)
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn opacity(&self) -> f32 {
        self.opacity_value
    }

    pub fn parts(&self) -> &TransformParts {
        &self.parts
    }

    pub fn changed(&self) -> bool {
        self.changed
    }
}

fn when_3d<T>(p: &Option<T>, is_3d: bool) -> Option<&T> {
    p.as_ref().filter(|_| is_3d)
}
