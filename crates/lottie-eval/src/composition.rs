use std::collections::HashMap;

use lottie_data::model::{Layer, LottieJson, Shape};
use tracing::{debug, instrument, trace, warn};

use crate::config::EvalConfig;
use crate::easing::EasingCache;
use crate::errors::{EvalError, Result};
use crate::geometry::ShapeCollection;
use crate::matrix::Matrix;
use crate::modifiers::{
    Modifier, RepeaterModifier, RoundCornersModifier, ShapeModifier, TrimModifier,
};
use crate::pool::GeometryPool;
use crate::shapes::ShapeEvaluator;
use crate::transform::{TransformEvaluator, TransformOptions};
use crate::FrameContext;

const SHAPE_LAYER: u8 = 4;

/// Evaluated state of one layer after [`Composition::evaluate`].
#[derive(Clone, Debug, PartialEq)]
pub struct LayerState {
    /// Local transform followed by every ancestor's.
    pub world: Matrix,
    /// The layer's own opacity; parents do not contribute.
    pub opacity: f32,
    pub visible: bool,
    pub changed: bool,
}

impl Default for LayerState {
    fn default() -> Self {
        Self {
            world: Matrix::new(),
            opacity: 1.0,
            visible: false,
            changed: true,
        }
    }
}

/// Final geometry of one shape item, or of one repeater copy of it, in layer space.
#[derive(Debug)]
pub struct ShapeOutput {
    pub name: Option<String>,
    pub collection: ShapeCollection,
    /// Product of the enclosing group opacities and the repeater copy opacities.
    pub opacity: f32,
}

struct ShapeNode {
    evaluator: ShapeEvaluator,
    /// Indices into `ShapeTree::transforms`, innermost group first.
    chain: Vec<usize>,
}

struct ModifierNode {
    modifier: Modifier,
    /// Shapes that precede the modifier inside its group, nested groups included.
    targets: Vec<usize>,
    /// Number of group transforms around the modifier.
    depth: usize,
}

/// One shape's geometry on its way to an output. Repeaters turn one fragment
/// into one per copy.
struct Fragment {
    shape: usize,
    collection: ShapeCollection,
    opacity: f32,
    /// Chain levels already applied to `collection`.
    baked: usize,
}

/// Flattened `shapes` tree of a shape layer.
#[derive(Default)]
struct ShapeTree {
    transforms: Vec<TransformEvaluator>,
    shapes: Vec<ShapeNode>,
    modifiers: Vec<ModifierNode>,
    outputs: Vec<ShapeOutput>,
    built: bool,
}

impl ShapeTree {
    fn build(items: &[Shape], cache: &mut EasingCache) -> Result<Self> {
        let mut tree = Self::default();
        tree.add_scope(items, &[], cache)?;
        Ok(tree)
    }

    fn add_scope(
        &mut self,
        items: &[Shape],
        parent_chain: &[usize],
        cache: &mut EasingCache,
    ) -> Result<()> {
        let mut chain = parent_chain.to_vec();
        if let Some(t) = items.iter().find_map(|item| match item {
            Shape::Transform(t) => Some(&t.t),
            _ => None,
        }) {
            let evaluator = TransformEvaluator::from_model(t, TransformOptions::default(), cache)?;
            self.transforms.push(evaluator);
            chain.insert(0, self.transforms.len() - 1);
        }

        let scope_start = self.shapes.len();
        for item in items {
            match item {
                Shape::Group(group) => {
                    debug!(name = ?group.nm, items = group.it.len(), "group");
                    self.add_scope(&group.it, &chain, cache)?;
                }
                Shape::Trim(model) => {
                    let modifier = Modifier::Trim(TrimModifier::from_model(model, cache));
                    self.add_modifier(modifier, scope_start, chain.len());
                }
                Shape::RoundCorners(model) => {
                    let modifier =
                        Modifier::RoundCorners(RoundCornersModifier::from_model(model, cache));
                    self.add_modifier(modifier, scope_start, chain.len());
                }
                Shape::Repeater(model) => {
                    let modifier = Modifier::Repeater(RepeaterModifier::from_model(model, cache)?);
                    self.add_modifier(modifier, scope_start, chain.len());
                }
                Shape::Transform(_) => {}
                Shape::Fill | Shape::Stroke | Shape::GradientFill | Shape::GradientStroke => {
                    trace!("paint item carries no geometry")
                }
                Shape::Unknown => warn!("skipping unsupported shape item"),
                geometry => {
                    if let Some(evaluator) = ShapeEvaluator::from_shape(geometry, cache)? {
                        debug!(name = ?evaluator.name(), "shape");
                        self.shapes.push(ShapeNode {
                            evaluator,
                            chain: chain.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn add_modifier(&mut self, modifier: Modifier, scope_start: usize, depth: usize) {
        let targets: Vec<usize> = (scope_start..self.shapes.len()).collect();
        if targets.is_empty() {
            debug!("modifier with nothing to modify");
        }
        self.modifiers.push(ModifierNode {
            modifier,
            targets,
            depth,
        });
    }

    /// Returns whether the outputs were rebuilt.
    fn evaluate(&mut self, ctx: &FrameContext, pool: &mut GeometryPool) -> bool {
        let mut changed = !self.built;
        for t in &mut self.transforms {
            t.evaluate(ctx);
            changed |= t.changed();
        }
        for s in &mut self.shapes {
            changed |= s.evaluator.evaluate(ctx, pool);
        }
        for m in &mut self.modifiers {
            changed |= m.modifier.update(ctx);
        }
        if changed {
            self.rebuild(pool);
            self.built = true;
        }
        changed
    }

    fn rebuild(&mut self, pool: &mut GeometryPool) {
        self.release_outputs(pool);

        let mut fragments: Vec<Fragment> = self
            .shapes
            .iter()
            .enumerate()
            .map(|(shape, s)| Fragment {
                shape,
                collection: match s.evaluator.output() {
                    Some(c) => pool.clone_collection(c, None),
                    None => pool.acquire_collection(),
                },
                opacity: 1.0,
                baked: 0,
            })
            .collect();

        for node in &mut self.modifiers {
            let (Some(&first), Some(&last)) = (node.targets.first(), node.targets.last()) else {
                continue;
            };
            // Scopes nest, so the fragments of a scope stay contiguous.
            let in_scope = |f: &Fragment| (first..=last).contains(&f.shape);
            let start = fragments
                .iter()
                .position(|f| in_scope(f))
                .unwrap_or(fragments.len());
            let end = start + fragments[start..].iter().take_while(|f| in_scope(*f)).count();

            if let Some(repeater) = node.modifier.as_repeater() {
                // Copies step in the repeater's group space.
                for f in &mut fragments[start..end] {
                    let chain = &self.shapes[f.shape].chain;
                    let until = chain.len().saturating_sub(node.depth);
                    if until > f.baked {
                        bake(&mut f.collection, &chain[f.baked..until], &self.transforms, pool);
                        f.baked = until;
                    }
                }
                let sources: Vec<Fragment> = fragments.drain(start..end).collect();
                let mut copies = Vec::with_capacity(sources.len() * repeater.copies().len());
                for copy in repeater.painted_copies() {
                    for f in &sources {
                        copies.push(Fragment {
                            shape: f.shape,
                            collection: pool.clone_collection(&f.collection, Some(&copy.matrix)),
                            opacity: f.opacity * copy.opacity,
                            baked: f.baked,
                        });
                    }
                }
                for f in sources {
                    pool.release_collection(f.collection);
                }
                fragments.splice(start..start, copies);
                continue;
            }

            let mut scoped: Vec<ShapeCollection> = fragments[start..end]
                .iter_mut()
                .map(|f| std::mem::take(&mut f.collection))
                .collect();
            let indices: Vec<usize> = (0..scoped.len()).collect();
            node.modifier.apply(&mut scoped, &indices, pool);
            for (f, collection) in fragments[start..end].iter_mut().zip(scoped) {
                f.collection = collection;
            }
        }

        for mut f in fragments {
            let shape = &self.shapes[f.shape];
            bake(&mut f.collection, &shape.chain[f.baked..], &self.transforms, pool);
            let groups: f32 = shape
                .chain
                .iter()
                .map(|&t| self.transforms[t].opacity())
                .product();
            self.outputs.push(ShapeOutput {
                name: shape.evaluator.name().map(str::to_owned),
                collection: f.collection,
                opacity: f.opacity * groups,
            });
        }
    }

    fn release_outputs(&mut self, pool: &mut GeometryPool) {
        for output in self.outputs.drain(..) {
            pool.release_collection(output.collection);
        }
    }

    fn release(&mut self, pool: &mut GeometryPool) {
        self.release_outputs(pool);
        for s in &mut self.shapes {
            s.evaluator.release(pool);
        }
        self.built = false;
    }
}

/// Maps `collection` through `levels`, innermost first.
fn bake(
    collection: &mut ShapeCollection,
    levels: &[usize],
    transforms: &[TransformEvaluator],
    pool: &mut GeometryPool,
) {
    let mut matrix = Matrix::new();
    for &t in levels {
        matrix.multiply(transforms[t].matrix());
    }
    if matrix.is_identity() {
        return;
    }
    let mapped = pool.clone_collection(collection, Some(&matrix));
    let old = std::mem::replace(collection, mapped);
    pool.release_collection(old);
}

struct LayerNode {
    name: Option<String>,
    in_point: f32,
    out_point: f32,
    start_time: f32,
    stretch: f32,
    transform: TransformEvaluator,
    /// Ancestor layer indices, nearest parent first.
    parents: Vec<usize>,
    content: Option<ShapeTree>,
    state: LayerState,
}

impl LayerNode {
    fn local_frame(&self, frame: f32) -> f32 {
        let stretch = if self.stretch == 0.0 { 1.0 } else { self.stretch };
        (frame - self.start_time) / stretch
    }
}

/// A loaded document: owns every evaluator, the easing cache, the geometry pool
/// and the epoch counter.
pub struct Composition {
    config: EvalConfig,
    cache: EasingCache,
    pool: GeometryPool,
    epoch: u64,
    frame_rate: f32,
    in_point: f32,
    out_point: f32,
    width: u32,
    height: u32,
    layers: Vec<LayerNode>,
}

impl Composition {
    #[instrument(skip_all, fields(layers = data.layers.len()))]
    pub fn load(data: &LottieJson, config: EvalConfig) -> Result<Self> {
        config.validate()?;
        let mut cache = EasingCache::new(config);
        let parents = resolve_parents(&data.layers)?;

        let mut layers = Vec::with_capacity(data.layers.len());
        for (layer, parents) in data.layers.iter().zip(parents) {
            debug!(name = ?layer.nm, ty = layer.ty, ind = ?layer.ind, "layer");
            let options = TransformOptions {
                auto_orient: layer.ao == Some(1),
                is_3d: layer.ddd == Some(1),
            };
            let transform = TransformEvaluator::from_model(&layer.ks, options, &mut cache)?;
            let content = match (&layer.shapes, layer.ty) {
                (Some(items), SHAPE_LAYER) => Some(ShapeTree::build(items, &mut cache)?),
                _ => None,
            };
            layers.push(LayerNode {
                name: layer.nm.clone(),
                in_point: layer.ip,
                out_point: layer.op,
                start_time: layer.st,
                stretch: layer.sr,
                transform,
                parents,
                content,
                state: LayerState::default(),
            });
        }
        debug!(easings = cache.len(), "composition loaded");

        Ok(Self {
            config,
            cache,
            pool: GeometryPool::new(),
            epoch: 0,
            frame_rate: data.fr,
            in_point: data.ip,
            out_point: data.op,
            width: data.w,
            height: data.h,
            layers,
        })
    }

    pub fn from_json(text: &str, config: EvalConfig) -> Result<Self> {
        let data: LottieJson = serde_json::from_str(text)?;
        Self::load(&data, config)
    }

    /// Starts a new epoch and evaluates every layer at `frame`.
    pub fn evaluate(&mut self, frame: f32) {
        self.epoch += 1;
        let ctx = FrameContext::new(frame, self.epoch, self.frame_rate);
        self.evaluate_context(&ctx);
    }

    /// Evaluates with a caller-supplied epoch. Evaluators that already saw
    /// `ctx.epoch` return their cached results.
    pub fn evaluate_context(&mut self, ctx: &FrameContext) {
        self.epoch = self.epoch.max(ctx.epoch);
        trace!(frame = ctx.frame, epoch = ctx.epoch, "evaluate");

        for layer in &mut self.layers {
            let local = ctx.with_frame(layer.local_frame(ctx.frame));
            layer.transform.evaluate(&local);
        }

        let worlds: Vec<(Matrix, bool)> = self
            .layers
            .iter()
            .map(|layer| {
                let mut world = layer.transform.matrix().clone();
                let mut changed = layer.transform.changed();
                for &p in &layer.parents {
                    let parent = &self.layers[p].transform;
                    world.multiply(parent.matrix());
                    changed |= parent.changed();
                }
                (world, changed)
            })
            .collect();

        for (layer, (world, moved)) in self.layers.iter_mut().zip(worlds) {
            let visible = ctx.frame >= layer.in_point && ctx.frame < layer.out_point;
            let mut changed = moved || visible != layer.state.visible;
            let local = ctx.with_frame(layer.local_frame(ctx.frame));
            if let (true, Some(content)) = (visible, &mut layer.content) {
                changed |= content.evaluate(&local, &mut self.pool);
            }
            layer.state = LayerState {
                world,
                opacity: layer.transform.opacity(),
                visible,
                changed,
            };
        }
    }

    /// Returns every pooled object to the pool. The next evaluation rebuilds them.
    pub fn release(&mut self) {
        for layer in &mut self.layers {
            if let Some(content) = &mut layer.content {
                content.release(&mut self.pool);
            }
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_state(&self, index: usize) -> Option<&LayerState> {
        self.layers.get(index).map(|l| &l.state)
    }

    pub fn layer_name(&self, index: usize) -> Option<&str> {
        self.layers.get(index).and_then(|l| l.name.as_deref())
    }

    /// Shape outputs of a shape layer, in document order. Empty for other layers
    /// and for shape layers that have not been visible yet.
    pub fn layer_shapes(&self, index: usize) -> &[ShapeOutput] {
        self.layers
            .get(index)
            .and_then(|l| l.content.as_ref())
            .map_or(&[], |c| &c.outputs)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn in_point(&self) -> f32 {
        self.in_point
    }

    pub fn out_point(&self) -> f32 {
        self.out_point
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Number of distinct easing curves shared by all keyframes.
    pub fn easing_count(&self) -> usize {
        self.cache.len()
    }

    pub fn pool(&self) -> &GeometryPool {
        &self.pool
    }
}

/// Resolves each layer's ancestor list, nearest parent first.
fn resolve_parents(layers: &[Layer]) -> Result<Vec<Vec<usize>>> {
    let by_ind: HashMap<u32, usize> = layers
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.ind.map(|ind| (ind, i)))
        .collect();
    let id = |i: usize| layers[i].ind.unwrap_or(i as u32);

    let mut out = Vec::with_capacity(layers.len());
    for start in 0..layers.len() {
        let mut chain = Vec::new();
        let mut current = start;
        while let Some(parent) = layers[current].parent {
            let next = *by_ind.get(&parent).ok_or(EvalError::UnknownParent {
                layer: id(current),
                parent,
            })?;
            if next == start || chain.contains(&next) {
                return Err(EvalError::ParentCycle(id(start)));
            }
            chain.push(next);
            current = next;
        }
        out.push(chain);
    }
    Ok(out)
}
