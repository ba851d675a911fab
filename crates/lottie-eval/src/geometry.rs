use glam::Vec2;
use kurbo::BezPath;
use lottie_data::model::BezierPath;

/// Which of the three per-vertex arrays a point belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointKind {
    Vertex,
    In,
    Out,
}

/// A single cubic segment: start vertex, its out handle, the next in handle, next vertex.
pub type Cubic = [Vec2; 4];

/// Growable poly-bezier. Control points are absolute positions.
///
/// The backing arrays only ever grow; `len()` is the logical vertex count and
/// everything past it is stale storage kept for reuse.
#[derive(Clone, Debug, Default)]
pub struct PathGeometry {
    vertices: Vec<Vec2>,
    in_points: Vec<Vec2>,
    out_points: Vec<Vec2>,
    length: usize,
    pub closed: bool,
}

impl PartialEq for PathGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.closed == other.closed
            && self.vertices() == other.vertices()
            && self.in_points() == other.in_points()
            && self.out_points() == other.out_points()
    }
}

impl PathGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.length]
    }

    pub fn in_points(&self) -> &[Vec2] {
        &self.in_points[..self.length]
    }

    pub fn out_points(&self) -> &[Vec2] {
        &self.out_points[..self.length]
    }

    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }

    pub fn in_point(&self, index: usize) -> Vec2 {
        self.in_points[index]
    }

    pub fn out_point(&self, index: usize) -> Vec2 {
        self.out_points[index]
    }

    /// Forgets the contents without giving back storage.
    pub fn clear(&mut self) {
        self.length = 0;
        self.closed = false;
    }

    pub fn set_length(&mut self, length: usize) {
        if length > self.vertices.len() {
            let grown = length.max(self.vertices.len() * 2);
            self.vertices.resize(grown, Vec2::ZERO);
            self.in_points.resize(grown, Vec2::ZERO);
            self.out_points.resize(grown, Vec2::ZERO);
        }
        self.length = length;
    }

    fn ensure_index(&mut self, index: usize) {
        if index >= self.length {
            self.set_length(index + 1);
        }
    }

    pub fn set_triple_at(&mut self, vertex: Vec2, out_point: Vec2, in_point: Vec2, index: usize) {
        self.ensure_index(index);
        self.vertices[index] = vertex;
        self.out_points[index] = out_point;
        self.in_points[index] = in_point;
    }

    pub fn set_xy_at(&mut self, point: Vec2, kind: PointKind, index: usize) {
        self.ensure_index(index);
        match kind {
            PointKind::Vertex => self.vertices[index] = point,
            PointKind::In => self.in_points[index] = point,
            PointKind::Out => self.out_points[index] = point,
        }
    }

    pub fn push_triple(&mut self, vertex: Vec2, out_point: Vec2, in_point: Vec2) {
        let index = self.length;
        self.set_triple_at(vertex, out_point, in_point, index);
    }

    pub fn copy_from(&mut self, other: &PathGeometry) {
        self.set_length(other.len());
        self.closed = other.closed;
        self.vertices[..other.len()].copy_from_slice(other.vertices());
        self.in_points[..other.len()].copy_from_slice(other.in_points());
        self.out_points[..other.len()].copy_from_slice(other.out_points());
    }

    /// Loads a document path, turning its relative tangents into absolute points.
    pub fn copy_from_model(&mut self, model: &BezierPath) {
        let count = model.v.len();
        self.set_length(count);
        self.closed = model.c;
        for (index, v) in model.v.iter().enumerate() {
            let vertex = Vec2::from(*v);
            let in_offset = model.i.get(index).copied().map(Vec2::from).unwrap_or_default();
            let out_offset = model.o.get(index).copied().map(Vec2::from).unwrap_or_default();
            self.vertices[index] = vertex;
            self.in_points[index] = vertex + in_offset;
            self.out_points[index] = vertex + out_offset;
        }
    }

    /// Walks the path tail to head. The first vertex of a closed path stays
    /// first; in and out handles trade places.
    pub fn reverse(&mut self) {
        let start = usize::from(self.closed);
        if self.length <= start + 1 {
            if self.closed || self.length == 1 {
                self.swap_handles();
            }
            return;
        }
        self.vertices[start..self.length].reverse();
        self.in_points[start..self.length].reverse();
        self.out_points[start..self.length].reverse();
        self.swap_handles();
    }

    fn swap_handles(&mut self) {
        let n = self.length;
        self.in_points[..n].swap_with_slice(&mut self.out_points[..n]);
    }

    pub fn segment_count(&self) -> usize {
        match self.length {
            0 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }

    pub fn segment(&self, index: usize) -> Cubic {
        let next = (index + 1) % self.length;
        [
            self.vertices[index],
            self.out_points[index],
            self.in_points[next],
            self.vertices[next],
        ]
    }

    pub fn segments(&self) -> impl Iterator<Item = Cubic> + '_ {
        (0..self.segment_count()).map(move |i| self.segment(i))
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        self.append_to(&mut path);
        path
    }

    pub fn append_to(&self, path: &mut BezPath) {
        if self.is_empty() {
            return;
        }
        path.move_to(to_point(self.vertices[0]));
        for [_, c1, c2, p] in self.segments() {
            path.curve_to(to_point(c1), to_point(c2), to_point(p));
        }
        if self.closed {
            path.close_path();
        }
    }
}

fn to_point(v: Vec2) -> kurbo::Point {
    kurbo::Point::new(v.x as f64, v.y as f64)
}

/// Ordered set of paths produced by one shape or modifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeCollection {
    pub paths: Vec<PathGeometry>,
}

impl ShapeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_path(&mut self, path: PathGeometry) {
        self.paths.push(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for p in &self.paths {
            p.append_to(&mut path);
        }
        path
    }
}
