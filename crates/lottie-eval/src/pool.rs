//! Freelists for per-frame geometry.
//!
//! Objects move out of the pool on acquire and back in on release, so whoever
//! released a buffer can no longer touch it.

use glam::Vec2;

use crate::geometry::{PathGeometry, ShapeCollection};
use crate::matrix::Matrix;

#[derive(Debug, Default)]
pub struct GeometryPool {
    points: Vec<Vec<Vec2>>,
    paths: Vec<PathGeometry>,
    collections: Vec<ShapeCollection>,
    outstanding_points: usize,
    outstanding_paths: usize,
    outstanding_collections: usize,
}

impl GeometryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zeroed point buffer of `len` entries.
    pub fn acquire_points(&mut self, len: usize) -> Vec<Vec2> {
        self.outstanding_points += 1;
        let mut buf = self.points.pop().unwrap_or_default();
        buf.clear();
        buf.resize(len, Vec2::ZERO);
        buf
    }

    pub fn release_points(&mut self, buf: Vec<Vec2>) {
        debug_assert!(self.outstanding_points > 0, "point buffer released twice");
        self.outstanding_points = self.outstanding_points.saturating_sub(1);
        self.points.push(buf);
    }

    /// An empty open path with room for at least `len` vertices.
    pub fn acquire_path(&mut self, len: usize) -> PathGeometry {
        self.outstanding_paths += 1;
        let mut path = self.paths.pop().unwrap_or_default();
        path.set_length(len);
        path.clear();
        path
    }

    pub fn release_path(&mut self, path: PathGeometry) {
        debug_assert!(self.outstanding_paths > 0, "path released twice");
        self.outstanding_paths = self.outstanding_paths.saturating_sub(1);
        self.paths.push(path);
    }

    pub fn acquire_collection(&mut self) -> ShapeCollection {
        self.outstanding_collections += 1;
        self.collections.pop().unwrap_or_default()
    }

    /// Gives back the collection and every path it still holds.
    pub fn release_collection(&mut self, mut collection: ShapeCollection) {
        debug_assert!(
            self.outstanding_collections > 0,
            "collection released twice"
        );
        for path in collection.paths.drain(..) {
            self.release_path(path);
        }
        self.outstanding_collections = self.outstanding_collections.saturating_sub(1);
        self.collections.push(collection);
    }

    /// Deep copy into a pooled path, optionally mapping every point through `matrix`.
    pub fn clone_path(&mut self, path: &PathGeometry, matrix: Option<&Matrix>) -> PathGeometry {
        let mut copy = self.acquire_path(path.len());
        match matrix {
            Some(m) if !m.is_identity() => {
                copy.closed = path.closed;
                for i in 0..path.len() {
                    copy.set_triple_at(
                        m.apply_to_point_2d(path.vertex(i)),
                        m.apply_to_point_2d(path.out_point(i)),
                        m.apply_to_point_2d(path.in_point(i)),
                        i,
                    );
                }
            }
            _ => copy.copy_from(path),
        }
        copy
    }

    /// Copies every path of `source` into a new pooled collection.
    pub fn clone_collection(
        &mut self,
        source: &ShapeCollection,
        matrix: Option<&Matrix>,
    ) -> ShapeCollection {
        let mut out = self.acquire_collection();
        for path in &source.paths {
            let copy = self.clone_path(path, matrix);
            out.add_path(copy);
        }
        out
    }

    pub fn outstanding_points(&self) -> usize {
        self.outstanding_points
    }

    pub fn outstanding_paths(&self) -> usize {
        self.outstanding_paths
    }

    pub fn outstanding_collections(&self) -> usize {
        self.outstanding_collections
    }

    pub fn free_paths(&self) -> usize {
        self.paths.len()
    }
}
