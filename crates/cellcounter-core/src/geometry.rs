//! Polygon ROI geometry
//!
//! Polygons are open while the operator is drawing them and closed once
//! finalized. Containment uses the even-odd rule, so self-intersecting
//! outlines behave consistently with that rule rather than being rejected.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// A 2D coordinate in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An operator-drawn region of interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point>,
    closed: bool,
}

impl Polygon {
    /// New open polygon with zero vertices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a closed polygon from a vertex list in one step.
    pub fn from_vertices(vertices: impl IntoIterator<Item = Point>) -> Result<Self, GeometryError> {
        let mut polygon = Self::new();
        for vertex in vertices {
            polygon.add_vertex(vertex)?;
        }
        polygon.close()?;
        Ok(polygon)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append a vertex to an open polygon.
    pub fn add_vertex(&mut self, point: Point) -> Result<(), GeometryError> {
        if self.closed {
            return Err(GeometryError::AlreadyClosed);
        }
        self.vertices.push(point);
        Ok(())
    }

    /// Finalize the outline. Closing an already closed polygon is a no-op.
    pub fn close(&mut self) -> Result<(), GeometryError> {
        if self.closed {
            return Ok(());
        }
        if self.vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(self.vertices.len()));
        }
        self.closed = true;
        Ok(())
    }

    /// Remove the last vertex while drawing. No-op on an empty open polygon.
    pub fn undo_vertex(&mut self) -> Result<Option<Point>, GeometryError> {
        if self.closed {
            return Err(GeometryError::AlreadyClosed);
        }
        Ok(self.vertices.pop())
    }

    /// Even-odd containment test, O(vertices). Open polygons contain nothing.
    pub fn contains(&self, point: Point) -> bool {
        if !self.closed {
            return false;
        }
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > point.y) != (b.y > point.y) {
                let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Enclosed area in square pixels (shoelace formula). Zero while open.
    pub fn area(&self) -> f64 {
        if !self.closed {
            return 0.0;
        }
        let n = self.vertices.len();
        let mut doubled = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            doubled += a.x * b.y - b.x * a.y;
        }
        doubled.abs() / 2.0
    }
}
