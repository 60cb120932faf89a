//! Triangle meshes for markers, cards, and the background
//!
//! Meshes are plain CPU-side geometry. The GL renderer uploads them on first
//! use; the raycaster intersects the same triangles.

use glam::Vec3;
use std::f32::consts::TAU;

/// Indexed triangle mesh with per-vertex normals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// A flat disc with rounded edge, facing +Z
    ///
    /// The coin's axis runs along Z so it shows its face to a camera looking
    /// down -Z and spins about Y.
    pub fn coin(radius: f32, thickness: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let half = thickness * 0.5;
        let mut mesh = Mesh::default();

        // Side: a front/back vertex pair per segment
        for i in 0..segments {
            let angle = i as f32 / segments as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            let normal = Vec3::new(cos, sin, 0.0);
            mesh.push_vertex(Vec3::new(cos * radius, sin * radius, half), normal);
            mesh.push_vertex(Vec3::new(cos * radius, sin * radius, -half), normal);
        }
        for i in 0..segments {
            let next = (i + 1) % segments;
            let (front, back) = (i * 2, i * 2 + 1);
            let (next_front, next_back) = (next * 2, next * 2 + 1);
            mesh.indices
                .extend_from_slice(&[back, next_back, next_front, back, next_front, front]);
        }

        mesh.push_cap(radius, half, segments, Vec3::Z);
        mesh.push_cap(radius, -half, segments, Vec3::NEG_Z);
        mesh
    }

    /// A rectangle in the XY plane centred on the origin, facing +Z
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let mut mesh = Mesh::default();
        for (x, y) in [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)] {
            mesh.push_vertex(Vec3::new(x, y, 0.0), Vec3::Z);
        }
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
        mesh
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        (self.positions.len() - 1) as u32
    }

    fn push_cap(&mut self, radius: f32, z: f32, segments: u32, normal: Vec3) {
        let center = self.push_vertex(Vec3::new(0.0, 0.0, z), normal);
        let first = center + 1;
        for i in 0..segments {
            let angle = i as f32 / segments as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            self.push_vertex(Vec3::new(cos * radius, sin * radius, z), normal);
        }
        for i in 0..segments {
            let a = first + i;
            let b = first + (i + 1) % segments;
            // Counter-clockwise seen from the side the normal points to
            if normal.z >= 0.0 {
                self.indices.extend_from_slice(&[center, a, b]);
            } else {
                self.indices.extend_from_slice(&[center, b, a]);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Radius of the smallest origin-centred sphere containing every vertex
    pub fn bounding_radius(&self) -> f32 {
        self.positions
            .iter()
            .map(|p| p.length())
            .fold(0.0, f32::max)
    }

    /// Iterate over triangles in mesh space
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }

    /// Interleaved `[position(3), normal(3)]` vertex data
    pub fn vertex_data(&self) -> Vec<f32> {
        self.positions
            .iter()
            .zip(&self.normals)
            .flat_map(|(p, n)| [p.x, p.y, p.z, n.x, n.y, n.z])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_geometry() {
        let coin = Mesh::coin(0.5, 0.1, 16);
        // 32 side vertices plus a centre and 16 ring vertices per cap
        assert_eq!(coin.positions.len(), 32 + 17 * 2);
        assert_eq!(coin.triangle_count(), 32 + 16 * 2);
        assert_eq!(coin.positions.len(), coin.normals.len());
        assert!(coin.indices.iter().all(|&i| (i as usize) < coin.positions.len()));

        let expected = (0.5f32 * 0.5 + 0.05 * 0.05).sqrt();
        assert!((coin.bounding_radius() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_quad() {
        let quad = Mesh::quad(2.0, 1.0);
        assert_eq!(quad.triangle_count(), 2);
        assert_eq!(quad.triangles().count(), 2);
        assert_eq!(quad.vertex_data().len(), 4 * 6);
        assert!(!quad.is_empty());
    }

    #[test]
    fn test_minimum_segments() {
        let coin = Mesh::coin(1.0, 0.1, 1);
        assert_eq!(coin.triangle_count(), 6 + 3 * 2);
    }
}
