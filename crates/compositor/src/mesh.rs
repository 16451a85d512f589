use bytemuck::{Pod, Zeroable};

use crate::types::PassKind;

/// Vertex of the unit plane: position in `[-0.5, 0.5]` and texture coordinates
/// with `v = 0` at the top edge.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// A 1x1 plane centred on the origin, subdivided into a grid of quads.
///
/// The mesh is identified by its subdivision, so backends can share buffers
/// between every pass that uses the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneMesh {
    pub columns: u32,
    pub rows: u32,
}

impl PlaneMesh {
    /// Single quad used by every headless pass.
    pub const QUAD: PlaneMesh = PlaneMesh {
        columns: 1,
        rows: 1,
    };
    /// Subdivision of the warp plane; fine enough that corner pinning does not facet.
    pub const WARP_GRID: PlaneMesh = PlaneMesh {
        columns: 10,
        rows: 10,
    };

    pub fn for_pass(kind: PassKind) -> Self {
        match kind {
            PassKind::Warp => Self::WARP_GRID,
            _ => Self::QUAD,
        }
    }

    pub fn vertex_count(&self) -> usize {
        ((self.columns + 1) * (self.rows + 1)) as usize
    }

    pub fn index_count(&self) -> usize {
        (self.columns * self.rows * 6) as usize
    }

    pub fn vertices(&self) -> Vec<PlaneVertex> {
        let columns = self.columns.max(1);
        let rows = self.rows.max(1);
        let mut vertices = Vec::with_capacity(self.vertex_count());
        for row in 0..=rows {
            let v = row as f32 / rows as f32;
            for column in 0..=columns {
                let u = column as f32 / columns as f32;
                vertices.push(PlaneVertex {
                    position: [u - 0.5, 0.5 - v, 0.0],
                    uv: [u, v],
                });
            }
        }
        vertices
    }

    pub fn indices(&self) -> Vec<u32> {
        let columns = self.columns.max(1);
        let rows = self.rows.max(1);
        let stride = columns + 1;
        let mut indices = Vec::with_capacity(self.index_count());
        for row in 0..rows {
            for column in 0..columns {
                let top_left = row * stride + column;
                let top_right = top_left + 1;
                let bottom_left = top_left + stride;
                let bottom_right = bottom_left + 1;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warp_uses_finer_grid() {
        assert_eq!(PlaneMesh::for_pass(PassKind::Warp), PlaneMesh::WARP_GRID);
        for kind in [PassKind::Video, PassKind::Mask, PassKind::CustomPost, PassKind::Interface] {
            assert_eq!(PlaneMesh::for_pass(kind), PlaneMesh::QUAD);
        }
    }

    #[test]
    fn grid_has_expected_counts() {
        let mesh = PlaneMesh::WARP_GRID;
        assert_eq!(mesh.vertices().len(), 121);
        assert_eq!(mesh.indices().len(), 600);
        let max_index = mesh.indices().into_iter().max().unwrap();
        assert_eq!(max_index as usize, mesh.vertex_count() - 1);
    }

    #[test]
    fn quad_corners_span_unit_plane() {
        let vertices = PlaneMesh::QUAD.vertices();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0].position, [-0.5, 0.5, 0.0]);
        assert_eq!(vertices[0].uv, [0.0, 0.0]);
        assert_eq!(vertices[3].position, [0.5, -0.5, 0.0]);
        assert_eq!(vertices[3].uv, [1.0, 1.0]);
    }
}
