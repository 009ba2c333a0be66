//! Procedural mesh geometry.
//!
//! Builders here are pure: they produce vertex and index vectors
//! without touching the GPU, so they can be shared across meshes and
//! unit tested directly.

use glam::Vec3;
use glimmer_rhi::vertex::Vertex;

/// Unit cube centered at the origin, one color per face.
pub fn cube() -> (Vec<Vertex>, Vec<u32>) {
    struct Face {
        normal: Vec3,
        color: [f32; 3],
        // Corners in counter-clockwise order seen from outside.
        corners: [Vec3; 4],
    }

    let h = 0.5;
    let faces = [
        Face {
            normal: Vec3::X,
            color: [0.9, 0.2, 0.2],
            corners: [
                Vec3::new(h, -h, -h),
                Vec3::new(h, h, -h),
                Vec3::new(h, h, h),
                Vec3::new(h, -h, h),
            ],
        },
        Face {
            normal: Vec3::NEG_X,
            color: [0.2, 0.9, 0.2],
            corners: [
                Vec3::new(-h, -h, h),
                Vec3::new(-h, h, h),
                Vec3::new(-h, h, -h),
                Vec3::new(-h, -h, -h),
            ],
        },
        Face {
            normal: Vec3::Y,
            color: [0.2, 0.2, 0.9],
            corners: [
                Vec3::new(-h, h, -h),
                Vec3::new(-h, h, h),
                Vec3::new(h, h, h),
                Vec3::new(h, h, -h),
            ],
        },
        Face {
            normal: Vec3::NEG_Y,
            color: [0.9, 0.9, 0.2],
            corners: [
                Vec3::new(-h, -h, h),
                Vec3::new(-h, -h, -h),
                Vec3::new(h, -h, -h),
                Vec3::new(h, -h, h),
            ],
        },
        Face {
            normal: Vec3::Z,
            color: [0.9, 0.2, 0.9],
            corners: [
                Vec3::new(h, -h, h),
                Vec3::new(h, h, h),
                Vec3::new(-h, h, h),
                Vec3::new(-h, -h, h),
            ],
        },
        Face {
            normal: Vec3::NEG_Z,
            color: [0.2, 0.9, 0.9],
            corners: [
                Vec3::new(-h, -h, -h),
                Vec3::new(-h, h, -h),
                Vec3::new(h, h, -h),
                Vec3::new(h, -h, -h),
            ],
        },
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for face in &faces {
        let base = vertices.len() as u32;
        for corner in &face.corners {
            vertices.push(Vertex {
                position: corner.to_array(),
                color: face.color,
                normal: face.normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// Flat plane in the XZ plane, `size` units on a side, facing +Y.
pub fn plane(size: f32, color: [f32; 3]) -> (Vec<Vertex>, Vec<u32>) {
    let h = size * 0.5;
    let normal = Vec3::Y.to_array();
    let vertices = vec![
        Vertex {
            position: [-h, 0.0, -h],
            color,
            normal,
        },
        Vertex {
            position: [-h, 0.0, h],
            color,
            normal,
        },
        Vertex {
            position: [h, 0.0, h],
            color,
            normal,
        },
        Vertex {
            position: [h, 0.0, -h],
            color,
            normal,
        },
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_and_36_indices() {
        let (vertices, indices) = cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn cube_vertices_sit_on_the_unit_cube() {
        let (vertices, _) = cube();
        for v in &vertices {
            for c in v.position {
                assert_eq!(c.abs(), 0.5);
            }
        }
    }

    #[test]
    fn cube_normals_point_away_from_center() {
        let (vertices, _) = cube();
        for v in &vertices {
            let pos = Vec3::from_array(v.position);
            let normal = Vec3::from_array(v.normal);
            assert!(pos.dot(normal) > 0.0);
        }
    }

    #[test]
    fn plane_spans_requested_size() {
        let (vertices, indices) = plane(10.0, [0.5, 0.5, 0.5]);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
        for v in &vertices {
            assert_eq!(v.position[0].abs(), 5.0);
            assert_eq!(v.position[1], 0.0);
            assert_eq!(v.position[2].abs(), 5.0);
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise_seen_from_outside() {
        let (vertices, indices) = cube();
        for tri in indices.chunks_exact(3) {
            let a = Vec3::from_array(vertices[tri[0] as usize].position);
            let b = Vec3::from_array(vertices[tri[1] as usize].position);
            let c = Vec3::from_array(vertices[tri[2] as usize].position);
            let face_normal = (b - a).cross(c - a);
            let expected = Vec3::from_array(vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(expected) > 0.0);
        }
    }
}
