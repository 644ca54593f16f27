use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x2 },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Single point of the starfield.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointVertex {
    pub pos: [f32; 3],
}

impl PointVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 1] = [
        wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

pub struct PointBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {

        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Upload star positions as a point list.
pub fn upload_points(device: &wgpu::Device, positions: &[[f32; 3]]) -> PointBuffer {
    let points: Vec<PointVertex> = positions.iter().map(|&pos| PointVertex { pos }).collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Star Vertex Buffer"),
        contents: bytemuck::cast_slice(&points),
        usage: wgpu::BufferUsages::VERTEX,
    });
    PointBuffer { vertex_buffer, count: points.len() as u32 }
}

/// UV sphere centered on the origin, counter-clockwise when seen from outside.
///
/// Row 0 is the north pole and `v` grows southward, so an equirectangular map
/// lands right side up. Pole rows emit a single triangle per quad.
pub fn create_sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    let mut indices = Vec::new();

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * TAU;
            let normal = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(Vertex {
                pos: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                uv: [u, v],
            });
        }
    }

    let row = width_segments + 1;
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;

            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn sphere_counts() {
        let mesh = create_sphere_mesh(5.0, 50, 50);
        assert_eq!(mesh.vertices.len(), 51 * 51);
        assert_eq!(mesh.indices.len(), 6 * 50 * 50 - 6 * 50);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn sphere_vertices_on_radius_with_unit_normals() {
        let mesh = create_sphere_mesh(5.0, 16, 12);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.pos);
            let n = Vec3::from_array(v.normal);
            assert!((p.length() - 5.0).abs() < 1e-4);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(v.uv[0] >= 0.0 && v.uv[0] <= 1.0 && v.uv[1] >= 0.0 && v.uv[1] <= 1.0);
        }
    }

    #[test]
    fn triangles_face_outward() {
        let mesh = create_sphere_mesh(1.0, 24, 16);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(mesh.vertices[i as usize].pos));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0, "triangle {:?} winds inward", tri);
        }
    }

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(Vertex::layout().array_stride, 32);
        assert_eq!(PointVertex::layout().array_stride, 12);
    }
}
