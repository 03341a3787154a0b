//! Geometry encoders.
//!
//! Every encoder appends whole triangles to a vertex stream (`[x, y, z,
//! packed]` as `i32`) and optionally a UV stream (`[texture + 1, u, v, 0]` as
//! `f32`, zeros for untextured faces) and returns the number of vertices
//! written. A face that cannot form a triangle writes nothing and
//! contributes 0.
//!
//! `pad_uv` forces a UV entry for every vertex so both streams stay aligned.
//! Without it, UVs are written only for textured geometry.

use crate::buffer::BufferWriter;
use crate::model::{Face, Model, TileFace, TileModel, TilePaint, FLAT_SHADED, HIDDEN_FACE, HIDDEN_TILE_COLOR};
use crate::perspective::{rotate_y, LOCAL_TILE_SIZE};

const NO_TEXTURE_UV: [f32; 4] = [0.0; 4];

#[inline]
fn pack(alpha_priority: i32, color: i32) -> i32 {
    alpha_priority | (color & 0xffff)
}

#[inline]
fn textured_uv(texture: u16, [u, v]: [f32; 2]) -> [f32; 4] {
    [texture as f32 + 1.0, u, v, 0.0]
}

/// Indices are in range and name three distinct vertices.
fn usable_triangle(indices: [u32; 3], vertex_count: usize) -> bool {
    let [a, b, c] = indices;
    let in_range = indices.iter().all(|&i| (i as usize) < vertex_count);
    in_range && a != b && b != c && a != c
}

// ── tile paint ────────────────────────────────────────────────────────────

/// Encodes a ground quad as two triangles. Hidden paints write nothing.
pub fn encode_tile_paint(
    paint: &TilePaint,
    offset: [i32; 3],
    vertices: &mut BufferWriter<i32>,
    uvs: &mut BufferWriter<f32>,
    pad_uv: bool,
) -> usize {
    if paint.is_hidden() {
        return 0;
    }

    let s = LOCAL_TILE_SIZE;
    let [ox, oy, oz] = offset;
    let [h_sw, h_se, h_ne, h_nw] = paint.heights;
    let [c_sw, c_se, c_ne, c_nw] = paint.colors;

    let sw = ([ox, oy + h_sw, oz], c_sw, [0.0, 0.0]);
    let se = ([ox + s, oy + h_se, oz], c_se, [1.0, 0.0]);
    let ne = ([ox + s, oy + h_ne, oz + s], c_ne, [1.0, 1.0]);
    let nw = ([ox, oy + h_nw, oz + s], c_nw, [0.0, 1.0]);

    vertices.ensure_capacity(6 * 4);
    for ([x, y, z], color, _) in [ne, nw, se, sw, se, nw] {
        vertices.put_slice(&[x, y, z, pack(0, color)]);
    }

    if pad_uv || paint.texture.is_some() {
        uvs.ensure_capacity(6 * 4);
        for (_, _, uv) in [ne, nw, se, sw, se, nw] {
            match paint.texture {
                Some(t) => uvs.put_slice(&textured_uv(t, uv)),
                None => uvs.put_slice(&NO_TEXTURE_UV),
            }
        }
    }

    6
}

// ── tile model ────────────────────────────────────────────────────────────

fn encode_tile_face(
    model: &TileModel,
    face: &TileFace,
    offset: [i32; 3],
    vertices: &mut BufferWriter<i32>,
    uvs: &mut BufferWriter<f32>,
    write_uv: bool,
) -> usize {
    if face.colors[0] == HIDDEN_TILE_COLOR || !usable_triangle(face.indices, model.vertices.len()) {
        return 0;
    }

    let [ox, oy, oz] = offset;
    for (k, &index) in face.indices.iter().enumerate() {
        let [x, y, z] = model.vertices[index as usize];
        vertices.put_slice(&[x + ox, y + oy, z + oz, pack(0, face.colors[k])]);
    }
    if write_uv {
        for uv in face.uvs {
            match face.texture {
                Some(t) => uvs.put_slice(&textured_uv(t, uv)),
                None => uvs.put_slice(&NO_TEXTURE_UV),
            }
        }
    }
    3
}

/// Encodes every drawable face of a tile mesh.
pub fn encode_tile_model(
    model: &TileModel,
    offset: [i32; 3],
    vertices: &mut BufferWriter<i32>,
    uvs: &mut BufferWriter<f32>,
    pad_uv: bool,
) -> usize {
    let write_uv = pad_uv || model.faces.iter().any(|f| f.texture.is_some());
    vertices.ensure_capacity(model.faces.len() * 12);
    if write_uv {
        uvs.ensure_capacity(model.faces.len() * 12);
    }

    model
        .faces
        .iter()
        .map(|face| encode_tile_face(model, face, offset, vertices, uvs, write_uv))
        .sum()
}

// ── model faces ───────────────────────────────────────────────────────────

/// Encodes one model face, rotated by `orientation` and then translated by
/// `offset`.
///
/// Hidden faces, faces with out-of-range or repeated indices, and face
/// indices past the end of the model write nothing.
pub fn encode_face(
    model: &Model,
    face_index: usize,
    offset: [i32; 3],
    orientation: i32,
    vertices: &mut BufferWriter<i32>,
    uvs: &mut BufferWriter<f32>,
    pad_uv: bool,
) -> usize {
    let Some(face) = model.faces.get(face_index) else {
        return 0;
    };
    if face.colors[2] == HIDDEN_FACE || !usable_triangle(face.indices, model.vertices.len()) {
        return 0;
    }

    let colors = face_colors(face);
    let alpha = match face.texture {
        None => (face.transparency as i32) << 24,
        Some(_) => 0,
    };
    let alpha_priority = alpha | (face.priority as i32) << 16;

    let [ox, oy, oz] = offset;
    vertices.ensure_capacity(12);
    for (k, &index) in face.indices.iter().enumerate() {
        let [x, y, z] = model.vertices[index as usize];
        let (rx, rz) = rotate_y(x, z, orientation);
        vertices.put_slice(&[rx + ox, y + oy, rz + oz, pack(alpha_priority, colors[k])]);
    }

    if pad_uv || model.is_textured() {
        uvs.ensure_capacity(12);
        for uv in face.uvs {
            match face.texture {
                Some(t) => uvs.put_slice(&textured_uv(t, uv)),
                None => uvs.put_slice(&NO_TEXTURE_UV),
            }
        }
    }

    3
}

fn face_colors(face: &Face) -> [i32; 3] {
    if face.colors[2] == FLAT_SHADED {
        [face.colors[0]; 3]
    } else {
        face.colors
    }
}

/// Encodes the first `max_faces` faces of a model untransformed.
pub fn encode_model(
    model: &Model,
    max_faces: usize,
    vertices: &mut BufferWriter<i32>,
    uvs: &mut BufferWriter<f32>,
    pad_uv: bool,
) -> usize {
    let faces = model.triangle_count().min(max_faces);
    vertices.ensure_capacity(faces * 12);
    if pad_uv || model.is_textured() {
        uvs.ensure_capacity(faces * 12);
    }
    (0..faces)
        .map(|i| encode_face(model, i, [0, 0, 0], 0, vertices, uvs, pad_uv))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writers() -> (BufferWriter<i32>, BufferWriter<f32>) {
        (BufferWriter::with_capacity(64), BufferWriter::with_capacity(64))
    }

    fn face(indices: [u32; 3], color: i32) -> Face {
        Face {
            indices,
            colors: [color, color, color],
            ..Default::default()
        }
    }

    fn triangle_model(faces: Vec<Face>) -> Model {
        Model {
            vertices: vec![[0, 0, 0], [100, 0, 0], [0, 0, 100], [100, -50, 100]],
            faces,
            ..Default::default()
        }
    }

    #[test]
    fn tile_paint_emits_two_triangles() {
        let (mut v, mut uv) = writers();
        let paint = TilePaint::flat(-10, 0x1234);
        assert_eq!(encode_tile_paint(&paint, [256, 0, 128], &mut v, &mut uv, true), 6);
        assert_eq!(v.len(), 24);
        assert_eq!(uv.len(), 24);
        // first vertex is the north-east corner
        assert_eq!(&v.written()[..4], &[384, -10, 256, 0x1234]);
    }

    #[test]
    fn hidden_tile_paint_writes_nothing() {
        let (mut v, mut uv) = writers();
        let mut paint = TilePaint::flat(0, 7);
        paint.colors[3] = HIDDEN_TILE_COLOR;
        assert_eq!(encode_tile_paint(&paint, [0, 0, 0], &mut v, &mut uv, true), 0);
        assert!(v.is_empty());
        assert!(uv.is_empty());
    }

    #[test]
    fn untextured_paint_without_padding_skips_uvs() {
        let (mut v, mut uv) = writers();
        encode_tile_paint(&TilePaint::flat(0, 7), [0, 0, 0], &mut v, &mut uv, false);
        assert_eq!(v.len(), 24);
        assert!(uv.is_empty());
    }

    #[test]
    fn textured_paint_uses_one_based_layer() {
        let (mut v, mut uv) = writers();
        let mut paint = TilePaint::flat(0, 7);
        paint.texture = Some(4);
        encode_tile_paint(&paint, [0, 0, 0], &mut v, &mut uv, false);
        assert_eq!(&uv.written()[..4], &[5.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn degenerate_faces_leave_cursors_unchanged() {
        let model = triangle_model(vec![
            face([0, 0, 1], 5),
            face([0, 1, 9], 5),
            Face {
                colors: [5, 5, HIDDEN_FACE],
                ..face([0, 1, 2], 5)
            },
        ]);
        let (mut v, mut uv) = writers();
        for i in 0..4 {
            assert_eq!(encode_face(&model, i, [0, 0, 0], 0, &mut v, &mut uv, true), 0);
        }
        assert!(v.is_empty());
        assert!(uv.is_empty());
    }

    #[test]
    fn face_packs_alpha_priority_and_color() {
        let model = triangle_model(vec![Face {
            transparency: 0x80,
            priority: 3,
            ..face([0, 1, 2], 0x2abc)
        }]);
        let (mut v, mut uv) = writers();
        assert_eq!(encode_face(&model, 0, [10, 20, 30], 0, &mut v, &mut uv, true), 3);
        let expected = (0x80 << 24) | (3 << 16) | 0x2abc;
        assert_eq!(&v.written()[..4], &[10, 20, 30, expected]);
        assert_eq!(&v.written()[4..8], &[110, 20, 30, expected]);
        assert_eq!(uv.written(), &[0.0; 12]);
    }

    #[test]
    fn textured_face_drops_transparency() {
        let model = triangle_model(vec![Face {
            transparency: 0x80,
            texture: Some(0),
            uvs: [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            ..face([0, 1, 2], 0x7f)
        }]);
        let (mut v, mut uv) = writers();
        encode_face(&model, 0, [0, 0, 0], 0, &mut v, &mut uv, false);
        assert_eq!(v.written()[3], 0x7f);
        assert_eq!(&uv.written()[4..8], &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn flat_shading_repeats_first_color() {
        let model = triangle_model(vec![Face {
            colors: [11, 22, FLAT_SHADED],
            ..face([0, 1, 2], 0)
        }]);
        let (mut v, mut uv) = writers();
        encode_face(&model, 0, [0, 0, 0], 0, &mut v, &mut uv, true);
        let colors: Vec<i32> = v.written().chunks(4).map(|c| c[3]).collect();
        assert_eq!(colors, vec![11, 11, 11]);
    }

    #[test]
    fn orientation_rotates_before_translating() {
        let model = triangle_model(vec![face([1, 2, 0], 1)]);
        let (mut v, mut uv) = writers();
        encode_face(&model, 0, [1000, 0, 0], 512, &mut v, &mut uv, true);
        // (100, 0, 0) rotated a quarter turn is (0, 0, -100)
        assert_eq!(&v.written()[..3], &[1000, 0, -100]);
    }

    #[test]
    fn model_with_invalid_faces_encodes_valid_triangles_only() {
        let mut faces: Vec<Face> = (0..6).map(|_| face([0, 1, 2], 9)).collect();
        faces.push(face([0, 0, 2], 9));
        faces.push(face([0, 1, 77], 9));
        faces.push(Face {
            colors: [9, 9, HIDDEN_FACE],
            ..face([1, 2, 3], 9)
        });
        faces.push(face([3, 3, 3], 9));
        let model = triangle_model(faces);

        let (mut v, mut uv) = writers();
        let len = encode_model(&model, 4096, &mut v, &mut uv, false);
        assert_eq!(len, 18);
        assert_eq!(v.len(), 18 * 4);
        assert!(uv.is_empty());
    }

    #[test]
    fn tile_model_skips_hidden_faces() {
        let model = TileModel {
            vertices: vec![[0, 0, 0], [128, 0, 0], [0, 0, 128]],
            faces: vec![
                TileFace {
                    indices: [0, 1, 2],
                    colors: [1, 2, 3],
                    ..Default::default()
                },
                TileFace {
                    indices: [0, 1, 2],
                    colors: [HIDDEN_TILE_COLOR, 0, 0],
                    ..Default::default()
                },
            ],
            slot: None,
        };
        let (mut v, mut uv) = writers();
        assert_eq!(encode_tile_model(&model, [128, 0, 0], &mut v, &mut uv, true), 3);
        assert_eq!(&v.written()[4..8], &[256, 0, 0, 2]);
        assert_eq!(uv.len(), 12);
    }
}
