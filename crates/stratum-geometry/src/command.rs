//! Draw command records routed to the compute passes.

use bytemuck::{Pod, Zeroable};

/// Hard cap on triangles per command. The sort pass keeps one depth slot per
/// face in workgroup memory, sized for this many faces.
pub const MAX_TRIANGLES: i32 = 4096;

/// Commands with at most this many triangles go to the small bucket.
pub const SMALL_TRIANGLE_COUNT: i32 = 512;

/// Marks a command whose geometry lives in the static scene cache.
pub const FLAG_SCENE_BUFFER: i32 = i32::MIN;

/// `uv_offset` value for geometry without texture coordinates.
pub const NO_UV: i32 = -1;

/// Size of one command record on the GPU.
pub const COMMAND_STRIDE: u64 = std::mem::size_of::<DrawCommand>() as u64;

/// One entity routed through a compute pass.
///
/// Offsets are in vertices (one vertex = four 32-bit components).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct DrawCommand {
    pub vertex_offset: i32,
    pub uv_offset: i32,
    pub triangle_count: i32,
    pub output_offset: i32,
    pub flags: i32,
    pub translate_x: i32,
    pub translate_y: i32,
    pub translate_z: i32,
}

impl DrawCommand {
    #[inline]
    pub fn translate(&self) -> [i32; 3] {
        [self.translate_x, self.translate_y, self.translate_z]
    }

    #[inline]
    pub fn is_scene_resident(&self) -> bool {
        self.flags & FLAG_SCENE_BUFFER != 0
    }

    /// Orientation in engine angle units (`0..2048`).
    #[inline]
    pub fn orientation(&self) -> i32 {
        self.flags & 0x7ff
    }

    #[inline]
    pub fn radius(&self) -> i32 {
        (self.flags & !FLAG_SCENE_BUFFER) >> 12
    }
}

/// Packs bounding radius and orientation into the command flag word.
#[inline]
pub fn pack_flags(radius: i32, orientation: i32) -> i32 {
    (radius << 12) | (orientation & 0x7ff)
}

/// Which compute pass consumes a command.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Bucket {
    /// Static flat geometry; copied without sorting.
    Unordered,
    /// Up to [`SMALL_TRIANGLE_COUNT`] triangles.
    Small,
    /// Up to [`MAX_TRIANGLES`] triangles.
    Large,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Unordered, Bucket::Small, Bucket::Large];

    /// Sorted bucket for a triangle count. Counts above the cap are clamped
    /// first, so every count maps to a bucket.
    pub fn for_triangles(triangles: i32) -> Bucket {
        if clamp_triangles(triangles) <= SMALL_TRIANGLE_COUNT {
            Bucket::Small
        } else {
            Bucket::Large
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Unordered => "unordered",
            Bucket::Small => "small",
            Bucket::Large => "large",
        }
    }
}

#[inline]
pub fn clamp_triangles(triangles: i32) -> i32 {
    triangles.min(MAX_TRIANGLES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_eight_words() {
        assert_eq!(COMMAND_STRIDE, 32);
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(Bucket::for_triangles(0), Bucket::Small);
        assert_eq!(Bucket::for_triangles(1), Bucket::Small);
        assert_eq!(Bucket::for_triangles(512), Bucket::Small);
        assert_eq!(Bucket::for_triangles(513), Bucket::Large);
        assert_eq!(Bucket::for_triangles(4096), Bucket::Large);
    }

    #[test]
    fn oversized_counts_clamp_into_large() {
        assert_eq!(clamp_triangles(4097), 4096);
        assert_eq!(clamp_triangles(1_000_000), 4096);
        assert_eq!(Bucket::for_triangles(1_000_000), Bucket::Large);
    }

    #[test]
    fn flags_round_trip() {
        let cmd = DrawCommand {
            flags: FLAG_SCENE_BUFFER | pack_flags(300, 1536),
            ..Default::default()
        };
        assert!(cmd.is_scene_resident());
        assert_eq!(cmd.orientation(), 1536);
        assert_eq!(cmd.radius(), 300);

        let temp = DrawCommand {
            flags: pack_flags(42, 7),
            ..Default::default()
        };
        assert!(!temp.is_scene_resident());
        assert_eq!(temp.radius(), 42);
    }
}
