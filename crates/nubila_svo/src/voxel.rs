//! Voxel records and model bounds.

/// A single voxel in model-local space.
///
/// Immutable once created. After insertion into the octree only the
/// position and material are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Voxel {
    /// Position (x, y, z), engine axis order.
    pub position: [i32; 3],
    /// Index into the model's material palette.
    pub material_id: u32,
}

impl Voxel {
    /// Creates a new voxel.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32, material_id: u32) -> Self {
        Self {
            position: [x, y, z],
            material_id,
        }
    }

    /// X coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.position[0]
    }

    /// Y coordinate.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.position[1]
    }

    /// Z coordinate.
    #[inline]
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.position[2]
    }
}

/// Per-axis integer bounding box of a voxel set (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelBounds {
    /// Smallest coordinate on each axis.
    pub min: [i32; 3],
    /// Largest coordinate on each axis.
    pub max: [i32; 3],
}

impl ModelBounds {
    /// Computes the bounds of a voxel set, or `None` if it is empty.
    #[must_use]
    pub fn from_voxels(voxels: &[Voxel]) -> Option<Self> {
        let first = voxels.first()?;
        let mut bounds = Self {
            min: first.position,
            max: first.position,
        };

        for voxel in &voxels[1..] {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(voxel.position[axis]);
                bounds.max[axis] = bounds.max[axis].max(voxel.position[axis]);
            }
        }

        Some(bounds)
    }

    /// Extent along one axis: `max - min + 1`.
    ///
    /// Computed in 64 bits since the span of two `i32` can exceed `u32`.
    #[inline]
    #[must_use]
    pub fn extent(&self, axis: usize) -> u64 {
        (i64::from(self.max[axis]) - i64::from(self.min[axis]) + 1) as u64
    }

    /// Width (X extent).
    #[inline]
    #[must_use]
    pub fn width(&self) -> u64 {
        self.extent(0)
    }

    /// Height (Y extent).
    #[inline]
    #[must_use]
    pub fn height(&self) -> u64 {
        self.extent(1)
    }

    /// Depth (Z extent).
    #[inline]
    #[must_use]
    pub fn depth(&self) -> u64 {
        self.extent(2)
    }

    /// Largest of the three extents.
    #[must_use]
    pub fn max_extent(&self) -> u64 {
        self.width().max(self.height()).max(self.depth())
    }

    /// Translates a position so that `min` maps to the origin.
    ///
    /// Callers only pass positions inside the bounds, so the result fits.
    #[inline]
    #[must_use]
    pub fn normalize(&self, position: [i32; 3]) -> [i32; 3] {
        [
            position[0].wrapping_sub(self.min[0]),
            position[1].wrapping_sub(self.min[1]),
            position[2].wrapping_sub(self.min[2]),
        ]
    }
}
