//! Deduplicated material palette.
//!
//! Every distinct color in a model gets one entry, in first-occurrence order.
//! Voxels and octree leaves reference entries by index, and the renderer
//! indexes the uploaded buffer the same way, so order must never change.
//!
//! Lookup is a linear scan with exact float equality. Colors always come from
//! 0-255 channels divided by a fixed 255.0, so equal inputs give bit-equal
//! floats and no tolerance is needed. Palettes are expected to hold tens to
//! low hundreds of colors.

use bytemuck::{Pod, Zeroable};

/// A normalized RGB color, each channel in `[0, 1]`.
///
/// GPU layout: three consecutive `f32`, 12 bytes, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable, PartialEq)]
pub struct Material {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

const _: () = assert!(std::mem::size_of::<Material>() == 12);

impl Material {
    /// Size in bytes of one palette entry.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a material from normalized channels.
    #[inline]
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Creates a material from 0-255 channels.
    #[inline]
    #[must_use]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
        }
    }

    /// Returns the channels as an array.
    #[inline]
    #[must_use]
    pub const fn as_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Ordered table of unique materials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialPalette {
    materials: Vec<Material>,
}

impl MaterialPalette {
    /// Creates an empty palette.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `material`, appending it if it is new.
    pub fn resolve(&mut self, material: Material) -> u32 {
        if let Some(index) = self.find(material) {
            return index;
        }

        let index = self.materials.len() as u32;
        self.materials.push(material);
        index
    }

    /// Returns the index of `material` without inserting it.
    #[must_use]
    pub fn find(&self, material: Material) -> Option<u32> {
        self.materials
            .iter()
            .position(|m| *m == material)
            .map(|i| i as u32)
    }

    /// Gets a material by index.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    /// Number of materials.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns true if no material has been added.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// All materials, in palette order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Material] {
        &self.materials
    }

    /// Returns the palette as bytes for GPU upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_size() {
        assert_eq!(Material::SIZE, 12);
    }

    #[test]
    fn test_from_rgb8_normalizes() {
        let m = Material::from_rgb8(255, 0, 51);
        assert_eq!(m.as_array(), [1.0, 0.0, 0.2]);
    }

    #[test]
    fn test_resolve_dedups_in_first_occurrence_order() {
        let mut palette = MaterialPalette::new();
        let red = Material::from_rgb8(255, 0, 0);
        let green = Material::from_rgb8(0, 255, 0);

        assert_eq!(palette.resolve(red), 0);
        assert_eq!(palette.resolve(green), 1);
        assert_eq!(palette.resolve(red), 0);
        assert_eq!(palette.resolve(Material::from_rgb8(255, 0, 0)), 0);

        assert_eq!(palette.len(), 2);
        assert_eq!(palette.as_slice(), &[red, green]);
    }

    #[test]
    fn test_find_does_not_insert() {
        let palette = MaterialPalette::new();
        assert_eq!(palette.find(Material::new(0.5, 0.5, 0.5)), None);
        assert!(palette.is_empty());
    }

    #[test]
    fn test_as_bytes_layout() {
        let mut palette = MaterialPalette::new();
        palette.resolve(Material::new(1.0, 0.0, 0.0));
        palette.resolve(Material::new(0.0, 1.0, 0.0));

        let bytes = palette.as_bytes();
        assert_eq!(bytes.len(), 2 * Material::SIZE);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[16..20], &1.0f32.to_ne_bytes());
    }
}
