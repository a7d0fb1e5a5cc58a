//! Per-vertex colors and the GPU-facing vertex layout.
//!
//! - [`Color`]: 8-bit RGBA, packable into a single `u32`
//! - [`RenderVertex`]: position + color, laid out for direct buffer upload
//!
//! The mesh engine keeps positions in `f64`; a renderer usually wants `f32`.
//! [`RenderVertex`] does that narrowing once so the rendering side can hand
//! the slice straight to `bytemuck::cast_slice`.

use glam::DVec3;

/// An 8-bit-per-channel RGBA color.
///
/// # Example
///
/// ```
/// use meshpick::Color;
///
/// let red = Color::rgb(255, 0, 0);
/// assert_eq!(red.packed(), 0xFF0000FF);
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Fill value for channels a file leaves undeclared (mid-gray, opaque).
    pub const DEFAULT_CHANNEL: Color = Color::rgba(128, 128, 128, 255);

    /// Color given to every vertex when a file declares no color at all.
    pub const UNCOLORED: Color = Color::rgba(211, 211, 211, 255);

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Packs the channels as `0xRRGGBBAA`.
    pub const fn packed(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// Inverse of [`Color::packed`].
    pub const fn from_packed(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::UNCOLORED
    }
}

/// A vertex in the layout handed to the rendering backend.
///
/// Each vertex occupies 16 bytes:
/// - `position`: 12 bytes (3 × f32) at offset 0
/// - `color`: 4 bytes (RGBA u8) at offset 12
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

impl RenderVertex {
    pub fn new(position: DVec3, color: Color) -> Self {
        Self {
            position: position.as_vec3().to_array(),
            color: [color.r, color.g, color.b, color.a],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_round_trip() {
        let c = Color::rgba(1, 2, 3, 4);
        assert_eq!(c.packed(), 0x01020304);
        assert_eq!(Color::from_packed(c.packed()), c);
    }

    #[test]
    fn render_vertex_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<RenderVertex>(), 16);

        let vertices = [
            RenderVertex::new(DVec3::new(1.0, 2.0, 3.0), Color::WHITE),
            RenderVertex::new(DVec3::ZERO, Color::BLACK),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[12..16], &[255, 255, 255, 255]);
    }
}
