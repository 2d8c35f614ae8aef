//! Host-side RGBA32F image used for the source surface and read-back output.

use crate::ComputeError;

#[derive(Clone, Debug, PartialEq)]
pub struct Texture2d {
    pub width: u32,
    pub height: u32,
    /// Row-major texels, row 0 at the top.
    pub texels: Vec<[f32; 4]>,
}

impl Texture2d {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 4])
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, colour: [f32; 4]) -> Self {
        Self {
            width,
            height,
            texels: vec![colour; width as usize * height as usize],
        }
    }

    /// Wraps raw texel data, checking it covers `width * height` texels.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] when the texel count is wrong.
    pub fn from_texels(width: u32, height: u32, texels: Vec<[f32; 4]>) -> Result<Self, ComputeError> {
        if texels.len() != width as usize * height as usize {
            return Err(ComputeError::ShapeMismatch("texel count does not match texture size"));
        }
        Ok(Self { width, height, texels })
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        (x < self.width && y < self.height)
            .then(|| self.texels[y as usize * self.width as usize + x as usize])
    }

    pub fn set(&mut self, x: u32, y: u32, texel: [f32; 4]) {
        if x < self.width && y < self.height {
            let index = y as usize * self.width as usize + x as usize;
            self.texels[index] = texel;
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Converts to 8-bit RGBA, clamping each channel to `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels
            .iter()
            .flat_map(|texel| texel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_access_is_ignored() {
        let mut texture = Texture2d::new(2, 2);
        texture.set(5, 0, [1.0; 4]);
        assert_eq!(texture.get(5, 0), None);
        assert!(texture.texels.iter().all(|t| *t == [0.0; 4]));
    }

    #[test]
    fn rows_are_stored_top_down() {
        let mut texture = Texture2d::new(3, 2);
        texture.set(1, 1, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(texture.texels[4], [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(texture.get(1, 1), Some([0.5, 0.25, 1.0, 1.0]));
    }

    #[test]
    fn rgba8_conversion_clamps() {
        let texture = Texture2d::filled(1, 1, [2.0, -1.0, 0.5, 1.0]);
        assert_eq!(texture.to_rgba8(), vec![255, 0, 128, 255]);
    }

    #[test]
    fn from_texels_checks_size() {
        assert!(Texture2d::from_texels(2, 2, vec![[0.0; 4]; 3]).is_err());
        assert!(Texture2d::from_texels(2, 2, vec![[0.0; 4]; 4]).is_ok());
    }
}
