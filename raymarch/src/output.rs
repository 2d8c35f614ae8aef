use std::path::Path;

use anyhow::{Context, Result};
use compute::Texture2d;
use image::RgbaImage;

/// Writes `frame` as an 8-bit PNG.
pub fn save_png(frame: &Texture2d, path: &Path) -> Result<()> {
    let image = RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba8())
        .context("frame size does not match its texel data")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_readable_png() {
        let path = std::env::temp_dir().join(format!("raymarch-output-{}.png", std::process::id()));
        let frame = Texture2d::filled(3, 2, [1.0, 0.0, 0.0, 1.0]);
        save_png(&frame, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [255, 0, 0, 255]);
        std::fs::remove_file(path).unwrap();
    }
}
