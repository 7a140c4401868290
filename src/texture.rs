//! Texture export: decode, flip to bottom-up row order, resize, save as TGA.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Edge length used when a texture entry doesn't give one.
pub const DEFAULT_SIZE: u32 = 512;

/// Decodes `bytes`, flips it vertically and resizes it to `size` × `size`.
pub fn convert(bytes: &[u8], size: u32) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes).context("Failed to decode texture")?;
    let image = image.flipv().resize_exact(size, size, FilterType::Lanczos3);
    // The TGA encoder only takes 8-bit channels.
    Ok(if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    })
}

pub fn write_tga(image: &DynamicImage, output: &Path) -> Result<()> {
    image
        .save_with_format(output, ImageFormat::Tga)
        .with_context(|| format!("Failed to write texture: {:?}", output))
}

/// Reads `input`, converts it and writes the result to `output`.
pub fn convert_file(input: &Path, output: &Path, size: u32) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read texture: {:?}", input))?;
    let image = convert(&bytes, size).with_context(|| format!("Converting {:?}", input))?;
    write_tga(&image, output)?;
    tracing::info!("Converted texture {:?} -> {:?} ({size}x{size})", input, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    /// Red top half, blue bottom half.
    fn split_png(size: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(size, size, |_, y| {
            if y < size / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        png.into_inner()
    }

    #[test]
    fn flips_vertically() {
        let image = convert(&split_png(8), 8).unwrap().to_rgb8();
        let top = image.get_pixel(0, 0);
        let bottom = image.get_pixel(0, 7);
        assert!(top[2] > top[0], "top row should now be blue: {top:?}");
        assert!(bottom[0] > bottom[2], "bottom row should now be red: {bottom:?}");
    }

    #[test]
    fn resizes_to_square() {
        let image = convert(&split_png(16), 4).unwrap();
        assert_eq!((image.width(), image.height()), (4, 4));
    }

    #[test]
    fn writes_tga() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.tga");
        std::fs::write(&input, split_png(8)).unwrap();

        convert_file(&input, &output, 2).unwrap();

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (2, 2));
    }

    #[test]
    fn rejects_garbage() {
        assert!(convert(b"not an image", 4).is_err());
    }
}
