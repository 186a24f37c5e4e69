use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use ndarray::Array4;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub filter: FilterType,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            height: 128,
            width: 128,
            channels: 3,
            filter: FilterType::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    /// Create a new instance of the Processor struct
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Decodes an uploaded file and preprocesses it.
    pub fn decode(&self, bytes: &[u8]) -> Result<Array4<f32>> {
        let image = image::load_from_memory(bytes)?;
        self.preprocess(&image)
    }

    /// Forces RGB, resizes to the configured size (aspect ratio is not
    /// kept) and scales pixels to `[0, 1]`.
    ///
    /// Returns a single-image NHWC batch of shape `[1, height, width, 3]`.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut resized = Image::new(
            self.config.width as u32,
            self.config.height as u32,
            PixelType::U8x3,
        );

        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(self.config.filter));
        Resizer::new().resize(&rgb, &mut resized, &options)?;

        let pixels = resized
            .buffer()
            .iter()
            .map(|&p| p as f32 / 255.0)
            .collect::<Vec<f32>>();
        let batch = Array4::from_shape_vec(
            (1, self.config.height, self.config.width, self.config.channels),
            pixels,
        )?;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn any_size_becomes_one_by_128() {
        let processor = Processor::default();
        for (w, h) in [(1, 1), (37, 512), (640, 480), (128, 128)] {
            let image = DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, 255])
            }));
            let batch = processor.preprocess(&image).unwrap();
            assert_eq!(batch.shape(), &[1, 128, 128, 3]);
            assert!(batch.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn drops_alpha_and_scales() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 10, Rgba([255, 0, 51, 0])));
        let batch = Processor::default().preprocess(&image).unwrap();
        assert_eq!(batch.shape(), &[1, 128, 128, 3]);
        assert!((batch[[0, 64, 64, 0]] - 1.0).abs() < 1e-6);
        assert!(batch[[0, 64, 64, 1]].abs() < 1e-6);
        assert!((batch[[0, 64, 64, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn grayscale_is_expanded() {
        let image = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(64, 64, image::Luma([255])));
        let batch = Processor::default().preprocess(&image).unwrap();
        assert!(batch.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn decodes_png_bytes() {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([0, 0, 0])))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let batch = Processor::default().decode(&png).unwrap();
        assert_eq!(batch.shape(), &[1, 128, 128, 3]);
        assert!(batch.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Processor::default().decode(b"not an image"),
            Err(crate::error::Error::Image(_))
        ));
    }
}
