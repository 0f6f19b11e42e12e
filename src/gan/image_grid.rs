//! Tile a batch of images into one PNG
//!
//! Values are min-max normalised over the whole batch, images are laid out
//! `nrow` per row with a zero border of `padding` pixels around every tile.

use std::path::Path;

use burn::tensor::{backend::Backend, Tensor};
use image::RgbImage;

use crate::utils::error::{LabError, Result};

pub const DEFAULT_NROW: usize = 8;
pub const DEFAULT_PADDING: usize = 2;

/// An RGB grid in CHW float layout, values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGrid {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

/// Scale `values` so the batch minimum maps to 0 and the maximum to 1
pub fn normalize_min_max(values: &mut [f32]) {
    let (low, high) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = (high - low).max(1e-5);
    for v in values.iter_mut() {
        *v = (*v - low) / range;
    }
}

/// Tile `n` CHW images of `channels x height x width` into a 3-channel grid
///
/// Single-channel images are repeated across RGB.
pub fn make_grid(
    values: &[f32],
    shape: [usize; 4],
    nrow: usize,
    padding: usize,
) -> Result<ImageGrid> {
    let [n, channels, height, width] = shape;
    if channels != 1 && channels != 3 {
        return Err(LabError::Image(
            "<grid>".into(),
            format!("expected 1 or 3 channels, got {}", channels),
        ));
    }
    let plane = height * width;
    if values.len() != n * channels * plane {
        return Err(LabError::ShapeMismatch {
            context: "image grid input".to_string(),
            expected: n * channels * plane,
            actual: values.len(),
        });
    }

    let cols = nrow.max(1).min(n.max(1));
    let rows = n.div_ceil(cols);
    let tile_h = height + padding;
    let tile_w = width + padding;
    let grid_h = rows * tile_h + padding;
    let grid_w = cols * tile_w + padding;
    let grid_plane = grid_h * grid_w;

    let mut pixels = vec![0.0f32; 3 * grid_plane];
    for index in 0..n {
        let top = (index / cols) * tile_h + padding;
        let left = (index % cols) * tile_w + padding;
        let image = &values[index * channels * plane..(index + 1) * channels * plane];

        for c in 0..3 {
            let source = if channels == 1 { 0 } else { c };
            for y in 0..height {
                let src = source * plane + y * width;
                let dst = c * grid_plane + (top + y) * grid_w + left;
                pixels[dst..dst + width].copy_from_slice(&image[src..src + width]);
            }
        }
    }

    Ok(ImageGrid {
        pixels,
        height: grid_h,
        width: grid_w,
    })
}

impl ImageGrid {
    pub fn to_rgb(&self) -> RgbImage {
        let plane = self.height * self.width;
        let to_u8 = |v: f32| (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let offset = y as usize * self.width + x as usize;
            image::Rgb([
                to_u8(self.pixels[offset]),
                to_u8(self.pixels[plane + offset]),
                to_u8(self.pixels[2 * plane + offset]),
            ])
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_rgb()
            .save(path)
            .map_err(|e| LabError::Image(path.to_path_buf(), e.to_string()))
    }
}

/// Normalise, tile and write a `[n, c, h, w]` batch as a PNG
pub fn save_image_grid<B: Backend>(images: Tensor<B, 4>, path: &Path, nrow: usize) -> Result<()> {
    let shape = images.dims();
    let mut values: Vec<f32> = images
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| LabError::Image(path.to_path_buf(), format!("{:?}", e)))?;
    normalize_min_max(&mut values);
    make_grid(&values, shape, nrow, DEFAULT_PADDING)?.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    #[test]
    fn test_grid_dimensions() {
        // 10 images of 4x4: 8 columns, 2 rows
        let values = vec![0.5f32; 10 * 3 * 16];
        let grid = make_grid(&values, [10, 3, 4, 4], 8, 2).unwrap();
        assert_eq!(grid.width, 8 * 6 + 2);
        assert_eq!(grid.height, 2 * 6 + 2);
    }

    #[test]
    fn test_fewer_images_than_nrow() {
        let values = vec![1.0f32; 3 * 3 * 4];
        let grid = make_grid(&values, [3, 3, 2, 2], 8, 2).unwrap();
        assert_eq!((grid.width, grid.height), (3 * 4 + 2, 6));
    }

    #[test]
    fn test_tiles_placed_inside_padding() {
        let values = vec![1.0f32; 2 * 1 * 1];
        let grid = make_grid(&values, [2, 1, 1, 1], 8, 2).unwrap();
        // 2 columns of 1px tiles: width 2 * 3 + 2 = 8, height 5
        assert_eq!((grid.width, grid.height), (8, 5));
        let plane = grid.width * grid.height;
        assert_eq!(grid.pixels[2 * grid.width + 2], 1.0);
        assert_eq!(grid.pixels[2 * grid.width + 5], 1.0);
        assert_eq!(grid.pixels[2 * plane + 2 * grid.width + 5], 1.0);
        assert_eq!(grid.pixels[0], 0.0);
        assert_eq!(grid.pixels.iter().filter(|v| **v == 1.0).count(), 6);
    }

    #[test]
    fn test_normalize_min_max() {
        let mut values = vec![-1.0, 0.0, 1.0];
        normalize_min_max(&mut values);
        assert_eq!(values, vec![0.0, 0.5, 1.0]);

        let mut flat = vec![0.3, 0.3];
        normalize_min_max(&mut flat);
        assert_eq!(flat, vec![0.0, 0.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(make_grid(&[0.0; 8], [2, 2, 1, 2], 8, 2).is_err());
        assert!(make_grid(&[0.0; 5], [2, 3, 1, 1], 8, 2).is_err());
    }

    #[test]
    fn test_save_image_grid_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let images = Tensor::<NdArray, 4>::ones([9, 3, 4, 4], &Default::default());

        save_image_grid(images, &path, DEFAULT_NROW).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!(written.width(), 8 * 6 + 2);
        assert_eq!(written.height(), 2 * 6 + 2);
    }
}
