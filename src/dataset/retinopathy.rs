//! Diabetic retinopathy image dataset
//!
//! Image names and labels come from a pair of single-column CSV files with a
//! header row (`<file_root>/<mode>_img.csv`, `<file_root>/<mode>_label.csv`).
//! Images are read from `<img_root>/<name>.jpeg`, converted to CHW floats in
//! [0, 1] and normalised with mean 0.5 and std 0.5 per channel. In training
//! mode each image is randomly flipped horizontally and vertically.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::{imageops, ImageReader, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::error::{LabError, Result, ResultExt};

const CHANNEL_MEAN: f32 = 0.5;
const CHANNEL_STD: f32 = 0.5;

/// Procedure status of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Train,
    Test,
}

impl Mode {
    fn prefix(&self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Test => "test",
        }
    }
}

/// A preprocessed retinopathy image
#[derive(Clone, Debug)]
pub struct RetinopathyItem {
    /// CHW float image [3 * height * width]
    pub image: Vec<f32>,
    pub height: usize,
    pub width: usize,
    pub label: usize,
}

/// Read image names and labels for `mode` from `file_root`
pub fn get_data(mode: Mode, file_root: &Path) -> Result<(Vec<String>, Vec<usize>)> {
    let img_path = file_root.join(format!("{}_img.csv", mode.prefix()));
    let label_path = file_root.join(format!("{}_label.csv", mode.prefix()));

    let names = read_column(&img_path)?;
    let labels = read_column(&label_path)?
        .into_iter()
        .map(|value| {
            value
                .parse::<f32>()
                .map(|v| v as usize)
                .map_err(|e| LabError::Dataset(format!("bad label '{}': {}", value, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    if names.len() != labels.len() {
        return Err(LabError::Dataset(format!(
            "{} image names but {} labels",
            names.len(),
            labels.len()
        )));
    }
    Ok((names, labels))
}

/// First field of every row after the header
fn read_column(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').next().unwrap_or("").trim().to_string())
        .collect())
}

/// Retinopathy dataset implementing Burn's Dataset trait; images load lazily
#[derive(Debug, Clone)]
pub struct RetinopathyDataset {
    img_root: PathBuf,
    img_names: Vec<String>,
    labels: Vec<usize>,
    mode: Mode,
    seed: Option<u64>,
    draws: Arc<AtomicU64>,
}

impl RetinopathyDataset {
    /// Read the index CSVs for `mode`; fails if any listed image is missing
    pub fn new(file_root: &Path, img_root: &Path, mode: Mode) -> Result<Self> {
        let (img_names, labels) = get_data(mode, file_root)?;
        for name in &img_names {
            let path = img_root.join(format!("{}.jpeg", name));
            if !path.is_file() {
                return Err(LabError::Image(path, "file not found".to_string()));
            }
        }
        info!("> Found {} images...", img_names.len());
        Ok(Self {
            img_root: img_root.to_path_buf(),
            img_names,
            labels,
            mode,
            seed: None,
            draws: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Make the training flips reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Path of the image at `index`
    pub fn image_path(&self, index: usize) -> Result<PathBuf> {
        let name = self.img_names.get(index).ok_or(LabError::IndexOutOfRange {
            index,
            len: self.img_names.len(),
        })?;
        Ok(self.img_root.join(format!("{}.jpeg", name)))
    }

    /// Load, transform and return the item at `index`
    pub fn load(&self, index: usize) -> Result<RetinopathyItem> {
        let path = self.image_path(index)?;
        let mut img = ImageReader::open(&path)
            .map_err(|e| LabError::Image(path.clone(), e.to_string()))?
            .decode()
            .map_err(|e| LabError::Image(path.clone(), e.to_string()))?
            .to_rgb8();

        if self.mode == Mode::Train {
            let (horizontal, vertical) = self.draw_flips();
            apply_flips(&mut img, horizontal, vertical);
        }

        Ok(RetinopathyItem {
            height: img.height() as usize,
            width: img.width() as usize,
            image: to_normalized_chw(&img),
            label: self.labels[index],
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn draw_flips(&self) -> (bool, bool) {
        match self.seed {
            Some(seed) => {
                // fresh stream per load, advanced by the draw counter
                let draw = self.draws.fetch_add(1, Ordering::Relaxed);
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(draw));
                (rng.gen_bool(0.5), rng.gen_bool(0.5))
            }
            None => {
                let mut rng = rand::thread_rng();
                (rng.gen_bool(0.5), rng.gen_bool(0.5))
            }
        }
    }
}

impl Dataset<RetinopathyItem> for RetinopathyDataset {
    /// # Panics
    ///
    /// Panics if the image at `index` can no longer be read or decoded.
    /// `None` is only returned past the end.
    fn get(&self, index: usize) -> Option<RetinopathyItem> {
        if index >= self.img_names.len() {
            return None;
        }
        match self.load(index) {
            Ok(item) => Some(item),
            Err(e) => panic!("{}", e),
        }
    }

    fn len(&self) -> usize {
        self.img_names.len()
    }
}

/// Flip an image in place
pub fn apply_flips(img: &mut RgbImage, horizontal: bool, vertical: bool) {
    if horizontal {
        imageops::flip_horizontal_in_place(img);
    }
    if vertical {
        imageops::flip_vertical_in_place(img);
    }
}

/// HWC u8 pixels to normalised CHW floats
pub fn to_normalized_chw(img: &RgbImage) -> Vec<f32> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let plane = height * width;
    let mut image = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            image[c * plane + offset] = (value - CHANNEL_MEAN) / CHANNEL_STD;
        }
    }
    image
}

/// A batch of retinopathy images
#[derive(Clone, Debug)]
pub struct RetinopathyBatch<B: Backend> {
    /// [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher for equally sized retinopathy images
#[derive(Clone, Debug, Default)]
pub struct RetinopathyBatcher;

impl<B: Backend> Batcher<B, RetinopathyItem, RetinopathyBatch<B>> for RetinopathyBatcher {
    fn batch(&self, items: Vec<RetinopathyItem>, device: &B::Device) -> RetinopathyBatch<B> {
        let batch_size = items.len();
        let (height, width) = items.first().map(|i| (i.height, i.width)).unwrap_or((0, 0));

        let images_data: Vec<f32> = items.iter().flat_map(|i| i.image.iter().copied()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, height, width]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|i| i.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        RetinopathyBatch { images, targets }
    }
}
