// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/model/contrast_saliency.rs - 中心-周边对比度显著性
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use thiserror::Error;
use tracing::debug;

use crate::model::{SaliencyMap, SaliencyModel};

const FINE_SIGMA: f32 = 2.0;
const COARSE_SIGMA: f32 = 16.0;
const SMOOTH_SIGMA: f32 = 4.0;
// RGB 空间最大欧氏距离 255·√3
const MAX_RGB_DISTANCE: f32 = 441.673;

#[derive(Error, Debug)]
pub enum ContrastSaliencyError {
  #[error("图像为空")]
  EmptyImage,
}

/// 细尺度与粗尺度高斯模糊之差作为注意力
#[derive(Debug, Clone)]
pub struct ContrastSaliency {
  fine_sigma: f32,
  coarse_sigma: f32,
  smooth_sigma: f32,
}

impl Default for ContrastSaliency {
  fn default() -> Self {
    Self {
      fine_sigma: FINE_SIGMA,
      coarse_sigma: COARSE_SIGMA,
      smooth_sigma: SMOOTH_SIGMA,
    }
  }
}

impl ContrastSaliency {
  pub fn with_sigmas(mut self, fine: f32, coarse: f32, smooth: f32) -> Self {
    self.fine_sigma = fine;
    self.coarse_sigma = coarse;
    self.smooth_sigma = smooth;
    self
  }
}

impl SaliencyModel for ContrastSaliency {
  type Error = ContrastSaliencyError;

  fn compute_map(&self, image: &RgbImage) -> Result<SaliencyMap, Self::Error> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(ContrastSaliencyError::EmptyImage);
    }

    let fine = gaussian_blur_f32(image, self.fine_sigma);
    let coarse = gaussian_blur_f32(image, self.coarse_sigma);

    let contrast = GrayImage::from_fn(width, height, |x, y| {
      let a = fine.get_pixel(x, y);
      let b = coarse.get_pixel(x, y);
      let distance = (0..3)
        .map(|c| {
          let d = a[c] as f32 - b[c] as f32;
          d * d
        })
        .sum::<f32>()
        .sqrt();
      Luma([(distance / MAX_RGB_DISTANCE * 255.0).round().min(255.0) as u8])
    });
    let smoothed = gaussian_blur_f32(&contrast, self.smooth_sigma);

    let (lo, hi) = smoothed
      .pixels()
      .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    debug!("对比度显著性范围: {} - {}", lo, hi);

    let span = (hi - lo) as f32;
    Ok(SaliencyMap::from_fn(width, height, |x, y| {
      if span <= 0.0 {
        Luma([0.0])
      } else {
        Luma([(smoothed.get_pixel(x, y)[0] - lo) as f32 / span])
      }
    }))
  }

  fn name(&self) -> &str {
    "contrast-saliency"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn bright_spot_is_more_salient_than_background() {
    let image = RgbImage::from_fn(96, 96, |x, y| {
      if (40..56).contains(&x) && (40..56).contains(&y) {
        Rgb([250, 30, 30])
      } else {
        Rgb([120, 120, 120])
      }
    });
    let map = ContrastSaliency::default().compute_map(&image).unwrap();
    assert_eq!(map.dimensions(), (96, 96));
    assert!(map.get_pixel(48, 48)[0] > map.get_pixel(5, 5)[0]);
    assert!(map.pixels().all(|p| (0.0..=1.0).contains(&p[0])));
  }
}
