// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/quality/metrics.rs - 修改质量的像素级度量
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

use image::{GrayImage, RgbImage, imageops::grayscale};
use image_compare::Algorithm;
use imageproc::gradients::sobel_gradients;
use tracing::warn;

use crate::{color::rgb_to_hsv, mask::Mask};

/// 膨胀/腐蚀两次 5×5 结构元素，对应半径 4
pub const EDGE_RING_RADIUS: u8 = 4;
const CONTINUITY_NORMALIZER: f32 = 150.0;

/// 灰度图结构相似度 (MSSIM)，尺寸不一致视为完全不相似
pub fn ssim(a: &GrayImage, b: &GrayImage) -> f32 {
  match image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, a, b) {
    Ok(similarity) => similarity.score as f32,
    Err(e) => {
      warn!("SSIM 计算失败: {:?}", e);
      0.0
    }
  }
}

/// 环形区域内 Sobel 梯度幅值的均值
pub fn ring_gradient_mean(gray: &GrayImage, ring: &Mask) -> f32 {
  let gradients = sobel_gradients(gray);
  let mut sum = 0.0f64;
  let mut count = 0u64;
  for (x, y) in ring.iter_on() {
    sum += gradients.get_pixel(x, y)[0] as f64;
    count += 1;
  }
  if count == 0 {
    0.0
  } else {
    (sum / count as f64) as f32
  }
}

/// 修改前后边缘环梯度的相对增幅，归一化到 [0, 1]，越大伪影越多
pub fn edge_artifact_score(original: &RgbImage, modified: &RgbImage, mask: &Mask) -> f32 {
  let ring = mask.ring(EDGE_RING_RADIUS, EDGE_RING_RADIUS);
  if ring.is_empty() {
    return 0.0;
  }
  let before = ring_gradient_mean(&grayscale(original), &ring).max(1.0);
  let after = ring_gradient_mean(&grayscale(modified), &ring);
  let increase = (after - before) / before;
  (increase / 2.0).clamp(0.0, 1.0)
}

/// 饱和度过高、毫无变化，或明度极端时判为不自然
pub fn color_naturalness(image: &RgbImage, mask: &Mask) -> f32 {
  let hsv: Vec<_> = mask
    .iter_on()
    .map(|(x, y)| rgb_to_hsv(image.get_pixel(x, y)))
    .collect();
  if hsv.is_empty() {
    return 1.0;
  }
  let n = hsv.len() as f32;
  let mean_s = hsv.iter().map(|p| p.s).sum::<f32>() / n;
  let std_s = (hsv.iter().map(|p| (p.s - mean_s).powi(2)).sum::<f32>() / n).sqrt();
  let mean_v = hsv.iter().map(|p| p.v).sum::<f32>() / n;

  if mean_s > 220.0 {
    0.3
  } else if std_s < 5.0 {
    0.5
  } else if !(20.0..=250.0).contains(&mean_v) {
    0.4
  } else {
    0.9
  }
}

fn mean_color(image: &RgbImage, pixels: impl Iterator<Item = (u32, u32)>) -> Option<[f32; 3]> {
  let mut sum = [0.0f64; 3];
  let mut count = 0u64;
  for (x, y) in pixels {
    let p = image.get_pixel(x, y);
    for c in 0..3 {
      sum[c] += p[c] as f64;
    }
    count += 1;
  }
  (count > 0).then(|| sum.map(|s| (s / count as f64) as f32))
}

/// 添加物体与紧邻背景的平均色差越小越连贯
pub fn addition_continuity(image: &RgbImage, mask: &Mask) -> f32 {
  let border = mask.dilate(EDGE_RING_RADIUS).and_not(mask);
  let object = mean_color(image, mask.iter_on());
  let surround = mean_color(image, border.iter_on());
  match (object, surround) {
    (Some(o), Some(s)) => {
      let distance = (0..3).map(|c| (o[c] - s[c]).powi(2)).sum::<f32>().sqrt();
      1.0 - (distance / CONTINUITY_NORMALIZER).min(1.0)
    }
    _ => 1.0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb};

  fn textured(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 200) as u8]))
  }

  #[test]
  fn ssim_of_identical_images_is_one() {
    let image = textured(32, 24);
    assert!((ssim(&image, &image) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn ssim_drops_for_different_images() {
    let a = textured(32, 32);
    let b = GrayImage::from_fn(32, 32, |x, y| Luma([255 - a.get_pixel(x, y)[0]]));
    assert!(ssim(&a, &b) < 0.5);
  }

  #[test]
  fn ssim_of_mismatched_sizes_is_zero() {
    assert_eq!(ssim(&textured(16, 16), &textured(16, 8)), 0.0);
  }

  #[test]
  fn added_edges_count_as_artifacts() {
    let original = RgbImage::from_pixel(40, 40, Rgb([120, 120, 120]));
    let mask = Mask::from_fn(40, 40, |x, y| (10..30).contains(&x) && (10..30).contains(&y));
    let mut modified = original.clone();
    for (x, y) in mask.iter_on() {
      modified.put_pixel(x, y, Rgb([250, 250, 250]));
    }
    assert_eq!(edge_artifact_score(&original, &original, &mask), 0.0);
    assert_eq!(edge_artifact_score(&original, &modified, &mask), 1.0);
  }

  #[test]
  fn naturalness_flags_oversaturation_and_flat_color() {
    let mask = Mask::from_fn(10, 10, |_, _| true);
    let saturated = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
    assert_eq!(color_naturalness(&saturated, &mask), 0.3);
    let flat = RgbImage::from_pixel(10, 10, Rgb([120, 100, 80]));
    assert_eq!(color_naturalness(&flat, &mask), 0.5);
    let varied = RgbImage::from_fn(10, 10, |x, _| Rgb([120, 90, 20 + x as u8 * 6]));
    assert_eq!(color_naturalness(&varied, &mask), 0.9);
  }

  #[test]
  fn continuity_of_matching_colors() {
    let mask = Mask::from_fn(30, 30, |x, y| (10..20).contains(&x) && (10..20).contains(&y));
    let same = RgbImage::from_pixel(30, 30, Rgb([100, 100, 100]));
    assert_eq!(addition_continuity(&same, &mask), 1.0);
    let mut contrast = same.clone();
    for (x, y) in mask.iter_on() {
      contrast.put_pixel(x, y, Rgb([255, 255, 255]));
    }
    assert!(addition_continuity(&contrast, &mask) < 0.6);
  }
}
