// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/modify/recolor.rs - 改变物体颜色（色相偏移）
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

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Proposal, blend::alpha_blend};
use crate::{
  color::{Hsv, circular_hue_distance, hsv_to_rgb, rgb_to_hsv},
  mask::Mask,
  random::{RandomSource, RandomSourceExt},
};

pub const MIN_HUE_DISTANCE: f32 = 40.0;
const HUE_CENTERS: [i64; 3] = [90, 120, 150];
const HUE_JITTER: [i64; 5] = [-30, -15, 0, 15, 30];
const FALLBACK_SHIFTS: [i64; 4] = [90, 100, 110, 120];
const FEATHER_CAP: u8 = 5;
const FEATHER_SIGMA: f32 = 1.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HueMode {
  /// [30°, 150°] 内均匀抽取
  Uniform,
  /// 避开与原色相过近的偏移
  #[default]
  Intelligent,
}

/// 掩码内像素色相的中位数（度）
pub fn median_hue(image: &RgbImage, mask: &Mask) -> Option<f32> {
  let mut hues: Vec<f32> = mask
    .iter_on()
    .map(|(x, y)| rgb_to_hsv(image.get_pixel(x, y)).h)
    .collect();
  if hues.is_empty() {
    return None;
  }
  hues.sort_by(|a, b| a.total_cmp(b));
  let mid = hues.len() / 2;
  Some(if hues.len() % 2 == 0 {
    (hues[mid - 1] + hues[mid]) / 2.0
  } else {
    hues[mid]
  })
}

/// 智能模式的候选偏移：偏移后与中位色相距离不少于 40°
pub fn candidate_shifts(median: f32) -> Vec<i64> {
  let mut shifts: Vec<i64> = HUE_CENTERS
    .iter()
    .flat_map(|c| HUE_JITTER.iter().map(move |j| c + j))
    .filter(|&shift| circular_hue_distance(median + shift as f32, median) >= MIN_HUE_DISTANCE)
    .collect();
  shifts.sort_unstable();
  shifts.dedup();
  shifts
}

pub fn pick_hue_shift(mode: HueMode, median: Option<f32>, rng: &mut dyn RandomSource) -> i64 {
  match (mode, median) {
    (HueMode::Intelligent, Some(median)) => {
      let candidates = candidate_shifts(median);
      let pool: &[i64] = if candidates.is_empty() {
        &FALLBACK_SHIFTS
      } else {
        &candidates
      };
      rng.choice(pool).copied().unwrap_or(FALLBACK_SHIFTS[0])
    }
    _ => rng.integer(30, 150),
  }
}

/// 偏移色相并微调饱和度与明度，边缘按距离羽化回原图
pub fn recolor(
  image: &RgbImage,
  mask: &Mask,
  mode: HueMode,
  rng: &mut dyn RandomSource,
) -> Proposal {
  let shift = pick_hue_shift(mode, median_hue(image, mask), rng) as f32;
  let saturation_scale = rng.integer(105, 115) as f32 / 100.0;
  let value_scale = rng.integer(95, 105) as f32 / 100.0;
  debug!(
    "改变颜色: 色相 +{}°, 饱和度 ×{:.2}, 明度 ×{:.2}",
    shift, saturation_scale, value_scale
  );

  let mut shifted = image.clone();
  for (x, y) in mask.iter_on() {
    let hsv = rgb_to_hsv(image.get_pixel(x, y));
    let target = Hsv {
      h: (hsv.h + shift).rem_euclid(360.0),
      s: (hsv.s * saturation_scale).clamp(0.0, 255.0),
      v: (hsv.v * value_scale).clamp(0.0, 255.0),
    };
    shifted.put_pixel(x, y, hsv_to_rgb(&target));
  }

  let alpha = mask.feather_alpha(FEATHER_CAP, FEATHER_SIGMA);
  let blended = alpha_blend(image, &shifted, &alpha);

  Proposal {
    image: blended,
    mask: mask.clone(),
    bbox: mask.bbox().unwrap_or([0, 0, 0, 0]),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::random::{ScriptedRandom, SeededRandom};
  use image::Rgb;

  #[test]
  fn candidates_keep_distance() {
    for median in [0.0, 45.0, 200.0, 359.0] {
      let shifts = candidate_shifts(median);
      assert!(!shifts.is_empty());
      for shift in shifts {
        assert!(circular_hue_distance(median + shift as f32, median) >= MIN_HUE_DISTANCE);
      }
    }
  }

  #[test]
  fn uniform_mode_draws_in_range() {
    let mut rng = SeededRandom::new(11);
    for _ in 0..50 {
      let shift = pick_hue_shift(HueMode::Uniform, Some(10.0), &mut rng);
      assert!((30..=150).contains(&shift));
    }
  }

  #[test]
  fn intelligent_shift_moves_hue_far_enough() {
    // 纯色方块，中位色相 H = 0
    let mask = Mask::from_fn(60, 60, |x, y| (15..45).contains(&x) && (15..45).contains(&y));
    let mut image = RgbImage::from_pixel(60, 60, Rgb([40, 120, 40]));
    for (x, y) in mask.iter_on() {
      image.put_pixel(x, y, Rgb([200, 40, 40]));
    }
    let original_hue = median_hue(&image, &mask).unwrap();

    for seed in 0..8 {
      let mut rng = SeededRandom::new(seed);
      let proposal = recolor(&image, &mask, HueMode::Intelligent, &mut rng);
      // 羽化只影响边缘，取中心像素
      let hue = rgb_to_hsv(proposal.image.get_pixel(30, 30)).h;
      assert!(
        circular_hue_distance(hue, original_hue) >= MIN_HUE_DISTANCE,
        "seed {}: {} vs {}",
        seed,
        hue,
        original_hue
      );
      assert_eq!(proposal.image.get_pixel(2, 2), image.get_pixel(2, 2));
    }
  }

  #[test]
  fn scripted_draws_are_reproducible() {
    let mask = Mask::from_fn(20, 20, |x, y| (5..15).contains(&x) && (5..15).contains(&y));
    let image = RgbImage::from_pixel(20, 20, Rgb([30, 60, 200]));
    let a = recolor(&image, &mask, HueMode::Uniform, &mut ScriptedRandom::new(vec![7, 3, 4]));
    let b = recolor(&image, &mask, HueMode::Uniform, &mut ScriptedRandom::new(vec![7, 3, 4]));
    assert_eq!(a.image, b.image);
    assert_eq!(a.bbox, [5, 5, 15, 15]);
  }
}
