// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/modify/duplicate.rs - 添加物体（复制到新位置）
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

use image::{Rgb, RgbImage};
use tracing::{debug, trace};

use super::{
  Proposal,
  blend::{SMOOTH_RADIUS, SMOOTH_SIGMA_COLOR, SMOOTH_SIGMA_SPACE, luminance, masked_bilateral},
};
use crate::{
  mask::{BBox, BBoxExt, Mask},
  random::RandomSource,
  segment::Segment,
};

const FEATHER_CAP: u8 = 3;
const FEATHER_SIGMA: f32 = 1.0;
const BRIGHTNESS_RATIO_MIN: f32 = 0.85;
const BRIGHTNESS_RATIO_MAX: f32 = 1.15;

/// 放置搜索参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
  pub attempts: usize,
  /// 新位置与原物体之间的最小间隙
  pub margin: u32,
}

impl Default for PlacementParams {
  fn default() -> Self {
    Self {
      attempts: 30,
      margin: 20,
    }
  }
}

fn mean_rgb(image: &RgbImage, pixels: impl Iterator<Item = (u32, u32)>) -> Option<[f32; 3]> {
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

fn bbox_pixels(bbox: &BBox) -> impl Iterator<Item = (u32, u32)> + '_ {
  (bbox[1]..bbox[3]).flat_map(move |y| (bbox[0]..bbox[2]).map(move |x| (x, y)))
}

fn brightness(color: &[f32; 3]) -> f32 {
  luminance(&Rgb(color.map(|v| v.round() as u8)))
}

fn color_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
  (0..3).map(|c| (a[c] - b[c]).powi(2)).sum::<f32>().sqrt()
}

/// 随机偏移搜索：远离原物体且不越界，取背景色最接近的位置
pub fn find_placement(
  image: &RgbImage,
  segment: &Segment,
  params: &PlacementParams,
  rng: &mut dyn RandomSource,
) -> Option<BBox> {
  let (width, height) = image.dimensions();
  let bbox = segment.bbox;
  let (obj_w, obj_h) = (bbox.width() as i64, bbox.height() as i64);
  let margin = params.margin as i64;
  let (range_x, range_y) = (width as i64 / 3, height as i64 / 3);

  // 源物体周围背景：bbox 内非掩码像素
  let source_bg = mean_rgb(
    image,
    bbox_pixels(&bbox).filter(|&(x, y)| !segment.mask.get(x, y)),
  )
  .or_else(|| mean_rgb(image, bbox_pixels(&bbox)))?;

  let mut best: Option<(f32, BBox)> = None;
  for attempt in 0..params.attempts {
    let dx = rng.integer(-range_x, range_x);
    let dy = rng.integer(-range_y, range_y);

    if dx.abs() < obj_w + margin && dy.abs() < obj_h + margin {
      trace!("放置尝试 {}: 偏移 ({}, {}) 离原物体过近", attempt, dx, dy);
      continue;
    }

    let (x1, y1) = (bbox[0] as i64 + dx, bbox[1] as i64 + dy);
    let (x2, y2) = (x1 + obj_w, y1 + obj_h);
    if x1 < 0 || y1 < 0 || x2 > width as i64 || y2 > height as i64 {
      trace!("放置尝试 {}: 偏移 ({}, {}) 越界", attempt, dx, dy);
      continue;
    }

    let target = [x1 as u32, y1 as u32, x2 as u32, y2 as u32];
    let Some(target_color) = mean_rgb(image, bbox_pixels(&target)) else {
      continue;
    };
    let distance = color_distance(&source_bg, &target_color);
    if best.is_none_or(|(d, _)| distance < d) {
      best = Some((distance, target));
    }
  }

  match best {
    Some((distance, target)) => {
      debug!("放置位置 {:?}，背景色差 {:.1}", target, distance);
      Some(target)
    }
    None => {
      debug!("{} 次尝试均未找到合法放置位置", params.attempts);
      None
    }
  }
}

/// 把物体复制到新位置，找不到位置时返回 `None`，不修改图像
pub fn duplicate_object(
  image: &RgbImage,
  segment: &Segment,
  params: &PlacementParams,
  rng: &mut dyn RandomSource,
) -> Option<Proposal> {
  let target = find_placement(image, segment, params, rng)?;
  let (width, height) = image.dimensions();
  let source = segment.bbox;
  let local = segment.mask.crop(&source);

  let object_brightness = brightness(&mean_rgb(image, segment.mask.iter_on())?);
  let background_brightness = brightness(&mean_rgb(image, bbox_pixels(&target))?);
  let ratio = (background_brightness / object_brightness.max(1.0))
    .clamp(BRIGHTNESS_RATIO_MIN, BRIGHTNESS_RATIO_MAX);

  let alpha = local.feather_alpha(FEATHER_CAP, FEATHER_SIGMA);
  let mut pasted = image.clone();
  for ly in 0..source.height() {
    for lx in 0..source.width() {
      let a = alpha.get_pixel(lx, ly)[0];
      if a == 0 {
        continue;
      }
      let a = a as f32 / 255.0;
      let src = image.get_pixel(source[0] + lx, source[1] + ly);
      let (tx, ty) = (target[0] + lx, target[1] + ly);
      let dst = pasted.get_pixel_mut(tx, ty);
      for c in 0..3 {
        let adjusted = (src[c] as f32 * ratio).clamp(0.0, 255.0);
        dst[c] = (adjusted * a + dst[c] as f32 * (1.0 - a))
          .round()
          .clamp(0.0, 255.0) as u8;
      }
    }
  }

  let placed = Mask::placed(width, height, &local, target[0], target[1]);
  let seam = placed.dilate(2).and_not(&placed.erode(1));
  let smoothed = masked_bilateral(
    &pasted,
    &seam,
    SMOOTH_RADIUS,
    SMOOTH_SIGMA_COLOR,
    SMOOTH_SIGMA_SPACE,
  );

  Some(Proposal {
    image: smoothed,
    mask: placed,
    bbox: target,
  })
}
