// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/modify/delete.rs - 删除物体（图像修复）
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

use image::{RgbImage, imageops::grayscale};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
  Proposal,
  blend::{SMOOTH_RADIUS, SMOOTH_SIGMA_COLOR, SMOOTH_SIGMA_SPACE, masked_bilateral},
};
use crate::{
  mask::Mask,
  model::{InpaintMethod, Inpainter},
  quality::metrics::{EDGE_RING_RADIUS, ring_gradient_mean},
};

const HALO_RADIUS: u8 = 2;
const CORE_RADIUS: u8 = 2;

/// 修复方法的选择方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InpaintStrategy {
  /// 固定使用一种方法
  Single(InpaintMethod),
  /// 逐一尝试，保留边缘环梯度最低的结果
  Best(Vec<InpaintMethod>),
}

impl Default for InpaintStrategy {
  fn default() -> Self {
    InpaintStrategy::Single(InpaintMethod::NavierStokes)
  }
}

impl InpaintStrategy {
  pub fn methods(&self) -> &[InpaintMethod] {
    match self {
      InpaintStrategy::Single(method) => std::slice::from_ref(method),
      InpaintStrategy::Best(methods) => methods,
    }
  }
}

/// 按掩码面积占比分级：<1% → 5，<5% → 10，否则 15，均不低于基础半径
pub fn adaptive_radius(mask_area: u32, image_area: u64, base_radius: u32) -> u32 {
  let ratio = mask_area as f64 / image_area.max(1) as f64;
  let tier = if ratio < 0.01 {
    5
  } else if ratio < 0.05 {
    10
  } else {
    15
  };
  tier.max(base_radius)
}

/// 修复结果在掩码边缘环上的平均梯度，越低说明过渡越自然
pub fn border_gradient_score(image: &RgbImage, mask: &Mask) -> f32 {
  let ring = mask.ring(EDGE_RING_RADIUS, EDGE_RING_RADIUS);
  ring_gradient_mean(&grayscale(image), &ring)
}

/// 擦除掩码覆盖的物体：膨胀掩码覆盖光晕，修复，再对核心区域做双边平滑
pub fn delete_object<P: Inpainter + ?Sized>(
  image: &RgbImage,
  mask: &Mask,
  inpainter: &P,
  base_radius: u32,
  strategy: &InpaintStrategy,
) -> Result<Proposal, P::Error> {
  let halo = mask.dilate(HALO_RADIUS);
  let (width, height) = image.dimensions();
  let radius = adaptive_radius(halo.area(), width as u64 * height as u64, base_radius);

  let mut best: Option<(f32, RgbImage)> = None;
  for &method in strategy.methods() {
    let candidate = inpainter.inpaint(image, &halo, radius, method)?;
    let score = border_gradient_score(&candidate, &halo);
    debug!("修复方法 {:?} 半径 {}: 边缘梯度 {:.2}", method, radius, score);
    if best.as_ref().is_none_or(|(s, _)| score < *s) {
      best = Some((score, candidate));
    }
  }
  // 空策略时保留原图，由质量评估兜底
  let inpainted = best.map(|(_, img)| img).unwrap_or_else(|| image.clone());

  let core = halo.erode(CORE_RADIUS);
  let smoothed = masked_bilateral(
    &inpainted,
    &core,
    SMOOTH_RADIUS,
    SMOOTH_SIGMA_COLOR,
    SMOOTH_SIGMA_SPACE,
  );

  let bbox = halo.bbox().unwrap_or([0, 0, 0, 0]);
  Ok(Proposal {
    image: smoothed,
    mask: halo,
    bbox,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;
  use std::convert::Infallible;

  /// 用固定颜色填充，颜色由方法决定
  struct FlatFill;

  impl Inpainter for FlatFill {
    type Error = Infallible;

    fn inpaint(
      &self,
      image: &RgbImage,
      mask: &Mask,
      _radius: u32,
      method: InpaintMethod,
    ) -> Result<RgbImage, Infallible> {
      let fill = match method {
        InpaintMethod::Telea => Rgb([250, 250, 250]),
        InpaintMethod::NavierStokes => Rgb([80, 80, 80]),
      };
      let mut out = image.clone();
      for (x, y) in mask.iter_on() {
        out.put_pixel(x, y, fill);
      }
      Ok(out)
    }

    fn name(&self) -> &str {
      "flat-fill"
    }
  }

  fn scene() -> (RgbImage, Mask) {
    let mask = Mask::from_fn(60, 60, |x, y| (20..40).contains(&x) && (20..40).contains(&y));
    let mut image = RgbImage::from_pixel(60, 60, Rgb([80, 80, 80]));
    for (x, y) in mask.iter_on() {
      image.put_pixel(x, y, Rgb([200, 30, 30]));
    }
    (image, mask)
  }

  #[test]
  fn radius_tiers() {
    assert_eq!(adaptive_radius(50, 10_000, 3), 5);
    assert_eq!(adaptive_radius(300, 10_000, 3), 10);
    assert_eq!(adaptive_radius(900, 10_000, 3), 15);
    assert_eq!(adaptive_radius(50, 10_000, 8), 8);
  }

  #[test]
  fn best_strategy_keeps_smoothest_fill() {
    let (image, mask) = scene();
    let strategy = InpaintStrategy::Best(vec![InpaintMethod::Telea, InpaintMethod::NavierStokes]);
    let proposal = delete_object(&image, &mask, &FlatFill, 5, &strategy).unwrap();
    assert_eq!(proposal.image.get_pixel(30, 30), &Rgb([80, 80, 80]));
    assert_eq!(proposal.bbox, [18, 18, 42, 42]);
    assert!(proposal.mask.area() > mask.area());
  }

  #[test]
  fn single_strategy_uses_its_method() {
    let (image, mask) = scene();
    let strategy = InpaintStrategy::Single(InpaintMethod::Telea);
    let proposal = delete_object(&image, &mask, &FlatFill, 5, &strategy).unwrap();
    assert_eq!(proposal.image.get_pixel(30, 30), &Rgb([250, 250, 250]));
  }

  #[test]
  fn strategy_deserializes_from_config() {
    let strategy: InpaintStrategy =
      serde_json::from_str(r#"{"best": ["telea", "navier_stokes"]}"#).unwrap();
    assert_eq!(strategy.methods().len(), 2);
  }
}
