// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/modify/blend.rs - 透明度混合与局部双边平滑
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

use image::{GrayImage, Rgb, RgbImage, imageops::crop_imm};
use imageproc::filter::bilateral::{GaussianEuclideanColorDistance, bilateral_filter};

use crate::mask::{BBoxExt, Mask, pad_bbox};

pub const SMOOTH_RADIUS: u8 = 2;
pub const SMOOTH_SIGMA_COLOR: f32 = 40.0;
pub const SMOOTH_SIGMA_SPACE: f32 = 2.0;

/// 按 alpha（0..=255）混合：`fg·a + bg·(1−a)`，三者尺寸一致
pub fn alpha_blend(background: &RgbImage, foreground: &RgbImage, alpha: &GrayImage) -> RgbImage {
  let mut out = background.clone();
  for (x, y, pixel) in out.enumerate_pixels_mut() {
    let a = alpha.get_pixel(x, y)[0];
    if a == 0 {
      continue;
    }
    let a = a as f32 / 255.0;
    let fg = foreground.get_pixel(x, y);
    for c in 0..3 {
      pixel[c] = (fg[c] as f32 * a + pixel[c] as f32 * (1.0 - a))
        .round()
        .clamp(0.0, 255.0) as u8;
    }
  }
  out
}

/// 对掩码外接框（外扩半径）做双边滤波，只写回掩码内像素
pub fn masked_bilateral(
  image: &RgbImage,
  mask: &Mask,
  radius: u8,
  sigma_color: f32,
  sigma_space: f32,
) -> RgbImage {
  let mut out = image.clone();
  let Some(bbox) = mask.bbox() else {
    return out;
  };
  let (width, height) = image.dimensions();
  let region = pad_bbox(&bbox, radius as u32, width, height);
  let crop = crop_imm(image, region[0], region[1], region.width(), region.height()).to_image();
  let filtered = bilateral_filter(
    &crop,
    radius,
    sigma_space,
    GaussianEuclideanColorDistance::new(sigma_color),
  );

  for (x, y) in mask.iter_on() {
    out.put_pixel(x, y, *filtered.get_pixel(x - region[0], y - region[1]));
  }
  out
}

/// ITU-R BT.601 亮度
pub fn luminance(pixel: &Rgb<u8>) -> f32 {
  0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}
