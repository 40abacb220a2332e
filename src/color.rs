// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/color.rs - HSV 颜色空间转换
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

use image::Rgb;
use palette::{FromColor, Srgb};

/// H 为角度 [0, 360)，S / V 为 [0, 255]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
  pub h: f32,
  pub s: f32,
  pub v: f32,
}

pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> Hsv {
  let [r, g, b] = pixel.0;
  let rgb: Srgb = Srgb::<u8>::new(r, g, b).into_format();
  let hsv: palette::Hsv = palette::Hsv::from_color(rgb);
  Hsv {
    h: hsv.hue.into_positive_degrees(),
    s: hsv.saturation * 255.0,
    v: hsv.value * 255.0,
  }
}

pub fn hsv_to_rgb(hsv: &Hsv) -> Rgb<u8> {
  let hsv = palette::Hsv::new(
    hsv.h.rem_euclid(360.0),
    (hsv.s / 255.0).clamp(0.0, 1.0),
    (hsv.v / 255.0).clamp(0.0, 1.0),
  );
  let rgb: Srgb = Srgb::from_color(hsv);
  let rgb: Srgb<u8> = rgb.into_format();
  Rgb([rgb.red, rgb.green, rgb.blue])
}

/// 色环上的最短角距离，取值 [0, 180]
pub fn circular_hue_distance(a: f32, b: f32) -> f32 {
  let d = (a - b).rem_euclid(360.0);
  d.min(360.0 - d)
}
