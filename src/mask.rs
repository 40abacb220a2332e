// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/mask.rs - 二值掩码定义
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

use image::{GrayImage, ImageBuffer, Luma, imageops::FilterType};
use imageproc::{
  distance_transform::{Norm, euclidean_squared_distance_transform},
  filter::gaussian_blur_f32,
  morphology,
};

const MASK_ON: u8 = 255;
const MASK_OFF: u8 = 0;

/// 概率掩码，取值 [0, 1]
pub type ProbabilityMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 边界框 [x1, y1, x2, y2]，x2 / y2 不包含在内
pub type BBox = [u32; 4];

pub trait BBoxExt {
  fn width(&self) -> u32;
  fn height(&self) -> u32;
  fn area(&self) -> u64;
}

impl BBoxExt for BBox {
  fn width(&self) -> u32 {
    self[2].saturating_sub(self[0])
  }

  fn height(&self) -> u32 {
    self[3].saturating_sub(self[1])
  }

  fn area(&self) -> u64 {
    self.width() as u64 * self.height() as u64
  }
}

/// 将边界框向外扩展 `pad` 像素并裁剪到图像范围内
pub fn pad_bbox(bbox: &BBox, pad: u32, width: u32, height: u32) -> BBox {
  [
    bbox[0].saturating_sub(pad),
    bbox[1].saturating_sub(pad),
    (bbox[2] + pad).min(width),
    (bbox[3] + pad).min(height),
  ]
}

/// H×W 二值掩码，内部以 0 / 255 的灰度图存储，方便直接交给 imageproc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
  image: GrayImage,
}

impl Mask {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      image: GrayImage::new(width, height),
    }
  }

  pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
    Self {
      image: GrayImage::from_fn(width, height, |x, y| Luma([on_off(f(x, y))])),
    }
  }

  /// 按阈值二值化概率掩码（严格大于阈值视为前景）
  pub fn from_probability(map: &ProbabilityMap, threshold: f32) -> Self {
    let (width, height) = map.dimensions();
    Self::from_fn(width, height, |x, y| map.get_pixel(x, y)[0] > threshold)
  }

  /// 任何非零像素视为前景
  pub fn from_gray(image: &GrayImage) -> Self {
    let (width, height) = image.dimensions();
    Self::from_fn(width, height, |x, y| image.get_pixel(x, y)[0] > 0)
  }

  /// 在 `width`×`height` 的画布上，把局部掩码放置到 (x, y)
  pub fn placed(width: u32, height: u32, local: &Mask, x: u32, y: u32) -> Self {
    let mut mask = Self::new(width, height);
    for (lx, ly) in local.iter_on() {
      let (gx, gy) = (lx + x, ly + y);
      if gx < width && gy < height {
        mask.set(gx, gy, true);
      }
    }
    mask
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }

  pub fn as_gray(&self) -> &GrayImage {
    &self.image
  }

  pub fn get(&self, x: u32, y: u32) -> bool {
    self.image.get_pixel(x, y)[0] != MASK_OFF
  }

  pub fn set(&mut self, x: u32, y: u32, value: bool) {
    self.image.put_pixel(x, y, Luma([on_off(value)]));
  }

  pub fn area(&self) -> u32 {
    self.image.pixels().filter(|p| p[0] != MASK_OFF).count() as u32
  }

  pub fn is_empty(&self) -> bool {
    self.image.pixels().all(|p| p[0] == MASK_OFF)
  }

  pub fn iter_on(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
    self
      .image
      .enumerate_pixels()
      .filter(|(_, _, p)| p[0] != MASK_OFF)
      .map(|(x, y, _)| (x, y))
  }

  /// 掩码前景的紧致边界框，空掩码返回 None
  pub fn bbox(&self) -> Option<BBox> {
    let mut bbox: Option<BBox> = None;
    for (x, y) in self.iter_on() {
      bbox = Some(match bbox {
        None => [x, y, x + 1, y + 1],
        Some([x1, y1, x2, y2]) => [x1.min(x), y1.min(y), x2.max(x + 1), y2.max(y + 1)],
      });
    }
    bbox
  }

  /// 最近邻缩放到目标分辨率
  pub fn resize_nearest(&self, width: u32, height: u32) -> Self {
    if self.dimensions() == (width, height) {
      return self.clone();
    }
    let resized = image::imageops::resize(&self.image, width, height, FilterType::Nearest);
    Self::from_gray(&resized)
  }

  pub fn intersection_area(&self, other: &Mask) -> u32 {
    if self.dimensions() != other.dimensions() {
      return 0;
    }
    self
      .image
      .pixels()
      .zip(other.image.pixels())
      .filter(|(a, b)| a[0] != MASK_OFF && b[0] != MASK_OFF)
      .count() as u32
  }

  /// 交并比 |A∩B| / |A∪B|，并集为空时为 0
  pub fn iou(&self, other: &Mask) -> f32 {
    let intersection = self.intersection_area(other) as u64;
    let union = self.area() as u64 + other.area() as u64 - intersection;
    if union == 0 {
      0.0
    } else {
      intersection as f32 / union as f32
    }
  }

  pub fn dilate(&self, radius: u8) -> Self {
    Self {
      image: morphology::dilate(&self.image, Norm::LInf, radius),
    }
  }

  pub fn erode(&self, radius: u8) -> Self {
    Self {
      image: morphology::erode(&self.image, Norm::LInf, radius),
    }
  }

  /// self ∧ ¬other
  pub fn and_not(&self, other: &Mask) -> Self {
    let (width, height) = self.dimensions();
    Self::from_fn(width, height, |x, y| self.get(x, y) && !other.get(x, y))
  }

  pub fn invert(&self) -> Self {
    let (width, height) = self.dimensions();
    Self::from_fn(width, height, |x, y| !self.get(x, y))
  }

  /// 膨胀 `outer` 减去腐蚀 `inner` 得到的环形边缘区域
  pub fn ring(&self, outer: u8, inner: u8) -> Self {
    self.dilate(outer).and_not(&self.erode(inner))
  }

  pub fn crop(&self, bbox: &BBox) -> Self {
    let cropped = image::imageops::crop_imm(
      &self.image,
      bbox[0],
      bbox[1],
      bbox.width(),
      bbox.height(),
    )
    .to_image();
    Self { image: cropped }
  }

  /// 基于距离变换的羽化 alpha：距边缘 `cap` 像素以上为 1，
  /// 再经高斯模糊。返回值按像素 0..=255 存储
  pub fn feather_alpha(&self, cap: u8, sigma: f32) -> GrayImage {
    let cap = cap.max(1) as f64;
    // 反转后对背景做欧氏距离变换，得到前景像素到最近背景像素的距离
    let distance = euclidean_squared_distance_transform(self.invert().as_gray());
    let (width, height) = self.dimensions();
    let alpha = GrayImage::from_fn(width, height, |x, y| {
      if !self.get(x, y) {
        return Luma([0]);
      }
      let d = distance.get_pixel(x, y)[0].sqrt().min(cap);
      Luma([(d / cap * 255.0).round() as u8])
    });
    if sigma > 0.0 {
      gaussian_blur_f32(&alpha, sigma)
    } else {
      alpha
    }
  }
}

fn on_off(value: bool) -> u8 {
  if value { MASK_ON } else { MASK_OFF }
}
