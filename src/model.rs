// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/model.rs - 外部能力（分割、显著性、修复）接口
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

use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::mask::{Mask, ProbabilityMap};

/// 逐像素注意力图
pub type SaliencyMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 分割模型输出的单个候选区域
#[derive(Debug, Clone)]
pub struct RawProposal {
  pub mask: ProbabilityMap,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
  pub confidence: f32,
}

impl RawProposal {
  /// 由二值掩码构造，边界框取掩码范围
  pub fn from_mask(mask: &Mask, confidence: f32) -> Self {
    let bbox = mask
      .bbox()
      .map(|b| b.map(|v| v as f32))
      .unwrap_or_default();
    let map = ProbabilityMap::from_fn(mask.width(), mask.height(), |x, y| {
      Luma([if mask.get(x, y) { 1.0 } else { 0.0 }])
    });
    Self {
      mask: map,
      bbox,
      confidence,
    }
  }
}

/// 分割能力：输出可以相互重叠的原始候选区域
pub trait Segmenter {
  type Error: std::error::Error + Send + Sync + 'static;

  fn segment(&self, image: &RgbImage) -> Result<Vec<RawProposal>, Self::Error>;
  fn name(&self) -> &str;
}

/// 显著性能力：输出与图像同尺寸、平滑并归一化到 [0, 1] 的注意力图
pub trait SaliencyModel {
  type Error: std::error::Error + Send + Sync + 'static;

  fn compute_map(&self, image: &RgbImage) -> Result<SaliencyMap, Self::Error>;
  fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InpaintMethod {
  Telea,
  NavierStokes,
}

/// 图像修复原语：填充掩码覆盖的像素
pub trait Inpainter {
  type Error: std::error::Error + Send + Sync + 'static;

  fn inpaint(
    &self,
    image: &RgbImage,
    mask: &Mask,
    radius: u32,
    method: InpaintMethod,
  ) -> Result<RgbImage, Self::Error>;
  fn name(&self) -> &str;
}

mod boundary_fill;
mod contrast_saliency;
pub use self::boundary_fill::{BoundaryFillError, BoundaryFillInpainter};
pub use self::contrast_saliency::{ContrastSaliency, ContrastSaliencyError};

#[cfg(feature = "mask_folder")]
mod mask_folder;
#[cfg(feature = "mask_folder")]
pub use self::mask_folder::{MaskFolderError, MaskFolderSegmenter};
