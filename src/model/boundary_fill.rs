// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/model/boundary_fill.rs - 由边界向内填充的参考修复实现
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

//! 参考用的 [`Inpainter`] 实现，供命令行离线运行与测试使用。
//!
//! 生成器本身不包含修复算法，只通过 [`Inpainter`] 调用外部能力；
//! 生产环境应接入真正的修复模型，这里只保证输出尺寸正确、结果可复现。

use image::{Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::{
  mask::Mask,
  model::{InpaintMethod, Inpainter},
};

const DEFAULT_RELAX_ITERATIONS: usize = 60;

#[derive(Error, Debug)]
pub enum BoundaryFillError {
  #[error("掩码尺寸 {mask:?} 与图像尺寸 {image:?} 不一致")]
  DimensionMismatch { image: (u32, u32), mask: (u32, u32) },
  #[error("掩码覆盖了整幅图像，没有可参考的像素")]
  NoKnownPixels,
}

/// 逐层剥洋葱式填充：每一层只使用已知像素的距离加权平均。
/// NavierStokes 方法在此基础上追加拉普拉斯松弛，使内部更平滑
#[derive(Debug, Clone)]
pub struct BoundaryFillInpainter {
  relax_iterations: usize,
}

impl Default for BoundaryFillInpainter {
  fn default() -> Self {
    Self {
      relax_iterations: DEFAULT_RELAX_ITERATIONS,
    }
  }
}

impl BoundaryFillInpainter {
  pub fn relax_iterations(mut self, iterations: usize) -> Self {
    self.relax_iterations = iterations;
    self
  }
}

const NEIGHBORS_8: [(i64, i64); 8] = [
  (-1, -1),
  (0, -1),
  (1, -1),
  (-1, 0),
  (1, 0),
  (-1, 1),
  (0, 1),
  (1, 1),
];

impl Inpainter for BoundaryFillInpainter {
  type Error = BoundaryFillError;

  fn inpaint(
    &self,
    image: &RgbImage,
    mask: &Mask,
    radius: u32,
    method: InpaintMethod,
  ) -> Result<RgbImage, Self::Error> {
    let (width, height) = image.dimensions();
    if mask.dimensions() != (width, height) {
      return Err(BoundaryFillError::DimensionMismatch {
        image: (width, height),
        mask: mask.dimensions(),
      });
    }
    if mask.area() == 0 {
      return Ok(image.clone());
    }
    if mask.area() as u64 == width as u64 * height as u64 {
      return Err(BoundaryFillError::NoKnownPixels);
    }

    let (w, h) = (width as i64, height as i64);
    let idx = |x: i64, y: i64| (y * w + x) as usize;
    let mut known: Vec<bool> = (0..h)
      .flat_map(|y| (0..w).map(move |x| (x, y)))
      .map(|(x, y)| !mask.get(x as u32, y as u32))
      .collect();
    let mut values: Vec<[f32; 3]> = image
      .pixels()
      .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
      .collect();
    let radius = radius.max(1) as i64;

    let mut layers = 0usize;
    loop {
      let frontier: Vec<(i64, i64)> = mask
        .iter_on()
        .map(|(x, y)| (x as i64, y as i64))
        .filter(|&(x, y)| !known[idx(x, y)])
        .filter(|&(x, y)| {
          NEIGHBORS_8.iter().any(|&(dx, dy)| {
            let (nx, ny) = (x + dx, y + dy);
            nx >= 0 && ny >= 0 && nx < w && ny < h && known[idx(nx, ny)]
          })
        })
        .collect();
      if frontier.is_empty() {
        break;
      }

      let filled: Vec<((i64, i64), [f32; 3])> = frontier
        .iter()
        .map(|&(x, y)| {
          let mut sum = [0.0f32; 3];
          let mut weight = 0.0f32;
          for ny in (y - radius).max(0)..=(y + radius).min(h - 1) {
            for nx in (x - radius).max(0)..=(x + radius).min(w - 1) {
              if !known[idx(nx, ny)] {
                continue;
              }
              let d2 = ((nx - x) * (nx - x) + (ny - y) * (ny - y)) as f32;
              if d2 > (radius * radius) as f32 {
                continue;
              }
              let wgt = 1.0 / (d2 + 1e-3);
              let v = values[idx(nx, ny)];
              for c in 0..3 {
                sum[c] += v[c] * wgt;
              }
              weight += wgt;
            }
          }
          let value = if weight > 0.0 {
            sum.map(|s| s / weight)
          } else {
            [0.0; 3]
          };
          ((x, y), value)
        })
        .collect();

      for ((x, y), value) in filled {
        values[idx(x, y)] = value;
        known[idx(x, y)] = true;
      }
      layers += 1;
    }
    debug!("边界填充完成，共 {} 层", layers);

    if method == InpaintMethod::NavierStokes {
      let pixels: Vec<(i64, i64)> = mask.iter_on().map(|(x, y)| (x as i64, y as i64)).collect();
      for _ in 0..self.relax_iterations {
        let next: Vec<[f32; 3]> = pixels
          .iter()
          .map(|&(x, y)| {
            let mut sum = [0.0f32; 3];
            let mut count = 0.0f32;
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
              let (nx, ny) = (x + dx, y + dy);
              if nx >= 0 && ny >= 0 && nx < w && ny < h {
                let v = values[idx(nx, ny)];
                for c in 0..3 {
                  sum[c] += v[c];
                }
                count += 1.0;
              }
            }
            sum.map(|s| s / count)
          })
          .collect();
        for (&(x, y), value) in pixels.iter().zip(next) {
          values[idx(x, y)] = value;
        }
      }
    }

    Ok(RgbImage::from_fn(width, height, |x, y| {
      let v = values[idx(x as i64, y as i64)];
      Rgb(v.map(|c| c.round().clamp(0.0, 255.0) as u8))
    }))
  }

  fn name(&self) -> &str {
    "boundary-fill"
  }
}
