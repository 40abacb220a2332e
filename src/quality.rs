// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/quality.rs - 分割区域与修改结果的质量评估
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

pub mod metrics;
pub mod shape;

use image::{RgbImage, imageops::grayscale};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
  difference::ChangeKind,
  mask::{BBox, Mask},
};

const MIN_UNMASKED_FOR_SSIM: u32 = 100;

/// 一次质量评估的结论
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
  pub pass: bool,
  pub score: f32,
  pub reason: String,
}

impl QualityReport {
  fn accept(score: f32) -> Self {
    Self {
      pass: true,
      score,
      reason: "合格".to_string(),
    }
  }

  fn reject(score: f32, reason: impl Into<String>) -> Self {
    Self {
      pass: false,
      score,
      reason: reason.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
  pub min_edge_smoothness: f32,
  pub min_mask_completeness: f32,
  pub max_shape_complexity: f32,
  pub min_contour_area: f64,
  pub min_deletion_ssim: f32,
  pub min_color_change_ssim: f32,
  pub max_edge_artifacts: f32,
  pub min_color_naturalness: f32,
  pub min_addition_continuity: f32,
}

impl Default for QualityThresholds {
  fn default() -> Self {
    Self {
      min_edge_smoothness: 0.6,
      min_mask_completeness: 0.85,
      max_shape_complexity: 0.8,
      min_contour_area: 100.0,
      min_deletion_ssim: 0.5,
      min_color_change_ssim: 0.7,
      max_edge_artifacts: 0.3,
      min_color_naturalness: 0.5,
      min_addition_continuity: 0.6,
    }
  }
}

/// 无状态评估器，只持有阈值，可跨线程共享
#[derive(Debug, Clone, Default)]
pub struct QualityEvaluator {
  thresholds: QualityThresholds,
}

impl QualityEvaluator {
  pub fn new(thresholds: QualityThresholds) -> Self {
    Self { thresholds }
  }

  pub fn thresholds(&self) -> &QualityThresholds {
    &self.thresholds
  }

  /// 评估分割掩码是否适合修改，`mask` 为全图掩码，先按 `bbox` 裁剪
  pub fn evaluate_segment_quality(&self, mask: &Mask, bbox: &BBox) -> QualityReport {
    let t = &self.thresholds;
    let local = mask.crop(bbox);

    let edge = shape::edge_smoothness(&local);
    if edge < t.min_edge_smoothness {
      return QualityReport::reject(edge, format!("边缘不平滑 (score: {:.2})", edge));
    }

    let completeness = shape::mask_completeness(local.area(), bbox);
    if completeness < t.min_mask_completeness {
      return QualityReport::reject(
        completeness,
        format!("掩码不完整 (score: {:.2})", completeness),
      );
    }

    let complexity = shape::shape_complexity(&local);
    if complexity > t.max_shape_complexity {
      return QualityReport::reject(1.0 - complexity, "形状过于复杂");
    }

    if shape::largest_contour_area(&local) <= t.min_contour_area {
      return QualityReport::reject(0.0, "没有有效轮廓");
    }

    let score = (edge + completeness + (1.0 - complexity)) / 3.0;
    trace!(
      "分割质量: edge={:.3} completeness={:.3} complexity={:.3}",
      edge, completeness, complexity
    );
    QualityReport::accept(score)
  }

  /// 评估局部修改结果，三者尺寸一致
  pub fn evaluate_modification_quality(
    &self,
    original: &RgbImage,
    modified: &RgbImage,
    mask: &Mask,
    kind: ChangeKind,
  ) -> QualityReport {
    let t = &self.thresholds;
    let mut scores = Vec::with_capacity(4);

    let (width, height) = mask.dimensions();
    let unmasked = width * height - mask.area();
    if unmasked > MIN_UNMASKED_FOR_SSIM {
      let score = metrics::ssim(&grayscale(original), &grayscale(modified));
      match kind {
        ChangeKind::Deletion if score < t.min_deletion_ssim => {
          return QualityReport::reject(score, "删除不自然 (SSIM 过低)");
        }
        ChangeKind::ColorChange if score < t.min_color_change_ssim => {
          return QualityReport::reject(score, "结构变化过大");
        }
        _ => {}
      }
      scores.push(score);
    }

    let artifacts = metrics::edge_artifact_score(original, modified, mask);
    if artifacts > t.max_edge_artifacts {
      return QualityReport::reject(
        1.0 - artifacts,
        format!("边缘存在伪影 (score: {:.2})", artifacts),
      );
    }
    scores.push(1.0 - artifacts);

    match kind {
      ChangeKind::ColorChange => {
        let naturalness = metrics::color_naturalness(modified, mask);
        if naturalness < t.min_color_naturalness {
          return QualityReport::reject(naturalness, "颜色不自然");
        }
        scores.push(naturalness);
      }
      ChangeKind::Addition => {
        let continuity = metrics::addition_continuity(modified, mask);
        if continuity < t.min_addition_continuity {
          return QualityReport::reject(continuity, "添加不自然");
        }
        scores.push(continuity);
      }
      ChangeKind::Deletion => {}
    }

    let score = scores.iter().sum::<f32>() / scores.len() as f32;
    QualityReport::accept(score)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn disc(size: u32, cx: f32, cy: f32, radius: f32) -> Mask {
    Mask::from_fn(size, size, |x, y| {
      let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
      dx * dx + dy * dy <= radius * radius
    })
  }

  #[test]
  fn tiny_segment_has_no_valid_contour() {
    let evaluator = QualityEvaluator::default();
    let mask = disc(64, 32.0, 32.0, 4.0);
    let bbox = mask.bbox().unwrap();
    let report = evaluator.evaluate_segment_quality(&mask, &bbox);
    assert!(!report.pass);
  }

  #[test]
  fn filled_rectangle_is_incomplete() {
    let evaluator = QualityEvaluator::default();
    let mask = Mask::from_fn(64, 64, |x, y| (10..50).contains(&x) && (10..50).contains(&y));
    let bbox = mask.bbox().unwrap();
    let report = evaluator.evaluate_segment_quality(&mask, &bbox);
    assert!(!report.pass);
    assert_eq!(report.score, 0.0);
  }

  #[test]
  fn unchanged_region_passes_deletion_check() {
    let evaluator = QualityEvaluator::default();
    let image = RgbImage::from_fn(40, 40, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 90]));
    let mask = disc(40, 20.0, 20.0, 8.0);
    let report =
      evaluator.evaluate_modification_quality(&image, &image, &mask, ChangeKind::Deletion);
    assert!(report.pass, "{:?}", report);
    assert!((report.score - 1.0).abs() < 1e-4);
  }

  #[test]
  fn harsh_paste_is_rejected() {
    let evaluator = QualityEvaluator::default();
    let original = RgbImage::from_pixel(40, 40, Rgb([60, 60, 60]));
    let mask = disc(40, 20.0, 20.0, 8.0);
    let mut modified = original.clone();
    for (x, y) in mask.iter_on() {
      modified.put_pixel(x, y, Rgb([255, 255, 255]));
    }
    let report =
      evaluator.evaluate_modification_quality(&original, &modified, &mask, ChangeKind::Addition);
    assert!(!report.pass);
  }

  #[test]
  fn evaluation_is_repeatable() {
    let evaluator = QualityEvaluator::default();
    let mask = disc(64, 30.0, 34.0, 14.0);
    let bbox = mask.bbox().unwrap();
    let first = evaluator.evaluate_segment_quality(&mask, &bbox);
    let second = evaluator.evaluate_segment_quality(&mask, &bbox);
    assert_eq!(first, second);

    let original = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 3) as u8, (y * 3) as u8, 120]));
    let mut modified = original.clone();
    for (x, y) in mask.iter_on() {
      let p = original.get_pixel(x, y);
      modified.put_pixel(x, y, Rgb([p[2], p[0], p[1]]));
    }
    for kind in ChangeKind::ALL {
      let first = evaluator.evaluate_modification_quality(&original, &modified, &mask, kind);
      let second = evaluator.evaluate_modification_quality(&original, &modified, &mask, kind);
      assert_eq!(first, second, "{}", kind);
      assert_eq!(first.reason, second.reason);
    }
    // 输入未被修改
    assert_eq!(modified.get_pixel(0, 0), original.get_pixel(0, 0));
  }

  #[test]
  fn thresholds_fill_missing_fields() {
    let thresholds: QualityThresholds =
      serde_json::from_str(r#"{"min_edge_smoothness": 0.4}"#).unwrap();
    assert_eq!(thresholds.min_edge_smoothness, 0.4);
    assert_eq!(thresholds.min_mask_completeness, 0.85);
  }
}
