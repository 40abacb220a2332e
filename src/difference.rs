// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/difference.rs - 差异记录与生成结果
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

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{mask::BBox, selection::SelectionTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  Deletion,
  ColorChange,
  Addition,
}

impl ChangeKind {
  pub const ALL: [ChangeKind; 3] = [
    ChangeKind::Deletion,
    ChangeKind::ColorChange,
    ChangeKind::Addition,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ChangeKind::Deletion => "deletion",
      ChangeKind::ColorChange => "color_change",
      ChangeKind::Addition => "addition",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      ChangeKind::Deletion => "删除物体",
      ChangeKind::ColorChange => "改变颜色",
      ChangeKind::Addition => "添加物体",
    }
  }
}

impl std::fmt::Display for ChangeKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 修改后图像中的一处差异，bbox 为修改后的位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
  pub id: usize,
  #[serde(rename = "type")]
  pub kind: ChangeKind,
  pub bbox: BBox,
  pub saliency_score: f32,
  pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityNames {
  pub segmentation: String,
  pub saliency: String,
  pub inpainting: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
  pub difficulty: String,
  /// 各阶段耗时（秒）
  pub processing_times: BTreeMap<String, f64>,
  pub segments_detected: usize,
  pub quality_passing: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub selection_tier: Option<SelectionTier>,
  pub degraded_changes: usize,
  pub skipped_changes: usize,
  pub model_versions: CapabilityNames,
  pub generated_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
  pub original_image: RgbImage,
  pub modified_image: RgbImage,
  pub differences: Vec<Difference>,
  pub metadata: GenerationMetadata,
}

#[derive(Serialize)]
struct MetadataWithDifferences<'a> {
  #[serde(flatten)]
  metadata: &'a GenerationMetadata,
  differences: &'a [Difference],
  total_differences: usize,
}

impl GenerationResult {
  /// 元数据与差异列表合并后的 JSON，供持久化方使用
  pub fn metadata_with_differences(&self) -> serde_json::Value {
    let merged = MetadataWithDifferences {
      metadata: &self.metadata,
      differences: &self.differences,
      total_differences: self.differences.len(),
    };
    serde_json::to_value(merged).unwrap_or(serde_json::Value::Null)
  }
}
