// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/segment.rs - 候选区域提取与过滤
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

use tracing::{debug, info};

use crate::{
  mask::{BBox, BBoxExt, Mask},
  model::RawProposal,
};

const MASK_THRESHOLD: f32 = 0.5;
const MIN_SIDE: u32 = 5;
const MAX_ASPECT_RATIO: f32 = 10.0;
const MIN_COMPACTNESS: f32 = 0.15;
const DEDUP_IOU_THRESHOLD: f32 = 0.7;

/// 过滤后的候选区域。创建后不再修改，各阶段的评分另行记录
#[derive(Debug, Clone)]
pub struct Segment {
  pub id: usize,
  pub mask: Mask,
  pub bbox: BBox,
  pub area: u32,
  pub confidence: f32,
}

impl Segment {
  pub fn width(&self) -> u32 {
    self.bbox.width()
  }

  pub fn height(&self) -> u32 {
    self.bbox.height()
  }

  /// 面积占整幅图像的比例
  pub fn area_ratio(&self) -> f32 {
    let (w, h) = self.mask.dimensions();
    self.area as f32 / (w as f32 * h as f32).max(1.0)
  }
}

/// 面积比例上下限
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaBounds {
  pub min_ratio: f32,
  pub max_ratio: f32,
}

impl AreaBounds {
  /// 像素面积上下限，不取整
  fn pixel_range(&self, width: u32, height: u32) -> (f64, f64) {
    let total = width as f64 * height as f64;
    (total * self.min_ratio as f64, total * self.max_ratio as f64)
  }

  pub fn contains(&self, area: u32, width: u32, height: u32) -> bool {
    let (min_area, max_area) = self.pixel_range(width, height);
    (min_area..=max_area).contains(&(area as f64))
  }
}

/// 形状初筛：过细、过长或过稀疏的区域通常是边缘或伪影
pub fn is_good_shape(mask: &Mask, bbox: &BBox) -> bool {
  let (w, h) = (bbox.width(), bbox.height());
  if w < MIN_SIDE || h < MIN_SIDE {
    return false;
  }

  let aspect = w.max(h) as f32 / w.min(h).max(1) as f32;
  if aspect > MAX_ASPECT_RATIO {
    return false;
  }

  let compactness = mask.area() as f32 / bbox.area().max(1) as f32;
  compactness >= MIN_COMPACTNESS
}

/// 按置信度从高到低贪心保留，与已保留区域 IoU 超过阈值的丢弃
pub fn remove_overlaps(mut segments: Vec<Segment>, iou_threshold: f32) -> Vec<Segment> {
  if segments.len() <= 1 {
    return segments;
  }
  segments.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut keep: Vec<Segment> = Vec::with_capacity(segments.len());
  for segment in segments {
    let overlapping = keep
      .iter()
      .find(|kept| segment.mask.iou(&kept.mask) > iou_threshold);
    match overlapping {
      Some(kept) => debug!(
        "候选区域 (置信度 {:.2}) 与已保留区域 (置信度 {:.2}) 重叠，丢弃",
        segment.confidence, kept.confidence
      ),
      None => keep.push(segment),
    }
  }
  keep
}

/// 将原始候选区域转换为按面积降序、编号连续的分割结果
pub fn extract_segments(
  proposals: &[RawProposal],
  width: u32,
  height: u32,
  bounds: AreaBounds,
) -> Vec<Segment> {
  let mut segments = Vec::new();

  for (index, proposal) in proposals.iter().enumerate() {
    let mask = Mask::from_probability(&proposal.mask, MASK_THRESHOLD).resize_nearest(width, height);

    let area = mask.area();
    if !bounds.contains(area, width, height) {
      let (min_area, max_area) = bounds.pixel_range(width, height);
      debug!(
        "候选区域 {}: 面积 {} 超出范围 [{:.2}, {:.2}]",
        index, area, min_area, max_area
      );
      continue;
    }

    let Some(bbox) = mask.bbox() else {
      debug!("候选区域 {}: 掩码为空", index);
      continue;
    };

    if !is_good_shape(&mask, &bbox) {
      debug!("候选区域 {}: 形状不合格 {:?}", index, bbox);
      continue;
    }

    segments.push(Segment {
      id: segments.len(),
      mask,
      bbox,
      area,
      confidence: proposal.confidence,
    });
  }

  let mut segments = remove_overlaps(segments, DEDUP_IOU_THRESHOLD);
  segments.sort_by(|a, b| b.area.cmp(&a.area));
  for (id, segment) in segments.iter_mut().enumerate() {
    segment.id = id;
  }

  info!(
    "提取完成: {} 个候选区域中保留 {} 个",
    proposals.len(),
    segments.len()
  );
  segments
}
