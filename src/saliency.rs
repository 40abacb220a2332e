// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/saliency.rs - 显著性评分与排序
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

use tracing::{debug, warn};

use crate::{mask::Mask, model::SaliencyMap, segment::Segment};

/// 某个分割区域的显著性评分
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaliencyRecord {
  pub segment_id: usize,
  pub score: f32,
}

/// 若注意力图超出 [0, 1]，做最小-最大归一化
pub fn normalize_map(map: &mut SaliencyMap) {
  let (lo, hi) = map
    .pixels()
    .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
  if lo >= 0.0 && hi <= 1.0 {
    return;
  }
  warn!("注意力图范围 [{:.3}, {:.3}] 超出 [0, 1]，重新归一化", lo, hi);
  let span = hi - lo;
  for p in map.pixels_mut() {
    p[0] = if span > 0.0 { (p[0] - lo) / span } else { 0.0 };
  }
}

/// 掩码覆盖区域的平均注意力，空掩码为 0
pub fn score_mask(map: &SaliencyMap, mask: &Mask) -> f32 {
  let mut sum = 0.0f64;
  let mut count = 0u64;
  for (x, y) in mask.iter_on() {
    sum += map.get_pixel(x, y)[0] as f64;
    count += 1;
  }
  if count == 0 {
    0.0
  } else {
    (sum / count as f64) as f32
  }
}

/// 为所有区域评分，并按显著性升序返回（最不显眼的在前）
pub fn rank_segments(map: &SaliencyMap, segments: &[Segment]) -> Vec<SaliencyRecord> {
  let mut records: Vec<SaliencyRecord> = segments
    .iter()
    .map(|segment| SaliencyRecord {
      segment_id: segment.id,
      score: score_mask(map, &segment.mask),
    })
    .collect();
  records.sort_by(|a, b| a.score.total_cmp(&b.score));
  debug!("显著性排序: {:?}", records);
  records
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  fn segment(id: usize, x1: u32) -> Segment {
    let mask = Mask::from_fn(40, 40, |x, y| x >= x1 && x < x1 + 10 && y < 10);
    Segment {
      id,
      bbox: mask.bbox().unwrap(),
      area: mask.area(),
      mask,
      confidence: 1.0,
    }
  }

  #[test]
  fn ranking_is_ascending() {
    // 注意力随 x 增大
    let map = SaliencyMap::from_fn(40, 40, |x, _| Luma([x as f32 / 39.0]));
    let segments = vec![segment(0, 25), segment(1, 0), segment(2, 12)];
    let ranked = rank_segments(&map, &segments);
    let order: Vec<usize> = ranked.iter().map(|r| r.segment_id).collect();
    assert_eq!(order, vec![1, 2, 0]);
    assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
  }

  #[test]
  fn empty_mask_scores_zero() {
    let map = SaliencyMap::from_pixel(8, 8, Luma([0.7]));
    assert_eq!(score_mask(&map, &Mask::new(8, 8)), 0.0);
  }

  #[test]
  fn out_of_range_map_is_normalized() {
    let mut map = SaliencyMap::from_fn(4, 1, |x, _| Luma([x as f32 * 10.0]));
    normalize_map(&mut map);
    assert_eq!(map.get_pixel(0, 0)[0], 0.0);
    assert_eq!(map.get_pixel(3, 0)[0], 1.0);
  }
}
