// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/quality/shape.rs - 掩码轮廓形状度量
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

use std::f64::consts::PI;

use imageproc::{
  contours::{BorderType, find_contours},
  geometry::{approximate_polygon_dp, arc_length},
  point::Point,
};

use crate::mask::{BBox, BBoxExt, Mask};

const SMOOTH_EPSILON_RATIO: f64 = 0.02;
const COMPLEX_EPSILON_RATIO: f64 = 0.01;

/// 鞋带公式求多边形面积
fn polygon_area(points: &[Point<i32>]) -> f64 {
  if points.len() < 3 {
    return 0.0;
  }
  let twice: i64 = points
    .iter()
    .zip(points.iter().cycle().skip(1))
    .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
    .sum();
  twice.abs() as f64 / 2.0
}

/// 面积最大的外轮廓
pub(crate) fn largest_contour(mask: &Mask) -> Option<Vec<Point<i32>>> {
  find_contours::<i32>(mask.as_gray())
    .into_iter()
    .filter(|c| c.border_type == BorderType::Outer)
    .map(|c| c.points)
    .max_by(|a, b| polygon_area(a).total_cmp(&polygon_area(b)))
}

/// 多边形近似后的顶点数（闭合曲线首尾重复点只计一次）
fn approx_vertex_count(contour: &[Point<i32>], epsilon: f64) -> usize {
  if contour.len() < 3 || epsilon <= 0.0 {
    return contour.len();
  }
  let approx = approximate_polygon_dp(contour, epsilon, true);
  match (approx.first(), approx.last()) {
    (Some(first), Some(last)) if approx.len() > 1 && first == last => approx.len() - 1,
    _ => approx.len(),
  }
}

/// 0.6·圆度 + 0.4·平滑度
pub fn edge_smoothness(mask: &Mask) -> f32 {
  let Some(contour) = largest_contour(mask) else {
    return 0.0;
  };
  let area = polygon_area(&contour);
  if area == 0.0 {
    return 0.0;
  }
  let perimeter = arc_length(&contour, true);

  let circularity = 4.0 * PI * area / (perimeter * perimeter + 1e-6);
  let vertices = approx_vertex_count(&contour, SMOOTH_EPSILON_RATIO * perimeter);
  let smoothness = 1.0 - (vertices as f64 / (perimeter / 10.0)).min(1.0);

  (circularity * 0.6 + smoothness * 0.4) as f32
}

/// 掩码面积占边界框比例：[0.3, 0.95] 满分，过稀疏或过满扣分
pub fn mask_completeness(mask_area: u32, bbox: &BBox) -> f32 {
  let bbox_area = bbox.area();
  if bbox_area == 0 {
    return 0.0;
  }
  let ratio = mask_area as f32 / bbox_area as f32;
  if ratio < 0.3 {
    ratio / 0.3
  } else if ratio > 0.95 {
    (1.0 - (ratio - 0.95) * 20.0).max(0.0)
  } else {
    1.0
  }
}

/// 顶点越多越复杂，取值 [0.2, 1.0]，无轮廓为 1.0
pub fn shape_complexity(mask: &Mask) -> f32 {
  let Some(contour) = largest_contour(mask) else {
    return 1.0;
  };
  let perimeter = arc_length(&contour, true);
  let vertices = approx_vertex_count(&contour, COMPLEX_EPSILON_RATIO * perimeter);
  if vertices <= 8 {
    0.2
  } else if vertices <= 12 {
    0.5
  } else {
    (0.5 + (vertices - 12) as f32 * 0.05).min(1.0)
  }
}

pub fn largest_contour_area(mask: &Mask) -> f64 {
  largest_contour(mask)
    .map(|c| polygon_area(&c))
    .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn disc(size: u32, radius: f32) -> Mask {
    let c = size as f32 / 2.0;
    Mask::from_fn(size, size, |x, y| {
      let (dx, dy) = (x as f32 + 0.5 - c, y as f32 + 0.5 - c);
      dx * dx + dy * dy <= radius * radius
    })
  }

  #[test]
  fn disc_is_smooth() {
    let score = edge_smoothness(&disc(80, 30.0));
    assert!(score >= 0.6, "smoothness = {}", score);
  }

  #[test]
  fn completeness_bands() {
    let bbox = [0, 0, 10, 10];
    assert_eq!(mask_completeness(50, &bbox), 1.0);
    assert!((mask_completeness(15, &bbox) - 0.5).abs() < 1e-6);
    assert_eq!(mask_completeness(100, &bbox), 0.0);
    assert_eq!(mask_completeness(10, &[0, 0, 0, 5]), 0.0);
  }

  #[test]
  fn square_is_simple() {
    let square = Mask::from_fn(40, 40, |x, y| (5..35).contains(&x) && (5..35).contains(&y));
    assert_eq!(shape_complexity(&square), 0.2);
    assert!((largest_contour_area(&square) - 29.0 * 29.0).abs() < 1e-6);
  }

  #[test]
  fn empty_mask_has_no_contour() {
    let empty = Mask::new(16, 16);
    assert_eq!(edge_smoothness(&empty), 0.0);
    assert_eq!(shape_complexity(&empty), 1.0);
    assert_eq!(largest_contour_area(&empty), 0.0);
  }
}
