// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/modify.rs - 修改操作：删除、改色、添加
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

pub mod blend;
pub mod delete;
pub mod duplicate;
pub mod recolor;

pub use self::delete::{InpaintStrategy, delete_object};
pub use self::duplicate::{PlacementParams, duplicate_object};
pub use self::recolor::{HueMode, recolor};

use image::RgbImage;

use crate::{
  difference::ChangeKind,
  mask::{BBox, Mask},
  random::{RandomSource, RandomSourceExt},
  segment::Segment,
};

/// 面积占比超过该值的区域不做删除，修复效果会明显变差
pub const LARGE_SEGMENT_RATIO: f32 = 0.08;

/// 一次修改的候选结果，尚未写回工作图像
#[derive(Debug, Clone)]
pub struct Proposal {
  pub image: RgbImage,
  /// 实际被改动的区域（全图尺寸）
  pub mask: Mask,
  /// 修改后差异所在位置
  pub bbox: BBox,
}

pub fn is_large(segment: &Segment) -> bool {
  segment.area_ratio() > LARGE_SEGMENT_RATIO
}

/// 大区域在改色与添加之间选，其余在三种操作中均匀选
pub fn choose_change_kind(segment: &Segment, rng: &mut dyn RandomSource) -> ChangeKind {
  let options: &[ChangeKind] = if is_large(segment) {
    &[ChangeKind::ColorChange, ChangeKind::Addition]
  } else {
    &ChangeKind::ALL
  };
  rng
    .choice(options)
    .copied()
    .unwrap_or(ChangeKind::ColorChange)
}

/// 失败后的退路：改色 → 删除或添加（大区域只添加），添加/删除 → 改色
pub fn fallback_kind(kind: ChangeKind, large: bool, rng: &mut dyn RandomSource) -> ChangeKind {
  match kind {
    ChangeKind::ColorChange if large => ChangeKind::Addition,
    ChangeKind::ColorChange => rng
      .choice(&[ChangeKind::Deletion, ChangeKind::Addition])
      .copied()
      .unwrap_or(ChangeKind::Addition),
    ChangeKind::Addition | ChangeKind::Deletion => ChangeKind::ColorChange,
  }
}
