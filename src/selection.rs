// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/selection.rs - 按难度挑选待修改区域
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

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  quality::QualityReport,
  random::{RandomSource, RandomSourceExt},
  segment::Segment,
};

/// 难度档位：修改数量与可接受的最高显著性
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
  pub num_changes: usize,
  pub max_saliency: f32,
}

impl DifficultyProfile {
  pub const fn new(num_changes: usize, max_saliency: f32) -> Self {
    Self {
      num_changes,
      max_saliency,
    }
  }
}

/// 实际使用的候选池
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
  /// 质量合格且显著性不超过上限
  UnderCeiling,
  /// 所有质量合格的区域
  QualityPool,
  /// 放弃质量过滤，使用全部区域
  FullPool,
}

/// 分割区域与其显著性、质量记录的联合视图
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
  pub segment: &'a Segment,
  pub saliency: f32,
  pub quality: &'a QualityReport,
}

#[derive(Debug, Clone)]
pub struct Selection<'a> {
  pub chosen: Vec<Candidate<'a>>,
  pub tier: SelectionTier,
}

/// 三级放宽：显著性上限内的合格区域 → 全部合格区域 → 全部区域，
/// 最后从候选池中不放回地均匀抽取。全部区域都合格时停在第二级
pub fn select_segments<'a>(
  candidates: &[Candidate<'a>],
  profile: &DifficultyProfile,
  rng: &mut dyn RandomSource,
) -> Selection<'a> {
  let passing: Vec<Candidate<'a>> = candidates
    .iter()
    .filter(|c| c.quality.pass)
    .copied()
    .collect();
  let under_ceiling: Vec<Candidate<'a>> = passing
    .iter()
    .filter(|c| c.saliency <= profile.max_saliency)
    .copied()
    .collect();

  let (pool, tier) = if under_ceiling.len() >= profile.num_changes {
    (under_ceiling, SelectionTier::UnderCeiling)
  } else if passing.len() >= profile.num_changes || passing.len() == candidates.len() {
    debug!(
      "显著性上限 {:.2} 内仅有 {} 个候选，放宽到全部合格区域",
      profile.max_saliency,
      under_ceiling.len()
    );
    (passing, SelectionTier::QualityPool)
  } else {
    warn!(
      "合格区域仅 {} 个，少于所需 {} 个，放弃质量过滤",
      passing.len(),
      profile.num_changes
    );
    (candidates.to_vec(), SelectionTier::FullPool)
  };

  let chosen = rng.sample_without_replacement(&pool, profile.num_changes);
  debug!(
    "选中区域: {:?}",
    chosen.iter().map(|c| c.segment.id).collect::<Vec<_>>()
  );
  Selection { chosen, tier }
}
