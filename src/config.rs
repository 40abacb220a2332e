// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/config.rs - 生成器配置
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

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
  modify::{HueMode, InpaintStrategy, PlacementParams},
  quality::QualityThresholds,
  segment::AreaBounds,
  selection::DifficultyProfile,
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("面积比例范围无效: min={min}, max={max}，须满足 0 < min < max < 1")]
  InvalidAreaRatio { min: f32, max: f32 },
  #[error("难度 {name} 的修改数量必须大于 0")]
  ZeroChanges { name: String },
  #[error("难度 {name} 的显著性上限 {value} 不在 [0, 1] 内")]
  InvalidSaliency { name: String, value: f32 },
  #[error("未配置任何难度")]
  NoDifficulty,
  #[error("修改尝试次数必须大于 0")]
  ZeroAttempts,
  #[error("修复策略没有任何方法")]
  EmptyInpaintStrategy,
  #[error("读取配置文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("解析配置文件失败: {0}")]
  JsonError(#[from] serde_json::Error),
}

pub fn default_difficulties() -> BTreeMap<String, DifficultyProfile> {
  BTreeMap::from([
    ("easy".to_string(), DifficultyProfile::new(3, 0.7)),
    ("medium".to_string(), DifficultyProfile::new(5, 0.5)),
    ("hard".to_string(), DifficultyProfile::new(8, 0.3)),
  ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
  pub min_area_ratio: f32,
  pub max_area_ratio: f32,
  /// 修复半径下限
  pub inpaint_radius: u32,
  pub inpaint_strategy: InpaintStrategy,
  pub hue_mode: HueMode,
  /// 每个区域最多尝试几次修改
  pub max_attempts: usize,
  pub placement_attempts: usize,
  pub placement_margin: u32,
  pub quality: QualityThresholds,
  pub difficulties: BTreeMap<String, DifficultyProfile>,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      min_area_ratio: 0.002,
      max_area_ratio: 0.15,
      inpaint_radius: 5,
      inpaint_strategy: InpaintStrategy::default(),
      hue_mode: HueMode::default(),
      max_attempts: 2,
      placement_attempts: 30,
      placement_margin: 20,
      quality: QualityThresholds::default(),
      difficulties: default_difficulties(),
    }
  }
}

impl GeneratorConfig {
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&text)?;
    config.validate()?;
    info!("已加载配置文件: {}", path.display());
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let (min, max) = (self.min_area_ratio, self.max_area_ratio);
    if !(min > 0.0 && min < max && max < 1.0) {
      return Err(ConfigError::InvalidAreaRatio { min, max });
    }
    if self.difficulties.is_empty() {
      return Err(ConfigError::NoDifficulty);
    }
    for (name, profile) in &self.difficulties {
      if profile.num_changes == 0 {
        return Err(ConfigError::ZeroChanges { name: name.clone() });
      }
      if !(0.0..=1.0).contains(&profile.max_saliency) {
        return Err(ConfigError::InvalidSaliency {
          name: name.clone(),
          value: profile.max_saliency,
        });
      }
    }
    if self.max_attempts == 0 {
      return Err(ConfigError::ZeroAttempts);
    }
    if self.inpaint_strategy.methods().is_empty() {
      return Err(ConfigError::EmptyInpaintStrategy);
    }
    Ok(())
  }

  pub fn area_bounds(&self) -> AreaBounds {
    AreaBounds {
      min_ratio: self.min_area_ratio,
      max_ratio: self.max_area_ratio,
    }
  }

  pub fn placement(&self) -> PlacementParams {
    PlacementParams {
      attempts: self.placement_attempts,
      margin: self.placement_margin,
    }
  }

  pub fn difficulty(&self, name: &str) -> Option<&DifficultyProfile> {
    self.difficulties.get(name)
  }
}
