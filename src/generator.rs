// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/generator.rs - 差异生成主流程
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

pub mod attempt;

use std::{
  collections::BTreeMap,
  time::{Duration, Instant},
};

use chrono::Utc;
use image::{RgbImage, imageops::crop_imm};
use thiserror::Error;
use tracing::{debug, info, warn};

use self::attempt::{AttemptMachine, Outcome, Step};
use crate::{
  config::{ConfigError, GeneratorConfig},
  difference::{CapabilityNames, ChangeKind, Difference, GenerationMetadata, GenerationResult},
  mask::{BBoxExt, pad_bbox},
  model::{Inpainter, SaliencyModel, Segmenter},
  modify::{Proposal, choose_change_kind, delete_object, duplicate_object, is_large, recolor},
  quality::{QualityEvaluator, QualityReport},
  random::RandomSource,
  saliency::{normalize_map, rank_segments},
  segment::{Segment, extract_segments},
  selection::{Candidate, select_segments},
};

const MIN_SEGMENTS: usize = 2;
const REGION_PADDING: u32 = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 进度回调：百分比与阶段说明
pub type Progress<'a> = &'a dyn Fn(u8, &str);

#[derive(Error, Debug)]
pub enum GenerateError {
  #[error("未知难度: {0}")]
  UnknownDifficulty(String),
  #[error("分割模型 {name} 执行失败: {source}")]
  Segmentation { name: String, source: BoxError },
  #[error("显著性模型 {name} 执行失败: {source}")]
  Saliency { name: String, source: BoxError },
  #[error("图像修复 {name} 执行失败: {source}")]
  Inpaint { name: String, source: BoxError },
  #[error("{stage} 输出尺寸 {actual:?} 与输入尺寸 {expected:?} 不一致")]
  DimensionMismatch {
    stage: &'static str,
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

/// 被接受的一次修改
struct Applied {
  proposal: Proposal,
  kind: ChangeKind,
  degraded: bool,
}

fn notify(progress: Option<Progress>, percent: u8, step: &str) {
  debug!("进度 {}%: {}", percent, step);
  if let Some(callback) = progress {
    callback(percent, step);
  }
}

fn record(timings: &mut BTreeMap<String, f64>, stage: &str, elapsed: Duration) {
  let seconds = (elapsed.as_secs_f64() * 100.0).round() / 100.0;
  timings.insert(stage.to_string(), seconds);
}

/// 找茬图片生成器，持有三种外部能力与不可变配置
pub struct DifferenceGenerator<S, M, P> {
  segmenter: S,
  saliency: M,
  inpainter: P,
  config: GeneratorConfig,
  evaluator: QualityEvaluator,
}

impl<S, M, P> DifferenceGenerator<S, M, P>
where
  S: Segmenter,
  M: SaliencyModel,
  P: Inpainter,
{
  pub fn new(
    segmenter: S,
    saliency: M,
    inpainter: P,
    config: GeneratorConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    let evaluator = QualityEvaluator::new(config.quality.clone());
    Ok(Self {
      segmenter,
      saliency,
      inpainter,
      config,
      evaluator,
    })
  }

  pub fn config(&self) -> &GeneratorConfig {
    &self.config
  }

  pub fn capability_names(&self) -> CapabilityNames {
    CapabilityNames {
      segmentation: self.segmenter.name().to_string(),
      saliency: self.saliency.name().to_string(),
      inpainting: self.inpainter.name().to_string(),
    }
  }

  /// 生成一组找茬图片。外部能力失败与未知难度为致命错误，
  /// 有效区域不足时返回空差异列表并在元数据中说明
  pub fn generate(
    &self,
    image: &RgbImage,
    difficulty: &str,
    rng: &mut dyn RandomSource,
    progress: Option<Progress>,
  ) -> Result<GenerationResult, GenerateError> {
    let profile = *self
      .config
      .difficulty(difficulty)
      .ok_or_else(|| GenerateError::UnknownDifficulty(difficulty.to_string()))?;
    let (width, height) = image.dimensions();
    let mut timings = BTreeMap::new();
    let mut metadata = GenerationMetadata {
      difficulty: difficulty.to_string(),
      model_versions: self.capability_names(),
      ..Default::default()
    };

    notify(progress, 5, "开始分割...");
    let started = Instant::now();
    let proposals = self
      .segmenter
      .segment(image)
      .map_err(|e| GenerateError::Segmentation {
        name: self.segmenter.name().to_string(),
        source: Box::new(e),
      })?;
    let segments = extract_segments(&proposals, width, height, self.config.area_bounds());
    let elapsed = started.elapsed();
    record(&mut timings, "segmentation", elapsed);
    metadata.segments_detected = segments.len();
    info!(
      "分割完成: {} 个候选，{} 个有效区域，耗时 {:.2?}",
      proposals.len(),
      segments.len(),
      elapsed
    );
    notify(
      progress,
      40,
      &format!("分割完成，检测到 {} 个物体", segments.len()),
    );

    if segments.len() < MIN_SEGMENTS {
      warn!("有效区域只有 {} 个，无法生成差异", segments.len());
      metadata.error = Some("检测到的物体过少".to_string());
      metadata.processing_times = timings;
      metadata.generated_at = Some(Utc::now());
      notify(progress, 100, "完成");
      return Ok(GenerationResult {
        original_image: image.clone(),
        modified_image: image.clone(),
        differences: vec![],
        metadata,
      });
    }

    let started = Instant::now();
    let mut map = self
      .saliency
      .compute_map(image)
      .map_err(|e| GenerateError::Saliency {
        name: self.saliency.name().to_string(),
        source: Box::new(e),
      })?;
    if map.dimensions() != (width, height) {
      return Err(GenerateError::DimensionMismatch {
        stage: "显著性图",
        expected: (width, height),
        actual: map.dimensions(),
      });
    }
    normalize_map(&mut map);
    let ranked = rank_segments(&map, &segments);
    let elapsed = started.elapsed();
    record(&mut timings, "saliency", elapsed);
    info!("显著性分析完成，耗时 {:.2?}", elapsed);
    notify(progress, 50, "显著性分析完成");

    let started = Instant::now();
    let reports: Vec<QualityReport> = segments
      .iter()
      .map(|s| self.evaluator.evaluate_segment_quality(&s.mask, &s.bbox))
      .collect();
    metadata.quality_passing = reports.iter().filter(|r| r.pass).count();
    record(&mut timings, "quality", started.elapsed());
    debug!(
      "质量合格区域 {}/{}",
      metadata.quality_passing,
      segments.len()
    );

    let candidates: Vec<Candidate> = ranked
      .iter()
      .filter_map(|record| {
        let index = segments.iter().position(|s| s.id == record.segment_id)?;
        Some(Candidate {
          segment: &segments[index],
          saliency: record.score,
          quality: &reports[index],
        })
      })
      .collect();
    let selection = select_segments(&candidates, &profile, rng);
    metadata.selection_tier = Some(selection.tier);
    let total = selection.chosen.len();
    notify(progress, 55, &format!("将修改 {} 个物体", total));

    let started = Instant::now();
    let mut modified = image.clone();
    let mut differences = Vec::with_capacity(total);
    for (i, candidate) in selection.chosen.iter().enumerate() {
      let kind = choose_change_kind(candidate.segment, rng);
      let percent = 55 + (i * 35 / total.max(1)) as u8;
      notify(
        progress,
        percent,
        &format!("应用修改 ({}/{}): {}", i + 1, total, kind.description()),
      );

      match self.modify_segment(&modified, candidate.segment, kind, rng)? {
        Some(applied) => {
          if applied.degraded {
            metadata.degraded_changes += 1;
          }
          differences.push(Difference {
            id: differences.len() + 1,
            kind: applied.kind,
            bbox: applied.proposal.bbox,
            saliency_score: candidate.saliency,
            description: applied.kind.description().to_string(),
          });
          modified = applied.proposal.image;
        }
        None => metadata.skipped_changes += 1,
      }
    }
    let elapsed = started.elapsed();
    record(&mut timings, "changes", elapsed);
    info!(
      "修改完成: {} 处差异，降级 {}，跳过 {}，耗时 {:.2?}",
      differences.len(),
      metadata.degraded_changes,
      metadata.skipped_changes,
      elapsed
    );

    notify(progress, 95, "生成元数据...");
    let sum: f64 = timings.values().sum();
    timings.insert("total".to_string(), sum);
    metadata.processing_times = timings;
    metadata.generated_at = Some(Utc::now());
    notify(progress, 100, "完成");

    Ok(GenerationResult {
      original_image: image.clone(),
      modified_image: modified,
      differences,
      metadata,
    })
  }

  /// 单个区域的尝试循环，返回 `None` 表示跳过。
  /// 最近一次产生的结果一直保留，最后一次尝试没有结果时仍可降级采用
  fn modify_segment(
    &self,
    image: &RgbImage,
    segment: &Segment,
    kind: ChangeKind,
    rng: &mut dyn RandomSource,
  ) -> Result<Option<Applied>, GenerateError> {
    let mut machine = AttemptMachine::new(kind, is_large(segment), self.config.max_attempts);
    let mut latest: Option<(Proposal, ChangeKind)> = None;
    loop {
      let kind = machine.kind();
      let outcome = match self.propose(image, segment, kind, rng)? {
        None => Outcome::NoProposal,
        Some(proposal) => {
          let report = self.evaluate(image, &proposal, kind);
          debug!(
            "区域 {} 第 {} 次尝试 {}: {} ({:.2})",
            segment.id,
            machine.attempt(),
            kind,
            report.reason,
            report.score
          );
          latest = Some((proposal, kind));
          if report.pass {
            Outcome::Passed
          } else {
            Outcome::Rejected
          }
        }
      };

      match machine.advance(outcome, rng) {
        Step::Accept => {
          return Ok(latest.map(|(proposal, kind)| Applied {
            proposal,
            kind,
            degraded: false,
          }));
        }
        Step::ForceAccept => {
          let Some((proposal, kind)) = latest else {
            return Ok(None);
          };
          warn!(
            "区域 {} 的 {} 修改未通过质量检查，尝试次数已用尽，仍然采用",
            segment.id, kind
          );
          return Ok(Some(Applied {
            proposal,
            kind,
            degraded: true,
          }));
        }
        Step::Retry(next) => {
          debug!("区域 {} 改用 {} 重试", segment.id, next);
        }
        Step::Skip => {
          warn!("区域 {} 没有可用的修改结果，跳过", segment.id);
          return Ok(None);
        }
      }
    }
  }

  fn propose(
    &self,
    image: &RgbImage,
    segment: &Segment,
    kind: ChangeKind,
    rng: &mut dyn RandomSource,
  ) -> Result<Option<Proposal>, GenerateError> {
    let proposal = match kind {
      ChangeKind::Deletion => {
        let proposal = delete_object(
          image,
          &segment.mask,
          &self.inpainter,
          self.config.inpaint_radius,
          &self.config.inpaint_strategy,
        )
        .map_err(|e| GenerateError::Inpaint {
          name: self.inpainter.name().to_string(),
          source: Box::new(e),
        })?;
        if proposal.image.dimensions() != image.dimensions() {
          return Err(GenerateError::DimensionMismatch {
            stage: "图像修复",
            expected: image.dimensions(),
            actual: proposal.image.dimensions(),
          });
        }
        Some(proposal)
      }
      ChangeKind::ColorChange => Some(recolor(image, &segment.mask, self.config.hue_mode, rng)),
      ChangeKind::Addition => duplicate_object(image, segment, &self.config.placement(), rng),
    };
    Ok(proposal)
  }

  /// 在差异周围的局部区域内比较修改前后
  fn evaluate(&self, before: &RgbImage, proposal: &Proposal, kind: ChangeKind) -> QualityReport {
    let (width, height) = before.dimensions();
    let region = pad_bbox(&proposal.bbox, REGION_PADDING, width, height);
    let crop = |img: &RgbImage| {
      crop_imm(img, region[0], region[1], region.width(), region.height()).to_image()
    };
    self.evaluator.evaluate_modification_quality(
      &crop(before),
      &crop(&proposal.image),
      &proposal.mask.crop(&region),
      kind,
    )
  }
}
