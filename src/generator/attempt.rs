// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/generator/attempt.rs - 单个区域的修改尝试状态机
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

use crate::{difference::ChangeKind, modify::fallback_kind, random::RandomSource};

/// 一次尝试的评估结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// 没有产生候选结果（例如找不到放置位置）
  NoProposal,
  Rejected,
  Passed,
}

/// 状态机的下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// 以新的修改类型再试一次
  Retry(ChangeKind),
  Accept,
  /// 尝试耗尽，接受最近一次质量不合格的结果
  ForceAccept,
  /// 尝试耗尽且从未产生过候选结果
  Skip,
}

/// Propose → Evaluate → {Accept | Retry | ForceAccept}，尝试次数有上限
#[derive(Debug, Clone)]
pub struct AttemptMachine {
  kind: ChangeKind,
  large: bool,
  attempt: usize,
  max_attempts: usize,
  produced: bool,
}

impl AttemptMachine {
  pub fn new(kind: ChangeKind, large: bool, max_attempts: usize) -> Self {
    Self {
      kind,
      large,
      attempt: 1,
      max_attempts: max_attempts.max(1),
      produced: false,
    }
  }

  /// 当前尝试的修改类型
  pub fn kind(&self) -> ChangeKind {
    self.kind
  }

  /// 从 1 开始的尝试序号
  pub fn attempt(&self) -> usize {
    self.attempt
  }

  fn exhausted(&self) -> bool {
    self.attempt >= self.max_attempts
  }

  /// 之前的尝试是否产生过候选结果
  pub fn produced(&self) -> bool {
    self.produced
  }

  /// 最后一次尝试没有结果时，退回接受更早的被拒结果
  pub fn advance(&mut self, outcome: Outcome, rng: &mut dyn RandomSource) -> Step {
    if outcome != Outcome::NoProposal {
      self.produced = true;
    }
    match outcome {
      Outcome::Passed => Step::Accept,
      Outcome::Rejected if self.exhausted() => Step::ForceAccept,
      Outcome::NoProposal if self.exhausted() && self.produced => Step::ForceAccept,
      Outcome::NoProposal if self.exhausted() => Step::Skip,
      Outcome::Rejected | Outcome::NoProposal => {
        self.attempt += 1;
        self.kind = fallback_kind(self.kind, self.large, rng);
        Step::Retry(self.kind)
      }
    }
  }
}
