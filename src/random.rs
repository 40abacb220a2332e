// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/random.rs - 可注入的随机源
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

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// 生成流程中所有随机抽取都经过此接口，便于测试注入固定序列
pub trait RandomSource {
  /// 闭区间 [lo, hi] 内的整数
  fn integer(&mut self, lo: i64, hi: i64) -> i64;

  /// [0, len) 内的下标，len 必须大于 0
  fn index(&mut self, len: usize) -> usize {
    self.integer(0, len as i64 - 1) as usize
  }

  /// 从 [0, len) 中不放回地抽取 n 个下标
  fn sample_indices(&mut self, len: usize, n: usize) -> Vec<usize> {
    let n = n.min(len);
    let mut pool: Vec<usize> = (0..len).collect();
    // 部分 Fisher-Yates
    for i in 0..n {
      let j = i + self.index(len - i);
      pool.swap(i, j);
    }
    pool.truncate(n);
    pool
  }
}

pub trait RandomSourceExt: RandomSource {
  fn choice<'a, T>(&mut self, options: &'a [T]) -> Option<&'a T> {
    if options.is_empty() {
      None
    } else {
      options.get(self.index(options.len()))
    }
  }

  fn sample_without_replacement<T: Clone>(&mut self, pool: &[T], n: usize) -> Vec<T> {
    self
      .sample_indices(pool.len(), n)
      .into_iter()
      .map(|i| pool[i].clone())
      .collect()
  }
}

impl<R: RandomSource + ?Sized> RandomSourceExt for R {}

/// 生产环境使用的可复现随机源
#[derive(Debug, Clone)]
pub struct SeededRandom {
  rng: Pcg32,
}

impl SeededRandom {
  pub fn new(seed: u64) -> Self {
    Self {
      rng: Pcg32::seed_from_u64(seed),
    }
  }

  /// 以当前时间为种子
  pub fn from_time() -> Self {
    let seed = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    Self::new(seed)
  }
}

impl RandomSource for SeededRandom {
  fn integer(&mut self, lo: i64, hi: i64) -> i64 {
    if hi <= lo {
      return lo;
    }
    self.rng.random_range(lo..=hi)
  }

  fn sample_indices(&mut self, len: usize, n: usize) -> Vec<usize> {
    rand::seq::index::sample(&mut self.rng, len, n.min(len)).into_vec()
  }
}

/// 按给定序列循环输出的随机源，每个值映射到请求的区间内
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
  values: Vec<i64>,
  cursor: usize,
}

impl ScriptedRandom {
  pub fn new(values: Vec<i64>) -> Self {
    Self { values, cursor: 0 }
  }

  /// 永远取区间下界
  pub fn lowest() -> Self {
    Self::new(vec![0])
  }
}

impl RandomSource for ScriptedRandom {
  fn integer(&mut self, lo: i64, hi: i64) -> i64 {
    if hi <= lo || self.values.is_empty() {
      return lo;
    }
    let value = self.values[self.cursor % self.values.len()];
    self.cursor += 1;
    lo + value.rem_euclid(hi - lo + 1)
  }
}
