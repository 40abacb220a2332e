// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/task.rs - 任务执行
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

use image::RgbImage;
use tracing::info;

use crate::{
  generator::DifferenceGenerator,
  model::{Inpainter, SaliencyModel, Segmenter},
  output::Render,
  random::SeededRandom,
};

pub trait Task<I, G, O>: Sized {
  type Error;
  fn run_task(self, input: I, generator: G, output: O) -> Result<(), Self::Error>;
}

/// 读取一张图像，生成一次，输出一次
#[derive(Debug, Clone)]
pub struct OneShotTask {
  difficulty: String,
  seed: Option<u64>,
}

impl Default for OneShotTask {
  fn default() -> Self {
    Self {
      difficulty: "medium".to_string(),
      seed: None,
    }
  }
}

impl OneShotTask {
  pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
    self.difficulty = difficulty.into();
    self
  }

  pub fn with_seed(mut self, seed: Option<u64>) -> Self {
    self.seed = seed;
    self
  }

  fn random_source(&self) -> SeededRandom {
    match self.seed {
      Some(seed) => SeededRandom::new(seed),
      None => SeededRandom::from_time(),
    }
  }
}

impl<'a, I, S, M, P, O, RE> Task<I, &'a DifferenceGenerator<S, M, P>, O> for OneShotTask
where
  I: Iterator<Item = RgbImage>,
  S: Segmenter,
  M: SaliencyModel,
  P: Inpainter,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    generator: &'a DifferenceGenerator<S, M, P>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!(
      "输入图像 {}x{}，难度 {}",
      image.width(),
      image.height(),
      self.difficulty
    );

    let mut rng = self.random_source();
    let now = std::time::Instant::now();
    let progress = |percent: u8, step: &str| info!("[{:>3}%] {}", percent, step);
    let result = generator.generate(
      &image,
      &self.difficulty,
      &mut rng,
      Some(&progress),
    )?;
    let elapsed = now.elapsed();
    info!(
      "生成完成，{} 处差异，耗时: {:.2?}",
      result.differences.len(),
      elapsed
    );

    output.render_result(&result)?;
    info!("输出完成，总耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}
