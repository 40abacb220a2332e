// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/main.rs - 命令行入口
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use zhaocha::{
  DifferenceGenerator, FromUrl, GeneratorConfig,
  input::InputWrapper,
  model::{BoundaryFillInpainter, ContrastSaliency, MaskFolderSegmenter},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// 找茬图片生成器
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///path/photo.jpg?max_size=1024
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 分割掩码目录，例如 masks:///path/masks
  #[arg(long, value_name = "MASKS")]
  pub masks: Url,
  /// 输出，image:///path/out.png 或 folder:///path/record
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 难度档位
  #[arg(long, default_value = "medium", value_name = "LEVEL")]
  pub difficulty: String,
  /// 随机种子，不指定时使用当前时间
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
  /// JSON 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("掩码目录: {}", args.masks);
  info!("输出路径: {}", args.output);

  let config = match &args.config {
    Some(path) => GeneratorConfig::from_json_file(path)?,
    None => GeneratorConfig::default(),
  };

  let input = InputWrapper::from_url(&args.input)?;
  let segmenter = MaskFolderSegmenter::from_url(&args.masks)?;
  let generator = DifferenceGenerator::new(
    segmenter,
    ContrastSaliency::default(),
    BoundaryFillInpainter::default(),
    config,
  )?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask::default()
    .with_difficulty(args.difficulty)
    .with_seed(args.seed)
    .run_task(input, &generator, output)?;

  Ok(())
}
