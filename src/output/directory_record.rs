// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::info;

use crate::{FromUrl, FromUrlWithScheme, difference::GenerationResult, output::Render};

pub const ORIGINAL_FILE: &str = "original.png";
pub const MODIFIED_FILE: &str = "modified.png";
pub const DIFFERENCES_FILE: &str = "differences.json";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("路径解码错误: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
}

/// `folder:///dir` 写出原图、修改图与差异元数据；
/// `?dated` 时按 年/月/日/时-分-秒-序号 建子目录
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  dated: bool,
  counter: AtomicU16,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(urlencoding::decode(uri.path())?.into_owned()),
      dated: uri.query_pairs().any(|(k, _)| k == "dated"),
      counter: AtomicU16::new(0),
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      dated: false,
      counter: AtomicU16::new(0),
    }
  }

  fn record_directory(&self) -> PathBuf {
    if !self.dated {
      return self.directory.clone();
    }
    let now = Utc::now();
    let id = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
    self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()))
      .join(format!("{}-{:04X}", now.format("%H-%M-%S"), id))
  }

  fn write_record(
    &self,
    directory: &Path,
    result: &GenerationResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    std::fs::create_dir_all(directory)?;
    result.original_image.save(directory.join(ORIGINAL_FILE))?;
    result.modified_image.save(directory.join(MODIFIED_FILE))?;
    let json = serde_json::to_string_pretty(&result.metadata_with_differences())?;
    std::fs::write(directory.join(DIFFERENCES_FILE), json)?;
    Ok(())
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, result: &GenerationResult) -> Result<(), Self::Error> {
    let directory = self.record_directory();
    self.write_record(&directory, result)?;
    info!(
      "已写出 {} 处差异到目录: {}",
      result.differences.len(),
      directory.display()
    );
    Ok(())
  }
}
