// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/output/save_image_file.rs - 保存修改后的图像
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, difference::GenerationResult, output::Render};

/// `image:///path/out.png` 保存修改图；`?pair` 时将原图并排拼在左侧
pub struct SaveImageFileOutput {
  path: PathBuf,
  pair: bool,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径解码错误: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: PathBuf::from(urlencoding::decode(uri.path())?.into_owned()),
      pair: uri.query_pairs().any(|(k, _)| k == "pair"),
    })
  }
}

/// 左右拼接两张同尺寸图像
pub fn side_by_side(left: &RgbImage, right: &RgbImage) -> RgbImage {
  let (width, height) = left.dimensions();
  let mut canvas = RgbImage::new(width + right.width(), height.max(right.height()));
  image::imageops::replace(&mut canvas, left, 0, 0);
  image::imageops::replace(&mut canvas, right, width as i64, 0);
  canvas
}

impl SaveImageFileOutput {
  fn save_image(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &GenerationResult) -> Result<(), Self::Error> {
    if result.differences.is_empty() {
      warn!("没有生成任何差异，输出图像与原图相同");
    }
    if self.pair {
      self.save_image(&side_by_side(&result.original_image, &result.modified_image))
    } else {
      self.save_image(&result.modified_image)
    }
  }
}
