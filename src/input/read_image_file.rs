// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(image::ImageError),
  #[error("路径解码错误: {0}")]
  PathDecodeError(std::string::FromUtf8Error),
  #[error("max_size 参数无效: {0}")]
  InvalidMaxSize(String),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

impl From<std::string::FromUtf8Error> for ImageFileInputError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ImageFileInputError::PathDecodeError(err)
  }
}

/// 长边超过 `max_size` 时等比缩小
pub fn limit_size(image: RgbImage, max_size: u32) -> RgbImage {
  let (width, height) = image.dimensions();
  let long_side = width.max(height);
  if max_size == 0 || long_side <= max_size {
    return image;
  }
  let scale = max_size as f64 / long_side as f64;
  let new_width = ((width as f64 * scale).round() as u32).max(1);
  let new_height = ((height as f64 * scale).round() as u32).max(1);
  info!(
    "缩放输入图像 {}x{} -> {}x{}",
    width, height, new_width, new_height
  );
  image::imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

/// 单张图像输入，迭代一次后耗尽
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let max_size = url
      .query_pairs()
      .find(|(k, _)| k == "max_size")
      .map(|(_, v)| {
        v.parse::<u32>()
          .map_err(|_| ImageFileInputError::InvalidMaxSize(v.into_owned()))
      })
      .transpose()?;

    let path = urlencoding::decode(url.path())?.into_owned();
    Self::open(path, max_size)
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>, max_size: Option<u32>) -> Result<Self, ImageFileInputError> {
    let image = ImageReader::open(path.as_ref())?.decode()?.to_rgb8();
    let image = match max_size {
      Some(max_size) => limit_size(image, max_size),
      None => image,
    };
    Ok(Self { image: Some(image) })
  }

  pub fn from_image(image: RgbImage) -> Self {
    Self { image: Some(image) }
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}
