// 该文件是 Zhaocha （找茬） 项目的一部分。
// src/model/mask_folder.rs - 从目录读取离线分割结果
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

use std::{collections::HashMap, path::PathBuf};

use image::{Luma, RgbImage};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  mask::ProbabilityMap,
  model::{RawProposal, Segmenter},
};

const CONFIDENCE_FILE: &str = "proposals.json";
const DEFAULT_CONFIDENCE: f32 = 1.0;

#[derive(Error, Debug)]
pub enum MaskFolderError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("置信度文件解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("路径解码错误: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
}

/// 目录中每一张 PNG 视为一个候选掩码（灰度/255 即概率），
/// `proposals.json` 可选地给出 文件名 -> 置信度
pub struct MaskFolderSegmenter {
  directory: PathBuf,
  confidences: HashMap<String, f32>,
}

impl FromUrlWithScheme for MaskFolderSegmenter {
  const SCHEME: &'static str = "masks";
}

impl FromUrl for MaskFolderSegmenter {
  type Error = MaskFolderError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(MaskFolderError::SchemeMismatch(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    let directory = PathBuf::from(urlencoding::decode(url.path())?.into_owned());
    Self::open(directory)
  }
}

impl MaskFolderSegmenter {
  pub fn open(directory: PathBuf) -> Result<Self, MaskFolderError> {
    let confidence_path = directory.join(CONFIDENCE_FILE);
    let confidences = if confidence_path.exists() {
      let data = std::fs::read_to_string(&confidence_path)?;
      serde_json::from_str(&data)?
    } else {
      debug!("未找到 {}, 置信度默认为 {}", CONFIDENCE_FILE, DEFAULT_CONFIDENCE);
      HashMap::new()
    };
    info!("掩码目录: {}", directory.display());
    Ok(Self {
      directory,
      confidences,
    })
  }

  fn mask_files(&self) -> Result<Vec<PathBuf>, MaskFolderError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&self.directory)? {
      let path = entry?.path();
      let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
      if is_png {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }
}

impl Segmenter for MaskFolderSegmenter {
  type Error = MaskFolderError;

  fn segment(&self, _image: &RgbImage) -> Result<Vec<RawProposal>, Self::Error> {
    let mut proposals = Vec::new();
    for path in self.mask_files()? {
      let gray = image::open(&path)?.to_luma8();
      let (width, height) = gray.dimensions();
      let mask = ProbabilityMap::from_fn(width, height, |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32 / 255.0])
      });

      let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
      let confidence = match self.confidences.get(&name) {
        Some(c) => *c,
        None => {
          if !self.confidences.is_empty() {
            warn!("{} 没有置信度记录，使用默认值", name);
          }
          DEFAULT_CONFIDENCE
        }
      };

      proposals.push(RawProposal {
        mask,
        bbox: [0.0, 0.0, width as f32, height as f32],
        confidence,
      });
    }
    info!("读取到 {} 个候选掩码", proposals.len());
    Ok(proposals)
  }

  fn name(&self) -> &str {
    "mask-folder"
  }
}
