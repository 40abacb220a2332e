#![allow(dead_code)]

pub mod synthetic;

use std::convert::Infallible;

use image::{Luma, RgbImage};
use thiserror::Error;
use zhaocha::{
  mask::Mask,
  model::{RawProposal, SaliencyMap, SaliencyModel, Segmenter},
};

#[derive(Error, Debug)]
#[error("模型不可用")]
pub struct StubError;

/// 直接返回预先给定的掩码
pub struct StubSegmenter {
  pub masks: Vec<Mask>,
}

impl Segmenter for StubSegmenter {
  type Error = Infallible;

  fn segment(&self, _image: &RgbImage) -> Result<Vec<RawProposal>, Infallible> {
    Ok(
      self
        .masks
        .iter()
        .map(|mask| RawProposal::from_mask(mask, 0.9))
        .collect(),
    )
  }

  fn name(&self) -> &str {
    "stub-segmenter"
  }
}

pub struct FailingSegmenter;

impl Segmenter for FailingSegmenter {
  type Error = StubError;

  fn segment(&self, _image: &RgbImage) -> Result<Vec<RawProposal>, StubError> {
    Err(StubError)
  }

  fn name(&self) -> &str {
    "failing-segmenter"
  }
}

/// 常数注意力图；`size` 可用来制造尺寸不符
pub struct FlatSaliency {
  pub value: f32,
  pub size: Option<(u32, u32)>,
}

impl FlatSaliency {
  pub fn new(value: f32) -> Self {
    Self { value, size: None }
  }
}

impl SaliencyModel for FlatSaliency {
  type Error = Infallible;

  fn compute_map(&self, image: &RgbImage) -> Result<SaliencyMap, Infallible> {
    let (width, height) = self.size.unwrap_or(image.dimensions());
    Ok(SaliencyMap::from_pixel(width, height, Luma([self.value])))
  }

  fn name(&self) -> &str {
    "flat-saliency"
  }
}
