mod common;

use std::cell::RefCell;

use common::{
  FailingSegmenter, FlatSaliency, StubSegmenter,
  synthetic::{five_disc_scene, textured_background},
};
use zhaocha::{
  ChangeKind, DifferenceGenerator, GenerateError, GeneratorConfig, ScriptedRandom, SeededRandom,
  mask::BBoxExt,
  model::{BoundaryFillInpainter, ContrastSaliency},
};

fn generator(
  masks: Vec<zhaocha::mask::Mask>,
) -> DifferenceGenerator<StubSegmenter, FlatSaliency, BoundaryFillInpainter> {
  DifferenceGenerator::new(
    StubSegmenter { masks },
    FlatSaliency::new(0.2),
    BoundaryFillInpainter::default(),
    GeneratorConfig::default(),
  )
  .unwrap()
}

#[test]
fn easy_run_produces_ordered_differences() {
  let (image, masks) = five_disc_scene();
  let generator = generator(masks);
  let mut rng = SeededRandom::new(7);

  let result = generator.generate(&image, "easy", &mut rng, None).unwrap();
  let metadata = &result.metadata;

  assert_eq!(metadata.segments_detected, 5);
  assert!(metadata.selection_tier.is_some());
  assert_eq!(result.differences.len() + metadata.skipped_changes, 3);
  assert!(metadata.degraded_changes <= result.differences.len());
  assert_eq!(result.modified_image.dimensions(), image.dimensions());
  assert_eq!(result.original_image, image);
  for key in ["segmentation", "saliency", "changes", "total"] {
    assert!(metadata.processing_times.contains_key(key), "{}", key);
  }
  assert_eq!(metadata.model_versions.segmentation, "stub-segmenter");
  assert_eq!(metadata.model_versions.inpainting, "boundary-fill");

  for (i, diff) in result.differences.iter().enumerate() {
    assert_eq!(diff.id, i + 1);
    assert_eq!(diff.description, diff.kind.description());
    assert!(diff.bbox[2] <= 200 && diff.bbox[3] <= 200);
    assert!(diff.bbox.area() > 0);
    assert!((diff.saliency_score - 0.2).abs() < 1e-6);

    let changed = (diff.bbox[1]..diff.bbox[3]).any(|y| {
      (diff.bbox[0]..diff.bbox[2])
        .any(|x| result.modified_image.get_pixel(x, y) != image.get_pixel(x, y))
    });
    assert!(changed, "difference {} left its region untouched", diff.id);
  }
}

#[test]
fn same_seed_same_result() {
  let (image, masks) = five_disc_scene();
  let generator = generator(masks);

  let a = generator
    .generate(&image, "medium", &mut SeededRandom::new(42), None)
    .unwrap();
  let b = generator
    .generate(&image, "medium", &mut SeededRandom::new(42), None)
    .unwrap();
  assert_eq!(a.differences, b.differences);
  assert_eq!(a.modified_image, b.modified_image);
}

#[test]
fn scripted_random_drives_the_run() {
  let (image, masks) = five_disc_scene();
  let generator = generator(masks);
  let result = generator
    .generate(&image, "easy", &mut ScriptedRandom::lowest(), None)
    .unwrap();
  // 永远取下界：首选删除，失败只会退到改色
  assert_eq!(result.differences.len(), 3);
  assert!(
    result
      .differences
      .iter()
      .all(|d| d.kind != ChangeKind::Addition)
  );
}

#[test]
fn progress_checkpoints_are_monotonic() {
  let (image, masks) = five_disc_scene();
  let generator = generator(masks);
  let seen = RefCell::new(Vec::new());
  let progress = |percent: u8, _step: &str| seen.borrow_mut().push(percent);

  generator
    .generate(&image, "easy", &mut SeededRandom::new(1), Some(&progress))
    .unwrap();

  let seen = seen.into_inner();
  assert_eq!(seen.first(), Some(&5));
  assert_eq!(seen.last(), Some(&100));
  for checkpoint in [40, 50, 55, 95] {
    assert!(seen.contains(&checkpoint), "missing {}", checkpoint);
  }
  assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
  assert!(seen.iter().filter(|&&p| p > 55 && p < 95).all(|&p| p < 90));
}

#[test]
fn too_few_segments_short_circuits() {
  let (image, mut masks) = five_disc_scene();
  masks.truncate(1);
  let generator = generator(masks);

  let result = generator
    .generate(&image, "hard", &mut SeededRandom::new(3), None)
    .unwrap();
  assert!(result.differences.is_empty());
  assert_eq!(result.modified_image, image);
  assert_eq!(result.metadata.segments_detected, 1);
  assert!(result.metadata.error.is_some());
  assert!(result.metadata.selection_tier.is_none());

  let json = result.metadata_with_differences();
  assert_eq!(json["total_differences"], 0);
  assert!(json["error"].is_string());
}

#[test]
fn unknown_difficulty_is_fatal() {
  let (image, masks) = five_disc_scene();
  let generator = generator(masks);
  let err = generator
    .generate(&image, "impossible", &mut SeededRandom::new(0), None)
    .unwrap_err();
  assert!(matches!(err, GenerateError::UnknownDifficulty(name) if name == "impossible"));
}

#[test]
fn segmenter_failure_propagates() {
  let image = textured_background(64, 64);
  let generator = DifferenceGenerator::new(
    FailingSegmenter,
    ContrastSaliency::default(),
    BoundaryFillInpainter::default(),
    GeneratorConfig::default(),
  )
  .unwrap();
  let err = generator
    .generate(&image, "easy", &mut SeededRandom::new(0), None)
    .unwrap_err();
  assert!(matches!(err, GenerateError::Segmentation { .. }));
}

#[test]
fn saliency_map_of_wrong_size_is_rejected() {
  let (image, masks) = five_disc_scene();
  let generator = DifferenceGenerator::new(
    StubSegmenter { masks },
    FlatSaliency {
      value: 0.5,
      size: Some((10, 10)),
    },
    BoundaryFillInpainter::default(),
    GeneratorConfig::default(),
  )
  .unwrap();
  let err = generator
    .generate(&image, "easy", &mut SeededRandom::new(0), None)
    .unwrap_err();
  assert!(matches!(err, GenerateError::DimensionMismatch { .. }));
}

#[test]
fn invalid_config_is_refused() {
  let (_, masks) = five_disc_scene();
  let config = GeneratorConfig {
    max_attempts: 0,
    ..Default::default()
  };
  let built = DifferenceGenerator::new(
    StubSegmenter { masks },
    FlatSaliency::new(0.1),
    BoundaryFillInpainter::default(),
    config,
  );
  assert!(built.is_err());
}

#[test]
fn real_saliency_model_runs_end_to_end() {
  let (image, masks) = five_disc_scene();
  let generator = DifferenceGenerator::new(
    StubSegmenter { masks },
    ContrastSaliency::default(),
    BoundaryFillInpainter::default(),
    GeneratorConfig::default(),
  )
  .unwrap();
  let result = generator
    .generate(&image, "hard", &mut SeededRandom::new(9), None)
    .unwrap();
  // hard 需要 8 处，但只有 5 个区域
  assert_eq!(result.differences.len() + result.metadata.skipped_changes, 5);
  for diff in &result.differences {
    assert!((0.0..=1.0).contains(&diff.saliency_score));
  }
}

#[test]
fn rejected_change_survives_failed_fallback_placement() {
  use std::collections::BTreeMap;

  use common::synthetic::scene_with_discs;
  use zhaocha::{quality::QualityThresholds, selection::DifficultyProfile};

  // 两个大圆盘：改色总被拒，退到添加又放不下
  let (image, masks) = scene_with_discs(200, 200, &[(50, 50), (150, 150)], 40);
  let config = GeneratorConfig {
    quality: QualityThresholds {
      min_color_naturalness: 1.0,
      ..Default::default()
    },
    difficulties: BTreeMap::from([("pair".to_string(), DifficultyProfile::new(2, 1.0))]),
    ..Default::default()
  };
  let generator = DifferenceGenerator::new(
    StubSegmenter { masks },
    FlatSaliency::new(0.2),
    BoundaryFillInpainter::default(),
    config,
  )
  .unwrap();

  for seed in [0, 1, 4] {
    let result = generator
      .generate(&image, "pair", &mut SeededRandom::new(seed), None)
      .unwrap();
    assert_eq!(result.metadata.segments_detected, 2);
    assert_eq!(result.metadata.skipped_changes, 0, "seed {}", seed);
    assert_eq!(result.differences.len(), 2, "seed {}", seed);
    assert_eq!(result.metadata.degraded_changes, 2);
    assert!(
      result
        .differences
        .iter()
        .all(|d| d.kind == ChangeKind::ColorChange)
    );
  }
}

#[cfg(feature = "directory_record")]
#[test]
fn folder_output_writes_record() {
  use zhaocha::output::{DirectoryRecordOutput, Render};

  let (image, masks) = five_disc_scene();
  let generator = generator(masks);
  let result = generator
    .generate(&image, "easy", &mut SeededRandom::new(11), None)
    .unwrap();

  let directory = std::env::temp_dir().join(format!("zhaocha-record-{}", std::process::id()));
  let output = DirectoryRecordOutput::new(&directory);
  output.render_result(&result).unwrap();

  assert!(directory.join("original.png").exists());
  assert!(directory.join("modified.png").exists());
  let json: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(directory.join("differences.json")).unwrap())
      .unwrap();
  assert_eq!(json["difficulty"], "easy");
  assert_eq!(
    json["total_differences"].as_u64(),
    Some(result.differences.len() as u64)
  );
  assert_eq!(
    json["differences"].as_array().map(|a| a.len()),
    Some(result.differences.len())
  );

  std::fs::remove_dir_all(&directory).ok();
}

#[cfg(feature = "mask_folder")]
#[test]
fn mask_folder_feeds_the_generator() {
  use zhaocha::{FromUrl, model::MaskFolderSegmenter};

  let (image, masks) = five_disc_scene();
  let directory = std::env::temp_dir().join(format!("zhaocha-masks-{}", std::process::id()));
  std::fs::create_dir_all(&directory).unwrap();
  for (i, mask) in masks.iter().enumerate() {
    let gray = image::GrayImage::from_fn(200, 200, |x, y| {
      image::Luma([if mask.get(x, y) { 255 } else { 0 }])
    });
    gray.save(directory.join(format!("{:02}.png", i))).unwrap();
  }
  std::fs::write(
    directory.join("proposals.json"),
    r#"{"00.png": 0.8, "01.png": 0.6}"#,
  )
  .unwrap();

  let url = url::Url::parse(&format!("masks://{}", directory.display())).unwrap();
  let segmenter = MaskFolderSegmenter::from_url(&url).unwrap();
  let generator = DifferenceGenerator::new(
    segmenter,
    FlatSaliency::new(0.4),
    BoundaryFillInpainter::default(),
    GeneratorConfig::default(),
  )
  .unwrap();
  let result = generator
    .generate(&image, "easy", &mut SeededRandom::new(5), None)
    .unwrap();
  assert_eq!(result.metadata.segments_detected, 5);
  assert_eq!(result.metadata.model_versions.segmentation, "mask-folder");
  assert_eq!(result.differences.len() + result.metadata.skipped_changes, 3);

  std::fs::remove_dir_all(&directory).ok();
}
