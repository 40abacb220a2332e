use image::{Rgb, RgbImage};
use zhaocha::mask::Mask;

pub const DISC_COLORS: [Rgb<u8>; 5] = [
  Rgb([220, 40, 40]),
  Rgb([40, 200, 60]),
  Rgb([50, 60, 210]),
  Rgb([230, 200, 30]),
  Rgb([200, 60, 200]),
];

/// 带细纹理的背景，避免修复和 SSIM 在纯色上退化
pub fn textured_background(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |x, y| {
    Rgb([
      90 + ((x * 3 + y * 5) % 40) as u8,
      110 + ((x * 7 + y * 2) % 30) as u8,
      80 + ((x + y * 3) % 20) as u8,
    ])
  })
}

pub fn disc_mask(width: u32, height: u32, cx: u32, cy: u32, radius: u32) -> Mask {
  let r2 = (radius * radius) as i64;
  Mask::from_fn(width, height, |x, y| {
    let (dx, dy) = (x as i64 - cx as i64, y as i64 - cy as i64);
    dx * dx + dy * dy <= r2
  })
}

/// 在纹理背景上画若干彩色圆盘，返回图像与各圆盘的掩码
pub fn scene_with_discs(
  width: u32,
  height: u32,
  centers: &[(u32, u32)],
  radius: u32,
) -> (RgbImage, Vec<Mask>) {
  let mut image = textured_background(width, height);
  let mut masks = Vec::with_capacity(centers.len());
  for (i, &(cx, cy)) in centers.iter().enumerate() {
    let mask = disc_mask(width, height, cx, cy, radius);
    let color = DISC_COLORS[i % DISC_COLORS.len()];
    for (x, y) in mask.iter_on() {
      image.put_pixel(x, y, color);
    }
    masks.push(mask);
  }
  (image, masks)
}

/// 200×200 场景，五个半径 12 的圆盘
pub fn five_disc_scene() -> (RgbImage, Vec<Mask>) {
  scene_with_discs(
    200,
    200,
    &[(40, 40), (150, 45), (50, 150), (150, 150), (100, 100)],
    12,
  )
}
