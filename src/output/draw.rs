// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/draw.rs - 检测框绘制
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

#[cfg(feature = "save_image_file")]
use image::{Rgb, RgbImage};
#[cfg(feature = "save_image_file")]
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::Detection;

/// 青色边框
#[cfg(feature = "save_image_file")]
const BOX_COLOR: [u8; 3] = [0, 255, 255];

/// 裁剪到图像范围内的整数像素矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedBox {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

/// 左上角截断到 0，宽高截断到图像右、下边界；裁剪后为空返回 None
pub fn clip_box(detection: &Detection, cols: u32, rows: u32) -> Option<ClippedBox> {
  let x = (detection.x as i32).max(0);
  let y = (detection.y as i32).max(0);
  let width = (cols as i32 - x).min(detection.width as i32);
  let height = (rows as i32 - y).min(detection.height as i32);

  if width <= 0 || height <= 0 {
    return None;
  }

  Some(ClippedBox {
    x,
    y,
    width: width as u32,
    height: height as u32,
  })
}

/// 以 2 像素宽的边框绘制给定的检测结果
#[cfg(feature = "save_image_file")]
pub fn draw_detections<'a>(
  image: &mut RgbImage,
  detections: impl IntoIterator<Item = &'a Detection>,
) {
  let color = Rgb(BOX_COLOR);
  for detection in detections {
    let Some(clipped) = clip_box(detection, image.width(), image.height()) else {
      continue;
    };

    let rect = Rect::at(clipped.x, clipped.y).of_size(clipped.width, clipped.height);
    draw_hollow_rect_mut(image, rect, color);

    // 第二层边框
    if clipped.width > 2 && clipped.height > 2 {
      let inner = Rect::at(clipped.x + 1, clipped.y + 1)
        .of_size(clipped.width - 2, clipped.height - 2);
      draw_hollow_rect_mut(image, inner, color);
    }
  }
}
