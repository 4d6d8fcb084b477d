// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{DetectResult, INPUT_HEIGHT, INPUT_WIDTH, LabelTable},
  output::{DEFAULT_TARGET_LABEL, Render, draw::draw_detections},
  url_file_path,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未知的目标标签: {0}")]
  UnknownLabel(String),
  #[error("URL 路径不是有效的 UTF-8: {0}")]
  PathEncoding(#[from] std::string::FromUtf8Error),
}

/// `image:///out.png?label=person&background=/in.jpg`
///
/// 只绘制目标标签（默认 `person`）的检测框。背景图缩放到网络输入尺寸；
/// 没有背景时使用黑色画布。
pub struct SaveImageFileOutput {
  path: PathBuf,
  label: String,
  background: RgbImage,
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

    let label = uri
      .query_pairs()
      .find(|(k, _)| k == "label")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string());
    if !LabelTable::voc().contains(&label) {
      return Err(SaveImageFileError::UnknownLabel(label));
    }

    let (width, height) = (INPUT_WIDTH as u32, INPUT_HEIGHT as u32);
    let background = match uri.query_pairs().find(|(k, _)| k == "background") {
      Some((_, path)) => {
        info!("加载背景图像: {}", path);
        let image = ImageReader::open(&*path)?.decode()?.into_rgb8();
        image::imageops::resize(&image, width, height, FilterType::Triangle)
      }
      None => RgbImage::new(width, height),
    };

    info!("图像输出只绘制标签: {}", label);
    Ok(SaveImageFileOutput {
      path: url_file_path(uri)?,
      label,
      background,
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    warn!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<TensorFrame, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, _frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let mut image = self.background.clone();
    draw_detections(&mut image, result.with_label(&self.label));
    self.save_image(image)
  }
}
