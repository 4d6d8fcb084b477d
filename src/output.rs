// 该文件是 Beifeng （北风） 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::TensorFrame, model::DetectResult};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

pub mod draw;

mod json_lines;
pub use self::json_lines::{JsonLinesOutput, JsonLinesOutputError};

mod target_alert;
pub use self::target_alert::{
  DEFAULT_TARGET_LABEL, Marker, TargetAlertOutput, TargetAlertOutputError, markers,
};

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("JSON 行输出错误: {0}")]
  JsonLinesOutputError(#[from] JsonLinesOutputError),
  #[error("目标告警输出错误: {0}")]
  TargetAlertOutputError(#[from] TargetAlertOutputError),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  JsonLinesOutput(JsonLinesOutput),
  TargetAlertOutput(TargetAlertOutput),
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      JsonLinesOutput::SCHEME => Ok(OutputWrapper::JsonLinesOutput(
        JsonLinesOutput::from_url(url)?,
      )),
      TargetAlertOutput::SCHEME => Ok(OutputWrapper::TargetAlertOutput(
        TargetAlertOutput::from_url(url)?,
      )),
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => Ok(OutputWrapper::SaveImageFileOutput(
        SaveImageFileOutput::from_url(url)?,
      )),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<TensorFrame, DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::JsonLinesOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::TargetAlertOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
