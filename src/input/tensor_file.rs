// 该文件是 Beifeng （北风） 项目的一部分。
// src/input/tensor_file.rs - 张量文件输入
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::TensorFrame, url_file_path};

#[derive(Error, Debug)]
pub enum TensorFileInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("原始张量长度 {0} 字节不是 4 的整数倍")]
  TruncatedRaw(usize),
  #[error("无法识别的张量文件: {0}")]
  UnknownFormat(String),
  #[error("URL 路径不是有效的 UTF-8: {0}")]
  PathEncoding(#[from] std::string::FromUtf8Error),
}

/// 张量文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorFileFormat {
  /// 小端 f32 原始数据
  RawF32Le,
  /// JSON 数字数组
  Json,
}

impl TensorFileFormat {
  pub fn from_path(path: &Path) -> Option<Self> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
      "bin" | "raw" | "f32" => Some(TensorFileFormat::RawF32Le),
      "json" => Some(TensorFileFormat::Json),
      _ => None,
    }
  }
}

pub fn read_tensor_file(
  path: &Path,
  format: TensorFileFormat,
) -> Result<TensorFrame, TensorFileInputError> {
  let bytes = std::fs::read(path)?;
  debug!("读取张量文件: {} ({} 字节)", path.display(), bytes.len());

  let data = match format {
    TensorFileFormat::RawF32Le => {
      if bytes.len() % 4 != 0 {
        return Err(TensorFileInputError::TruncatedRaw(bytes.len()));
      }
      bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
    }
    TensorFileFormat::Json => serde_json::from_slice::<Vec<f32>>(&bytes)?,
  };

  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  Ok(TensorFrame::new(name, data))
}

/// 单个张量文件，产生一帧
pub struct TensorFileInput {
  frame: Option<TensorFrame>,
}

impl TensorFileInput {
  pub fn open(path: &Path, format: TensorFileFormat) -> Result<Self, TensorFileInputError> {
    let frame = read_tensor_file(path, format)?;
    Ok(TensorFileInput { frame: Some(frame) })
  }

  fn from_url_with(
    url: &Url,
    scheme: &str,
    format: TensorFileFormat,
  ) -> Result<Self, TensorFileInputError> {
    if url.scheme() != scheme {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        scheme,
        url.scheme()
      );
      return Err(TensorFileInputError::SchemeMismatch {
        expected: scheme.to_string(),
        actual: url.scheme().to_string(),
      });
    }
    Self::open(&url_file_path(url)?, format)
  }
}

impl Iterator for TensorFileInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}

/// `tensor:///path/to/output.bin`
pub struct RawTensorInput(TensorFileInput);

impl FromUrlWithScheme for RawTensorInput {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for RawTensorInput {
  type Error = TensorFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    TensorFileInput::from_url_with(url, Self::SCHEME, TensorFileFormat::RawF32Le).map(Self)
  }
}

impl Iterator for RawTensorInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.0.next()
  }
}

/// `json:///path/to/output.json`
pub struct JsonTensorInput(TensorFileInput);

impl FromUrlWithScheme for JsonTensorInput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonTensorInput {
  type Error = TensorFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    TensorFileInput::from_url_with(url, Self::SCHEME, TensorFileFormat::Json).map(Self)
  }
}

impl Iterator for JsonTensorInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.0.next()
  }
}
