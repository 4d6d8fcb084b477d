// 该文件是 Beifeng （北风） 项目的一部分。
// src/input/tensor_directory.rs - 目录中的张量文件序列
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

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  input::{TensorFileFormat, read_tensor_file},
  url_file_path,
};

#[derive(Error, Debug)]
pub enum TensorDirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URL 路径不是有效的 UTF-8: {0}")]
  PathEncoding(#[from] std::string::FromUtf8Error),
}

/// 按文件名顺序逐个读取目录下的 `.bin`/`.json` 张量文件，读取失败的文件被跳过
pub struct TensorDirectoryInput {
  files: std::vec::IntoIter<(PathBuf, TensorFileFormat)>,
}

impl FromUrlWithScheme for TensorDirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for TensorDirectoryInput {
  type Error = TensorDirectoryInputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(TensorDirectoryInputError::SchemeMismatch);
    }

    let directory = url_file_path(uri)?;
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if !path.is_file() {
        continue;
      }
      if let Some(format) = TensorFileFormat::from_path(&path) {
        files.push((path, format));
      }
    }
    files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

    info!(
      "张量目录 {}: 共 {} 个文件",
      directory.display(),
      files.len()
    );

    Ok(TensorDirectoryInput {
      files: files.into_iter(),
    })
  }
}

impl Iterator for TensorDirectoryInput {
  type Item = TensorFrame;

  fn next(&mut self) -> Option<Self::Item> {
    for (path, format) in self.files.by_ref() {
      match read_tensor_file(&path, format) {
        Ok(frame) => return Some(frame),
        Err(e) => error!("跳过张量文件 {}: {}", path.display(), e),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn files_are_sorted_and_bad_ones_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("002.json"), "[2.0]").unwrap();
    std::fs::write(dir.path().join("001.bin"), 1.0f32.to_le_bytes()).unwrap();
    std::fs::write(dir.path().join("003.json"), "not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    std::fs::create_dir(dir.path().join("sub.json")).unwrap();

    let url = Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let input = TensorDirectoryInput::from_url(&url).unwrap();
    let frames: Vec<TensorFrame> = input.collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].name(), "001.bin");
    assert_eq!(frames[0].as_ref(), &[1.0]);
    assert_eq!(frames[1].name(), "002.json");
    assert_eq!(frames[1].as_ref(), &[2.0]);
  }

  #[test]
  fn directory_with_space_is_found() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("night shift");
    std::fs::create_dir(&frames).unwrap();
    std::fs::write(frames.join("001.json"), "[7.0]").unwrap();

    let url = Url::parse(&format!("folder://{}/night%20shift", dir.path().display())).unwrap();
    let frames: Vec<TensorFrame> = TensorDirectoryInput::from_url(&url).unwrap().collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].as_ref(), &[7.0]);
  }

  #[test]
  fn missing_directory_is_an_error() {
    let url = Url::parse("folder:///nonexistent/beifeng/tensors").unwrap();
    assert!(matches!(
      TensorDirectoryInput::from_url(&url),
      Err(TensorDirectoryInputError::IoError(_))
    ));
  }
}
