// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/json_lines.rs - 检测结果 JSON 行输出
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

use std::{
  fs::{File, OpenOptions},
  io::Write,
  sync::Mutex,
};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{DetectResult, Detection},
  output::Render,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum JsonLinesOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出文件锁已损坏")]
  Poisoned,
  #[error("URL 路径不是有效的 UTF-8: {0}")]
  PathEncoding(#[from] std::string::FromUtf8Error),
}

#[derive(Serialize)]
struct FrameRecord<'a> {
  frame: &'a str,
  count: usize,
  detections: &'a [Detection],
}

enum Sink {
  Stdout,
  File(Mutex<File>),
}

/// 每帧一行 JSON；`jsonl:-` 写到标准输出，`jsonl:///path` 追加到文件
pub struct JsonLinesOutput {
  sink: Sink,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonLinesOutputError::SchemeMismatch);
    }

    let sink = match uri.path() {
      "" | "-" => Sink::Stdout,
      _ => {
        let path = url_file_path(uri)?;
        if let Some(parent) = path.parent()
          && !parent.as_os_str().is_empty()
        {
          std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("检测结果写入文件: {}", path.display());
        Sink::File(Mutex::new(file))
      }
    };

    Ok(JsonLinesOutput { sink })
  }
}

impl Render<TensorFrame, DetectResult> for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let record = FrameRecord {
      frame: frame.name(),
      count: result.len(),
      detections: &result.items,
    };
    let mut line = serde_json::to_string(&record)?;
    line.push('\n');

    match &self.sink {
      Sink::Stdout => std::io::stdout().lock().write_all(line.as_bytes())?,
      Sink::File(file) => {
        let mut file = file.lock().map_err(|_| JsonLinesOutputError::Poisoned)?;
        file.write_all(line.as_bytes())?;
      }
    }
    Ok(())
  }
}
