// 该文件是 Beifeng （北风） 项目的一部分。
// src/output/target_alert.rs - 目标标签告警
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

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{DetectResult, LabelTable},
  output::Render,
};

pub const DEFAULT_TARGET_LABEL: &str = "person";

#[derive(Error, Debug)]
pub enum TargetAlertOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未知的目标标签: {0}")]
  UnknownLabel(String),
}

/// 命中目标标签的检测框中心点标记，id 在单帧内从 0 递增
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
  pub id: u32,
  pub label: String,
  pub x: f32,
  pub y: f32,
  pub z: f32,
}

pub fn markers(result: &DetectResult, label: &str) -> Vec<Marker> {
  result
    .with_label(label)
    .zip(0u32..)
    .map(|(detection, id)| {
      let (x, y) = detection.center();
      Marker {
        id,
        label: detection.label.clone(),
        x,
        y,
        z: 0.0,
      }
    })
    .collect()
}

/// `target:person`，省略标签时默认为 person
pub struct TargetAlertOutput {
  label: String,
  matched: AtomicUsize,
}

impl FromUrlWithScheme for TargetAlertOutput {
  const SCHEME: &'static str = "target";
}

impl FromUrl for TargetAlertOutput {
  type Error = TargetAlertOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(TargetAlertOutputError::SchemeMismatch);
    }

    let label = match uri.path().trim_matches('/') {
      "" => DEFAULT_TARGET_LABEL,
      label => label,
    };
    if !LabelTable::voc().contains(label) {
      return Err(TargetAlertOutputError::UnknownLabel(label.to_string()));
    }

    info!("目标标签: {}", label);
    Ok(TargetAlertOutput {
      label: label.to_string(),
      matched: AtomicUsize::new(0),
    })
  }
}

impl TargetAlertOutput {
  pub fn label(&self) -> &str {
    &self.label
  }

  /// 累计命中次数
  pub fn matched(&self) -> usize {
    self.matched.load(Ordering::Relaxed)
  }
}

impl Render<TensorFrame, DetectResult> for TargetAlertOutput {
  type Error = TargetAlertOutputError;

  fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let markers = markers(result, &self.label);
    debug!(
      "帧 {}: {} 个检测结果, {} 个命中 {}",
      frame.name(),
      result.len(),
      markers.len(),
      self.label
    );

    for marker in &markers {
      info!(
        "匹配标签: {} (#{}) 位于 ({:.1}, {:.1})",
        marker.label, marker.id, marker.x, marker.y
      );
    }
    self.matched.fetch_add(markers.len(), Ordering::Relaxed);

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Detection;

  fn detection(label: &str, x: f32) -> Detection {
    Detection {
      label: label.to_string(),
      class_id: 0,
      x,
      y: 0.0,
      width: 10.0,
      height: 20.0,
      confidence: 0.8,
    }
  }

  #[test]
  fn markers_are_centered_and_numbered() {
    let result = DetectResult::from(vec![
      detection("person", 0.0),
      detection("dog", 50.0),
      detection("person", 100.0),
    ]);
    let found = markers(&result, "person");
    assert_eq!(found.len(), 2);
    assert_eq!((found[0].id, found[0].x, found[0].y), (0, 5.0, 10.0));
    assert_eq!((found[1].id, found[1].x, found[1].y), (1, 105.0, 10.0));
  }

  #[test]
  fn default_label_is_person() {
    let output = TargetAlertOutput::from_url(&Url::parse("target:").unwrap()).unwrap();
    assert_eq!(output.label(), "person");
  }

  #[test]
  fn unknown_label_is_rejected() {
    let url = Url::parse("target:unicorn").unwrap();
    assert!(matches!(
      TargetAlertOutput::from_url(&url),
      Err(TargetAlertOutputError::UnknownLabel(_))
    ));
  }

  #[test]
  fn matches_accumulate() {
    let output = TargetAlertOutput::from_url(&Url::parse("target:dog").unwrap()).unwrap();
    let result = DetectResult::from(vec![detection("dog", 0.0), detection("cat", 0.0)]);
    let frame = TensorFrame::from(Vec::new());
    output.render_result(&frame, &result).unwrap();
    output.render_result(&frame, &result).unwrap();
    assert_eq!(output.matched(), 2);
  }
}
