// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/tiny_yolo.rs - Tiny YOLO (VOC) 输出解码
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

use std::sync::LazyLock;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::TensorFrame,
  model::{
    DetectResult, Detection, LabelError, LabelTable, Model,
    math::{argmax, sigmoid, softmax},
  },
};

pub const ROW_COUNT: usize = 13;
pub const COL_COUNT: usize = 13;
pub const BOXES_PER_CELL: usize = 5;
pub const BOX_INFO_FEATURE_COUNT: usize = 5;
pub const CLASS_COUNT: usize = 20;
pub const CHANNEL_COUNT: usize = BOXES_PER_CELL * (BOX_INFO_FEATURE_COUNT + CLASS_COUNT);
pub const TENSOR_LEN: usize = CHANNEL_COUNT * ROW_COUNT * COL_COUNT;
pub const CELL_WIDTH: f32 = 32.0;
pub const CELL_HEIGHT: f32 = 32.0;
pub const INPUT_WIDTH: f32 = COL_COUNT as f32 * CELL_WIDTH;
pub const INPUT_HEIGHT: f32 = ROW_COUNT as f32 * CELL_HEIGHT;

const TINY_YOLO_DEFAULT_THRESH: f32 = 0.5;

/// 锚框的宽高先验（以网格单元为单位）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
  pub width: f32,
  pub height: f32,
}

impl Anchor {
  pub const fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }
}

/// 与训练好的网络绑定，不可单独修改
pub const TINY_YOLO_ANCHORS: [Anchor; BOXES_PER_CELL] = [
  Anchor::new(1.08, 1.19),
  Anchor::new(3.42, 4.41),
  Anchor::new(6.63, 11.38),
  Anchor::new(9.42, 5.11),
  Anchor::new(16.62, 10.52),
];

/// 网格坐标 (x, y) 与通道 channel 在展平张量中的下标
///
/// 张量形状为 125x13x13，通道优先展平。
#[inline]
pub const fn offset(x: usize, y: usize, channel: usize) -> usize {
  channel * (ROW_COUNT * COL_COUNT) + y * COL_COUNT + x
}

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("张量长度无效: 期望 {expected}, 实际 {actual}")]
  InvalidArgument { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum TinyYoloError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("参数无效: {0}")]
  InvalidParameter(String),
  #[error("标签表错误: {0}")]
  LabelError(#[from] LabelError),
}

/// 模型常量：锚框与标签表，启动时构造一次后只读
#[derive(Debug, Clone, PartialEq)]
pub struct TinyYoloConfig {
  anchors: [Anchor; BOXES_PER_CELL],
  labels: LabelTable,
}

impl Default for TinyYoloConfig {
  fn default() -> Self {
    Self {
      anchors: TINY_YOLO_ANCHORS,
      labels: LabelTable::voc(),
    }
  }
}

impl TinyYoloConfig {
  pub fn new(anchors: [Anchor; BOXES_PER_CELL], labels: LabelTable) -> Self {
    Self { anchors, labels }
  }

  pub fn anchors(&self) -> &[Anchor; BOXES_PER_CELL] {
    &self.anchors
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }
}

pub struct TinyYolo {
  config: TinyYoloConfig,
  threshold: f32,
  strict: bool,
}

impl Default for TinyYolo {
  fn default() -> Self {
    Self {
      config: TinyYoloConfig::default(),
      threshold: TINY_YOLO_DEFAULT_THRESH,
      strict: false,
    }
  }
}

static DEFAULT_DECODER: LazyLock<TinyYolo> = LazyLock::new(TinyYolo::default);

/// 使用默认锚框与 VOC 标签解码
pub fn decode(tensor: &[f32], threshold: f32) -> Result<Vec<Detection>, DecodeError> {
  DEFAULT_DECODER.decode(tensor, threshold)
}

impl TinyYolo {
  pub fn config(&self) -> &TinyYoloConfig {
    &self.config
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  pub fn is_strict(&self) -> bool {
    self.strict
  }

  /// 将 125x13x13 的网络输出解码为检测结果
  ///
  /// 每个网格单元的每个锚框最多产生一个结果，不做非极大值抑制。
  /// 非有限值（NaN/Inf）默认原样传播；严格模式下丢弃含非有限字段的结果。
  pub fn decode(&self, tensor: &[f32], threshold: f32) -> Result<Vec<Detection>, DecodeError> {
    self
      .decode_counted(tensor, threshold)
      .map(|decoded| decoded.detections)
  }

  fn decode_counted(&self, tensor: &[f32], threshold: f32) -> Result<Decoded, DecodeError> {
    if tensor.len() != TENSOR_LEN {
      return Err(DecodeError::InvalidArgument {
        expected: TENSOR_LEN,
        actual: tensor.len(),
      });
    }

    let mut detections = Vec::new();
    let mut candidates = 0usize;

    for cy in 0..ROW_COUNT {
      for cx in 0..COL_COUNT {
        for (b, anchor) in self.config.anchors.iter().enumerate() {
          let channel = b * (CLASS_COUNT + BOX_INFO_FEATURE_COUNT);

          let confidence = sigmoid(tensor[offset(cx, cy, channel + 4)]);
          if confidence < threshold {
            continue;
          }
          candidates += 1;

          let mut classes = [0f32; CLASS_COUNT];
          let class_offset = channel + BOX_INFO_FEATURE_COUNT;
          for (i, class) in classes.iter_mut().enumerate() {
            *class = tensor[offset(cx, cy, class_offset + i)];
          }
          softmax(&mut classes);

          let Some((top_class, top_score)) = argmax(&classes) else {
            continue;
          };
          let score = top_score * confidence;
          if score < threshold {
            continue;
          }

          let tx = tensor[offset(cx, cy, channel)];
          let ty = tensor[offset(cx, cy, channel + 1)];
          let tw = tensor[offset(cx, cy, channel + 2)];
          let th = tensor[offset(cx, cy, channel + 3)];

          let x = (cx as f32 + sigmoid(tx)) * CELL_WIDTH;
          let y = (cy as f32 + sigmoid(ty)) * CELL_HEIGHT;
          let width = tw.exp() * CELL_WIDTH * anchor.width;
          let height = th.exp() * CELL_HEIGHT * anchor.height;

          let detection = Detection {
            label: self
              .config
              .labels
              .name(top_class)
              .unwrap_or_default()
              .to_string(),
            class_id: top_class,
            x: x - width / 2.0,
            y: y - height / 2.0,
            width,
            height,
            confidence: score,
          };

          if self.strict && !detection.is_finite() {
            warn!(
              "丢弃含非有限值的检测结果: 网格 ({}, {}), 锚框 {}",
              cx, cy, b
            );
            continue;
          }

          detections.push(detection);
        }
      }
    }

    debug!(
      "解码完成: {} 个候选框通过目标阈值, 输出 {} 个检测结果",
      candidates,
      detections.len()
    );

    Ok(Decoded {
      detections,
      candidates,
    })
  }
}

/// 解码结果及通过目标阈值、进入分类的候选框数量
struct Decoded {
  detections: Vec<Detection>,
  candidates: usize,
}

impl Model for TinyYolo {
  type Input = TensorFrame;
  type Output = DetectResult;
  type Error = DecodeError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("解码张量帧: {}", input.name());
    let items = self.decode(input.as_ref(), self.threshold)?;
    Ok(DetectResult::from(items))
  }
}

pub struct TinyYoloBuilder {
  config: TinyYoloConfig,
  threshold: f32,
  strict: bool,
}

impl Default for TinyYoloBuilder {
  fn default() -> Self {
    Self {
      config: TinyYoloConfig::default(),
      threshold: TINY_YOLO_DEFAULT_THRESH,
      strict: false,
    }
  }
}

impl FromUrlWithScheme for TinyYoloBuilder {
  const SCHEME: &'static str = "tinyyolo";
}

/// 形如 `tinyyolo:voc?threshold=0.3&strict`
impl FromUrl for TinyYoloBuilder {
  type Error = TinyYoloError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TinyYoloError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let labels = match url.path().trim_matches('/') {
      "" | "voc" => LabelTable::voc(),
      other => {
        return Err(TinyYoloError::ModelPathError(format!(
          "未知的标签集: {}",
          other
        )));
      }
    };

    let mut builder = TinyYoloBuilder::default().labels(labels);
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "threshold" => {
          let threshold = v
            .parse::<f32>()
            .map_err(|e| TinyYoloError::InvalidParameter(format!("threshold={}: {}", v, e)))?;
          builder = builder.threshold(threshold);
        }
        "strict" => {
          builder = builder.strict(v.is_empty() || v == "true" || v == "1");
        }
        _ => warn!("忽略未知的模型参数: {}={}", k, v),
      }
    }

    Ok(builder)
  }
}

impl TinyYoloBuilder {
  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn strict(mut self, strict: bool) -> Self {
    self.strict = strict;
    self
  }

  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.config.labels = labels;
    self
  }

  pub fn anchors(mut self, anchors: [Anchor; BOXES_PER_CELL]) -> Self {
    self.config.anchors = anchors;
    self
  }

  pub fn build(self) -> TinyYolo {
    if !(0.0..=1.0).contains(&self.threshold) {
      warn!(
        "置信度阈值 {} 不在 [0, 1] 范围内，过滤将全部通过或全部拒绝",
        self.threshold
      );
    }
    info!(
      "Tiny YOLO 解码器: 网格 {}x{}, 锚框 {}, 类别 {}, 阈值 {}, 严格模式 {}",
      COL_COUNT, ROW_COUNT, BOXES_PER_CELL, CLASS_COUNT, self.threshold, self.strict
    );

    TinyYolo {
      config: self.config,
      threshold: self.threshold,
      strict: self.strict,
    }
  }
}
