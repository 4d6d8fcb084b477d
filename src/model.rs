// 该文件是 Beifeng （北风） 项目的一部分。
// src/model.rs - 模型
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

use serde::Serialize;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  /// 类别名称
  pub label: String,
  /// 类别索引
  pub class_id: usize,
  /// 边界框左上角 x 坐标（416x416 网络坐标系）
  pub x: f32,
  /// 边界框左上角 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 置信度（目标概率 x 最高类别概率，不做截断）
  pub confidence: f32,
}

impl Detection {
  pub fn center(&self) -> (f32, f32) {
    (self.x + self.width / 2.0, self.y + self.height / 2.0)
  }

  pub fn is_finite(&self) -> bool {
    self.x.is_finite()
      && self.y.is_finite()
      && self.width.is_finite()
      && self.height.is_finite()
      && self.confidence.is_finite()
  }
}

/// 一帧的全部检测结果，顺序为网格行优先、再按锚框顺序，不按置信度排序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  pub fn with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Detection> + 'a {
    self.items.iter().filter(move |item| item.label == label)
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod label;
pub use self::label::{LabelError, LabelTable, VOC_LABELS};

pub mod math;

mod tiny_yolo;
pub use self::tiny_yolo::{
  Anchor, BOX_INFO_FEATURE_COUNT, BOXES_PER_CELL, CELL_HEIGHT, CELL_WIDTH, CHANNEL_COUNT,
  CLASS_COUNT, COL_COUNT, DecodeError, INPUT_HEIGHT, INPUT_WIDTH, ROW_COUNT, TENSOR_LEN,
  TINY_YOLO_ANCHORS, TinyYolo, TinyYoloBuilder, TinyYoloConfig, TinyYoloError, decode, offset,
};
