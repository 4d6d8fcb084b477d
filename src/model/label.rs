// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/label.rs - 类别标签表
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

use std::collections::HashSet;

use thiserror::Error;

use super::CLASS_COUNT;

/// VOC 数据集类别名称
pub const VOC_LABELS: [&str; CLASS_COUNT] = [
  "aeroplane",
  "bicycle",
  "bird",
  "boat",
  "bottle",
  "bus",
  "car",
  "cat",
  "chair",
  "cow",
  "diningtable",
  "dog",
  "horse",
  "motorbike",
  "person",
  "pottedplant",
  "sheep",
  "sofa",
  "train",
  "tvmonitor",
];

#[derive(Error, Debug, PartialEq)]
pub enum LabelError {
  #[error("标签数量错误: 期望 {expected}, 实际 {actual}")]
  WrongCount { expected: usize, actual: usize },
  #[error("标签重复: {0}")]
  Duplicate(String),
}

/// 类别索引到名称的有序映射，构造时保证恰好 CLASS_COUNT 个且互不重复
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl LabelTable {
  pub fn new<I, S>(names: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    if names.len() != CLASS_COUNT {
      return Err(LabelError::WrongCount {
        expected: CLASS_COUNT,
        actual: names.len(),
      });
    }

    let mut seen = HashSet::with_capacity(names.len());
    for name in &names {
      if !seen.insert(name.as_str()) {
        return Err(LabelError::Duplicate(name.clone()));
      }
    }

    Ok(Self {
      names: names.into_boxed_slice(),
    })
  }

  pub fn voc() -> Self {
    Self {
      names: VOC_LABELS.iter().map(|name| name.to_string()).collect(),
    }
  }

  pub fn name(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn id_of(&self, name: &str) -> Option<usize> {
    self.names.iter().position(|n| n == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.id_of(name).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl Default for LabelTable {
  fn default() -> Self {
    Self::voc()
  }
}
