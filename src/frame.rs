// 该文件是 Beifeng （北风） 项目的一部分。
// src/frame.rs - 网络输出张量帧定义
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

/// 一帧网络输出：展平后的 f32 张量及其来源名称
///
/// 长度在构造时不做检查，由解码器在解码时校验。
#[derive(Debug, Clone)]
pub struct TensorFrame {
  name: String,
  data: Box<[f32]>,
}

impl TensorFrame {
  pub fn new(name: impl Into<String>, data: Vec<f32>) -> Self {
    Self {
      name: name.into(),
      data: data.into_boxed_slice(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl From<Vec<f32>> for TensorFrame {
  fn from(data: Vec<f32>) -> Self {
    Self::new("", data)
  }
}

impl AsRef<[f32]> for TensorFrame {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for TensorFrame {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}
