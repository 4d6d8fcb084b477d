// 该文件是 Beifeng （北风） 项目的一部分。
// src/model/math.rs - 激活函数
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

pub fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

/// 原地 softmax，先减去最大值再取指数；指数和以 f64 累加
pub fn softmax<const N: usize>(values: &mut [f32; N]) {
  let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  for v in values.iter_mut() {
    *v = (*v - max).exp();
  }
  let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
  for v in values.iter_mut() {
    *v = (f64::from(*v) / sum) as f32;
  }
}

/// 返回最大值的索引与数值，相等时取第一个
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, &value) in values.iter().enumerate() {
    match best {
      Some((_, top)) if value > top => best = Some((idx, value)),
      None => best = Some((idx, value)),
      _ => {}
    }
  }
  best
}
