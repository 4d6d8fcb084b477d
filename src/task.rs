// 该文件是 Beifeng （北风） 项目的一部分。
// src/task.rs - 解码任务
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
  sync::mpsc::{self, Receiver},
  thread,
  time::{Duration, Instant},
};
use tracing::{error, info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始解码...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("解码完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("输出完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

pub struct RepeatShotTask {
  repeat: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，重复解码 {} 次...", self.repeat);
    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})解码完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      times.push(elapsed);
    }

    // 前两次作为预热，不计入平均
    let warm = if times.len() > 2 { &times[2..] } else { &times[..] };
    if !warm.is_empty() {
      warn!(
        "平均解码时间: {:.2?}",
        warm.iter().sum::<Duration>() / warm.len() as u32
      );
    }

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理，收到信号后在当前帧结束时退出；每个进程只能安装一次
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }

  fn install_interrupt() -> anyhow::Result<Receiver<()>> {
    let (tx, rx) = mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    Ok(rx)
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let rx = if self.interrupt {
      Some(Self::install_interrupt()?)
    } else {
      None
    };

    let mut frame_index = 0usize;
    let mut skipped = 0usize;
    let mut now = Instant::now();
    for frame in input {
      frame_index += 1;
      info!("处理第 {} 帧", frame_index);
      match model.infer(&frame) {
        Ok(result) => {
          let elapsed_a = now.elapsed();
          output.render_result(&frame, &result)?;
          let elapsed_b = now.elapsed();
          info!("解码完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
        }
        Err(e) => {
          // 单帧解码失败时跳过该帧
          error!("第 {} 帧解码失败，跳过: {}", frame_index, e);
          skipped += 1;
        }
      }
      now = Instant::now();
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 帧，跳过 {} 帧，退出",
      frame_index, skipped
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible};

  use super::*;
  use crate::{
    frame::TensorFrame,
    model::{DecodeError, DetectResult, TENSOR_LEN, TinyYoloBuilder},
  };

  #[derive(Default)]
  struct Collect {
    seen: RefCell<Vec<(String, usize)>>,
  }

  impl Render<TensorFrame, DetectResult> for &Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &TensorFrame, result: &DetectResult) -> Result<(), Self::Error> {
      self
        .seen
        .borrow_mut()
        .push((frame.name().to_string(), result.len()));
      Ok(())
    }
  }

  fn frames() -> Vec<TensorFrame> {
    vec![
      TensorFrame::new("a", vec![0.0; TENSOR_LEN]),
      TensorFrame::new("short", vec![0.0; 10]),
      TensorFrame::new("c", vec![0.0; TENSOR_LEN]),
    ]
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let collect = Collect::default();
    let model = TinyYoloBuilder::default().threshold(0.0).build();
    OneShotTask
      .run_task(frames().into_iter(), model, &collect)
      .unwrap();
    assert_eq!(*collect.seen.borrow(), vec![("a".to_string(), 845)]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let collect = Collect::default();
    let model = TinyYoloBuilder::default().build();
    assert!(
      OneShotTask
        .run_task(Vec::<TensorFrame>::new().into_iter(), model, &collect)
        .is_err()
    );
  }

  #[test]
  fn one_shot_surfaces_decode_error() {
    let collect = Collect::default();
    let model = TinyYoloBuilder::default().build();
    let err = OneShotTask
      .run_task(frames().into_iter().skip(1), model, &collect)
      .unwrap_err();
    assert!(err.downcast_ref::<DecodeError>().is_some());
  }

  #[test]
  fn continuous_skips_bad_frames() {
    let collect = Collect::default();
    let model = TinyYoloBuilder::default().threshold(0.5).build();
    ContinuousTask::default()
      .run_task(frames().into_iter(), model, &collect)
      .unwrap();
    let names: Vec<String> = collect.seen.borrow().iter().map(|s| s.0.clone()).collect();
    assert_eq!(names, vec!["a", "c"]);
  }

  #[test]
  fn continuous_respects_frame_number() {
    let collect = Collect::default();
    let model = TinyYoloBuilder::default().build();
    ContinuousTask::default()
      .with_frame_number(Some(1))
      .run_task(frames().into_iter(), model, &collect)
      .unwrap();
    assert_eq!(collect.seen.borrow().len(), 1);
  }

  #[test]
  fn repeat_shot_renders_each_time() {
    let collect = Collect::default();
    let model = TinyYoloBuilder::default().build();
    RepeatShotTask::default()
      .with_repeat(3)
      .run_task(frames().into_iter(), model, &collect)
      .unwrap();
    assert_eq!(collect.seen.borrow().len(), 3);
  }
}
