// 该文件是 Beifeng （北风） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续解码
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use beifeng::{
  FromUrl,
  input::InputWrapper,
  model::TinyYoloBuilder,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Beifeng 连续解码参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 解码器配置，如 tinyyolo:voc?threshold=0.5&strict
  #[arg(long, value_name = "MODEL", default_value = "tinyyolo:voc")]
  pub model: Url,
  /// 张量来源（folder://、tensor:// 或 json://）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出（jsonl:、target: 或 image:）
  #[arg(long, value_name = "OUTPUT", default_value = "target:person")]
  pub output: Url,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("解码器配置: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let model = TinyYoloBuilder::from_url(&args.model)?.build();
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_interrupt(true)
    .run_task(input, model, output)?;

  Ok(())
}
