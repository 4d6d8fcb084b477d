//! 解码器的端到端行为测试

use std::{sync::Arc, thread};

use beifeng::{
  FromUrl,
  frame::TensorFrame,
  input::InputWrapper,
  model::{
    BOXES_PER_CELL, CELL_HEIGHT, CELL_WIDTH, COL_COUNT, DecodeError, Model, ROW_COUNT, TENSOR_LEN,
    TinyYoloBuilder, decode, offset,
  },
  output::{OutputWrapper, markers},
  task::{ContinuousTask, Task},
};
use url::Url;

const GROUP: usize = 25;

/// 所有锚框目标概率极低的张量
fn quiet_tensor() -> Vec<f32> {
  let mut tensor = vec![0.0; TENSOR_LEN];
  for cy in 0..ROW_COUNT {
    for cx in 0..COL_COUNT {
      for b in 0..BOXES_PER_CELL {
        tensor[offset(cx, cy, b * GROUP + 4)] = -30.0;
      }
    }
  }
  tensor
}

fn plant(tensor: &mut [f32], cx: usize, cy: usize, b: usize, class: usize, logit: f32) {
  let channel = b * GROUP;
  tensor[offset(cx, cy, channel)] = 1.0;
  tensor[offset(cx, cy, channel + 1)] = -1.0;
  tensor[offset(cx, cy, channel + 4)] = logit;
  tensor[offset(cx, cy, channel + 5 + class)] = logit;
}

/// 伪随机但可复现的 logits
fn noisy_tensor() -> Vec<f32> {
  let mut state = 0x2545_f491_u32;
  (0..TENSOR_LEN)
    .map(|_| {
      state ^= state << 13;
      state ^= state >> 17;
      state ^= state << 5;
      (state % 2000) as f32 / 250.0 - 4.0
    })
    .collect()
}

#[test]
fn all_zero_logits_pass_objectness() {
  let tensor = vec![0.0; TENSOR_LEN];
  // 0.5 的目标概率，均匀的类别概率 0.05，乘积 0.025
  assert_eq!(decode(&tensor, 0.025).unwrap().len(), 845);
  assert!(decode(&tensor, 0.03).unwrap().is_empty());
}

#[test]
fn single_planted_detection() {
  let mut tensor = quiet_tensor();
  let (cx, cy) = (9, 3);
  plant(&mut tensor, cx, cy, 4, 14, 12.0);

  let detections = decode(&tensor, 0.5).unwrap();
  assert_eq!(detections.len(), 1);
  let d = &detections[0];
  assert_eq!(d.label, "person");

  let (center_x, center_y) = d.center();
  let span_x = cx as f32 * CELL_WIDTH..(cx + 1) as f32 * CELL_WIDTH;
  let span_y = cy as f32 * CELL_HEIGHT..(cy + 1) as f32 * CELL_HEIGHT;
  assert!(span_x.contains(&center_x));
  assert!(span_y.contains(&center_y));
  // sigmoid(1) 向右偏移，sigmoid(-1) 向上偏移
  assert!(center_x > (cx as f32 + 0.5) * CELL_WIDTH);
  assert!(center_y < (cy as f32 + 0.5) * CELL_HEIGHT);
  // 锚框 4: 16.62 x 10.52 个单元
  assert!((d.width - 16.62 * CELL_WIDTH).abs() < 1e-2);
  assert!((d.height - 10.52 * CELL_HEIGHT).abs() < 1e-2);
}

#[test]
fn detections_follow_grid_order() {
  let mut tensor = quiet_tensor();
  plant(&mut tensor, 5, 6, 1, 2, 12.0);
  plant(&mut tensor, 2, 6, 3, 7, 12.0);
  plant(&mut tensor, 2, 6, 0, 11, 12.0);
  plant(&mut tensor, 12, 0, 4, 18, 12.0);

  let labels: Vec<String> = decode(&tensor, 0.5)
    .unwrap()
    .into_iter()
    .map(|d| d.label)
    .collect();
  assert_eq!(labels, vec!["train", "dog", "cat", "bird"]);
}

#[test]
fn decoding_is_deterministic() {
  let tensor = noisy_tensor();
  let first = decode(&tensor, 0.2).unwrap();
  let second = decode(&tensor, 0.2).unwrap();
  assert!(!first.is_empty());
  assert_eq!(first, second);
}

#[test]
fn threshold_above_one_yields_nothing() {
  assert!(decode(&noisy_tensor(), 1.0).unwrap().is_empty());
  assert!(decode(&vec![0.0; TENSOR_LEN], 1.0).unwrap().is_empty());

  let mut tensor = quiet_tensor();
  plant(&mut tensor, 0, 0, 0, 0, 100.0);
  assert!(decode(&tensor, 1.0001).unwrap().is_empty());
}

#[test]
fn saturated_logits_reach_exactly_one() {
  // f32 下 sigmoid(100) 与 softmax 最大项都舍入为 1.0，阈值 1.0 时仍会输出
  let mut tensor = quiet_tensor();
  plant(&mut tensor, 0, 0, 0, 0, 100.0);
  let detections = decode(&tensor, 1.0).unwrap();
  assert_eq!(detections.len(), 1);
  assert_eq!(detections[0].confidence, 1.0);
}

#[test]
fn negative_threshold_passes_everything() {
  assert_eq!(decode(&quiet_tensor(), -1.0).unwrap().len(), 845);
}

#[test]
fn short_tensor_is_invalid_argument() {
  let tensor = vec![0.0; TENSOR_LEN - 169];
  assert!(matches!(
    decode(&tensor, 0.5),
    Err(DecodeError::InvalidArgument { expected: 21125, actual: 20956 })
  ));
}

#[test]
fn nan_propagates_by_default() {
  let mut tensor = quiet_tensor();
  plant(&mut tensor, 3, 3, 0, 0, 12.0);
  tensor[offset(3, 3, 0)] = f32::NAN;

  let detections = decode(&tensor, 0.5).unwrap();
  assert_eq!(detections.len(), 1);
  assert!(detections[0].x.is_nan());

  let strict = TinyYoloBuilder::default().strict(true).build();
  assert!(strict.decode(&tensor, 0.5).unwrap().is_empty());
}

#[test]
fn decoder_is_shared_across_threads() {
  let model = Arc::new(TinyYoloBuilder::default().threshold(0.2).build());
  let tensor = Arc::new(noisy_tensor());
  let expected = model.decode(&tensor, 0.2).unwrap();

  let handles: Vec<_> = (0..4)
    .map(|_| {
      let model = Arc::clone(&model);
      let tensor = Arc::clone(&tensor);
      thread::spawn(move || model.decode(&tensor, 0.2).unwrap())
    })
    .collect();
  for handle in handles {
    assert_eq!(handle.join().unwrap(), expected);
  }
}

#[test]
fn target_markers_from_decoded_frame() {
  let mut tensor = quiet_tensor();
  plant(&mut tensor, 1, 1, 0, 14, 12.0);
  plant(&mut tensor, 8, 8, 2, 11, 12.0);
  plant(&mut tensor, 10, 4, 3, 14, 12.0);

  let model = TinyYoloBuilder::default().build();
  let result = model.infer(&TensorFrame::new("t", tensor)).unwrap();
  let found = markers(&result, "person");
  assert_eq!(found.len(), 2);
  assert_eq!(found[0].id, 0);
  assert_eq!(found[1].id, 1);
  assert!(found[0].y < found[1].y);
  assert!(found[0].x < found[1].x);
}

#[test]
fn directory_to_json_lines_pipeline() {
  let dir = tempfile::tempdir().unwrap();
  let frames = dir.path().join("frames");
  std::fs::create_dir(&frames).unwrap();

  let mut tensor = quiet_tensor();
  plant(&mut tensor, 6, 6, 1, 6, 12.0);
  let bytes: Vec<u8> = tensor.iter().flat_map(|v| v.to_le_bytes()).collect();
  std::fs::write(frames.join("0001.bin"), bytes).unwrap();
  std::fs::write(frames.join("0002.json"), "[0.0, 1.0]").unwrap();
  std::fs::write(
    frames.join("0003.json"),
    serde_json::to_string(&quiet_tensor()).unwrap(),
  )
  .unwrap();

  let out = dir.path().join("detections.jsonl");
  let input =
    InputWrapper::from_url(&Url::parse(&format!("folder://{}", frames.display())).unwrap())
      .unwrap();
  let output =
    OutputWrapper::from_url(&Url::parse(&format!("jsonl://{}", out.display())).unwrap()).unwrap();
  let model = TinyYoloBuilder::from_url(&Url::parse("tinyyolo:voc?threshold=0.5").unwrap())
    .unwrap()
    .build();

  ContinuousTask::default()
    .run_task(input, model, output)
    .unwrap();

  let text = std::fs::read_to_string(&out).unwrap();
  let lines: Vec<serde_json::Value> = text
    .lines()
    .map(|l| serde_json::from_str(l).unwrap())
    .collect();
  assert_eq!(lines.len(), 2);
  assert_eq!(lines[0]["frame"], "0001.bin");
  assert_eq!(lines[0]["detections"][0]["label"], "car");
  assert_eq!(lines[1]["frame"], "0003.json");
  assert_eq!(lines[1]["count"], 0);
}
