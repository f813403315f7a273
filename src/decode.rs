// 该文件是 Luzhen （路诊） 项目的一部分。
// src/decode.rs - 原始输出解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::debug;

use crate::{
  classes::ClassTable,
  geometry::BBox,
  tensor::{CoordSpace, RawDetections, ShapeError, TensorLayout},
};

/// 置信度合理性上界，超出视为锚点数据损坏
const SCORE_SANITY_LIMIT: f32 = 1e4;

/// 解码得到的候选框，像素坐标，已截断到图像范围内
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: usize,
}

/// 解码配置
#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
  /// 张量内存布局
  pub layout: TensorLayout,
  /// 坐标空间
  pub coord_space: CoordSpace,
  /// 最小检测框边长（像素），过小的框按噪声丢弃
  pub min_box_size: f32,
}

impl Default for DecodeConfig {
  fn default() -> Self {
    Self {
      layout: TensorLayout::AnchorMajor,
      coord_space: CoordSpace::Normalized,
      min_box_size: 50.0,
    }
  }
}

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("无效的缓冲区形状: {0}")]
  Shape(#[from] ShapeError),
  #[error("无效的图像尺寸: {width}x{height}")]
  ImageSize { width: u32, height: u32 },
}

/// 将原始输出缓冲区解码为候选框列表。
///
/// 结构性错误（缓冲区形状、图像尺寸）返回 Err；
/// 单个锚点数据异常只跳过该锚点，不中断整批。
/// 空缓冲区是合法输入，得到空候选列表。
pub fn decode(
  raw: &[f32],
  width: u32,
  height: u32,
  table: &ClassTable,
  config: &DecodeConfig,
) -> Result<Vec<Candidate>, DecodeError> {
  if width == 0 || height == 0 {
    return Err(DecodeError::ImageSize { width, height });
  }

  let view = RawDetections::new(raw, config.layout, table.len())?;
  let (img_w, img_h) = (width as f32, height as f32);
  let (scale_x, scale_y) = match config.coord_space {
    CoordSpace::Normalized => (img_w, img_h),
    CoordSpace::Pixel => (1.0, 1.0),
  };

  let mut candidates = Vec::new();
  let mut skipped = 0usize;

  for anchor in 0..view.num_anchors() {
    let cx = view.value(anchor, 0) * scale_x;
    let cy = view.value(anchor, 1) * scale_y;
    let w = view.value(anchor, 2) * scale_x;
    let h = view.value(anchor, 3) * scale_y;
    let obj_conf = view.value(anchor, 4);

    // 在有限的类别分数中取最大值
    let mut best: Option<(usize, f32)> = None;
    for class_id in 0..table.len() {
      let score = view.value(anchor, 5 + class_id);
      if !score.is_finite() {
        continue;
      }
      if best.is_none_or(|(_, s)| score > s) {
        best = Some((class_id, score));
      }
    }
    let Some((class_id, class_score)) = best else {
      // 分数向量全部无效，跳过该锚点
      skipped += 1;
      continue;
    };

    if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
      skipped += 1;
      continue;
    }

    let spec = table.spec(class_id);
    let conf = obj_conf * class_score * spec.penalty;
    // 置信度为负或离谱的锚点按损坏数据丢弃，截断会伪造检测
    if !conf.is_finite() || conf < 0.0 || conf > SCORE_SANITY_LIMIT {
      skipped += 1;
      continue;
    }

    if conf < spec.threshold {
      continue;
    }

    let bbox = BBox::from_center(cx, cy, w, h).clip(img_w, img_h);
    if bbox.width() < config.min_box_size || bbox.height() < config.min_box_size {
      continue;
    }

    candidates.push(Candidate {
      bbox,
      score: conf,
      class_id,
    });
  }

  if skipped > 0 {
    debug!("跳过 {} 个异常锚点", skipped);
  }
  debug!(
    "解码完成: {} 个锚点得到 {} 个候选框",
    view.num_anchors(),
    candidates.len()
  );

  Ok(candidates)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table() -> ClassTable {
    ClassTable::road_defects()
  }

  fn config() -> DecodeConfig {
    DecodeConfig::default()
  }

  /// 单个锚点（3 类，步长 8）：中心 (0.5, 0.5)，宽高 0.5
  fn one_anchor() -> Vec<f32> {
    vec![0.5, 0.5, 0.5, 0.5, 0.9, 0.8, 0.1, 0.1]
  }

  #[test]
  fn rejects_buffer_not_multiple_of_stride() {
    let raw = vec![0.0f32; 10];
    let err = decode(&raw, 640, 640, &table(), &config()).unwrap_err();
    assert!(matches!(err, DecodeError::Shape(_)));
  }

  #[test]
  fn rejects_zero_image_dimensions() {
    let raw = one_anchor();
    let err = decode(&raw, 0, 640, &table(), &config()).unwrap_err();
    assert!(matches!(err, DecodeError::ImageSize { .. }));
  }

  #[test]
  fn empty_buffer_yields_empty_candidates() {
    let out = decode(&[], 640, 640, &table(), &config()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn decodes_single_anchor() {
    let raw = one_anchor();
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert_eq!(out.len(), 1);

    let cand = &out[0];
    assert_eq!(cand.class_id, 0);
    // 0.9 × 0.8 × 1.0
    assert!((cand.score - 0.72).abs() < 1e-6);
    assert_eq!(cand.bbox, BBox::new(160.0, 160.0, 480.0, 480.0));
  }

  #[test]
  fn channel_major_matches_anchor_major() {
    // 两个锚点，先按 anchor-major 排列再手工转置
    let anchor_major = [one_anchor(), vec![0.3, 0.3, 0.4, 0.4, 0.8, 0.1, 0.9, 0.1]].concat();
    let mut channel_major = vec![0.0f32; anchor_major.len()];
    for anchor in 0..2 {
      for channel in 0..8 {
        channel_major[channel * 2 + anchor] = anchor_major[anchor * 8 + channel];
      }
    }

    let a = decode(&anchor_major, 640, 640, &table(), &config()).unwrap();
    let transposed = DecodeConfig {
      layout: TensorLayout::ChannelMajor,
      ..config()
    };
    let b = decode(&channel_major, 640, 640, &table(), &transposed).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn pixel_space_export_skips_rescale() {
    let mut raw = one_anchor();
    raw[0] = 320.0;
    raw[1] = 320.0;
    raw[2] = 320.0;
    raw[3] = 320.0;
    let cfg = DecodeConfig {
      coord_space: CoordSpace::Pixel,
      ..config()
    };
    let out = decode(&raw, 640, 640, &table(), &cfg).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].bbox, BBox::new(160.0, 160.0, 480.0, 480.0));
  }

  #[test]
  fn skips_anchor_with_non_finite_geometry() {
    let mut raw = one_anchor();
    raw[0] = f32::NAN;
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn skips_anchor_with_all_non_finite_scores() {
    let mut raw = one_anchor();
    raw[5] = f32::NAN;
    raw[6] = f32::INFINITY;
    raw[7] = f32::NEG_INFINITY;
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn rejects_negative_confidence_instead_of_clamping() {
    let mut raw = one_anchor();
    raw[4] = -0.9;
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn applies_per_class_threshold() {
    // 0.9 × 0.54 = 0.486 < 0.5
    let mut raw = one_anchor();
    raw[5] = 0.54;
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn applies_class_penalty_to_confidence() {
    // 最高分落在 damage（惩罚 0.90）：0.9 × 0.8 × 0.9 = 0.648
    let raw = vec![0.5, 0.5, 0.5, 0.5, 0.9, 0.1, 0.1, 0.8];
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].class_id, 2);
    assert!((out[0].score - 0.648).abs() < 1e-6);
  }

  #[test]
  fn filters_boxes_below_minimum_size() {
    // 宽 0.05 × 640 = 32 像素 < 50
    let raw = vec![0.5, 0.5, 0.05, 0.5, 0.9, 0.8, 0.1, 0.1];
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn clips_boxes_to_image_bounds() {
    // 中心贴边，框超出图像
    let raw = vec![0.05, 0.5, 0.5, 0.5, 0.9, 0.8, 0.1, 0.1];
    let out = decode(&raw, 640, 640, &table(), &config()).unwrap();
    assert_eq!(out.len(), 1);
    let bbox = out[0].bbox;
    assert!(bbox.x1 >= 0.0 && bbox.x2 <= 640.0);
    assert!(bbox.y1 >= 0.0 && bbox.y2 <= 640.0);
  }
}
