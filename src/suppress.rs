// 该文件是 Luzhen （路诊） 项目的一部分。
// src/suppress.rs - 非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use crate::{
  classes::ClassTable,
  decode::Candidate,
  geometry::{BBox, iou},
};

/// 最终检测结果，按置信度降序
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: usize,
  /// 从类别表解析出的名称
  pub label: String,
}

/// 抑制配置
#[derive(Debug, Clone, Copy)]
pub struct SuppressConfig {
  /// 同类抑制的 IoU 阈值
  pub iou_threshold: f32,
  /// 跨类抑制的分数差阈值：重叠且弱得多的异类框一并去掉
  pub score_gap: f32,
  /// 最终保留的最大检测数
  pub max_results: usize,
  /// 类间抑制的重叠阈值；None 时关闭类间规则。
  /// 高优先级类别（如裂缝）在这一较松的界限下压制
  /// 与之重叠的低优先级类别（如修补），与分数差无关。
  pub inter_class_overlap: Option<f32>,
}

impl Default for SuppressConfig {
  fn default() -> Self {
    Self {
      iou_threshold: 0.5,
      score_gap: 0.10,
      max_results: 10,
      inter_class_overlap: Some(0.3),
    }
  }
}

/// 贪心 NMS，带可选的类间优先级抑制。
///
/// 在排序索引加抑制位图上进行，不做 O(n²) 的列表删除；
/// 同分候选保持输入顺序（稳定排序），调用方不应依赖同分次序。
pub fn suppress(
  candidates: &[Candidate],
  table: &ClassTable,
  config: &SuppressConfig,
) -> Vec<Detection> {
  // 按分数降序的索引序
  let mut order: Vec<usize> = (0..candidates.len()).collect();
  order.sort_by(|&a, &b| candidates[b].score.total_cmp(&candidates[a].score));

  let mut suppressed = vec![false; candidates.len()];
  let mut kept: Vec<usize> = Vec::new();

  for pos in 0..order.len() {
    let best_idx = order[pos];
    if suppressed[best_idx] {
      continue;
    }
    let best = &candidates[best_idx];
    kept.push(best_idx);

    for &other_idx in &order[pos + 1..] {
      if suppressed[other_idx] {
        continue;
      }
      let other = &candidates[other_idx];
      let overlap = iou(&best.bbox, &other.bbox);

      // 同类重叠，或跨类但分数相差悬殊
      let same_or_gap = overlap > config.iou_threshold
        && (best.class_id == other.class_id || best.score - other.score > config.score_gap);

      // 类间抑制：数值越小优先级越高
      let inter_class = config.inter_class_overlap.is_some_and(|bound| {
        overlap > bound && table.spec(best.class_id).priority < table.spec(other.class_id).priority
      });

      if same_or_gap || inter_class {
        suppressed[other_idx] = true;
      }
    }
  }

  // kept 本身已按分数降序
  kept.truncate(config.max_results);
  debug!("NMS: {} 个候选保留 {} 个", candidates.len(), kept.len());

  kept
    .into_iter()
    .map(|idx| {
      let cand = &candidates[idx];
      Detection {
        bbox: cand.bbox,
        score: cand.score,
        class_id: cand.class_id,
        label: table.name(cand.class_id).to_string(),
      }
    })
    .collect()
}
