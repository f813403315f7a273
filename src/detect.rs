// 该文件是 Luzhen （路诊） 项目的一部分。
// src/detect.rs - 检测后处理管线
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
  decode::{DecodeConfig, DecodeError, decode},
  suppress::{Detection, SuppressConfig, suppress},
};

/// 解码 + 抑制的完整后处理管线。
///
/// 无跨调用状态，输出对同一输入与配置完全确定；
/// 各调用持有各自的缓冲区时可在多线程并发使用。
#[derive(Debug, Clone, Default)]
pub struct Detector {
  table: ClassTable,
  decode: DecodeConfig,
  suppress: SuppressConfig,
}

impl Detector {
  pub fn new(table: ClassTable) -> Self {
    Self {
      table,
      decode: DecodeConfig::default(),
      suppress: SuppressConfig::default(),
    }
  }

  pub fn with_decode_config(mut self, config: DecodeConfig) -> Self {
    self.decode = config;
    self
  }

  pub fn with_suppress_config(mut self, config: SuppressConfig) -> Self {
    self.suppress = config;
    self
  }

  pub fn table(&self) -> &ClassTable {
    &self.table
  }

  /// 对一张图像的原始输出执行解码与抑制。
  ///
  /// width/height 为原始照片（而非模型输入）的尺寸。
  /// 无检测不是错误，返回空列表。
  pub fn process(
    &self,
    raw: &[f32],
    width: u32,
    height: u32,
  ) -> Result<Vec<Detection>, DecodeError> {
    let candidates = decode(raw, width, height, &self.table, &self.decode)?;
    let detections = suppress(&candidates, &self.table, &self.suppress);
    debug!(
      "后处理完成: {} 个候选 → {} 个检测",
      candidates.len(),
      detections.len()
    );
    Ok(detections)
  }
}
