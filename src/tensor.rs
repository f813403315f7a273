// 该文件是 Luzhen （路诊） 项目的一部分。
// src/tensor.rs - 原始输出张量视图
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

use thiserror::Error;

/// 原始输出张量的内存布局。
///
/// 两种布局的长度完全一致，从形状上无法区分，选错只会得到
/// 错误的框而不会报错，因此必须由调用方显式指定，不做猜测。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
  /// `[锚点][通道]`，逐锚点连续
  AnchorMajor,
  /// `[通道][锚点]`，转置导出
  ChannelMajor,
}

/// 模型输出坐标所在的坐标空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordSpace {
  /// 坐标归一化到 [0, 1]，需乘以图像尺寸
  Normalized,
  /// 坐标已是像素值
  Pixel,
}

#[derive(Error, Debug)]
#[error("原始缓冲区长度 {len} 不是步长 {stride} 的整数倍")]
pub struct ShapeError {
  pub len: usize,
  pub stride: usize,
}

/// 推理引擎原始输出的只读视图。
///
/// 每个锚点占 stride = 5 + 类别数 个浮点：
/// 中心 x、中心 y、宽、高、objectness、各类别分数。
#[derive(Debug, Clone, Copy)]
pub struct RawDetections<'a> {
  data: &'a [f32],
  layout: TensorLayout,
  stride: usize,
  num_anchors: usize,
}

impl<'a> RawDetections<'a> {
  pub fn new(
    data: &'a [f32],
    layout: TensorLayout,
    num_classes: usize,
  ) -> Result<Self, ShapeError> {
    let stride = 5 + num_classes;
    if data.len() % stride != 0 {
      return Err(ShapeError {
        len: data.len(),
        stride,
      });
    }

    Ok(Self {
      data,
      layout,
      stride,
      num_anchors: data.len() / stride,
    })
  }

  pub fn num_anchors(&self) -> usize {
    self.num_anchors
  }

  pub fn stride(&self) -> usize {
    self.stride
  }

  pub fn layout(&self) -> TensorLayout {
    self.layout
  }

  /// 读取指定锚点的某个通道，按布局寻址
  #[inline]
  pub fn value(&self, anchor: usize, channel: usize) -> f32 {
    match self.layout {
      TensorLayout::AnchorMajor => self.data[anchor * self.stride + channel],
      TensorLayout::ChannelMajor => self.data[channel * self.num_anchors + anchor],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_length_not_multiple_of_stride() {
    // 3 类 → 步长 8，长度 10 不可整除
    let raw = vec![0.0f32; 10];
    let err = RawDetections::new(&raw, TensorLayout::AnchorMajor, 3).unwrap_err();
    assert_eq!(err.len, 10);
    assert_eq!(err.stride, 8);
  }

  #[test]
  fn empty_buffer_means_zero_anchors() {
    let view = RawDetections::new(&[], TensorLayout::AnchorMajor, 3).unwrap();
    assert_eq!(view.num_anchors(), 0);
  }

  #[test]
  fn channel_major_addresses_transposed_export() {
    // 两个锚点、2 类（步长 7）；anchor-major 与其转置应读出相同值
    let anchor_major: Vec<f32> = (0..14).map(|v| v as f32).collect();
    let mut channel_major = vec![0.0f32; 14];
    for anchor in 0..2 {
      for channel in 0..7 {
        channel_major[channel * 2 + anchor] = anchor_major[anchor * 7 + channel];
      }
    }

    let a = RawDetections::new(&anchor_major, TensorLayout::AnchorMajor, 2).unwrap();
    let b = RawDetections::new(&channel_major, TensorLayout::ChannelMajor, 2).unwrap();

    for anchor in 0..2 {
      for channel in 0..7 {
        assert_eq!(a.value(anchor, channel), b.value(anchor, channel));
      }
    }
  }
}
