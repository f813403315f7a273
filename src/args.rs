// 该文件是 Luzhen （路诊） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::{Parser, ValueEnum};

use luzhen::{CoordSpace, TensorLayout};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LayoutArg {
  /// [锚点][通道]，逐锚点连续
  AnchorMajor,
  /// [通道][锚点]，转置导出
  ChannelMajor,
}

impl From<LayoutArg> for TensorLayout {
  fn from(value: LayoutArg) -> Self {
    match value {
      LayoutArg::AnchorMajor => TensorLayout::AnchorMajor,
      LayoutArg::ChannelMajor => TensorLayout::ChannelMajor,
    }
  }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CoordArg {
  /// 坐标归一化到 [0, 1]
  Normalized,
  /// 坐标已是像素值
  Pixel,
}

impl From<CoordArg> for CoordSpace {
  fn from(value: CoordArg) -> Self {
    match value {
      CoordArg::Normalized => CoordSpace::Normalized,
      CoordArg::Pixel => CoordSpace::Pixel,
    }
  }
}

/// Luzhen 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 原始输出张量文件路径
  /// 支持格式:
  /// - JSON 浮点数组: *.json
  /// - 小端 f32 二进制: *.bin
  #[arg(long, value_name = "FILE")]
  pub tensor: String,

  /// 原始照片路径（用于获取尺寸与绘制叠加图）
  #[cfg(any(feature = "read_image_file", feature = "save_image_file"))]
  #[arg(long, value_name = "IMAGE")]
  pub image: Option<String>,

  /// 原始图像宽度（像素，未提供照片时必填）
  #[arg(long, value_name = "PIXELS")]
  pub width: Option<u32>,

  /// 原始图像高度（像素，未提供照片时必填）
  #[arg(long, value_name = "PIXELS")]
  pub height: Option<u32>,

  /// 张量内存布局（由模型导出方式决定，不做自动探测）
  #[arg(long, value_enum, default_value_t = LayoutArg::AnchorMajor)]
  pub layout: LayoutArg,

  /// 模型输出坐标空间
  #[arg(long, value_enum, default_value_t = CoordArg::Normalized)]
  pub coords: CoordArg,

  /// 类别名称（逗号分隔）；缺省使用内置路面病害类别表
  #[arg(long, value_name = "NAMES", value_delimiter = ',')]
  pub classes: Option<Vec<String>>,

  /// 置信度阈值 (0.0 - 1.0)，覆盖所有类别的默认阈值
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 类间抑制的重叠阈值，0 表示关闭类间规则
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD")]
  pub inter_class_overlap: f32,

  /// 最小检测框边长（像素）
  #[arg(long, default_value = "50", value_name = "PIXELS")]
  pub min_box_size: f32,

  /// 最大保留检测数
  #[arg(long, default_value = "10", value_name = "COUNT")]
  pub max_results: usize,

  /// 叠加图输出路径
  #[cfg(feature = "save_image_file")]
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<String>,

  /// 标签字体文件路径 (*.ttf)；缺省只画边框不写标签
  #[cfg(feature = "save_image_file")]
  #[arg(long, value_name = "FONT")]
  pub font: Option<String>,

  /// 检测记录输出目录
  #[cfg(feature = "directory_record")]
  #[arg(long, value_name = "DIR")]
  pub record: Option<String>,
}
