// 该文件是 Luzhen （路诊） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use luzhen::{ClassTable, DecodeConfig, Detector, SuppressConfig};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  println!("Luzhen 路面病害检测后处理");
  println!("========================");
  println!("张量文件: {}", args.tensor);
  println!("内存布局: {:?}", args.layout);
  println!("NMS 阈值: {}", args.nms_threshold);
  println!();

  // 读取原始输出张量
  info!("读取张量文件...");
  let raw = load_tensor(&args.tensor)?;
  info!("张量读取完成: {} 个浮点", raw.len());

  // 确定原始图像尺寸
  let (width, height) = image_dimensions(&args)?;
  println!("图像尺寸: {}x{}", width, height);

  // 构造类别表与管线
  let mut table = match &args.classes {
    Some(names) => ClassTable::from_names(names.clone()).context("类别列表不能为空")?,
    None => ClassTable::road_defects(),
  };
  if let Some(confidence) = args.confidence {
    table = table.with_threshold(confidence);
  }

  let detector = Detector::new(table)
    .with_decode_config(DecodeConfig {
      layout: args.layout.into(),
      coord_space: args.coords.into(),
      min_box_size: args.min_box_size,
    })
    .with_suppress_config(SuppressConfig {
      iou_threshold: args.nms_threshold,
      max_results: args.max_results,
      inter_class_overlap: (args.inter_class_overlap > 0.0).then_some(args.inter_class_overlap),
      ..SuppressConfig::default()
    });

  // 解码 + 抑制
  info!("开始后处理...");
  let now = std::time::Instant::now();
  let detections = detector.process(&raw, width, height)?;
  info!("后处理完成，耗时: {:.2?}", now.elapsed());

  println!();
  println!("检测到 {} 个病害", detections.len());
  for det in &detections {
    println!(
      "  - {}: {:.2}% at ({:.0}, {:.0})-({:.0}, {:.0})",
      det.label,
      det.score * 100.0,
      det.bbox.x1,
      det.bbox.y1,
      det.bbox.x2,
      det.bbox.y2
    );
  }

  #[cfg(feature = "save_image_file")]
  if let Some(output) = &args.output {
    save_overlay(&args, &detector, &detections, output)?;
  }

  #[cfg(feature = "directory_record")]
  if let Some(dir) = &args.record {
    let record = luzhen::output::DirectoryRecord::new(dir);
    let path = record.record(&args.tensor, &detections)?;
    println!("检测记录: {}", path.display());
  }

  Ok(())
}

/// 读取张量文件；JSON 浮点数组或小端 f32 二进制
fn load_tensor(path: &str) -> Result<Vec<f32>> {
  let bytes = std::fs::read(path).with_context(|| format!("无法读取张量文件: {}", path))?;

  if path.to_lowercase().ends_with(".json") {
    let values: Vec<f32> =
      serde_json::from_slice(&bytes).with_context(|| format!("无法解析 JSON 张量: {}", path))?;
    return Ok(values);
  }

  if bytes.len() % 4 != 0 {
    anyhow::bail!("二进制张量长度 {} 不是 4 的整数倍: {}", bytes.len(), path);
  }
  Ok(
    bytes
      .chunks_exact(4)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect(),
  )
}

/// 原始图像尺寸：优先读取照片，否则使用 --width/--height
fn image_dimensions(args: &args::Args) -> Result<(u32, u32)> {
  #[cfg(any(feature = "read_image_file", feature = "save_image_file"))]
  if let Some(path) = &args.image {
    let (w, h) =
      image::image_dimensions(path).with_context(|| format!("无法读取照片尺寸: {}", path))?;
    return Ok((w, h));
  }

  match (args.width, args.height) {
    (Some(w), Some(h)) => Ok((w, h)),
    _ => anyhow::bail!("未提供照片时必须同时指定 --width 与 --height"),
  }
}

/// 在原始照片上绘制检测框并保存
#[cfg(feature = "save_image_file")]
fn save_overlay(
  args: &args::Args,
  detector: &Detector,
  detections: &[luzhen::Detection],
  output: &str,
) -> Result<()> {
  use luzhen::output::Draw;

  let image_path = args
    .image
    .as_ref()
    .context("绘制叠加图需要 --image 指定原始照片")?;
  let mut image = image::open(image_path)
    .with_context(|| format!("无法打开照片: {}", image_path))?
    .to_rgb8();

  let mut draw = Draw::default();
  if let Some(font_path) = &args.font {
    let font_data =
      std::fs::read(font_path).with_context(|| format!("无法读取字体文件: {}", font_path))?;
    let font = ab_glyph::FontVec::try_from_vec(font_data)
      .map_err(|e| anyhow::anyhow!("无法加载字体 {}: {}", font_path, e))?;
    draw = draw.with_font(font);
  }

  draw.draw_detections(&mut image, detector.table(), detections);
  image
    .save(output)
    .with_context(|| format!("无法保存叠加图: {}", output))?;
  println!("叠加图: {}", output);

  Ok(())
}
