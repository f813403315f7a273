// 该文件是 Luzhen （路诊） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};

use crate::{classes::ClassTable, suppress::Detection};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BORDER_THICKNESS: i32 = 2;
const FALLBACK_COLOR: [u8; 3] = [255, 0, 255]; // 类别表之外的品红

/// 在照片上绘制检测框与标签。
///
/// 边框颜色取自类别表；未提供字体时只画边框不写标签。
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontVec) -> Self {
    self.font = Some(font);
    self
  }

  /// 绘制全部检测框
  pub fn draw_detections(&self, image: &mut RgbImage, table: &ClassTable, detections: &[Detection]) {
    for det in detections {
      self.draw_one(image, table, det);
    }
  }

  fn draw_one(&self, image: &mut RgbImage, table: &ClassTable, det: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let color = table
      .get(det.class_id)
      .map(|spec| spec.color)
      .unwrap_or(FALLBACK_COLOR);

    let x_min = (det.bbox.x1.floor() as i32).clamp(0, w - 1);
    let y_min = (det.bbox.y1.floor() as i32).clamp(0, h - 1);
    let x_max = (det.bbox.x2.ceil() as i32).clamp(0, w - 1);
    let y_max = (det.bbox.y2.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 绘制边框
    for thickness in 0..BORDER_THICKNESS {
      let x_min_t = (x_min + thickness).min(w - 1);
      let y_min_t = (y_min + thickness).min(h - 1);
      let x_max_t = (x_max - thickness).max(0);
      let y_max_t = (y_max - thickness).max(0);

      for x in x_min_t..=x_max_t {
        image.put_pixel(x as u32, y_min_t as u32, Rgb(color));
        image.put_pixel(x as u32, y_max_t as u32, Rgb(color));
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t as u32, y as u32, Rgb(color));
        image.put_pixel(x_max_t as u32, y as u32, Rgb(color));
      }
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{}: {:.2}", det.label, det.score);
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]);

    // 估算文本大小（粗略估计）
    let text_width = (label.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 标签放在边框上方，空间不足时贴着框内上沿
    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(color));

      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}
