// 该文件是 Luzhen （路诊） 项目的一部分。
// src/geometry.rs - 边界框几何
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 两个零面积框相交时避免除零
const IOU_EPSILON: f32 = 1e-6;

/// 轴对齐边界框，像素坐标，(x1, y1) 为左上角
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl BBox {
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  /// 从中心点与宽高构造边界框
  pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
    Self {
      x1: cx - w / 2.0,
      y1: cy - h / 2.0,
      x2: cx + w / 2.0,
      y2: cy + h / 2.0,
    }
  }

  pub fn width(&self) -> f32 {
    (self.x2 - self.x1).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.y2 - self.y1).max(0.0)
  }

  /// 面积；退化或翻转的框按零面积计，不会为负
  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 将四个角分别截断到 [0, width] × [0, height]
  pub fn clip(self, width: f32, height: f32) -> Self {
    Self {
      x1: self.x1.clamp(0.0, width),
      y1: self.y1.clamp(0.0, height),
      x2: self.x2.clamp(0.0, width),
      y2: self.y2.clamp(0.0, height),
    }
  }
}

/// 计算两个边界框的 IoU（交并比）
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  let inter_x1 = a.x1.max(b.x1);
  let inter_y1 = a.y1.max(b.y1);
  let inter_x2 = a.x2.min(b.x2);
  let inter_y2 = a.y2.min(b.y2);

  let inter = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
  inter / (a.area() + b.area() - inter + IOU_EPSILON)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iou_is_symmetric() {
    let a = BBox::new(0.0, 0.0, 100.0, 100.0);
    let b = BBox::new(50.0, 50.0, 150.0, 150.0);
    assert_eq!(iou(&a, &b), iou(&b, &a));
  }

  #[test]
  fn iou_of_identical_box_is_one() {
    let a = BBox::new(10.0, 20.0, 110.0, 220.0);
    assert!(iou(&a, &a) > 0.999);
    assert!(iou(&a, &a) <= 1.0);
  }

  #[test]
  fn iou_stays_within_unit_interval() {
    let boxes = [
      BBox::new(0.0, 0.0, 100.0, 100.0),
      BBox::new(50.0, 50.0, 150.0, 150.0),
      BBox::new(200.0, 200.0, 300.0, 300.0),
      BBox::new(0.0, 0.0, 1.0, 1.0),
    ];
    for a in &boxes {
      for b in &boxes {
        let v = iou(a, b);
        assert!((0.0..=1.0).contains(&v), "iou = {v}");
      }
    }
  }

  #[test]
  fn disjoint_boxes_have_zero_iou() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(100.0, 100.0, 110.0, 110.0);
    assert_eq!(iou(&a, &b), 0.0);
  }

  #[test]
  fn inverted_box_has_zero_area() {
    let a = BBox::new(100.0, 100.0, 0.0, 0.0);
    assert_eq!(a.area(), 0.0);
    // 两个零面积框相交时不应除零
    assert_eq!(iou(&a, &a), 0.0);
  }

  #[test]
  fn clip_limits_corners_to_image() {
    let clipped = BBox::new(-20.0, -5.0, 700.0, 500.0).clip(640.0, 480.0);
    assert_eq!(clipped, BBox::new(0.0, 0.0, 640.0, 480.0));
  }
}
