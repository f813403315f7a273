// 该文件是 Luzhen （路诊） 项目的一部分。
// src/classes.rs - 病害类别表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;

/// 未单独配置阈值的类别使用的默认置信度阈值
pub const DEFAULT_FALLBACK_THRESHOLD: f32 = 0.7;

/// 按类别序号循环使用的绘制颜色
const CLASS_PALETTE: [[u8; 3]; 6] = [
  [255, 0, 0],   // 红
  [255, 255, 0], // 黄
  [0, 255, 255], // 青
  [255, 0, 255], // 品红
  [0, 255, 0],   // 绿
  [0, 0, 255],   // 蓝
];

/// 单个类别的配置
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSpec {
  /// 类别名称
  pub name: String,
  /// 置信度阈值
  pub threshold: f32,
  /// 置信度惩罚系数（乘性）
  pub penalty: f32,
  /// 类间抑制优先级，数值越小优先级越高
  pub priority: u8,
  /// 绘制颜色
  pub color: [u8; 3],
}

#[derive(Error, Debug)]
#[error("类别表不能为空")]
pub struct EmptyClassTable;

/// 有序类别表，下标即类别序号，表长决定张量步长
#[derive(Debug, Clone)]
pub struct ClassTable {
  specs: Box<[ClassSpec]>,
}

impl ClassTable {
  pub fn new(specs: Vec<ClassSpec>) -> Result<Self, EmptyClassTable> {
    if specs.is_empty() {
      return Err(EmptyClassTable);
    }
    Ok(Self {
      specs: specs.into_boxed_slice(),
    })
  }

  /// 仅由名称构造类别表；阈值取默认值，惩罚为 1.0，
  /// 优先级按出现顺序递增
  pub fn from_names<I, S>(names: I) -> Result<Self, EmptyClassTable>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let specs: Vec<ClassSpec> = names
      .into_iter()
      .enumerate()
      .map(|(idx, name)| ClassSpec {
        name: name.into(),
        threshold: DEFAULT_FALLBACK_THRESHOLD,
        penalty: 1.0,
        priority: idx as u8,
        color: CLASS_PALETTE[idx % CLASS_PALETTE.len()],
      })
      .collect();
    Self::new(specs)
  }

  /// 路面病害默认类别表：裂缝、修补、破损
  pub fn road_defects() -> Self {
    let specs = vec![
      ClassSpec {
        name: "crack".to_string(),
        threshold: 0.50,
        penalty: 1.00,
        priority: 0,
        color: CLASS_PALETTE[0],
      },
      ClassSpec {
        name: "patch".to_string(),
        threshold: 0.50,
        penalty: 0.95,
        priority: 1,
        color: CLASS_PALETTE[1],
      },
      ClassSpec {
        name: "damage".to_string(),
        threshold: 0.50,
        penalty: 0.90,
        priority: 2,
        color: CLASS_PALETTE[2],
      },
    ];
    Self {
      specs: specs.into_boxed_slice(),
    }
  }

  /// 将所有类别的置信度阈值替换为同一个值
  pub fn with_threshold(mut self, threshold: f32) -> Self {
    for spec in self.specs.iter_mut() {
      spec.threshold = threshold;
    }
    self
  }

  /// 类别数量，决定张量步长 5 + len
  pub fn len(&self) -> usize {
    self.specs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.specs.is_empty()
  }

  /// 每个锚点的浮点数量
  pub fn stride(&self) -> usize {
    5 + self.specs.len()
  }

  pub fn get(&self, class_id: usize) -> Option<&ClassSpec> {
    self.specs.get(class_id)
  }

  /// 取类别配置；class_id 由表长范围内的 argmax 产生，不会越界
  pub fn spec(&self, class_id: usize) -> &ClassSpec {
    &self.specs[class_id]
  }

  pub fn name(&self, class_id: usize) -> &str {
    &self.specs[class_id].name
  }

  pub fn iter(&self) -> impl Iterator<Item = &ClassSpec> {
    self.specs.iter()
  }
}

impl Default for ClassTable {
  fn default() -> Self {
    Self::road_defects()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_empty_table() {
    assert!(ClassTable::new(Vec::new()).is_err());
    assert!(ClassTable::from_names(Vec::<String>::new()).is_err());
  }

  #[test]
  fn stride_follows_class_count() {
    assert_eq!(ClassTable::road_defects().stride(), 8);
    let two = ClassTable::from_names(["crack", "patch"]).unwrap();
    assert_eq!(two.stride(), 7);
  }

  #[test]
  fn from_names_uses_fallback_threshold() {
    let table = ClassTable::from_names(["crack", "patch"]).unwrap();
    assert_eq!(table.spec(0).threshold, DEFAULT_FALLBACK_THRESHOLD);
    assert_eq!(table.spec(1).penalty, 1.0);
    assert_eq!(table.spec(1).priority, 1);
  }

  #[test]
  fn road_defects_keeps_legacy_constants() {
    let table = ClassTable::road_defects();
    assert_eq!(table.len(), 3);
    assert_eq!(table.name(0), "crack");
    assert_eq!(table.spec(1).penalty, 0.95);
    assert_eq!(table.spec(2).penalty, 0.90);
    assert!(table.spec(0).priority < table.spec(2).priority);
  }

  #[test]
  fn with_threshold_overrides_all_classes() {
    let table = ClassTable::road_defects().with_threshold(0.25);
    assert!(table.iter().all(|spec| spec.threshold == 0.25));
  }
}
