// 该文件是 Luzhen （路诊） 项目的一部分。
// src/output/record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{Datelike, Utc};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::suppress::Detection;

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 按日期分目录的检测记录输出。
///
/// 每张图像写一个 JSON 文档到 `<目录>/<年>/<月>/<日>/`，
/// 文件名带时分秒与进程内计数器。
pub struct DirectoryRecord {
  directory: PathBuf,
  counter: Mutex<u16>,
}

impl DirectoryRecord {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      counter: Mutex::new(0),
    }
  }

  fn record_id(&self) -> u16 {
    let mut counter = self.counter.lock().unwrap();
    let id = *counter + 1;
    *counter = id;
    id
  }

  fn record_path(&self) -> Result<PathBuf, RecordError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.json",
      now.format("%H-%M-%S"),
      self.record_id()
    )))
  }

  /// 写入一条检测记录，返回文件路径
  pub fn record(&self, source: &str, detections: &[Detection]) -> Result<PathBuf, RecordError> {
    let doc = json!({
      "source": source,
      "recorded_at": Utc::now().to_rfc3339(),
      "count": detections.len(),
      "detections": detections
        .iter()
        .map(|det| {
          json!({
            "label": det.label,
            "class_id": det.class_id,
            "score": det.score,
            "bbox": [det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2],
          })
        })
        .collect::<Vec<_>>(),
    });

    let path = self.record_path()?;
    std::fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
    debug!("检测记录已写入: {}", path.display());

    Ok(path)
  }
}
