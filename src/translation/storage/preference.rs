//! 语言偏好存储
//!
//! 保存一个键值对：偏好键 → 语言代码。只在翻译过程完整结束或恢复原文后写入。

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::translation::config::TranslationConfig;
use crate::translation::error::helpers::preference_error;
use crate::translation::error::TranslationResult;

/// 偏好存储接口
pub trait PreferenceStore {
    fn load(&self) -> TranslationResult<Option<String>>;
    fn save(&self, code: &str) -> TranslationResult<()>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for &T {
    fn load(&self) -> TranslationResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, code: &str) -> TranslationResult<()> {
        (**self).save(code)
    }
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Box<T> {
    fn load(&self) -> TranslationResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, code: &str) -> TranslationResult<()> {
        (**self).save(code)
    }
}

/// 偏好文件内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// JSON 文件偏好存储
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
    key: String,
}

impl FilePreferenceStore {
    pub fn new<P: Into<PathBuf>>(path: P, key: &str) -> Self {
        Self {
            path: path.into(),
            key: key.to_string(),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(config.preference_path(), &config.preference_key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> TranslationResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| preference_error(format!("读取 {} 失败: {}", self.path.display(), e)))?;
        let record: PreferenceRecord = serde_json::from_str(&content)
            .map_err(|e| preference_error(format!("解析 {} 失败: {}", self.path.display(), e)))?;

        if record.key != self.key {
            tracing::debug!("偏好文件键 {} 与 {} 不一致，忽略", record.key, self.key);
            return Ok(None);
        }

        Ok(Some(record.value))
    }

    fn save(&self, code: &str) -> TranslationResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| preference_error(format!("创建目录失败: {}", e)))?;
            }
        }

        let record = PreferenceRecord {
            key: self.key.clone(),
            value: code.to_string(),
            updated_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| preference_error(format!("序列化偏好失败: {}", e)))?;

        fs::write(&self.path, content)
            .map_err(|e| preference_error(format!("写入 {} 失败: {}", self.path.display(), e)))?;

        tracing::debug!("语言偏好已保存: {}", code);
        Ok(())
    }
}

/// 内存偏好存储
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    value: RefCell<Option<String>>,
    saves: Cell<usize>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(code: &str) -> Self {
        Self {
            value: RefCell::new(Some(code.to_string())),
            saves: Cell::new(0),
        }
    }

    pub fn value(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// 写入次数
    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> TranslationResult<Option<String>> {
        Ok(self.value())
    }

    fn save(&self, code: &str) -> TranslationResult<()> {
        *self.value.borrow_mut() = Some(code.to_string());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::error::TranslationError;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("nested/preference.json"), "lang");

        assert_eq!(store.load().unwrap(), None);
        store.save("fr").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("fr"));

        store.save("de").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("de"));
    }

    #[test]
    fn test_file_store_ignores_other_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preference.json");
        FilePreferenceStore::new(&path, "other").save("es").unwrap();

        let store = FilePreferenceStore::new(&path, "lang");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_preference_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preference.json");
        fs::write(&path, "not json").unwrap();

        let result = FilePreferenceStore::new(&path, "lang").load();
        assert!(matches!(result, Err(TranslationError::PreferenceError(_))));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryPreferenceStore::with_value("it");
        assert_eq!(store.load().unwrap().as_deref(), Some("it"));

        store.save("pt").unwrap();
        assert_eq!(store.value().as_deref(), Some("pt"));
        assert_eq!(store.saves(), 1);
    }
}
