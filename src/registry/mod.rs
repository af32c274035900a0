//! 股票名单、指数成分股与行业分类
//!
//! 名单文件为空白分隔的文本，每行一条记录。集合按键（代码的数字部分）去重，
//! 并保持插入顺序，读入后原样写回时行序不变。

pub mod exchange;

use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use crate::errors::{Result, DataStoreError};
use crate::models::stock::{code_key, StockBasicInfo, StockIndustryInfo, StockSuperiorInfo};

/// 可以写入名单文件的一行
pub trait ListEntry: Sized + Clone {
    fn key(&self) -> u32;
    fn from_fields(fields: &[String]) -> Result<Self>;
    fn to_line(&self) -> String;
}

impl ListEntry for StockBasicInfo {
    fn key(&self) -> u32 {
        self.key
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        StockBasicInfo::from_fields(fields)
    }

    fn to_line(&self) -> String {
        StockBasicInfo::to_line(self)
    }
}

impl ListEntry for StockSuperiorInfo {
    fn key(&self) -> u32 {
        self.key
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        StockSuperiorInfo::from_fields(fields)
    }

    fn to_line(&self) -> String {
        StockSuperiorInfo::to_line(self)
    }
}

impl ListEntry for StockIndustryInfo {
    fn key(&self) -> u32 {
        self.key
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        StockIndustryInfo::from_fields(fields)
    }

    fn to_line(&self) -> String {
        StockIndustryInfo::to_line(self)
    }
}

/// 按键去重、保持插入顺序的名单
#[derive(Debug, Clone)]
pub struct KeyedList<T: ListEntry> {
    entries: Vec<T>,
    // 索引用于快速查找
    key_index: HashMap<u32, usize>,
}

pub type StocksBasicInfo = KeyedList<StockBasicInfo>;
pub type StocksSuperiorInfo = KeyedList<StockSuperiorInfo>;
pub type StocksIndustryInfo = KeyedList<StockIndustryInfo>;

impl<T: ListEntry> Default for KeyedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ListEntry> KeyedList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            key_index: HashMap::new(),
        }
    }

    /// 已存在的键原位替换，否则追加到末尾
    pub fn add(&mut self, entry: T) {
        match self.key_index.get(&entry.key()) {
            Some(&idx) => self.entries[idx] = entry,
            None => {
                self.key_index.insert(entry.key(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn remove_key(&mut self, key: u32) -> Option<T> {
        let idx = self.key_index.remove(&key)?;
        let removed = self.entries.remove(idx);
        self.rebuild_indices();
        Some(removed)
    }

    /// 按代码删除，代码格式不合法时不做任何事
    pub fn remove(&mut self, code: &str) -> Option<T> {
        code_key(code).ok().and_then(|key| self.remove_key(key))
    }

    pub fn get(&self, key: u32) -> Option<&T> {
        self.key_index.get(&key).map(|&idx| &self.entries[idx])
    }

    pub fn get_by_code(&self, code: &str) -> Option<&T> {
        code_key(code).ok().and_then(|key| self.get(key))
    }

    pub fn contains_key(&self, key: u32) -> bool {
        self.key_index.contains_key(&key)
    }

    pub fn list(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn rebuild_indices(&mut self) {
        self.key_index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.key_index.insert(entry.key(), i);
        }
    }

    /// 由数据源返回的行构造
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Self> {
        let mut list = Self::new();
        for row in rows {
            list.add(T::from_fields(row)?);
        }
        Ok(list)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut list = Self::new();

        for (line_no, line) in contents.lines().enumerate() {
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if fields.is_empty() {
                continue;
            }
            let entry = T::from_fields(&fields).map_err(|e| {
                DataStoreError::DataError(format!("{}:{}: {}", path.display(), line_no + 1, e))
            })?;
            list.add(entry);
        }

        info!("Loaded {} entries from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut contents = String::new();
        for entry in &self.entries {
            contents.push_str(&entry.to_line());
            contents.push('\n');
        }
        fs::write(path, contents)?;

        info!("Saved {} entries to {}", self.len(), path.display());
        Ok(())
    }
}

/// 从全量名单中挑出成分股的基本信息
pub fn members_to_basic(members: &StocksSuperiorInfo, all: &StocksBasicInfo) -> StocksBasicInfo {
    let mut result = StocksBasicInfo::new();
    for member in members.list() {
        match all.get(member.key) {
            Some(info) => result.add(info.clone()),
            None => warn!("Key {} ({}) not in stock list", member.key, member.code),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn basic_rows() -> Vec<Vec<String>> {
        vec![
            row(&["sz.000001", "平安银行", "1991-04-03", "", "1", "1"]),
            row(&["sh.600000", "浦发银行", "1999-11-10", "", "1", "1"]),
            row(&["sh.000001", "上证综合指数", "1991-07-15", "", "2", "1"]),
            row(&["sz.000003", "PT金田A", "1991-07-03", "2002-06-14", "1", "0"]),
        ]
    }

    #[test]
    fn keyed_by_numeric_suffix() {
        // sz.000001 与 sh.000001 数字部分相同，后者原位替换前者
        let list = StocksBasicInfo::from_rows(&basic_rows()).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.list()[0].code, "sh.000001");
        assert_eq!(list.get(3).unwrap().out_date, 20020614);
    }

    #[test]
    fn save_and_load_preserve_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list").join("stock_all.list");
        let list = StocksBasicInfo::from_rows(&basic_rows()[1..]).unwrap();
        list.save_to_file(&path).unwrap();

        let loaded = StocksBasicInfo::load_from_file(&path).unwrap();
        let codes: Vec<&str> = loaded.list().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["sh.600000", "sh.000001", "sz.000003"]);
        assert_eq!(loaded.list(), list.list());
    }

    #[test]
    fn remove_rebuilds_index() {
        let mut list = StocksBasicInfo::from_rows(&basic_rows()[1..]).unwrap();
        assert!(list.remove("sh.600000").is_some());
        assert!(list.remove("bogus").is_none());
        assert_eq!(list.get(3).unwrap().code, "sz.000003");
        assert!(!list.contains_key(600000));
    }

    #[test]
    fn bad_line_reports_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.list");
        fs::write(&path, "sh.600000 浦发银行 19991110 20991231 1 1\nsh.600004 oops\n").unwrap();
        let err = StocksBasicInfo::load_from_file(&path).unwrap_err().to_string();
        assert!(err.contains("broken.list:2"));
    }

    #[test]
    fn members_map_to_basic_entries() {
        let all = StocksBasicInfo::from_rows(&basic_rows()[1..]).unwrap();
        let members = StocksSuperiorInfo::from_rows(&[
            row(&["2021-01-04", "sh.600000", "浦发银行"]),
            row(&["2021-01-04", "sh.600036", "招商银行"]),
        ])
        .unwrap();
        let basic = members_to_basic(&members, &all);
        assert_eq!(basic.len(), 1);
        assert_eq!(basic.list()[0].code_name, "浦发银行");
    }
}
