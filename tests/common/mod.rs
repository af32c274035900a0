#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use stock_datastore::codec::RawRow;
use stock_datastore::errors::{DataStoreError, Result};
use stock_datastore::models::stock::IndexKind;
use stock_datastore::sources::{DataSource, Session};

/// 内存中的数据源，返回预先放入的行并记录每次请求的窗口
#[derive(Default)]
pub struct MemorySource {
    pub daily: HashMap<String, Vec<RawRow>>,
    pub intraday: HashMap<String, Vec<RawRow>>,
    pub basic: Vec<RawRow>,
    pub industry: Vec<RawRow>,
    pub constituents: HashMap<IndexKind, Vec<RawRow>>,
    /// 这些代码的查询总是返回非临时错误
    pub broken: HashSet<String>,
    /// 前若干次查询返回临时错误
    pub transient_failures: AtomicU32,
    pub windows: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    pub logins: AtomicU32,
    pub logouts: AtomicU32,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_daily(mut self, code: &str, rows: Vec<RawRow>) -> Self {
        self.daily.insert(code.to_string(), rows);
        self
    }

    pub fn with_intraday(mut self, code: &str, rows: Vec<RawRow>) -> Self {
        self.intraday.insert(code.to_string(), rows);
        self
    }

    pub fn with_broken(mut self, code: &str) -> Self {
        self.broken.insert(code.to_string());
        self
    }

    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn windows(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.windows.lock().unwrap().clone()
    }

    fn check(&self, code: &str) -> Result<()> {
        let left = self.transient_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.transient_failures.store(left - 1, Ordering::SeqCst);
            return Err(DataStoreError::source_error("10002007", "network busy"));
        }
        if self.broken.contains(code) {
            return Err(DataStoreError::DataError(format!("no such code {}", code)));
        }
        Ok(())
    }

    fn series(
        &self,
        table: &HashMap<String, Vec<RawRow>>,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        self.check(code)?;
        self.windows.lock().unwrap().push((code.to_string(), start, end));
        Ok(table.get(code).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn login(&self) -> Result<Session> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(Session::open(self.name()))
    }

    async fn logout(&self, _session: Session) -> Result<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_daily(&self, _session: &Session, code: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawRow>> {
        self.series(&self.daily, code, start, end)
    }

    async fn fetch_intraday(&self, _session: &Session, code: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawRow>> {
        self.series(&self.intraday, code, start, end)
    }

    async fn fetch_stock_basic(&self, _session: &Session) -> Result<Vec<RawRow>> {
        Ok(self.basic.clone())
    }

    async fn fetch_industry(&self, _session: &Session) -> Result<Vec<RawRow>> {
        Ok(self.industry.clone())
    }

    async fn fetch_constituents(&self, _session: &Session, kind: IndexKind) -> Result<Vec<RawRow>> {
        Ok(self.constituents.get(&kind).cloned().unwrap_or_default())
    }
}

pub fn row(values: &[&str]) -> RawRow {
    values.iter().map(|v| v.to_string()).collect()
}

/// 一行完整的日线数据
pub fn daily_row(date: &str, close: &str) -> RawRow {
    row(&[
        date, "18.90", close, "19.12", "18.11", "4301411", "79888895.90", "3",
        "3.587307", "1", "1.053792", "17.07", "1.64", "7.13", "1.18", "0",
    ])
}

/// 一个交易日的48根5分钟线时间戳（17位）
pub fn session_times(date: &str) -> Vec<String> {
    let mut times = Vec::with_capacity(48);
    for (start, count) in [(9 * 60 + 35, 24), (13 * 60 + 5, 24)] {
        for i in 0..count {
            let minute = start + i * 5;
            times.push(format!("{}{:02}{:02}00000", date, minute / 60, minute % 60));
        }
    }
    times
}

pub fn intraday_rows(date: &str) -> Vec<RawRow> {
    session_times(date)
        .iter()
        .map(|time| row(&[time, "10.0", "10.1", "10.2", "9.9", "12000", "121200.0"]))
        .collect()
}
