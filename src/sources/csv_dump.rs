use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, info};
use std::path::{Path, PathBuf};
use crate::codec::RawRow;
use crate::errors::{Result, DataStoreError};
use crate::models::bar::SeriesKind;
use crate::models::stock::IndexKind;
use crate::sources::base::{DataSource, Session};
use crate::util;

/// 从导出的CSV文件读取行情的数据源，用于离线导入与回放
///
/// 目录结构：
/// - `{code}.kd.csv` / `{code}.k5.csv`：带表头，列顺序与查询字段一致
/// - `stock_basic.csv`、`industry.csv`
/// - `sz50.csv`、`hs300.csv`、`zz500.csv`
pub struct CsvDumpSource {
    dir: PathBuf,
}

impl CsvDumpSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 读取整个文件，文件不存在时返回空
    fn read_rows(&self, file_name: &str) -> Result<Vec<RawRow>> {
        let path = self.dir.join(file_name);
        if !path.exists() {
            debug!("No dump file {}", path.display());
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|field| field.to_string()).collect());
        }
        Ok(rows)
    }

    /// 按首列日期过滤到闭区间；日期无法识别的行原样保留，交给解码环节处理
    fn read_series(
        &self,
        code: &str,
        kind: SeriesKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        let start = util::date_to_yymmdd(&start);
        let end = util::date_to_yymmdd(&end);
        let rows = self.read_rows(&format!("{}.{}.csv", code, kind.file_tag()))?;

        let date_of = |raw: &str| match kind {
            SeriesKind::Daily => util::normalize_date(raw),
            SeriesKind::Intraday => util::normalize_time(raw).map(util::time_to_date_num),
        };

        Ok(rows
            .into_iter()
            .filter(|row| {
                match row.first().and_then(|raw| date_of(raw.as_str())) {
                    Some(date) => start <= date && date <= end,
                    None => true,
                }
            })
            .collect())
    }
}

#[async_trait]
impl DataSource for CsvDumpSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn login(&self) -> Result<Session> {
        if !self.dir.is_dir() {
            return Err(DataStoreError::ConfigError(format!(
                "Dump directory not found: {}", self.dir.display()
            )));
        }
        info!("Reading market data dumps from {}", self.dir.display());
        Ok(Session::open(self.name()))
    }

    async fn logout(&self, _session: Session) -> Result<()> {
        Ok(())
    }

    async fn fetch_daily(
        &self,
        _session: &Session,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        self.read_series(code, SeriesKind::Daily, start, end)
    }

    async fn fetch_intraday(
        &self,
        _session: &Session,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        self.read_series(code, SeriesKind::Intraday, start, end)
    }

    async fn fetch_stock_basic(&self, _session: &Session) -> Result<Vec<RawRow>> {
        self.read_rows("stock_basic.csv")
    }

    async fn fetch_industry(&self, _session: &Session) -> Result<Vec<RawRow>> {
        self.read_rows("industry.csv")
    }

    async fn fetch_constituents(&self, _session: &Session, kind: IndexKind) -> Result<Vec<RawRow>> {
        self.read_rows(&format!("{}.csv", kind.tag()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn filters_daily_rows_by_inclusive_window() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("sz.000001.kd.csv"),
            "date,open,close\n2020-12-31,1,1\n2021-01-04,2,2\n2021-01-05,3,3\n2021-01-06,4,4\n",
        )
        .unwrap();

        let source = CsvDumpSource::new(dir.path());
        let session = source.login().await.unwrap();
        let rows = source
            .fetch_daily(&session, "sz.000001", day(2021, 1, 4), day(2021, 1, 5))
            .await
            .unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(dates, vec!["2021-01-04", "2021-01-05"]);
    }

    #[tokio::test]
    async fn intraday_rows_use_the_trade_date() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("sh.600000.k5.csv"),
            "time,open\n20210104093500000,1\n20210105093500000,2\n",
        )
        .unwrap();

        let source = CsvDumpSource::new(dir.path());
        let session = source.login().await.unwrap();
        let rows = source
            .fetch_intraday(&session, "sh.600000", day(2021, 1, 5), day(2021, 1, 5))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "20210105093500000");
    }

    #[tokio::test]
    async fn missing_files_are_empty_and_missing_dir_fails_login() {
        let dir = tempdir().unwrap();
        let source = CsvDumpSource::new(dir.path());
        let session = source.login().await.unwrap();
        assert!(source.fetch_stock_basic(&session).await.unwrap().is_empty());

        let missing = CsvDumpSource::new(dir.path().join("nope"));
        assert!(matches!(missing.login().await, Err(DataStoreError::ConfigError(_))));
    }
}
