use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use crate::codec::{decode_daily_row, decode_intraday_row, Decoded, RawRow, Record};
use crate::config::Config;
use crate::errors::Result;
use crate::models::bar::{DailyBar, IntradayBar, SeriesKind};
use crate::models::stock::StockBasicInfo;
use crate::registry::StocksBasicInfo;
use crate::sources::base::{DataSource, Session};
use crate::store::SeriesFile;
use crate::util;

/// 根据文件最后一条记录得出的续传状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResumeState {
    /// 文件不存在或为空，从 `NEW_FILE_DATE` 开始全量获取
    NeedsFullFetch,
    /// 文件最后一条记录的交易日
    HasLastDate(u32),
    /// 最后一条记录不早于今天，无需获取
    UpToDate(u32),
}

impl ResumeState {
    /// 本次获取窗口的起始日期（YYMMDD）
    pub fn resume_date(&self) -> u32 {
        match self {
            ResumeState::NeedsFullFetch => util::NEW_FILE_DATE,
            ResumeState::HasLastDate(date) | ResumeState::UpToDate(date) => *date,
        }
    }

    /// 只有严格晚于该日期的记录才会被追加
    fn accepts(&self, date_num: u32) -> bool {
        match self {
            ResumeState::NeedsFullFetch => date_num >= util::NEW_FILE_DATE,
            ResumeState::HasLastDate(last) | ResumeState::UpToDate(last) => date_num > *last,
        }
    }
}

/// 由文件尾部得出续传状态
pub fn resume_state<R: Record>(file: &SeriesFile<R>, today: &NaiveDate) -> Result<ResumeState> {
    let last = match file.last_record()? {
        Some(record) => record.date_num(),
        None => return Ok(ResumeState::NeedsFullFetch),
    };
    if util::calendar_days(today, last)? <= 0 {
        Ok(ResumeState::UpToDate(last))
    } else {
        Ok(ResumeState::HasLastDate(last))
    }
}

/// 单只股票单个序列的更新结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub code: String,
    pub kind: SeriesKind,
    pub state: ResumeState,
    /// 数据源返回的行数
    pub fetched: usize,
    pub appended: usize,
    /// 与已有数据重叠或乱序而被丢弃的行数
    pub skipped: usize,
    /// 追加的记录中解析失败的条数
    pub data_errors: usize,
}

impl UpdateReport {
    fn new(code: &str, kind: SeriesKind, state: ResumeState) -> Self {
        Self {
            code: code.to_string(),
            kind,
            state,
            fetched: 0,
            appended: 0,
            skipped: 0,
            data_errors: 0,
        }
    }
}

/// 一次批量更新的汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub updated: usize,
    pub delisted_skipped: usize,
    pub kd_appended: usize,
    pub k5_appended: usize,
    /// 失败的股票代码与原因
    pub failures: Vec<(String, String)>,
}

/// 增量更新服务
pub struct UpdateService {
    config: Config,
    source: Arc<dyn DataSource>,
}

impl UpdateService {
    pub fn new(config: Config, source: Arc<dyn DataSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 读取配置中的更新名单
    pub fn load_update_list(&self) -> Result<StocksBasicInfo> {
        StocksBasicInfo::load_from_file(self.config.list_path(&self.config.update_list)?)
    }

    pub async fn update_kd(&self, session: &Session, code: &str, today: NaiveDate) -> Result<UpdateReport> {
        self.update_series::<DailyBar>(session, code, today, decode_daily_row).await
    }

    pub async fn update_k5(&self, session: &Session, code: &str, today: NaiveDate) -> Result<UpdateReport> {
        self.update_series::<IntradayBar>(session, code, today, decode_intraday_row).await
    }

    async fn update_series<R: Record>(
        &self,
        session: &Session,
        code: &str,
        today: NaiveDate,
        decode: fn(&[String]) -> Decoded<R>,
    ) -> Result<UpdateReport> {
        let file = SeriesFile::<R>::new(self.config.series_path(code, R::KIND)?);
        let state = resume_state(&file, &today)?;
        let mut report = UpdateReport::new(code, R::KIND, state);

        if let ResumeState::UpToDate(last) = state {
            debug!("{} {} is up to date ({:06})", code, R::KIND, last);
            return Ok(report);
        }

        let start = util::yymmdd_to_date(state.resume_date())?;
        debug!("{} {} fetch window [{}, {}]", code, R::KIND, start, today);
        let rows = self.fetch_rows(session, code, R::KIND, start, today).await?;
        report.fetched = rows.len();

        let (records, data_errors) = decode_batch(code, &rows, decode);
        let (records, skipped) = select_new(records, &state);
        report.skipped = skipped;
        report.data_errors = records.iter().filter(|(_, bad)| *bad).count();
        if data_errors > report.data_errors {
            debug!("{} {} dropped {} malformed rows outside the window",
                   code, R::KIND, data_errors - report.data_errors);
        }

        let records: Vec<R> = records.into_iter().map(|(record, _)| record).collect();
        if R::KIND == SeriesKind::Intraday {
            warn_partial_days(code, &records);
        }
        report.appended = file.append(&records)?;
        Ok(report)
    }

    async fn fetch_rows(
        &self,
        session: &Session,
        code: &str,
        kind: SeriesKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        match kind {
            SeriesKind::Daily => self.source.fetch_daily(session, code, start, end).await,
            SeriesKind::Intraday => self.source.fetch_intraday(session, code, start, end).await,
        }
    }

    /// 批量更新，登录一次，单只股票失败不影响其余股票
    pub async fn update_all(
        &self,
        entries: &[StockBasicInfo],
        kd: bool,
        k5: bool,
        today: NaiveDate,
    ) -> Result<BatchSummary> {
        let entries = if self.config.debug_mode {
            &entries[..entries.len().min(self.config.debug_stock_limit)]
        } else {
            entries
        };

        let session = self.source.login().await?;
        info!("Login {} at {}", session.source, session.opened_at);

        let mut summary = BatchSummary { total: entries.len(), ..Default::default() };
        for (i, entry) in entries.iter().enumerate() {
            if !entry.is_listing() {
                debug!("({}/{}) {} delisted, skip", i + 1, entries.len(), entry.code);
                summary.delisted_skipped += 1;
                continue;
            }

            let mut failed = false;
            if kd {
                match self.update_kd(&session, &entry.code, today).await {
                    Ok(report) => {
                        summary.kd_appended += report.appended;
                        info!("({}/{}) {} Update kd finished, {} appended",
                              i + 1, entries.len(), entry.code, report.appended);
                    }
                    Err(e) => {
                        error!("({}/{}) {} Update kd failed: {}", i + 1, entries.len(), entry.code, e);
                        summary.failures.push((entry.code.clone(), e.to_string()));
                        failed = true;
                    }
                }
            }
            if k5 {
                match self.update_k5(&session, &entry.code, today).await {
                    Ok(report) => {
                        summary.k5_appended += report.appended;
                        info!("({}/{}) {} Update k5 finished, {} appended",
                              i + 1, entries.len(), entry.code, report.appended);
                    }
                    Err(e) => {
                        error!("({}/{}) {} Update k5 failed: {}", i + 1, entries.len(), entry.code, e);
                        summary.failures.push((entry.code.clone(), e.to_string()));
                        failed = true;
                    }
                }
            }
            if !failed {
                summary.updated += 1;
            }
        }

        self.source.logout(session).await?;
        info!("Update finished: {} updated, {} delisted, {} failed",
              summary.updated, summary.delisted_skipped, summary.failures.len());
        Ok(summary)
    }
}

/// 解码整批数据并按时间排序，返回记录及其是否为数据错误
fn decode_batch<R: Record>(
    code: &str,
    rows: &[RawRow],
    decode: fn(&[String]) -> Decoded<R>,
) -> (Vec<(R, bool)>, usize) {
    let mut data_errors = 0;
    let mut records: Vec<(R, bool)> = rows
        .iter()
        .map(|row| {
            let decoded = decode(row);
            if decoded.is_data_error() {
                data_errors += 1;
                warn!("{} {} data error in fields {:?}: {:?}",
                      code, R::KIND, decoded.invalid_fields, row);
            }
            let bad = decoded.is_data_error();
            (decoded.record, bad)
        })
        .collect();

    // 5分钟线数据源不保证顺序
    if R::KIND == SeriesKind::Intraday {
        records.sort_by_key(|(record, _)| record.time_key());
    }
    (records, data_errors)
}

/// 丢弃不晚于续传日期的记录以及批内时间不递增的记录
fn select_new<R: Record>(records: Vec<(R, bool)>, state: &ResumeState) -> (Vec<(R, bool)>, usize) {
    let mut selected: Vec<(R, bool)> = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (record, bad) in records {
        if !state.accepts(record.date_num()) {
            skipped += 1;
            continue;
        }
        if let Some((prev, _)) = selected.last() {
            if record.time_key() <= prev.time_key() {
                warn!("{} record {} is not after {}, dropped", R::KIND, record.time_key(), prev.time_key());
                skipped += 1;
                continue;
            }
        }
        selected.push((record, bad));
    }
    (selected, skipped)
}

fn warn_partial_days<R: Record>(code: &str, records: &[R]) {
    let mut start = 0;
    while start < records.len() {
        let date = records[start].date_num();
        let len = records[start..].iter().take_while(|r| r.date_num() == date).count();
        if len != IntradayBar::BARS_PER_DAY {
            warn!("Data seems wrong: {} has {} k5 bars on {:06}", code, len, date);
        }
        start += len;
    }
}
