//! 每只股票每种序列一个只追加的定长记录文件
//!
//! 文件只会被追加，不会被截断或重写。读取时只通过从文件尾部反向定位读取最后
//! 若干条记录，文件长度不是记录长度整数倍时视为格式错误，绝不尝试部分解码。

use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use crate::codec::Record;
use crate::errors::{Result, DataStoreError};
use crate::models::bar::IntradayBar;

/// 按交易日（YYMMDD）过滤的闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub start: u32,
    pub end: u32,
}

impl DateBounds {
    pub const ALL: DateBounds = DateBounds { start: 0, end: 999_999 };

    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl Default for DateBounds {
    fn default() -> Self {
        Self::ALL
    }
}

/// 单个序列文件
#[derive(Debug, Clone)]
pub struct SeriesFile<R: Record> {
    path: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> SeriesFile<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_error(&self, reason: String) -> DataStoreError {
        DataStoreError::FormatError {
            path: self.path.display().to_string(),
            reason,
        }
    }

    /// 文件中的记录条数，文件不存在时为0
    pub fn record_count(&self) -> Result<u64> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let record_len = R::RECORD_LEN as u64;
        if size % record_len != 0 {
            return Err(self.format_error(format!(
                "size {} is not a multiple of {} record length {}", size, R::KIND, record_len
            )));
        }
        Ok(size / record_len)
    }

    /// 从文件尾部读取最后 `count` 条记录的原始字节
    fn read_tail_bytes(&self, count: u64) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        let byte_len = count * R::RECORD_LEN as u64;
        file.seek(SeekFrom::End(-(byte_len as i64)))?;

        let mut buf = Vec::with_capacity(byte_len as usize);
        file.read_to_end(&mut buf)?;
        if buf.len() as u64 != byte_len {
            return Err(self.format_error(format!(
                "expected {} bytes from tail, read {}", byte_len, buf.len()
            )));
        }
        Ok(buf)
    }

    /// 只解码最后一条记录
    pub fn last_record(&self) -> Result<Option<R>> {
        if self.record_count()? == 0 {
            return Ok(None);
        }
        let bytes = self.read_tail_bytes(1)?;
        Ok(Some(R::decode(&bytes)?))
    }

    /// 读取最后 `max_records` 条记录，并按交易日过滤到 `bounds` 内
    pub fn tail_read(&self, max_records: usize, bounds: DateBounds) -> Result<Vec<R>> {
        let total = self.record_count()?;
        let count = total.min(max_records as u64);
        if count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_tail_bytes(count)?;
        let mut records = Vec::with_capacity(count as usize);
        for chunk in bytes.chunks_exact(R::RECORD_LEN) {
            let record = R::decode(chunk)?;
            let date = record.date_num();
            if date < bounds.start {
                continue;
            }
            if date > bounds.end {
                break;
            }
            records.push(record);
        }

        debug!("Read {} of {} {} records from {}",
               records.len(), total, R::KIND, self.path.display());
        Ok(records)
    }

    /// 按顺序追加记录，文件不存在时创建
    pub fn append(&self, records: &[R]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        // 尾部残缺的文件继续追加会让之后所有记录错位
        self.record_count()?;

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            record.write_to(&mut writer)?;
        }
        writer.flush()?;
        Ok(records.len())
    }
}

/// 5分钟线按交易日分组的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayGroups {
    /// 每组正好48根
    pub days: Vec<Vec<IntradayBar>>,
    /// 不足一整天的记录条数
    pub remainder: usize,
}

/// 将连续的同一交易日记录分组，只保留完整的交易日
pub fn group_by_day(records: Vec<IntradayBar>, source: &Path) -> DayGroups {
    let mut groups = DayGroups::default();
    let mut current: Vec<IntradayBar> = Vec::with_capacity(IntradayBar::BARS_PER_DAY);

    let flush = |run: &mut Vec<IntradayBar>, groups: &mut DayGroups| {
        if run.is_empty() {
            return;
        }
        if run.len() == IntradayBar::BARS_PER_DAY {
            groups.days.push(std::mem::take(run));
        } else {
            warn!("Data seems wrong: {} has {} bars on {:06}",
                  source.display(), run.len(), run[0].date_num());
            groups.remainder += run.len();
            run.clear();
        }
    };

    for bar in records {
        if let Some(last) = current.last() {
            if last.date_num() != bar.date_num() || current.len() == IntradayBar::BARS_PER_DAY {
                flush(&mut current, &mut groups);
            }
        }
        current.push(bar);
    }
    flush(&mut current, &mut groups);
    groups
}

impl SeriesFile<IntradayBar> {
    /// 读取最后 `days` 个交易日的5分钟线
    pub fn tail_read_days(&self, days: usize, bounds: DateBounds) -> Result<DayGroups> {
        let records = self.tail_read(days.saturating_mul(IntradayBar::BARS_PER_DAY), bounds)?;
        Ok(group_by_day(records, &self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bar::{DailyBar, TradeStatus};
    use tempfile::tempdir;

    fn daily(date: u32) -> DailyBar {
        DailyBar {
            date,
            open: 10.0,
            close: 10.5,
            high: 10.8,
            low: 9.9,
            volume: 1000,
            amount: 10_500.0,
            adjust_flag: 3,
            turn: 0.5,
            trade_status: TradeStatus::On,
            pct_chg: 1.2,
            pe_ttm: 8.0,
            ps_ttm: 1.0,
            pcf_ncf_ttm: 2.0,
            pb_mrq: 0.9,
            is_st: false,
        }
    }

    fn day_bars(date: u32, count: usize) -> Vec<IntradayBar> {
        (0..count)
            .map(|i| IntradayBar {
                time: date * 10000 + 935 + i as u32,
                open: 1.0,
                close: 1.0,
                high: 1.0,
                low: 1.0,
                volume: 100,
                amount: 100.0,
            })
            .collect()
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = SeriesFile::<DailyBar>::new(dir.path().join("none.kd.dat"));
        assert_eq!(file.record_count().unwrap(), 0);
        assert!(file.last_record().unwrap().is_none());
        assert!(file.tail_read(10, DateBounds::ALL).unwrap().is_empty());
    }

    #[test]
    fn tail_read_returns_last_records_in_order() {
        let dir = tempdir().unwrap();
        let file = SeriesFile::<DailyBar>::new(dir.path().join("db").join("000001.kd.dat"));
        let bars: Vec<DailyBar> = (1..=10).map(|d| daily(210100 + d)).collect();
        assert_eq!(file.append(&bars).unwrap(), 10);

        let tail = file.tail_read(2, DateBounds::ALL).unwrap();
        assert_eq!(tail, vec![daily(210109), daily(210110)]);
        assert_eq!(file.last_record().unwrap(), Some(daily(210110)));
        assert_eq!(file.tail_read(100, DateBounds::ALL).unwrap().len(), 10);
    }

    #[test]
    fn tail_read_filters_by_bounds() {
        let dir = tempdir().unwrap();
        let file = SeriesFile::<DailyBar>::new(dir.path().join("000002.kd.dat"));
        let bars: Vec<DailyBar> = (1..=10).map(|d| daily(210100 + d)).collect();
        file.append(&bars).unwrap();

        let dates: Vec<u32> = file
            .tail_read(10, DateBounds::new(210103, 210105))
            .unwrap()
            .iter()
            .map(|b| b.date)
            .collect();
        assert_eq!(dates, vec![210103, 210104, 210105]);
    }

    #[test]
    fn torn_tail_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000003.kd.dat");
        let file = SeriesFile::<DailyBar>::new(&path);
        file.append(&[daily(210104)]).unwrap();

        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(&[1, 2, 3]).unwrap();
        drop(raw);

        assert!(matches!(file.tail_read(5, DateBounds::ALL), Err(DataStoreError::FormatError { .. })));
        assert!(matches!(file.last_record(), Err(DataStoreError::FormatError { .. })));
        assert!(matches!(file.append(&[daily(210105)]), Err(DataStoreError::FormatError { .. })));
        assert_eq!(fs::metadata(&path).unwrap().len(), 72 + 3);
    }

    #[test]
    fn groups_full_days_and_reports_remainder() {
        let dir = tempdir().unwrap();
        let file = SeriesFile::<IntradayBar>::new(dir.path().join("000004.k5.dat"));
        let mut bars = day_bars(210104, 48);
        bars.extend(day_bars(210105, 48));
        bars.extend(day_bars(210106, 17));
        file.append(&bars).unwrap();

        let groups = file.tail_read_days(10, DateBounds::ALL).unwrap();
        assert_eq!(groups.days.len(), 2);
        assert_eq!(groups.remainder, 17);
        assert!(groups.days.iter().all(|d| d.len() == 48));
        assert_eq!(groups.days[1][0].date_num(), 210105);
    }

    #[test]
    fn tail_read_days_limits_to_last_days() {
        let dir = tempdir().unwrap();
        let file = SeriesFile::<IntradayBar>::new(dir.path().join("000005.k5.dat"));
        let mut bars = day_bars(210104, 48);
        bars.extend(day_bars(210105, 48));
        bars.extend(day_bars(210106, 48));
        file.append(&bars).unwrap();

        let groups = file.tail_read_days(2, DateBounds::ALL).unwrap();
        assert_eq!(groups.remainder, 0);
        let dates: Vec<u32> = groups.days.iter().map(|d| d[0].date_num()).collect();
        assert_eq!(dates, vec![210105, 210106]);
    }
}
