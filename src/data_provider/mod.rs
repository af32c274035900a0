use log::{info, warn};
use serde::Serialize;
use crate::config::Config;
use crate::errors::Result;
use crate::models::bar::{DailyBar, IntradayBar, SeriesKind};
use crate::store::{DateBounds, SeriesFile};

/// 读取选项，天数为0表示不读取该序列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub kd_days: usize,
    pub k5_days: usize,
    /// 按最后的共同交易日对齐日线与5分钟线
    pub sync: bool,
    pub bounds: DateBounds,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            kd_days: 0,
            k5_days: 0,
            sync: false,
            bounds: DateBounds::ALL,
        }
    }
}

impl LoadOptions {
    pub fn new(kd_days: usize, k5_days: usize) -> Self {
        Self { kd_days, k5_days, ..Default::default() }
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_bounds(mut self, bounds: DateBounds) -> Self {
        self.bounds = bounds;
        self
    }
}

/// 一只股票最近的日线与5分钟线
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSeries {
    pub code: String,
    pub kd: Vec<DailyBar>,
    /// 每个元素为一个交易日的48根5分钟线
    pub k5: Vec<Vec<IntradayBar>>,
    /// 从尾部起两个序列交易日一致的天数
    pub sync_len: usize,
}

impl StockSeries {
    pub fn new(code: &str, kd: Vec<DailyBar>, k5: Vec<Vec<IntradayBar>>) -> Self {
        Self {
            code: code.to_string(),
            kd,
            k5,
            sync_len: 0,
        }
    }

    pub fn load(config: &Config, code: &str, options: LoadOptions) -> Result<Self> {
        let kd = if options.kd_days > 0 {
            SeriesFile::<DailyBar>::new(config.series_path(code, SeriesKind::Daily)?)
                .tail_read(options.kd_days, options.bounds)?
        } else {
            Vec::new()
        };

        let k5 = if options.k5_days > 0 {
            SeriesFile::<IntradayBar>::new(config.series_path(code, SeriesKind::Intraday)?)
                .tail_read_days(options.k5_days, options.bounds)?
                .days
        } else {
            Vec::new()
        };

        let mut series = Self::new(code, kd, k5);
        if options.sync {
            series.sync();
        }
        info!("Loaded {}: {} kd, {} k5 days, sync {}",
              code, series.kd.len(), series.k5.len(), series.sync_len);
        Ok(series)
    }

    fn last_k5_date(&self) -> Option<u32> {
        self.k5.last().and_then(|day| day.first()).map(IntradayBar::date_num)
    }

    /// 对齐两个序列的尾部
    ///
    /// 日线最后一天可能已收盘入库而5分钟线尚未更新，此时最多丢弃一条日线；
    /// 其他情况视为数据不一致，`sync_len` 为0。
    pub fn sync(&mut self) -> usize {
        self.sync_len = 0;
        let k5_last = match self.last_k5_date() {
            Some(date) => date,
            None => return 0,
        };

        let n = self.kd.len();
        if n == 0 {
            return 0;
        }
        if self.kd[n - 1].date != k5_last {
            if n >= 2 && self.kd[n - 2].date == k5_last {
                self.kd.pop();
            } else {
                warn!("{} kd ({:06}) and k5 ({:06}) diverge, no aligned span",
                      self.code, self.kd[n - 1].date, k5_last);
                return 0;
            }
        }

        self.sync_len = self.kd
            .iter()
            .rev()
            .zip(self.k5.iter().rev())
            .take_while(|(daily, day)| day.first().map(IntradayBar::date_num) == Some(daily.date))
            .count();
        self.sync_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bar::TradeStatus;

    fn daily(date: u32) -> DailyBar {
        let mut bar = DailyBar::data_error(date);
        bar.trade_status = TradeStatus::On;
        bar
    }

    fn day(date: u32) -> Vec<IntradayBar> {
        (0..IntradayBar::BARS_PER_DAY)
            .map(|i| IntradayBar::data_error(date * 10000 + 935 + i as u32))
            .collect()
    }

    #[test]
    fn aligned_tails_count_matching_days() {
        let mut series = StockSeries::new(
            "sh.600000",
            vec![daily(210104), daily(210105), daily(210106)],
            vec![day(210105), day(210106)],
        );
        assert_eq!(series.sync(), 2);
        assert_eq!(series.kd.len(), 3);
    }

    #[test]
    fn drops_one_trailing_daily_record() {
        let mut series = StockSeries::new(
            "sh.600000",
            vec![daily(210104), daily(210105), daily(210106)],
            vec![day(210104), day(210105)],
        );
        assert_eq!(series.sync(), 2);
        assert_eq!(series.kd.last().unwrap().date, 210105);
    }

    #[test]
    fn divergence_yields_no_span() {
        let mut series = StockSeries::new(
            "sh.600000",
            vec![daily(210104), daily(210105), daily(210108)],
            vec![day(210106)],
        );
        assert_eq!(series.sync(), 0);
        assert_eq!(series.kd.len(), 3);

        let mut empty = StockSeries::new("sh.600000", vec![daily(210104)], Vec::new());
        assert_eq!(empty.sync(), 0);
    }

    #[test]
    fn stops_at_the_first_gap() {
        let mut series = StockSeries::new(
            "sh.600000",
            vec![daily(210104), daily(210105), daily(210106)],
            vec![day(210101), day(210105), day(210106)],
        );
        assert_eq!(series.sync(), 2);
    }
}
