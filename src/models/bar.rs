use serde::Serialize;
use std::fmt;
use crate::util;

/// 序列类型，同时也是数据文件名中的后缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SeriesKind {
    Daily,
    Intraday,
}

impl SeriesKind {
    pub fn file_tag(&self) -> &'static str {
        match self {
            SeriesKind::Daily => "kd",
            SeriesKind::Intraday => "k5",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "kd" => Some(SeriesKind::Daily),
            "k5" => Some(SeriesKind::Intraday),
            _ => None,
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_tag())
    }
}

/// 交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeStatus {
    Off,
    On,
    /// 数据源的这一行无法解析
    DataError,
}

impl TradeStatus {
    pub const DATA_ERROR_CODE: u32 = 0xFFFF_FFFF;

    pub fn code(&self) -> u32 {
        match self {
            TradeStatus::Off => 0,
            TradeStatus::On => 1,
            TradeStatus::DataError => Self::DATA_ERROR_CODE,
        }
    }

    /// 磁盘上的未知取值同样视为数据错误
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => TradeStatus::Off,
            1 => TradeStatus::On,
            _ => TradeStatus::DataError,
        }
    }
}

/// 日线数据（kd）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    /// YYMMDD
    pub date: u32,
    pub open: f32,
    pub close: f32,
    pub high: f32,
    pub low: f32,
    pub volume: u64,
    pub amount: f32,
    pub adjust_flag: u32,
    pub turn: f32,
    pub trade_status: TradeStatus,
    pub pct_chg: f32,
    pub pe_ttm: f32,
    pub ps_ttm: f32,
    pub pcf_ncf_ttm: f32,
    pub pb_mrq: f32,
    pub is_st: bool,
}

impl DailyBar {
    /// 数值字段全部清零的错误记录，保持记录条数不变
    pub fn data_error(date: u32) -> Self {
        Self {
            date,
            open: 0.0,
            close: 0.0,
            high: 0.0,
            low: 0.0,
            volume: 0,
            amount: 0.0,
            adjust_flag: 0,
            turn: 0.0,
            trade_status: TradeStatus::DataError,
            pct_chg: 0.0,
            pe_ttm: 0.0,
            ps_ttm: 0.0,
            pcf_ncf_ttm: 0.0,
            pb_mrq: 0.0,
            is_st: false,
        }
    }

    pub fn is_data_error(&self) -> bool {
        self.trade_status == TradeStatus::DataError
    }
}

impl fmt::Display for DailyBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weekday = util::weekday_cn(self.date).unwrap_or("?");
        write!(
            f,
            "{:06}({})  {:6.2}  {:6.2}  {:6.2}  {:6.2}  {:10}  {:5.2}  {:.0}  {:?}",
            self.date, weekday, self.open, self.close, self.high, self.low,
            self.volume, self.turn, self.amount, self.trade_status
        )
    }
}

/// 5分钟线数据（k5），每个交易日48根
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntradayBar {
    /// YYMMDDHHMM
    pub time: u32,
    pub open: f32,
    pub close: f32,
    pub high: f32,
    pub low: f32,
    pub volume: u32,
    pub amount: f32,
}

impl IntradayBar {
    pub const BARS_PER_DAY: usize = 48;

    pub fn data_error(time: u32) -> Self {
        Self {
            time,
            open: 0.0,
            close: 0.0,
            high: 0.0,
            low: 0.0,
            volume: 0,
            amount: 0.0,
        }
    }

    pub fn date_num(&self) -> u32 {
        util::time_to_date_num(self.time)
    }
}

impl fmt::Display for IntradayBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:010}  {:6.2}  {:6.2}  {:6.2}  {:6.2}  {:10}  {:.0}",
            self.time, self.open, self.close, self.high, self.low, self.volume, self.amount
        )
    }
}
