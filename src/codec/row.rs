//! 将数据源返回的字符串行转换为记录
//!
//! 解码是全函数：任何字段解析失败都不会中断整批数据，而是生成一条数值清零、
//! `trade_status` 为 `DataError` 的记录，保证记录条数与数据源一致。

use std::str::FromStr;
use crate::models::bar::{DailyBar, IntradayBar, TradeStatus};
use crate::util;

/// 数据源返回的一行，字段顺序与查询字段一致
pub type RawRow = Vec<String>;

/// 单个字段的解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    Parsed(T),
    /// 字段为空，使用允许的默认值
    Defaulted(T),
    Invalid,
}

impl<T> Field<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Field::Invalid)
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Field::Parsed(v) | Field::Defaulted(v) => Some(v),
            Field::Invalid => None,
        }
    }
}

/// 解析字段；空串在提供了默认值时取默认值，否则视为无效
pub fn parse_or<T: FromStr>(raw: &str, default: Option<T>) -> Field<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return match default {
            Some(v) => Field::Defaulted(v),
            None => Field::Invalid,
        };
    }
    match raw.parse::<T>() {
        Ok(v) => Field::Parsed(v),
        Err(_) => Field::Invalid,
    }
}

/// 解码结果以及解析失败的字段名
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<R> {
    pub record: R,
    pub invalid_fields: Vec<&'static str>,
}

impl<R> Decoded<R> {
    pub fn is_data_error(&self) -> bool {
        !self.invalid_fields.is_empty()
    }
}

/// 逐字段读取一行并记录失败的字段
struct RowReader<'a> {
    row: &'a [String],
    index: usize,
    invalid: Vec<&'static str>,
}

impl<'a> RowReader<'a> {
    fn new(row: &'a [String]) -> Self {
        Self { row, index: 0, invalid: Vec::new() }
    }

    fn next_raw(&mut self) -> Option<&'a str> {
        let value = self.row.get(self.index).map(|s| s.as_str());
        self.index += 1;
        value
    }

    fn field<T: FromStr + Default>(&mut self, name: &'static str, default: Option<T>) -> T {
        let parsed = match self.next_raw() {
            Some(raw) => parse_or(raw, default),
            None => Field::Invalid,
        };
        match parsed.ok() {
            Some(v) => v,
            None => {
                self.invalid.push(name);
                T::default()
            }
        }
    }

    fn mapped<T: Default>(&mut self, name: &'static str, f: impl FnOnce(&str) -> Option<T>) -> T {
        match self.next_raw().and_then(f) {
            Some(v) => v,
            None => {
                self.invalid.push(name);
                T::default()
            }
        }
    }
}

fn parse_trade_status(raw: &str) -> Option<TradeStatus> {
    match parse_or::<u32>(raw, None).ok()? {
        0 => Some(TradeStatus::Off),
        1 => Some(TradeStatus::On),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match parse_or::<u32>(raw, Some(0)).ok()? {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

/// 日线行字段顺序：
/// date, open, close, high, low, volume, amount, adjustflag, turn, tradestatus,
/// pctChg, peTTM, psTTM, pcfNcfTTM, pbMRQ, isST
pub fn decode_daily_row(row: &[String]) -> Decoded<DailyBar> {
    let mut reader = RowReader::new(row);
    let date = reader.mapped("date", util::normalize_date);
    let bar = DailyBar {
        date,
        open: reader.field("open", None),
        close: reader.field("close", None),
        high: reader.field("high", None),
        low: reader.field("low", None),
        volume: reader.field("volume", None),
        amount: reader.field("amount", None),
        adjust_flag: reader.field("adjustflag", None),
        // 停牌日换手率与涨跌幅为空
        turn: reader.field("turn", Some(0.0)),
        trade_status: reader
            .next_raw()
            .and_then(parse_trade_status)
            .unwrap_or_else(|| {
                reader.invalid.push("tradestatus");
                TradeStatus::DataError
            }),
        pct_chg: reader.field("pctChg", Some(0.0)),
        pe_ttm: reader.field("peTTM", None),
        ps_ttm: reader.field("psTTM", None),
        pcf_ncf_ttm: reader.field("pcfNcfTTM", None),
        pb_mrq: reader.field("pbMRQ", None),
        is_st: reader.mapped("isST", parse_flag),
    };

    if reader.invalid.is_empty() {
        Decoded { record: bar, invalid_fields: reader.invalid }
    } else {
        Decoded { record: DailyBar::data_error(date), invalid_fields: reader.invalid }
    }
}

/// 5分钟线行字段顺序：time, open, close, high, low, volume, amount
pub fn decode_intraday_row(row: &[String]) -> Decoded<IntradayBar> {
    let mut reader = RowReader::new(row);
    let time = reader.mapped("time", util::normalize_time);
    let bar = IntradayBar {
        time,
        open: reader.field("open", None),
        close: reader.field("close", None),
        high: reader.field("high", None),
        low: reader.field("low", None),
        volume: reader.field("volume", None),
        amount: reader.field("amount", None),
    };

    if reader.invalid.is_empty() {
        Decoded { record: bar, invalid_fields: reader.invalid }
    } else {
        Decoded { record: IntradayBar::data_error(time), invalid_fields: reader.invalid }
    }
}
