use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use crate::errors::{Result, DataStoreError};

/// 新文件的起始日期（YYMMDD）
pub const NEW_FILE_DATE: u32 = 150101;

/// 仍在上市的股票使用的退市日期
pub const NOT_DELISTED_DATE: u32 = 20991231;

// 日期转换工具
pub fn yymmdd_to_date(date_num: u32) -> Result<NaiveDate> {
    if date_num >= 1_000_000 {
        return Err(DataStoreError::DataError(format!("Invalid date number: {}", date_num)));
    }
    let year = 2000 + (date_num / 10000) as i32;
    let month = date_num / 100 % 100;
    let day = date_num % 100;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DataStoreError::DataError(format!("Invalid date: {:06}", date_num)))
}

pub fn date_to_yymmdd(date: &NaiveDate) -> u32 {
    (date.year() % 100) as u32 * 10000 + date.month() * 100 + date.day()
}

/// 将数据源中的日期字段统一为 YYMMDD
///
/// 接受 `YYYY-MM-DD`、`YYYYMMDD` 以及已经归一化的 `YYMMDD`。
pub fn normalize_date(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if !raw.is_ascii() {
        return None;
    }
    let digits: String = match raw.len() {
        10 if raw.as_bytes()[4] == b'-' && raw.as_bytes()[7] == b'-' => {
            format!("{}{}{}", &raw[2..4], &raw[5..7], &raw[8..10])
        }
        8 => raw.get(2..)?.to_string(),
        6 => raw.to_string(),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date_num = digits.parse::<u32>().ok()?;
    yymmdd_to_date(date_num).ok().map(|_| date_num)
}

/// 将5分钟线的时间字段统一为 YYMMDDHHMM
///
/// 数据源给出17位时间戳 `YYYYMMDDHHMMSSmmm`，本地文件里保存10位形式。
pub fn normalize_time(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let compact = match raw.len() {
        17 => &raw[2..12],
        10 => raw,
        _ => return None,
    };
    let time = compact.parse::<u32>().ok()?;
    let hour = time / 100 % 100;
    let minute = time % 100;
    if hour > 23 || minute > 59 {
        return None;
    }
    yymmdd_to_date(time / 10000).ok().map(|_| time)
}

/// 5分钟线时间对应的交易日
pub fn time_to_date_num(time: u32) -> u32 {
    time / 10000
}

/// `today` 与 `last` 相差的自然日数
pub fn calendar_days(today: &NaiveDate, last_date_num: u32) -> Result<i64> {
    let last = yymmdd_to_date(last_date_num)?;
    Ok((*today - last).num_days())
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| DataStoreError::ConfigError(format!("Invalid timezone {}: {}", name, e)))
}

/// 交易所所在时区的当前日期
pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

pub fn weekday_cn(date_num: u32) -> Result<&'static str> {
    const WEEK_STR: [&str; 7] = ["一", "二", "三", "四", "五", "六", "日"];
    let date = yymmdd_to_date(date_num)?;
    Ok(WEEK_STR[date.weekday().num_days_from_monday() as usize])
}

/// 解析名单文件中的日期（`YYYY-MM-DD` 或 `YYYYMMDD`），空串返回 None
pub fn parse_list_date(raw: &str) -> Result<Option<u32>> {
    let compact = raw.trim().replace('-', "");
    if compact.is_empty() {
        return Ok(None);
    }
    let value = compact.parse::<u32>()?;
    if compact.len() != 8 {
        return Err(DataStoreError::DataError(format!("Invalid list date: {}", raw)));
    }
    Ok(Some(value))
}
