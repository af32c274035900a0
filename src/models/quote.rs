use serde::Serialize;
use std::fmt;

/// 一档盘口：价格与数量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BookLevel {
    pub price: f32,
    pub volume: u64,
}

/// 实时行情快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    /// YYMMDD
    pub date: u32,
    /// HHMMSS
    pub time: u32,
    /// 六位数字代码
    pub code: u32,
    pub price: f32,
    pub high: f32,
    pub low: f32,
    pub volume: u64,
    pub amount: f64,
    /// 买一到买五
    pub bids: [BookLevel; 5],
    /// 卖一到卖五
    pub asks: [BookLevel; 5],
}

impl fmt::Display for QuoteSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:06}{:06}  {:06}  {:5.2} {:5.2} {:5.2} {:7} {:11.1} |",
            self.date, self.time, self.code, self.price, self.high, self.low,
            self.volume / 100, self.amount
        )?;
        for level in self.bids.iter().rev() {
            write!(f, " {:5.2} {:5}", level.price, level.volume / 100)?;
        }
        write!(f, " |")?;
        for level in &self.asks {
            write!(f, " {:5.2} {:5}", level.price, level.volume / 100)?;
        }
        Ok(())
    }
}
