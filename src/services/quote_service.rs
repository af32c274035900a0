use csv::WriterBuilder;
use log::debug;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;
use crate::errors::Result;
use crate::models::quote::QuoteSnapshot;

/// 相邻两次快照之间的变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteChange {
    /// 首次出现或现价变化
    Price,
    /// 现价不变，五档盘口变化
    Book,
    None,
}

impl QuoteChange {
    pub fn classify(prev: Option<&QuoteSnapshot>, next: &QuoteSnapshot) -> Self {
        match prev {
            None => QuoteChange::Price,
            Some(prev) if prev.price != next.price => QuoteChange::Price,
            Some(prev) if prev.bids != next.bids || prev.asks != next.asks => QuoteChange::Book,
            Some(_) => QuoteChange::None,
        }
    }

    pub fn is_change(&self) -> bool {
        *self != QuoteChange::None
    }
}

/// 记录每只股票上一次价格变化时的快照
#[derive(Debug, Default)]
pub struct QuoteTracker {
    last: HashMap<u32, QuoteSnapshot>,
}

impl QuoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回每条快照的变化类型；只有价格变化会更新基准快照
    pub fn observe(&mut self, quotes: Vec<QuoteSnapshot>) -> Vec<(QuoteSnapshot, QuoteChange)> {
        quotes
            .into_iter()
            .map(|quote| {
                let change = QuoteChange::classify(self.last.get(&quote.code), &quote);
                if change == QuoteChange::Price {
                    self.last.insert(quote.code, quote.clone());
                }
                (quote, change)
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}

/// 将快照追加到 `{dir}/{date}{code}.csv`
///
/// 列顺序：time, price, high, low, volume, amount, 买五到买一（价, 量），卖一到卖五（价, 量）
pub fn append_quotes_csv(dir: impl AsRef<Path>, quotes: &[QuoteSnapshot]) -> Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    for quote in quotes {
        let path = dir.join(format!("{:06}{:06}.csv", quote.date, quote.code));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        let mut row = vec![
            quote.time.to_string(),
            quote.price.to_string(),
            quote.high.to_string(),
            quote.low.to_string(),
            quote.volume.to_string(),
            quote.amount.to_string(),
        ];
        for level in quote.bids.iter().rev().chain(quote.asks.iter()) {
            row.push(level.price.to_string());
            row.push(level.volume.to_string());
        }
        writer.write_record(&row)?;
        writer.flush()?;
        debug!("Appended quote {:06} to {}", quote.time, path.display());
    }
    Ok(quotes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quote::BookLevel;
    use tempfile::tempdir;

    fn snapshot(time: u32, price: f32, bid1: u64) -> QuoteSnapshot {
        let mut bids = [BookLevel { price: price - 0.01, volume: 100 }; 5];
        bids[0].volume = bid1;
        QuoteSnapshot {
            date: 210105,
            time,
            code: 600000,
            price,
            high: price,
            low: price,
            volume: 1000,
            amount: 10_000.0,
            bids,
            asks: [BookLevel { price: price + 0.01, volume: 200 }; 5],
        }
    }

    #[test]
    fn classifies_price_then_book_changes() {
        let first = snapshot(93000, 10.0, 100);
        assert_eq!(QuoteChange::classify(None, &first), QuoteChange::Price);
        assert_eq!(QuoteChange::classify(Some(&first), &snapshot(93003, 10.1, 100)), QuoteChange::Price);
        assert_eq!(QuoteChange::classify(Some(&first), &snapshot(93003, 10.0, 300)), QuoteChange::Book);
        assert_eq!(QuoteChange::classify(Some(&first), &snapshot(93006, 10.0, 100)), QuoteChange::None);
    }

    #[test]
    fn tracker_keeps_last_price_change() {
        let mut tracker = QuoteTracker::new();
        let changes: Vec<QuoteChange> = tracker
            .observe(vec![snapshot(93000, 10.0, 100)])
            .into_iter()
            .chain(tracker.observe(vec![snapshot(93003, 10.0, 100)]))
            .map(|(_, change)| change)
            .collect();
        assert_eq!(changes, vec![QuoteChange::Price, QuoteChange::None]);
    }

    #[test]
    fn appends_rows_per_day_and_code() {
        let dir = tempdir().unwrap();
        append_quotes_csv(dir.path(), &[snapshot(93000, 10.0, 100)]).unwrap();
        append_quotes_csv(dir.path(), &[snapshot(93003, 10.1, 100)]).unwrap();

        let contents = fs::read_to_string(dir.path().join("210105600000.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("93000,10,"));
        assert_eq!(lines[1].split(',').count(), 26);
    }
}
