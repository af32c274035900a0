use log::{debug, info, warn};
use reqwest::Client;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use crate::errors::{Result, DataStoreError};
use crate::models::quote::{BookLevel, QuoteSnapshot};

const SINA_QUOTE_URL: &str = "http://hq.sinajs.cn/list=";
const SINA_REFERER: &str = "https://finance.sina.com.cn";

/// 新浪实时行情接口
pub struct SinaQuoteClient {
    client: Client,
    last_request: Mutex<Option<Instant>>,
}

impl SinaQuoteClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            last_request: Mutex::new(None),
        })
    }

    /// 等待请求频率限制
    async fn wait_for_rate_limit(&self) {
        const MIN_INTERVAL: Duration = Duration::from_millis(500);

        let now = Instant::now();
        let should_wait = {
            let mut last = self.last_request.lock().unwrap_or_else(|p| p.into_inner());
            let should_wait = last
                .map(|instant| instant.elapsed())
                .filter(|elapsed| *elapsed < MIN_INTERVAL)
                .map(|elapsed| MIN_INTERVAL - elapsed);
            *last = Some(now);
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("等待 {:?} 以遵守频率限制", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    /// 批量获取快照，`symbols` 为 `sh600000` 形式
    pub async fn fetch(&self, symbols: &[String]) -> Result<Vec<QuoteSnapshot>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        self.wait_for_rate_limit().await;

        let response = self.client
            .get(format!("{}{}", SINA_QUOTE_URL, symbols.join(",")))
            .header("Referer", SINA_REFERER)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataStoreError::source_error(
                response.status().as_str(),
                "quote request rejected",
            ));
        }

        // 接口返回GBK编码，名称字段不参与解析，按有损UTF-8处理即可
        let bytes = response.bytes().await?;
        let text = String::from_utf8_lossy(&bytes);
        let quotes = parse_sina_quotes(&text);

        info!("获取 {} 条行情快照（请求 {} 支）", quotes.len(), symbols.len());
        Ok(quotes)
    }
}

/// 解析接口返回的文本，格式不完整的行跳过
///
/// 每行形如 `var hq_str_sh600000="名称,今开,昨收,现价,最高,最低,...";`
pub fn parse_sina_quotes(text: &str) -> Vec<QuoteSnapshot> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let quote = parse_line(line);
            if quote.is_none() {
                warn!("Skip malformed quote line: {}", line.trim());
            }
            quote
        })
        .collect()
}

fn parse_line(line: &str) -> Option<QuoteSnapshot> {
    let (head, body) = line.split_once('=')?;
    let code_str = head.get(head.len().checked_sub(6)?..)?;
    if !code_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = code_str.parse::<u32>().ok()?;

    let body = body.trim().trim_end_matches(';').trim_matches('"');
    let p: Vec<&str> = body.split(',').collect();
    if p.len() < 32 {
        return None;
    }

    let level = |volume_idx: usize| -> Option<BookLevel> {
        Some(BookLevel {
            price: p[volume_idx + 1].parse().ok()?,
            volume: p[volume_idx].parse().ok()?,
        })
    };
    let mut bids = [BookLevel::default(); 5];
    let mut asks = [BookLevel::default(); 5];
    for i in 0..5 {
        bids[i] = level(10 + i * 2)?;
        asks[i] = level(20 + i * 2)?;
    }

    // 2021-01-05 -> 210105, 15:00:03 -> 150003
    let date = p[30].replace('-', "");
    let time = p[31].replace(':', "");
    if date.len() != 8 || time.len() != 6 {
        return None;
    }

    Some(QuoteSnapshot {
        date: date.get(2..)?.parse().ok()?,
        time: time.parse().ok()?,
        code,
        price: p[3].parse().ok()?,
        high: p[4].parse().ok()?,
        low: p[5].parse().ok()?,
        // 成交量可能带小数部分
        volume: p[8].parse::<f64>().ok()? as u64,
        amount: p[9].parse().ok()?,
        bids,
        asks,
    })
}
