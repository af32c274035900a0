use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use crate::codec::RawRow;
use crate::config::Config;
use crate::errors::{Result, DataStoreError};
use crate::models::stock::IndexKind;

/// 一次登录会话，批量更新时只登录一次并传入每个查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub source: String,
    pub opened_at: DateTime<Utc>,
}

impl Session {
    pub fn open(source: &str) -> Self {
        Self {
            source: source.to_string(),
            opened_at: Utc::now(),
        }
    }
}

/// 行情数据源
///
/// 每个查询返回按字段顺序排列的字符串行，日期区间两端均包含。
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn login(&self) -> Result<Session>;

    async fn logout(&self, session: Session) -> Result<()>;

    /// 日线：date, open, close, high, low, volume, amount, adjustflag, turn,
    /// tradestatus, pctChg, peTTM, psTTM, pcfNcfTTM, pbMRQ, isST
    async fn fetch_daily(
        &self,
        session: &Session,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>>;

    /// 5分钟线：time, open, close, high, low, volume, amount
    async fn fetch_intraday(
        &self,
        session: &Session,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>>;

    /// code, code_name, ipoDate, outDate, type, status
    async fn fetch_stock_basic(&self, session: &Session) -> Result<Vec<RawRow>>;

    /// updateDate, code, code_name, industry, industryClassification
    async fn fetch_industry(&self, session: &Session) -> Result<Vec<RawRow>>;

    /// updateDate, code, code_name
    async fn fetch_constituents(&self, session: &Session, kind: IndexKind) -> Result<Vec<RawRow>>;
}

/// 固定间隔的有限次重试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_max, Duration::from_secs(config.retry_delay_secs))
    }
}

/// 对数据源的临时错误进行重试，其他错误直接返回
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retried = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if retried >= policy.max_retries {
                    return Err(DataStoreError::RetriesExhausted {
                        attempts: retried + 1,
                        last: e.to_string(),
                    });
                }
                retried += 1;
                warn!("{} failed ({}), retry {}/{} in {:?}",
                      what, e, retried, policy.max_retries, policy.delay);
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 为每个查询加上重试的数据源包装
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: DataSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: DataSource> DataSource for RetryingSource<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn login(&self) -> Result<Session> {
        let inner = &self.inner;
        with_retry(&self.policy, "login", move || inner.login()).await
    }

    async fn logout(&self, session: Session) -> Result<()> {
        self.inner.logout(session).await
    }

    async fn fetch_daily(
        &self,
        session: &Session,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        debug!("fetch_daily {} [{}, {}]", code, start, end);
        let inner = &self.inner;
        with_retry(&self.policy, "fetch_daily", move || inner.fetch_daily(session, code, start, end)).await
    }

    async fn fetch_intraday(
        &self,
        session: &Session,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        debug!("fetch_intraday {} [{}, {}]", code, start, end);
        let inner = &self.inner;
        with_retry(&self.policy, "fetch_intraday", move || inner.fetch_intraday(session, code, start, end)).await
    }

    async fn fetch_stock_basic(&self, session: &Session) -> Result<Vec<RawRow>> {
        let inner = &self.inner;
        with_retry(&self.policy, "fetch_stock_basic", move || inner.fetch_stock_basic(session)).await
    }

    async fn fetch_industry(&self, session: &Session) -> Result<Vec<RawRow>> {
        let inner = &self.inner;
        with_retry(&self.policy, "fetch_industry", move || inner.fetch_industry(session)).await
    }

    async fn fetch_constituents(&self, session: &Session, kind: IndexKind) -> Result<Vec<RawRow>> {
        let inner = &self.inner;
        with_retry(&self.policy, "fetch_constituents", move || inner.fetch_constituents(session, kind)).await
    }
}
