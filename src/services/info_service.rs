use log::info;
use serde::Serialize;
use std::sync::Arc;
use crate::config::Config;
use crate::errors::Result;
use crate::models::stock::IndexKind;
use crate::registry::{members_to_basic, StocksBasicInfo, StocksIndustryInfo, StocksSuperiorInfo};
use crate::sources::base::{DataSource, Session};

/// 全量名单文件名
pub const STOCK_ALL_LIST: &str = "stock_all.list";
pub const INDUSTRY_LIST: &str = "industry.list";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InfoSummary {
    pub stocks: usize,
    pub industries: usize,
    pub constituents: Vec<(IndexKind, usize)>,
}

/// 刷新股票名单、行业分类与指数成分股
pub struct InfoService {
    config: Config,
    source: Arc<dyn DataSource>,
}

impl InfoService {
    pub fn new(config: Config, source: Arc<dyn DataSource>) -> Self {
        Self { config, source }
    }

    pub async fn update_all_info(&self) -> Result<InfoSummary> {
        let session = self.source.login().await?;
        let result = self.refresh(&session).await;
        self.source.logout(session).await?;
        result
    }

    async fn refresh(&self, session: &Session) -> Result<InfoSummary> {
        let mut summary = InfoSummary::default();

        let all = StocksBasicInfo::from_rows(&self.source.fetch_stock_basic(session).await?)?;
        all.save_to_file(self.config.list_path(STOCK_ALL_LIST)?)?;
        summary.stocks = all.len();

        let industry = StocksIndustryInfo::from_rows(&self.source.fetch_industry(session).await?)?;
        industry.save_to_file(self.config.list_path(INDUSTRY_LIST)?)?;
        summary.industries = industry.len();

        for kind in IndexKind::ALL {
            let members = StocksSuperiorInfo::from_rows(&self.source.fetch_constituents(session, kind).await?)?;
            members.save_to_file(self.config.list_path(&kind.list_name())?)?;
            members_to_basic(&members, &all).save_to_file(self.config.list_path(&kind.basic_list_name())?)?;
            summary.constituents.push((kind, members.len()));
        }

        info!("Info updated: {} stocks, {} industries", summary.stocks, summary.industries);
        Ok(summary)
    }
}
