use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use crate::errors::{Result, DataStoreError};
use crate::models::bar::SeriesKind;
use crate::models::stock::Exchange;
use crate::registry::exchange::ExchangeTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug_mode: bool,
    pub debug_stock_limit: usize,
    /// 数据根目录
    pub base_path: String,
    /// 行情文件目录，相对 base_path
    pub database_dir: String,
    /// 名单文件目录，相对 base_path
    pub list_dir: String,
    /// 行情文件名模板，必须包含 `{symbol}` 和 `{kind}`
    pub data_name_format: String,
    /// 增量更新使用的股票名单
    pub update_list: String,
    pub retry_max: u32,
    pub retry_delay_secs: u64,
    pub timezone: String,
    /// 代码首位数字到交易所的映射
    pub exchange_prefixes: BTreeMap<String, Exchange>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        let exchange_prefixes = [("0", Exchange::Sz), ("3", Exchange::Sz), ("6", Exchange::Sh)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            debug_mode: false,
            debug_stock_limit: 10,
            base_path: "data".to_string(),
            database_dir: "database".to_string(),
            list_dir: "list".to_string(),
            data_name_format: "{symbol}.{kind}.dat".to_string(),
            update_list: "stock_update.list".to_string(),
            retry_max: 5,
            retry_delay_secs: 30,
            timezone: "Asia/Shanghai".to_string(),
            exchange_prefixes,
        }
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_debug_stock_limit(mut self, limit: usize) -> Self {
        self.debug_stock_limit = limit;
        self
    }

    pub fn with_base_path(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_path = dir.as_ref().display().to_string();
        self
    }

    pub fn with_update_list(mut self, name: &str) -> Self {
        self.update_list = name.to_string();
        self
    }

    pub fn with_retry(mut self, max: u32, delay_secs: u64) -> Self {
        self.retry_max = max;
        self.retry_delay_secs = delay_secs;
        self
    }

    /// 读取配置文件
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// 配置文件不存在时写入默认配置
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        info!("Configuration missing, creating {}", path.display());
        let config = Self::new();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.data_name_format.contains("{symbol}") || !self.data_name_format.contains("{kind}") {
            return Err(DataStoreError::ConfigError(format!(
                "data_name_format must contain {{symbol}} and {{kind}}: {}", self.data_name_format
            )));
        }
        self.exchange_table()?;
        crate::util::parse_timezone(&self.timezone)?;
        Ok(())
    }

    pub fn exchange_table(&self) -> Result<ExchangeTable> {
        ExchangeTable::new(&self.exchange_prefixes)
    }

    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.database_dir)
    }

    pub fn list_dir_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.list_dir)
    }

    /// 某只股票某种序列的数据文件路径
    pub fn series_path(&self, symbol: &str, kind: SeriesKind) -> Result<PathBuf> {
        let symbol = symbol.trim();
        if symbol.is_empty() || symbol.contains(&['/', '\\'][..]) || symbol.contains("..") {
            return Err(DataStoreError::ConfigError(format!("Invalid symbol for path: {:?}", symbol)));
        }
        let file_name = self.data_name_format
            .replace("{symbol}", symbol)
            .replace("{kind}", kind.file_tag());
        Ok(self.database_path().join(file_name))
    }

    pub fn list_path(&self, list_name: &str) -> Result<PathBuf> {
        if list_name.is_empty() || list_name.contains(&['/', '\\'][..]) {
            return Err(DataStoreError::ConfigError(format!("Invalid list name: {:?}", list_name)));
        }
        Ok(self.list_dir_path().join(list_name))
    }
}
