use serde::{Deserialize, Serialize};
use std::fmt;
use crate::errors::{Result, DataStoreError};
use crate::util;

/// 交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Sh,
    Sz,
}

impl Exchange {
    pub fn prefix(&self) -> &'static str {
        match self {
            Exchange::Sh => "sh",
            Exchange::Sz => "sz",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StockType {
    Stock,
    Index,
    Other,
}

impl StockType {
    pub fn code(&self) -> u32 {
        match self {
            StockType::Stock => 1,
            StockType::Index => 2,
            StockType::Other => 3,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => StockType::Stock,
            2 => StockType::Index,
            _ => StockType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StockStatus {
    Delisting,
    Listing,
}

impl StockStatus {
    pub fn code(&self) -> u32 {
        match self {
            StockStatus::Delisting => 0,
            StockStatus::Listing => 1,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(StockStatus::Delisting),
            1 => Ok(StockStatus::Listing),
            _ => Err(DataStoreError::DataError(format!("Invalid stock status: {}", code))),
        }
    }
}

/// 从 `sh.600000` 这类代码中取出数字部分作为键
pub fn code_key(code: &str) -> Result<u32> {
    let digits = code.get(code.len().saturating_sub(6)..).unwrap_or_default();
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DataStoreError::DataError(format!("Invalid stock code: {}", code)));
    }
    Ok(digits.parse::<u32>()?)
}

/// 股票基本信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockBasicInfo {
    pub code: String,
    pub key: u32,
    pub code_name: String,
    /// YYYYMMDD
    pub ipo_date: u32,
    /// YYYYMMDD，未退市为 20991231
    pub out_date: u32,
    pub stock_type: StockType,
    pub status: StockStatus,
}

impl StockBasicInfo {
    pub fn new(
        code: &str,
        code_name: &str,
        ipo_date: &str,
        out_date: &str,
        stock_type: &str,
        status: &str,
    ) -> Result<Self> {
        let key = code_key(code)?;
        let ipo_date = util::parse_list_date(ipo_date)?
            .ok_or_else(|| DataStoreError::DataError(format!("Missing IPO date for {}", code)))?;
        let out_date = util::parse_list_date(out_date)?.unwrap_or(util::NOT_DELISTED_DATE);

        Ok(Self {
            code: code.to_string(),
            key,
            code_name: code_name.to_string(),
            ipo_date,
            out_date,
            stock_type: StockType::from_code(stock_type.trim().parse::<u32>()?),
            status: StockStatus::from_code(status.trim().parse::<u32>()?)?,
        })
    }

    /// 按源数据的字段顺序构造：code, code_name, ipoDate, outDate, type, status
    pub fn from_fields(fields: &[String]) -> Result<Self> {
        match fields {
            [code, name, ipo, out, stock_type, status, ..] => {
                Self::new(code, name, ipo, out, stock_type, status)
            }
            // 退市日期为空时空白分隔的名单只剩5列
            [code, name, ipo, stock_type, status] => {
                Self::new(code, name, ipo, "", stock_type, status)
            }
            _ => Err(DataStoreError::DataError(format!("Invalid stock basic row: {:?}", fields))),
        }
    }

    pub fn is_listing(&self) -> bool {
        self.status == StockStatus::Listing
    }

    /// 名单文件中的一行
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.code, self.code_name, self.ipo_date, self.out_date,
            self.stock_type.code(), self.status.code()
        )
    }
}

impl fmt::Display for StockBasicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?} {:08} {:08} {}",
            self.code, self.stock_type, self.status, self.ipo_date, self.out_date, self.code_name
        )
    }
}

/// 指数成分股
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexKind {
    Sz50,
    Hs300,
    Zz500,
}

impl IndexKind {
    pub const ALL: [IndexKind; 3] = [IndexKind::Sz50, IndexKind::Hs300, IndexKind::Zz500];

    pub fn tag(&self) -> &'static str {
        match self {
            IndexKind::Sz50 => "sz50",
            IndexKind::Hs300 => "hs300",
            IndexKind::Zz500 => "zz500",
        }
    }

    pub fn list_name(&self) -> String {
        format!("{}.list", self.tag())
    }

    pub fn basic_list_name(&self) -> String {
        format!("stock_{}.list", self.tag())
    }
}

/// 成分股记录：updateDate, code, code_name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSuperiorInfo {
    pub key: u32,
    pub update_date: String,
    pub code: String,
    pub code_name: String,
}

impl StockSuperiorInfo {
    pub fn from_fields(fields: &[String]) -> Result<Self> {
        match fields {
            [update_date, code, code_name, ..] => Ok(Self {
                key: code_key(code)?,
                update_date: update_date.clone(),
                code: code.clone(),
                code_name: code_name.clone(),
            }),
            _ => Err(DataStoreError::DataError(format!("Invalid superior row: {:?}", fields))),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{} {} {}", self.update_date, self.code, self.code_name)
    }
}

/// 行业分类记录：updateDate, code, code_name, industry, industryClassification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockIndustryInfo {
    pub key: u32,
    pub update_date: String,
    pub code: String,
    pub code_name: String,
    pub industry: String,
    pub ind_class: String,
}

impl StockIndustryInfo {
    pub fn from_fields(fields: &[String]) -> Result<Self> {
        // 空字段在名单文件中写作 "-"，否则按空白切分后列数会错位
        fn or_dash(value: Option<&String>) -> String {
            match value.map(|v| v.trim()) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => "-".to_string(),
            }
        }

        match fields {
            [update_date, code, code_name, rest @ ..] => Ok(Self {
                key: code_key(code)?,
                update_date: update_date.clone(),
                code: code.clone(),
                code_name: code_name.clone(),
                industry: or_dash(rest.first()),
                ind_class: or_dash(rest.get(1)),
            }),
            _ => Err(DataStoreError::DataError(format!("Invalid industry row: {:?}", fields))),
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.update_date, self.code, self.code_name, self.industry, self.ind_class
        )
    }
}
