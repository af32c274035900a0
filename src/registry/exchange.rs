use std::collections::BTreeMap;
use crate::errors::{Result, DataStoreError};
use crate::models::stock::Exchange;

/// 代码首位数字到交易所的查找表
///
/// 映射来自配置，构造时逐项校验；查不到的前缀直接报错，不做猜测。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTable {
    by_digit: [Option<Exchange>; 10],
}

impl ExchangeTable {
    pub fn new(prefixes: &BTreeMap<String, Exchange>) -> Result<Self> {
        let mut by_digit = [None; 10];
        for (prefix, exchange) in prefixes {
            let digit = match prefix.as_bytes() {
                [b] if b.is_ascii_digit() => (b - b'0') as usize,
                _ => {
                    return Err(DataStoreError::ConfigError(format!(
                        "Exchange prefix must be a single digit: {:?}", prefix
                    )))
                }
            };
            by_digit[digit] = Some(*exchange);
        }
        if by_digit.iter().all(Option::is_none) {
            return Err(DataStoreError::ConfigError("Exchange prefix table is empty".to_string()));
        }
        Ok(Self { by_digit })
    }

    /// 代码末尾的六位数字
    fn digits(code: &str) -> Result<&str> {
        let digits = code.get(code.len().saturating_sub(6)..).unwrap_or_default();
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DataStoreError::ExchangeError(format!("Invalid stock code: {}", code)));
        }
        Ok(digits)
    }

    pub fn exchange_of(&self, code: &str) -> Result<Exchange> {
        let digits = Self::digits(code)?;
        let first = (digits.as_bytes()[0] - b'0') as usize;
        self.by_digit[first]
            .ok_or_else(|| DataStoreError::ExchangeError(format!("Unmapped code prefix: {}", code)))
    }

    /// `600000` -> `sh.600000`
    pub fn qualify(&self, code: &str) -> Result<String> {
        let exchange = self.exchange_of(code)?;
        Ok(format!("{}.{}", exchange.prefix(), Self::digits(code)?))
    }

    /// 新浪行情接口使用的代码形式：`sh600000`
    pub fn to_sina(&self, code: &str) -> Result<String> {
        let exchange = self.exchange_of(code)?;
        Ok(format!("{}{}", exchange.prefix(), Self::digits(code)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn default_table_maps_known_prefixes() {
        let table = Config::new().exchange_table().unwrap();
        assert_eq!(table.qualify("600000").unwrap(), "sh.600000");
        assert_eq!(table.qualify("000001").unwrap(), "sz.000001");
        assert_eq!(table.to_sina("sz.300750").unwrap(), "sz300750");
        assert_eq!(table.exchange_of("sh.600000").unwrap(), Exchange::Sh);
    }

    #[test]
    fn unmapped_prefix_is_an_error() {
        let table = Config::new().exchange_table().unwrap();
        assert!(matches!(table.qualify("510300"), Err(DataStoreError::ExchangeError(_))));
        assert!(matches!(table.qualify("159915"), Err(DataStoreError::ExchangeError(_))));
        assert!(table.qualify("12345").is_err());
    }

    #[test]
    fn configured_prefixes_extend_the_table() {
        let mut prefixes = Config::new().exchange_prefixes;
        prefixes.insert("5".to_string(), Exchange::Sh);
        prefixes.insert("1".to_string(), Exchange::Sz);
        let table = ExchangeTable::new(&prefixes).unwrap();
        assert_eq!(table.qualify("510300").unwrap(), "sh.510300");
        assert_eq!(table.qualify("159915").unwrap(), "sz.159915");
    }

    #[test]
    fn rejects_malformed_prefixes() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("a".to_string(), Exchange::Sh);
        assert!(ExchangeTable::new(&prefixes).is_err());
        assert!(ExchangeTable::new(&BTreeMap::new()).is_err());
    }
}
