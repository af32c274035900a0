// 公开导出的模块，供外部使用
pub mod models;
pub mod codec;
pub mod store;
pub mod registry;
pub mod data_provider;
pub mod errors;
pub mod config;

// 主程序使用的模块，库使用场景一般不需要直接访问
#[doc(hidden)]
pub mod sources;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use models::bar::{DailyBar, IntradayBar, SeriesKind, TradeStatus};
pub use models::quote::QuoteSnapshot;
pub use models::stock::{Exchange, IndexKind, StockBasicInfo};
pub use store::{DateBounds, SeriesFile};
pub use data_provider::{LoadOptions, StockSeries};
pub use config::Config;
pub use errors::{Result, DataStoreError};
