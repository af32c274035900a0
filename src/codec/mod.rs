//! 日线与5分钟线的定长二进制编解码
//!
//! 所有字段均为小端序。日线每条 72 字节（18 个 4 字节槽位，其中 volume 占两个），
//! 5分钟线每条 28 字节。

pub mod row;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use crate::errors::{Result, DataStoreError};
use crate::models::bar::{DailyBar, IntradayBar, SeriesKind, TradeStatus};

pub use row::{decode_daily_row, decode_intraday_row, parse_or, Decoded, Field, RawRow};

/// 可以按定长记录存入序列文件的数据
pub trait Record: Sized + Clone {
    const RECORD_LEN: usize;
    const KIND: SeriesKind;

    /// 记录所属交易日（YYMMDD）
    fn date_num(&self) -> u32;

    /// 文件内排序所用的时间键
    fn time_key(&self) -> u32;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self>;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::RECORD_LEN);
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::RECORD_LEN {
            return Err(DataStoreError::DataError(format!(
                "{} record needs {} bytes, got {}", Self::KIND, Self::RECORD_LEN, bytes.len()
            )));
        }
        let mut cursor = bytes;
        Ok(Self::read_from(&mut cursor)?)
    }
}

impl Record for DailyBar {
    const RECORD_LEN: usize = 4 * 18;
    const KIND: SeriesKind = SeriesKind::Daily;

    fn date_num(&self) -> u32 {
        self.date
    }

    fn time_key(&self) -> u32 {
        self.date
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self.date)?;
        w.write_f32::<LittleEndian>(self.open)?;
        w.write_f32::<LittleEndian>(self.close)?;
        w.write_f32::<LittleEndian>(self.high)?;
        w.write_f32::<LittleEndian>(self.low)?;
        // 保留字段
        w.write_u32::<LittleEndian>(0)?;
        w.write_u64::<LittleEndian>(self.volume)?;
        w.write_f32::<LittleEndian>(self.amount)?;
        w.write_u32::<LittleEndian>(self.adjust_flag)?;
        w.write_f32::<LittleEndian>(self.turn)?;
        w.write_u32::<LittleEndian>(self.trade_status.code())?;
        w.write_f32::<LittleEndian>(self.pct_chg)?;
        w.write_f32::<LittleEndian>(self.pe_ttm)?;
        w.write_f32::<LittleEndian>(self.ps_ttm)?;
        w.write_f32::<LittleEndian>(self.pcf_ncf_ttm)?;
        w.write_f32::<LittleEndian>(self.pb_mrq)?;
        w.write_u32::<LittleEndian>(self.is_st as u32)
    }

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let date = r.read_u32::<LittleEndian>()?;
        let open = r.read_f32::<LittleEndian>()?;
        let close = r.read_f32::<LittleEndian>()?;
        let high = r.read_f32::<LittleEndian>()?;
        let low = r.read_f32::<LittleEndian>()?;
        let _reserved = r.read_u32::<LittleEndian>()?;
        Ok(DailyBar {
            date,
            open,
            close,
            high,
            low,
            volume: r.read_u64::<LittleEndian>()?,
            amount: r.read_f32::<LittleEndian>()?,
            adjust_flag: r.read_u32::<LittleEndian>()?,
            turn: r.read_f32::<LittleEndian>()?,
            trade_status: TradeStatus::from_code(r.read_u32::<LittleEndian>()?),
            pct_chg: r.read_f32::<LittleEndian>()?,
            pe_ttm: r.read_f32::<LittleEndian>()?,
            ps_ttm: r.read_f32::<LittleEndian>()?,
            pcf_ncf_ttm: r.read_f32::<LittleEndian>()?,
            pb_mrq: r.read_f32::<LittleEndian>()?,
            is_st: r.read_u32::<LittleEndian>()? != 0,
        })
    }
}

impl Record for IntradayBar {
    const RECORD_LEN: usize = 4 * 7;
    const KIND: SeriesKind = SeriesKind::Intraday;

    fn date_num(&self) -> u32 {
        IntradayBar::date_num(self)
    }

    fn time_key(&self) -> u32 {
        self.time
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self.time)?;
        w.write_f32::<LittleEndian>(self.open)?;
        w.write_f32::<LittleEndian>(self.close)?;
        w.write_f32::<LittleEndian>(self.high)?;
        w.write_f32::<LittleEndian>(self.low)?;
        w.write_u32::<LittleEndian>(self.volume)?;
        w.write_f32::<LittleEndian>(self.amount)
    }

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        Ok(IntradayBar {
            time: r.read_u32::<LittleEndian>()?,
            open: r.read_f32::<LittleEndian>()?,
            close: r.read_f32::<LittleEndian>()?,
            high: r.read_f32::<LittleEndian>()?,
            low: r.read_f32::<LittleEndian>()?,
            volume: r.read_u32::<LittleEndian>()?,
            amount: r.read_f32::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_daily(date: u32) -> DailyBar {
        DailyBar {
            date,
            open: 18.9,
            close: 18.22,
            high: 19.12,
            low: 18.11,
            volume: 4_301_411,
            amount: 79_888_895.9,
            adjust_flag: 3,
            turn: 3.587307,
            trade_status: TradeStatus::On,
            pct_chg: 1.053792,
            pe_ttm: 179.07625,
            ps_ttm: 16.478888,
            pcf_ncf_ttm: 71.30144,
            pb_mrq: 3.187132,
            is_st: false,
        }
    }

    #[test]
    fn daily_layout_is_little_endian_72_bytes() {
        let bar = sample_daily(181101);
        let bytes = bar.encode().unwrap();
        assert_eq!(bytes.len(), 72);
        assert_eq!(&bytes[0..4], &181101u32.to_le_bytes());
        // 保留字段写0
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
        assert_eq!(&bytes[24..32], &4_301_411u64.to_le_bytes());
        assert_eq!(&bytes[44..48], &1u32.to_le_bytes());
        assert_eq!(DailyBar::decode(&bytes).unwrap(), bar);
    }

    #[test]
    fn data_error_status_survives_encoding() {
        let bar = DailyBar::data_error(181102);
        let bytes = bar.encode().unwrap();
        assert_eq!(&bytes[44..48], &[0xFF; 4]);
        assert!(DailyBar::decode(&bytes).unwrap().is_data_error());
    }

    #[test]
    fn intraday_layout_is_28_bytes() {
        let bar = IntradayBar {
            time: 1811091500,
            open: 18.54,
            close: 18.52,
            high: 18.55,
            low: 18.5,
            volume: 99_200,
            amount: 1_837_097.0,
        };
        let bytes = bar.encode().unwrap();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[0..4], &1811091500u32.to_le_bytes());
        let decoded = IntradayBar::decode(&bytes).unwrap();
        assert_eq!(decoded, bar);
        assert_eq!(Record::date_num(&decoded), 181109);
    }

    #[test]
    fn decode_rejects_short_blocks() {
        assert!(DailyBar::decode(&[0u8; 71]).is_err());
        assert!(IntradayBar::decode(&[0u8; 29]).is_err());
    }
}
