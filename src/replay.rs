//! CSV order record parsing for the replay tool.
//!
//! Line format: `type,order_id,trader_id,side,price,qty`, where `type` is
//! `L` (NewLimit), `N` (NewMarket), `C` (Cancel) or `M` (Modify). Fields a
//! type does not use may be left empty (a cancel needs only `order_id`).
//! Lines starting with `#` and blank lines are skipped by the reader.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{OrderId, OrderType, Price, Qty, Side, TraderId};

/// Raw CSV row as deserialized by the `csv` reader.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub order_id: Option<u64>,
    pub trader_id: Option<u32>,
    pub side: Option<String>,
    pub price: Option<i64>,
    pub qty: Option<i64>,
}

/// A validated replay record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRecord {
    pub r#type: OrderType,
    pub order_id: OrderId,
    pub trader_id: TraderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
}

/// Record-level validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown type token {0:?} (expected L, N, C or M)")]
    UnknownType(String),
    #[error("missing order_id")]
    MissingOrderId,
    #[error("missing trader_id for {0}")]
    MissingTraderId(OrderType),
    #[error("unknown side token {0:?} (expected B or S)")]
    UnknownSide(String),
    #[error("missing side for {0}")]
    MissingSide(OrderType),
    #[error("missing price for NewLimit")]
    MissingPrice,
    #[error("missing qty for {0}")]
    MissingQty(OrderType),
}

impl TryFrom<RawRecord> for ReplayRecord {
    type Error = RecordError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let r#type = match raw.kind.as_str() {
            "L" => OrderType::NewLimit,
            "N" => OrderType::NewMarket,
            "C" => OrderType::Cancel,
            "M" => OrderType::Modify,
            other => return Err(RecordError::UnknownType(other.to_string())),
        };

        let order_id = OrderId(raw.order_id.ok_or(RecordError::MissingOrderId)?);

        let side = match raw.side.as_deref() {
            Some("B") => Some(Side::Buy),
            Some("S") => Some(Side::Sell),
            Some(other) if !other.is_empty() => {
                return Err(RecordError::UnknownSide(other.to_string()))
            }
            _ => None,
        };

        let record = match r#type {
            OrderType::NewLimit => ReplayRecord {
                r#type,
                order_id,
                trader_id: TraderId(raw.trader_id.ok_or(RecordError::MissingTraderId(r#type))?),
                side: side.ok_or(RecordError::MissingSide(r#type))?,
                price: Price(raw.price.ok_or(RecordError::MissingPrice)?),
                qty: Qty(raw.qty.ok_or(RecordError::MissingQty(r#type))?),
            },
            OrderType::NewMarket => ReplayRecord {
                r#type,
                order_id,
                trader_id: TraderId(raw.trader_id.ok_or(RecordError::MissingTraderId(r#type))?),
                side: side.ok_or(RecordError::MissingSide(r#type))?,
                price: Price(0),
                qty: Qty(raw.qty.ok_or(RecordError::MissingQty(r#type))?),
            },
            OrderType::Cancel => ReplayRecord {
                r#type,
                order_id,
                trader_id: TraderId(0),
                side: Side::Buy,
                price: Price(0),
                qty: Qty(0),
            },
            OrderType::Modify => ReplayRecord {
                r#type,
                order_id,
                trader_id: TraderId(0),
                side: Side::Buy,
                // Price(0) means "unchanged".
                price: Price(raw.price.unwrap_or(0)),
                qty: Qty(raw.qty.ok_or(RecordError::MissingQty(r#type))?),
            },
        };

        Ok(record)
    }
}

/// Build a CSV reader with the replay dialect: headers, `#` comments,
/// variable-length rows.
pub fn csv_reader<R: std::io::Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Parse every record, collecting row-indexed errors.
pub fn parse_records<R: std::io::Read>(
    input: R,
) -> (Vec<ReplayRecord>, Vec<(usize, String)>) {
    let mut reader = csv_reader(input);
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (row, result) in reader.deserialize::<RawRecord>().enumerate() {
        match result {
            Ok(raw) => match ReplayRecord::try_from(raw) {
                Ok(record) => records.push(record),
                Err(err) => errors.push((row + 2, err.to_string())),
            },
            Err(err) => errors.push((row + 2, err.to_string())),
        }
    }

    (records, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "type,order_id,trader_id,side,price,qty\n";

    fn parse_one(line: &str) -> Result<ReplayRecord, String> {
        let input = format!("{HEADER}{line}\n");
        let (records, errors) = parse_records(input.as_bytes());
        if let Some((_, err)) = errors.into_iter().next() {
            return Err(err);
        }
        records.into_iter().next().ok_or_else(|| "no record".into())
    }

    #[test]
    fn test_parse_limit() {
        let rec = parse_one("L,1,0,B,10000,100").unwrap();
        assert_eq!(rec.r#type, OrderType::NewLimit);
        assert_eq!(rec.order_id, OrderId(1));
        assert_eq!(rec.trader_id, TraderId(0));
        assert_eq!(rec.side, Side::Buy);
        assert_eq!(rec.price, Price(10_000));
        assert_eq!(rec.qty, Qty(100));
    }

    #[test]
    fn test_parse_market() {
        let rec = parse_one("N,2,1,S,,50").unwrap();
        assert_eq!(rec.r#type, OrderType::NewMarket);
        assert_eq!(rec.side, Side::Sell);
        assert_eq!(rec.price, Price(0));
        assert_eq!(rec.qty, Qty(50));
    }

    #[test]
    fn test_parse_cancel_with_empty_fields() {
        let rec = parse_one("C,1,,,,").unwrap();
        assert_eq!(rec.r#type, OrderType::Cancel);
        assert_eq!(rec.order_id, OrderId(1));
    }

    #[test]
    fn test_parse_modify_defaults_price_to_unchanged() {
        let rec = parse_one("M,2,,,,75").unwrap();
        assert_eq!(rec.r#type, OrderType::Modify);
        assert_eq!(rec.qty, Qty(75));
        assert_eq!(rec.price, Price(0));

        let rec = parse_one("M,2,,,10100,75").unwrap();
        assert_eq!(rec.price, Price(10_100));
    }

    #[test]
    fn test_unknown_type_token() {
        let err = parse_one("X,1,0,B,100,10").unwrap_err();
        assert!(err.contains("unknown type token"));
    }

    #[test]
    fn test_missing_fields_are_errors() {
        assert!(parse_one("L,1,0,B,,100").unwrap_err().contains("price"));
        assert!(parse_one("L,1,0,,100,100").unwrap_err().contains("side"));
        assert!(parse_one("L,1,,B,100,100").unwrap_err().contains("trader_id"));
        assert!(parse_one("M,2,,,,").unwrap_err().contains("qty"));
    }

    #[test]
    fn test_unknown_side_token() {
        let err = parse_one("L,1,0,Z,100,10").unwrap_err();
        assert!(err.contains("unknown side token"));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let input = format!("{HEADER}# a comment\n\nL,1,0,B,100,10\n");
        let (records, errors) = parse_records(input.as_bytes());
        assert!(errors.is_empty());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let input = format!("{HEADER}L,1,0,B,100,10\nX,2,0,B,100,10\n");
        let (records, errors) = parse_records(input.as_bytes());
        assert_eq!(records.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 3);
    }
}
