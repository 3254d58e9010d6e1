//! Decoder for the Kite ticker binary frames.
//!
//! A frame is a big-endian `u16` packet count followed by `(u16 length,
//! body)` pairs. Bodies are runs of big-endian 32-bit integers whose layout
//! depends on the length: 8 bytes for LTP, 28/32 for index quote/full, 44 for
//! quote and 184 for full mode (the tail being five levels of depth).

use tickmirror_domain::value_objects::tick::{Ohlc, Tick};

const LTP_LEN: usize = 8;
const INDEX_QUOTE_LEN: usize = 28;
const INDEX_FULL_LEN: usize = 32;
const QUOTE_LEN: usize = 44;
const FULL_LEN: usize = 184;

const SEGMENT_CDS: u32 = 3;
const SEGMENT_BCD: u32 = 6;
const SEGMENT_INDICES: u32 = 9;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Heartbeat,
    Ticks(Vec<Tick>),
}

pub fn decode_frame(bytes: &[u8]) -> Result<Frame, String> {
    if bytes.len() < 2 {
        return Ok(Frame::Heartbeat);
    }
    let count = read_u16(bytes, 0)? as usize;
    let mut offset = 2usize;
    let mut ticks = Vec::with_capacity(count);
    for idx in 0..count {
        let len = read_u16(bytes, offset)
            .map_err(|err| format!("packet {idx}: missing length: {err}"))? as usize;
        offset += 2;
        let end = offset + len;
        let body = bytes.get(offset..end).ok_or_else(|| {
            format!(
                "packet {idx}: truncated, need {len} bytes at offset {offset}, frame has {}",
                bytes.len()
            )
        })?;
        if let Some(tick) = decode_packet(body)? {
            ticks.push(tick);
        }
        offset = end;
    }
    Ok(Frame::Ticks(ticks))
}

/// `Ok(None)` for packet sizes this decoder does not know.
pub fn decode_packet(body: &[u8]) -> Result<Option<Tick>, String> {
    if body.len() < 4 {
        return Ok(None);
    }
    let token = read_u32(body, 0)?;
    let segment = token & 0xff;
    let divisor = price_divisor(segment);
    let price = |offset: usize| -> Result<f64, String> {
        Ok(f64::from(read_u32(body, offset)?) / divisor)
    };

    let mut tick = Tick::new(token);
    match body.len() {
        LTP_LEN => {
            tick.last_price = Some(price(4)?);
        }
        INDEX_QUOTE_LEN | INDEX_FULL_LEN if segment == SEGMENT_INDICES => {
            tick.last_price = Some(price(4)?);
            tick.ohlc = Some(Ohlc {
                high: price(8)?,
                low: price(12)?,
                open: price(16)?,
                close: price(20)?,
            });
            if body.len() == INDEX_FULL_LEN {
                tick.exchange_timestamp = Some(i64::from(read_u32(body, 28)?));
            }
        }
        QUOTE_LEN | FULL_LEN => {
            tick.last_price = Some(price(4)?);
            tick.volume = Some(u64::from(read_u32(body, 16)?));
            tick.total_buy_quantity = Some(u64::from(read_u32(body, 20)?));
            tick.total_sell_quantity = Some(u64::from(read_u32(body, 24)?));
            tick.ohlc = Some(Ohlc {
                open: price(28)?,
                high: price(32)?,
                low: price(36)?,
                close: price(40)?,
            });
            if body.len() == FULL_LEN {
                tick.exchange_timestamp = Some(i64::from(read_u32(body, 60)?));
            }
        }
        _ => return Ok(None),
    }
    Ok(Some(tick))
}

fn price_divisor(segment: u32) -> f64 {
    match segment {
        SEGMENT_CDS => 10_000_000.0,
        SEGMENT_BCD => 10_000.0,
        _ => 100.0,
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, String> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| format!("short read at {offset}"))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, String> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| format!("short read at {offset}"))
}
