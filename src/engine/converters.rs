use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

pub fn duck_value_into_json(value: DuckValue) -> JsonValue {
    match value {
        DuckValue::Null => JsonValue::Null,
        DuckValue::Boolean(b) => JsonValue::Bool(b),
        DuckValue::TinyInt(i) => json!(i),
        DuckValue::SmallInt(i) => json!(i),
        DuckValue::Int(i) => json!(i),
        DuckValue::BigInt(i) => json!(i),
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => json!(small),
            Err(_) => JsonValue::String(i.to_string()),
        },
        DuckValue::UHugeInt(i) => match u64::try_from(i) {
            Ok(small) => json!(small),
            Err(_) => JsonValue::String(i.to_string()),
        },
        DuckValue::UTinyInt(i) => json!(i),
        DuckValue::USmallInt(i) => json!(i),
        DuckValue::UInt(i) => json!(i),
        DuckValue::UBigInt(i) => json!(i),
        DuckValue::Float(f) => float_into_json(f64::from(f)),
        DuckValue::Double(f) => float_into_json(f),
        DuckValue::Decimal(d) => JsonValue::String(d.to_string()),
        DuckValue::Text(s) => JsonValue::String(s),
        DuckValue::Enum(s) => JsonValue::String(s),
        DuckValue::Blob(b) | DuckValue::Geometry(b) => JsonValue::String(base64_encode(&b)),
        DuckValue::Date32(days) => format_date(days).map_or(json!(days), JsonValue::String),
        DuckValue::Timestamp(unit, ts) => {
            format_timestamp(unit, ts).map_or(json!(ts), JsonValue::String)
        }
        DuckValue::Time64(unit, t) => format_time(unit, t).map_or(json!(t), JsonValue::String),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => JsonValue::String(format_interval(months, days, nanos)),
        DuckValue::List(items) | DuckValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(duck_value_into_json).collect())
        }
        DuckValue::Struct(fields) => JsonValue::Object(
            fields
                .iter()
                .map(|(name, v)| (name.clone(), duck_value_into_json(v.clone())))
                .collect(),
        ),
        DuckValue::Map(entries) => {
            let mut object = Map::new();
            for (k, v) in entries.iter() {
                object.insert(map_key(k.clone()), duck_value_into_json(v.clone()));
            }
            JsonValue::Object(object)
        }
        DuckValue::Union(inner) => duck_value_into_json(*inner),
        other => {
            debug!("Converting unsupported DuckDB value to string: {:?}", other);
            JsonValue::String(format!("{:?}", other))
        }
    }
}

fn float_into_json(f: f64) -> JsonValue {
    serde_json::Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(f.to_string()))
}

/// JSON object keys are strings; scalar map keys use their JSON text.
fn map_key(key: DuckValue) -> String {
    match duck_value_into_json(key) {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

fn unit_delta(unit: TimeUnit, value: i64) -> Option<TimeDelta> {
    match unit {
        TimeUnit::Second => TimeDelta::try_seconds(value),
        TimeUnit::Millisecond => TimeDelta::try_milliseconds(value),
        TimeUnit::Microsecond => Some(TimeDelta::microseconds(value)),
        TimeUnit::Nanosecond => Some(TimeDelta::nanoseconds(value)),
    }
}

fn clock_format(nanos: u32) -> &'static str {
    if nanos == 0 {
        "%H:%M:%S"
    } else {
        "%H:%M:%S%.6f"
    }
}

/// `None` outside the calendar range, e.g. DuckDB's `infinity` dates.
fn format_date(days: i32) -> Option<String> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?
        .checked_add_signed(TimeDelta::try_days(i64::from(days))?)
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn format_timestamp(unit: TimeUnit, value: i64) -> Option<String> {
    let ts = DateTime::<Utc>::UNIX_EPOCH.checked_add_signed(unit_delta(unit, value)?)?;
    Some(format!(
        "{} {}",
        ts.format("%Y-%m-%d"),
        ts.format(clock_format(ts.nanosecond()))
    ))
}

fn format_time(unit: TimeUnit, value: i64) -> Option<String> {
    let (time, _) = NaiveTime::MIN.overflowing_add_signed(unit_delta(unit, value)?);
    Some(time.format(clock_format(time.nanosecond())).to_string())
}

/// DuckDB's own interval text, e.g. `1 year 2 months 3 days 04:05:06`.
fn format_interval(months: i32, days: i32, nanos: i64) -> String {
    let mut parts = Vec::new();
    push_unit(&mut parts, months / 12, "year");
    push_unit(&mut parts, months % 12, "month");
    push_unit(&mut parts, days, "day");

    if nanos != 0 || parts.is_empty() {
        let clock = TimeDelta::nanoseconds(nanos.saturating_abs());
        let secs = clock.num_seconds();
        let micros = clock.subsec_nanos() / 1_000;
        let sign = if nanos < 0 { "-" } else { "" };
        let mut text = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3_600,
            (secs % 3_600) / 60,
            secs % 60
        );
        if micros != 0 {
            text.push_str(&format!(".{:06}", micros));
        }
        parts.push(text);
    }
    parts.join(" ")
}

fn push_unit(parts: &mut Vec<String>, amount: i32, unit: &str) {
    match amount {
        0 => {}
        1 | -1 => parts.push(format!("{} {}", amount, unit)),
        _ => parts.push(format!("{} {}s", amount, unit)),
    }
}

pub fn base64_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut result = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0] as usize;
        let b1 = chunk.get(1).copied().unwrap_or(0) as usize;
        let b2 = chunk.get(2).copied().unwrap_or(0) as usize;

        result.push(ALPHABET[b0 >> 2] as char);
        result.push(ALPHABET[((b0 & 0x03) << 4) | (b1 >> 4)] as char);
        result.push(if chunk.len() > 1 {
            ALPHABET[((b1 & 0x0f) << 2) | (b2 >> 6)] as char
        } else {
            '='
        });
        result.push(if chunk.len() > 2 {
            ALPHABET[b2 & 0x3f] as char
        } else {
            '='
        });
    }
    result
}
