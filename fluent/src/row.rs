//! Tuples, columns, and the primitive codec.
//!
//! A collection's schema is a Rust tuple type whose elements implement
//! [`Column`]: the column list is carried in the type, and every pipeline
//! stage advertises its output tuple type so that rules are checked at build
//! time. `Column` is also the primitive codec: it says how a value crosses a
//! channel (a text frame), and how it lands in the lineage store (a SQL type
//! and a SQL literal).
//!
//! [`Row`] is implemented for tuples of one through eight columns, and
//! [`Concat`] for every pair of tuples whose combined arity stays within that
//! bound; `cross` and hash joins use it to emit the concatenation of their
//! input schemas.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ordered_float::OrderedFloat;

use crate::collections::LocalTupleId;
use crate::error::{Error, Result};

/// A column value rendered for the lineage store.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    /// A boolean column.
    Bool(bool),
    /// A signed integer column.
    Int(i64),
    /// An unsigned integer column.
    Unsigned(u64),
    /// A floating-point column.
    Double(f64),
    /// A text column.
    Text(String),
    /// A wall-clock instant, in microseconds since the epoch.
    Timestamp(u64),
    /// An array column, tagged with its element SQL type.
    Array(Vec<SqlValue>, String),
}

impl SqlValue {
    /// Renders the value as a SQL literal, quoting and escaping text.
    pub fn literal(&self) -> String {
        match self {
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Unsigned(u) => u.to_string(),
            SqlValue::Double(d) => d.to_string(),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Timestamp(micros) => format!(
                "TIMESTAMP WITH TIME ZONE 'epoch' + {} * INTERVAL '1 microsecond'",
                micros
            ),
            SqlValue::Array(items, element_type) => {
                let rendered: Vec<String> = items.iter().map(SqlValue::literal).collect();
                format!("ARRAY[{}]::{}[]", rendered.join(", "), element_type)
            }
        }
    }
}

/// A single column of a tuple.
///
/// The trait bundles the structural requirements a column must satisfy to
/// live in a collection (`Ord` for the backing map, `Hash` for the content
/// hash) with the primitive codec: a text encoding used for channel frames
/// and a SQL rendering used by the lineage store.
pub trait Column: Clone + Ord + std::hash::Hash + std::fmt::Debug + 'static {
    /// The SQL type the lineage store should declare for this column.
    fn sql_type() -> String;
    /// Encodes the value as a single channel frame.
    fn encode(&self) -> String;
    /// Decodes a channel frame. Failures cost the message, not the node.
    fn decode(frame: &str) -> Result<Self>;
    /// Renders the value for the lineage store.
    fn sql_value(&self) -> SqlValue;
}

fn parse<T: std::str::FromStr>(frame: &str, what: &str) -> Result<T> {
    frame
        .parse()
        .map_err(|_| Error::Codec(format!("cannot parse {:?} as {}", frame, what)))
}

impl Column for String {
    fn sql_type() -> String {
        "text".to_string()
    }
    fn encode(&self) -> String {
        self.clone()
    }
    fn decode(frame: &str) -> Result<Self> {
        Ok(frame.to_string())
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl Column for bool {
    fn sql_type() -> String {
        "boolean".to_string()
    }
    fn encode(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        match frame {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(Error::Codec(format!("cannot parse {:?} as bool", other))),
        }
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl Column for char {
    fn sql_type() -> String {
        "char(1)".to_string()
    }
    fn encode(&self) -> String {
        self.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::Codec(format!("cannot parse {:?} as char", frame))),
        }
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }
}

impl Column for i32 {
    fn sql_type() -> String {
        "integer".to_string()
    }
    fn encode(&self) -> String {
        self.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        parse(frame, "i32")
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Int(i64::from(*self))
    }
}

impl Column for i64 {
    fn sql_type() -> String {
        "bigint".to_string()
    }
    fn encode(&self) -> String {
        self.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        parse(frame, "i64")
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Int(*self)
    }
}

impl Column for u32 {
    fn sql_type() -> String {
        "bigint".to_string()
    }
    fn encode(&self) -> String {
        self.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        parse(frame, "u32")
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Int(i64::from(*self))
    }
}

impl Column for u64 {
    fn sql_type() -> String {
        "numeric(20)".to_string()
    }
    fn encode(&self) -> String {
        self.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        parse(frame, "u64")
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Unsigned(*self)
    }
}

impl Column for usize {
    fn sql_type() -> String {
        "numeric(20)".to_string()
    }
    fn encode(&self) -> String {
        self.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        parse(frame, "usize")
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Unsigned(*self as u64)
    }
}

impl Column for OrderedFloat<f32> {
    fn sql_type() -> String {
        "real".to_string()
    }
    fn encode(&self) -> String {
        self.0.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        Ok(OrderedFloat(parse(frame, "f32")?))
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Double(f64::from(self.0))
    }
}

impl Column for OrderedFloat<f64> {
    fn sql_type() -> String {
        "double precision".to_string()
    }
    fn encode(&self) -> String {
        self.0.to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        Ok(OrderedFloat(parse(frame, "f64")?))
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Double(self.0)
    }
}

impl<C: Column> Column for Vec<C> {
    fn sql_type() -> String {
        format!("{}[]", C::sql_type())
    }
    fn encode(&self) -> String {
        // Length-prefixed so that an empty vector and a vector holding one
        // empty string stay distinguishable.
        let mut out = self.len().to_string();
        for item in self {
            out.push('\u{1f}');
            out.push_str(&item.encode());
        }
        out
    }
    fn decode(frame: &str) -> Result<Self> {
        let mut parts = frame.split('\u{1f}');
        let count: usize = parse(parts.next().unwrap_or(""), "array length")?;
        let items: Vec<C> = parts.map(|p| C::decode(p)).collect::<Result<_>>()?;
        if items.len() != count {
            return Err(Error::Codec(format!(
                "array declares {} elements but carries {}",
                count,
                items.len()
            )));
        }
        Ok(items)
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Array(self.iter().map(Column::sql_value).collect(), C::sql_type())
    }
}

impl Column for LocalTupleId {
    fn sql_type() -> String {
        "text".to_string()
    }
    fn encode(&self) -> String {
        format!("{}:{}:{}", self.collection, self.hash, self.time)
    }
    fn decode(frame: &str) -> Result<Self> {
        let fields: Vec<&str> = frame.rsplitn(3, ':').collect();
        if fields.len() != 3 {
            return Err(Error::Codec(format!(
                "cannot parse {:?} as a tuple id",
                frame
            )));
        }
        Ok(LocalTupleId {
            collection: fields[2].to_string(),
            hash: parse(fields[1], "tuple hash")?,
            time: parse(fields[0], "logical time")?,
        })
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Text(self.encode())
    }
}

/// A wall-clock instant, the second column of every periodic collection.
///
/// Wraps `SystemTime` so that it orders and hashes like any other column; the
/// codec carries it as microseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TimePoint(SystemTime);

impl TimePoint {
    /// The current wall-clock time.
    pub fn now() -> Self {
        TimePoint(SystemTime::now())
    }

    /// The Unix epoch.
    pub fn epoch() -> Self {
        TimePoint(UNIX_EPOCH)
    }

    /// The instant `micros` microseconds after the epoch.
    pub fn from_micros(micros: u64) -> Self {
        TimePoint(UNIX_EPOCH + Duration::from_micros(micros))
    }

    /// Microseconds since the epoch.
    pub fn micros(&self) -> u64 {
        self.0
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }

    /// This instant shifted `by` into the future.
    pub fn advanced(&self, by: Duration) -> Self {
        TimePoint(self.0 + by)
    }

    /// How far this instant lies after `earlier`, if it does.
    pub fn since(&self, earlier: TimePoint) -> Option<Duration> {
        self.0.duration_since(earlier.0).ok()
    }
}

impl Default for TimePoint {
    fn default() -> Self {
        TimePoint::epoch()
    }
}

impl Column for TimePoint {
    fn sql_type() -> String {
        "timestamp with time zone".to_string()
    }
    fn encode(&self) -> String {
        self.micros().to_string()
    }
    fn decode(frame: &str) -> Result<Self> {
        Ok(TimePoint::from_micros(parse(frame, "time point")?))
    }
    fn sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.micros())
    }
}

/// A fixed-arity, statically typed tuple of columns.
pub trait Row: Clone + Ord + std::hash::Hash + std::fmt::Debug + 'static {
    /// The number of columns.
    const ARITY: usize;
    /// The SQL type of each column, in declaration order.
    fn sql_types() -> Vec<String>;
    /// Encodes each column as a channel frame, in declaration order.
    fn encode_columns(&self) -> Vec<String>;
    /// Decodes one frame per column. The frame count must match the arity.
    fn decode_columns(frames: &[String]) -> Result<Self>;
    /// Renders each column for the lineage store.
    fn sql_values(&self) -> Vec<SqlValue>;
}

macro_rules! implement_row {
    ($($column:ident)+) => {
        impl<$($column: Column),+> Row for ($($column,)+) {
            const ARITY: usize = [$(stringify!($column)),+].len();

            fn sql_types() -> Vec<String> {
                vec![$($column::sql_type()),+]
            }

            fn encode_columns(&self) -> Vec<String> {
                #[allow(non_snake_case)]
                let ($(ref $column,)+) = *self;
                vec![$($column.encode()),+]
            }

            fn decode_columns(frames: &[String]) -> Result<Self> {
                if frames.len() != Self::ARITY {
                    return Err(Error::Codec(format!(
                        "expected {} column frames, got {}", Self::ARITY, frames.len(),
                    )));
                }
                let mut frames = frames.iter();
                Ok(($($column::decode(frames.next().unwrap())?,)+))
            }

            fn sql_values(&self) -> Vec<SqlValue> {
                #[allow(non_snake_case)]
                let ($(ref $column,)+) = *self;
                vec![$($column.sql_value()),+]
            }
        }
    }
}

implement_row!(C0);
implement_row!(C0 C1);
implement_row!(C0 C1 C2);
implement_row!(C0 C1 C2 C3);
implement_row!(C0 C1 C2 C3 C4);
implement_row!(C0 C1 C2 C3 C4 C5);
implement_row!(C0 C1 C2 C3 C4 C5 C6);
implement_row!(C0 C1 C2 C3 C4 C5 C6 C7);

/// Tuple concatenation, the output schema of `cross` and hash joins.
pub trait Concat<Other: Row>: Row {
    /// The concatenated tuple type.
    type Output: Row;
    /// Concatenates the columns of `self` and `other`.
    fn concat(self, other: Other) -> Self::Output;
}

macro_rules! implement_concat {
    (($($left:ident)+) ($($right:ident)+)) => {
        impl<$($left: Column,)+ $($right: Column),+> Concat<($($right,)+)> for ($($left,)+) {
            type Output = ($($left,)+ $($right,)+);
            fn concat(self, other: ($($right,)+)) -> Self::Output {
                #[allow(non_snake_case)]
                let ($($left,)+) = self;
                #[allow(non_snake_case)]
                let ($($right,)+) = other;
                ($($left,)+ $($right,)+)
            }
        }
    }
}

implement_concat!((L0) (R0));
implement_concat!((L0) (R0 R1));
implement_concat!((L0) (R0 R1 R2));
implement_concat!((L0) (R0 R1 R2 R3));
implement_concat!((L0) (R0 R1 R2 R3 R4));
implement_concat!((L0) (R0 R1 R2 R3 R4 R5));
implement_concat!((L0) (R0 R1 R2 R3 R4 R5 R6));
implement_concat!((L0 L1) (R0));
implement_concat!((L0 L1) (R0 R1));
implement_concat!((L0 L1) (R0 R1 R2));
implement_concat!((L0 L1) (R0 R1 R2 R3));
implement_concat!((L0 L1) (R0 R1 R2 R3 R4));
implement_concat!((L0 L1) (R0 R1 R2 R3 R4 R5));
implement_concat!((L0 L1 L2) (R0));
implement_concat!((L0 L1 L2) (R0 R1));
implement_concat!((L0 L1 L2) (R0 R1 R2));
implement_concat!((L0 L1 L2) (R0 R1 R2 R3));
implement_concat!((L0 L1 L2) (R0 R1 R2 R3 R4));
implement_concat!((L0 L1 L2 L3) (R0));
implement_concat!((L0 L1 L2 L3) (R0 R1));
implement_concat!((L0 L1 L2 L3) (R0 R1 R2));
implement_concat!((L0 L1 L2 L3) (R0 R1 R2 R3));
implement_concat!((L0 L1 L2 L3 L4) (R0));
implement_concat!((L0 L1 L2 L3 L4) (R0 R1));
implement_concat!((L0 L1 L2 L3 L4) (R0 R1 R2));
implement_concat!((L0 L1 L2 L3 L4 L5) (R0));
implement_concat!((L0 L1 L2 L3 L4 L5) (R0 R1));
implement_concat!((L0 L1 L2 L3 L4 L5 L6) (R0));

/// A row whose first column is a transport address.
///
/// Channels require this: their `merge` sends the tuple to the address in the
/// first column. The bound is structural, so declaring a channel whose first
/// column is not a `String` fails to compile.
pub trait AddressedRow: Row {
    /// The destination address carried in the first column.
    fn address(&self) -> &str;
}

macro_rules! implement_addressed_row {
    ($($rest:ident)*) => {
        impl<$($rest: Column),*> AddressedRow for (String, $($rest,)*) {
            fn address(&self) -> &str {
                &self.0
            }
        }
    }
}

implement_addressed_row!();
implement_addressed_row!(C1);
implement_addressed_row!(C1 C2);
implement_addressed_row!(C1 C2 C3);
implement_addressed_row!(C1 C2 C3 C4);
implement_addressed_row!(C1 C2 C3 C4 C5);
implement_addressed_row!(C1 C2 C3 C4 C5 C6);
implement_addressed_row!(C1 C2 C3 C4 C5 C6 C7);
