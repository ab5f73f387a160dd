//! `PGCOPY` binary encoding.
//!
//! Layout: an 11 byte signature, a 32 bit flags word and a header extension,
//! then one tuple per row (16 bit field count, each field as a 32 bit length
//! followed by its bytes, `-1` for NULL), then a `-1` field count as trailer.
//! All integers are big-endian.

use crate::error::{DataError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

/// Binary COPY signature.
pub const SIGNATURE: &[u8; 11] = b"PGCOPY\n\xff\r\n\0";

/// Seconds between the Unix epoch and 2000-01-01, the `PostgreSQL` epoch.
const PG_EPOCH_UNIX_SECS: i64 = 946_684_800;
/// `NaiveDate::num_days_from_ce` of 2000-01-01.
const PG_EPOCH_DAYS_FROM_CE: i32 = 730_120;

fn copy_error(message: impl Into<String>) -> DataError {
    DataError::Copy(message.into())
}

/// A field value in binary COPY encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyValue {
    /// SQL NULL
    Null,
    /// `bool`
    Bool(bool),
    /// `int2`
    Int2(i16),
    /// `int4`
    Int4(i32),
    /// `int8`
    Int8(i64),
    /// `float4`
    Float4(f32),
    /// `float8`
    Float8(f64),
    /// `text` / `varchar`
    Text(String),
    /// `bytea`
    Bytea(Vec<u8>),
    /// `uuid`
    Uuid(Uuid),
    /// `timestamptz`
    Timestamp(DateTime<Utc>),
    /// `date`
    Date(NaiveDate),
}

impl CopyValue {
    /// Field bytes, or `None` for NULL.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] if a timestamp is outside the range
    /// `PostgreSQL` can represent.
    pub fn encode(&self) -> Result<Option<Vec<u8>>> {
        let bytes = match self {
            Self::Null => return Ok(None),
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Int2(v) => v.to_be_bytes().to_vec(),
            Self::Int4(v) => v.to_be_bytes().to_vec(),
            Self::Int8(v) => v.to_be_bytes().to_vec(),
            Self::Float4(v) => v.to_be_bytes().to_vec(),
            Self::Float8(v) => v.to_be_bytes().to_vec(),
            Self::Text(v) => v.as_bytes().to_vec(),
            Self::Bytea(v) => v.clone(),
            Self::Uuid(v) => v.as_bytes().to_vec(),
            Self::Timestamp(v) => v
                .timestamp_micros()
                .checked_sub(PG_EPOCH_UNIX_SECS * 1_000_000)
                .ok_or_else(|| copy_error(format!("timestamp {v} out of range")))?
                .to_be_bytes()
                .to_vec(),
            Self::Date(v) => (v.num_days_from_ce() - PG_EPOCH_DAYS_FROM_CE)
                .to_be_bytes()
                .to_vec(),
        };
        Ok(Some(bytes))
    }
}

macro_rules! copy_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for CopyValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

copy_value_from! {
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytea,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
}

impl From<&str> for CopyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&[u8]> for CopyValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytea(value.to_vec())
    }
}

impl<T: Into<Self>> From<Option<T>> for CopyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Encodes rows into a binary COPY stream.
///
/// The header is written on construction; [`BinaryCopyWriter::finish`] adds
/// the trailer. Bytes can be drained as they accumulate with
/// [`BinaryCopyWriter::take_chunk`].
///
/// # Example
///
/// ```
/// use whippet_data::copy::{BinaryCopyReader, BinaryCopyWriter, CopyValue};
///
/// # fn main() -> Result<(), whippet_data::DataError> {
/// let mut writer = BinaryCopyWriter::new();
/// writer.write_row(&[CopyValue::from(1_i32), CopyValue::from("root")])?;
/// let bytes = writer.finish();
///
/// let rows = BinaryCopyReader::read_all(&bytes)?;
/// assert_eq!(rows[0].get::<String>(1)?.as_deref(), Some("root"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BinaryCopyWriter {
    buffer: Vec<u8>,
    columns: Option<usize>,
    rows: u64,
}

impl Default for BinaryCopyWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryCopyWriter {
    /// Start a stream, writing the header.
    #[must_use]
    pub fn new() -> Self {
        let mut buffer = Vec::with_capacity(4096);
        buffer.extend_from_slice(SIGNATURE);
        buffer.extend_from_slice(&0_i32.to_be_bytes()); // flags
        buffer.extend_from_slice(&0_i32.to_be_bytes()); // header extension length
        Self {
            buffer,
            columns: None,
            rows: 0,
        }
    }

    /// Append one row.
    ///
    /// Every row must have as many fields as the first.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] for an empty row, a field count that
    /// differs from the first row, or a field too large for the format. The
    /// stream is unchanged then.
    pub fn write_row(&mut self, values: &[CopyValue]) -> Result<()> {
        if values.is_empty() {
            return Err(copy_error("row has no fields"));
        }
        match self.columns {
            Some(columns) if columns != values.len() => {
                return Err(copy_error(format!(
                    "row has {} fields, expected {columns}",
                    values.len()
                )));
            },
            _ => {},
        }
        let count = i16::try_from(values.len())
            .map_err(|_| copy_error(format!("row has too many fields ({})", values.len())))?;

        let mut row = Vec::new();
        row.extend_from_slice(&count.to_be_bytes());
        for value in values {
            match value.encode()? {
                None => row.extend_from_slice(&(-1_i32).to_be_bytes()),
                Some(bytes) => {
                    let len = i32::try_from(bytes.len())
                        .map_err(|_| copy_error(format!("field of {} bytes is too large", bytes.len())))?;
                    row.extend_from_slice(&len.to_be_bytes());
                    row.extend_from_slice(&bytes);
                },
            }
        }

        self.buffer.extend_from_slice(&row);
        self.columns = Some(values.len());
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// Bytes buffered and not yet taken.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drain the buffered bytes.
    pub fn take_chunk(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Append the trailer and return the remaining bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.buffer.extend_from_slice(&(-1_i16).to_be_bytes());
        self.buffer
    }
}

/// One decoded row: raw field bytes, `None` for NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRow {
    fields: Vec<Option<Vec<u8>>>,
}

impl BinaryRow {
    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw bytes of field `index`, `None` for NULL.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] if `index` is out of range.
    pub fn raw(&self, index: usize) -> Result<Option<&[u8]>> {
        self.fields
            .get(index)
            .map(Option::as_deref)
            .ok_or_else(|| copy_error(format!("field {index} out of range ({} fields)", self.fields.len())))
    }

    /// Whether field `index` is NULL.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] if `index` is out of range.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.raw(index)?.is_none())
    }

    /// Decode field `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] if `index` is out of range or the bytes do
    /// not decode as `T`.
    pub fn get<T: CopyDecode>(&self, index: usize) -> Result<Option<T>> {
        self.raw(index)?.map(T::decode).transpose()
    }
}

/// Types decodable from a binary COPY field.
pub trait CopyDecode: Sized {
    /// Type name used in error messages.
    const PG_TYPE: &'static str;

    /// Decode non-NULL field bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] if the bytes are not a valid encoding.
    fn decode(bytes: &[u8]) -> Result<Self>;
}

fn fixed<const N: usize>(bytes: &[u8], pg_type: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes)
        .map_err(|_| copy_error(format!("expected {N} bytes for {pg_type}, found {}", bytes.len())))
}

macro_rules! copy_decode_be {
    ($($ty:ty => $pg:literal),* $(,)?) => {
        $(
            impl CopyDecode for $ty {
                const PG_TYPE: &'static str = $pg;

                fn decode(bytes: &[u8]) -> Result<Self> {
                    Ok(<$ty>::from_be_bytes(fixed(bytes, Self::PG_TYPE)?))
                }
            }
        )*
    };
}

copy_decode_be! {
    i16 => "int2",
    i32 => "int4",
    i64 => "int8",
    f32 => "float4",
    f64 => "float8",
}

impl CopyDecode for bool {
    const PG_TYPE: &'static str = "bool";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let [byte] = fixed::<1>(bytes, Self::PG_TYPE)?;
        Ok(byte != 0)
    }
}

impl CopyDecode for String {
    const PG_TYPE: &'static str = "text";

    fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_utf8(bytes.to_vec()).map_err(|e| copy_error(format!("invalid UTF-8 in text field: {e}")))
    }
}

impl CopyDecode for Vec<u8> {
    const PG_TYPE: &'static str = "bytea";

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl CopyDecode for Uuid {
    const PG_TYPE: &'static str = "uuid";

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_bytes(fixed(bytes, Self::PG_TYPE)?))
    }
}

impl CopyDecode for DateTime<Utc> {
    const PG_TYPE: &'static str = "timestamptz";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let micros = i64::from_be_bytes(fixed(bytes, Self::PG_TYPE)?);
        let secs = micros.div_euclid(1_000_000) + PG_EPOCH_UNIX_SECS;
        let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000)
            .map_err(|_| copy_error("timestamp sub-second part out of range"))?;
        Self::from_timestamp(secs, nanos).ok_or_else(|| copy_error(format!("timestamp {micros} out of range")))
    }
}

impl CopyDecode for NaiveDate {
    const PG_TYPE: &'static str = "date";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let days = i32::from_be_bytes(fixed(bytes, Self::PG_TYPE)?);
        days.checked_add(PG_EPOCH_DAYS_FROM_CE)
            .and_then(Self::from_num_days_from_ce_opt)
            .ok_or_else(|| copy_error(format!("date {days} out of range")))
    }
}

/// Decodes a binary COPY stream.
#[derive(Debug)]
pub struct BinaryCopyReader<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> BinaryCopyReader<'a> {
    /// Validate the header and position the reader on the first row.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] for a bad signature, unknown critical
    /// flags, or a truncated header.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = Self {
            data,
            pos: 0,
            done: false,
        };

        if Self::take(&mut reader, SIGNATURE.len())? != SIGNATURE {
            return Err(copy_error("invalid binary COPY signature"));
        }
        let flags = i32::from_be_bytes(reader.take_array()?);
        // Bits 16-31 are critical: a reader must reject ones it does not know.
        if flags & !0xFFFF != 0 {
            return Err(copy_error(format!("unsupported binary COPY flags {flags:#x}")));
        }
        let extension = u32::from_be_bytes(reader.take_array()?);
        let extension = usize::try_from(extension).map_err(|_| copy_error("header extension too large"))?;
        Self::take(&mut reader, extension)?;

        Ok(reader)
    }

    /// Decode a whole stream.
    ///
    /// # Errors
    ///
    /// See [`BinaryCopyReader::new`] and [`BinaryCopyReader::next_row`].
    pub fn read_all(data: &'a [u8]) -> Result<Vec<BinaryRow>> {
        Self::new(data)?.collect()
    }

    /// Next row, or `None` after the trailer.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] for truncated input or an invalid field
    /// count or length.
    pub fn next_row(&mut self) -> Result<Option<BinaryRow>> {
        if self.done {
            return Ok(None);
        }

        let count = i16::from_be_bytes(self.take_array()?);
        if count == -1 {
            self.done = true;
            return Ok(None);
        }
        let count = usize::try_from(count).map_err(|_| copy_error(format!("invalid field count {count}")))?;

        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let len = i32::from_be_bytes(self.take_array()?);
            if len == -1 {
                fields.push(None);
                continue;
            }
            let len = usize::try_from(len).map_err(|_| copy_error(format!("invalid field length {len}")))?;
            fields.push(Some(self.take(len)?.to_vec()));
        }
        Ok(Some(BinaryRow { fields }))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| copy_error("truncated binary COPY data"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        fixed(self.take(N)?, "binary COPY header")
    }
}

impl Iterator for BinaryCopyReader<'_> {
    type Item = Result<BinaryRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.next_row().transpose();
        if matches!(row, Some(Err(_))) {
            self.done = true;
        }
        row
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[test]
    fn empty_stream_is_header_and_trailer() {
        let bytes = BinaryCopyWriter::new().finish();

        let mut expected = SIGNATURE.to_vec();
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
        assert_eq!(bytes, expected);
        assert!(BinaryCopyReader::read_all(&bytes).unwrap().is_empty());
    }

    #[test]
    fn encodes_row_layout() {
        let mut writer = BinaryCopyWriter::new();
        writer
            .write_row(&[CopyValue::Int4(7), CopyValue::Null, CopyValue::from("ab")])
            .unwrap();
        let bytes = writer.finish();

        let row = &bytes[19..bytes.len() - 2];
        assert_eq!(
            row,
            &[
                0, 3, // field count
                0, 0, 0, 4, 0, 0, 0, 7, // int4
                0xFF, 0xFF, 0xFF, 0xFF, // NULL
                0, 0, 0, 2, b'a', b'b', // text
            ]
        );
    }

    #[test]
    fn decodes_every_supported_type() {
        let id = Uuid::new_v4();
        let at = DateTime::from_timestamp(1_700_000_000, 123_456_000).unwrap();
        let day = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();

        let mut writer = BinaryCopyWriter::new();
        writer
            .write_row(&[
                true.into(),
                5_i16.into(),
                (-9_i32).into(),
                i64::MAX.into(),
                1.5_f32.into(),
                (-0.25_f64).into(),
                "tenant".into(),
                vec![0_u8, 255].into(),
                id.into(),
                at.into(),
                day.into(),
                Option::<i32>::None.into(),
            ])
            .unwrap();
        let rows = BinaryCopyReader::read_all(&writer.finish()).unwrap();
        let row = &rows[0];

        assert_eq!(row.len(), 12);
        assert_eq!(row.get::<bool>(0).unwrap(), Some(true));
        assert_eq!(row.get::<i16>(1).unwrap(), Some(5));
        assert_eq!(row.get::<i32>(2).unwrap(), Some(-9));
        assert_eq!(row.get::<i64>(3).unwrap(), Some(i64::MAX));
        assert_eq!(row.get::<f32>(4).unwrap(), Some(1.5));
        assert_eq!(row.get::<f64>(5).unwrap(), Some(-0.25));
        assert_eq!(row.get::<String>(6).unwrap().as_deref(), Some("tenant"));
        assert_eq!(row.get::<Vec<u8>>(7).unwrap(), Some(vec![0, 255]));
        assert_eq!(row.get::<Uuid>(8).unwrap(), Some(id));
        assert_eq!(row.get::<DateTime<Utc>>(9).unwrap(), Some(at));
        assert_eq!(row.get::<NaiveDate>(10).unwrap(), Some(day));
        assert!(row.is_null(11).unwrap());
        assert_eq!(row.get::<i32>(11).unwrap(), None);
    }

    #[test]
    fn dates_and_timestamps_use_the_2000_epoch() {
        let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(CopyValue::Date(epoch).encode().unwrap(), Some(vec![0, 0, 0, 0]));

        let midnight = DateTime::from_timestamp(PG_EPOCH_UNIX_SECS, 0).unwrap();
        assert_eq!(CopyValue::Timestamp(midnight).encode().unwrap(), Some(vec![0; 8]));

        let before = DateTime::from_timestamp(PG_EPOCH_UNIX_SECS - 1, 500_000_000).unwrap();
        let encoded = CopyValue::Timestamp(before).encode().unwrap().unwrap();
        assert_eq!(i64::from_be_bytes(encoded.clone().try_into().unwrap()), -500_000);
        assert_eq!(DateTime::<Utc>::decode(&encoded).unwrap(), before);
    }

    #[test]
    fn rejects_inconsistent_field_counts() {
        let mut writer = BinaryCopyWriter::new();
        writer.write_row(&[1_i32.into(), 2_i32.into()]).unwrap();
        let before = writer.buffered_len();

        assert!(writer.write_row(&[1_i32.into()]).is_err());
        assert!(writer.write_row(&[]).is_err());
        assert_eq!(writer.buffered_len(), before);
        assert_eq!(writer.rows(), 1);
    }

    #[test]
    fn take_chunk_drains_buffer() {
        let mut writer = BinaryCopyWriter::new();
        let header = writer.take_chunk();
        assert_eq!(header.len(), 19);

        writer.write_row(&[1_i64.into()]).unwrap();
        let row = writer.take_chunk();
        let trailer = writer.finish();

        let stream = [header, row, trailer].concat();
        let rows = BinaryCopyReader::read_all(&stream).unwrap();
        assert_eq!(rows[0].get::<i64>(0).unwrap(), Some(1));
    }

    #[test]
    fn rejects_bad_signature_and_truncation() {
        assert!(BinaryCopyReader::new(b"NOTCOPY\n\xff\r\n\0\0\0\0\0\0\0\0\0").is_err());

        let mut writer = BinaryCopyWriter::new();
        writer.write_row(&["root".into()]).unwrap();
        let bytes = writer.finish();

        let truncated = &bytes[..bytes.len() - 4];
        assert!(BinaryCopyReader::read_all(truncated).is_err());
        // Missing trailer.
        assert!(BinaryCopyReader::read_all(&bytes[..bytes.len() - 2]).is_err());
    }

    #[test]
    fn wrong_width_fails_to_decode() {
        assert!(i32::decode(&[0, 1]).is_err());
        assert!(String::decode(&[0xFF]).is_err());
        let row = BinaryRow { fields: vec![None] };
        assert!(row.raw(3).is_err());
    }
}
