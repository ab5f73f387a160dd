//! COPY through a live `PostgreSQL` connection.

use super::binary::{BinaryCopyReader, BinaryCopyWriter, BinaryRow, CopyValue};
use super::text::parse_text_row;
use crate::connection::PostgresConnection;
use crate::error::{DataError, Result};
use futures::TryStreamExt;
use sqlx::Postgres;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgCopyIn, PgPoolCopyExt};
use whippet_runtime::metrics::DatabaseMetrics;

/// Buffered bytes sent to the server once exceeded.
const FLUSH_THRESHOLD: usize = 64 * 1024;

/// An open `COPY ... FROM STDIN (FORMAT BINARY)`.
///
/// Rows are encoded into a buffer that is sent whenever it grows past 64 KiB.
/// Nothing is visible until [`BinaryImporter::finish`]; dropping the importer
/// or calling [`BinaryImporter::cancel`] aborts the COPY.
pub struct BinaryImporter {
    copy: PgCopyIn<PoolConnection<Postgres>>,
    writer: BinaryCopyWriter,
}

impl std::fmt::Debug for BinaryImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryImporter")
            .field("rows", &self.writer.rows())
            .finish_non_exhaustive()
    }
}

impl BinaryImporter {
    /// Encode one row, flushing to the server when the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] for a row that does not fit the stream and
    /// [`DataError::Sqlx`] if sending fails.
    pub async fn write_row(&mut self, values: &[CopyValue]) -> Result<()> {
        self.writer.write_row(values)?;
        if self.writer.buffered_len() >= FLUSH_THRESHOLD {
            let chunk = self.writer.take_chunk();
            self.copy.send(chunk).await?;
        }
        Ok(())
    }

    /// Rows written so far.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.writer.rows()
    }

    /// Send the trailer and complete the COPY.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the server rejects the data.
    pub async fn finish(mut self) -> Result<u64> {
        let tail = self.writer.finish();
        self.copy.send(tail).await?;
        let rows = self.copy.finish().await?;

        DatabaseMetrics::record_copy("in", rows);
        tracing::debug!(rows, "Binary import finished");
        Ok(rows)
    }

    /// Abort the COPY; the server discards every row.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the abort cannot be delivered.
    pub async fn cancel(self) -> Result<()> {
        self.copy.abort("binary import cancelled").await?;
        tracing::debug!("Binary import cancelled");
        Ok(())
    }
}

impl PostgresConnection {
    /// Start a binary import.
    ///
    /// `copy_from` is the full statement, e.g.
    /// `COPY whippet.tenants (id, name) FROM STDIN (FORMAT BINARY)`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the server rejects the statement.
    pub async fn begin_binary_import(&self, copy_from: &str) -> Result<BinaryImporter> {
        let mut copy = self.pool().copy_in_raw(copy_from).await?;
        if copy.is_textual() {
            copy.abort("expected binary COPY").await?;
            return Err(DataError::Copy(format!("not a binary COPY: {copy_from}")));
        }
        let mut writer = BinaryCopyWriter::new();
        let header = writer.take_chunk();
        copy.send(header).await?;
        Ok(BinaryImporter { copy, writer })
    }

    /// Run `COPY ... TO STDOUT (FORMAT BINARY)` and decode the rows.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the statement fails and
    /// [`DataError::Copy`] if the output is not valid binary COPY data.
    pub async fn binary_export(&self, copy_to: &str) -> Result<Vec<BinaryRow>> {
        let data = self.collect_copy_out(copy_to).await?;
        let rows = BinaryCopyReader::read_all(&data)?;
        DatabaseMetrics::record_copy("out", u64::try_from(rows.len()).unwrap_or(u64::MAX));
        Ok(rows)
    }

    /// Run `COPY ... FROM STDIN` with text-format `data`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the server rejects the statement or data.
    pub async fn text_import(&self, copy_from: &str, data: &str) -> Result<u64> {
        let rows = self.raw_copy_in(copy_from, data.as_bytes()).await?;
        Ok(rows)
    }

    /// Run `COPY ... TO STDOUT` and parse the text-format rows.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the statement fails and
    /// [`DataError::Copy`] for output that is not UTF-8 text.
    pub async fn text_export(&self, copy_to: &str) -> Result<Vec<Vec<Option<String>>>> {
        let data = self.collect_copy_out(copy_to).await?;
        let text = String::from_utf8(data)
            .map_err(|e| DataError::Copy(format!("COPY output is not UTF-8: {e}")))?;
        let rows = text
            .lines()
            .map(parse_text_row)
            .collect::<Result<Vec<_>>>()?;
        DatabaseMetrics::record_copy("out", u64::try_from(rows.len()).unwrap_or(u64::MAX));
        Ok(rows)
    }

    /// Send raw bytes to a `COPY ... FROM STDIN`, in any format.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the server rejects the statement or data.
    pub async fn raw_copy_in(&self, copy_from: &str, data: &[u8]) -> Result<u64> {
        let mut copy = self.pool().copy_in_raw(copy_from).await?;
        copy.send(data).await?;
        let rows = copy.finish().await?;
        DatabaseMetrics::record_copy("in", rows);
        Ok(rows)
    }

    /// Collect the raw bytes of a `COPY ... TO STDOUT`, in any format.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the statement fails.
    pub async fn raw_copy_out(&self, copy_to: &str) -> Result<Vec<u8>> {
        self.collect_copy_out(copy_to).await
    }

    async fn collect_copy_out(&self, copy_to: &str) -> Result<Vec<u8>> {
        let stream = self.pool().copy_out_raw(copy_to).await?;
        let data = stream
            .try_fold(Vec::new(), |mut data, chunk| async move {
                data.extend_from_slice(&chunk);
                Ok(data)
            })
            .await?;
        Ok(data)
    }
}
