use csv_async::AsyncReaderBuilder;
use futures::StreamExt;
use tokio::io::AsyncRead;

use crate::db::Row;
use crate::error::Result;

/// One parsed upload: the header line plus every data row in file order.
#[derive(Debug)]
pub struct CsvFile {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl CsvFile {
    /// Reads comma-delimited UTF-8 text, first line naming the columns.
    /// Short rows leave keys absent; values past the last header are
    /// dropped.
    pub async fn read<R>(reader: R) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut reader = AsyncReaderBuilder::new().flexible(true).create_reader(reader);

        let headers: Vec<String> = reader.headers().await?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        let mut records = reader.records();
        while let Some(record) = records.next().await {
            let record = record?;

            let mut row = Row::new();
            for (idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(idx) {
                    row.insert(header.clone(), value.to_string());
                }
            }

            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
