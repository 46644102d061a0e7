use std::convert::Infallible;

use crate::report::{FieldValue, FlatRecord};

/// Downstream consumer of flattened rows.
///
/// `begin` is called once with the header before any row; rows arrive in
/// report order with values in header order.
pub trait RowSink {
    type Error;

    fn begin(&mut self, header: &[String]) -> Result<(), Self::Error>;

    fn push(&mut self, row: &[FieldValue]) -> Result<(), Self::Error>;

    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Counts reported after emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub columns: usize,
    pub rows: u64,
}

/// Hands flattened records to a [`RowSink`] without touching their values.
#[derive(Debug)]
pub struct RowEmitter<S> {
    sink: S,
}

impl<S: RowSink> RowEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn emit(
        &mut self,
        header: &[String],
        records: &[FlatRecord],
    ) -> Result<EmitSummary, S::Error> {
        self.sink.begin(header)?;

        let mut summary = EmitSummary {
            columns: header.len(),
            rows: 0,
        };
        for record in records {
            self.sink.push(record.values())?;
            summary.rows += 1;
        }

        self.sink.finish()?;
        Ok(summary)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

/// Sink that keeps everything in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub header: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
    pub finished: bool,
}

impl RowSink for MemorySink {
    type Error = Infallible;

    fn begin(&mut self, header: &[String]) -> Result<(), Self::Error> {
        self.header = header.to_vec();
        Ok(())
    }

    fn push(&mut self, row: &[FieldValue]) -> Result<(), Self::Error> {
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.finished = true;
        Ok(())
    }
}
