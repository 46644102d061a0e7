use std::io::{self, Write};

use clap::ValueEnum;
use omniture_core::{FieldValue, RowSink};
use serde_json::{Map, Value};

/// Row serialization chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Jsonl,
}

/// Writes the header line and one CSV line per row.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<CountingWriter<W>>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(CountingWriter::new(inner));
        Self { writer }
    }

    pub fn bytes_written(&self) -> u64 {
        self.writer.get_ref().bytes_written()
    }

    pub fn into_inner(self) -> Result<W, csv::Error> {
        let counting = self.writer.into_inner().map_err(|err| err.into_error())?;
        Ok(counting.inner)
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    type Error = csv::Error;

    fn begin(&mut self, header: &[String]) -> Result<(), Self::Error> {
        self.writer.write_record(header)
    }

    fn push(&mut self, row: &[FieldValue]) -> Result<(), Self::Error> {
        self.writer
            .write_record(row.iter().map(|value| value.to_string()))
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes one JSON object per row, keyed by header column.
pub struct JsonLinesSink<W: Write> {
    out: CountingWriter<W>,
    header: Vec<String>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: CountingWriter::new(inner),
            header: Vec::new(),
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }

    pub fn into_inner(self) -> W {
        self.out.inner
    }
}

impl<W: Write> RowSink for JsonLinesSink<W> {
    type Error = io::Error;

    fn begin(&mut self, header: &[String]) -> Result<(), Self::Error> {
        self.header = header.to_vec();
        Ok(())
    }

    fn push(&mut self, row: &[FieldValue]) -> Result<(), Self::Error> {
        let mut object = Map::with_capacity(row.len());
        for (index, value) in row.iter().enumerate() {
            let key = self
                .header
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("column_{index}"));
            object.insert(key, serde_json::to_value(value)?);
        }
        serde_json::to_writer(&mut self.out, &Value::Object(object))?;
        self.out.write_all(b"\n")
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.out.flush()
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniture_core::{
        FlatRecord, FlatReport, Report, ReportDataNode, ReportElement, ReportMetric, RowEmitter,
    };

    fn header() -> Vec<String> {
        ["name", "day", "eVar2", "pageviews"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn records() -> Vec<FlatRecord> {
        vec![
            FlatRecord::from(vec![
                FieldValue::from("Thu. 1 Jan. 2015"),
                FieldValue::Integer(1),
                FieldValue::from("spring, sale"),
                FieldValue::Number(10.0),
            ]),
            FlatRecord::from(vec![
                FieldValue::from("Fri. 2 Jan. 2015"),
                FieldValue::Integer(2),
                FieldValue::from("direct"),
                FieldValue::Number(2.5),
            ]),
        ]
    }

    #[test]
    fn csv_sink_writes_header_and_quoted_rows() {
        let mut emitter = RowEmitter::new(CsvSink::new(Vec::new()));
        let summary = emitter.emit(&header(), &records()).expect("emit csv");
        assert_eq!(summary.rows, 2);

        let sink = emitter.into_inner();
        let written = sink.bytes_written();
        let bytes = sink.into_inner().expect("flush csv");
        assert_eq!(written, bytes.len() as u64);

        let text = String::from_utf8(bytes).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,day,eVar2,pageviews");
        assert_eq!(lines[1], "Thu. 1 Jan. 2015,1,\"spring, sale\",10");
        assert_eq!(lines[2], "Fri. 2 Jan. 2015,2,direct,2.5");
    }

    #[test]
    fn jsonl_sink_keys_values_by_header() {
        let mut emitter = RowEmitter::new(JsonLinesSink::new(Vec::new()));
        emitter.emit(&header(), &records()).expect("emit jsonl");

        let text = String::from_utf8(emitter.into_inner().into_inner()).expect("utf8");
        let rows: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["eVar2"], "spring, sale");
        assert_eq!(rows[0]["day"], 1);
        assert_eq!(rows[1]["pageviews"], 2.5);
    }

    fn ranked_report() -> FlatReport {
        FlatReport::from_report(&Report {
            kind: Some("ranked".to_string()),
            elements: vec![ReportElement::new("eVar2")],
            metrics: vec![ReportMetric::new("pageviews"), ReportMetric::new("visits")],
            data: vec![
                ReportDataNode::leaf("A", vec![10.0, 2.0]),
                ReportDataNode::leaf("B", vec![5.0, 1.0]),
            ],
            ..Report::default()
        })
    }

    #[test]
    fn ranked_report_keys_metrics_by_metric_id() {
        let flat = ranked_report();
        let mut emitter = RowEmitter::new(JsonLinesSink::new(Vec::new()));
        emitter.emit(&flat.header, &flat.records).expect("emit jsonl");

        let text = String::from_utf8(emitter.into_inner().into_inner()).expect("utf8");
        let row: Value =
            serde_json::from_str(text.lines().next().expect("first line")).expect("json line");
        assert_eq!(row["name"], "A");
        assert_eq!(row["eVar2"], "A");
        assert_eq!(row["pageviews"], 10.0);
        assert_eq!(row["visits"], 2.0);
    }

    #[test]
    fn ranked_report_writes_rectangular_csv() {
        let flat = ranked_report();
        let mut emitter = RowEmitter::new(CsvSink::new(Vec::new()));
        emitter.emit(&flat.header, &flat.records).expect("emit csv");

        let bytes = emitter.into_inner().into_inner().expect("flush csv");
        assert_eq!(
            String::from_utf8(bytes).expect("utf8"),
            "name,eVar2,pageviews,visits\nA,A,10,2\nB,B,5,1\n"
        );
    }

    #[test]
    fn csv_sink_rejects_ragged_rows() {
        let mut sink = CsvSink::new(Vec::new());
        sink.begin(&["name".to_string(), "visits".to_string()])
            .expect("begin");
        assert!(sink.push(&[FieldValue::from("A")]).is_err());
    }

    #[test]
    fn jsonl_sink_keeps_values_beyond_the_header() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.begin(&["name".to_string()]).expect("begin");
        sink.push(&[FieldValue::from("A"), FieldValue::Number(4.0)])
            .expect("push");

        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        let row: Value = serde_json::from_str(text.trim()).expect("json line");
        assert_eq!(row["column_1"], 4.0);
    }
}
