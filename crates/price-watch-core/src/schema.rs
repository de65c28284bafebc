use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::StoreError;
use crate::sample::Sample;

pub fn sample_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("price", DataType::Float64, false),
    ])
}

pub fn samples_to_record_batch(samples: &[Sample]) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(sample_schema());

    let timestamps: Vec<i64> = samples
        .iter()
        .map(|s| s.timestamp.timestamp_micros())
        .collect();
    let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        Arc::new(Float64Array::from(prices)),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn record_batch_to_samples(batch: &RecordBatch) -> Result<Vec<Sample>, StoreError> {
    let timestamps = batch
        .column(0)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| StoreError::InvalidData("expected timestamp column".into()))?;

    let prices = batch
        .column(1)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| StoreError::InvalidData("expected price column".into()))?;

    let mut samples = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let micros = timestamps.value(i);
        let timestamp = chrono::DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| StoreError::InvalidData(format!("invalid timestamp: {micros}")))?;

        samples.push(Sample {
            timestamp,
            price: prices.value(i),
        });
    }

    Ok(samples)
}

pub fn write_parquet(path: &Path, samples: &[Sample]) -> Result<(), StoreError> {
    let batch = samples_to_record_batch(samples)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<Vec<Sample>, StoreError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut all_samples = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut samples = record_batch_to_samples(&batch)?;
        all_samples.append(&mut samples);
    }

    Ok(all_samples)
}
