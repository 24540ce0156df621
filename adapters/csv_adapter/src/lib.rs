use chrono::{NaiveDate, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tgstat_core::domain::{ChannelRecord, ExportOutcome};
use tgstat_core::ports::{RecordExporter, Result};
use tgstat_core::utils::export_file_name;

pub const CSV_HEADER: &str = "Name,Ссылка,Подписчиков,Постов в неделю,Ссылка tgstat";

/// Renders records as CSV text: the header line, then one fully quoted row per
/// record in the order given. Returns `None` when there is nothing to export.
pub fn dump(records: &[ChannelRecord]) -> Result<Option<String>> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for record in records {
        writer
            .write_record([
                record.title.as_str(),
                record.telegram_link.as_str(),
                record.subscribers.as_str(),
                record.average_posts_per_7_days.as_str(),
                record.channel_url.as_str(),
            ])
            .map_err(io::Error::from)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let rows = String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut output = String::with_capacity(CSV_HEADER.len() + 1 + rows.len());
    output.push_str(CSV_HEADER);
    output.push('\n');
    output.push_str(rows.trim_end_matches('\n'));
    Ok(Some(output))
}

/// CSV exporter adapter writing date-stamped files into a folder
pub struct CsvRecordExporter {
    output_folder: PathBuf,
}

impl CsvRecordExporter {
    pub fn new<P: Into<PathBuf>>(output_folder: P) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    /// Writes the export as it would be named on `date`
    pub fn export_on(&self, records: &[ChannelRecord], date: NaiveDate) -> Result<ExportOutcome> {
        let content = match dump(records)? {
            Some(content) => content,
            None => {
                tracing::info!("store is empty, nothing to export");
                return Ok(ExportOutcome::NothingToExport);
            }
        };

        // Create output directory if it doesn't exist
        let output_dir = Path::new(&self.output_folder);
        fs::create_dir_all(output_dir)?;

        let file_path = output_dir.join(export_file_name(date));
        fs::write(&file_path, content)?;
        tracing::info!(path = %file_path.display(), records = records.len(), "records exported");
        Ok(ExportOutcome::Written(file_path))
    }
}

impl RecordExporter for CsvRecordExporter {
    fn export(&self, records: &[ChannelRecord]) -> Result<ExportOutcome> {
        self.export_on(records, Utc::now().date_naive())
    }
}
