use crate::error::CoreError;
use crate::types::Flair;
use tracing::debug;

/// Body of a bulk flair update: one `user,text,class` line per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPayload {
    csv: String,
    lines: usize,
}

impl BatchPayload {
    pub fn as_str(&self) -> &str {
        &self.csv
    }

    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    pub fn into_string(self) -> String {
        self.csv
    }
}

/// Formats parallel `authors`/`flairs` into a single payload.
///
/// Returns `Ok(None)` for empty input so the caller can skip the network call.
/// Fields that contain separators or quotes are CSV-quoted; anything else is
/// written verbatim.
pub fn build_batch_payload(
    authors: &[String],
    flairs: &[Flair],
) -> Result<Option<BatchPayload>, CoreError> {
    if authors.len() != flairs.len() {
        return Err(CoreError::InvalidInput {
            message: format!(
                "{} authors but {} flairs in batch",
                authors.len(),
                flairs.len()
            ),
        });
    }

    if authors.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (author, flair) in authors.iter().zip(flairs) {
        writer
            .write_record([author.as_str(), flair.text.as_str(), flair.css_class.as_str()])
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to write flair line for {}: {}", author, e),
            })?;
    }

    let bytes = writer.into_inner().map_err(|e| CoreError::Internal {
        message: format!("Failed to finish flair batch: {}", e),
    })?;
    let mut csv = String::from_utf8(bytes).map_err(|e| CoreError::Internal {
        message: format!("Flair batch is not valid UTF-8: {}", e),
    })?;

    // The writer terminates every record; the payload must not end in a blank line.
    if csv.ends_with('\n') {
        csv.pop();
    }

    debug!("Built flair batch with {} lines", authors.len());
    Ok(Some(BatchPayload {
        csv,
        lines: authors.len(),
    }))
}
