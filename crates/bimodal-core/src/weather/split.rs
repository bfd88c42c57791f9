// crates/bimodal-core/src/weather/split.rs

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::schema::WeatherKind;

/// Splits a composite weather export into one interim csv per [`WeatherKind`].
///
/// Blocks are delimited by blank lines. Everything before the first blank line is preamble.
/// Each block is flushed when the blank line closing it is reached, minus its first line
/// (the block title), to `<stem>-<kind>.csv` next to the source. Blocks beyond the third
/// are dropped.
pub fn split_weather_file(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(PipelineError::MissingFile(path.to_path_buf()));
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::malformed(path.display().to_string(), "no file name"))?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut reader = BufReader::new(File::open(path)?);
    let mut written = Vec::new();
    let mut index: i32 = -1;
    let mut buffer: Vec<String> = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        if !is_blank(&line) {
            buffer.push(line.clone());
            continue;
        }

        if index >= 0 {
            match WeatherKind::ALL.get(index as usize) {
                Some(kind) => {
                    let target = parent.join(format!("{stem}{}", kind.interim_suffix()));
                    let mut out = File::create(&target)?;
                    for buffered in buffer.iter().skip(1) {
                        out.write_all(buffered.as_bytes())?;
                    }
                    debug!(file = %target.display(), lines = buffer.len().saturating_sub(1), "wrote interim weather file");
                    written.push(target);
                }
                None => {
                    warn!(file = %path.display(), block = index, "dropping extra weather block");
                }
            }
        }
        buffer.clear();
        index += 1;
    }

    if !buffer.is_empty() && index >= 0 && (index as usize) < WeatherKind::ALL.len() {
        warn!(
            file = %path.display(),
            lines = buffer.len(),
            "weather block not closed by a blank line was ignored"
        );
    }

    Ok(written)
}

fn is_blank(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).is_empty()
}
