use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use sluice_writer_byte_array::{Compression, Delimiter};

use super::config::InspectArgs;
use super::error::CliError;

pub fn run(args: &InspectArgs) -> Result<(), CliError> {
    let compression = match args.codec.as_str() {
        "auto" => {
            let name = args
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Compression::from_file_name(&name)
        }
        name => Compression::from_name(name).ok_or_else(|| {
            CliError::Config(format!(
                "unknown codec '{name}' (expected auto, none, gzip, snappy or deflate)"
            ))
        })?,
    };
    let delimiter = Delimiter::parse(&args.delimiter);

    let file = File::open(&args.file)
        .map_err(|e| CliError::Config(format!("cannot open {}: {e}", args.file.display())))?;
    let mut data = Vec::new();
    compression
        .reader(BufReader::new(file))
        .read_to_end(&mut data)?;

    let records = split_records(&data, delimiter.as_bytes());
    let limit = args.limit.unwrap_or(usize::MAX);

    let mut out = BufWriter::new(std::io::stdout().lock());
    for record in records.iter().take(limit) {
        out.write_all(record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(
        file = %args.file.display(),
        codec = compression.name(),
        records = records.len(),
        "inspected"
    );
    Ok(())
}

/// Split a decompressed file back into records.
///
/// Every record is followed by the delimiter; trailing bytes without one
/// (a truncated file) form a last record.
pub fn split_records<'a>(data: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    if delimiter.is_empty() {
        return if data.is_empty() { Vec::new() } else { vec![data] };
    }

    let mut records = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        match rest.windows(delimiter.len()).position(|w| w == delimiter) {
            Some(i) => {
                records.push(&rest[..i]);
                rest = &rest[i + delimiter.len()..];
            }
            None => {
                records.push(rest);
                break;
            }
        }
    }
    records
}
