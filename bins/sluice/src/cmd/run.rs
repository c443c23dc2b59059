use std::path::Path;

use sluice_api::decoder::MessageDecoder;
use sluice_api::writer::RecordWriterProvider;
use sluice_decoder_string::StringMessageDecoder;
use sluice_engine::config::JobConfig;
use sluice_engine::plugin_host::{MessageDecoderPlugin, RecordWriterPlugin};
use sluice_engine::runner::Job;
use sluice_writer_byte_array::{ByteArrayConfig, ByteArrayRecordWriterProvider};

use super::config::RunArgs;
use super::error::CliError;

pub async fn run(args: &RunArgs) -> Result<(), CliError> {
    tracing::info!(config = %args.config.display(), "loading job");
    let config = JobConfig::load(&args.config)?;

    let writer = writer_plugin(config.writer.plugin.as_deref())?;
    let decoder = decoder_plugin(config.decoder.plugin.plugin.as_deref())?;
    tracing::info!(
        job = %config.name,
        writer = writer.name(),
        decoder = decoder.name(),
        topic = config.topic(),
        inputs = config.inputs.len(),
        "job configured"
    );

    let job = Job::new(&config, writer, decoder)?;
    let reports = job.run().await?;

    for report in &reports {
        if report.files.is_empty() {
            tracing::info!(task = %report.task, "no records, nothing committed");
        }
        for file in &report.files {
            tracing::info!(
                task = %report.task,
                records = report.records,
                file = %file.display(),
                "committed"
            );
        }
    }
    Ok(())
}

/// The `.so` at `path`, or the linked-in byte-array writer.
pub fn writer_plugin(path: Option<&Path>) -> Result<RecordWriterPlugin, CliError> {
    match path {
        Some(path) => Ok(RecordWriterPlugin::load(path)?),
        None => Ok(RecordWriterPlugin::builtin(
            "byte-array",
            ByteArrayConfig::config_params(),
            |ctx| {
                Ok(Box::new(ByteArrayRecordWriterProvider::new(ctx)?)
                    as Box<dyn RecordWriterProvider>)
            },
        )),
    }
}

/// The `.so` at `path`, or the linked-in string decoder.
pub fn decoder_plugin(path: Option<&Path>) -> Result<MessageDecoderPlugin, CliError> {
    match path {
        Some(path) => Ok(MessageDecoderPlugin::load(path)?),
        None => Ok(MessageDecoderPlugin::builtin("string", Vec::new(), || {
            Ok(Box::new(StringMessageDecoder::new()) as Box<dyn MessageDecoder<Output = String>>)
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_builtin_job() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "one\ntwo\n").unwrap();
        let out = dir.path().join("out");
        let job = dir.path().join("job.toml");
        std::fs::write(
            &job,
            format!(
                "name = \"t\"\noutput_dir = {out:?}\ninputs = [{input:?}]\n\n[writer.config]\n\"etl.output.record.delimiter\" = \",\"\n"
            ),
        )
        .unwrap();

        run(&RunArgs { config: job }).await.unwrap();

        assert_eq!(std::fs::read(out.join("t-m-00000")).unwrap(), b"one,two,");
    }

    #[test]
    fn test_missing_plugin_library() {
        let err = writer_plugin(Some(Path::new("/nonexistent/libx.so"))).err().unwrap();
        assert!(err.to_string().contains("failed to load plugin"), "{err}");
    }
}
