use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sluice_api::config::ConfigValues;
use sluice_api::decoder::MessageDecoder;
use sluice_api::task::{TaskContext, TaskId};
use sluice_api::writer::RecordWriterProvider;

use crate::committer::WorkDirCommitter;
use crate::config::JobConfig;
use crate::error::EngineError;
use crate::plugin_host::{MessageDecoderPlugin, RecordWriterPlugin};
use crate::task::TaskAttempt;

/// Outcome of one committed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskId,
    pub records: u64,
    /// Committed files; empty when the input had no records.
    pub files: Vec<PathBuf>,
}

/// Run one task: decode newline-separated payloads from `input`, write them
/// through one record writer and commit its file.
///
/// The writer is opened lazily with the first record as sample, so an empty
/// input commits nothing. On any error the task's staged output is discarded.
pub fn run_task<R: BufRead>(
    ctx: &dyn TaskContext,
    committer: &WorkDirCommitter,
    decoder: &dyn MessageDecoder<Output = String>,
    provider: &dyn RecordWriterProvider,
    file_name: &str,
    input: R,
) -> Result<TaskReport, EngineError> {
    let task = ctx.task_id().clone();
    committer.setup_task()?;

    let outcome = write_records(ctx, committer, decoder, provider, file_name, input)
        .and_then(|records| Ok((records, committer.commit_task()?)));

    match outcome {
        Ok((records, files)) => {
            tracing::info!(task = %task, records, files = files.len(), "task committed");
            Ok(TaskReport {
                task,
                records,
                files,
            })
        }
        Err(e) => {
            tracing::warn!(task = %task, error = %e, "task failed, aborting");
            if let Err(abort) = committer.abort_task() {
                tracing::error!(task = %task, error = %abort, "abort failed");
            }
            Err(e)
        }
    }
}

fn write_records<R: BufRead>(
    ctx: &dyn TaskContext,
    committer: &WorkDirCommitter,
    decoder: &dyn MessageDecoder<Output = String>,
    provider: &dyn RecordWriterProvider,
    file_name: &str,
    input: R,
) -> Result<u64, EngineError> {
    let mut payloads = input.split(b'\n');

    let Some(first) = payloads.next() else {
        return Ok(0);
    };
    let first = decoder.decode(&first?).into_bytes();

    let mut writer = provider.data_record_writer(ctx, file_name, Some(&first), committer)?;
    writer.write(Some(&first))?;
    let mut records = 1;

    for payload in payloads {
        let record = decoder.decode(&payload?).into_bytes();
        writer.write(Some(&record))?;
        records += 1;
    }

    writer.close()?;
    Ok(records)
}

/// A configured job: one task per input file, run on the blocking pool.
pub struct Job {
    name: String,
    output_dir: PathBuf,
    file_name: String,
    inputs: Vec<PathBuf>,
    task_config: ConfigValues,
    decoder_props: ConfigValues,
    topic: String,
    writer: RecordWriterPlugin,
    decoder: MessageDecoderPlugin,
}

impl Job {
    /// Validate plugin tables and assemble the per-task configuration.
    ///
    /// Tasks see the job properties overlaid with the writer's validated params;
    /// the decoder is initialised with the job properties overlaid with its own.
    /// A param set only in `[properties]` keeps that value over its default.
    pub fn new(
        config: &JobConfig,
        writer: RecordWriterPlugin,
        decoder: MessageDecoderPlugin,
    ) -> Result<Self, EngineError> {
        let properties = config.property_values();

        let mut task_config = properties.clone();
        task_config.merge(&writer.configure(config.writer.config.as_ref(), &properties)?);

        let mut decoder_props = properties.clone();
        decoder_props.merge(&decoder.configure(config.decoder.plugin.config.as_ref(), &properties)?);

        Ok(Self {
            name: config.name.clone(),
            output_dir: config.output_dir.clone(),
            file_name: config.file_name().to_string(),
            inputs: config.inputs.clone(),
            task_config,
            decoder_props,
            topic: config.topic().to_string(),
            writer,
            decoder,
        })
    }

    pub fn task_config(&self) -> &ConfigValues {
        &self.task_config
    }

    /// Run all tasks concurrently. Reports come back in input order.
    ///
    /// Returns the first task error; tasks that did succeed stay committed.
    pub async fn run(self) -> Result<Vec<TaskReport>, EngineError> {
        let job = Arc::new(self);
        tracing::info!(job = %job.name, tasks = job.inputs.len(), "job started");

        let mut handles = Vec::with_capacity(job.inputs.len());
        for (partition, input) in job.inputs.iter().enumerate() {
            let job = Arc::clone(&job);
            let input = input.clone();
            let partition = partition as u32;
            handles.push(tokio::task::spawn_blocking(move || {
                job.run_partition(partition, &input)
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        let mut first_err = None;
        for (partition, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(EngineError::Task {
                    task: TaskId::new(job.name.as_str(), partition as u32, 0).to_string(),
                    message: format!("task panicked: {e}"),
                }),
            };
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_err {
            return Err(e);
        }

        let records: u64 = reports.iter().map(|r| r.records).sum();
        tracing::info!(job = %job.name, records, "job finished");
        Ok(reports)
    }

    fn run_partition(&self, partition: u32, input: &Path) -> Result<TaskReport, EngineError> {
        let id = TaskId::new(self.name.as_str(), partition, 0);
        let task_err = |message: String| EngineError::Task {
            task: id.to_string(),
            message,
        };

        let file = File::open(input)
            .map_err(|e| task_err(format!("open {}: {e}", input.display())))?;

        let ctx = TaskAttempt::new(id.clone(), self.task_config.clone());
        let committer = WorkDirCommitter::new(&self.output_dir, &id);

        let provider = self
            .writer
            .create(&ctx)
            .map_err(|e| task_err(format!("writer '{}': {e}", self.writer.name())))?;
        let mut decoder = self
            .decoder
            .create()
            .map_err(|e| task_err(format!("decoder '{}': {e}", self.decoder.name())))?;
        decoder.init(&self.decoder_props, &self.topic);

        tracing::debug!(
            task = %id,
            input = %input.display(),
            extension = provider.filename_extension(),
            "task started"
        );

        run_task(
            &ctx,
            &committer,
            decoder.as_ref(),
            provider.as_ref(),
            &self.file_name,
            BufReader::new(file),
        )
    }
}
