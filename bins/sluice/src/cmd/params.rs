use std::io::Write;

use sluice_api::config::{ConfigParam, ParamValue};
use sluice_engine::config::JobConfig;

use super::config::ParamsArgs;
use super::error::CliError;
use super::run::{decoder_plugin, writer_plugin};

pub fn run(args: &ParamsArgs) -> Result<(), CliError> {
    let config = args.config.as_deref().map(JobConfig::load).transpose()?;

    let writer = writer_plugin(config.as_ref().and_then(|c| c.writer.plugin.as_deref()))?;
    let decoder = decoder_plugin(config.as_ref().and_then(|c| c.decoder.plugin.plugin.as_deref()))?;

    let mut out = std::io::stdout().lock();
    print_params(&mut out, &format!("writer ({})", writer.name()), writer.params())?;
    print_params(&mut out, &format!("decoder ({})", decoder.name()), decoder.params())?;
    Ok(())
}

fn print_params(out: &mut impl Write, title: &str, params: &[ConfigParam]) -> std::io::Result<()> {
    writeln!(out, "{title}")?;
    if params.is_empty() {
        writeln!(out, "  (no parameters)")?;
    }
    for p in params {
        let default = match &p.default {
            Some(ParamValue::Str(s)) => format!(" = {s:?}"),
            Some(ParamValue::Bool(b)) => format!(" = {b}"),
            Some(ParamValue::I64(i)) => format!(" = {i}"),
            Some(ParamValue::U64(u)) => format!(" = {u}"),
            None => String::new(),
        };
        let required = if p.required { " (required)" } else { "" };
        writeln!(
            out,
            "  {}: {:?}{default}{required}\n      {}",
            p.name, p.param_type, p.description
        )?;
    }
    Ok(())
}
