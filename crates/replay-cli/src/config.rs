use anyhow::{Context, Result};
use replay_graph::EventPos;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub trace: PathBuf,
    /// Position to play to; the last event when absent.
    pub to: Option<EventPos>,
    /// After playing forward, play back to the first event.
    pub rewind: bool,
    pub ticks: u32,
    pub two_dimensional: bool,
    pub seed: Option<u64>,
    pub config: Option<PathBuf>,
}

pub fn parse_args() -> Result<CliConfig> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_position(input: &str) -> Result<EventPos> {
    let Some((step, index)) = input.split_once(':') else {
        anyhow::bail!("invalid position: {input} (expected STEP:INDEX)");
    };
    let step = step
        .parse()
        .with_context(|| format!("invalid step in position {input}"))?;
    let index = index
        .parse()
        .with_context(|| format!("invalid index in position {input}"))?;
    Ok(EventPos::new(step, index))
}

fn parse_args_from<I>(args: I) -> Result<CliConfig>
where
    I: IntoIterator<Item = OsString>,
{
    let mut trace = None;
    let mut to = None;
    let mut rewind = false;
    let mut ticks = 0;
    let mut two_dimensional = false;
    let mut seed = None;
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--to" {
            let Some(value) = args.next() else {
                anyhow::bail!("--to expects STEP:INDEX");
            };
            to = Some(parse_position(&value.to_string_lossy())?);
        } else if arg == "--rewind" {
            rewind = true;
        } else if arg == "--ticks" {
            let Some(value) = args.next() else {
                anyhow::bail!("--ticks expects a count");
            };
            let value = value.to_string_lossy();
            ticks = value
                .parse()
                .with_context(|| format!("invalid tick count: {value}"))?;
        } else if arg == "--2d" {
            two_dimensional = true;
        } else if arg == "--seed" {
            let Some(value) = args.next() else {
                anyhow::bail!("--seed expects a number");
            };
            let value = value.to_string_lossy();
            seed = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid seed: {value}"))?,
            );
        } else if arg == "--config" {
            let Some(path) = args.next() else {
                anyhow::bail!("--config expects a path");
            };
            config = Some(PathBuf::from(path));
        } else if arg.to_string_lossy().starts_with("--") {
            anyhow::bail!("unknown argument: {:?}", arg);
        } else if trace.is_none() {
            trace = Some(PathBuf::from(arg));
        } else {
            anyhow::bail!("unexpected extra argument: {:?}", arg);
        }
    }

    let Some(trace) = trace else {
        anyhow::bail!("usage: replay <trace.jsonl> [--to STEP:INDEX] [--rewind] [--ticks N] [--2d] [--seed N] [--config PATH]");
    };
    Ok(CliConfig {
        trace,
        to,
        rewind,
        ticks,
        two_dimensional,
        seed,
        config,
    })
}
