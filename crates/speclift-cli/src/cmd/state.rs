use super::{print_document, read_input, Context};
use crate::output::print_json;
use speclift_core::{paths, SpecliftError};
use std::path::Path;

pub fn save(ctx: &Context, stage: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let store = ctx.store()?;
    let saved = store.save_raw(stage, &text)?;

    if ctx.json {
        return print_document(&saved);
    }
    println!("saved: {stage} ({})", store.dir().display());
    Ok(())
}

pub fn load(ctx: &Context, stage: &str) -> anyhow::Result<()> {
    let store = ctx
        .try_store()?
        .ok_or_else(|| SpecliftError::NotFound(stage.to_string()))?;
    print_document(&store.load(stage)?)
}

pub fn latest(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx
        .try_store()?
        .ok_or_else(|| SpecliftError::NotFound(paths::LATEST_STEM.to_string()))?;
    print_document(&store.load_latest()?)
}

pub fn last_stage(ctx: &Context) -> anyhow::Result<()> {
    let last = ctx.try_store()?.and_then(|s| s.last_stage());

    if ctx.json {
        #[derive(serde::Serialize)]
        struct LastStageOutput {
            last_stage: Option<String>,
        }
        return print_json(&LastStageOutput {
            last_stage: last.map(|s| s.to_string()),
        });
    }

    match last {
        Some(stage) => println!("{stage}"),
        None => println!("none"),
    }
    Ok(())
}

pub fn is_complete(ctx: &Context, stage: &str) -> anyhow::Result<()> {
    let complete = ctx
        .try_store()?
        .is_some_and(|s| s.is_complete(stage));

    if ctx.json {
        #[derive(serde::Serialize)]
        struct IsCompleteOutput<'a> {
            stage: &'a str,
            complete: bool,
        }
        return print_json(&IsCompleteOutput { stage, complete });
    }

    println!("{complete}");
    Ok(())
}
