use super::{print_document, read_input, Context};
use crate::output::print_json;
use anyhow::Context as _;
use speclift_core::{
    chain::ChainId,
    document::{self, StageDocument, Validation},
    SpecliftError,
};
use std::path::Path;

pub fn id(ctx: &Context) -> anyhow::Result<()> {
    let id = ChainId::generate();
    if ctx.json {
        #[derive(serde::Serialize)]
        struct IdOutput<'a> {
            chain_id: &'a str,
        }
        return print_json(&IdOutput {
            chain_id: id.as_str(),
        });
    }
    println!("{id}");
    Ok(())
}

/// Exit 0 on pass; on failure report the reason and exit non-zero.
pub fn validate(ctx: &Context, file: Option<&Path>) -> anyhow::Result<()> {
    let doc = StageDocument::parse(&read_input(file)?)?;
    let verdict = document::validate(&doc);

    if ctx.json {
        print_json(&verdict)?;
    } else if verdict.is_pass() {
        println!("pass");
    }

    match verdict {
        Validation::Pass => Ok(()),
        Validation::Fail(reason) => Err(SpecliftError::InvalidState(reason).into()),
    }
}

pub fn merge(ctx: &Context, old: Option<&Path>, new: &Path) -> anyhow::Result<()> {
    let base = base_document(ctx, old)?;
    let fields = StageDocument::parse(&read_input(Some(new))?)
        .with_context(|| format!("failed to parse {}", new.display()))?;
    print_document(&document::merge(&base, &fields))
}

pub fn mark_complete(
    ctx: &Context,
    stage: &str,
    from: Option<&Path>,
    save: bool,
) -> anyhow::Result<()> {
    let base = base_document(ctx, from)?;
    let marked = document::mark_complete(&base, stage);

    if save {
        let store = ctx.store()?;
        store.save(stage, &marked)?;
        tracing::info!(stage, "marked complete and saved");
    }
    print_document(&marked)
}

/// The document named by `path`, or the chain's latest when omitted.
fn base_document(ctx: &Context, path: Option<&Path>) -> anyhow::Result<StageDocument> {
    match path {
        Some(p) => Ok(StageDocument::parse(&read_input(Some(p))?)
            .with_context(|| format!("failed to parse {}", p.display()))?),
        None => Ok(ctx
            .store()?
            .load_latest()
            .context("no base document: pass a file or save a stage first")?),
    }
}
