use super::Context;
use crate::output::{print_json, print_table};
use anyhow::Context as _;
use speclift_core::{stage::StageName, store};

pub fn next(ctx: &Context) -> anyhow::Result<()> {
    let pipeline = ctx.config()?.pipeline().context("invalid pipeline in config")?;
    let last = ctx.try_store()?.and_then(|s| s.last_stage());
    let next = pipeline.next_after(last.as_ref());

    if ctx.json {
        #[derive(serde::Serialize)]
        struct NextOutput<'a> {
            last_stage: Option<&'a StageName>,
            next_stage: Option<&'a StageName>,
            alternatives: Vec<&'a StageName>,
        }
        let alternatives = next
            .map(|n| pipeline.alternatives(n.ordinal()))
            .unwrap_or_default();
        return print_json(&NextOutput {
            last_stage: last.as_ref(),
            next_stage: next,
            alternatives,
        });
    }

    match next {
        Some(stage) => println!("{stage}"),
        None => println!("done"),
    }
    Ok(())
}

pub fn status(ctx: &Context) -> anyhow::Result<()> {
    let pipeline = ctx.config()?.pipeline().context("invalid pipeline in config")?;
    let store = ctx.try_store()?;
    let completed = store
        .as_ref()
        .map(|s| s.completed_stages())
        .unwrap_or_default();
    let last = store.as_ref().and_then(|s| s.last_stage());

    let status_of = |stage: &StageName| -> &'static str {
        if completed.contains(stage) {
            "done"
        } else if completed.iter().any(|c| c.is_sibling_of(stage)) {
            "skipped"
        } else {
            "pending"
        }
    };

    #[derive(serde::Serialize)]
    struct StageRow {
        stage: String,
        status: &'static str,
    }

    let mut rows: Vec<StageRow> = pipeline
        .stages()
        .iter()
        .map(|s| StageRow {
            stage: s.to_string(),
            status: status_of(s),
        })
        .collect();
    // Stages saved by the orchestrator that the configured pipeline doesn't name.
    rows.extend(
        completed
            .iter()
            .filter(|c| !pipeline.contains(c))
            .map(|c| StageRow {
                stage: c.to_string(),
                status: "extra",
            }),
    );

    if ctx.json {
        #[derive(serde::Serialize)]
        struct StatusOutput {
            chain_id: Option<String>,
            state_dir: Option<String>,
            last_stage: Option<String>,
            stages: Vec<StageRow>,
        }
        return print_json(&StatusOutput {
            chain_id: store.as_ref().and_then(|s| s.chain()).map(|c| c.to_string()),
            state_dir: store.as_ref().map(|s| s.dir().display().to_string()),
            last_stage: last.map(|s| s.to_string()),
            stages: rows,
        });
    }

    match &store {
        Some(store) => {
            if let Some(chain) = store.chain() {
                println!("Chain: {chain}");
            }
            println!("State: {}", store.dir().display());
        }
        None => println!("State: no chains yet"),
    }
    match &last {
        Some(s) => println!("Last:  {s}\n"),
        None => println!("Last:  none\n"),
    }
    print_table(
        &["STAGE", "STATUS"],
        rows.into_iter()
            .map(|r| vec![r.stage, r.status.to_string()])
            .collect(),
    );
    Ok(())
}

pub fn chains(ctx: &Context) -> anyhow::Result<()> {
    let state_root = ctx.state_root()?;
    let chains = store::list_chains(&state_root)?;

    #[derive(serde::Serialize)]
    struct ChainRow {
        chain_id: String,
        last_stage: Option<String>,
    }

    let rows: Vec<ChainRow> = chains
        .iter()
        .map(|c| ChainRow {
            chain_id: c.to_string(),
            last_stage: store::StateStore::for_chain(&state_root, c)
                .last_stage()
                .map(|s| s.to_string()),
        })
        .collect();

    if ctx.json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No chains yet. Run: speclift init");
        return Ok(());
    }
    print_table(
        &["CHAIN", "LAST STAGE"],
        rows.into_iter()
            .map(|r| vec![r.chain_id, r.last_stage.unwrap_or_else(|| "none".to_string())])
            .collect(),
    );
    Ok(())
}
