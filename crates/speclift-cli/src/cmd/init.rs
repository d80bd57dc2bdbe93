use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use speclift_core::{chain::ChainId, config::Config, io, paths, store::StateStore};

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let root = &ctx.root;
    let quiet = ctx.json;

    if !quiet {
        println!("Initializing speclift in: {}", root.display());
    }

    // 1. Config
    let dir = paths::speclift_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        if !quiet {
            println!("  exists:  {}", paths::CONFIG_FILE);
        }
        Config::load(root).context("failed to load config.yaml")?
    } else {
        let cfg = Config::load_or_default(root)?;
        cfg.save(root).context("failed to write config.yaml")?;
        if !quiet {
            println!("  created: {}", paths::CONFIG_FILE);
        }
        cfg
    };

    // 2. Chain state directory
    let chain = match &ctx.chain {
        Some(raw) => raw.parse::<ChainId>()?,
        None => ChainId::generate(),
    };
    let store = match &ctx.state_dir {
        Some(dir) => StateStore::open(dir.clone()),
        None => StateStore::for_chain(&config.state_root(root), &chain),
    };
    store
        .init()
        .with_context(|| format!("failed to create {}", store.dir().display()))?;
    tracing::info!(chain = %chain, dir = %store.dir().display(), "chain initialized");

    if quiet {
        #[derive(serde::Serialize)]
        struct InitOutput<'a> {
            chain_id: &'a str,
            state_dir: String,
        }
        return print_json(&InitOutput {
            chain_id: chain.as_str(),
            state_dir: store.dir().display().to_string(),
        });
    }

    println!("  state:   {}", store.dir().display());
    println!("\nChain: {chain}");
    println!("Export it for later commands: export SPECLIFT_CHAIN={chain}");
    Ok(())
}
