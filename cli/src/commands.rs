//! Subcommand handlers.

use crate::config::Config;
use anyhow::Context;
use navgraph_frontend::{
    ApiClient, ExplorationRunner, FileStorage, HostApi, NavigationEditorProvider, PreviewCache,
    RunOutcome, SystemClock,
};
use navgraph_types::api::ExplorationStepRequest;
use navgraph_types::{EdgeRecord, Host, NodeRecord};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Graph content accepted by `tree import`.
#[derive(Debug, Deserialize)]
struct GraphFile {
    nodes: Vec<NodeRecord>,
    #[serde(default)]
    edges: Vec<EdgeRecord>,
}

fn api_client(config: &Config) -> Arc<ApiClient> {
    Arc::new(ApiClient::new_with_auth(
        config.server_url.clone(),
        config.auth_token.clone(),
    ))
}

fn provider(config: &Config) -> NavigationEditorProvider {
    let storage = Arc::new(FileStorage::open(&config.paths.preview_cache_path));
    NavigationEditorProvider::new(api_client(config), storage, config.editor_settings())
}

pub async fn show_tree(config: &Config, tree_id: &str) -> anyhow::Result<()> {
    let mut provider = provider(config);
    let nav = provider.navigation_mut();
    nav.load_tree(tree_id)
        .await
        .with_context(|| format!("Failed to load tree {}", tree_id))?;

    println!("{} ({})", nav.tree_name(), tree_id);
    println!("Nodes:");
    for node in nav.nodes() {
        let marker = if node.is_root() { " [root]" } else { "" };
        println!("  {:<24} {:<8} {}{}", node.id, node.node_type, node.label(), marker);
    }
    println!("Edges:");
    for edge in nav.edges() {
        let conditional = if edge.is_conditional() { " [conditional]" } else { "" };
        println!(
            "  {:<24} {} -> {} ({} action sets){}",
            edge.id,
            edge.source,
            edge.target,
            edge.data.action_sets.len(),
            conditional
        );
    }

    provider.shutdown();
    Ok(())
}

pub async fn import_tree(config: &Config, tree_id: &str, file: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let graph: GraphFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let mut provider = provider(config);
    let nav = provider.navigation_mut();
    nav.load_tree(tree_id)
        .await
        .with_context(|| format!("Failed to load tree {}", tree_id))?;
    nav.replace_contents(
        graph.nodes.into_iter().map(NodeRecord::into_node).collect(),
        graph.edges.into_iter().map(EdgeRecord::into_edge).collect(),
    )?;

    let sent = nav.save_tree().await.context("Failed to save tree")?;
    println!(
        "Saved {}: {} node(s), {} edge(s) updated; {} node(s), {} edge(s) deleted",
        tree_id,
        sent.nodes.len(),
        sent.edges.len(),
        sent.deleted_node_ids.len(),
        sent.deleted_edge_ids.len()
    );

    provider.shutdown();
    Ok(())
}

pub async fn navigate(
    config: &Config,
    tree_id: &str,
    node_id: &str,
    host_name: &str,
    device_id: &str,
) -> anyhow::Result<()> {
    let mut provider = provider(config);
    provider.registry().set_control_state(
        Some(&Host::new(host_name, config.server_url.clone())),
        Some(device_id),
        true,
    );

    let nav = provider.navigation_mut();
    nav.load_tree(tree_id)
        .await
        .with_context(|| format!("Failed to load tree {}", tree_id))?;
    let steps = nav
        .navigate_to(node_id)
        .await
        .with_context(|| format!("Failed to navigate to {}", node_id))?;

    for step in &steps {
        println!(
            "{:>3}. {} -> {} ({} action(s))",
            step.step_number,
            step.from_node_id,
            step.to_node_id,
            step.actions.len()
        );
    }
    println!("Reached {}: {}", node_id, nav.breadcrumb().join(" > "));

    provider.shutdown();
    Ok(())
}

pub async fn explore(
    config: &Config,
    tree_id: &str,
    host_name: &str,
    device_id: &str,
    device_model: &str,
) -> anyhow::Result<()> {
    let api: Arc<dyn HostApi> = api_client(config);
    let runner = ExplorationRunner::new(api, config.exploration_poll);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current item...");
            stop_on_signal.store(true, Ordering::SeqCst);
        }
    });

    let request = ExplorationStepRequest {
        tree_id: tree_id.to_string(),
        host_name: host_name.to_string(),
        device_id: device_id.to_string(),
        device_model: device_model.to_string(),
        exploration_id: None,
    };
    let summary = runner
        .run(request, &stop, |step| {
            if let Some(ref result) = step.result {
                let verdict = if result.passed { "PASS" } else { "FAIL" };
                println!(
                    "[{}/{}] {} {} {}",
                    step.completed_items, step.total_items, verdict, result.item, result.message
                );
            }
        })
        .await
        .context("Exploration failed")?;

    println!(
        "{} passed, {} failed ({}/{} items)",
        summary.passed(),
        summary.failed(),
        summary.completed_items,
        summary.total_items
    );
    match summary.outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Stopped => {
            warn!("Exploration stopped before completion");
            Ok(())
        }
        RunOutcome::Failed(message) => anyhow::bail!("Host ended exploration: {}", message),
    }
}

pub fn clear_cache(config: &Config) -> anyhow::Result<()> {
    let storage = Arc::new(FileStorage::open(&config.paths.preview_cache_path));
    let cache = PreviewCache::new(storage, Arc::new(SystemClock), &config.editor_settings());
    let count = cache.len();
    cache.clear();
    cache.flush().context("Failed to write preview cache")?;
    println!(
        "Cleared {} cached preview(s) in {}",
        count,
        config.paths.preview_cache_path.display()
    );
    Ok(())
}
