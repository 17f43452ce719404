mod config;
mod loader;

use anyhow::Result;
use config::{parse_args, CliConfig};
use replay_graph::graph::layout;
use replay_graph::graph::{
    EventPlayer, GraphListener, GraphModel, GraphNotice, GraphView, RenderContext,
};
use replay_graph::util::config::{load_from_path, load_or_default, LayoutConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Mirrors failures and progress into the log.
struct LogListener;

impl GraphListener for LogListener {
    fn processing(&mut self, processing: bool) {
        tracing::debug!(processing, "playback");
    }

    fn event_failed(&mut self, message: &str, event: &str) {
        tracing::error!(%message, "event failed:\n{event}");
    }

    fn viewing_volume_reset(&mut self, bound: f64) {
        tracing::debug!(bound, "viewing volume grew");
    }
}

fn layout_config(cli: &CliConfig) -> Result<LayoutConfig> {
    let mut cfg = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => load_or_default(),
    };
    if cli.two_dimensional {
        cfg.two_dimensional = true;
    }
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    Ok(cfg)
}

fn summary(view: &GraphView, failures: usize) -> serde_json::Value {
    let model = view.model();
    let nodes: Vec<serde_json::Value> = model
        .visible_nodes()
        .iter()
        .filter_map(|&k| model.node(k))
        .map(|n| {
            serde_json::json!({
                "name": n.name,
                "label": n.label,
                "mass": n.mass,
                "position": [n.position.x, n.position.y, n.position.z],
                "children": n.children().len(),
            })
        })
        .collect();
    serde_json::json!({
        "nodes": model.node_count(),
        "edges": model.edge_count(),
        "visible": model.visible_nodes().len(),
        "hidden": model.hidden_nodes().len(),
        "dead_edges": model.dead_edges().len(),
        "failures": failures,
        "visible_nodes": nodes,
    })
}

fn main() -> Result<()> {
    init_tracing();
    let cli = parse_args()?;
    let cfg = layout_config(&cli)?;
    let params = cfg.params();

    let mut store = loader::load_trace(&cli.trace)?;
    tracing::info!(events = store.len(), steps = store.num_steps(), "trace loaded");

    let model = match cfg.seed {
        Some(seed) => GraphModel::seeded(seed),
        None => GraphModel::new(),
    };
    let mut view = GraphView::new(model, params, cfg.max_fps());
    view.set_layout_params(params);
    // headless: layout runs inline below instead of on the worker
    view.set_render_context(RenderContext {
        available: false,
        selecting: false,
    });
    let (tx, rx) = crossbeam_channel::unbounded();
    view.add_listener(Box::new(LogListener));
    view.add_listener(Box::new(tx));
    view.load_registry(&store);

    let mut player = EventPlayer::new();
    match cli.to {
        Some(pos) => store.set_current(pos),
        None => store.set_current_to_last(),
    }
    player.catch_up(&store, &mut view);
    tracing::info!(position = ?player.position(), "caught up");

    for _ in 0..cli.ticks {
        layout::step(&mut view.model(), &params);
    }

    if cli.rewind {
        if let Some(first) = store.first() {
            store.set_current(first);
            player.catch_up(&store, &mut view);
            tracing::info!(position = ?player.position(), "rewound");
        }
    }

    let failures = rx
        .try_iter()
        .filter(|n| matches!(n, GraphNotice::EventFailed { .. }))
        .count();
    println!("{}", serde_json::to_string_pretty(&summary(&view, failures))?);
    Ok(())
}
