use crate::cli::GlobalArgs;
use crate::support::{EXIT_CLEAN, context_or_exit, fatal, print_json};
use metasync_graph::resolve;
use metasync_scan::{build_graph, discover};
use serde_json::json;

pub fn run(global: &GlobalArgs, json_output: bool) -> i32 {
    let ctx = context_or_exit(global);
    let documents = discover(&ctx).unwrap_or_else(|e| fatal(e));
    let build = build_graph(&ctx, &documents);
    let resolution = resolve(&build.graph).unwrap_or_else(|e| fatal(e));

    if json_output {
        let nodes: Vec<_> = build
            .graph
            .nodes()
            .iter()
            .map(|node| {
                json!({
                    "id": node.id,
                    "meta_file": node.meta_file,
                    "meta_type": node.meta_type,
                    "hard_deps": node.hard_deps,
                    "soft_deps": node.soft_deps,
                    "batch": resolution.batch_of(&node.id),
                })
            })
            .collect();
        let problems: Vec<_> = build
            .gaps
            .iter()
            .filter_map(|gap| gap.context.problem.clone())
            .collect();
        print_json(&json!({
            "nodes": nodes,
            "order": resolution.order,
            "batches": resolution.batches,
            "problems": problems,
        }));
    } else {
        println!("metasync graph");
        println!("  Nodes: {}", build.graph.len());
        println!("  Order: {}", resolution.order.join(" -> "));
        for (index, batch) in resolution.batches.iter().enumerate() {
            println!("  Batch {index}: {}", batch.join(", "));
        }
        for gap in &build.gaps {
            if let Some(problem) = &gap.context.problem {
                println!("  Problem: {} ({})", problem, gap.meta_file);
            }
        }
    }
    EXIT_CLEAN
}
