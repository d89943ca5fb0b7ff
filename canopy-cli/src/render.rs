//! Terminal and JSON output for a view.

use canopy_model::{Model, NodeId, Point};
use canopy_view::{Normalization, View};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Print the node tree of `model` below `id`, one node per line.
pub fn print_tree(model: &Model, id: NodeId, indent: usize, with_points: bool) {
    let prefix = "  ".repeat(indent);
    let Some(node) = model.node(id) else {
        return;
    };

    let tags: Vec<String> = node.tags().iter().map(|tag| tag.cyan().to_string()).collect();
    let metadata: Vec<String> = node
        .metadata()
        .iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect();
    let count = node.point_slots().len();
    if metadata.is_empty() {
        println!("{prefix}[{}] {}", tags.join(" "), points_label(count).dimmed());
    } else {
        println!(
            "{prefix}[{}] {} {}",
            tags.join(" "),
            metadata.join(" ").yellow(),
            points_label(count).dimmed()
        );
    }

    if with_points && node.children().is_empty() {
        for point in model.points_of(id) {
            println!("{prefix}  {}", format_point(point));
        }
    }
    for &child in node.children() {
        print_tree(model, child, indent + 1, with_points);
    }
}

fn points_label(count: usize) -> String {
    if count == 1 {
        "(1 point)".to_string()
    } else {
        format!("({count} points)")
    }
}

fn format_point(point: &Point) -> String {
    format!(
        "#{:<5} ({:>8.3}, {:>8.3}, {:>8.3})  n=({:.3}, {:.3}, {:.3})  rcn={:.3}",
        point.index, point.x, point.y, point.z, point.xn, point.yn, point.zn, point.rcn
    )
}

/// Print a short header describing the view.
pub fn print_summary(view: &View) {
    let groups = view.groups().len();
    println!(
        "{} {} group{}, {} of {} points, {}",
        "view".green().bold(),
        groups,
        if groups == 1 { "" } else { "s" },
        view.points().len(),
        view.source_model().points().len(),
        view.group_normalization()
    );
}

#[derive(Debug, Serialize)]
struct ViewSummary<'a> {
    normalization: Normalization,
    group_normalization: Normalization,
    source_points: usize,
    groups: Vec<GroupSummary<'a>>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GroupSummary<'a> {
    tags: Vec<&'a str>,
    points: Vec<&'a Point>,
}

/// Serialize the view as pretty-printed JSON.
pub fn to_json(view: &View) -> serde_json::Result<String> {
    let model = view.model();
    let groups = view
        .groups()
        .iter()
        .enumerate()
        .map(|(index, &group)| GroupSummary {
            tags: model.tags(group).iter().map(String::as_str).collect(),
            points: view.group_points(index).collect(),
        })
        .collect();
    let summary = ViewSummary {
        normalization: view.normalization(),
        group_normalization: view.group_normalization(),
        source_points: view.source_model().points().len(),
        groups,
        warnings: view.warnings().iter().map(|w| w.message.clone()).collect(),
    };
    serde_json::to_string_pretty(&summary)
}
