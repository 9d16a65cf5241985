use std::io::Write;

use serde_json::{Value, json};

use crate::report::Report;

/// Print the full report as JSON.
pub fn print_json(report: &Report, output: &mut dyn Write, pretty: bool) {
    let doc = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "primary_gem": report.primary_gem.as_ref().map(|gem| gem.name.clone()),
        "platforms": report.platforms,
        "bundled_with": report.bundled_with,
        "dependencies": report.dependencies,
        "packages": report.packages,
        "relationships": report.relationships,
        "diagnostics": report.diagnostics,
    });
    write_doc(&doc, output, pretty);
}

/// Print the nested `name@version` tree of every top-level dependency.
pub fn print_tree_json(report: &Report, output: &mut dyn Write, pretty: bool) {
    let mut trees = serde_json::Map::new();
    for gem in &report.dependencies {
        for (key, children) in &gem.dependencies.0 {
            trees.insert(key.clone(), json!(children));
        }
    }
    write_doc(&Value::Object(trees), output, pretty);
}

/// Print the flattened relationships as a JSON array.
pub fn print_edges_json(report: &Report, output: &mut dyn Write, pretty: bool) {
    write_doc(&json!(report.relationships), output, pretty);
}

fn write_doc(doc: &Value, output: &mut dyn Write, pretty: bool) {
    if pretty {
        serde_json::to_writer_pretty(&mut *output, doc).ok();
    } else {
        serde_json::to_writer(&mut *output, doc).ok();
    }
    writeln!(output).ok();
}
