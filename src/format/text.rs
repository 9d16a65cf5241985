use std::io::Write;

use crate::lockfile::{DependencyTree, GemView};
use crate::report::Report;

// ANSI color codes
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Label column width (right-aligned).
const LABEL_WIDTH: usize = 12;

/// Print the report as human-readable text.
pub fn print_text(
    report: &Report,
    output: &mut dyn Write,
    verbose: bool,
    quiet: bool,
    use_color: bool,
) {
    if !quiet {
        if let Some(primary) = &report.primary_gem {
            let mut value = describe(primary);
            if let Some(path) = &primary.path {
                value.push_str(&format!(" at {}", path));
            }
            label_value(output, "Primary", &value, use_color);
        }

        if !report.platforms.is_empty() {
            label_value(output, "Platforms", &report.platforms.join(", "), use_color);
        }

        if let Some(version) = &report.bundled_with {
            label_value(output, "Bundled with", version, use_color);
        }

        let counts: Vec<String> = report
            .kind_counts()
            .iter()
            .map(|(kind, count)| format!("{} {}", kind, count))
            .collect();
        let gems = if counts.is_empty() {
            report.packages.len().to_string()
        } else {
            format!("{} ({})", report.packages.len(), counts.join(", "))
        };
        label_value(output, "Gems", &gems, use_color);

        if !report.dependencies.is_empty() {
            writeln!(output).ok();
            if use_color {
                writeln!(output, "{}{}Dependencies:{}", BOLD, CYAN, RESET).ok();
            } else {
                writeln!(output, "Dependencies:").ok();
            }
            for gem in &report.dependencies {
                print_dependency(output, gem, use_color);
            }
        }
    }

    if !report.diagnostics.is_empty() {
        let count = report.diagnostics.len();
        let msg = format!(
            "Warnings: {} line{} skipped or questioned",
            count,
            if count == 1 { "" } else { "s" }
        );
        if !quiet {
            writeln!(output).ok();
        }
        if use_color {
            writeln!(output, "{}{}{}{}", YELLOW, BOLD, msg, RESET).ok();
        } else {
            writeln!(output, "{}", msg).ok();
        }
        if verbose {
            for diagnostic in &report.diagnostics {
                writeln!(output, "  {}", diagnostic).ok();
            }
        }
    }
}

/// Print each top-level dependency with its nested dependencies indented
/// below it.
pub fn print_tree(report: &Report, output: &mut dyn Write, use_color: bool) {
    for gem in &report.dependencies {
        print_subtree(output, &gem.dependencies, 0, use_color);
    }
}

fn print_subtree(output: &mut dyn Write, tree: &DependencyTree, depth: usize, use_color: bool) {
    for (key, children) in &tree.0 {
        let indent = "  ".repeat(depth);
        if use_color && depth == 0 {
            writeln!(output, "{}{}{}{}", indent, BOLD, key, RESET).ok();
        } else {
            writeln!(output, "{}{}", indent, key).ok();
        }
        print_subtree(output, children, depth + 1, use_color);
    }
}

/// Print the flattened relationships, one `parent -> child` per line.
pub fn print_edges(report: &Report, output: &mut dyn Write, use_color: bool) {
    for rel in &report.relationships {
        if use_color && rel.parent.is_none() {
            writeln!(output, "{}{}{}", DIM, rel, RESET).ok();
        } else {
            writeln!(output, "{}", rel).ok();
        }
    }
}

fn describe(gem: &GemView) -> String {
    let mut text = gem.name.clone();
    if let Some(version) = &gem.version {
        text.push_str(&format!(" {}", version));
    }
    if let Some(kind) = gem.kind {
        text.push_str(&format!(" ({})", kind));
    }
    text
}

fn print_dependency(output: &mut dyn Write, gem: &GemView, use_color: bool) {
    let mut line = describe(gem);
    if !gem.requirements.is_empty() {
        line.push_str(&format!(" [{}]", gem.requirements.join(", ")));
    }
    if gem.pinned {
        if use_color {
            line.push_str(&format!(" {}pinned{}", YELLOW, RESET));
        } else {
            line.push_str(" pinned");
        }
    }
    writeln!(output, "  {}", line).ok();
}

fn label_value(output: &mut dyn Write, label: &str, value: &str, use_color: bool) {
    if use_color {
        writeln!(
            output,
            "{}{:>width$}:{} {}",
            CYAN,
            label,
            RESET,
            value,
            width = LABEL_WIDTH
        )
        .ok();
    } else {
        writeln!(output, "{:>width$}: {}", label, value, width = LABEL_WIDTH).ok();
    }
}
