mod json;
mod text;

pub use json::{print_edges_json, print_json, print_tree_json};
pub use text::{print_edges, print_text, print_tree};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
