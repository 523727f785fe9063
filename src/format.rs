use bytesize::ByteSize;
use colored::{ColoredString, Colorize};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

use crate::models::{DiffType, FileAnalysis, ImageAnalysis, LayerAnalysis};

const MODE_TYPE_MASK: u32 = 0o170000;
const MODE_DIR: u32 = 0o040000;
const MODE_SYMLINK: u32 = 0o120000;

pub fn format_size(bytes: u64) -> String {
    ByteSize(bytes).to_string_as(true)
}

pub fn format_efficiency(efficiency: f64) -> String {
    format!("{:.2}%", efficiency * 100.0)
}

/// Unix style permission string, e.g. `-rwxr-xr-x`.
pub fn format_mode(mode: u32, is_dir: bool) -> String {
    let kind = match mode & MODE_TYPE_MASK {
        MODE_SYMLINK => 'l',
        MODE_DIR => 'd',
        _ if is_dir => 'd',
        _ => '-',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

fn paint(text: &str, diff_type: DiffType) -> ColoredString {
    match diff_type {
        DiffType::Added => text.green(),
        DiffType::Removed => text.red(),
        DiffType::Modified => text.yellow(),
        DiffType::Unchanged => text.normal(),
    }
}

pub fn print_image_table(image: &str, analysis: &ImageAnalysis) {
    println!("\n{}", "Image Analysis".bold().underline());
    println!("Image: {}", image.bright_cyan());
    println!("Efficiency: {}", format_efficiency(analysis.efficiency).bold());
    println!("Total Size: {}", format_size(analysis.size_bytes).bold());
    println!("User Size: {}", format_size(analysis.user_size_bytes));
    println!("Wasted: {}", format_size(analysis.wasted_bytes).red());
    println!("Layers: {}", analysis.layer_analysis_list.len());

    if !analysis.layer_analysis_list.is_empty() {
        println!("\n{}", "Layer Breakdown".bold().underline());

        let mut builder = Builder::default();
        builder.push_record(["#", "ID", "Size", "Files", "Command"]);

        for layer in &analysis.layer_analysis_list {
            builder.push_record([
                &layer.index.to_string(),
                &layer.short_id,
                &format_size(layer.size),
                &layer.file_analysis.file_count().to_string(),
                &truncate_command(&layer.command, 60),
            ]);
        }

        println!("{}", styled(builder));
    }

    if !analysis.inefficiency_analysis_list.is_empty() {
        println!("\n{}", "Wasted Space".bold().underline());

        let mut builder = Builder::default();
        builder.push_record(["Path", "Wasted"]);

        for item in &analysis.inefficiency_analysis_list {
            builder.push_record([&item.path, &format_size(item.cumulative_size)]);
        }

        println!("{}", styled(builder));
    }
}

pub fn print_layer_tree(layer: &LayerAnalysis) {
    println!("\n{}", format!("Layer {}", layer.index).bold().underline());
    println!("ID: {}", layer.id.bright_cyan());
    println!("Command: {}", layer.command);
    println!(
        "Size: {} ({} files)\n",
        format_size(layer.size).bold(),
        layer.file_analysis.file_count()
    );

    for line in render_tree(&layer.file_analysis) {
        let size = if line.is_dir {
            String::new()
        } else {
            format_size(line.size)
        };
        let mut name = line.name.clone();
        if !line.link_name.is_empty() {
            name = format!("{} → {}", name, line.link_name);
        }
        println!(
            "{} {:>10}  {}{}",
            format_mode(line.mode, line.is_dir).dimmed(),
            size,
            line.prefix.dimmed(),
            paint(&name, line.diff_type)
        );
    }
}

/// One printable row of a file tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLine {
    pub prefix: String,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub mode: u32,
    pub link_name: String,
    pub diff_type: DiffType,
}

/// Flattens a tree into rows with box drawing prefixes, children sorted by name.
pub fn render_tree(root: &FileAnalysis) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    render_children(root, "", &mut lines);
    lines
}

fn render_children(node: &FileAnalysis, indent: &str, lines: &mut Vec<TreeLine>) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };

        lines.push(TreeLine {
            prefix: format!("{}{}", indent, branch),
            name: name.clone(),
            is_dir: child.is_dir,
            size: child.size,
            mode: child.mode,
            link_name: child.link_name.clone(),
            diff_type: child.diff_type,
        });

        if child.is_dir {
            let next = format!("{}{}", indent, if last { "    " } else { "│   " });
            render_children(child, &next, lines);
        }
    }
}

fn styled(builder: Builder) -> tabled::Table {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table
}

fn truncate_command(cmd: &str, max_len: usize) -> String {
    if cmd.chars().count() <= max_len {
        cmd.to_string()
    } else {
        let head: String = cmd.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
