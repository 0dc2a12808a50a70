//! Rendering for `--output`: tables for people, JSON/YAML for tools,
//! one id per line for shell pipelines.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color ────────────────────────────────────────────────────────────

/// Whether to emit ANSI colors; `auto` honours `NO_COLOR` and TTY detection.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// "yes"/"no", green or red when colored.
pub fn flag(value: bool, color: bool) -> String {
    let text = if value { "yes" } else { "no" };
    if !color {
        return text.to_owned();
    }
    if value {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

/// Dimmed secondary text when colored.
pub fn muted(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_owned()
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Serde-backed formats shared by list and single renderers.
fn structured<T: Serialize + ?Sized>(format: &OutputFormat, data: &T) -> Option<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).expect("serialization should not fail"),
        OutputFormat::JsonCompact => serde_json::to_string(data).expect("serialization should not fail"),
        OutputFormat::Yaml => serde_yaml::to_string(data).expect("serialization should not fail"),
        OutputFormat::Table | OutputFormat::Plain => return None,
    };
    Some(rendered)
}

/// Render a collection: `to_row` feeds the table, `id_fn` the plain
/// output, and structured formats serialize `data` itself.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    if let Some(rendered) = structured(format, data) {
        return rendered;
    }
    if matches!(format, OutputFormat::Plain) {
        return data.iter().map(id_fn).collect::<Vec<_>>().join("\n");
    }
    let rows: Vec<R> = data.iter().map(to_row).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Render one record; the table format is the key/value block from
/// `detail_fn`.
pub fn render_single<T: Serialize>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String {
    match structured(format, data) {
        Some(rendered) => rendered,
        None if matches!(format, OutputFormat::Plain) => id_fn(data),
        None => detail_fn(data),
    }
}

/// Write to stdout unless quiet or empty.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{output}");
}
