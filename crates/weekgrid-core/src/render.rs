use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::focus::{Frame, trim_number};
use crate::layout::WeekLayout;
use crate::position::{SkipReason, TimeField, UnplaceableReason};
use crate::time::format_minutes;

const TABLE_HEADERS: [&str; 10] = [
    "Day", "Time", "Id", "Resource", "Top", "Height", "Left", "Width", "Z", "Flags",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    layout: &'a WeekLayout,
    frames: &'a [Frame],
}

#[derive(Debug, Clone)]
pub struct Renderer {
    format: OutputFormat,
    color: bool,
}

impl Renderer {
    pub fn new(format: OutputFormat, color: bool) -> Self {
        Self { format, color }
    }

    #[tracing::instrument(skip(self, out, layout, frames))]
    pub fn write_layout<W: Write>(
        &self,
        mut out: W,
        layout: &WeekLayout,
        frames: &[Frame],
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut out, &JsonReport { layout, frames })?;
                writeln!(out)?;
            }
            OutputFormat::Table => self.write_table_report(&mut out, layout, frames)?,
        }
        Ok(())
    }

    fn write_table_report<W: Write>(
        &self,
        out: &mut W,
        layout: &WeekLayout,
        frames: &[Frame],
    ) -> anyhow::Result<()> {
        let columns = layout
            .columns
            .iter()
            .enumerate()
            .map(|(idx, date)| format!("{idx}:{}", date.format("%a %d/%m")))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "week {}  [{}]", layout.label, columns)?;
        writeln!(out)?;

        let mut rows = Vec::with_capacity(layout.placements.len());
        for (placement, frame) in layout.placements.iter().zip(frames) {
            let mut flags = Vec::new();
            if placement.is_blocked {
                flags.push("blocked".to_string());
            }
            if let Some(slot) = placement.collision {
                flags.push(self.paint(&format!("conflict {}/{}", slot.index + 1, slot.size), "33"));
            }
            if frame.dimmed {
                flags.push("dimmed".to_string());
            }
            if !placement.warnings.is_empty() {
                flags.push(self.paint("bad-time", "31"));
            }

            rows.push(vec![
                placement.date.format("%a %d").to_string(),
                format!(
                    "{}-{}",
                    format_minutes(placement.start_minutes),
                    format_minutes(placement.end_minutes)
                ),
                placement.entry_id.clone(),
                placement.resource_id.clone().unwrap_or_default(),
                trim_number(placement.top),
                trim_number(placement.height),
                frame.left.to_string(),
                frame.width.to_string(),
                frame.z_index.to_string(),
                flags.join(" "),
            ]);
        }
        write_table(out, &TABLE_HEADERS, &rows)?;

        if !layout.skipped.is_empty() {
            writeln!(out)?;
            writeln!(out, "skipped:")?;
            for skipped in &layout.skipped {
                writeln!(out, "  {}  {}", skipped.entry_id, describe_skip(skipped.reason))?;
            }
        }

        let warnings = layout
            .placements
            .iter()
            .map(|p| (&p.entry_id, &p.warnings))
            .chain(layout.skipped.iter().map(|s| (&s.entry_id, &s.warnings)))
            .flat_map(|(id, warnings)| warnings.iter().map(move |w| (id, w)))
            .collect::<Vec<_>>();
        if !warnings.is_empty() {
            writeln!(out)?;
            writeln!(out, "warnings:")?;
            for (id, warning) in warnings {
                let field = match warning.field {
                    TimeField::Start => "start",
                    TimeField::End => "end",
                };
                writeln!(
                    out,
                    "  {}  malformed {} time {:?}; read as 00:00",
                    id,
                    field,
                    warning.raw.as_deref().unwrap_or("<missing>")
                )?;
            }
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn describe_skip(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::OutOfWindow => "outside the visible week",
        SkipReason::Unplaceable { cause } => match cause {
            UnplaceableReason::InvalidDate => "unplaceable: date is not YYYY-MM-DD",
            UnplaceableReason::DegenerateTimes => "unplaceable: start and end both read as 00:00",
            UnplaceableReason::InvertedRange => "unplaceable: end is not after start",
        },
    }
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

/// Left-aligned columns sized to the widest visible cell, so ANSI paint
/// does not skew alignment.
fn write_table<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    write_row(out, &widths, headers.iter().copied())?;
    let rules: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    write_row(out, &widths, rules.iter().map(String::as_str))?;
    for row in rows {
        write_row(out, &widths, row.iter().map(String::as_str))?;
    }
    Ok(())
}

fn write_row<'c, W: Write>(
    out: &mut W,
    widths: &[usize],
    cells: impl Iterator<Item = &'c str>,
) -> anyhow::Result<()> {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| {
            let padding = width.saturating_sub(visible_width(cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

/// Drops `ESC [ ... m` colour sequences.
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            chars.by_ref().find(|&c| c == 'm');
        } else {
            out.push(ch);
        }
    }
    out
}
