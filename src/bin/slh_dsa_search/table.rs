//! Rendering of search results as console, markdown or csv tables.

use anyhow::Result;
use clap::ValueEnum;
use comfy_table::{presets, CellAlignment};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    Console,
    Markdown,
    Csv,
}

/// Suffixes from largest to smallest unit.
const SUFFIXES: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

/// Formats a count with three significant digits and a K/M/B suffix.
pub fn pretty_big_number(number: u64) -> String {
    let Some(tier) = SUFFIXES.iter().position(|&(unit, _)| number > unit) else {
        return number.to_string();
    };
    let (unit, suffix) = SUFFIXES[tier];
    let rendered = three_significant_digits(number as f64 / unit as f64);
    // 999_999 rounds to 1000K, which belongs to the next unit
    if rendered == "1000" && tier > 0 {
        let (unit, suffix) = SUFFIXES[tier - 1];
        return format!("{}{}", three_significant_digits(number as f64 / unit as f64), suffix);
    }
    format!("{rendered}{suffix}")
}

fn three_significant_digits(scaled: f64) -> String {
    let integer_digits = (scaled.log10().floor() as i32 + 1).max(1);
    let decimals = (3 - integer_digits).max(0) as usize;
    let rendered = format!("{scaled:.decimals$}");
    if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        rendered
    }
}

/// A titled table of plain string cells.
pub struct Table {
    title: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn set_header(&mut self, header: impl IntoIterator<Item = String>) {
        self.header = header.into_iter().collect();
    }

    pub fn push_row(&mut self, row: impl IntoIterator<Item = String>) {
        self.rows.push(row.into_iter().collect());
    }

    pub fn render(&self, format: TableFormat) -> Result<String> {
        match format {
            TableFormat::Console => {
                let table = self.comfy(presets::UTF8_FULL).to_string();
                let width = table.lines().next().map_or(0, |line| line.chars().count());
                Ok(format!("{:^width$}\n{table}", self.title))
            }
            TableFormat::Markdown => {
                let table = self.comfy(presets::ASCII_MARKDOWN).to_string();
                Ok(format!("# {}\n\n{table}", self.title))
            }
            TableFormat::Csv => self.csv(),
        }
    }

    fn comfy(&self, preset: &str) -> comfy_table::Table {
        let mut table = comfy_table::Table::new();
        table.load_preset(preset).set_header(self.header.clone());
        for row in &self.rows {
            table.add_row(row.clone());
        }
        for column in table.column_iter_mut() {
            column.set_cell_alignment(CellAlignment::Right);
        }
        table
    }

    fn csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?.trim_end().to_string())
    }
}
