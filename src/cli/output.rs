//! Rendering of command results in every output format
//!
//! Structured formats (yaml, json) serialize the value itself; the tabular
//! formats render a [`Table`] built by the command.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Column headers plus string rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Render for a tabular format; yaml and json fall back to tsv
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Csv => self.to_csv(),
            OutputFormat::Md => Ok(self.to_tabled(true)),
            OutputFormat::Auto => Ok(self.to_tabled(false)),
            OutputFormat::Tsv | OutputFormat::Yaml | OutputFormat::Json => Ok(self.to_tsv()),
        }
    }

    fn to_tsv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.headers.join("\t"));
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| c.replace(['\t', '\n'], " ")).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }

    fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).into_diagnostic()?;
        for row in &self.rows {
            writer.write_record(row).into_diagnostic()?;
        }
        let bytes = writer.into_inner().into_diagnostic()?;
        String::from_utf8(bytes).into_diagnostic()
    }

    fn to_tabled(&self, markdown: bool) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.clone());
        for row in &self.rows {
            builder.push_record(row.clone());
        }
        let mut table = builder.build();
        if markdown {
            table.with(Style::markdown());
        } else {
            table.with(Style::rounded());
        }
        let mut out = table.to_string();
        out.push('\n');
        out
    }
}

/// Serialize a value as yaml or json
pub fn structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Yaml => Ok(Some(serde_yml::to_string(value).into_diagnostic()?)),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(value).into_diagnostic()?;
            out.push('\n');
            Ok(Some(out))
        }
        _ => Ok(None),
    }
}

/// Print `value` in a structured format, or `table` otherwise
pub fn emit<T: Serialize>(value: &T, table: &Table, format: OutputFormat) -> Result<()> {
    match structured(value, format)? {
        Some(text) => print!("{}", text),
        None => print!("{}", table.render(format)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["Process", "Score"]);
        table.push(["CNC Milling", "85.5"]);
        table.push(["Injection Molding, high volume", "42.5"]);
        table
    }

    #[test]
    fn test_tsv() {
        let out = sample().render(OutputFormat::Tsv).unwrap();
        assert_eq!(
            out,
            "Process\tScore\nCNC Milling\t85.5\nInjection Molding, high volume\t42.5\n"
        );
    }

    #[test]
    fn test_csv_quotes_commas() {
        let out = sample().render(OutputFormat::Csv).unwrap();
        assert!(out.starts_with("Process,Score\n"));
        assert!(out.contains("\"Injection Molding, high volume\",42.5"));
    }

    #[test]
    fn test_markdown() {
        let out = sample().render(OutputFormat::Md).unwrap();
        assert!(out.contains("| Process"));
        assert!(out.contains("CNC Milling"));
    }

    #[test]
    fn test_structured_only_for_yaml_and_json() {
        let value = vec![1, 2, 3];
        assert!(structured(&value, OutputFormat::Tsv).unwrap().is_none());
        let json = structured(&value, OutputFormat::Json).unwrap().unwrap();
        assert!(json.contains('1'));
        let yaml = structured(&value, OutputFormat::Yaml).unwrap().unwrap();
        assert!(yaml.contains("- 1"));
    }
}
