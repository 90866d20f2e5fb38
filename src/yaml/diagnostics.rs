//! Diagnostics for hand-edited YAML files (config and rule books)

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML error pointing at the offending location
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(dfm::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    /// Create a located error from a serde_yml error
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure to read or parse a YAML file
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("Cannot read {path}: {source}")]
    #[diagnostic(code(dfm::yaml::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a YAML document, attaching source spans on failure
pub fn parse_yaml<T: serde::de::DeserializeOwned>(
    source: &str,
    filename: &str,
) -> Result<T, YamlError> {
    serde_yml::from_str(source)
        .map_err(|e| YamlSyntaxError::from_serde_error(&e, source, filename).into())
}

/// Read and parse a YAML file
pub fn read_yaml<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T, YamlError> {
    let source = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_yaml(&source, &path.display().to_string())
}

/// Convert 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut line_start = 0;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            break;
        }
        if ch == '\n' {
            current_line += 1;
            line_start = i + 1;
        }
    }

    if current_line < line {
        return source.len().saturating_sub(1);
    }

    let line_len = source[line_start..]
        .find('\n')
        .unwrap_or(source.len() - line_start);
    line_start + column.saturating_sub(1).min(line_len)
}

fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("invalid process") {
        return Some(
            "Processes are snake_case names such as injection_molding, cnc_milling or fdm_printing"
                .to_string(),
        );
    }

    if msg_lower.contains("invalid material") {
        return Some("Materials are snake_case names such as abs, aluminum or carbon_fiber".to_string());
    }

    if msg_lower.contains("unknown variant") {
        return Some("Check the spelling of the enumerated value against `dfm rules show`".to_string());
    }

    if msg_lower.contains("invalid type") {
        return Some("A value has the wrong type; numbers must not be quoted".to_string());
    }

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    None
}
