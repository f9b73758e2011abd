//! Migration file parser
//!
//! A migration file is split into sections by directive comments:
//!
//! ```sql
//! -- +migrate Up
//! CREATE TABLE users (id INT PRIMARY KEY);
//!
//! -- +migrate Down
//! DROP TABLE users;
//! ```
//!
//! Statements inside a section end at a line terminated by the dialect
//! delimiter. A `-- +migrate StatementBegin` / `-- +migrate StatementEnd` pair
//! keeps a multi-line body containing delimiters together as one statement.
//! The splitter is line based; delimiters inside string literals are not
//! recognised.

use super::definitions::{Migration, MigrationDirection};
use crate::error::{MigrationError, MigrationResult};

/// Prefix shared by every directive line
pub const DIRECTIVE_PREFIX: &str = "-- +migrate";

/// Splits migration file content into up and down statements
#[derive(Debug, Clone)]
pub struct MigrationParser {
    delimiter: String,
}

impl Default for MigrationParser {
    fn default() -> Self {
        Self::new(";")
    }
}

impl MigrationParser {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Parse `content` into a migration identified by `id`.
    ///
    /// `file` names the origin in error messages.
    pub fn parse(&self, file: &str, id: &str, content: &str) -> MigrationResult<Migration> {
        let mut state = ParseState::new(file, &self.delimiter);

        for (index, line) in content.lines().enumerate() {
            state.line(index + 1, line)?;
        }

        let (up, down) = state.finish()?;
        Ok(Migration::new(id, up, down))
    }
}

struct ParseState<'a> {
    file: &'a str,
    delimiter: &'a str,
    section: Option<MigrationDirection>,
    seen_up: bool,
    seen_down: bool,
    in_block: bool,
    buffer: Vec<&'a str>,
    up: Vec<String>,
    down: Vec<String>,
}

impl<'a> ParseState<'a> {
    fn new(file: &'a str, delimiter: &'a str) -> Self {
        Self {
            file,
            delimiter,
            section: None,
            seen_up: false,
            seen_down: false,
            in_block: false,
            buffer: Vec::new(),
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    fn error(&self, line_no: usize, reason: impl std::fmt::Display) -> MigrationError {
        MigrationError::parse(self.file, format!("line {}: {}", line_no, reason))
    }

    fn line(&mut self, line_no: usize, line: &'a str) -> MigrationResult<()> {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix(DIRECTIVE_PREFIX) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return self.directive(line_no, rest);
            }
        }

        if self.in_block {
            self.buffer.push(line);
            return Ok(());
        }

        if trimmed.is_empty() || trimmed.starts_with("--") {
            // Comments inside an unfinished statement stay part of it
            if !self.buffer.is_empty() {
                self.buffer.push(line);
            }
            return Ok(());
        }

        if self.section.is_none() {
            return Err(self.error(line_no, "SQL found before the first Up/Down section marker"));
        }

        self.buffer.push(line);
        if ends_with_delimiter(line, self.delimiter) {
            self.flush();
        }
        Ok(())
    }

    fn directive(&mut self, line_no: usize, rest: &str) -> MigrationResult<()> {
        let words: Vec<&str> = rest.split_whitespace().collect();
        let Some((&command, options)) = words.split_first() else {
            return Err(self.error(line_no, "empty migrate directive"));
        };

        match command {
            "Up" | "Down" => {
                if let Some(option) = options.first() {
                    return Err(self.error(line_no, format!("unsupported option '{}'", option)));
                }
                if self.in_block {
                    return Err(self.error(line_no, "section marker inside StatementBegin block"));
                }
                self.flush();

                let direction = if command == "Up" {
                    MigrationDirection::Up
                } else {
                    MigrationDirection::Down
                };
                let seen = match direction {
                    MigrationDirection::Up => self.seen_up,
                    MigrationDirection::Down => self.seen_down,
                };
                if seen {
                    return Err(self.error(line_no, format!("duplicate {} section marker", command)));
                }
                match direction {
                    MigrationDirection::Up => self.seen_up = true,
                    MigrationDirection::Down => self.seen_down = true,
                }
                self.section = Some(direction);
            }
            "StatementBegin" => {
                if self.section.is_none() {
                    return Err(self.error(line_no, "StatementBegin outside of an Up/Down section"));
                }
                if self.in_block {
                    return Err(self.error(line_no, "nested StatementBegin"));
                }
                self.flush();
                self.in_block = true;
            }
            "StatementEnd" => {
                if !self.in_block {
                    return Err(self.error(line_no, "StatementEnd without StatementBegin"));
                }
                self.flush();
                self.in_block = false;
            }
            other => {
                return Err(self.error(line_no, format!("unknown migrate directive '{}'", other)));
            }
        }

        Ok(())
    }

    /// Move the buffered lines into the current section as one statement
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let statement = self.buffer.join("\n").trim().to_string();
        self.buffer.clear();
        if statement.is_empty() {
            return;
        }

        match self.section {
            Some(MigrationDirection::Up) => self.up.push(statement),
            Some(MigrationDirection::Down) => self.down.push(statement),
            None => {}
        }
    }

    fn finish(mut self) -> MigrationResult<(Vec<String>, Vec<String>)> {
        if self.in_block {
            return Err(MigrationError::parse(
                self.file,
                "StatementBegin without matching StatementEnd",
            ));
        }
        if !self.seen_up && !self.seen_down {
            return Err(MigrationError::parse(
                self.file,
                "no Up or Down section marker found",
            ));
        }

        self.flush();
        Ok((self.up, self.down))
    }
}

/// Whether `line` terminates a statement, ignoring a trailing `--` comment
fn ends_with_delimiter(line: &str, delimiter: &str) -> bool {
    let code = match line.find("--") {
        Some(pos) => &line[..pos],
        None => line,
    };
    code.trim_end().ends_with(delimiter)
}
