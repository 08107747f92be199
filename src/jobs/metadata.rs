// src/jobs/metadata.rs

//! The per-job metadata script (`<base>.bat`).
//!
//! It is both a runnable script (the last line is the engine invocation) and
//! the job's description, kept as `# Key: Value` comments:
//!
//! ```text
//! #!/bin/sh
//! # Job Parameters
//! # Name: water
//! # Engine: nanoSIM-1
//! # Calculation: Simulate
//! # Description: 900 frames at 300 K
//! # Server_id: simulator
//! # Job_id: 100
//! # Time: 0.0
//! #
//! simulator -f900 -t300 -i10 -o/jobs/100/scratch/simulate.dpb simulate.mmp
//! ```
//!
//! Older scripts use `REM` instead of `#`.

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::fs::FileSystem;

pub const HEADER: &str = "Job Parameters";

pub const KEY_NAME: &str = "Name";
pub const KEY_ENGINE: &str = "Engine";
pub const KEY_CALCULATION: &str = "Calculation";
pub const KEY_DESCRIPTION: &str = "Description";
pub const KEY_SERVER_ID: &str = "Server_id";
pub const KEY_JOB_ID: &str = "Job_id";
pub const KEY_TIME: &str = "Time";
pub const KEY_OUTPUT: &str = "Output";
pub const KEY_FRAMES: &str = "Frames";
pub const KEY_TEMPERATURE: &str = "Temperature";
pub const KEY_STEPS_PER_FRAME: &str = "Steps_per_frame";
pub const KEY_FORMAT: &str = "Format";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    fields: Vec<(String, String)>,
    command_line: Option<String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace, keeping the original position of existing keys.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        // Values are single-line by construction.
        let value = value.to_string().replace(['\r', '\n'], " ");
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn command_line(&self) -> Option<&str> {
        self.command_line.as_deref()
    }

    pub fn set_command_line(&mut self, line: impl Into<String>) {
        self.command_line = Some(line.into());
    }

    /// Final output: the `Output` key if present, else whatever the
    /// invocation line writes to.
    pub fn output_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.get(KEY_OUTPUT).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        self.command_line.as_deref().and_then(output_from_command_line)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#!/bin/sh\n");
        out.push_str(&format!("# {HEADER}\n"));
        for (key, value) in &self.fields {
            out.push_str(&format!("# {key}: {value}\n"));
        }
        out.push_str("#\n");
        if let Some(line) = &self.command_line {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Parse a metadata script. Key lines before the header are ignored; the
    /// last non-comment line is taken as the invocation.
    pub fn parse(text: &str) -> Self {
        let mut meta = Metadata::new();
        let mut in_params = false;
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let comment = trimmed
                .strip_prefix('#')
                .or_else(|| trimmed.strip_prefix("REM"));
            match comment {
                Some(body) => {
                    if body.trim() == HEADER {
                        in_params = true;
                        continue;
                    }
                    if !in_params {
                        continue;
                    }
                    if let Some((key, value)) = body.split_once(": ") {
                        meta.set(key.trim(), value.trim());
                    }
                }
                None => meta.command_line = Some(trimmed.to_string()),
            }
        }
        meta
    }
}

/// Quote an argument for the invocation line if it contains whitespace.
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

/// Split an invocation line into words, honouring double quotes anywhere in
/// a word (`-o"/a b/c"` is one word).
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

/// Output path written by an invocation: `-o<path>`, `-o <path>` or
/// `> <path>`. The last one wins.
pub fn output_from_command_line(line: &str) -> Option<PathBuf> {
    let words = split_command_line(line);
    let mut output = None;
    let mut iter = words.iter().peekable();
    while let Some(word) = iter.next() {
        if word == "-o" || word == ">" {
            if let Some(next) = iter.peek() {
                output = Some(PathBuf::from(next.as_str()));
            }
        } else if let Some(rest) = word.strip_prefix("-o") {
            output = Some(PathBuf::from(rest));
        } else if let Some(rest) = word.strip_prefix('>') {
            output = Some(PathBuf::from(rest));
        }
    }
    output
}

pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Metadata> {
    Ok(Metadata::parse(&fs.read_to_string(path)?))
}

pub fn write(fs: &dyn FileSystem, path: &Path, meta: &Metadata) -> Result<()> {
    fs.write(path, meta.render().as_bytes())?;
    Ok(())
}

/// Rewrite the `Time` field with the wall-clock seconds of the last run.
pub fn update_elapsed(fs: &dyn FileSystem, path: &Path, elapsed_secs: f64) -> Result<()> {
    let mut meta = read(fs, path)?;
    meta.set(KEY_TIME, format!("{elapsed_secs:.1}"));
    write(fs, path, &meta)
}
