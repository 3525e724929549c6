// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub(crate) mod parse_utils;

use crate::content::{ContentError, EntryMetadata, base_name};
use crate::service::{ContentService, Dispatched, Served};
use chrono::{DateTime, Utc};
use parse_utils::{next_value, parse_required_arg, reject_extra};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorKind {
    Usage,
    Failure,
}

#[derive(Debug, Clone)]
pub struct CliError {
    kind: CliErrorKind,
    message: String,
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            kind: CliErrorKind::Usage,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: CliErrorKind::Failure,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> CliErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            CliErrorKind::Usage => 2,
            CliErrorKind::Failure => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ContentError> for CliError {
    fn from(err: ContentError) -> Self {
        CliError::failure(err.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::failure(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put { file: PathBuf, path: Option<String> },
    Cat { path: String },
    Render { path: String },
    Remove { path: String },
    List { json: bool },
    Import { file: PathBuf },
    Export { file: PathBuf },
}

pub const USAGE: &str = "\
Usage: folio [-C <root>] <command>

Commands:
  put <file> [--as <path>]   Upload a file (a .zip is unpacked as a bundle)
  cat <path>                 Print what a reader would be served
  render <path>              Print the rendered HTML of a markdown item
  rm <path>                  Delete content, a static file or a template
  list [--json]              List stored content, static files and templates
  import <bundle.zip>        Unpack a bundle
  export <bundle.zip>        Write everything into a bundle
";

pub fn parse_command(tokens: &[String]) -> Result<Command, CliError> {
    let (name, rest) = parse_required_arg(tokens, "command")?;
    match name.as_str() {
        "put" => {
            let (file, rest) = parse_required_arg(rest, "file")?;
            let mut path = None;
            let mut idx = 0;
            while idx < rest.len() {
                let flag = rest[idx].clone();
                idx += 1;
                match flag.as_str() {
                    "--as" => path = Some(next_value(rest, &mut idx, "--as")?),
                    other => {
                        return Err(CliError::usage(format!("Unknown option '{}' for put", other)));
                    }
                }
            }
            Ok(Command::Put {
                file: PathBuf::from(file),
                path,
            })
        }
        "cat" | "render" | "rm" => {
            let (path, rest) = parse_required_arg(rest, "path")?;
            reject_extra(rest, &name)?;
            Ok(match name.as_str() {
                "cat" => Command::Cat { path },
                "render" => Command::Render { path },
                _ => Command::Remove { path },
            })
        }
        "list" => match rest {
            [] => Ok(Command::List { json: false }),
            [flag] if flag == "--json" => Ok(Command::List { json: true }),
            _ => Err(CliError::usage(format!(
                "Unexpected argument '{}' for list",
                rest[0]
            ))),
        },
        "import" | "export" => {
            let (file, rest) = parse_required_arg(rest, "bundle file")?;
            reject_extra(rest, &name)?;
            let file = PathBuf::from(file);
            Ok(if name == "import" {
                Command::Import { file }
            } else {
                Command::Export { file }
            })
        }
        other => Err(CliError::usage(format!("Unknown command '{}'", other))),
    }
}

pub fn execute(
    command: Command,
    service: &ContentService,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Put { file, path } => put(service, file, path, out),
        Command::Cat { path } => match service.serve(&path)? {
            Served::Page { html, .. } => {
                out.write_all(html.as_bytes())?;
                Ok(())
            }
            Served::File { mut reader, .. } => {
                io::copy(&mut reader, out)?;
                Ok(())
            }
        },
        Command::Render { path } => {
            let rendered = service.engine().render(&path)?;
            out.write_all(rendered.html.as_bytes())?;
            Ok(())
        }
        Command::Remove { path } => {
            service.remove(&path)?;
            writeln!(out, "removed {}", path)?;
            Ok(())
        }
        Command::List { json } => list(service, json, out),
        Command::Import { file } => {
            let report = service.import_archive_file(&file)?;
            writeln!(
                out,
                "imported {} files ({} markdown, {} assets, {} static, {} templates, {} nested bundles)",
                report.files(),
                report.markdown,
                report.assets,
                report.static_files,
                report.templates,
                report.nested_archives
            )?;
            Ok(())
        }
        Command::Export { file } => {
            let writer = BufWriter::new(File::create(&file)?);
            let (mut writer, report) = service.export_archive(writer)?;
            writer.flush()?;
            writeln!(
                out,
                "exported {} pages, {} assets, {} static files, {} templates to {}",
                report.pages,
                report.assets,
                report.static_files,
                report.templates,
                file.display()
            )?;
            Ok(())
        }
    }
}

fn put(
    service: &ContentService,
    file: PathBuf,
    path: Option<String>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let handle = File::open(&file)
        .map_err(|err| CliError::failure(format!("Cannot open '{}': {}", file.display(), err)))?;
    let metadata = handle.metadata()?;
    if !metadata.is_file() {
        return Err(CliError::usage(format!("'{}' is not a file", file.display())));
    }
    let path = match path {
        Some(path) => path,
        None => base_name(&file.to_string_lossy()).to_string(),
    };
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
    let meta = EntryMetadata::new(path, metadata.len(), modified);

    match service.upload(meta, &mut BufReader::new(handle))? {
        Dispatched::Stored(item) => writeln!(
            out,
            "stored {} ({} bytes, {}, {})",
            item.path,
            item.size,
            item.mime_type,
            item.placement()
        )?,
        Dispatched::Written {
            category,
            path,
            size,
        } => writeln!(out, "wrote {} {} ({} bytes)", category, path, size)?,
        Dispatched::Imported(report) => writeln!(
            out,
            "imported {} files from {}",
            report.files(),
            file.display()
        )?,
    }
    Ok(())
}

fn list(service: &ContentService, json: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let items = service.list_all()?;
    if json {
        let body = serde_json::to_string_pretty(&items)
            .map_err(|err| CliError::failure(format!("Cannot encode listing: {}", err)))?;
        writeln!(out, "{}", body)?;
        return Ok(());
    }

    for item in &items {
        writeln!(
            out,
            "{:<9} {:<8} {:>10}  {}  {}",
            item.category,
            item.placement,
            item.size,
            item.modified.format("%Y-%m-%d %H:%M:%S"),
            item.path
        )?;
    }
    for (label, entries) in [
        ("static", service.static_files()?),
        ("template", service.template_files()?),
    ] {
        for entry in entries {
            writeln!(
                out,
                "{:<9} {:<8} {:>10}  {}  {}",
                label,
                "disk",
                entry.size,
                entry.modified.format("%Y-%m-%d %H:%M:%S"),
                entry.path
            )?;
        }
    }
    Ok(())
}
