//! APT source records in the one-line (`sources.list`) and deb822
//! (`*.sources`) formats.
//!
//! See `sources.list(5)` for both formats. Only the subset of options that
//! craft-archives reads or writes is modelled; other options are skipped
//! with a debug log.

use std::path::{Path, PathBuf};

use crate::errors::SourceParseError;

/// Kind of archive entry: binary packages or source packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DebFormat {
    /// Binary packages (`deb`).
    Deb,
    /// Source packages (`deb-src`).
    DebSrc,
}

impl DebFormat {
    /// The keyword used in source files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::DebSrc => "deb-src",
        }
    }
}

impl std::fmt::Display for DebFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DebFormat {
    type Err = SourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deb" => Ok(Self::Deb),
            "deb-src" => Ok(Self::DebSrc),
            other => Err(SourceParseError::UnknownType(other.to_string())),
        }
    }
}

/// The `Signed-By` value of an entry: a keyring file or an embedded
/// ASCII-armored key block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedBy {
    /// Path to a keyring file.
    Path(PathBuf),
    /// Lines of an armored key, blank lines as empty strings.
    Inline(Vec<String>),
}

impl SignedBy {
    fn from_deb822(lines: &[String]) -> Self {
        let lines: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
        match lines.as_slice() {
            [path] => Self::Path(PathBuf::from(path.as_str())),
            _ => Self::Inline(
                lines
                    .into_iter()
                    .map(|l| if l == "." { String::new() } else { l.clone() })
                    .collect(),
            ),
        }
    }

    fn to_deb822(&self) -> String {
        match self {
            Self::Path(path) => format!("Signed-By: {}\n", path.display()),
            Self::Inline(lines) => {
                let mut out = "Signed-By:\n".to_string();
                for line in lines {
                    out.push(' ');
                    out.push_str(if line.is_empty() { "." } else { line });
                    out.push('\n');
                }
                out
            }
        }
    }
}

/// A single APT source entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptSource {
    /// Entry kinds (`deb`, `deb-src`).
    pub types: Vec<DebFormat>,
    /// Archive base URIs.
    pub uris: Vec<String>,
    /// Suites (distribution codenames or an exact path ending in `/`).
    pub suites: Vec<String>,
    /// Archive components; empty for exact-path suites.
    pub components: Vec<String>,
    /// Key that signs this archive.
    pub signed_by: Option<SignedBy>,
    /// Restrict the entry to these architectures.
    pub architectures: Option<Vec<String>>,
    /// Whether APT should use the entry at all.
    pub enabled: bool,
}

impl AptSource {
    /// A `deb` entry for a single URI with no options set.
    pub fn new(uri: impl Into<String>, suites: Vec<String>, components: Vec<String>) -> Self {
        Self {
            types: vec![DebFormat::Deb],
            uris: vec![uri.into()],
            suites,
            components,
            signed_by: None,
            architectures: None,
            enabled: true,
        }
    }

    /// Read every entry of a one-line format file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn from_sources_list(path: &Path) -> Result<Vec<Self>, SourceParseError> {
        Self::from_sources_list_str(&std::fs::read_to_string(path)?)
    }

    /// Parse one-line format text.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-comment line is malformed.
    pub fn from_sources_list_str(content: &str) -> Result<Vec<Self>, SourceParseError> {
        let mut sources = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            sources.push(Self::from_sources_list_line(line, index + 1)?);
        }
        Ok(sources)
    }

    fn from_sources_list_line(line: &str, line_no: usize) -> Result<Self, SourceParseError> {
        let malformed = || SourceParseError::MalformedLine {
            line: line_no,
            content: line.to_string(),
        };

        let (kind, mut rest) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let mut source = Self::new("", Vec::new(), Vec::new());
        source.types = vec![kind.parse()?];

        rest = rest.trim_start();
        if let Some(options) = rest.strip_prefix('[') {
            let (options, after) = options.split_once(']').ok_or_else(malformed)?;
            for option in options.split_whitespace() {
                source.apply_option(option);
            }
            rest = after;
        }

        let mut fields = rest.split_whitespace();
        let uri = fields.next().ok_or_else(malformed)?;
        let suite = fields.next().ok_or_else(malformed)?;
        source.uris = vec![uri.to_string()];
        source.suites = vec![suite.to_string()];
        source.components = fields.map(str::to_string).collect();
        Ok(source)
    }

    fn apply_option(&mut self, option: &str) {
        match option.split_once('=') {
            Some(("arch", value)) => {
                self.architectures = Some(value.split(',').map(str::to_string).collect());
            }
            Some(("signed-by", value)) => {
                self.signed_by = Some(SignedBy::Path(PathBuf::from(value)));
            }
            _ => tracing::debug!("Skipping unsupported sources.list option: {option}"),
        }
    }

    /// Read every paragraph of a deb822 format file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a paragraph is invalid.
    pub fn from_deb822(path: &Path) -> Result<Vec<Self>, SourceParseError> {
        Self::from_deb822_str(&std::fs::read_to_string(path)?)
    }

    /// Parse deb822 format text. Paragraphs holding only comments are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a paragraph has several URIs, lacks a mandatory
    /// field or names an unknown type.
    pub fn from_deb822_str(content: &str) -> Result<Vec<Self>, SourceParseError> {
        let mut sources = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        for line in content.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if let Some(source) = Self::from_deb822_paragraph(&paragraph)? {
                    sources.push(source);
                }
                paragraph.clear();
            } else {
                paragraph.push(line);
            }
        }
        Ok(sources)
    }

    fn from_deb822_paragraph(lines: &[&str]) -> Result<Option<Self>, SourceParseError> {
        // Each field keeps its first line followed by its continuation lines.
        let mut fields: Vec<(String, Vec<String>)> = Vec::new();
        for line in lines {
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    value.push(line.trim().to_string());
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            fields.push((field.trim().to_string(), vec![value.trim().to_string()]));
        }
        if fields.is_empty() {
            return Ok(None);
        }

        let words = |value: &[String]| -> Vec<String> {
            value
                .iter()
                .map(String::as_str)
                .flat_map(str::split_whitespace)
                .map(str::to_string)
                .collect()
        };

        let mut types = None;
        let mut uris = None;
        let mut suites = None;
        let mut source = Self::new("", Vec::new(), Vec::new());
        for (field, value) in &fields {
            match field.as_str() {
                "Types" => {
                    types = Some(
                        value
                            .iter()
                            .map(String::as_str)
                            .flat_map(str::split_whitespace)
                            .map(str::parse)
                            .collect::<Result<Vec<DebFormat>, _>>()?,
                    );
                }
                "URIs" => {
                    let list = words(value);
                    if list.len() > 1 {
                        return Err(SourceParseError::MultipleUris);
                    }
                    uris = Some(list);
                }
                "Suites" => suites = Some(words(value)),
                "Components" => source.components = words(value),
                "Signed-By" => source.signed_by = Some(SignedBy::from_deb822(value)),
                "Architectures" => source.architectures = Some(words(value)),
                "Enabled" => {
                    source.enabled = !value.first().is_some_and(|v| v.eq_ignore_ascii_case("no"));
                }
                other => tracing::debug!("Skipping unknown Deb822 field: {other}"),
            }
        }

        source.types = types.ok_or(SourceParseError::MissingField("Types"))?;
        source.uris = uris.ok_or(SourceParseError::MissingField("URIs"))?;
        source.suites = suites.ok_or(SourceParseError::MissingField("Suites"))?;
        Ok(Some(source))
    }

    /// Render this entry as one or more `sources.list` lines: one for each
    /// combination of suite, URI and type.
    pub fn to_sources_list(&self) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(architectures) = &self.architectures {
            options.push(format!("arch={}", architectures.join(",")));
        }
        match &self.signed_by {
            Some(SignedBy::Path(path)) => options.push(format!("signed-by={}", path.display())),
            Some(SignedBy::Inline(_)) => {
                tracing::debug!("Inline Signed-By keys cannot be written as sources.list options");
            }
            None => {}
        }
        let options = if options.is_empty() {
            String::new()
        } else {
            format!(" [{}]", options.join(" "))
        };

        let mut lines = Vec::new();
        for suite in &self.suites {
            let components = if !self.components.is_empty() {
                format!(" {}", self.components.join(" "))
            } else if suite.ends_with('/') {
                String::new()
            } else {
                " main".to_string()
            };
            for uri in &self.uris {
                for kind in &self.types {
                    lines.push(format!("{kind}{options} {uri} {suite}{components}"));
                }
            }
        }
        lines
    }

    /// Render this entry as a deb822 paragraph ending in a single newline.
    pub fn to_deb822(&self) -> String {
        let types = if self.types.is_empty() {
            "deb".to_string()
        } else {
            join(&self.types)
        };
        let mut out = format!(
            "Types: {types}\nURIs: {}\nSuites: {}\n",
            self.uris.join(" "),
            self.suites.join(" ")
        );
        if !self.components.is_empty() {
            out.push_str(&format!("Components: {}\n", self.components.join(" ")));
        }
        if let Some(architectures) = &self.architectures {
            out.push_str(&format!("Architectures: {}\n", architectures.join(" ")));
        }
        if let Some(signed_by) = &self.signed_by {
            out.push_str(&signed_by.to_deb822());
        }
        if !self.enabled {
            out.push_str("Enabled: no\n");
        }
        out
    }
}

fn join(types: &[DebFormat]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
