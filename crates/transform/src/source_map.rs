use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::vlq::{self, Original, Segment};

#[derive(Debug, thiserror::Error)]
pub enum SourceMapError {
    #[error("invalid base64 character {0:?} in mappings")]
    InvalidBase64(char),
    #[error("unterminated VLQ value in mappings")]
    UnterminatedVlq,
    #[error("VLQ value in mappings is too large")]
    VlqOverflow,
    #[error("mappings reference a negative index")]
    NegativeIndex,
    #[error("mapping segment has {0} fields, expected 1, 4 or 5")]
    InvalidSegment(usize),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

const fn default_version() -> u32 {
    3
}

/// A version 3 source map
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

impl Default for SourceMap {
    fn default() -> Self {
        Self {
            version: default_version(),
            file: None,
            source_root: None,
            sources: Vec::new(),
            sources_content: Vec::new(),
            names: Vec::new(),
            mappings: String::new(),
        }
    }
}

impl SourceMap {
    /// A map for `file` with no mappings, naming `file` as its only source
    pub fn identity<S: Into<String>>(file: S) -> Self {
        let file = file.into();
        Self {
            file: Some(file.clone()),
            sources: vec![file],
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SourceMapError> {
        Ok(serde_json::to_string(self)?)
    }

    fn upstream_source_index(&self, upstream: &SourceMap) -> Option<u32> {
        let file = upstream.file.as_deref()?;
        let suffix = format!("/{}", file.trim_start_matches("./"));

        self.sources
            .iter()
            .position(|source| source == file || source.ends_with(&suffix))
            .and_then(|idx| u32::try_from(idx).ok())
    }

    /// Compose this map through `upstream`, a map whose generated output is
    /// this map's input
    ///
    /// Segments pointing into `upstream`'s generated file are rewritten to
    /// point at `upstream`'s sources. All other segments are kept as they are.
    pub fn compose(self, upstream: &SourceMap) -> Result<SourceMap, SourceMapError> {
        let Some(target) = self.upstream_source_index(upstream) else {
            return Ok(self);
        };

        let lines = vlq::decode(&self.mappings)?;
        let upstream_lines = vlq::decode(&upstream.mappings)?;

        let mut sources = IndexSet::new();
        let mut contents = Vec::new();
        let mut names = IndexSet::new();

        let mut intern_source = |source: &str, content: Option<&Option<String>>| -> u32 {
            let (idx, inserted) = sources.insert_full(source.to_owned());
            if inserted {
                contents.push(content.cloned().flatten());
            }
            idx as u32
        };

        let mut composed = Vec::with_capacity(lines.len());

        for line in lines {
            let mut out = Vec::with_capacity(line.len());

            for segment in line {
                let Some(original) = segment.original else {
                    out.push(segment);
                    continue;
                };

                let own_name = original
                    .name
                    .and_then(|n| self.names.get(n as usize))
                    .cloned();

                let traced = if original.source == target {
                    lookup(&upstream_lines, original.line, original.column)
                } else {
                    None
                };

                let original = match traced {
                    Some(up) => {
                        let source = upstream
                            .sources
                            .get(up.source as usize)
                            .map_or("", String::as_str);
                        let name = up
                            .name
                            .and_then(|n| upstream.names.get(n as usize))
                            .cloned()
                            .or(own_name);

                        Original {
                            source: intern_source(source, upstream.sources_content.get(up.source as usize)),
                            line: up.line,
                            column: up.column,
                            name: name.map(|n| names.insert_full(n).0 as u32),
                        }
                    }
                    None => {
                        let source = self
                            .sources
                            .get(original.source as usize)
                            .map_or("", String::as_str);

                        Original {
                            source: intern_source(
                                source,
                                self.sources_content.get(original.source as usize),
                            ),
                            line: original.line,
                            column: original.column,
                            name: own_name.map(|n| names.insert_full(n).0 as u32),
                        }
                    }
                };

                out.push(Segment {
                    generated_column: segment.generated_column,
                    original: Some(original),
                });
            }

            composed.push(out);
        }

        let sources_content = if contents.iter().any(Option::is_some) {
            contents
        } else {
            Vec::new()
        };

        Ok(SourceMap {
            version: self.version,
            file: self.file,
            source_root: self.source_root,
            sources: sources.into_iter().collect(),
            sources_content,
            names: names.into_iter().collect(),
            mappings: vlq::encode(&composed),
        })
    }
}

/// Find the mapped segment on `line` with the greatest generated column that
/// does not exceed `column`
fn lookup(lines: &[Vec<Segment>], line: u32, column: u32) -> Option<Original> {
    lines
        .get(line as usize)?
        .iter()
        .filter(|segment| segment.generated_column <= column)
        .filter_map(|segment| segment.original.map(|o| (segment.generated_column, o)))
        .max_by_key(|(col, _)| *col)
        .map(|(_, original)| original)
}
