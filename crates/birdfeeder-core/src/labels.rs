//! # Labels Module
//!
//! Label files map model output indices to human readable names.
//! Each line is `<id><label>`, e.g. `12 house finch` or `12  house finch`.

use crate::error::{CoreError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // constant pattern
    Regex::new(r"^\s*(\d+)(.+)$").unwrap()
});

/// Label id -> name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<u32, String>,
}

impl LabelMap {
    /// Parse label file contents. Blank lines are skipped; a later
    /// duplicate id replaces an earlier one.
    pub fn parse(text: &str) -> Result<Self> {
        let mut labels = BTreeMap::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let malformed = || CoreError::LabelLine {
                line: index + 1,
                content: line.to_string(),
            };

            let captures = LABEL_LINE.captures(line).ok_or_else(malformed)?;
            let id: u32 = captures[1].parse().map_err(|_| malformed())?;
            let name = captures[2].trim();
            if name.is_empty() {
                return Err(malformed());
            }
            labels.insert(id, name.to_string());
        }

        if labels.is_empty() {
            return Err(CoreError::NoLabels);
        }

        Ok(Self { labels })
    }

    /// Read and parse a UTF-8 label file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Name for `id`. Ids missing from the file are named `<id>` so a
    /// model/label mismatch degrades instead of aborting the feeder.
    #[must_use]
    pub fn name(&self, id: u32) -> String {
        self.labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("<{id}>"))
    }

    /// Lookup without the fallback.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Whether any id carries this exact name.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.labels.values().any(|l| l == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0  background\n\
                          1 house finch, linnet, Carpodacus mexicanus\n\
                          \n\
                          2\tpatio, terrace\n";

    #[test]
    fn parses_ids_and_trims_names() {
        let labels = LabelMap::parse(SAMPLE).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(0), Some("background"));
        assert_eq!(
            labels.get(1),
            Some("house finch, linnet, Carpodacus mexicanus")
        );
        assert_eq!(labels.get(2), Some("patio, terrace"));
        assert!(labels.contains_name("patio, terrace"));
    }

    #[test]
    fn unknown_id_gets_placeholder_name() {
        let labels = LabelMap::parse("0 jay").unwrap();
        assert_eq!(labels.name(0), "jay");
        assert_eq!(labels.name(41), "<41>");
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = LabelMap::parse("0 jay\nnot a label\n").unwrap_err();
        match err {
            CoreError::LabelLine { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "not a label");
            }
            other => unreachable!("unexpected error: {other}"),
        }
    }

    #[test]
    fn id_without_name_is_rejected() {
        assert!(matches!(
            LabelMap::parse("7   "),
            Err(CoreError::LabelLine { line: 1, .. })
        ));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(matches!(LabelMap::parse("\n  \n"), Err(CoreError::NoLabels)));
    }

    #[test]
    fn duplicate_id_last_wins() {
        let labels = LabelMap::parse("3 crow\n3 raven").unwrap();
        assert_eq!(labels.get(3), Some("raven"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(LabelMap::load(&path).unwrap().len(), 3);
        assert!(matches!(
            LabelMap::load(&dir.path().join("missing.txt")),
            Err(CoreError::Io(_))
        ));
    }
}
