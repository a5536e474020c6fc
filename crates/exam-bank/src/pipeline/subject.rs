//! Subject labels inferred from document file names

use regex::Regex;
use std::path::Path;

use crate::config::SubjectConfig;
use crate::error::{Error, Result};

/// Trailing name parts that describe the material rather than the subject
const MATERIAL_MARKERS: &[&str] = &[
    "필기",
    "실기",
    "기출",
    "기출문제",
    "요약",
    "정리",
    "요점정리",
    "강의",
    "자료",
];

/// Derives a subject label from a file stem such as `2026_정보처리기사_필기`
#[derive(Debug, Clone)]
pub struct SubjectInferrer {
    leading_prefix: Regex,
    default_label: String,
}

impl SubjectInferrer {
    /// Create an inferrer falling back to the configured default label
    pub fn new(config: &SubjectConfig) -> Result<Self> {
        let leading_prefix = Regex::new(r"^[0-9_]+")
            .map_err(|e| Error::internal(format!("Invalid subject pattern: {}", e)))?;

        Ok(Self {
            leading_prefix,
            default_label: config.default_label.clone(),
        })
    }

    /// Subject for a file path; the extension is ignored
    pub fn infer(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.infer_from_stem(&stem)
    }

    /// Subject for a bare file stem
    pub fn infer_from_stem(&self, stem: &str) -> String {
        let mut name = self.leading_prefix.replace(stem.trim(), "").into_owned();

        while let Some(stripped) = strip_marker(&name) {
            name = stripped.to_string();
        }

        let label = name.replace('_', " ").trim().to_string();
        if label.is_empty() {
            self.default_label.clone()
        } else {
            label
        }
    }
}

/// `name` without a trailing `_<marker>`, or empty if `name` is only a marker
fn strip_marker(name: &str) -> Option<&str> {
    MATERIAL_MARKERS.iter().find_map(|marker| {
        let rest = name.strip_suffix(marker)?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_suffix('_')
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inferrer() -> SubjectInferrer {
        SubjectInferrer::new(&SubjectConfig::default()).unwrap()
    }

    #[test]
    fn test_year_prefix_and_marker() {
        let subject = inferrer().infer(Path::new("data/2026_정보처리기사_필기.pdf"));
        assert_eq!(subject, "정보처리기사");
    }

    #[test]
    fn test_multiple_markers_and_spaces() {
        let inferrer = inferrer();
        assert_eq!(inferrer.infer_from_stem("01_네트워크_관리사_요약_정리"), "네트워크 관리사");
        assert_eq!(inferrer.infer_from_stem("운영체제_기출문제"), "운영체제");
    }

    #[test]
    fn test_marker_only_inside_word_is_kept() {
        assert_eq!(inferrer().infer_from_stem("자료구조"), "자료구조");
    }

    #[test]
    fn test_default_label() {
        let inferrer = inferrer();
        assert_eq!(inferrer.infer_from_stem("2026_"), "General");
        assert_eq!(inferrer.infer_from_stem("2024_필기"), "General");
        assert_eq!(inferrer.infer(Path::new("")), "General");

        let custom = SubjectInferrer::new(&SubjectConfig {
            default_label: "기타".to_string(),
        })
        .unwrap();
        assert_eq!(custom.infer_from_stem("123"), "기타");
    }
}
