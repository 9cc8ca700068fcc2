use lazy_static::lazy_static;
use regex::Regex;

/// Responses shorter than this (in characters) that miss a section are
/// escalated to the simplified prompt. Longer incomplete responses are not.
pub const SIMPLIFY_BELOW_CHARS: usize = 500;

lazy_static! {
    static ref DOCKERFILE_SECTION: Regex =
        Regex::new(r"(?i)```dockerfile|```docker|Dockerfile:|DOCKERFILE").unwrap();
    static ref JENKINSFILE_SECTION: Regex =
        Regex::new(r"(?i)```groovy|```jenkinsfile|Jenkinsfile:|JENKINSFILE").unwrap();
    static ref GUIDE_SECTION: Regex = Regex::new(r"(?i)Guide:|GUIDE|DevOps Guide:").unwrap();
}

/// Which section markers a raw response contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionReport {
    pub has_dockerfile: bool,
    pub has_jenkinsfile: bool,
    pub has_guide: bool,
}

impl SectionReport {
    pub fn inspect(raw: &str) -> Self {
        Self {
            has_dockerfile: DOCKERFILE_SECTION.is_match(raw),
            has_jenkinsfile: JENKINSFILE_SECTION.is_match(raw),
            has_guide: GUIDE_SECTION.is_match(raw),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.has_dockerfile && self.has_jenkinsfile && self.has_guide
    }
}

/// True when `raw` both misses a section and is under the length threshold.
pub fn needs_simplification(report: &SectionReport, raw: &str) -> bool {
    !report.is_complete() && raw.chars().count() < SIMPLIFY_BELOW_CHARS
}
