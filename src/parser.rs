//! Extraction of the three artifacts from free-form model output.
//!
//! Each artifact has an ordered list of extractors. The first extractor
//! that yields non-empty trimmed text wins; when none does, a fixed
//! template is substituted so the result is never partially empty.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::metrics::PARSE_FALLBACKS;
use crate::models::GenerationResult;

/// A single extraction strategy.
pub type Extractor = fn(&str) -> Option<String>;

pub const FALLBACK_DOCKERFILE: &str = r#"# Basic Dockerfile (generated as fallback)
FROM node:18-alpine
WORKDIR /app
COPY package*.json ./
RUN npm install
COPY . .
EXPOSE 3000
CMD ["npm", "start"]"#;

pub const FALLBACK_JENKINSFILE: &str = r#"pipeline {
    agent any
    stages {
        stage('Build') {
            steps {
                echo 'Building...'
            }
        }
        stage('Test') {
            steps {
                echo 'Testing...'
            }
        }
        stage('Deploy') {
            steps {
                echo 'Deploying...'
            }
        }
    }
}"#;

pub const FALLBACK_GUIDE: &str = "Guide: Basic DevOps Setup

Step 1: Environment Setup
Set up your development environment with Docker and Jenkins installed. Ensure you have the necessary permissions and access to your deployment infrastructure.

Step 2: Build Process
Use the provided Dockerfile to build your application container. Run 'docker build -t your-app .' to create the image.

Step 3: Testing
Implement comprehensive testing using the Jenkinsfile pipeline. Ensure all tests pass before proceeding to deployment.

Step 4: Deployment
Deploy your application using the CI/CD pipeline. Monitor the deployment process and verify the application is running correctly.

Step 5: Monitoring
Set up monitoring and logging for your deployed application. Monitor performance metrics and application health.";

lazy_static! {
    static ref DOCKERFILE_FENCE: Regex = Regex::new(r"(?is)```dockerfile\b\s*(.*?)```").unwrap();
    static ref DOCKER_FENCE: Regex = Regex::new(r"(?is)```docker\b\s*(.*?)```").unwrap();
    static ref DOCKERFILE_LABEL: Regex = Regex::new(r"(?i)Dockerfile:\s*").unwrap();
    static ref DOCKERFILE_LABEL_END: Regex = Regex::new(r"(?i)```|Jenkinsfile:|Guide:").unwrap();
    static ref DOCKERFILE_MARKER: Regex = Regex::new(r"(?i)DOCKERFILE\s*").unwrap();
    static ref DOCKERFILE_MARKER_END: Regex = Regex::new(r"(?i)JENKINSFILE|GUIDE").unwrap();

    static ref GROOVY_FENCE: Regex = Regex::new(r"(?is)```groovy\b\s*(.*?)```").unwrap();
    static ref JENKINSFILE_FENCE: Regex = Regex::new(r"(?is)```jenkinsfile\b\s*(.*?)```").unwrap();
    static ref JENKINSFILE_LABEL: Regex = Regex::new(r"(?i)Jenkinsfile:\s*").unwrap();
    static ref JENKINSFILE_LABEL_END: Regex = Regex::new(r"(?i)```|Guide:").unwrap();
    static ref JENKINSFILE_MARKER: Regex = Regex::new(r"(?i)JENKINSFILE\s*").unwrap();
    static ref JENKINSFILE_MARKER_END: Regex = Regex::new(r"(?i)GUIDE").unwrap();

    static ref GUIDE_LABEL: Regex = Regex::new(r"(?i)Guide:\s*").unwrap();
    static ref GUIDE_MARKER: Regex = Regex::new(r"(?i)GUIDE\s*").unwrap();
    static ref DEVOPS_GUIDE_LABEL: Regex = Regex::new(r"(?i)DevOps Guide:\s*").unwrap();

    static ref ANY_FENCE: Regex = Regex::new(r"(?s)```\w*\n(.*?)```").unwrap();
}

pub const DOCKERFILE_EXTRACTORS: &[Extractor] = &[
    dockerfile_fence,
    docker_fence,
    dockerfile_label,
    dockerfile_marker,
];

pub const JENKINSFILE_EXTRACTORS: &[Extractor] = &[
    groovy_fence,
    jenkinsfile_fence,
    jenkinsfile_label,
    jenkinsfile_marker,
];

pub const GUIDE_EXTRACTORS: &[Extractor] = &[guide_label, guide_marker, devops_guide_label];

pub fn dockerfile_fence(text: &str) -> Option<String> {
    fenced(&DOCKERFILE_FENCE, text)
}

pub fn docker_fence(text: &str) -> Option<String> {
    fenced(&DOCKER_FENCE, text)
}

pub fn dockerfile_label(text: &str) -> Option<String> {
    labelled(&DOCKERFILE_LABEL, Some(&*DOCKERFILE_LABEL_END), text)
}

pub fn dockerfile_marker(text: &str) -> Option<String> {
    labelled(&DOCKERFILE_MARKER, Some(&*DOCKERFILE_MARKER_END), text)
}

pub fn groovy_fence(text: &str) -> Option<String> {
    fenced(&GROOVY_FENCE, text)
}

pub fn jenkinsfile_fence(text: &str) -> Option<String> {
    fenced(&JENKINSFILE_FENCE, text)
}

pub fn jenkinsfile_label(text: &str) -> Option<String> {
    labelled(&JENKINSFILE_LABEL, Some(&*JENKINSFILE_LABEL_END), text)
}

pub fn jenkinsfile_marker(text: &str) -> Option<String> {
    labelled(&JENKINSFILE_MARKER, Some(&*JENKINSFILE_MARKER_END), text)
}

// Guide extractors capture everything after the label
pub fn guide_label(text: &str) -> Option<String> {
    labelled(&GUIDE_LABEL, None, text)
}

pub fn guide_marker(text: &str) -> Option<String> {
    labelled(&GUIDE_MARKER, None, text)
}

pub fn devops_guide_label(text: &str) -> Option<String> {
    labelled(&DEVOPS_GUIDE_LABEL, None, text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Dockerfile,
    Jenkinsfile,
    Guide,
}

impl ArtifactKind {
    pub fn extractors(self) -> &'static [Extractor] {
        match self {
            Self::Dockerfile => DOCKERFILE_EXTRACTORS,
            Self::Jenkinsfile => JENKINSFILE_EXTRACTORS,
            Self::Guide => GUIDE_EXTRACTORS,
        }
    }

    pub fn fallback(self) -> &'static str {
        match self {
            Self::Dockerfile => FALLBACK_DOCKERFILE,
            Self::Jenkinsfile => FALLBACK_JENKINSFILE,
            Self::Guide => FALLBACK_GUIDE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dockerfile => "dockerfile",
            Self::Jenkinsfile => "jenkinsfile",
            Self::Guide => "guide",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parser output plus the artifacts that had to be defaulted.
#[derive(Debug, Clone)]
pub struct ParsedArtifacts {
    pub result: GenerationResult,
    pub fallbacks: Vec<ArtifactKind>,
}

/// Runs extractors in order; first non-empty match wins.
pub fn extract(text: &str, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|extractor| extractor(text))
}

pub fn parse(raw: &str) -> ParsedArtifacts {
    let mut fallbacks = Vec::new();
    let mut resolve = |kind: ArtifactKind| {
        extract(raw, kind.extractors()).unwrap_or_else(|| {
            fallbacks.push(kind);
            kind.fallback().to_string()
        })
    };

    let dockerfile = resolve(ArtifactKind::Dockerfile);
    let jenkinsfile = resolve(ArtifactKind::Jenkinsfile);
    let guide = resolve(ArtifactKind::Guide);

    for kind in &fallbacks {
        PARSE_FALLBACKS.with_label_values(&[kind.label()]).inc();
        tracing::warn!(artifact = %kind, "Parse fallback used, substituting default template");
    }

    ParsedArtifacts {
        result: GenerationResult {
            dockerfile,
            jenkinsfile,
            guide,
        },
        fallbacks,
    }
}

/// Body of the first fenced code block, or the whole text when there is none.
pub fn first_code_block(text: &str) -> String {
    ANY_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| text.to_string(), |m| m.as_str().to_string())
}

fn fenced(pattern: &Regex, text: &str) -> Option<String> {
    let body = pattern.captures(text)?.get(1)?.as_str().trim();
    (!body.is_empty()).then(|| body.to_string())
}

// Text after the first `label` match, up to the first `end` match (or the end of text)
fn labelled(label: &Regex, end: Option<&Regex>, text: &str) -> Option<String> {
    let rest = &text[label.find(text)?.end()..];
    let section = match end.and_then(|end| end.find(rest)) {
        Some(stop) => &rest[..stop.start()],
        None => rest,
    };
    let section = section.trim();
    (!section.is_empty()).then(|| section.to_string())
}
