//! Request bodies sent to the chat-completion API.

use crate::models::{ChatMessage, ChatRequest};

pub fn analysis_request(model: &str, code: &str) -> ChatRequest {
    let system = format!(
        r#"You are a senior DevOps engineer. Given the following project code, you must generate and return exactly three sections, each in a code block with a clear label:

1. Dockerfile: Return a complete, production-ready Dockerfile in a code block labeled 'dockerfile'. Add comments in the Dockerfile to explain each major step and why it is needed for this codebase.

2. Jenkinsfile: Return a complete Jenkinsfile for CI/CD in a code block labeled 'groovy'. Add comments in the Jenkinsfile to explain each pipeline stage and any important configuration.

3. Guide: Return a detailed, step-by-step DevOps guide in a code block labeled 'markdown'. Format the guide using markdown with headings, bold, and bullet points. Each step should be clear, actionable, and tailored to the codebase. The guide must include at least 5 steps, troubleshooting tips, and a summary. Example format:

```markdown
# DevOps Setup Guide

## Step 1: ...
**Description:** ...
- ...

## Step 2: ...
**Description:** ...
- ...
...
```

You must always return all three sections, even if you have to provide a basic or fallback version. The output must be strictly parseable and visually formatted for UI display. Tailor all content to the provided codebase and its technology stack.

Code to analyze:
```
{code}
```
"#
    );

    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system),
            ChatMessage::user(
                "Analyze this code and generate the three required sections as described above.",
            ),
        ],
        max_tokens: 4000,
        temperature: 0.2,
        top_p: 0.9,
        frequency_penalty: Some(0.1),
        presence_penalty: Some(0.1),
    }
}

/// Terser escalation prompt: same sampling, a single directive system message.
pub fn simplified_request(primary: &ChatRequest, code: &str) -> ChatRequest {
    let system = format!(
        "Generate a Dockerfile, Jenkinsfile, and DevOps guide for this code. Use exact format:
1. ```dockerfile (your dockerfile here) ```
2. ```groovy (your jenkinsfile here) ```
3. Guide: (your guide here)

Code: {code}"
    );

    ChatRequest {
        messages: vec![ChatMessage::system(system)],
        ..primary.clone()
    }
}

pub fn comment_request(model: &str, language: &str, code: &str) -> ChatRequest {
    let system = format!(
        "You are an expert {language} developer and code reviewer. Add clear, helpful comments to the following code, explaining:

1. Function purposes and parameters
2. Complex logic and algorithms
3. Important variables and their roles
4. Error handling and edge cases
5. Performance considerations
6. Security implications (if any)

Guidelines:
- Use appropriate comment syntax for {language}
- Keep comments concise but informative
- Explain WHY, not just WHAT
- Add comments for non-obvious code sections
- Include docstrings for functions/classes where appropriate
- Maintain original code structure and formatting

Return the fully commented code in a code block with proper syntax highlighting."
    );

    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system),
            ChatMessage::user(format!(
                "Please add comprehensive comments to this {language} code:\n\n{code}"
            )),
        ],
        max_tokens: 2048,
        temperature: 0.3,
        top_p: 0.9,
        frequency_penalty: None,
        presence_penalty: None,
    }
}

// Ordered: the first language whose hint appears wins
const LANGUAGE_HINTS: &[(&str, &[&str])] = &[
    ("Python", &["def ", "import ", "from "]),
    ("JavaScript", &["function ", "const ", "let "]),
    ("TypeScript", &["interface ", "type ", ": string"]),
    ("Java", &["public class ", "private ", "system.out"]),
    ("C++", &["#include", "int main", "std::"]),
    ("PHP", &["<?php", "$"]),
    ("Rust", &["fn ", "let mut", "println!"]),
    ("Go", &["func ", "package ", "fmt."]),
];

/// Rough language guess used to phrase the commenting prompt.
pub fn detect_language(code: &str) -> &'static str {
    let code = code.trim().to_lowercase();
    LANGUAGE_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|hint| code.contains(hint)))
        .map_or("code", |(language, _)| language)
}
