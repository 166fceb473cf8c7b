use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding the crate's own Rust sources. Anything else under the
// package root (vendored material, scratch checkouts, target/) is not ours to police.
const SOURCE_DIRS: [&str; 6] = [
    "retention",
    "scenario",
    "output",
    "cli",
    "tests",
    "benches",
];

const FORBIDDEN_WORDS: [&str; 14] = [
    "FIXED",
    "CORRECTED",
    "FIX",
    "FIXES",
    "NEW",
    "CHANGED",
    "CHANGES",
    "CHANGE",
    "MODIFIED",
    "MODIFIES",
    "MODIFY",
    "UPDATED",
    "UPDATES",
    "UPDATE",
];

/// One source policy: the line pattern that triggers it and how matches are vetted.
#[derive(Clone, Copy)]
enum Rule {
    UnderscoreBinding,
    ChangeLogComment,
    StarsInComment,
    ShoutingComment,
    AllowDeadCode,
}

impl Rule {
    const ALL: [Rule; 5] = [
        Rule::UnderscoreBinding,
        Rule::ChangeLogComment,
        Rule::StarsInComment,
        Rule::ShoutingComment,
        Rule::AllowDeadCode,
    ];

    fn pattern(self) -> &'static str {
        match self {
            Rule::UnderscoreBinding => r"\b(_[a-zA-Z0-9_]+)\b",
            Rule::ChangeLogComment => {
                r"(//|/\*).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE)"
            }
            Rule::StarsInComment => r"(//|/\*).*\*\*",
            Rule::ShoutingComment => r"(//|/\*).*",
            Rule::AllowDeadCode => r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Rule::UnderscoreBinding => {
                "Underscore-prefixed names are not allowed. Use the binding or remove it."
            }
            Rule::ChangeLogComment => {
                "Comments must not narrate edits (FIXED, NEW, CHANGED, UPDATE and similar)."
            }
            Rule::StarsInComment => "The '**' pattern is only allowed in /// doc comments.",
            Rule::ShoutingComment => "Comments written entirely in uppercase are not allowed.",
            Rule::AllowDeadCode => "#[allow(dead_code)] is not allowed. Use the code or remove it.",
        }
    }

    // Decides whether a line that matched the pattern is a genuine violation.
    fn violated_by(self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match self {
            Rule::UnderscoreBinding => {
                !trimmed.starts_with("//") && !underscore_only_in_strings(line)
            }
            Rule::ChangeLogComment => comment_text(line)
                .is_some_and(|text| FORBIDDEN_WORDS.iter().any(|word| text.contains(word))),
            Rule::StarsInComment => {
                !trimmed.starts_with("///")
                    && comment_text(line).is_some_and(|text| text.contains("**"))
            }
            Rule::ShoutingComment => comment_text(line).is_some_and(|text| {
                let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
                letters.peek().is_some() && letters.all(char::is_uppercase)
            }),
            Rule::AllowDeadCode => true,
        }
    }
}

// Text of a comment that starts the line or follows `/*`, without its marker.
fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim_start_matches(['/', '!']).trim());
    }
    let start = line.find("/*")? + 2;
    let body = &line[start..];
    Some(match body.find("*/") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    })
}

fn underscore_only_in_strings(line: &str) -> bool {
    line.contains('"')
        && line
            .split('"')
            .enumerate()
            .any(|(index, part)| index % 2 == 1 && part.contains('_'))
}

struct PolicyCollector {
    rule: Rule,
    file_path: PathBuf,
    violations: Vec<String>,
}

impl PolicyCollector {
    fn new(rule: Rule, file_path: &Path) -> Self {
        Self {
            rule,
            file_path: file_path.to_path_buf(),
            violations: Vec::new(),
        }
    }

    fn error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }
        let mut message = format!(
            "\n❌ ERROR: {} source policy violation(s) in {}:\n",
            self.violations.len(),
            self.file_path.display()
        );
        for violation in &self.violations {
            message.push_str(&format!("   {violation}\n"));
        }
        message.push_str(&format!("\n⚠️ {}\n", self.rule.describe()));
        Some(message)
    }
}

impl Sink for PolicyCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if self.rule.violated_by(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn source_files() -> Vec<PathBuf> {
    SOURCE_DIRS
        .iter()
        .flat_map(|dir| WalkDir::new(dir).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn scan(files: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let mut searcher = Searcher::new();
    for rule in Rule::ALL {
        let matcher = RegexMatcher::new_line_matcher(rule.pattern())?;
        for path in files {
            let mut collector = PolicyCollector::new(rule, path);
            searcher.search_path(&matcher, path, &mut collector)?;
            if let Some(message) = collector.error_message() {
                return Err(message.into());
            }
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    if let Err(e) = scan(&source_files()) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
