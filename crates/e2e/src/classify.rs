//! Classification of test-runner output into render and interaction results
//!
//! The Storybook test runner reports every story of a file in one Jest-style
//! text stream. Each story runs a `smoke-test` (render only) or a `play-test`
//! (render plus play function). A failing test produces a block such as:
//!
//! ```text
//!   ● Example/Button › Primary › smoke-test
//!
//!     Message:
//!      Cannot read properties of undefined (reading 'label')
//!
//!       at Primary (src/components/Button.stories.tsx:14:22)
//! ```
//!
//! [`JestTextClassifier`] scopes the text to the suite of one story file,
//! splits it into `●` blocks and assigns each block to a sub-test category
//! by the tag in its last `›` segment. Render and interaction are decided
//! independently of each other.

use once_cell::sync::Lazy;
use regex::Regex;
use specgate_common::CheckResult;
use tracing::debug;

static SUITE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(PASS|FAIL)\s+\S").expect("valid suite header pattern"));

static SUMMARY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(Test Suites|Tests|Snapshots|Time):").expect("valid summary pattern")
});

static MESSAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Message:\s*(.*)$").expect("valid message pattern"));

static STACK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*at\s+\S").expect("valid stack line pattern"));

/// Sub-test categories reported by the live test tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTest {
    Render,
    Interaction,
}

impl SubTest {
    pub fn label(&self) -> &'static str {
        match self {
            SubTest::Render => "Render",
            SubTest::Interaction => "Interaction",
        }
    }
}

/// Render and interaction outcomes for one story file
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTestClassification {
    pub render: CheckResult,
    pub interaction: CheckResult,
}

impl LiveTestClassification {
    /// Both sub-results with the same outcome
    pub fn uniform(result: CheckResult) -> Self {
        Self {
            render: result.clone(),
            interaction: result,
        }
    }
}

/// Turns raw live-test output into structured results
pub trait OutputClassifier: Send + Sync {
    fn classify(&self, text: &str, identifier: &str) -> LiveTestClassification;
}

/// Pattern-matching classifier for Jest-style test-runner output
#[derive(Debug, Clone)]
pub struct JestTextClassifier {
    render_tags: Vec<String>,
    interaction_tags: Vec<String>,
}

impl Default for JestTextClassifier {
    fn default() -> Self {
        Self::new(
            ["smoke-test", "smoke", "render"],
            ["play-test", "play", "interaction"],
        )
    }
}

impl JestTextClassifier {
    pub fn new<R, I>(render_tags: R, interaction_tags: I) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let normalize = |tag: &str| tag.trim().to_lowercase();
        Self {
            render_tags: render_tags
                .into_iter()
                .map(|t| normalize(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
            interaction_tags: interaction_tags
                .into_iter()
                .map(|t| normalize(t.as_ref()))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    fn tags(&self, sub_test: SubTest) -> &[String] {
        match sub_test {
            SubTest::Render => &self.render_tags,
            SubTest::Interaction => &self.interaction_tags,
        }
    }

    /// Category of a block header's last segment. Exact tag matches win over
    /// partial ones; render is checked before interaction.
    fn category_of(&self, segment: &str) -> Option<SubTest> {
        let segment = segment.trim().to_lowercase();
        let categories = [SubTest::Render, SubTest::Interaction];

        categories
            .iter()
            .copied()
            .find(|c| self.tags(*c).iter().any(|t| *t == segment))
            .or_else(|| {
                categories
                    .iter()
                    .copied()
                    .find(|c| has_tag(&segment, self.tags(*c)))
            })
    }

    fn classify_sub_test(
        &self,
        sub_test: SubTest,
        section: &[&str],
        blocks: &[FailureBlock<'_>],
        identifier: &str,
    ) -> CheckResult {
        let present = section
            .iter()
            .filter_map(|line| test_case_name(line))
            .any(|name| self.category_of(name) == Some(sub_test));

        if !present {
            return CheckResult::skip(format!(
                "No {} sub-test present for '{}'",
                sub_test.label().to_lowercase(),
                identifier
            ));
        }

        let messages: Vec<String> = blocks
            .iter()
            .filter(|block| self.category_of(block.last_segment()) == Some(sub_test))
            .filter_map(|block| block.failure_message(identifier))
            .collect();

        if messages.is_empty() {
            return CheckResult::pass();
        }

        debug!(
            "{} failures for '{}': {}",
            sub_test.label(),
            identifier,
            messages.len()
        );

        let mut extracted: Vec<String> = Vec::new();
        for message in messages.into_iter().filter(|m| !m.is_empty()) {
            if !extracted.contains(&message) {
                extracted.push(message);
            }
        }

        if extracted.is_empty() {
            CheckResult::fail(format!("{} test failed", sub_test.label()))
        } else {
            CheckResult::fail(extracted.join("\n\n"))
        }
    }
}

impl OutputClassifier for JestTextClassifier {
    fn classify(&self, text: &str, identifier: &str) -> LiveTestClassification {
        if identifier.is_empty() || !mentions(text, identifier) {
            return LiveTestClassification::uniform(CheckResult::skip(format!(
                "Test identifier '{}' not found in test runner output",
                identifier
            )));
        }

        let lines: Vec<&str> = text.lines().collect();
        let section = suite_section(&lines, identifier);
        let blocks = failure_blocks(section);

        let suite_failed = section.iter().any(|line| {
            line.trim_start().starts_with("FAIL")
                && SUITE_HEADER.is_match(line)
                && mentions(line, identifier)
        });
        let block_failed = blocks.iter().any(|block| block.mentions(identifier));

        if !suite_failed && !block_failed {
            return LiveTestClassification::uniform(CheckResult::pass());
        }

        LiveTestClassification {
            render: self.classify_sub_test(SubTest::Render, section, &blocks, identifier),
            interaction: self.classify_sub_test(SubTest::Interaction, section, &blocks, identifier),
        }
    }
}

/// One `●` failure block: the header text and the lines below it
#[derive(Debug)]
struct FailureBlock<'a> {
    header: &'a str,
    body: &'a [&'a str],
}

impl<'a> FailureBlock<'a> {
    fn last_segment(&self) -> &'a str {
        self.header.rsplit('›').next().unwrap_or(self.header).trim()
    }

    fn mentions(&self, identifier: &str) -> bool {
        mentions(self.header, identifier) || self.body.iter().any(|l| mentions(l, identifier))
    }

    /// The extracted message if this block is a failure of `identifier`,
    /// i.e. it has a stack line referencing it after the message marker.
    fn failure_message(&self, identifier: &str) -> Option<String> {
        let marker = self.body.iter().position(|l| MESSAGE_MARKER.is_match(l));
        let stack_from = marker.map(|i| i + 1).unwrap_or(0);

        let references = self.body[stack_from..]
            .iter()
            .any(|l| STACK_LINE.is_match(l) && mentions(l, identifier));
        if !references {
            return None;
        }

        Some(marker.map(|i| extract_message(&self.body[i..])).unwrap_or_default())
    }
}

/// Text after `Message:` up to the first blank or stack line
fn extract_message(from_marker: &[&str]) -> String {
    let mut parts = Vec::new();

    if let Some(first) = from_marker
        .first()
        .and_then(|l| MESSAGE_MARKER.captures(l))
        .and_then(|c| c.get(1))
    {
        let first = first.as_str().trim();
        if !first.is_empty() {
            parts.push(first);
        }
    }

    for line in from_marker.iter().skip(1) {
        let trimmed = line.trim();
        if trimmed.is_empty() || STACK_LINE.is_match(line) {
            break;
        }
        parts.push(trimmed);
    }

    parts.join("\n")
}

/// The lines belonging to the suite whose header names `identifier`,
/// or everything when no such header exists.
fn suite_section<'a>(lines: &'a [&'a str], identifier: &str) -> &'a [&'a str] {
    let start = lines
        .iter()
        .position(|l| SUITE_HEADER.is_match(l) && mentions(l, identifier));

    match start {
        Some(start) => {
            let end = lines[start + 1..]
                .iter()
                .position(|l| SUITE_HEADER.is_match(l))
                .map(|offset| start + 1 + offset)
                .unwrap_or(lines.len());
            &lines[start..end]
        }
        None => lines,
    }
}

/// Result and failure-block markers that start a test-case line
const TEST_CASE_MARKERS: &[char] = &['✓', '✔', '✕', '✖', '○', '●'];

/// Last `›` segment of a test-case line, without its trailing duration
fn test_case_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix(TEST_CASE_MARKERS)?.trim();
    let name = match rest.rfind(" (") {
        Some(idx) if rest.ends_with(')') => &rest[..idx],
        _ => rest,
    };
    Some(name.rsplit('›').next().unwrap_or(name).trim())
}

fn failure_blocks<'a>(section: &'a [&'a str]) -> Vec<FailureBlock<'a>> {
    let mut blocks = Vec::new();
    let mut current: Option<(usize, &'a str)> = None;

    let close = |start: usize, end: usize, header: &'a str, blocks: &mut Vec<FailureBlock<'a>>| {
        blocks.push(FailureBlock {
            header,
            body: &section[start..end],
        });
    };

    for (idx, line) in section.iter().enumerate() {
        let trimmed = line.trim_start();
        let is_block_start = trimmed.starts_with('●');
        let is_terminator =
            is_block_start || SUITE_HEADER.is_match(line) || SUMMARY_LINE.is_match(line);

        if is_terminator {
            if let Some((start, header)) = current.take() {
                close(start, idx, header, &mut blocks);
            }
        }

        if is_block_start {
            current = Some((idx + 1, trimmed.trim_start_matches('●').trim()));
        }
    }

    if let Some((start, header)) = current {
        close(start, section.len(), header, &mut blocks);
    }

    blocks
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Occurrence of `token` in `haystack` not embedded in a longer word
fn contains_token(haystack: &str, token: &str, word_char: fn(char) -> bool) -> bool {
    if token.is_empty() {
        return false;
    }
    haystack.match_indices(token).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + token.len()..].chars().next();
        !before.is_some_and(word_char) && !after.is_some_and(word_char)
    })
}

fn mentions(haystack: &str, identifier: &str) -> bool {
    contains_token(haystack, identifier, is_identifier_char)
}

/// `haystack` must already be lowercase
fn has_tag(haystack: &str, tags: &[String]) -> bool {
    tags.iter().any(|tag| contains_token(haystack, tag, is_tag_char))
}
