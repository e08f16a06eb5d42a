//! Story format compliance
//!
//! A pure text check: no external process is involved. Modern markers win
//! over deprecated ones, so a file that is mid-migration still passes.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use specgate_common::{check_names, CheckResult, CheckStatus};

use crate::config::FormatConfig;
use crate::error::{Error, Result};
use crate::runner::{CheckContext, CheckRunner, NamedResults};

pub struct FormatRunner {
    config: FormatConfig,
}

impl FormatRunner {
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Classify story source text
    pub fn classify(&self, source: &str) -> CheckResult {
        let has_any = |markers: &[String]| markers.iter().any(|m| contains_marker(source, m));

        let modern = has_any(self.config.modern_markers.as_slice());
        let deprecated = has_any(self.config.deprecated_markers.as_slice());
        debug!("Format markers: modern={} deprecated={}", modern, deprecated);

        if modern {
            CheckResult::pass().with_metadata(json!({ "format": self.config.modern_label }))
        } else if deprecated {
            CheckResult::fail(format!(
                "Deprecated story format detected ({}); migrate to {}",
                self.config.deprecated_label, self.config.modern_label
            ))
            .with_metadata(json!({ "format": self.config.deprecated_label }))
        } else {
            CheckResult::fail(format!(
                "Could not determine story format: no {} or {} markers found",
                self.config.modern_label, self.config.deprecated_label
            ))
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether `marker` occurs in `source` without being the tail of a longer
/// identifier (`Meta<` must not match inside `ComponentMeta<`)
fn contains_marker(source: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    let starts_identifier = marker.chars().next().is_some_and(is_identifier_char);

    source.match_indices(marker).any(|(idx, _)| {
        !starts_identifier || !source[..idx].chars().next_back().is_some_and(is_identifier_char)
    })
}

#[async_trait]
impl CheckRunner for FormatRunner {
    fn name(&self) -> &'static str {
        "format"
    }

    fn checks(&self) -> &'static [&'static str] {
        &[check_names::FORMAT_COMPLIANCE]
    }

    fn failure_status(&self) -> CheckStatus {
        CheckStatus::Error
    }

    async fn run(&self, ctx: &CheckContext) -> Result<NamedResults> {
        let source = tokio::fs::read_to_string(&ctx.target)
            .await
            .map_err(|source| Error::Read {
                path: ctx.target.clone(),
                source,
            })?;

        Ok(vec![(check_names::FORMAT_COMPLIANCE, self.classify(&source))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_isolated;
    use std::path::PathBuf;
    use test_case::test_case;

    const CSF3: &str = r#"
import type { Meta, StoryObj } from '@storybook/react';
import { Button } from './Button';

const meta = { component: Button } satisfies Meta<typeof Button>;
export default meta;
type Story = StoryObj<typeof meta>;

export const Primary: Story = { args: { primary: true } };
"#;

    const CSF2: &str = r#"
import { ComponentStory, ComponentMeta } from '@storybook/react';
import { Button } from './Button';

export default { component: Button } as ComponentMeta<typeof Button>;
const Template: ComponentStory<typeof Button> = (args) => <Button {...args} />;
export const Primary = Template.bind({});
"#;

    #[test_case(CSF3, CheckStatus::Pass, Some("csf3") ; "modern")]
    #[test_case(CSF2, CheckStatus::Fail, Some("csf2") ; "deprecated only")]
    #[test_case("export default { component: Badge } as ComponentMeta<typeof Badge>;\n", CheckStatus::Fail, Some("csf2") ; "component meta without template")]
    #[test_case("const meta: Meta<typeof Badge> = { component: Badge };\n", CheckStatus::Pass, Some("csf3") ; "typed meta")]
    #[test_case("export const x = 1;\n", CheckStatus::Fail, None ; "indeterminate")]
    #[test_case("const Template = 1;\nexport const A: StoryObj<typeof meta> = Template.bind({});", CheckStatus::Pass, Some("csf3") ; "mixed prefers modern")]
    fn test_classify(source: &str, status: CheckStatus, format: Option<&str>) {
        let result = FormatRunner::new(FormatConfig::default()).classify(source);
        assert_eq!(result.status(), status);
        assert_eq!(
            result.metadata().and_then(|m| m["format"].as_str()),
            format
        );
    }

    #[test]
    fn test_contains_marker_boundaries() {
        assert!(contains_marker("as Meta<typeof Button>", "Meta<typeof"));
        assert!(contains_marker("(Meta<typeof Button>)", "Meta<typeof"));
        assert!(!contains_marker("as ComponentMeta<typeof Button>", "Meta<typeof"));
        assert!(contains_marker("x = Template.bind({})", "Template.bind("));
        assert!(contains_marker("a<b", "<b"));
        assert!(!contains_marker("anything", ""));
    }

    #[test]
    fn test_deprecated_message() {
        let result = FormatRunner::new(FormatConfig::default()).classify(CSF2);
        assert!(result.error_text().unwrap().contains("Deprecated story format"));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_error() {
        let ctx = CheckContext {
            target: PathBuf::from("/nonexistent/Button.stories.tsx"),
            project_root: PathBuf::from("/nonexistent"),
            manifest: None,
        };
        let results = run_isolated(&FormatRunner::new(FormatConfig::default()), &ctx).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.status(), CheckStatus::Error);
        assert!(results[0].1.error_text().unwrap().contains("Failed to read"));
    }
}
