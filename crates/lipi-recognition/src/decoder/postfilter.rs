//! Decoded-text cleanup.

use lipi_settings::ScriptRange;

/// Cleans raw decoded text line by line.
///
/// - control characters other than `\n` are removed; other whitespace becomes a space
/// - runs of whitespace collapse to one space and lines are trimmed
/// - lines with no alphanumeric or target-script character are dropped
#[derive(Clone, Debug, Default)]
pub struct PostFilter {
    target_scripts: Vec<ScriptRange>,
}

impl PostFilter {
    /// Filter that also accepts characters from `target_scripts`.
    pub fn new(target_scripts: Vec<ScriptRange>) -> Self {
        Self { target_scripts }
    }

    /// Whether `c` counts as meaningful content.
    fn is_content(&self, c: char) -> bool {
        c.is_alphanumeric() || self.target_scripts.iter().any(|r| r.contains(c))
    }

    /// Apply the filter.
    pub fn apply(&self, text: &str) -> String {
        let cleaned: String = text
            .chars()
            .filter_map(|c| match c {
                '\n' => Some('\n'),
                c if c.is_whitespace() => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();

        cleaned
            .split('\n')
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| line.chars().any(|c| self.is_content(c)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
