use serde::{Deserialize, Serialize};

pub const NO_SUMMARY: &str = "No summary available";

const BULLET_MARKERS: [char; 3] = ['•', '-', '*'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryBlock {
    Paragraph(String),
    Items(Vec<String>),
}

/// Splits an AI summary into display blocks.
///
/// Blocks are separated by lines that are empty or whitespace-only. A block
/// in which any line starts with a bullet marker becomes a list with one item
/// per non-empty line, in order; the marker itself is kept so the shell shows
/// the text as written. Any other block becomes one trimmed paragraph.
#[must_use]
pub fn format_summary(summary: Option<&str>) -> Vec<SummaryBlock> {
    let Some(text) = summary.filter(|s| !s.trim().is_empty()) else {
        return vec![SummaryBlock::Paragraph(NO_SUMMARY.to_string())];
    };

    paragraphs(text)
        .into_iter()
        .map(|lines| {
            if lines.iter().any(|l| is_bullet(l)) {
                SummaryBlock::Items(lines.iter().map(|l| l.trim().to_string()).collect())
            } else {
                SummaryBlock::Paragraph(lines.join("\n").trim().to_string())
            }
        })
        .collect()
}

fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLET_MARKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_summary() {
        let expected = vec![SummaryBlock::Paragraph(NO_SUMMARY.to_string())];
        assert_eq!(format_summary(None), expected);
        assert_eq!(format_summary(Some("  \n\t ")), expected);
    }

    #[test]
    fn splits_on_blank_lines() {
        let blocks = format_summary(Some("First finding.\n\n  \nSecond finding.\ncontinued"));
        assert_eq!(
            blocks,
            vec![
                SummaryBlock::Paragraph("First finding.".into()),
                SummaryBlock::Paragraph("Second finding.\ncontinued".into()),
            ]
        );
    }

    #[test]
    fn bullet_paragraph_becomes_items() {
        let blocks = format_summary(Some(
            "Key results:\n• Hemoglobin normal\n  - Glucose slightly high\n* Follow up in 3 months",
        ));
        assert_eq!(
            blocks,
            vec![SummaryBlock::Items(vec![
                "Key results:".into(),
                "• Hemoglobin normal".into(),
                "- Glucose slightly high".into(),
                "* Follow up in 3 months".into(),
            ])]
        );
    }

    #[test]
    fn mixed_blocks_keep_order() {
        let blocks = format_summary(Some("Overview text.\n\n- a\n- b\n\nClosing."));
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], SummaryBlock::Paragraph(p) if p == "Overview text."));
        assert!(matches!(&blocks[1], SummaryBlock::Items(items) if items.len() == 2));
        assert!(matches!(&blocks[2], SummaryBlock::Paragraph(p) if p == "Closing."));
    }
}
