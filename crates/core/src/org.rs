//! Org-mode rendering of resolved annotations.
//!
//! Grouped output looks like:
//!
//! ```text
//! * Highlights
//!
//! ** 3 Introduction
//!   the highlighted text
//!
//! * Detailed comments
//!
//! ** 5 Method
//!   quoted text
//!
//!  reviewer comment
//! ```

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationKind;
use crate::document::ResolvedAnnotation;

const INDENT: &str = " ";

/// A section of grouped output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    /// Highlights without a comment.
    Highlights,
    /// Anything that is not a nit and carries a comment.
    Comments,
    /// Squiggles, strikeouts and underlines.
    Nits,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Highlights, Section::Comments, Section::Nits];

    pub fn header(&self) -> &'static str {
        match self {
            Section::Highlights => "Highlights",
            Section::Comments => "Detailed comments",
            Section::Nits => "Nits",
        }
    }

    /// Whether `annotation` belongs in this section.
    pub fn contains(&self, annotation: &ResolvedAnnotation) -> bool {
        match self {
            Section::Highlights => {
                annotation.kind == AnnotationKind::Highlight && annotation.comment.is_none()
            }
            Section::Comments => !annotation.kind.is_nit() && annotation.comment.is_some(),
            Section::Nits => annotation.kind.is_nit(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrgOptions {
    /// Word-wrap column; `None` disables wrapping.
    pub wrap: Option<usize>,
    /// Section order for grouped output.
    pub sections: Vec<Section>,
    /// Group annotations into sections.
    pub group: bool,
    /// Emit a `#+Title:` line first.
    pub title: Option<String>,
}

impl Default for OrgOptions {
    fn default() -> Self {
        OrgOptions {
            wrap: None,
            sections: Section::ALL.to_vec(),
            group: true,
            title: None,
        }
    }
}

/// Render `annotations`, already in reading order, as an org document.
pub fn render_org(annotations: &[ResolvedAnnotation], options: &OrgOptions) -> String {
    let mut out = String::new();

    if let Some(title) = &options.title {
        out.push_str(&format!("#+Title: {title}\n\n"));
    }

    if options.group {
        render_grouped(&mut out, annotations, options);
    } else {
        for annotation in annotations {
            let (label, body) =
                format_annotation(annotation, Some(annotation.kind.as_str()), options);
            out.push_str(&label);
            out.push_str(&body);
            out.push('\n');
        }
    }

    out
}

fn render_grouped(out: &mut String, annotations: &[ResolvedAnnotation], options: &OrgOptions) {
    let mut first_section = true;

    for section in &options.sections {
        let members: Vec<&ResolvedAnnotation> =
            annotations.iter().filter(|a| section.contains(a)).collect();
        if members.is_empty() {
            continue;
        }

        if !first_section {
            out.push('\n');
        }
        first_section = false;
        out.push_str(&format!("* {}\n\n", section.header()));

        // Labels in first-seen order, each with its accumulated bodies.
        let mut groups: Vec<(String, String)> = Vec::new();
        for annotation in members {
            let extra = (*section == Section::Nits && annotation.kind == AnnotationKind::StrikeOut)
                .then_some("delete");
            let (label, body) = format_annotation(annotation, extra, options);
            match groups.iter_mut().find(|(l, _)| *l == label) {
                Some((_, bodies)) => {
                    bodies.push_str(&body);
                    bodies.push('\n');
                }
                None => groups.push((label, format!("{body}\n"))),
            }
        }

        for (label, bodies) in groups {
            out.push_str(&label);
            out.push_str(&bodies);
            out.push('\n');
        }
    }
}

/// `** <page>[ <outline>]`
fn format_label(annotation: &ResolvedAnnotation) -> String {
    match &annotation.outline {
        Some(title) => format!("** {} {}", annotation.page + 1, title),
        None => format!("** {}", annotation.page + 1),
    }
}

/// Split an annotation into its label and body. The body starts with a
/// newline so that it can be appended directly after the label.
fn format_annotation(
    annotation: &ResolvedAnnotation,
    extra: Option<&str>,
    options: &OrgOptions,
) -> (String, String) {
    let label = format_label(annotation);
    let mut body = String::new();

    if let Some(extra) = extra {
        body.push_str(&format!("\n:PROPERTIES:\n:Extra: {extra}\n:END:"));
    }

    let quote = paragraphs(annotation.text.as_deref());
    let comment = paragraphs(annotation.comment.as_deref());

    for (i, para) in quote.iter().enumerate() {
        body.push_str(if i == 0 { "\n" } else { "\n\n" });
        body.push_str(&fill(para, INDENT.repeat(2).as_str(), options.wrap));
    }
    for para in comment {
        body.push('\n');
        body.push('\n');
        let indent = if options.wrap.is_some() {
            INDENT.to_string()
        } else {
            INDENT.repeat(2)
        };
        body.push_str(&fill(para, &indent, options.wrap));
    }

    (label, body)
}

fn paragraphs(text: Option<&str>) -> Vec<&str> {
    text.map(|t| t.trim().lines().filter(|l| !l.is_empty()).collect())
        .unwrap_or_default()
}

/// Indent `para`, greedily wrapping words at `width` columns when set.
///
/// Whitespace runs collapse to single spaces when wrapping. A word longer
/// than a whole line fills the rest of the current line and is split across
/// the following ones.
fn fill(para: &str, indent: &str, width: Option<usize>) -> String {
    let Some(width) = width else {
        return format!("{indent}{para}");
    };
    let room = width.saturating_sub(indent.chars().count()).max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut len = 0;
    for word in para.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        let sep = usize::from(len > 0);

        if len + sep + chars.len() <= room {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            len += sep + chars.len();
            continue;
        }

        if chars.len() <= room {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            len = chars.len();
            continue;
        }

        let mut rest = chars.as_slice();
        if len + sep < room {
            let (head, tail) = rest.split_at(room - len - sep);
            if sep == 1 {
                current.push(' ');
            }
            current.extend(head);
            rest = tail;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        while rest.len() > room {
            let (head, tail) = rest.split_at(room);
            lines.push(head.iter().collect());
            rest = tail;
        }
        current.extend(rest);
        len = rest.len();
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .iter()
        .map(|line| format!("{indent}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(
        kind: AnnotationKind,
        page: usize,
        outline: Option<&str>,
        text: Option<&str>,
        comment: Option<&str>,
    ) -> ResolvedAnnotation {
        ResolvedAnnotation {
            kind,
            page,
            pos: None,
            outline: outline.map(String::from),
            text: text.map(String::from),
            comment: comment.map(String::from),
            author: None,
        }
    }

    #[test]
    fn test_section_membership() {
        let plain = resolved(AnnotationKind::Highlight, 0, None, Some("t"), None);
        let commented = resolved(AnnotationKind::Highlight, 0, None, Some("t"), Some("c"));
        let note = resolved(AnnotationKind::Text, 0, None, None, Some("c"));
        let nit = resolved(AnnotationKind::Squiggly, 0, None, Some("t"), Some("c"));

        assert!(Section::Highlights.contains(&plain));
        assert!(!Section::Highlights.contains(&commented));
        assert!(Section::Comments.contains(&commented));
        assert!(Section::Comments.contains(&note));
        assert!(!Section::Comments.contains(&nit));
        assert!(Section::Nits.contains(&nit));
    }

    #[test]
    fn test_grouped_output() {
        let annots = vec![
            resolved(AnnotationKind::Highlight, 0, Some("Intro"), Some("systems are hard"), None),
            resolved(AnnotationKind::Text, 0, Some("Intro"), None, Some("check this")),
        ];
        let out = render_org(&annots, &OrgOptions::default());
        assert_eq!(
            out,
            "* Highlights\n\n\
             ** 1 Intro\n  systems are hard\n\n\
             \n\
             * Detailed comments\n\n\
             ** 1 Intro\n\n  check this\n\n"
        );
    }

    #[test]
    fn test_same_label_is_merged() {
        let annots = vec![
            resolved(AnnotationKind::Highlight, 2, None, Some("first"), None),
            resolved(AnnotationKind::Highlight, 2, None, Some("second"), None),
            resolved(AnnotationKind::Highlight, 3, None, Some("third"), None),
        ];
        let options = OrgOptions {
            sections: vec![Section::Highlights],
            ..Default::default()
        };
        let out = render_org(&annots, &options);
        assert_eq!(
            out,
            "* Highlights\n\n\
             ** 3\n  first\n\n  second\n\n\
             ** 4\n  third\n\n"
        );
    }

    #[test]
    fn test_comments_with_same_label_are_all_kept() {
        let annots = vec![
            resolved(AnnotationKind::Text, 0, None, None, Some("one")),
            resolved(AnnotationKind::Text, 0, None, None, Some("two")),
        ];
        let options = OrgOptions {
            sections: vec![Section::Comments],
            ..Default::default()
        };
        let out = render_org(&annots, &options);
        assert!(out.contains("one"));
        assert!(out.contains("two"));
        assert_eq!(out.matches("** 1").count(), 1);
    }

    #[test]
    fn test_strikeout_nit_has_delete_drawer() {
        let annots = vec![resolved(AnnotationKind::StrikeOut, 0, None, Some("gone"), None)];
        let out = render_org(&annots, &OrgOptions::default());
        assert_eq!(
            out,
            "* Nits\n\n** 1\n:PROPERTIES:\n:Extra: delete\n:END:\n  gone\n\n"
        );
    }

    #[test]
    fn test_section_order_and_omission() {
        let annots = vec![
            resolved(AnnotationKind::Underline, 0, None, Some("u"), None),
            resolved(AnnotationKind::Highlight, 0, None, Some("h"), None),
        ];
        let options = OrgOptions {
            sections: vec![Section::Nits, Section::Comments, Section::Highlights],
            ..Default::default()
        };
        let out = render_org(&annots, &options);
        let nits = out.find("* Nits").unwrap();
        let highlights = out.find("* Highlights").unwrap();
        assert!(nits < highlights);
        assert!(!out.contains("* Detailed comments"));
    }

    #[test]
    fn test_ungrouped_output_names_kind() {
        let annots = vec![resolved(AnnotationKind::Text, 1, Some("Sec"), None, Some("note"))];
        let options = OrgOptions {
            group: false,
            ..Default::default()
        };
        let out = render_org(&annots, &options);
        assert_eq!(
            out,
            "** 2 Sec\n:PROPERTIES:\n:Extra: Text\n:END:\n\n  note\n"
        );
    }

    #[test]
    fn test_title_line() {
        let options = OrgOptions {
            title: Some("My Paper".to_string()),
            ..Default::default()
        };
        assert_eq!(render_org(&[], &options), "#+Title: My Paper\n\n");
    }

    #[test]
    fn test_multi_paragraph_text_and_comment() {
        let annots = vec![resolved(
            AnnotationKind::Highlight,
            0,
            None,
            Some("para one\n\npara two"),
            Some("c1\nc2"),
        )];
        let options = OrgOptions {
            sections: vec![Section::Comments],
            ..Default::default()
        };
        let out = render_org(&annots, &options);
        assert_eq!(
            out,
            "* Detailed comments\n\n** 1\n  para one\n\n  para two\n\n  c1\n\n  c2\n\n"
        );
    }

    #[test]
    fn test_wrapping_uses_distinct_indents() {
        let annots = vec![resolved(
            AnnotationKind::Highlight,
            0,
            None,
            Some("alpha beta gamma delta"),
            Some("one two three four"),
        )];
        let options = OrgOptions {
            wrap: Some(12),
            sections: vec![Section::Comments],
            ..Default::default()
        };
        let out = render_org(&annots, &options);
        assert_eq!(
            out,
            "* Detailed comments\n\n** 1\n  alpha beta\n  gamma\n  delta\n\n one two\n three four\n\n"
        );
    }

    #[test]
    fn test_fill_breaks_long_words() {
        assert_eq!(
            fill("a incomprehensibly b", "  ", Some(6)),
            "  a in\n  comp\n  rehe\n  nsib\n  ly b"
        );
        assert_eq!(fill("abcdefgh", " ", Some(5)), " abcd\n efgh");
        assert_eq!(fill("as is", "  ", None), "  as is");
    }
}
