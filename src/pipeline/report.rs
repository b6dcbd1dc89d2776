//! HTML report rendering.
//!
//! Output depends only on the input: the generation date is passed in and
//! sections and posts are rendered in the order given.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{BoardConfig, Post, State};

/// Marker shown for posts without attachments.
pub const NO_ATTACHMENTS: &str = "첨부파일 없음";

/// Marker shown for boards without posts.
pub const NO_POSTS: &str = "게시물 없음";

/// One board's block in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub board: String,
    pub posts: Vec<Post>,
}

/// Everything the renderer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportInput {
    pub title: String,
    pub generated_on: NaiveDate,
    pub sections: Vec<ReportSection>,
}

impl ReportInput {
    /// Report over posts collected in a run, one section per board.
    pub fn from_posts(
        title: impl Into<String>,
        generated_on: NaiveDate,
        sections: Vec<(String, Vec<Post>)>,
    ) -> Self {
        Self {
            title: title.into(),
            generated_on,
            sections: sections
                .into_iter()
                .map(|(board, posts)| ReportSection { board, posts })
                .collect(),
        }
    }

    /// Report over everything recorded in `state` for `boards`, in registry
    /// order. Posts are listed newest first, ties broken by descending id.
    pub fn from_state(
        title: impl Into<String>,
        generated_on: NaiveDate,
        state: &State,
        boards: &[BoardConfig],
    ) -> Self {
        let sections = boards
            .iter()
            .map(|board| {
                let mut records: Vec<_> = state
                    .posts(&board.name)
                    .map(|posts| posts.iter().collect())
                    .unwrap_or_default();
                records.sort_by(|(a_id, a), (b_id, b)| {
                    b.detected_at
                        .cmp(&a.detected_at)
                        .then_with(|| b_id.cmp(a_id))
                });

                ReportSection {
                    board: board.name.clone(),
                    posts: records
                        .into_iter()
                        .map(|(id, record)| record.to_post(id))
                        .collect(),
                }
            })
            .collect();

        Self {
            title: title.into(),
            generated_on,
            sections,
        }
    }

    pub fn post_count(&self) -> usize {
        self.sections.iter().map(|s| s.posts.len()).sum()
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the report as a standalone HTML document.
pub fn render_html(input: &ReportInput) -> String {
    let title = escape_html(&input.title);
    let date = input.generated_on.format("%Y-%m-%d");
    let mut html = String::new();

    // Writing to a String cannot fail.
    let _ = write!(
        html,
        "<!doctype html>\n\
         <html lang=\"ko\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title} ({date})</title>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <p>생성일: {date}</p>\n"
    );

    for section in &input.sections {
        let _ = writeln!(html, "<section>");
        let _ = writeln!(
            html,
            "<h2>{} ({})</h2>",
            escape_html(&section.board),
            section.posts.len()
        );

        if section.posts.is_empty() {
            let _ = writeln!(html, "<p>{NO_POSTS}</p>");
        }

        for post in &section.posts {
            render_post(&mut html, post);
        }

        let _ = writeln!(html, "</section>");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_post(html: &mut String, post: &Post) {
    let _ = writeln!(html, "<div class=\"post\">");
    let _ = writeln!(
        html,
        "  <h3><a href=\"{}\" target=\"_blank\">{}</a></h3>",
        escape_html(&post.detail_url),
        escape_html(&post.title)
    );

    if post.attachments.is_empty() {
        let _ = writeln!(html, "  <p class=\"no-attachments\">{NO_ATTACHMENTS}</p>");
    } else {
        let _ = writeln!(html, "  <ul>");
        for attachment in &post.attachments {
            let _ = writeln!(
                html,
                "    <li><a href=\"{}\">{}</a></li>",
                escape_html(&attachment.url),
                escape_html(&attachment.name)
            );
        }
        let _ = writeln!(html, "  </ul>");
    }

    let _ = writeln!(html, "</div>");
}
