//! Step Screen
//!
//! Text shown between steps: a status header, the slide with the current
//! snippet highlighted, and the key help. Lines end with `\r\n` because the
//! terminal is in raw mode.

use crossterm::style::Stylize;

use autopilot_core::StepView;

use crate::keys::HELP;

/// Header line with the cursor and every flag
pub fn header(view: &StepView<'_>) -> String {
    let state = view.state;
    format!(
        "[Slide {}/{}] [Snippet {}/{}] [simulate_type:{}] [verify_status:{}] \
         [switch_desktop:{}] [sync_slides:{}] [open_links:{}] [run_hidden:{}]",
        state.slide,
        view.slide_count(),
        state.snippet,
        view.slide.snippets.len(),
        state.simulate_type,
        state.verify_status,
        state.switch_desktop,
        state.sync_slides,
        state.open_links,
        state.run_hidden,
    )
}

/// A horizontal rule `width` columns wide
pub fn hrule(width: u16) -> String {
    "═".repeat(usize::from(width.max(1)))
}

/// Render the whole screen for `view`
pub fn render(view: &StepView<'_>, width: u16) -> String {
    let mut lines = vec![header(view), hrule(width)];

    let body = match view.snippet {
        Some(snippet) => {
            let (before, highlighted, after) = view.slide.split_around(snippet);
            format!("{before}{}{after}", highlighted.reverse())
        }
        None => view.slide.content.clone(),
    };
    lines.extend(body.lines().map(str::to_string));
    lines.push(hrule(width));

    if view.state.interactive {
        lines.extend(HELP.iter().map(|line| (*line).to_string()));
    }

    let mut screen = lines.join("\r\n");
    screen.push_str("\r\n");
    screen
}
