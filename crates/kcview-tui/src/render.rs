//! Pure view/render functions.
//!
//! Functions here take `&ViewState`, draw to a ratatui `Frame`, and never
//! mutate state or return effects. `layout` is shared with the reducer so
//! mouse hit-testing sees the same button rectangles that were drawn.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::state::{Button, ViewState};

pub const HEADING: &str = "Keycloak Session Inspector";

const HEADING_HEIGHT: u16 = 2;
const BUTTON_ROW_HEIGHT: u16 = 3;
const MESSAGE_HEIGHT: u16 = 3;
const HELP_HEIGHT: u16 = 1;

/// Screen regions for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLayout {
    pub heading: Rect,
    pub buttons: [(Button, Rect); 4],
    pub message: Rect,
    /// Present only while the view is authenticated.
    pub token: Option<Rect>,
    pub help: Rect,
}

pub fn layout(area: Rect, authenticated: bool) -> ViewLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADING_HEIGHT),
            Constraint::Length(BUTTON_ROW_HEIGHT),
            Constraint::Length(MESSAGE_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(HELP_HEIGHT),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[1]);

    ViewLayout {
        heading: rows[0],
        buttons: [
            (Button::Public, columns[0]),
            (Button::Private, columns[1]),
            (Button::Admin, columns[2]),
            (Button::Logout, columns[3]),
        ],
        message: rows[2],
        token: authenticated.then_some(rows[3]),
        help: rows[4],
    }
}

/// Returns the button drawn at terminal cell (`column`, `row`).
pub fn button_at(area: Rect, authenticated: bool, column: u16, row: u16) -> Option<Button> {
    layout(area, authenticated)
        .buttons
        .into_iter()
        .find(|(_, rect)| {
            column >= rect.x
                && column < rect.x.saturating_add(rect.width)
                && row >= rect.y
                && row < rect.y.saturating_add(rect.height)
        })
        .map(|(button, _)| button)
}

pub fn render(state: &ViewState, frame: &mut Frame) {
    let regions = layout(frame.area(), state.authenticated);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            HEADING,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center),
        regions.heading,
    );

    for (button, rect) in regions.buttons {
        render_button(frame, button, button == state.focus, rect);
    }

    render_message(frame, &state.message, regions.message);

    if let Some(rect) = regions.token {
        render_token(frame, state.token.as_deref(), rect);
    }

    frame.render_widget(
        Paragraph::new("1-4 press  ←/→/Tab focus  Enter activate  q quit")
            .style(Style::default().fg(Color::DarkGray)),
        regions.help,
    );
}

fn render_button(frame: &mut Frame, button: Button, focused: bool, area: Rect) {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let label = format!("[{}] {}", button.hotkey(), button.label());
    let mut paragraph = Paragraph::new(label)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        );
    if focused {
        paragraph = paragraph.style(Style::default().add_modifier(Modifier::BOLD));
    }
    frame.render_widget(paragraph, area);
}

fn render_message(frame: &mut Frame, message: &str, area: Rect) {
    let line = Line::from(vec![
        Span::styled("Message:", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(message),
    ]);
    frame.render_widget(
        Paragraph::new(line)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_token(frame: &mut Frame, token: Option<&str>, area: Rect) {
    // Raw token, wrapped anywhere and never trimmed.
    frame.render_widget(
        Paragraph::new(token.unwrap_or_default())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled("Token:", Style::default().add_modifier(Modifier::BOLD))),
            ),
        area,
    );
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    fn draw(state: &ViewState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(state, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_renders_heading_buttons_and_message() {
        let mut state = ViewState::default();
        state.message = "Success: Hello PUBLIC".into();

        let screen = draw(&state, 120, 20);
        assert!(screen.contains(HEADING));
        for button in Button::ALL {
            assert!(screen.contains(button.label()), "missing {}", button.label());
        }
        assert!(screen.contains("Message: Success: Hello PUBLIC"));
    }

    #[test]
    fn test_token_box_hidden_when_unauthenticated() {
        let mut state = ViewState::default();
        state.token = Some("leftover-token".into());

        let screen = draw(&state, 120, 20);
        assert!(!screen.contains("Token:"));
        assert!(!screen.contains("leftover-token"));
    }

    #[test]
    fn test_token_box_shows_raw_token() {
        let mut state = ViewState::default();
        state.authenticated = true;
        state.token = Some("eyJhbGciOi.payload.sig".into());

        let screen = draw(&state, 120, 20);
        assert!(screen.contains("Token:"));
        assert!(screen.contains("eyJhbGciOi.payload.sig"));
    }

    #[test]
    fn test_authenticated_without_token_shows_empty_box() {
        let mut state = ViewState::default();
        state.authenticated = true;

        let screen = draw(&state, 120, 20);
        assert!(screen.contains("Token:"));
    }

    #[test]
    fn test_long_token_wraps_without_loss() {
        let mut state = ViewState::default();
        state.authenticated = true;
        let token = "a".repeat(150);
        state.token = Some(token.clone());

        let screen = draw(&state, 60, 20);
        let a_count = screen.chars().filter(|c| *c == 'a').count();
        // Heading and labels contain a few 'a's too.
        assert!(a_count >= token.len());
    }

    #[test]
    fn test_button_hit_testing_matches_layout() {
        let area = Rect::new(0, 0, 80, 24);
        let regions = layout(area, false);
        for (button, rect) in regions.buttons {
            assert_eq!(button_at(area, false, rect.x + 1, rect.y + 1), Some(button));
        }
        assert_eq!(button_at(area, false, 1, 0), None);
        assert_eq!(button_at(area, false, 1, 23), None);
    }

    #[test]
    fn test_layout_token_region_follows_authentication() {
        let area = Rect::new(0, 0, 80, 24);
        assert!(layout(area, false).token.is_none());
        assert!(layout(area, true).token.is_some());
    }
}
