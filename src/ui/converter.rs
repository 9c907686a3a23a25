// ============================================================================
// Convertisseur - Rendu de l'interface principale
// ============================================================================
// Dessine le formulaire de conversion selon l'état de la machine d'état
//
// CONCEPTS RATATUI :
// 1. Layout : header / contenu / footer
// 2. List + ListState : liste filtrée avec ligne surlignée
// 3. Clear : efface une zone avant d'y dessiner une popup
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ConverterState};
use crate::models::{AmountKind, BASE_CURRENCY};
use crate::ui::view::{amount_label, Focus, ViewState};

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Chaque état de la machine a son propre contenu
/// - Le compilateur garantit l'exhaustivité
pub fn render(frame: &mut Frame, app: &App, view: &ViewState) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);

    match app.state() {
        ConverterState::FetchingCurrencies => {
            render_message(frame, chunks[1], "Chargement de la liste des devises...", Color::Gray)
        }
        ConverterState::FetchingRates => {
            render_message(frame, chunks[1], "Chargement des taux de change...", Color::Gray)
        }
        ConverterState::LoadingError => render_error(frame, app, chunks[1]),
        ConverterState::Ready => render_form(frame, app, view, chunks[1]),
    }

    render_footer(frame, app, view, chunks[2]);

    if view.prompt_open {
        render_refresh_prompt(frame);
    }
}

fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Contenu
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" LazyFX ")
        .title_alignment(Alignment::Center);

    let mut spans = vec![Span::styled(
        format!("Taux de la Banque du Canada ({})", BASE_CURRENCY),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )];

    if app.new_rates_indicator() {
        // Indicateur passif : l'utilisateur a refusé le rechargement
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "● nouveaux taux disponibles",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// États de chargement
// ============================================================================

fn render_message(frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(color))),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_error(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Erreur ");

    let details = app.error_message().unwrap_or("erreur inconnue");
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Impossible de charger les taux de change.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(details.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "Vérifiez votre connexion puis relancez l'application.",
            Style::default().fg(Color::Gray),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Formulaire (état Ready)
// ============================================================================

fn focus_style(view: &ViewState, focus: Focus) -> Style {
    if view.focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn render_form(frame: &mut Frame, app: &App, view: &ViewState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Recherche de devise
            Constraint::Min(3),    // Liste filtrée
            Constraint::Length(3), // Montants
            Constraint::Length(3), // Date
            Constraint::Length(1), // Dernière conversion
        ])
        .split(area);

    render_selection_input(frame, app, view, chunks[0]);
    render_currency_list(frame, app, view, chunks[1]);
    render_amounts(frame, app, view, chunks[2]);
    render_date(frame, app, view, chunks[3]);
    render_last_conversion(frame, app, chunks[4]);
}

fn render_selection_input(frame: &mut Frame, app: &App, view: &ViewState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(view, Focus::Currency))
        .title(" Devise ");

    let mut spans = vec![Span::styled(
        app.selection_text().to_string(),
        Style::default().fg(Color::White),
    )];
    if view.focus == Focus::Currency {
        spans.push(Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_currency_list(frame: &mut Frame, app: &App, view: &ViewState, area: Rect) {
    let options = app.filtered_options();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(view, Focus::Currency))
        .title(format!(" {} devise(s) ", options.len()));

    if options.is_empty() {
        let paragraph = Paragraph::new(Span::styled(
            "Aucune devise ne correspond",
            Style::default().fg(Color::Gray),
        ))
        .block(block)
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let selected_code = app.selected_currency().map(|c| c.alpha_code.as_str());
    let items: Vec<ListItem> = options
        .iter()
        .map(|option| {
            let style = if Some(option.alpha_code.as_str()) == selected_code {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(format!(" {:<4} {}", option.alpha_code, option.full_name)).style(style)
        })
        .collect();

    // CONCEPT RATATUI : StatefulWidget
    // - ListState garde la ligne sélectionnée et gère le scroll
    let mut state = ListState::default();
    if view.focus == Focus::Currency {
        state.select(Some(view.list_cursor.min(options.len() - 1)));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_amounts(frame: &mut Frame, app: &App, view: &ViewState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let driving = app.direction().driving();
    for (kind, chunk) in [(AmountKind::Foreign, chunks[0]), (AmountKind::Base, chunks[1])] {
        let field = app.field(kind);
        let is_driving = kind == driving && field.is_enabled();

        let border = if is_driving {
            focus_style(view, Focus::Amount)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let value_style = if !field.is_valid() {
            Style::default().fg(Color::Red)
        } else if is_driving && view.select_on_type && view.focus == Focus::Amount {
            Style::default().fg(Color::White).add_modifier(Modifier::REVERSED)
        } else if is_driving {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::Gray)
        };

        let title = if is_driving {
            format!(" {} ✎ ", amount_label(app, kind))
        } else {
            format!(" {} ", amount_label(app, kind))
        };

        let block = Block::default().borders(Borders::ALL).border_style(border).title(title);
        let paragraph = Paragraph::new(Span::styled(field.text().to_string(), value_style))
            .block(block)
            .alignment(Alignment::Right);
        frame.render_widget(paragraph, chunk);
    }
}

fn render_date(frame: &mut Frame, app: &App, view: &ViewState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(view, Focus::Date))
        .title(" Date des taux ");

    let date = app
        .selected_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());

    let mut spans = vec![
        Span::styled("◀ ", Style::default().fg(Color::DarkGray)),
        Span::styled(date, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(" ▶", Style::default().fg(Color::DarkGray)),
    ];
    if let Some(window) = app.rate_window() {
        spans.push(Span::styled(
            format!("   ({} → {})", window.min_date, window.max_date),
            Style::default().fg(Color::Gray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_last_conversion(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.last_conversion() {
        Some(conversion) => Line::from(Span::styled(
            format!(" {}", conversion.summary()),
            Style::default().fg(Color::Green),
        )),
        None => Line::from(Span::styled(
            " Choisissez une devise et saisissez un montant",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

// ============================================================================
// Footer : Instructions
// ============================================================================

fn key_span(label: &str) -> Span<'static> {
    Span::styled(
        label.to_string(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )
}

fn render_footer(frame: &mut Frame, app: &App, view: &ViewState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Appuyez sur ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[Esc]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else if app.state() != ConverterState::Ready {
        Line::from(vec![key_span("[Esc]"), Span::raw(" Quit")])
    } else {
        let mut spans = vec![key_span("[Esc]"), Span::raw(" Quit  "), key_span("[Tab]"), Span::raw(" Zone  ")];
        match view.focus {
            Focus::Currency => spans.extend([
                key_span("[↑↓]"),
                Span::raw(" Naviguer  "),
                key_span("[Enter]"),
                Span::raw(" Choisir"),
            ]),
            Focus::Amount => spans.extend([
                key_span("[←]"),
                Span::raw(" Saisir en devise  "),
                key_span("[→]"),
                Span::raw(format!(" Saisir en {}", BASE_CURRENCY)),
            ]),
            Focus::Date => spans.extend([
                key_span("[←→]"),
                Span::raw(" Jour publié  "),
                key_span("[Home/End]"),
                Span::raw(" Premier / dernier"),
            ]),
        }
        Line::from(spans)
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Popup de rechargement
// ============================================================================

/// Rectangle centré de taille fixe (borné par la zone disponible)
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_refresh_prompt(frame: &mut Frame) {
    let area = centered_rect(52, 7, frame.size());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Nouveaux taux ")
        .title_alignment(Alignment::Center);

    let text = vec![
        Line::from(""),
        Line::from("De nouveaux taux de change sont publiés."),
        Line::from("Recharger maintenant ?"),
        Line::from(vec![
            Span::styled("[o]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" Oui   "),
            Span::styled("[n]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" Non"),
        ]),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);

    // Clear efface ce qui est dessous avant de dessiner la popup
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(52, 7, area);
        assert_eq!(rect, Rect::new(24, 16, 52, 7));
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(2, 1, 30, 5);
        let rect = centered_rect(52, 7, area);
        assert_eq!(rect, area);
    }
}
