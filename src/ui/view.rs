// ============================================================================
// État de la vue
// ============================================================================
// Ce que la machine d'état ne connaît pas : zone active, curseur de liste,
// popup ouverte. Transforme les touches en Intent pour App.
//
// CONCEPTS RUST :
// 1. Séparation vue / modèle : App ne sait rien du clavier
// 2. Pattern matching avec guards sur les helpers d'événements
// ============================================================================

use tracing::debug;

use crate::app::{App, ConverterState, Effect, Intent, SelectionInput};
use crate::models::AmountKind;
use crate::ui::events::{
    get_char_from_event, is_amount_char_event, is_backspace_event, is_backtab_event,
    is_down_event, is_end_event, is_enter_event, is_escape_event, is_home_event, is_left_event,
    is_no_event, is_right_event, is_tab_event, is_up_event, is_yes_event, Event,
};

/// Zone du formulaire qui reçoit le clavier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Recherche / sélection de devise
    #[default]
    Currency,
    /// Champ de montant source
    Amount,
    /// Date des taux
    Date,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Currency => Focus::Amount,
            Focus::Amount => Focus::Date,
            Focus::Date => Focus::Currency,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Focus::Currency => Focus::Date,
            Focus::Amount => Focus::Currency,
            Focus::Date => Focus::Amount,
        }
    }
}

/// État propre à l'affichage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub focus: Focus,

    /// Ligne surlignée dans la liste filtrée des devises
    pub list_cursor: usize,

    /// Texte du champ source "sélectionné" : la prochaine frappe le remplace
    pub select_on_type: bool,

    /// Popup "recharger les taux ?" affichée
    pub prompt_open: bool,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applique un effet qui concerne la vue
    pub fn apply_effect(&mut self, effect: &Effect) {
        match effect {
            Effect::Focus { select_text, .. } => {
                self.focus = Focus::Amount;
                self.select_on_type = *select_text;
            }
            Effect::PromptRefresh => self.prompt_open = true,
            Effect::FetchCurrencies { .. } => {
                // Nouveau cycle : la vue repart de zéro (popup comprise)
                *self = Self::default();
            }
            Effect::FetchRates { .. } => {}
        }
    }

    /// Traduit une touche en intents pour App
    ///
    /// Esc n'est pas traité ici (quit two-step dans la boucle principale),
    /// sauf quand la popup est ouverte où il vaut "non".
    pub fn handle_key(&mut self, app: &App, event: &Event) -> Vec<Intent> {
        if self.prompt_open {
            return self.handle_prompt_key(event);
        }
        if app.state() != ConverterState::Ready {
            return Vec::new();
        }

        if is_tab_event(event) {
            self.focus = self.focus.next();
            self.select_on_type = false;
            return Vec::new();
        }
        if is_backtab_event(event) {
            self.focus = self.focus.previous();
            self.select_on_type = false;
            return Vec::new();
        }

        match self.focus {
            Focus::Currency => self.handle_currency_key(app, event),
            Focus::Amount => self.handle_amount_key(app, event),
            Focus::Date => self.handle_date_key(app, event),
        }
    }

    fn handle_prompt_key(&mut self, event: &Event) -> Vec<Intent> {
        let answer = if is_yes_event(event) || is_enter_event(event) {
            true
        } else if is_no_event(event) || is_escape_event(event) {
            false
        } else {
            return Vec::new();
        };

        debug!(answer, "Refresh prompt answered");
        self.prompt_open = false;
        vec![Intent::PromptAnswered(answer)]
    }

    fn handle_currency_key(&mut self, app: &App, event: &Event) -> Vec<Intent> {
        // Une devise sélectionnée s'affiche en entier : toute frappe repart de zéro
        let current = if app.selected_currency().is_some() {
            String::new()
        } else {
            app.selection_text().to_string()
        };

        if is_up_event(event) {
            self.list_cursor = self.list_cursor.saturating_sub(1);
            return Vec::new();
        }
        if is_down_event(event) {
            let max_index = app.filtered_options().len().saturating_sub(1);
            self.list_cursor = (self.list_cursor + 1).min(max_index);
            return Vec::new();
        }
        if is_enter_event(event) {
            let Some(option) = app.filtered_options().get(self.list_cursor).map(|o| (*o).clone())
            else {
                return Vec::new();
            };
            self.focus = Focus::Amount;
            self.select_on_type = true;
            return vec![Intent::SelectionChanged(SelectionInput::Currency(option))];
        }

        let text = if is_backspace_event(event) {
            let mut text = current;
            text.pop();
            text
        } else if let Some(c) = get_char_from_event(event) {
            format!("{}{}", current, c)
        } else {
            return Vec::new();
        };

        self.list_cursor = 0;
        vec![Intent::SelectionChanged(SelectionInput::Text(text))]
    }

    fn handle_amount_key(&mut self, app: &App, event: &Event) -> Vec<Intent> {
        if app.selected_currency().is_none() {
            return Vec::new();
        }
        if is_left_event(event) {
            return vec![Intent::SwitchToForeign];
        }
        if is_right_event(event) {
            return vec![Intent::SwitchToBase];
        }

        let field = app.direction().driving();
        let current = if self.select_on_type {
            String::new()
        } else {
            app.field(field).text().to_string()
        };

        let text = if is_backspace_event(event) {
            let mut text = current;
            text.pop();
            text
        } else if is_amount_char_event(event) {
            match get_char_from_event(event) {
                Some(c) => format!("{}{}", current, c),
                None => return Vec::new(),
            }
        } else {
            return Vec::new();
        };

        self.select_on_type = false;
        vec![Intent::AmountEdited { field, text }]
    }

    fn handle_date_key(&mut self, app: &App, event: &Event) -> Vec<Intent> {
        let date = if is_left_event(event) || is_down_event(event) {
            app.adjacent_date(false)
        } else if is_right_event(event) || is_up_event(event) {
            app.adjacent_date(true)
        } else if is_home_event(event) {
            app.rate_window().map(|w| w.min_date)
        } else if is_end_event(event) {
            app.rate_window().map(|w| w.max_date)
        } else {
            None
        };

        date.map(Intent::DateChanged).into_iter().collect()
    }
}

/// Libellé d'un champ de montant
pub fn amount_label(app: &App, kind: AmountKind) -> String {
    match kind {
        AmountKind::Foreign => app
            .selected_currency()
            .map(|c| c.alpha_code.clone())
            .unwrap_or_else(|| "---".to_string()),
        AmountKind::Base => crate::models::BASE_CURRENCY.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::time::Duration;

    use chrono::{NaiveDate, TimeZone, Utc};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use rust_decimal_macros::dec;

    use crate::freshness::{ManualClock, DOMESTIC_TZ};
    use crate::models::{CurrencyOption, Observation, RateTable};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    fn ready_app() -> App {
        let now = DOMESTIC_TZ
            .with_ymd_and_hms(2024, 3, 4, 10, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let mut app = App::with_metadata(
            Rc::new(ManualClock::new(now)),
            Duration::from_secs(60),
            false,
            vec![
                CurrencyOption::new("EUR", "European euro"),
                CurrencyOption::new("USD", "US dollar"),
            ],
        );
        app.reset();
        let cycle = app.cycle();
        app.handle(Intent::CurrenciesLoaded {
            cycle,
            result: Ok(["EUR", "USD"].iter().map(|s| s.to_string()).collect()),
        });
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        app.handle(Intent::RatesLoaded {
            cycle,
            result: Ok(RateTable::new(vec![
                Observation::new(day(1)).with_rate("EUR", dec!(1.47)).with_rate("USD", dec!(1.35)),
                Observation::new(day(4)).with_rate("EUR", dec!(1.48)).with_rate("USD", dec!(1.36)),
            ])),
        });
        app
    }

    /// Envoie une touche et applique les intents/effets comme la boucle principale
    fn press(view: &mut ViewState, app: &mut App, code: KeyCode) {
        for intent in view.handle_key(app, &key(code)) {
            for effect in app.handle(intent) {
                view.apply_effect(&effect);
            }
        }
    }

    #[test]
    fn test_focus_cycle() {
        assert_eq!(Focus::Currency.next(), Focus::Amount);
        assert_eq!(Focus::Date.next(), Focus::Currency);
        assert_eq!(Focus::Currency.previous(), Focus::Date);
    }

    #[test]
    fn test_search_select_and_type() {
        let mut app = ready_app();
        let mut view = ViewState::new();

        press(&mut view, &mut app, KeyCode::Char('u'));
        press(&mut view, &mut app, KeyCode::Char('s'));
        assert_eq!(app.selection_text(), "us");
        assert_eq!(app.filtered_options().len(), 1);

        press(&mut view, &mut app, KeyCode::Enter);
        assert_eq!(app.selected_currency().unwrap().alpha_code, "USD");
        assert_eq!(view.focus, Focus::Amount);

        press(&mut view, &mut app, KeyCode::Char('1'));
        press(&mut view, &mut app, KeyCode::Char('0'));
        assert_eq!(app.field(AmountKind::Foreign).text(), "10");
        assert_eq!(app.field(AmountKind::Base).text(), "13.6000");
    }

    #[test]
    fn test_switch_direction_highlights_then_replaces() {
        let mut app = ready_app();
        let mut view = ViewState::new();
        press(&mut view, &mut app, KeyCode::Enter);
        press(&mut view, &mut app, KeyCode::Char('5'));

        press(&mut view, &mut app, KeyCode::Right);
        assert!(view.select_on_type);
        press(&mut view, &mut app, KeyCode::Char('2'));
        assert_eq!(app.field(AmountKind::Base).text(), "2");
        assert!(!view.select_on_type);
    }

    #[test]
    fn test_date_keys() {
        let mut app = ready_app();
        let mut view = ViewState::new();
        view.focus = Focus::Date;

        press(&mut view, &mut app, KeyCode::Left);
        assert_eq!(app.selected_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
        press(&mut view, &mut app, KeyCode::End);
        assert_eq!(app.selected_date(), NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[test]
    fn test_prompt_keys() {
        let mut app = ready_app();
        let mut view = ViewState::new();
        view.apply_effect(&Effect::PromptRefresh);
        assert!(view.prompt_open);

        assert!(view.handle_key(&app, &key(KeyCode::Char('x'))).is_empty());
        let intents = view.handle_key(&app, &key(KeyCode::Char('n')));
        assert!(matches!(intents.as_slice(), [Intent::PromptAnswered(false)]));
        assert!(!view.prompt_open);

        // Touches de formulaire de nouveau actives
        press(&mut view, &mut app, KeyCode::Char('e'));
        assert_eq!(app.selection_text(), "e");
    }

    #[test]
    fn test_new_cycle_resets_view() {
        let mut view = ViewState {
            focus: Focus::Date,
            list_cursor: 3,
            select_on_type: true,
            prompt_open: true,
        };
        view.apply_effect(&Effect::FetchCurrencies { cycle: 2 });
        assert_eq!(view, ViewState::default());
    }
}
