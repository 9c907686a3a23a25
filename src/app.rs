// ============================================================================
// Structure : App
// ============================================================================
// Machine d'état du convertisseur : chargement, synchronisation des deux
// montants, sélection de devise/date et rechargement des taux
//
// CONCEPTS RUST :
// 1. State Machine : ConverterState, un seul état actif à la fois
// 2. Intents -> Effects : handle() modifie l'état et RETOURNE les effets
//    (fetchs, prompt, focus) au lieu de les exécuter lui-même
// 3. Session : tout l'état d'un cycle de chargement vit dans une structure
//    remplacée d'un bloc à chaque réinitialisation
//
// PATTERN : Cette structure suit le pattern "Application State"
// - L'UI lit depuis App
// - Toutes les modifications passent par App::handle()
// ============================================================================

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::engine::{ConversionEngine, LastConversion};
use crate::freshness::{domestic_today, Clock, FreshnessScheduler, TickOutcome};
use crate::models::currency::{filter_options, intersect_available, known_currencies};
use crate::models::rate_table::filter_fully_covered;
use crate::models::{AmountField, AmountKind, CurrencyOption, RateTable, RateWindow, BASE_CURRENCY};

// ============================================================================
// Enums : états, direction, intents, effets
// ============================================================================

/// États du convertisseur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterState {
    /// Chargement de la liste des devises disponibles
    FetchingCurrencies,
    /// Chargement de la table des taux
    FetchingRates,
    /// Prêt à convertir
    Ready,
    /// Échec de chargement (terminal jusqu'à un redémarrage)
    LoadingError,
}

impl ConverterState {
    /// Nom exposé à la vue
    pub fn name(&self) -> &'static str {
        match self {
            ConverterState::FetchingCurrencies => "FetchingCurrencies",
            ConverterState::FetchingRates => "FetchingRates",
            ConverterState::Ready => "Ready",
            ConverterState::LoadingError => "LoadingError",
        }
    }
}

/// Sens de conversion : détermine le champ "source de vérité"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionDirection {
    /// Devise étrangère -> CAD (le champ étranger pilote)
    #[default]
    ToBase,
    /// CAD -> devise étrangère (le champ CAD pilote)
    FromBase,
}

impl ConversionDirection {
    /// Champ qui pilote la conversion
    pub fn driving(self) -> AmountKind {
        match self {
            ConversionDirection::ToBase => AmountKind::Foreign,
            ConversionDirection::FromBase => AmountKind::Base,
        }
    }
}

/// Valeur du champ de sélection de devise
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionInput {
    /// Saisie libre (recherche en cours, pas une sélection)
    Text(String),
    /// Devise choisie dans la liste
    Currency(CurrencyOption),
}

/// Échec d'un chargement (réseau, HTTP, payload invalide : pas de distinction)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub message: String,
}

impl FetchFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<anyhow::Error> for FetchFailure {
    fn from(err: anyhow::Error) -> Self {
        // {:#} : inclut la chaîne de contexte anyhow
        Self::new(format!("{:#}", err))
    }
}

/// Événements traités par la machine d'état
#[derive(Debug, Clone)]
pub enum Intent {
    /// Fin du chargement des codes de devises
    CurrenciesLoaded {
        cycle: u64,
        result: Result<BTreeSet<String>, FetchFailure>,
    },
    /// Fin du chargement des observations
    RatesLoaded {
        cycle: u64,
        result: Result<RateTable, FetchFailure>,
    },
    /// Le champ de sélection de devise a changé
    SelectionChanged(SelectionInput),
    /// L'utilisateur a modifié un montant
    AmountEdited { field: AmountKind, text: String },
    /// Le champ CAD devient la source
    SwitchToBase,
    /// Le champ étranger devient la source
    SwitchToForeign,
    /// Nouvelle date de taux
    DateChanged(NaiveDate),
    /// Réponse à la question "recharger les taux ?"
    PromptAnswered(bool),
    /// Tick régulier de la boucle
    Tick,
}

/// Effets à exécuter par l'appelant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Lancer le chargement des devises pour ce cycle
    FetchCurrencies { cycle: u64 },
    /// Lancer le chargement des taux pour ce cycle
    FetchRates { cycle: u64 },
    /// Afficher la question oui/non de rechargement
    PromptRefresh,
    /// Donner le focus à un champ (et sélectionner son texte si demandé)
    Focus { field: AmountKind, select_text: bool },
}

// ============================================================================
// Réacteurs de champs
// ============================================================================

/// Réaction associée à un champ du formulaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reactor {
    Selection,
    ForeignAmount,
    BaseAmount,
    Date,
}

impl Reactor {
    fn for_amount(kind: AmountKind) -> Self {
        match kind {
            AmountKind::Foreign => Reactor::ForeignAmount,
            AmountKind::Base => Reactor::BaseAmount,
        }
    }
}

/// Ensemble des réacteurs d'un cycle
///
/// Possédé par la Session : il disparaît avec elle à la réinitialisation.
#[derive(Debug, Default)]
struct Reactors {
    active: HashSet<Reactor>,
    runs: u64,
}

impl Reactors {
    fn install_all(&mut self) {
        self.active = [
            Reactor::Selection,
            Reactor::ForeignAmount,
            Reactor::BaseAmount,
            Reactor::Date,
        ]
        .into_iter()
        .collect();
    }

    /// Vrai (et compte l'exécution) si le réacteur est installé
    fn fire(&mut self, reactor: Reactor) -> bool {
        if self.active.contains(&reactor) {
            self.runs += 1;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Session : état d'un cycle de chargement
// ============================================================================

#[derive(Debug)]
struct Session {
    cycle: u64,
    options: Vec<CurrencyOption>,
    selection_text: String,
    selected: Option<CurrencyOption>,
    direction: ConversionDirection,
    foreign: AmountField,
    base: AmountField,
    last_conversion: Option<LastConversion>,
    table: RateTable,
    window: Option<RateWindow>,
    selected_date: Option<NaiveDate>,
    reactors: Reactors,
}

impl Session {
    fn new(cycle: u64, options: Vec<CurrencyOption>) -> Self {
        Self {
            cycle,
            options,
            selection_text: String::new(),
            selected: None,
            direction: ConversionDirection::default(),
            foreign: AmountField::new(),
            base: AmountField::new(),
            last_conversion: None,
            table: RateTable::default(),
            window: None,
            selected_date: None,
            reactors: Reactors::default(),
        }
    }

    fn field_mut(&mut self, kind: AmountKind) -> &mut AmountField {
        match kind {
            AmountKind::Foreign => &mut self.foreign,
            AmountKind::Base => &mut self.base,
        }
    }

    /// Active le champ source, désactive l'autre
    fn apply_direction(&mut self) {
        let driving = self.direction.driving();
        self.field_mut(driving).enable();
        self.field_mut(driving.other()).disable();
    }

    /// Aucune devise : les deux champs désactivés et vides
    fn clear_selection(&mut self) {
        self.selected = None;
        self.last_conversion = None;
        for field in [&mut self.foreign, &mut self.base] {
            field.clear_silently();
            field.disable();
        }
    }

    /// Recalcule le champ dérivé à partir du champ source
    ///
    /// L'écriture du champ dérivé est silencieuse : elle ne repasse jamais
    /// par un réacteur.
    fn sync_from_driving(&mut self) {
        let Some(selected) = self.selected.as_ref() else {
            return;
        };
        let driving = self.direction.driving();
        let (from, to) = match driving {
            AmountKind::Foreign => (selected.alpha_code.clone(), BASE_CURRENCY.to_string()),
            AmountKind::Base => (BASE_CURRENCY.to_string(), selected.alpha_code.clone()),
        };

        let amount = match driving {
            AmountKind::Foreign => self.foreign.value(),
            AmountKind::Base => self.base.value(),
        };
        let (Some(amount), Some(date)) = (amount, self.selected_date) else {
            self.field_mut(driving.other()).clear_silently();
            self.last_conversion = None;
            return;
        };

        let engine = ConversionEngine::new(&self.table);
        let quote = engine.rate(&from, &to, date);
        let converted = engine.convert(amount, &from, &to, date);

        match (quote, converted) {
            (Some(quote), Some(converted)) => {
                if quote.rate_date != converted.rate_date {
                    warn!(%from, %to, rate_date = %quote.rate_date, convert_date = %converted.rate_date, "Rate and conversion disagree on date");
                }
                debug!(%from, %to, %amount, result = %converted.amount, rate_date = %converted.rate_date, "Converted amount");
                self.field_mut(driving.other()).write_silently(converted.amount);
                self.last_conversion = Some(LastConversion {
                    from_code: from,
                    to_code: to,
                    rate: quote.rate,
                    rate_date: quote.rate_date,
                });
            }
            _ => {
                warn!(%from, %to, %date, "No rate available for conversion");
                self.field_mut(driving.other()).clear_silently();
                self.last_conversion = None;
            }
        }
    }
}

// ============================================================================
// App
// ============================================================================

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Two-step quit : première pression de Esc = demande de confirmation
    pub confirm_quit: bool,

    state: ConverterState,
    error_message: Option<String>,

    /// Métadonnées statiques, copiées dans chaque nouvelle session
    metadata: Vec<CurrencyOption>,
    session: Session,
    cycles_started: u64,

    clock: Rc<dyn Clock>,
    freshness: FreshnessScheduler,
    new_rates_indicator: bool,
}

impl App {
    /// Crée l'application avec les métadonnées de devises intégrées
    ///
    /// Aucun chargement n'est lancé : l'appelant doit appeler `reset()` et
    /// exécuter les effets retournés. Avant cela, tout intent de chargement
    /// est ignoré.
    pub fn new(clock: Rc<dyn Clock>, refresh_interval: Duration, force_refresh_prompt: bool) -> Self {
        Self::with_metadata(clock, refresh_interval, force_refresh_prompt, known_currencies())
    }

    /// Crée l'application avec des métadonnées fournies (voir `new`)
    pub fn with_metadata(
        clock: Rc<dyn Clock>,
        refresh_interval: Duration,
        force_refresh_prompt: bool,
        metadata: Vec<CurrencyOption>,
    ) -> Self {
        let freshness = FreshnessScheduler::new(clock.clone(), refresh_interval, force_refresh_prompt);
        Self {
            running: true,
            confirm_quit: false,
            state: ConverterState::FetchingCurrencies,
            error_message: None,
            session: Session::new(0, metadata.clone()),
            metadata,
            cycles_started: 0,
            clock,
            freshness,
            new_rates_indicator: false,
        }
    }

    /// Démarre (ou redémarre) le cycle complet de chargement
    ///
    /// Point d'entrée de réinitialisation : appelable plusieurs fois, ne
    /// suppose rien sur l'état précédent. Timer et réacteurs de l'ancien
    /// cycle sont libérés avant la création du nouveau.
    pub fn reset(&mut self) -> Vec<Effect> {
        self.freshness.disarm();
        self.cycles_started += 1;
        let cycle = self.cycles_started;

        // L'ancienne session (et ses réacteurs) est droppée ici
        self.session = Session::new(cycle, self.metadata.clone());
        self.state = ConverterState::FetchingCurrencies;
        self.error_message = None;
        self.new_rates_indicator = false;

        info!(cycle, state = self.state.name(), "Initialization cycle started");
        vec![Effect::FetchCurrencies { cycle }]
    }

    /// Traite un intent et retourne les effets à exécuter
    pub fn handle(&mut self, intent: Intent) -> Vec<Effect> {
        match intent {
            Intent::CurrenciesLoaded { cycle, result } => self.on_currencies_loaded(cycle, result),
            Intent::RatesLoaded { cycle, result } => self.on_rates_loaded(cycle, result),
            Intent::SelectionChanged(input) => self.on_selection_changed(input),
            Intent::AmountEdited { field, text } => self.on_amount_edited(field, &text),
            Intent::SwitchToBase => self.switch_direction(ConversionDirection::FromBase),
            Intent::SwitchToForeign => self.switch_direction(ConversionDirection::ToBase),
            Intent::DateChanged(date) => self.on_date_changed(date),
            Intent::PromptAnswered(accepted) => self.on_prompt_answered(accepted),
            Intent::Tick => self.tick(),
        }
    }

    // ------------------------------------------------------------------------
    // Chargement
    // ------------------------------------------------------------------------

    fn is_current(&self, cycle: u64, expected: ConverterState) -> bool {
        // Les cycles commencent à 1 : avant le premier reset(), rien n'est attendu
        if self.cycles_started == 0 || cycle != self.session.cycle || self.state != expected {
            warn!(
                cycle,
                current_cycle = self.session.cycle,
                state = self.state.name(),
                "Ignoring stale fetch completion"
            );
            return false;
        }
        true
    }

    fn on_currencies_loaded(
        &mut self,
        cycle: u64,
        result: Result<BTreeSet<String>, FetchFailure>,
    ) -> Vec<Effect> {
        if !self.is_current(cycle, ConverterState::FetchingCurrencies) {
            return Vec::new();
        }

        match result {
            Ok(codes) => {
                let options = std::mem::take(&mut self.session.options);
                let before = options.len();
                self.session.options = intersect_available(options, &codes);
                info!(
                    available = codes.len(),
                    kept = self.session.options.len(),
                    dropped = before - self.session.options.len(),
                    "Currencies loaded"
                );

                self.state = ConverterState::FetchingRates;
                vec![Effect::FetchRates { cycle }]
            }
            Err(failure) => {
                self.fail(failure);
                Vec::new()
            }
        }
    }

    fn on_rates_loaded(&mut self, cycle: u64, result: Result<RateTable, FetchFailure>) -> Vec<Effect> {
        if !self.is_current(cycle, ConverterState::FetchingRates) {
            return Vec::new();
        }

        let table = match result {
            Ok(table) => table,
            Err(failure) => {
                self.fail(failure);
                return Vec::new();
            }
        };

        let now = self.clock.now();
        let window = RateWindow::compute(&table, domestic_today(now));

        let options = std::mem::take(&mut self.session.options);
        let before = options.len();
        self.session.options = filter_fully_covered(options, &table);
        if self.session.options.len() < before {
            warn!(
                dropped = before - self.session.options.len(),
                "Currencies without a rate on every date were excluded"
            );
        }

        info!(
            observations = table.len(),
            min_date = %window.min_date,
            max_date = %window.max_date,
            currencies = self.session.options.len(),
            "Rates loaded"
        );

        self.session.selected_date = Some(window.max_date);
        self.session.window = Some(window);
        self.session.table = table;
        self.session.clear_selection();
        self.session.reactors.install_all();

        self.state = ConverterState::Ready;
        self.freshness.arm(now);
        Vec::new()
    }

    fn fail(&mut self, failure: FetchFailure) {
        error!(state = self.state.name(), error = %failure, "Loading failed");
        self.freshness.disarm();
        self.state = ConverterState::LoadingError;
        self.error_message = Some(failure.message);
    }

    // ------------------------------------------------------------------------
    // Réactions aux champs
    // ------------------------------------------------------------------------

    fn on_selection_changed(&mut self, input: SelectionInput) -> Vec<Effect> {
        if !self.session.reactors.fire(Reactor::Selection) {
            debug!(state = self.state.name(), "Selection change ignored (no reactor)");
            return Vec::new();
        }

        match input {
            SelectionInput::Currency(option) if self.session.options.contains(&option) => {
                info!(currency = %option.alpha_code, "Currency selected");
                self.session.selection_text = option.to_string();
                self.session.selected = Some(option);
                self.session.apply_direction();
                self.session.sync_from_driving();
            }
            SelectionInput::Currency(option) => {
                warn!(currency = %option.alpha_code, "Selected currency is not offered");
                self.session.selection_text = option.to_string();
                self.session.clear_selection();
            }
            SelectionInput::Text(text) => {
                self.session.selection_text = text;
                if self.session.selected.is_some() {
                    debug!("Selection cleared by free text");
                }
                self.session.clear_selection();
            }
        }
        Vec::new()
    }

    fn on_amount_edited(&mut self, kind: AmountKind, text: &str) -> Vec<Effect> {
        if !self.session.reactors.fire(Reactor::for_amount(kind)) {
            debug!(state = self.state.name(), "Amount edit ignored (no reactor)");
            return Vec::new();
        }

        let field = self.session.field_mut(kind);
        if !field.is_enabled() {
            debug!(?kind, "Edit on disabled amount field ignored");
            return Vec::new();
        }
        if !field.set_text(text) {
            return Vec::new();
        }

        if kind == self.session.direction.driving() {
            self.session.sync_from_driving();
        }
        Vec::new()
    }

    fn switch_direction(&mut self, direction: ConversionDirection) -> Vec<Effect> {
        if self.session.selected.is_none() {
            return Vec::new();
        }

        let changed = self.session.direction != direction;
        self.session.direction = direction;
        self.session.apply_direction();
        debug!(?direction, changed, "Conversion direction set");

        vec![Effect::Focus {
            field: direction.driving(),
            select_text: changed,
        }]
    }

    fn on_date_changed(&mut self, date: NaiveDate) -> Vec<Effect> {
        if !self.session.reactors.fire(Reactor::Date) {
            debug!(state = self.state.name(), "Date change ignored (no reactor)");
            return Vec::new();
        }
        if !self.session.window.as_ref().is_some_and(|w| w.contains(date)) {
            warn!(%date, "Date outside of the rate window ignored");
            return Vec::new();
        }

        self.session.selected_date = Some(date);
        if self.session.selected.is_some() {
            self.session.sync_from_driving();
        }
        Vec::new()
    }

    // ------------------------------------------------------------------------
    // Fraîcheur des taux
    // ------------------------------------------------------------------------

    /// Tick : appelé à chaque itération de la boucle
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.state != ConverterState::Ready {
            return Vec::new();
        }
        match self.freshness.on_tick() {
            TickOutcome::Prompt => vec![Effect::PromptRefresh],
            TickOutcome::Indicator => {
                self.new_rates_indicator = true;
                Vec::new()
            }
            TickOutcome::Idle => Vec::new(),
        }
    }

    fn on_prompt_answered(&mut self, accepted: bool) -> Vec<Effect> {
        if !self.freshness.prompt_pending() {
            debug!(accepted, "Prompt answer without pending prompt ignored");
            return Vec::new();
        }
        if self.freshness.answer(accepted) {
            self.reset()
        } else {
            self.new_rates_indicator = self.freshness.indicator_visible();
            Vec::new()
        }
    }

    // ------------------------------------------------------------------------
    // Accès en lecture pour la vue
    // ------------------------------------------------------------------------

    pub fn state(&self) -> ConverterState {
        self.state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn cycle(&self) -> u64 {
        self.session.cycle
    }

    pub fn options(&self) -> &[CurrencyOption] {
        &self.session.options
    }

    /// Texte courant du champ de sélection
    pub fn selection_text(&self) -> &str {
        &self.session.selection_text
    }

    /// Options correspondant au texte du champ de sélection
    pub fn filtered_options(&self) -> Vec<&CurrencyOption> {
        if self.session.selected.is_some() {
            return self.session.options.iter().collect();
        }
        filter_options(&self.session.options, &self.session.selection_text)
    }

    pub fn selected_currency(&self) -> Option<&CurrencyOption> {
        self.session.selected.as_ref()
    }

    pub fn direction(&self) -> ConversionDirection {
        self.session.direction
    }

    pub fn field(&self, kind: AmountKind) -> &AmountField {
        match kind {
            AmountKind::Foreign => &self.session.foreign,
            AmountKind::Base => &self.session.base,
        }
    }

    pub fn last_conversion(&self) -> Option<&LastConversion> {
        self.session.last_conversion.as_ref()
    }

    pub fn rate_window(&self) -> Option<&RateWindow> {
        self.session.window.as_ref()
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.session.selected_date
    }

    /// Date publiée voisine de la date sélectionnée
    pub fn adjacent_date(&self, forward: bool) -> Option<NaiveDate> {
        let window = self.session.window.as_ref()?;
        let current = self.session.selected_date?;
        if forward {
            window.next_valid(current)
        } else {
            window.previous_valid(current)
        }
    }

    pub fn freshness(&self) -> &FreshnessScheduler {
        &self.freshness
    }

    pub fn new_rates_indicator(&self) -> bool {
        self.new_rates_indicator
    }

    /// Nombre de réactions exécutées pendant le cycle courant
    pub fn reactor_runs(&self) -> u64 {
        self.session.reactors.runs
    }

    // ------------------------------------------------------------------------
    // Quit (two-step)
    // ------------------------------------------------------------------------

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::{ManualClock, DOMESTIC_TZ};
    use crate::models::Observation;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn toronto(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        DOMESTIC_TZ
            .with_ymd_and_hms(2024, 3, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn usd() -> CurrencyOption {
        CurrencyOption::new("USD", "US dollar")
    }

    fn table() -> RateTable {
        RateTable::new(vec![
            Observation::new(day(1))
                .with_rate("USD", dec!(1.3500))
                .with_rate("EUR", dec!(1.4700))
                .with_rate("JPY", dec!(0.0091)),
            // JPY manque le 4 : exclue
            Observation::new(day(4))
                .with_rate("USD", dec!(1.3600))
                .with_rate("EUR", dec!(1.4800)),
        ])
    }

    fn codes(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// App prête (Ready) le lundi 4 mars à 10h, heure de Toronto
    fn ready_app(clock: &ManualClock, force: bool) -> App {
        let mut app = App::with_metadata(
            Rc::new(clock.clone()),
            Duration::from_secs(60),
            force,
            vec![
                usd(),
                CurrencyOption::new("EUR", "European euro"),
                CurrencyOption::new("JPY", "Japanese yen"),
            ],
        );
        let effects = app.reset();
        let cycle = app.cycle();
        assert_eq!(effects, vec![Effect::FetchCurrencies { cycle }]);

        let effects = app.handle(Intent::CurrenciesLoaded {
            cycle,
            result: Ok(codes(&["USD", "EUR", "JPY", "GBP"])),
        });
        assert_eq!(effects, vec![Effect::FetchRates { cycle }]);

        app.handle(Intent::RatesLoaded {
            cycle,
            result: Ok(table()),
        });
        assert_eq!(app.state(), ConverterState::Ready);
        app
    }

    fn type_amount(app: &mut App, field: AmountKind, text: &str) {
        app.handle(Intent::AmountEdited {
            field,
            text: text.to_string(),
        });
    }

    fn enabled_count(app: &App) -> usize {
        [AmountKind::Foreign, AmountKind::Base]
            .iter()
            .filter(|k| app.field(**k).is_enabled())
            .count()
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ConverterState::FetchingCurrencies.name(), "FetchingCurrencies");
        assert_eq!(ConverterState::LoadingError.name(), "LoadingError");
    }

    #[test]
    fn test_nothing_happens_before_first_reset() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = App::with_metadata(Rc::new(clock), Duration::from_secs(60), false, vec![usd()]);
        assert_eq!(app.cycle(), 0);

        // Un chargement étiqueté 0 n'est pas accepté sans reset()
        let effects = app.handle(Intent::CurrenciesLoaded {
            cycle: 0,
            result: Ok(codes(&["USD"])),
        });
        assert!(effects.is_empty());
        assert_eq!(app.state(), ConverterState::FetchingCurrencies);
        assert!(app.handle(Intent::Tick).is_empty());

        assert_eq!(app.reset(), vec![Effect::FetchCurrencies { cycle: 1 }]);
    }

    #[test]
    fn test_load_sequence_filters_currencies() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let app = ready_app(&clock, false);

        // JPY est exclue (couverture partielle)
        let codes: Vec<_> = app.options().iter().map(|o| o.alpha_code.as_str()).collect();
        assert_eq!(codes, vec!["USD", "EUR"]);

        let window = app.rate_window().unwrap();
        assert_eq!(window.min_date, day(1));
        assert_eq!(window.max_date, day(4));
        assert_eq!(app.selected_date(), Some(day(4)));
        assert_eq!(app.freshness().state().last_fetch_instant, Some(toronto(4, 10, 0)));
        assert!(app.freshness().is_armed());
    }

    #[test]
    fn test_fetch_failure_is_terminal() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = App::new(Rc::new(clock.clone()), Duration::from_secs(60), false);
        app.reset();
        let cycle = app.cycle();

        let effects = app.handle(Intent::CurrenciesLoaded {
            cycle,
            result: Err(FetchFailure::new("HTTP 503")),
        });
        assert!(effects.is_empty());
        assert_eq!(app.state(), ConverterState::LoadingError);
        assert_eq!(app.error_message(), Some("HTTP 503"));

        // Un chargement tardif ne ressuscite pas l'app
        app.handle(Intent::RatesLoaded {
            cycle,
            result: Ok(table()),
        });
        assert_eq!(app.state(), ConverterState::LoadingError);
        assert!(app.handle(Intent::Tick).is_empty());
    }

    #[test]
    fn test_rates_failure_goes_to_error() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = App::new(Rc::new(clock.clone()), Duration::from_secs(60), false);
        app.reset();
        let cycle = app.cycle();
        app.handle(Intent::CurrenciesLoaded {
            cycle,
            result: Ok(codes(&["USD"])),
        });
        app.handle(Intent::RatesLoaded {
            cycle,
            result: Err(FetchFailure::new("timeout")),
        });
        assert_eq!(app.state(), ConverterState::LoadingError);
        assert!(!app.freshness().is_armed());
    }

    #[test]
    fn test_no_selection_disables_both_fields() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        assert_eq!(enabled_count(&app), 0);

        type_amount(&mut app, AmountKind::Foreign, "10");
        assert!(app.field(AmountKind::Foreign).is_empty());
        assert!(app.handle(Intent::SwitchToBase).is_empty());
    }

    #[test]
    fn test_foreign_drives_base() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));

        assert!(app.field(AmountKind::Foreign).is_enabled());
        assert!(!app.field(AmountKind::Base).is_enabled());

        type_amount(&mut app, AmountKind::Foreign, "100");
        assert_eq!(app.field(AmountKind::Base).text(), "136.0000");

        let last = app.last_conversion().unwrap();
        assert_eq!(last.from_code, "USD");
        assert_eq!(last.to_code, "CAD");
        assert_eq!(last.rate, dec!(1.36));
        assert_eq!(last.rate_date, day(4));
    }

    #[test]
    fn test_invalid_driving_value_blanks_derived() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));

        type_amount(&mut app, AmountKind::Foreign, "100");
        type_amount(&mut app, AmountKind::Foreign, "100.12345");
        assert!(app.field(AmountKind::Base).is_empty());
        assert!(app.last_conversion().is_none());

        type_amount(&mut app, AmountKind::Foreign, "5");
        assert!(app.last_conversion().is_some());
        type_amount(&mut app, AmountKind::Foreign, "");
        assert!(app.field(AmountKind::Base).is_empty());
        assert!(app.last_conversion().is_none());
    }

    #[test]
    fn test_edit_to_non_driving_field_changes_nothing() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));
        type_amount(&mut app, AmountKind::Foreign, "10");

        type_amount(&mut app, AmountKind::Base, "");
        assert_eq!(app.field(AmountKind::Base).text(), "13.6000");
        assert!(app.last_conversion().is_some());
    }

    #[test]
    fn test_base_drives_foreign_after_switch() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));

        let effects = app.handle(Intent::SwitchToBase);
        assert_eq!(
            effects,
            vec![Effect::Focus {
                field: AmountKind::Base,
                select_text: true
            }]
        );
        assert_eq!(app.direction(), ConversionDirection::FromBase);

        type_amount(&mut app, AmountKind::Base, "136");
        assert_eq!(app.field(AmountKind::Foreign).text(), "100.0000");
        assert_eq!(app.last_conversion().unwrap().from_code, "CAD");

        // Même direction une deuxième fois : pas de surlignage
        let effects = app.handle(Intent::SwitchToBase);
        assert_eq!(
            effects,
            vec![Effect::Focus {
                field: AmountKind::Base,
                select_text: false
            }]
        );
    }

    #[test]
    fn test_at_most_one_field_enabled() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);

        let script = vec![
            Intent::SelectionChanged(SelectionInput::Text("us".into())),
            Intent::SwitchToBase,
            Intent::SelectionChanged(SelectionInput::Currency(usd())),
            Intent::AmountEdited { field: AmountKind::Foreign, text: "12".into() },
            Intent::SwitchToBase,
            Intent::AmountEdited { field: AmountKind::Base, text: "3.5".into() },
            Intent::SwitchToForeign,
            Intent::SwitchToForeign,
            Intent::DateChanged(day(1)),
            Intent::SelectionChanged(SelectionInput::Text("eu".into())),
            Intent::SwitchToForeign,
        ];

        for intent in script {
            app.handle(intent);
            let enabled = enabled_count(&app);
            if app.selected_currency().is_some() {
                assert_eq!(enabled, 1);
                assert!(app.field(app.direction().driving()).is_enabled());
            } else {
                assert_eq!(enabled, 0);
                assert!(app.field(AmountKind::Foreign).is_empty());
                assert!(app.field(AmountKind::Base).is_empty());
            }
            if app.last_conversion().is_some() {
                assert!(app.field(app.direction().driving()).is_valid());
            }
        }
    }

    #[test]
    fn test_text_selection_clears_state() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));
        type_amount(&mut app, AmountKind::Foreign, "10");

        app.handle(Intent::SelectionChanged(SelectionInput::Text("US dolla".into())));
        assert!(app.selected_currency().is_none());
        assert!(app.last_conversion().is_none());
        assert_eq!(enabled_count(&app), 0);
        assert_eq!(app.filtered_options().len(), 1);
    }

    #[test]
    fn test_unknown_currency_object_is_not_a_selection() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(CurrencyOption::new(
            "JPY",
            "Japanese yen",
        ))));
        assert!(app.selected_currency().is_none());
    }

    #[test]
    fn test_date_change_reruns_conversion() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));
        type_amount(&mut app, AmountKind::Foreign, "100");
        assert_eq!(app.field(AmountKind::Base).text(), "136.0000");

        app.handle(Intent::DateChanged(day(1)));
        assert_eq!(app.field(AmountKind::Base).text(), "135.0000");
        assert_eq!(app.last_conversion().unwrap().rate_date, day(1));

        // Le 3 (pas de publication) utilise le taux du 1er
        app.handle(Intent::DateChanged(day(3)));
        assert_eq!(app.last_conversion().unwrap().rate_date, day(1));

        // Hors fenêtre : ignorée
        app.handle(Intent::DateChanged(day(5)));
        assert_eq!(app.selected_date(), Some(day(3)));
    }

    #[test]
    fn test_adjacent_date() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let app = ready_app(&clock, false);
        assert_eq!(app.adjacent_date(false), Some(day(1)));
        assert_eq!(app.adjacent_date(true), None);
    }

    #[test]
    fn test_prompt_accept_reinitializes() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        let first_cycle = app.cycle();

        clock.set(toronto(4, 16, 31));
        assert_eq!(app.handle(Intent::Tick), vec![Effect::PromptRefresh]);

        let effects = app.handle(Intent::PromptAnswered(true));
        let cycle = app.cycle();
        assert!(cycle > first_cycle);
        assert_eq!(effects, vec![Effect::FetchCurrencies { cycle }]);
        assert_eq!(app.state(), ConverterState::FetchingCurrencies);
        assert!(!app.freshness().is_armed());
        assert!(app.options().len() >= 2);
    }

    #[test]
    fn test_decline_then_ticks_never_prompt() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);

        clock.set(toronto(4, 16, 31));
        assert_eq!(app.handle(Intent::Tick), vec![Effect::PromptRefresh]);
        assert!(app.handle(Intent::PromptAnswered(false)).is_empty());
        assert!(app.new_rates_indicator());

        for _ in 0..5 {
            clock.advance(chrono::Duration::minutes(1));
            assert!(app.handle(Intent::Tick).is_empty());
        }
        assert_eq!(app.state(), ConverterState::Ready);
    }

    #[test]
    fn test_stale_completion_after_reset_is_ignored() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        let old_cycle = app.cycle();

        app.reset();
        app.reset();
        let effects = app.handle(Intent::CurrenciesLoaded {
            cycle: old_cycle,
            result: Ok(codes(&["USD"])),
        });
        assert!(effects.is_empty());
        assert_eq!(app.state(), ConverterState::FetchingCurrencies);
    }

    #[test]
    fn test_reset_drops_reactors() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = ready_app(&clock, false);
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));
        type_amount(&mut app, AmountKind::Foreign, "10");
        assert_eq!(app.reactor_runs(), 2);

        app.reset();
        assert_eq!(app.reactor_runs(), 0);

        // Événements postés après le reset : aucun réacteur ne s'exécute
        app.handle(Intent::SelectionChanged(SelectionInput::Currency(usd())));
        type_amount(&mut app, AmountKind::Foreign, "20");
        app.handle(Intent::DateChanged(day(1)));
        assert_eq!(app.reactor_runs(), 0);
        assert!(app.selected_currency().is_none());
        assert!(app.last_conversion().is_none());
    }

    #[test]
    fn test_quit_two_step() {
        let clock = ManualClock::new(toronto(4, 10, 0));
        let mut app = App::new(Rc::new(clock), Duration::from_secs(60), false);
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());
        app.quit();
        assert!(!app.is_running());
    }
}
