// ============================================================================
// Fraîcheur des taux
// ============================================================================
// Décide quand proposer à l'utilisateur de recharger les taux publiés
//
// La Banque du Canada publie les taux du jour vers 16h30 (heure de Toronto),
// du lundi au vendredi. Si l'application a chargé ses données avant la
// publication et qu'on est maintenant après, de nouveaux taux existent.
//
// CONCEPTS RUST :
// 1. Trait Clock : l'heure est injectée, les tests n'attendent jamais
// 2. chrono-tz : conversions UTC <-> America/Toronto (heure d'été incluse)
// 3. Option<RefreshTimer> : le timer est une ressource possédée, Some = actif
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

/// Fuseau horaire de la devise domestique
pub const DOMESTIC_TZ: Tz = chrono_tz::America::Toronto;

/// Heure de publication des taux (heure locale de Toronto)
pub const PUBLISH_HOUR: u32 = 16;
pub const PUBLISH_MINUTE: u32 = 30;

/// Intervalle par défaut entre deux vérifications
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Intervalle maximal accepté (une journée)
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Horloge
// ============================================================================

/// Source de l'heure courante
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Horloge système
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Horloge pilotée à la main (tests, démonstrations)
///
/// Les clones partagent la même heure.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Date du jour dans le fuseau domestique
pub fn domestic_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&DOMESTIC_TZ).date_naive()
}

// ============================================================================
// Fonction de décision
// ============================================================================

/// Instant de publication des taux pour un jour donné (16h30 à Toronto)
pub fn publish_instant(day: NaiveDate) -> Option<DateTime<Tz>> {
    let local = day.and_hms_opt(PUBLISH_HOUR, PUBLISH_MINUTE, 0)?;
    DOMESTIC_TZ.from_local_datetime(&local).earliest()
}

/// Vrai si des taux ont été publiés entre `last_fetch` et `now`
///
/// Comparaison littérale sur le jour de `last_fetch` : l'instant de
/// publication est celui du jour où les données ont été chargées.
pub fn rates_published_since(now: DateTime<Utc>, last_fetch: DateTime<Utc>) -> bool {
    let now_local = now.with_timezone(&DOMESTIC_TZ);
    if matches!(now_local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let last_local = last_fetch.with_timezone(&DOMESTIC_TZ);
    let Some(publish) = publish_instant(last_local.date_naive()) else {
        return false;
    };

    last_local < publish && now_local >= publish
}

// ============================================================================
// Timer
// ============================================================================

/// Timer périodique ; n'existe que pendant l'état Ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTimer {
    interval: chrono::Duration,
    next_due: DateTime<Utc>,
}

impl RefreshTimer {
    /// Démarre le timer ; l'intervalle est borné à MAX_REFRESH_INTERVAL
    pub fn start(now: DateTime<Utc>, interval: Duration) -> Self {
        if interval > MAX_REFRESH_INTERVAL {
            warn!(
                requested_secs = interval.as_secs(),
                max_secs = MAX_REFRESH_INTERVAL.as_secs(),
                "Refresh interval too large, clamped"
            );
        }
        // Borné à une journée : tient toujours dans un i64 de millisecondes
        let millis = interval.min(MAX_REFRESH_INTERVAL).as_millis() as i64;
        let interval = chrono::Duration::milliseconds(millis);
        Self {
            interval,
            next_due: Self::due_after(now, interval),
        }
    }

    /// now + interval, sans panic en bout de plage de DateTime
    fn due_after(now: DateTime<Utc>, interval: chrono::Duration) -> DateTime<Utc> {
        now.checked_add_signed(interval).unwrap_or_else(|| {
            warn!(%now, "Refresh deadline out of range, timer will not fire");
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// Vrai si l'échéance est atteinte ; replanifie alors la suivante
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = Self::due_after(now, self.interval);
        true
    }

    pub fn next_due(&self) -> DateTime<Utc> {
        self.next_due
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// État de fraîcheur d'un cycle de chargement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshnessState {
    /// Fin du dernier chargement réussi
    pub last_fetch_instant: Option<DateTime<Utc>>,

    /// L'utilisateur a refusé le rechargement pendant ce cycle
    pub user_skipped_refresh: bool,

    /// Override de debug : considère toujours que de nouveaux taux existent
    pub force_prompt: bool,
}

/// Résultat d'un tick du scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Rien à faire
    Idle,
    /// Demander à l'utilisateur s'il veut recharger
    Prompt,
    /// Nouveaux taux disponibles mais l'utilisateur a déjà refusé
    Indicator,
}

/// Planifie les vérifications et gère le protocole de confirmation
pub struct FreshnessScheduler {
    clock: Rc<dyn Clock>,
    interval: Duration,
    state: FreshnessState,
    timer: Option<RefreshTimer>,
    prompt_pending: bool,
}

impl FreshnessScheduler {
    pub fn new(clock: Rc<dyn Clock>, interval: Duration, force_prompt: bool) -> Self {
        Self {
            clock,
            interval,
            state: FreshnessState {
                force_prompt,
                ..FreshnessState::default()
            },
            timer: None,
            prompt_pending: false,
        }
    }

    /// Démarre un cycle : enregistre l'instant du chargement et lance le timer
    pub fn arm(&mut self, last_fetch: DateTime<Utc>) {
        self.state.last_fetch_instant = Some(last_fetch);
        self.state.user_skipped_refresh = false;
        self.prompt_pending = false;
        self.timer = Some(RefreshTimer::start(last_fetch, self.interval));
        info!(%last_fetch, interval_secs = self.interval.as_secs(), "Freshness timer armed");
    }

    /// Arrête le timer et oublie le cycle courant (idempotent)
    pub fn disarm(&mut self) {
        if self.timer.take().is_some() {
            debug!("Freshness timer stopped");
        }
        self.state.last_fetch_instant = None;
        self.state.user_skipped_refresh = false;
        self.prompt_pending = false;
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn state(&self) -> &FreshnessState {
        &self.state
    }

    pub fn prompt_pending(&self) -> bool {
        self.prompt_pending
    }

    /// De nouveaux taux sont-ils disponibles ?
    ///
    /// `now` vaut l'horloge par défaut, `last_fetch` l'instant enregistré.
    pub fn new_rates_available(
        &self,
        now: Option<DateTime<Utc>>,
        last_fetch: Option<DateTime<Utc>>,
    ) -> bool {
        if self.state.force_prompt {
            return true;
        }
        let now = now.unwrap_or_else(|| self.clock.now());
        match last_fetch.or(self.state.last_fetch_instant) {
            Some(last_fetch) => rates_published_since(now, last_fetch),
            None => false,
        }
    }

    /// Indicateur passif : visible après un refus, si des taux sont sortis
    pub fn indicator_visible(&self) -> bool {
        self.state.user_skipped_refresh && self.new_rates_available(None, None)
    }

    /// Appelé à chaque itération de la boucle ; n'agit qu'à l'échéance du timer
    pub fn on_tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let Some(timer) = self.timer.as_mut() else {
            return TickOutcome::Idle;
        };
        if !timer.poll(now) || self.prompt_pending {
            return TickOutcome::Idle;
        }
        if !self.new_rates_available(Some(now), None) {
            return TickOutcome::Idle;
        }

        if self.state.user_skipped_refresh {
            TickOutcome::Indicator
        } else {
            info!("New rates available, prompting user");
            self.prompt_pending = true;
            TickOutcome::Prompt
        }
    }

    /// Réponse de l'utilisateur ; retourne true s'il faut tout recharger
    pub fn answer(&mut self, accepted: bool) -> bool {
        self.prompt_pending = false;
        if accepted {
            info!("User accepted rate refresh");
            self.state.force_prompt = false;
            self.disarm();
            true
        } else {
            info!("User declined rate refresh for this session");
            self.state.user_skipped_refresh = true;
            false
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
