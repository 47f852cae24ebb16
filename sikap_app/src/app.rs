use std::{future::Future, sync::Arc};

use chrono::{Local, Utc};
use sikap_data_management::RecordId;
use sikap_lib::{location_fix::LocationFix, user::UserProfile};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinSet,
};

use crate::{
    identity::SessionContext,
    location::{AuthorizationStatus, LocationService, LocationSink},
    navigation::{DirectionsProvider, RoutePolyline, SearchResult, TransportType},
    renderer::{MapView, RouteRenderer},
    session::{EndPrompt, FixOutcome},
    Advisory, EndChoice, SessionController, SessionState, SikapConfig, SikapError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    NewSikap,
    Share,
}

/// Identifies one visit to a screen. Work started on a screen is only applied
/// if the screen is still showing when the work completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenId(u64);

#[derive(Debug)]
pub enum AppEvent {
    Launch,
    StartSikap,
    EndTapped,
    EndChoice(EndChoice),
    SaveTapped,
    ClearTapped,
    SearchSubmitted(String),
    DismissAdvisory,
    Shutdown,

    FixesReceived(Vec<LocationFix>),
    AuthorizationChanged(AuthorizationStatus),

    SignInCompleted(Result<String, SikapError>),
    NameLoaded { screen: ScreenId, name: Option<String> },
    SaveCompleted { screen: ScreenId, result: Result<RecordId, SikapError> },
    SearchCompleted { screen: ScreenId, query: String, result: Result<SearchResult, SikapError> },
    DirectionsCompleted { screen: ScreenId, result: Result<Vec<RoutePolyline>, SikapError> },
}

/// Everything the current screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub screen: Screen,
    pub name_label: Option<String>,
    pub details_label: Option<String>,
    pub end_visible: bool,
    pub save_visible: bool,
    pub search_visible: bool,
    pub clear_visible: bool,
    pub end_prompt: Option<EndPrompt>,
    pub advisory: Option<Advisory>,
}

impl ViewState {
    fn for_screen(screen: Screen) -> Self {
        let tracking = screen == Screen::NewSikap;
        Self {
            screen,
            name_label: None,
            details_label: None,
            end_visible: tracking,
            save_visible: false,
            search_visible: tracking,
            clear_visible: tracking,
            end_prompt: None,
            advisory: None,
        }
    }
}

/// The app's single sequential context. Every change to the session, the map
/// and the view happens in `update`. Slow work runs in spawned tasks which
/// report back through the event channel.
pub struct SikapApp<L: LocationService, M: MapView> {
    config: SikapConfig,
    context: SessionContext,
    directions: Arc<dyn DirectionsProvider>,
    session: SessionController<L>,
    renderer: RouteRenderer<M>,
    view: ViewState,
    screen_id: ScreenId,
    last_saved: Option<RecordId>,
    tx: UnboundedSender<AppEvent>,
    tasks: JoinSet<()>,
}

impl<L: LocationService, M: MapView> SikapApp<L, M> {
    pub fn new(
        config: SikapConfig,
        context: SessionContext,
        directions: Arc<dyn DirectionsProvider>,
        mut location: L,
        map: M,
    ) -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        location.subscribe(LocationSink::new(tx.clone()));

        let app = Self {
            session: SessionController::new(location, &config),
            renderer: RouteRenderer::new(map, &config),
            config,
            context,
            directions,
            view: ViewState::for_screen(Screen::Home),
            screen_id: ScreenId(0),
            last_saved: None,
            tx,
            tasks: JoinSet::new(),
        };
        (app, rx)
    }

    pub fn sender(&self) -> UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn session(&self) -> &SessionController<L> {
        &self.session
    }

    pub fn renderer(&self) -> &RouteRenderer<M> {
        &self.renderer
    }

    /// Id of the last sikap the store acknowledged.
    pub fn last_saved(&self) -> Option<&RecordId> {
        self.last_saved.as_ref()
    }

    /// Handles events until `Shutdown`, then lets in-flight work finish.
    pub async fn run(&mut self, mut rx: UnboundedReceiver<AppEvent>) {
        tracing::info!("Sikap app running");
        while let Some(event) = rx.recv().await {
            if !self.update(event) {
                break;
            }
        }

        self.session.stop_updates();
        self.settle(&mut rx).await;
        tracing::info!("Sikap app stopped");
    }

    /// Handles queued events until no background work is left.
    pub async fn settle(&mut self, rx: &mut UnboundedReceiver<AppEvent>) {
        loop {
            while let Ok(event) = rx.try_recv() {
                self.update(event);
            }

            match self.tasks.join_next().await {
                Some(Err(e)) => tracing::error!("Background task failed: {e}"),
                Some(Ok(())) => {}
                None if rx.is_empty() => return,
                None => {}
            }
        }
    }

    /// Handles events until `done` resolves, then settles. `search` is
    /// submitted once the walk has a current location, or at the end if it
    /// never gets one.
    pub async fn track_until<F>(&mut self, rx: &mut UnboundedReceiver<AppEvent>, done: F, mut search: Option<String>)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(done);
        loop {
            if self.session.current_location().is_some() {
                if let Some(query) = search.take() {
                    self.update(AppEvent::SearchSubmitted(query));
                }
            }

            tokio::select! {
                _ = &mut done => break,
                Some(event) = rx.recv() => {
                    self.update(event);
                }
            }
        }
        self.settle(rx).await;

        if let Some(query) = search {
            if self.session.current_location().is_none() {
                tracing::warn!("No location before the walk ended, searching anyway");
            }
            self.update(AppEvent::SearchSubmitted(query));
            self.settle(rx).await;
        }
    }

    /// Applies one event. Returns false when the app should stop.
    pub fn update(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Launch => self.launch(),
            AppEvent::StartSikap => self.start_sikap(),
            AppEvent::EndTapped => self.end_tapped(),
            AppEvent::EndChoice(choice) => self.end_choice(choice),
            AppEvent::SaveTapped => self.save_tapped(),
            AppEvent::ClearTapped => {
                self.renderer.clear_directions();
            }
            AppEvent::SearchSubmitted(query) => {
                if self.view.search_visible {
                    self.search(query);
                } else {
                    tracing::debug!("Ignoring search {:?} while search is hidden", query);
                }
            }
            AppEvent::DismissAdvisory => {
                self.view.advisory = None;
            }
            AppEvent::Shutdown => {
                tracing::info!("Shutting down");
                return false;
            }

            AppEvent::FixesReceived(fixes) => self.fixes_received(fixes),
            AppEvent::AuthorizationChanged(status) => {
                if self.view.screen == Screen::NewSikap {
                    if let Err(e) = self.session.on_authorization_changed(status) {
                        self.show_error(e);
                    }
                }
            }

            AppEvent::SignInCompleted(result) => match result {
                Ok(username) => tracing::info!("Signed in as {}", username),
                Err(e) => tracing::error!("Error occurred: {e}"),
            },
            AppEvent::NameLoaded { screen, name } => {
                if self.is_current(screen, "name") {
                    let username = self.context.username().unwrap_or_default();
                    self.view.name_label = UserProfile::new(username, name).progress_title();
                }
            }
            // Failures were logged where they happened
            AppEvent::SaveCompleted { screen, result } => {
                if let Ok(id) = result {
                    tracing::debug!("Save {} acknowledged on {:?}", id, screen);
                    self.last_saved = Some(id);
                }
            }
            AppEvent::SearchCompleted { screen, query, result } => {
                if self.is_current(screen, "search") {
                    self.search_completed(query, result);
                }
            }
            AppEvent::DirectionsCompleted { screen, result } => {
                if self.is_current(screen, "directions") {
                    match result {
                        Ok(routes) => self.renderer.render_directions(&routes),
                        Err(e) => self.show_error(e),
                    }
                }
            }
        }

        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!("Background task failed: {e}");
            }
        }
        true
    }

    fn is_current(&self, screen: ScreenId, what: &str) -> bool {
        if screen != self.screen_id {
            tracing::debug!("Dropping {} result from a screen that is gone", what);
            return false;
        }
        true
    }

    fn navigate(&mut self, screen: Screen) {
        self.screen_id = ScreenId(self.screen_id.0 + 1);
        self.view = ViewState::for_screen(screen);
        tracing::debug!("Showing {:?}", screen);
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            // The app is gone if this fails, nothing left to update
            let _ = tx.send(task.await);
        });
    }

    fn show_error(&mut self, error: SikapError) {
        match error.advisory() {
            Some(advisory) => {
                tracing::warn!("{error}");
                self.view.advisory = Some(advisory);
            }
            None => tracing::error!("{error}"),
        }
    }

    fn launch(&mut self) {
        self.navigate(Screen::Home);
        if !self.context.identity().is_signed_in() {
            let context = self.context.clone();
            self.spawn(async move { AppEvent::SignInCompleted(context.ensure_signed_in().await) });
        }
    }

    fn start_sikap(&mut self) {
        self.navigate(Screen::NewSikap);
        self.renderer.clear();
        self.renderer.zoom_out();

        match self.context.username() {
            Ok(username) => {
                let screen = self.screen_id;
                let data_manager = self.context.data_manager().clone();
                self.spawn(async move {
                    let name = match data_manager.display_name(&username).await {
                        Ok(name) => name,
                        Err(e) => {
                            tracing::error!("Failed to load name: {e}");
                            None
                        }
                    };
                    AppEvent::NameLoaded { screen, name }
                });
            }
            Err(e) => tracing::warn!("Not loading name: {e}"),
        }

        if let Err(e) = self.session.start_session() {
            self.show_error(e);
        }
    }

    fn fixes_received(&mut self, fixes: Vec<LocationFix>) {
        for fix in fixes {
            let coordinate = fix.coordinate;
            match self.session.on_fix_received(fix, Utc::now()) {
                FixOutcome::Accepted { segment } => {
                    // The first fix of a walk has nothing to draw and keeps the viewport
                    if let Some((from, to)) = segment {
                        self.renderer.add_segment(&from, &to);
                        self.renderer.recenter(coordinate, self.config.recenter_span_meters);
                    }
                }
                FixOutcome::Rejected(reason) => {
                    tracing::trace!("Fix rejected: {:?}", reason);
                }
            }
        }
    }

    fn end_tapped(&mut self) {
        let username = self.context.username().unwrap_or_default();
        match self.session.end_session(&username, &Local::now()) {
            Ok(prompt) => self.view.end_prompt = Some(prompt),
            Err(e) => self.show_error(e),
        }
    }

    fn end_choice(&mut self, choice: EndChoice) {
        self.view.end_prompt = None;
        match self.session.resolve_end(choice) {
            Ok(SessionState::Reviewing) => {
                self.renderer.clear_directions();
                self.view.details_label = self.session.summary().map(|summary| summary.details_line());
                self.view.end_visible = false;
                self.view.search_visible = false;
                self.view.clear_visible = false;
                self.view.save_visible = true;
                self.renderer.fit_tracked_route();
            }
            Ok(SessionState::Discarded) => {
                self.renderer.clear();
                self.navigate(Screen::Home);
            }
            Ok(_) => {}
            Err(e) => self.show_error(e),
        }
    }

    fn save_tapped(&mut self) {
        let save = match self.session.save_session(self.context.data_manager()) {
            Ok(save) => save,
            Err(e) => {
                self.show_error(e);
                return;
            }
        };

        self.view.save_visible = false;
        self.navigate(Screen::Share);
        let screen = self.screen_id;
        self.spawn(async move { AppEvent::SaveCompleted { screen, result: save.await } });
    }

    fn search(&mut self, query: String) {
        self.renderer.clear_directions();

        let screen = self.screen_id;
        let directions = self.directions.clone();
        self.spawn(async move {
            let result = directions.search(&query).await;
            AppEvent::SearchCompleted { screen, query, result }
        });
    }

    fn search_completed(&mut self, query: String, result: Result<SearchResult, SikapError>) {
        let found = match result {
            Ok(found) => found,
            Err(e) => {
                self.show_error(e);
                return;
            }
        };
        self.renderer.show_search_result(&found, &query);

        let Some(from) = self.session.current_location() else {
            self.show_error(SikapError::NoCurrentLocation);
            return;
        };

        let screen = self.screen_id;
        let directions = self.directions.clone();
        self.spawn(async move {
            let result = directions.directions(from, found.center, TransportType::Walking).await;
            AppEvent::DirectionsCompleted { screen, result }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use sikap_data_management::DataManager;
    use sikap_lib::location_fix::Coordinate;

    use super::*;
    use crate::{
        error::{LOCATION_DENIED, NO_CURRENT_LOCATION, SEARCH_FAILED},
        identity::StaticIdentity,
        location::ReplayLocationService,
        navigation::OfflineDirections,
        renderer::{HeadlessMap, OverlayStyle, Span},
        testing::{FailingStore, ManualLocation},
    };

    type TestApp = SikapApp<ManualLocation, HeadlessMap>;

    fn app_with(location: ManualLocation, data_manager: DataManager) -> (TestApp, UnboundedReceiver<AppEvent>) {
        let context = SessionContext::new(Arc::new(StaticIdentity::signed_in("michael")), data_manager);
        SikapApp::new(SikapConfig::default(), context, Arc::new(OfflineDirections), location, HeadlessMap::new())
    }

    /// A short walk east along the equator, timestamped now.
    fn walk() -> Vec<LocationFix> {
        let now = Utc::now();
        [0., 0.0001, 0.0002]
            .iter()
            .map(|lon| LocationFix::new(Coordinate::new(0., *lon), now, 5.))
            .collect()
    }

    #[tokio::test]
    async fn tracks_ends_and_saves() {
        let data_manager = DataManager::in_memory();
        data_manager.set_display_name("michael", "Michael").await.unwrap();
        let (mut app, mut rx) = app_with(ManualLocation::authorized(), data_manager.clone());

        app.update(AppEvent::StartSikap);
        app.settle(&mut rx).await;
        assert_eq!(app.view().name_label.as_deref(), Some("Michael's Sikap Progress"));
        assert!(app.view().end_visible);

        app.update(AppEvent::FixesReceived(walk()));
        assert_eq!(app.session().route().len(), 3);
        assert_eq!(app.renderer().map().overlays_with_style(OverlayStyle::Tracked), 2);

        app.update(AppEvent::EndTapped);
        assert!(app.view().end_prompt.is_some());
        app.update(AppEvent::EndChoice(EndChoice::End));
        assert_eq!(app.session().state(), SessionState::Reviewing);
        assert!(app.view().save_visible);
        assert!(!app.view().end_visible);
        let details = app.view().details_label.clone().unwrap();
        assert!(details.ends_with(" - Distance: 0.01 mi"));
        assert!(app.renderer().map().visible_bounds.is_some());

        app.update(AppEvent::SaveTapped);
        assert_eq!(app.view().screen, Screen::Share);
        app.settle(&mut rx).await;

        let history = data_manager.sikap_history("michael").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(app.last_saved(), Some(&history[0].0));
        assert_eq!(details, format!("{} - Distance: {}", history[0].1.date, history[0].1.distance));
    }

    #[tokio::test]
    async fn discard_writes_nothing() {
        let data_manager = DataManager::in_memory();
        let (mut app, mut rx) = app_with(ManualLocation::authorized(), data_manager.clone());

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::FixesReceived(walk()));
        app.update(AppEvent::EndTapped);
        app.update(AppEvent::EndChoice(EndChoice::Discard));
        app.update(AppEvent::SaveTapped);
        app.settle(&mut rx).await;

        assert_eq!(app.session().state(), SessionState::Discarded);
        assert_eq!(app.view().screen, Screen::Home);
        assert!(app.renderer().map().overlays.is_empty());
        assert!(data_manager.sikap_history("michael").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_is_only_logged() {
        let store = FailingStore::default();
        let attempts = store.attempts.clone();
        let (mut app, mut rx) = app_with(ManualLocation::authorized(), DataManager::with_store(Arc::new(store)));

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::FixesReceived(walk()));
        app.update(AppEvent::EndTapped);
        app.update(AppEvent::EndChoice(EndChoice::End));
        app.update(AppEvent::SaveTapped);
        app.settle(&mut rx).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(app.view().screen, Screen::Share);
        assert_eq!(app.view().advisory, None);
        assert_eq!(app.last_saved(), None);
    }

    #[tokio::test]
    async fn search_without_current_location_shows_advisory() {
        let (mut app, mut rx) = app_with(ManualLocation::authorized(), DataManager::in_memory());

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::SearchSubmitted("55.67,12.56".into()));
        app.settle(&mut rx).await;

        assert_eq!(app.view().advisory, Some(NO_CURRENT_LOCATION));
        assert_eq!(app.renderer().direction_overlays(), 0);
        assert_eq!(app.renderer().map().annotations.len(), 1);
    }

    #[tokio::test]
    async fn search_draws_walking_directions() {
        let location = ManualLocation::authorized().at(Coordinate::new(55.6, 12.5));
        let (mut app, mut rx) = app_with(location, DataManager::in_memory());

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::SearchSubmitted("55.67,12.56".into()));
        app.settle(&mut rx).await;

        assert_eq!(app.view().advisory, None);
        assert_eq!(app.renderer().direction_overlays(), 1);
        assert!(app.renderer().map().visible_bounds.is_some());

        app.update(AppEvent::ClearTapped);
        assert_eq!(app.renderer().direction_overlays(), 0);
        assert!(app.renderer().map().annotations.is_empty());
    }

    #[tokio::test]
    async fn failed_search_shows_advisory() {
        let (mut app, mut rx) = app_with(ManualLocation::authorized(), DataManager::in_memory());

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::SearchSubmitted("the park".into()));
        app.settle(&mut rx).await;
        assert_eq!(app.view().advisory, Some(SEARCH_FAILED));

        app.update(AppEvent::DismissAdvisory);
        assert_eq!(app.view().advisory, None);
    }

    #[tokio::test]
    async fn late_search_result_is_dropped() {
        let location = ManualLocation::authorized().at(Coordinate::new(55.6, 12.5));
        let (mut app, mut rx) = app_with(location, DataManager::in_memory());

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::SearchSubmitted("55.67,12.56".into()));
        app.update(AppEvent::EndTapped);
        app.update(AppEvent::EndChoice(EndChoice::Discard));
        app.settle(&mut rx).await;

        assert_eq!(app.view().screen, Screen::Home);
        assert!(app.renderer().map().annotations.is_empty());
        assert!(app.renderer().map().overlays.is_empty());
    }

    #[tokio::test]
    async fn denied_location_shows_advisory() {
        let (mut app, _rx) = app_with(ManualLocation::with_status(AuthorizationStatus::Denied), DataManager::in_memory());

        app.update(AppEvent::StartSikap);
        assert_eq!(app.view().advisory, Some(LOCATION_DENIED));
        assert_eq!(app.session().location().starts, 0);
    }

    #[tokio::test]
    async fn undetermined_access_starts_once_granted() {
        let mut location = ManualLocation::with_status(AuthorizationStatus::NotDetermined);
        location.status_on_request = Some(AuthorizationStatus::AuthorizedWhenInUse);
        let (mut app, mut rx) = app_with(location, DataManager::in_memory());

        app.update(AppEvent::StartSikap);
        assert_eq!(app.session().location().authorization_requests, 1);
        assert_eq!(app.session().location().starts, 0);

        app.settle(&mut rx).await;
        assert_eq!(app.session().location().starts, 1);
        assert!(app.session().is_updating());
        assert_eq!(app.view().advisory, None);
    }

    #[tokio::test]
    async fn authorization_changes_only_matter_while_tracking() {
        let (mut app, _rx) = app_with(ManualLocation::with_status(AuthorizationStatus::Denied), DataManager::in_memory());

        app.update(AppEvent::Launch);
        app.update(AppEvent::AuthorizationChanged(AuthorizationStatus::Denied));
        assert_eq!(app.view().screen, Screen::Home);
        assert_eq!(app.view().advisory, None);

        let (mut app, _rx) = app_with(ManualLocation::with_status(AuthorizationStatus::NotDetermined), DataManager::in_memory());
        app.update(AppEvent::AuthorizationChanged(AuthorizationStatus::NotDetermined));
        assert_eq!(app.session().location().authorization_requests, 0);
        assert_eq!(app.session().location().starts, 0);
    }

    #[tokio::test]
    async fn first_fix_keeps_the_zoomed_out_view() {
        let (mut app, _rx) = app_with(ManualLocation::authorized(), DataManager::in_memory());
        app.update(AppEvent::StartSikap);

        let mut fixes = walk();
        app.update(AppEvent::FixesReceived(vec![fixes.remove(0)]));
        assert_eq!(app.session().route().len(), 1);
        assert_eq!(app.renderer().map().region.unwrap().span, Span::Meters(19_903_100.));

        app.update(AppEvent::FixesReceived(vec![fixes.remove(0)]));
        let region = app.renderer().map().region.unwrap();
        assert_eq!(region.span, Span::Meters(200.));
        assert_eq!(region.center, Coordinate::new(0., 0.0001));
    }

    #[tokio::test]
    async fn search_is_ignored_while_hidden() {
        let location = ManualLocation::authorized().at(Coordinate::new(55.6, 12.5));
        let (mut app, mut rx) = app_with(location, DataManager::in_memory());

        app.update(AppEvent::Launch);
        app.update(AppEvent::SearchSubmitted("55.67,12.56".into()));
        app.settle(&mut rx).await;
        assert!(app.renderer().map().annotations.is_empty());

        app.update(AppEvent::StartSikap);
        app.update(AppEvent::FixesReceived(walk()));
        app.update(AppEvent::EndTapped);
        app.update(AppEvent::EndChoice(EndChoice::End));
        let bounds = app.renderer().map().visible_bounds;
        app.update(AppEvent::SearchSubmitted("55.67,12.56".into()));
        app.settle(&mut rx).await;

        let map = app.renderer().map();
        assert!(map.annotations.is_empty());
        assert_eq!(app.renderer().direction_overlays(), 0);
        assert_eq!(map.visible_bounds, bounds);
        assert_eq!(app.view().advisory, None);
    }

    #[tokio::test]
    async fn search_during_a_replayed_walk_lands_before_the_end() {
        let now = Utc::now();
        let fixes = [0., 0.0001, 0.0002, 0.0003]
            .iter()
            .map(|lon| LocationFix::new(Coordinate::new(0., *lon), now, 5.))
            .collect();
        let (location, mut replay) =
            ReplayLocationService::new(fixes, AuthorizationStatus::AuthorizedWhenInUse, std::time::Duration::from_millis(5));
        let context = SessionContext::new(Arc::new(StaticIdentity::signed_in("michael")), DataManager::in_memory());
        let (mut app, mut rx) =
            SikapApp::new(SikapConfig::default(), context, Arc::new(OfflineDirections), location, HeadlessMap::new());

        app.update(AppEvent::StartSikap);
        app.track_until(&mut rx, replay.finished(), Some("0.001,0.001".into())).await;

        assert_eq!(app.session().route().len(), 4);
        assert_eq!(app.view().advisory, None);
        assert_eq!(app.renderer().direction_overlays(), 1);
        assert_eq!(app.renderer().map().annotations.len(), 1);

        app.update(AppEvent::EndTapped);
        app.update(AppEvent::EndChoice(EndChoice::End));
        assert_eq!(app.renderer().direction_overlays(), 0);
        assert_eq!(app.renderer().tracked_segments(), 3);
    }

    #[tokio::test]
    async fn failed_background_task_is_reaped() {
        let (mut app, _rx) = app_with(ManualLocation::authorized(), DataManager::in_memory());
        app.tasks.spawn(async { panic!("lost the map tiles") });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(app.update(AppEvent::DismissAdvisory));
        assert!(app.tasks.is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_after_pending_work() {
        let data_manager = DataManager::in_memory();
        let (mut app, rx) = app_with(ManualLocation::authorized(), data_manager.clone());
        let tx = app.sender();

        for event in [
            AppEvent::Launch,
            AppEvent::StartSikap,
            AppEvent::FixesReceived(walk()),
            AppEvent::EndTapped,
            AppEvent::EndChoice(EndChoice::End),
            AppEvent::SaveTapped,
            AppEvent::Shutdown,
        ] {
            tx.send(event).unwrap();
        }
        app.run(rx).await;

        assert_eq!(data_manager.sikap_history("michael").await.unwrap().len(), 1);
        assert!(app.last_saved().is_some());
    }
}
