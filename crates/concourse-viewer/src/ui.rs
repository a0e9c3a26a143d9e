//! UI shell: loading screen, search bar, info panel and reset control.
//!
//! The shell renders from resources (`LoadProgress`, `LoadStatus`,
//! `CameraFocus`, `Search`) and talks back through messages. It is the only
//! place that decides whether a control exists.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use concourse::{PoiId, PointOfInterest, SearchOutcome, SearchState};

use crate::camera::{CameraFocus, FocusRequest, ResetViewRequest, SearchTarget};
use crate::loader::{LoadProgress, LoadStatus, RetryLoad};
use crate::markers::PoiCatalog;

/// Plugin for the UI overlay.
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .init_resource::<Search>()
            .init_resource::<SelectedPoi>()
            .add_message::<LabelClicked>()
            .add_message::<HighlightedAmenityChanged>()
            .add_systems(
                Update,
                (handle_label_clicks, show_highlighted_amenity),
            )
            .add_systems(
                EguiPrimaryContextPass,
                (
                    install_image_loaders,
                    loading_screen_ui,
                    search_bar_ui,
                    info_panel_ui,
                    reset_view_ui,
                )
                    .chain(),
            );
    }
}

/// A point-of-interest marker was activated.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelClicked {
    pub poi: PoiId,
}

/// The top search match changed.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightedAmenityChanged {
    pub poi: Option<PoiId>,
}

/// Search box text and its match state.
#[derive(Resource, Debug, Default)]
pub struct Search {
    pub text: String,
    pub state: SearchState,
}

impl Search {
    /// Re-run the query against `pois` after `text` was edited.
    pub fn refresh(&mut self, pois: &[PointOfInterest]) -> SearchOutcome {
        self.state.set_query(pois, &self.text)
    }
}

/// The point of interest shown in the info panel.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectedPoi(pub Option<PoiId>);

/// A direct click overrides whatever the search box asked for.
fn handle_label_clicks(
    mut clicks: MessageReader<LabelClicked>,
    mut selected: ResMut<SelectedPoi>,
    mut target: ResMut<SearchTarget>,
    mut focus: MessageWriter<FocusRequest>,
) {
    for LabelClicked { poi } in clicks.read() {
        selected.0 = Some(*poi);
        target.set_if_neq(SearchTarget::None);
        focus.write(FocusRequest(*poi));
    }
}

/// Auto-display the top search match.
fn show_highlighted_amenity(
    mut changes: MessageReader<HighlightedAmenityChanged>,
    mut selected: ResMut<SelectedPoi>,
) {
    if let Some(HighlightedAmenityChanged { poi }) = changes.read().last() {
        selected.set_if_neq(SelectedPoi(*poi));
    }
}

/// Everything a search edit can signal.
#[derive(SystemParam)]
pub struct SearchSignals<'w> {
    highlighted: MessageWriter<'w, HighlightedAmenityChanged>,
    focus: MessageWriter<'w, FocusRequest>,
    reset: MessageWriter<'w, ResetViewRequest>,
    target: ResMut<'w, SearchTarget>,
}

impl SearchSignals<'_> {
    /// Apply a search outcome: highlight, focus or reset.
    pub fn apply(&mut self, outcome: SearchOutcome) {
        match outcome {
            SearchOutcome::Unchanged => {}
            SearchOutcome::Focus(id) => {
                self.highlighted
                    .write(HighlightedAmenityChanged { poi: Some(id) });
                self.focus.write(FocusRequest(id));
                *self.target = SearchTarget::Poi(id);
            }
            SearchOutcome::Cleared => {
                self.highlighted.write(HighlightedAmenityChanged { poi: None });
                *self.target = SearchTarget::None;
            }
            SearchOutcome::Reset => {
                self.highlighted.write(HighlightedAmenityChanged { poi: None });
                self.reset.write(ResetViewRequest);
                *self.target = SearchTarget::Overview;
            }
        }
    }

    /// Focus a result picked from the list.
    fn pick(&mut self, id: PoiId) {
        self.focus.write(FocusRequest(id));
        *self.target = SearchTarget::None;
    }
}

/// Install egui's image loaders once the primary context exists.
fn install_image_loaders(mut contexts: EguiContexts, mut installed: Local<bool>) -> Result {
    if *installed {
        return Ok(());
    }
    egui_extras::install_image_loaders(contexts.ctx_mut()?);
    *installed = true;
    tracing::debug!("egui image loaders installed");
    Ok(())
}

fn loading_screen_ui(
    mut contexts: EguiContexts,
    progress: Res<LoadProgress>,
    status: Res<LoadStatus>,
    mut retry: MessageWriter<RetryLoad>,
) -> Result {
    if *status == LoadStatus::Ready {
        return Ok(());
    }

    let ctx = contexts.ctx_mut()?;
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE.fill(egui::Color32::from_rgba_unmultiplied(10, 10, 20, 230)))
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() / 3.0);
                match &*status {
                    LoadStatus::Failed(error) => {
                        ui.heading("Could not load the map");
                        ui.colored_label(egui::Color32::LIGHT_RED, error);
                        ui.add_space(8.0);
                        if ui.button("Retry").clicked() {
                            retry.write(RetryLoad);
                        }
                    }
                    LoadStatus::Loading | LoadStatus::Ready => {
                        ui.heading("Loading");
                        ui.add_space(8.0);
                        ui.add(
                            egui::ProgressBar::new(f32::from(progress.0) / 100.0)
                                .desired_width(320.0)
                                .text(format!("{}%", progress.0)),
                        );
                    }
                }
            });
        });

    Ok(())
}

fn search_bar_ui(
    mut contexts: EguiContexts,
    catalog: Res<PoiCatalog>,
    status: Res<LoadStatus>,
    mut search: ResMut<Search>,
    mut signals: SearchSignals,
) -> Result {
    if *status != LoadStatus::Ready {
        return Ok(());
    }

    let ctx = contexts.ctx_mut()?;
    let search = &mut *search;
    egui::Window::new("Search")
        .title_bar(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 12.0))
        .show(ctx, |ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut search.text)
                    .desired_width(280.0)
                    .hint_text("Search amenities..."),
            );
            if response.changed() {
                let outcome = search.refresh(&catalog);
                signals.apply(outcome);
            }

            if search.state.is_active() {
                let matches = concourse::search::filter(&catalog, search.state.query());
                if matches.is_empty() {
                    ui.weak("No matches");
                }
                for poi in matches {
                    let is_top = search.state.highlighted() == Some(poi.id);
                    if ui.selectable_label(is_top, &poi.name).clicked() {
                        signals.pick(poi.id);
                    }
                }
            }
        });

    Ok(())
}

fn info_panel_ui(
    mut contexts: EguiContexts,
    catalog: Res<PoiCatalog>,
    mut selected: ResMut<SelectedPoi>,
) -> Result {
    let Some(poi) = selected.0.and_then(|id| catalog.get(id)) else {
        return Ok(());
    };

    let ctx = contexts.ctx_mut()?;
    let mut open = true;
    egui::Window::new(&poi.name)
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
        .show(ctx, |ui| {
            if !poi.description.is_empty() {
                ui.label(&poi.description);
            }
            if !poi.tags.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for tag in &poi.tags {
                        ui.small(tag);
                    }
                });
            }
            if let Some(image) = &poi.image {
                ui.add(egui::Image::new(image.as_str()).max_width(240.0));
            }
        });

    if !open {
        selected.0 = None;
    }
    Ok(())
}

/// Shown only while a point of interest is focused.
fn reset_view_ui(
    mut contexts: EguiContexts,
    focus: Res<CameraFocus>,
    mut reset: MessageWriter<ResetViewRequest>,
) -> Result {
    if focus.focused.is_none() {
        return Ok(());
    }

    let ctx = contexts.ctx_mut()?;
    egui::Area::new(egui::Id::new("reset-view"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            let button = ui.add_enabled(!focus.animating, egui::Button::new("Reset view"));
            if button.clicked() {
                reset.write(ResetViewRequest);
            }
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use bevy::ecs::message::Messages;
    use bevy::ecs::system::RunSystemOnce;
    use concourse::poi::station_amenities;

    use super::*;

    fn read_all<M: Message + Clone>(app: &App) -> Vec<M> {
        let messages = app.world().resource::<Messages<M>>();
        messages.get_cursor().read(messages).cloned().collect()
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(PoiCatalog(station_amenities()))
            .init_resource::<SelectedPoi>()
            .init_resource::<Search>()
            .init_resource::<SearchTarget>()
            .add_message::<LabelClicked>()
            .add_message::<HighlightedAmenityChanged>()
            .add_message::<FocusRequest>()
            .add_message::<ResetViewRequest>()
            .add_systems(Update, (handle_label_clicks, show_highlighted_amenity));
        app
    }

    #[test]
    fn test_label_click_selects_and_focuses() {
        let mut app = app();
        app.world_mut().write_message(LabelClicked { poi: PoiId(3) });
        app.update();

        assert_eq!(*app.world().resource::<SelectedPoi>(), SelectedPoi(Some(PoiId(3))));
        let requests: Vec<PoiId> = read_all::<FocusRequest>(&app)
            .into_iter()
            .map(|FocusRequest(id)| id)
            .collect();
        assert_eq!(requests, vec![PoiId(3)]);
    }

    #[test]
    fn test_highlight_change_drives_info_panel() {
        let mut app = app();
        app.world_mut()
            .write_message(HighlightedAmenityChanged { poi: Some(PoiId(1)) });
        app.update();
        assert_eq!(app.world().resource::<SelectedPoi>().0, Some(PoiId(1)));

        app.world_mut()
            .write_message(HighlightedAmenityChanged { poi: None });
        app.update();
        assert_eq!(app.world().resource::<SelectedPoi>().0, None);
    }

    /// Type `text` into the search box the way `search_bar_ui` does.
    fn type_query(app: &mut App, text: &'static str) {
        app.world_mut()
            .run_system_once(
                move |catalog: Res<PoiCatalog>, mut search: ResMut<Search>, mut signals: SearchSignals| {
                    search.text = text.to_string();
                    let outcome = search.refresh(&catalog);
                    signals.apply(outcome);
                },
            )
            .unwrap();
    }

    fn highlights(app: &App) -> Vec<Option<PoiId>> {
        read_all::<HighlightedAmenityChanged>(app)
            .into_iter()
            .map(|HighlightedAmenityChanged { poi }| poi)
            .collect()
    }

    #[test]
    fn test_new_top_match_highlights_and_focuses() {
        let mut app = app();
        type_query(&mut app, "ticket");

        assert_eq!(highlights(&app), vec![Some(PoiId(2))]);
        let requests: Vec<PoiId> = read_all::<FocusRequest>(&app)
            .into_iter()
            .map(|FocusRequest(id)| id)
            .collect();
        assert_eq!(requests, vec![PoiId(2)]);
        assert_eq!(*app.world().resource::<SearchTarget>(), SearchTarget::Poi(PoiId(2)));
    }

    #[test]
    fn test_emptied_query_clears_highlight_and_resets() {
        let mut app = app();
        type_query(&mut app, "ticket");
        type_query(&mut app, "");

        assert_eq!(highlights(&app), vec![Some(PoiId(2)), None]);
        assert_eq!(read_all::<ResetViewRequest>(&app).len(), 1);
        assert_eq!(*app.world().resource::<SearchTarget>(), SearchTarget::Overview);
    }

    #[test]
    fn test_unmatched_query_keeps_camera() {
        let mut app = app();
        type_query(&mut app, "ticket");
        type_query(&mut app, "ticketxyz");

        assert_eq!(highlights(&app), vec![Some(PoiId(2)), None]);
        assert!(read_all::<ResetViewRequest>(&app).is_empty());
        assert_eq!(*app.world().resource::<SearchTarget>(), SearchTarget::None);
    }

    #[test]
    fn test_label_click_overrides_search_target() {
        let mut app = app();
        type_query(&mut app, "ticket");
        app.world_mut().write_message(LabelClicked { poi: PoiId(3) });
        app.update();
        assert_eq!(*app.world().resource::<SearchTarget>(), SearchTarget::None);
    }

    #[test]
    fn test_image_loaders_decode_info_panel_images() {
        let ctx = egui::Context::default();
        assert!(ctx.loaders().image.lock().is_empty());
        egui_extras::install_image_loaders(&ctx);
        assert!(!ctx.loaders().image.lock().is_empty());
    }
}
