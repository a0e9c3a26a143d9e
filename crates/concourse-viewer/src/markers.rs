//! Screen-space markers for points of interest.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};
use concourse::{PoiId, PointOfInterest};

use crate::camera::MainCamera;
use crate::loader::LoadStatus;
use crate::ui::{LabelClicked, Search};

const MARKER_SIZE: f32 = 28.0;
const MARKER_FILL: egui::Color32 = egui::Color32::from_rgb(26, 26, 26);
const MARKER_HIGHLIGHT: egui::Color32 = egui::Color32::from_rgb(33, 150, 243);

/// Plugin drawing one clickable label per point of interest.
pub struct MarkerPlugin;

impl Plugin for MarkerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, poi_labels_ui);
    }
}

/// The session's points of interest.
#[derive(Resource, Debug, Clone, Deref)]
pub struct PoiCatalog(pub Vec<PointOfInterest>);

impl PoiCatalog {
    pub fn get(&self, id: PoiId) -> Option<&PointOfInterest> {
        self.0.iter().find(|poi| poi.id == id)
    }
}

fn poi_labels_ui(
    mut contexts: EguiContexts,
    catalog: Res<PoiCatalog>,
    search: Res<Search>,
    status: Res<LoadStatus>,
    camera: Single<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut clicked: MessageWriter<LabelClicked>,
) -> Result {
    if *status != LoadStatus::Ready {
        return Ok(());
    }

    let ctx = contexts.ctx_mut()?;
    let (camera, camera_transform) = *camera;
    let highlighted = search.state.highlighted();

    for poi in catalog.iter() {
        // Points behind the camera have no viewport position.
        let Ok(position) = camera.world_to_viewport(camera_transform, poi.position) else {
            continue;
        };

        let fill = if highlighted == Some(poi.id) {
            MARKER_HIGHLIGHT
        } else {
            MARKER_FILL
        };
        let glyph = poi.initial().map(String::from).unwrap_or_default();

        egui::Area::new(egui::Id::new(("poi-marker", poi.id.0)))
            .fixed_pos(egui::pos2(position.x, position.y))
            .pivot(egui::Align2::CENTER_CENTER)
            .show(ctx, |ui| {
                let button = egui::Button::new(
                    egui::RichText::new(glyph)
                        .color(egui::Color32::WHITE)
                        .strong(),
                )
                .fill(fill)
                .corner_radius(4.0)
                .min_size(egui::vec2(MARKER_SIZE, MARKER_SIZE));

                let response = ui.add(button).on_hover_text(&poi.name);
                if response.clicked() {
                    tracing::debug!(poi = %poi.id, "marker clicked");
                    clicked.write(LabelClicked { poi: poi.id });
                }
            });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concourse::poi::station_amenities;

    #[test]
    fn test_catalog_lookup() {
        let catalog = PoiCatalog(station_amenities());
        assert_eq!(catalog.get(PoiId(2)).map(|p| p.name.as_str()), Some("Ticket Counter"));
        assert!(catalog.get(PoiId(9)).is_none());
    }
}
