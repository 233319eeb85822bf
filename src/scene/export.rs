//! GeoJSON export of the scene.
//!
//! Towers become `Point` features and links become two-vertex `LineString`
//! features. Coordinates are written longitude first, as GeoJSON requires.

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::model::Scene;

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub properties: serde_json::Value,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
}

impl Feature {
    fn new(properties: serde_json::Value, geometry: Geometry) -> Self {
        Self {
            kind: "Feature",
            properties,
            geometry,
        }
    }
}

impl FeatureCollection {
    /// Build the collection for the current scene. Links whose endpoints are
    /// missing are skipped.
    pub fn from_scene(scene: &Scene) -> Self {
        let towers = scene.towers().iter().map(|t| {
            Feature::new(
                serde_json::json!({
                    "id": t.id,
                    "name": t.name,
                    "freqGHz": t.frequency_ghz,
                    "type": "tower",
                }),
                Geometry::Point(t.position.to_lng_lat()),
            )
        });

        let links = scene.links().iter().filter_map(|l| {
            let (a, b) = scene.link_endpoints(l.id)?;
            Some(Feature::new(
                serde_json::json!({
                    "id": l.id,
                    "freqGHz": l.frequency_ghz,
                    "type": "link",
                }),
                Geometry::LineString(vec![a.position.to_lng_lat(), b.position.to_lng_lat()]),
            ))
        });

        Self {
            kind: "FeatureCollection",
            features: towers.chain(links).collect(),
        }
    }

    pub fn to_pretty_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize scene to GeoJSON")
    }
}

/// Serialize the scene and write it to `path`.
pub fn write_geojson(scene: &Scene, path: &Path) -> anyhow::Result<()> {
    let json = FeatureCollection::from_scene(scene).to_pretty_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!(
        "Exported {} tower(s) and {} link(s) to {}",
        scene.towers().len(),
        scene.links().len(),
        path.display()
    );
    Ok(())
}

/// Suggested file name for an export started at `now`.
pub fn default_export_file_name(now: DateTime<Local>) -> String {
    format!("scene-{}.geojson", now.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::LatLng;
    use chrono::TimeZone;

    fn count(collection: &FeatureCollection) -> (usize, usize) {
        let points = collection.features.iter().filter(|f| matches!(f.geometry, Geometry::Point(_))).count();
        let lines = collection.features.iter().filter(|f| matches!(f.geometry, Geometry::LineString(_))).count();
        (points, lines)
    }

    #[test]
    fn single_tower_exports_one_point_and_no_lines() {
        let mut scene = Scene::new();
        scene.add_tower(LatLng::new(47.5, 19.0), 5.0);
        let collection = FeatureCollection::from_scene(&scene);
        assert_eq!(count(&collection), (1, 0));
        assert_eq!(collection.features[0].geometry, Geometry::Point([19.0, 47.5]));
        assert_eq!(collection.features[0].properties["name"], "Tower 1");
        assert_eq!(collection.features[0].properties["freqGHz"], 5.0);
        assert_eq!(collection.features[0].properties["type"], "tower");
    }

    #[test]
    fn linked_towers_export_a_line_in_lng_lat_order() {
        let mut scene = Scene::new();
        let a = scene.add_tower(LatLng::new(10.0, 20.0), 2.4);
        let b = scene.add_tower(LatLng::new(11.0, 21.5), 2.4);
        let link = scene.add_link(a, b).unwrap();

        let collection = FeatureCollection::from_scene(&scene);
        assert_eq!(count(&collection), (2, 1));
        let line = collection.features.iter().find(|f| f.properties["type"] == "link").unwrap();
        assert_eq!(line.geometry, Geometry::LineString(vec![[20.0, 10.0], [21.5, 11.0]]));
        assert_eq!(line.properties["id"], serde_json::json!(link));
        assert_eq!(line.properties["freqGHz"], 2.4);
    }

    #[test]
    fn tower_and_link_ids_never_collide() {
        let mut scene = Scene::new();
        let a = scene.add_tower(LatLng::new(0.0, 0.0), 5.0);
        let b = scene.add_tower(LatLng::new(0.0, 1.0), 5.0);
        scene.add_link(a, b).unwrap();
        let collection = FeatureCollection::from_scene(&scene);
        let ids: Vec<&serde_json::Value> = collection.features.iter().map(|f| &f.properties["id"]).collect();
        assert_eq!(ids, vec![&serde_json::json!("T1"), &serde_json::json!("T2"), &serde_json::json!("L1")]);
    }

    #[test]
    fn removed_tower_takes_its_line_out_of_the_export() {
        let mut scene = Scene::new();
        let a = scene.add_tower(LatLng::new(0.0, 0.0), 5.0);
        let b = scene.add_tower(LatLng::new(0.0, 1.0), 5.0);
        scene.add_link(a, b);
        scene.remove_tower(b);
        assert_eq!(count(&FeatureCollection::from_scene(&scene)), (1, 0));
    }

    #[test]
    fn json_layout_is_a_geojson_feature_collection() {
        let mut scene = Scene::new();
        let a = scene.add_tower(LatLng::new(1.0, 2.0), 5.0);
        let b = scene.add_tower(LatLng::new(3.0, 4.0), 5.0);
        scene.add_link(a, b);
        let json = FeatureCollection::from_scene(&scene).to_pretty_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "Point");
        assert_eq!(value["features"][0]["geometry"]["coordinates"], serde_json::json!([2.0, 1.0]));
        assert_eq!(value["features"][2]["geometry"]["type"], "LineString");
        assert_eq!(value["features"][2]["geometry"]["coordinates"], serde_json::json!([[2.0, 1.0], [4.0, 3.0]]));
    }

    #[test]
    fn empty_scene_exports_an_empty_collection() {
        let collection = FeatureCollection::from_scene(&Scene::new());
        assert!(collection.features.is_empty());
    }

    #[test]
    fn export_file_name_carries_a_timestamp() {
        let now = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(default_export_file_name(now), "scene-20260307-090501.geojson");
    }

    #[test]
    fn write_geojson_reports_unwritable_paths() {
        let scene = Scene::new();
        let err = write_geojson(&scene, Path::new("/nonexistent-dir/for/sure/scene.geojson")).unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }
}
