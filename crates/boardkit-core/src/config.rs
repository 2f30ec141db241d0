//! Engine configuration supplied by the embedding host.

use crate::camera::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use crate::clipboard::PASTE_OFFSET;
use crate::scene::MAX_UNDO_HISTORY;
use crate::selection::HANDLE_RADIUS;
use crate::shapes::{HIT_MARGIN, SerializableColor};
use crate::sync::MergePolicy;
use kurbo::{Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reference image drawn behind the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundImage {
    /// Opaque image handle for the surface (URL, path, data URI).
    pub source: String,
    /// Natural size of the image in pixels.
    pub width: f64,
    pub height: f64,
}

impl BackgroundImage {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Host embedding parameters and tunables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Scene key used with the persistence collaborator.
    pub scene_id: String,
    /// Serialized scene to start from.
    pub initial_scene: Option<String>,
    pub background_image: Option<BackgroundImage>,
    /// Color of newly drawn elements.
    pub stroke_color: SerializableColor,
    pub background_color: SerializableColor,
    /// Ignore every input that would change the scene.
    pub read_only: bool,
    pub paste_offset: Vec2,
    /// Hit-test slack in screen pixels.
    pub hit_margin: f64,
    /// Resize handle radius in screen pixels.
    pub handle_radius: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_undo: usize,
    pub merge_policy: MergePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scene_id: "default".to_string(),
            initial_scene: None,
            background_image: None,
            stroke_color: SerializableColor::black(),
            background_color: SerializableColor::white(),
            read_only: false,
            paste_offset: PASTE_OFFSET,
            hit_margin: HIT_MARGIN,
            handle_radius: HANDLE_RADIUS,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_undo: MAX_UNDO_HISTORY,
            merge_policy: MergePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(invalid("minZoom", "must be a positive number"));
        }
        if !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom) {
            return Err(invalid("maxZoom", "must be at least minZoom"));
        }
        if !(self.hit_margin.is_finite() && self.hit_margin >= 0.0) {
            return Err(invalid("hitMargin", "must not be negative"));
        }
        if !(self.handle_radius.is_finite() && self.handle_radius > 0.0) {
            return Err(invalid("handleRadius", "must be positive"));
        }
        if !(self.paste_offset.x.is_finite() && self.paste_offset.y.is_finite()) {
            return Err(invalid("pasteOffset", "must be finite"));
        }
        if let Some(image) = &self.background_image {
            if !(image.width > 0.0 && image.height > 0.0) {
                return Err(invalid("backgroundImage", "size must be positive"));
            }
        }
        Ok(())
    }

    /// Reset every invalid tunable to its default, logging each one.
    /// Host-facing fields such as the scene id and colors are kept.
    pub fn repaired(mut self) -> Self {
        let defaults = EngineConfig::default();
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0)
            || !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom)
        {
            log::warn!(
                "zoom limits [{}, {}] are unusable, falling back to [{}, {}]",
                self.min_zoom,
                self.max_zoom,
                defaults.min_zoom,
                defaults.max_zoom
            );
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }
        if !(self.hit_margin.is_finite() && self.hit_margin >= 0.0) {
            log::warn!("hit margin {} is unusable, using {}", self.hit_margin, defaults.hit_margin);
            self.hit_margin = defaults.hit_margin;
        }
        if !(self.handle_radius.is_finite() && self.handle_radius > 0.0) {
            log::warn!(
                "handle radius {} is unusable, using {}",
                self.handle_radius,
                defaults.handle_radius
            );
            self.handle_radius = defaults.handle_radius;
        }
        if !(self.paste_offset.x.is_finite() && self.paste_offset.y.is_finite()) {
            self.paste_offset = defaults.paste_offset;
        }
        let bad_image = self
            .background_image
            .as_ref()
            .is_some_and(|image| !(image.width > 0.0 && image.height > 0.0));
        if bad_image {
            log::warn!("dropping background image with an unusable size");
            self.background_image = None;
        }
        self
    }

    pub fn with_initial_scene(mut self, json: impl Into<String>) -> Self {
        self.initial_scene = Some(json.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.paste_offset, Vec2::new(20.0, 20.0));
        assert_eq!(config.merge_policy, MergePolicy::ReplaceScene);
    }

    #[test]
    fn test_camel_case_fields() {
        let config = EngineConfig::from_json(
            r##"{
                "sceneId": "board-7",
                "readOnly": true,
                "strokeColor": "#ff0000",
                "backgroundImage": {"source": "floor.png", "width": 800, "height": 600},
                "mergePolicy": "keep-newer-revision"
            }"##,
        )
        .unwrap();
        assert_eq!(config.scene_id, "board-7");
        assert!(config.read_only);
        assert_eq!(config.stroke_color.to_string(), "#ff0000");
        assert_eq!(
            config.background_image.map(|i| i.size()),
            Some(Size::new(800.0, 600.0))
        );
        assert_eq!(config.merge_policy, MergePolicy::KeepNewerRevision);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"minZoom": 0}"#),
            Err(ConfigError::Invalid { field: "minZoom", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"minZoom": 2, "maxZoom": 1}"#),
            Err(ConfigError::Invalid { field: "maxZoom", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(
                r#"{"backgroundImage": {"source": "a.png", "width": 0, "height": 10}}"#
            ),
            Err(ConfigError::Invalid { field: "backgroundImage", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json("[1, 2]"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_nan_image_size_is_invalid() {
        let config = EngineConfig {
            background_image: Some(BackgroundImage {
                source: "a.png".into(),
                width: f64::NAN,
                height: 10.0,
            }),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.repaired().background_image, None);
    }

    #[test]
    fn test_repaired_resets_only_bad_tunables() {
        let config = EngineConfig {
            scene_id: "board".into(),
            min_zoom: 4.0,
            max_zoom: 2.0,
            hit_margin: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let repaired = config.repaired();
        assert!(repaired.validate().is_ok());
        assert_eq!(repaired.scene_id, "board");
        assert_eq!(repaired.min_zoom, DEFAULT_MIN_ZOOM);
        assert_eq!(repaired.max_zoom, DEFAULT_MAX_ZOOM);
        assert_eq!(repaired.hit_margin, HIT_MARGIN);
        assert_eq!(repaired.handle_radius, HANDLE_RADIUS);
    }
}
