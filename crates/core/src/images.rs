//! Container image selection for notebook execution.
//!
//! Users either pick a predefined image by name (resolved against the
//! configured allow-list) or supply a custom image reference verbatim.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Fallback image used when a submission does not pick one.
pub const DEFAULT_DOCKER_IMAGE: &str = "bruno1996/cc_jupyterservice_base_image";

/// An entry of the configured image allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredefinedImage {
    /// Stable name users select by.
    pub name: String,
    /// Human-readable description shown in the submit UI.
    pub description: String,
    /// Full docker image reference submitted to the execution backend.
    pub url: String,
}

/// Image selection as sent in a submission request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageChoice {
    /// A name from the configured allow-list.
    Predefined { name: String },
    /// A docker image reference used verbatim.
    Custom { url: String },
}

/// Resolve an image choice to a concrete docker image reference.
///
/// `None` falls back to [`DEFAULT_DOCKER_IMAGE`]. A predefined name that
/// is not in the allow-list is a configuration error; resolution happens
/// before any I/O so a bad name never reaches the execution backend.
pub fn resolve_image(
    choice: Option<&ImageChoice>,
    allow_list: &[PredefinedImage],
) -> Result<String, CoreError> {
    match choice {
        None => Ok(DEFAULT_DOCKER_IMAGE.to_string()),
        Some(ImageChoice::Custom { url }) => {
            if url.trim().is_empty() {
                return Err(CoreError::Validation("Custom image url must not be empty".into()));
            }
            Ok(url.clone())
        }
        Some(ImageChoice::Predefined { name }) => allow_list
            .iter()
            .find(|image| image.name == *name)
            .map(|image| image.url.clone())
            .ok_or_else(|| {
                CoreError::Configuration(format!("Unknown predefined image: {name}"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_list() -> Vec<PredefinedImage> {
        vec![
            PredefinedImage {
                name: "base".into(),
                description: "Python 3 with papermill".into(),
                url: "bruno1996/cc_jupyterservice_base_image".into(),
            },
            PredefinedImage {
                name: "tensorflow".into(),
                description: "Base image plus TensorFlow".into(),
                url: "example/nb-tensorflow:2.16".into(),
            },
        ]
    }

    #[test]
    fn test_resolve_predefined_by_name() {
        let choice = ImageChoice::Predefined { name: "tensorflow".into() };
        let url = resolve_image(Some(&choice), &allow_list()).unwrap();
        assert_eq!(url, "example/nb-tensorflow:2.16");
    }

    #[test]
    fn test_unknown_predefined_is_configuration_error() {
        let choice = ImageChoice::Predefined { name: "does-not-exist".into() };
        let err = resolve_image(Some(&choice), &allow_list()).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_custom_image_passes_through_verbatim() {
        let choice = ImageChoice::Custom { url: "ghcr.io/me/my-image:v1".into() };
        let url = resolve_image(Some(&choice), &allow_list()).unwrap();
        assert_eq!(url, "ghcr.io/me/my-image:v1");
    }

    #[test]
    fn test_missing_choice_falls_back_to_default() {
        let url = resolve_image(None, &allow_list()).unwrap();
        assert_eq!(url, DEFAULT_DOCKER_IMAGE);
    }

    #[test]
    fn test_empty_custom_url_rejected() {
        let choice = ImageChoice::Custom { url: "  ".into() };
        let err = resolve_image(Some(&choice), &allow_list()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
