use serde::{Deserialize, Serialize};

/// An object found in an analyzed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetection {
    /// What was detected.
    pub label: String,

    /// Detector confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Bounding box as `[x1, y1, x2, y2]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl ImageDetection {
    /// Creates a detection with only a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
            bbox: None,
        }
    }
}

/// Result of the image agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Markdown description of the image.
    pub analysis: String,

    /// Objects found in the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<ImageDetection>>,

    /// Kind of scene, e.g. "outdoor".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_type: Option<String>,
}

impl ImageAnalysis {
    /// Creates an analysis with only its description.
    pub fn new(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            detections: None,
            scene_type: None,
        }
    }

    /// Returns the detections, or an empty slice.
    pub fn detections(&self) -> &[ImageDetection] {
        self.detections.as_deref().unwrap_or(&[])
    }
}

/// Older shape for image output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnalysisResult {
    /// Description of the image.
    #[serde(default)]
    pub description: String,

    /// Labels of the objects found.
    #[serde(default)]
    pub objects: Vec<String>,

    /// Kind of scene.
    #[serde(default)]
    pub scene_type: String,
}

impl From<ImageAnalysisResult> for ImageAnalysis {
    fn from(result: ImageAnalysisResult) -> Self {
        let scene_type = if result.scene_type.is_empty() {
            None
        } else {
            Some(result.scene_type)
        };
        ImageAnalysis {
            analysis: result.description,
            detections: Some(result.objects.into_iter().map(ImageDetection::new).collect()),
            scene_type,
        }
    }
}
