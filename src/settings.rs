use log::{info, warn};
use serde::{Deserialize, Serialize};
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "PipelineSettings::default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default = "PipelineSettings::default_geometry_pool_vertices")]
    pub geometry_pool_vertices: u32,
    #[serde(default = "PipelineSettings::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            clear_color: Self::default_clear_color(),
            geometry_pool_vertices: Self::default_geometry_pool_vertices(),
            queue_capacity: Self::default_queue_capacity(),
        }
    }
}

impl PipelineSettings {
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default pipeline settings.",
                    path, err
                );
                Self::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Pipeline settings file {:?} not found. Using default settings.",
                    path
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default pipeline settings.",
                    path, err
                );
                Self::default()
            }
        }
    }

    /// Parses and validates settings from JSON text.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<PipelineSettings>(contents).map(Self::validate)
    }

    pub fn validate(mut self) -> Self {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if self.geometry_pool_vertices == 0 {
            warn!("Geometry pool must hold at least one vertex. Using default size.");
            self.geometry_pool_vertices = Self::default_geometry_pool_vertices();
        }

        if self.queue_capacity == 0 {
            warn!("Queue capacity must be greater than zero. Using default capacity.");
            self.queue_capacity = Self::default_queue_capacity();
        }

        if self.clear_color.iter().any(|c| !c.is_finite()) {
            warn!("Clear color has non-finite components. Using opaque black.");
            self.clear_color = Self::default_clear_color();
        }

        self
    }

    pub fn output_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.resolution.width, self.resolution.height)
    }

    const fn default_clear_color() -> [f32; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }

    const fn default_geometry_pool_vertices() -> u32 {
        4096
    }

    const fn default_queue_capacity() -> usize {
        65536
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
