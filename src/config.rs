use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use nalgebra::Point3;
use serde::Deserialize;

use crate::ember::RenderSettings;

/// 헤드리스 실행 설정. JSON 파일에서 읽고, 없는 항목은 기본값을 씀
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub accumulate: bool,
    pub bounce_limit: u32,
    pub vertical_fov: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            frames: 64,
            accumulate: true,
            bounce_limit: 5,
            vertical_fov: 45.0,
            near: 0.1,
            far: 100.0,
            camera_position: [0.0, 0.0, 6.0],
            camera_target: [0.0, 0.0, 0.0],
            output: PathBuf::from("ember.png"),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        Self::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("resolution must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.frames == 0 {
            bail!("frames must be at least 1");
        }
        if self.bounce_limit == 0 {
            bail!("bounceLimit must be at least 1");
        }
        if !(self.vertical_fov > 0.0 && self.vertical_fov < 180.0) {
            bail!("verticalFov must be in (0, 180), got {}", self.vertical_fov);
        }
        if !(self.near > 0.0 && self.far > self.near) {
            bail!("near/far planes must satisfy 0 < near < far");
        }
        if self.camera_position == self.camera_target {
            bail!("cameraPosition and cameraTarget must differ");
        }
        Ok(())
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            accumulate: self.accumulate,
            bounce_limit: self.bounce_limit,
            ..Default::default()
        }
    }

    pub fn camera_position(&self) -> Point3<f32> {
        Point3::from(self.camera_position)
    }

    pub fn camera_target(&self) -> Point3<f32> {
        Point3::from(self.camera_target)
    }
}
