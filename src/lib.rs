use std::time::Instant;

use anyhow::Context;
use log::{debug, info, warn};
use nalgebra::Vector4;

use crate::camera::{Camera, RayField};
use crate::config::Config;
use crate::ember::scene::Scene;
use crate::ember::Ember;

pub mod camera;
pub mod config;
pub mod ember;
mod util;

pub use util::{in_unit_sphere, pcg_hash, random_f32};

/// [0, 1] 범위의 색을 u32 하나로. 하위 바이트부터 R, G, B, A
pub fn vec4_to_rgba(color: &Vector4<f32>) -> u32 {
    let r = (color.x * 255.0) as u8;
    let g = (color.y * 255.0) as u8;
    let b = (color.z * 255.0) as u8;
    let a = (color.w * 255.0) as u8;

    u32::from_le_bytes([r, g, b, a])
}

/// 창 없이 데모 장면을 렌더링해서 PNG로 저장함.
/// 첫 번째 인자로 설정 파일 경로를 받음
pub fn run() -> anyhow::Result<()> {
    // RUST_LOG 환경 변수로 로그 수준 조절
    env_logger::init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::load(path)?,
        None => {
            info!("no config given, using defaults");
            Config::default()
        }
    };

    let scene = Scene::demo();
    scene.validate().context("demo scene is inconsistent")?;

    let mut camera = Camera::new(
        config.vertical_fov,
        config.near,
        config.far,
        config.width,
        config.height,
    );
    camera.look_at(config.camera_position(), config.camera_target());
    debug!(
        "camera at {:?} facing {:?}",
        camera.position(),
        camera.forward().into_inner()
    );

    let mut ember = Ember::new(config.render_settings());
    ember
        .resize(config.width, config.height)
        .context("failed to prepare frame buffers")?;

    if !config.accumulate && config.frames > 1 {
        warn!("accumulation is off, only the last of {} frames is kept", config.frames);
    }

    let started = Instant::now();
    for frame in 1..=config.frames {
        ember
            .render(&scene, &camera)
            .with_context(|| format!("frame {} failed", frame))?;

        info!(
            "frame {}/{} ({:.3}ms)",
            frame,
            config.frames,
            ember.last_render_time().as_secs_f64() * 1000.0
        );
    }
    info!(
        "rendered {} frames in {:.2}s",
        config.frames,
        started.elapsed().as_secs_f64()
    );

    let image = ember.final_image();
    let image = image
        .read()
        .map_err(|_| anyhow::anyhow!("final image lock was poisoned"))?;
    image
        .save_png(&config.output)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    info!("saved {}", config.output.display());
    Ok(())
}
